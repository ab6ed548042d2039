//! CGIスクリプト出力の解析

use bytes::Bytes;
use log::debug;

use crate::adapter::LegacyResult;
use crate::error::Error;
use super::validation::{is_valid_header_name, is_valid_header_value, parse_status_line};

/// ヘッダーブロックの終端位置と、ボディ開始位置を探す
///
/// `\r\n\r\n` と `\n\n` のうち先に現れる方を終端とする。
fn find_header_end(output: &[u8]) -> Option<(usize, usize)> {
    let crlf = output
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| (pos, pos + 4));
    let lf = output
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|pos| (pos, pos + 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// CGIスクリプトの標準出力を三つ組へ変換する
///
/// ステータスは `Status:` ヘッダーから取り、なければ `Location` のみの場合302、それ以外は200。
pub fn parse_cgi_output(output: &[u8]) -> Result<LegacyResult, Error> {
    if output.is_empty() {
        return Err(Error::CgiScriptError("script produced no output".to_string()));
    }
    let (header_end, body_start) = find_header_end(output).ok_or_else(|| {
        Error::CgiScriptError("missing blank line after CGI headers".to_string())
    })?;

    let block = String::from_utf8_lossy(&output[..header_end]);
    let mut status = None;
    let mut has_location = false;
    let mut headers = Vec::new();

    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':').ok_or_else(|| {
            Error::CgiScriptError(format!("invalid header line: {:?}", line))
        })?;
        let name = name.trim();
        let value = value.trim();
        if !is_valid_header_name(name) || !is_valid_header_value(value) {
            return Err(Error::CgiScriptError(format!(
                "invalid header from script: {:?}",
                name
            )));
        }

        if name.eq_ignore_ascii_case("Status") {
            let code = parse_status_line(value).ok_or_else(|| {
                Error::CgiScriptError(format!("invalid Status header: {:?}", value))
            })?;
            status = Some(code);
            continue;
        }
        if name.eq_ignore_ascii_case("Location") {
            has_location = true;
        }
        headers.push((name.to_string(), value.to_string()));
    }

    let status = match status {
        Some(code) => code,
        None if has_location => 302,
        None => 200,
    };
    let body = Bytes::copy_from_slice(&output[body_start..]);
    debug!(
        "Parsed CGI output: status={} headers={} body={} bytes",
        status,
        headers.len(),
        body.len()
    );

    Ok(LegacyResult::new(status, headers, body))
}
