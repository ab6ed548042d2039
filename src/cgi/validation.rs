//! CGI出力ヘッダーの検証

/// ヘッダー名がHTTPのトークンとして妥当か検証する
///
/// 許可: 英数字と `!#$%&'*+-.^_`|~`
pub fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
                        | b'^' | b'_' | b'`' | b'|' | b'~'
                )
        })
}

/// ヘッダー値が安全かどうか検証する（CR/LFなどの制御文字を拒否）
/// 許可: HTAB(0x09), SP(0x20), 可視ASCII(0x21–0x7E), 0x80以上
pub fn is_valid_header_value(value: &str) -> bool {
    value
        .bytes()
        .all(|c| c == b'\t' || c == b' ' || (0x21..=0x7e).contains(&c) || c >= 0x80)
}

/// `Status:` ヘッダーの値からステータスコードを取り出す（例: "404 Not Found"）
pub fn parse_status_line(value: &str) -> Option<u16> {
    let code = value.split_whitespace().next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse::<u16>()
        .ok()
        .filter(|status| (100..=999).contains(status))
}
