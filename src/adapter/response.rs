//! レガシーの三つ組を構造化レスポンスへ変換する

use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use log::{debug, error};

use crate::common::{Body, ErrorSink, FailureRecord, RequestHead, Response};
use crate::error::Error;

/// レスポンスから取り除くホップバイホップヘッダー
pub const HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "public",
    "proxy-authenticate",
    "transfer-encoding",
    "upgrade",
];

/// アプリケーションが返す `(status, headers, body)` の三つ組
#[derive(Debug)]
pub struct LegacyResult {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl LegacyResult {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// ヘッダーを追加
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// ボディを持たないステータスかどうか（1xx, 204, 304）
pub fn status_has_no_body(status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

fn is_ignored_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    HOP_HEADERS.contains(&lower.as_str()) || lower.starts_with("rack.")
}

/// レガシーの三つ組を構造化レスポンスへ包む
///
/// 値の整合性はアプリケーションの責任とし、ここでは構造的な変換と境界での検証のみ行う。
/// 改行を含むヘッダー値は行ごとに別ヘッダーとして展開する。
pub fn wrap_response(result: LegacyResult, request: &RequestHead) -> Result<Response, Error> {
    let LegacyResult {
        status,
        headers,
        mut body,
    } = result;

    let status = StatusCode::from_u16(status).map_err(|_| {
        body.close();
        Error::InvalidResponse(format!("status {} is out of range", status))
    })?;

    let mut response = Response::new(status);
    for (name, value) in &headers {
        if is_ignored_header(name) {
            debug!("Dropping response header: {}", name);
            continue;
        }
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            Error::InvalidResponse(format!("invalid header name: {:?}", name))
        });
        let header_name = match header_name {
            Ok(n) => n,
            Err(e) => {
                body.close();
                return Err(e);
            }
        };
        for line in value.split('\n') {
            match HeaderValue::from_str(line) {
                Ok(v) => {
                    response.headers.append(header_name.clone(), v);
                }
                Err(_) => {
                    body.close();
                    return Err(Error::InvalidResponse(format!(
                        "invalid value for header {:?}",
                        name
                    )));
                }
            }
        }
    }

    if request.is_head() || status_has_no_body(status) {
        // ボディは送らないが、保持しているリソースは解放する
        body.close();
    } else {
        response.body = Some(body);
    }

    Ok(response)
}

/// 失敗を診断出力先へ1件記録し、エラーレスポンスへ変換する
pub fn failure_response(err: &Error, errors: &dyn ErrorSink, request: &RequestHead) -> Response {
    let record = FailureRecord::new(err, request);
    error!("Request failed at {} {}: {}", request.method, request.path, err);
    errors.write_record(&record.to_line());
    Response::from_error(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{MemorySink, Request};
    use http::Method;

    fn get_head() -> RequestHead {
        Request::new(Method::GET, "/").head()
    }

    #[tokio::test]
    async fn test_wrap_basic() {
        let result = LegacyResult::new(
            201,
            vec![("Content-Type".into(), "text/plain".into())],
            vec!["created".to_string()],
        );
        let res = wrap_response(result, &get_head()).unwrap();
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.headers["content-type"], "text/plain");
        assert_eq!(res.into_bytes().await.unwrap(), "created");
    }

    #[test]
    fn test_hop_headers_dropped() {
        let result = LegacyResult::new(200, vec![], "ok")
            .with_header("Connection", "close")
            .with_header("Transfer-Encoding", "chunked")
            .with_header("rack.hijack", "yes")
            .with_header("X-Kept", "1");
        let res = wrap_response(result, &get_head()).unwrap();
        assert!(res.headers.get("connection").is_none());
        assert!(res.headers.get("transfer-encoding").is_none());
        assert!(res.headers.get("rack.hijack").is_none());
        assert_eq!(res.headers["x-kept"], "1");
    }

    #[test]
    fn test_newline_separated_values_split() {
        let result = LegacyResult::new(200, vec![], "")
            .with_header("Set-Cookie", "a=1\nb=2");
        let res = wrap_response(result, &get_head()).unwrap();
        let cookies: Vec<_> = res.headers.get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_head_request_omits_body() {
        let head = Request::new(Method::HEAD, "/").head();
        let result = LegacyResult::new(200, vec![("Content-Length".into(), "5".into())], "hello");
        let res = wrap_response(result, &head).unwrap();
        assert!(res.body.is_none());
        assert_eq!(res.headers["content-length"], "5");
    }

    #[test]
    fn test_no_content_omits_body() {
        let res = wrap_response(LegacyResult::new(204, vec![], "ignored"), &get_head()).unwrap();
        assert!(res.body.is_none());
        let res = wrap_response(LegacyResult::new(304, vec![], "ignored"), &get_head()).unwrap();
        assert!(res.body.is_none());
    }

    #[test]
    fn test_invalid_status_rejected() {
        let err = wrap_response(LegacyResult::new(0, vec![], ""), &get_head()).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        let err = wrap_response(LegacyResult::new(1000, vec![], ""), &get_head()).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let result = LegacyResult::new(200, vec![("Bad Name".into(), "v".into())], "");
        assert!(matches!(
            wrap_response(result, &get_head()),
            Err(Error::InvalidResponse(_))
        ));

        let result = LegacyResult::new(200, vec![("X-Ctl".into(), "bad\rvalue".into())], "");
        assert!(matches!(
            wrap_response(result, &get_head()),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_failure_response_records_once() {
        let sink = MemorySink::new();
        let head = Request::new(Method::POST, "/form").head();
        let res = failure_response(&Error::ApplicationError("db down".to_string()), &sink, &head);

        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("ApplicationError"));
        assert!(records[0].contains("/form"));
    }
}
