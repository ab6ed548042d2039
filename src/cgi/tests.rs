//! CGIモジュールのテスト

use bytes::Bytes;

use crate::error::Error;
use super::redact::{describe_vars, is_sensitive_key, redact_query, redact_var};
use super::response::parse_cgi_output;
use super::script::{child_vars, read_bounded};
use super::validation::{is_valid_header_name, is_valid_header_value, parse_status_line};

#[test]
fn test_is_valid_header_name() {
    assert!(is_valid_header_name("Content-Type"));
    assert!(is_valid_header_name("X-Custom_Header.v2"));
    assert!(!is_valid_header_name(""));
    assert!(!is_valid_header_name("Bad Header"));
    assert!(!is_valid_header_name("X-Injected\r\nSet-Cookie"));
    assert!(!is_valid_header_name("名前"));
}

#[test]
fn test_is_valid_header_value() {
    assert!(is_valid_header_value("text/html; charset=utf-8"));
    assert!(is_valid_header_value("a\tb"));
    assert!(is_valid_header_value(""));
    assert!(!is_valid_header_value("value\r\nX-Evil: 1"));
    assert!(!is_valid_header_value("null\0byte"));
}

#[test]
fn test_parse_status_line() {
    assert_eq!(parse_status_line("404 Not Found"), Some(404));
    assert_eq!(parse_status_line("201"), Some(201));
    assert_eq!(parse_status_line("  302 Found"), Some(302));
    assert_eq!(parse_status_line("99 Too Low"), None);
    assert_eq!(parse_status_line("abc"), None);
    assert_eq!(parse_status_line("2000"), None);
    assert_eq!(parse_status_line(""), None);
}

#[tokio::test]
async fn test_parse_output_with_status() {
    let output = b"Status: 404 Not Found\r\nContent-Type: text/plain\r\nX-Trace: 1\r\n\r\nmissing";
    let mut result = parse_cgi_output(output).unwrap();
    assert_eq!(result.status, 404);
    assert_eq!(
        result.headers,
        vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("X-Trace".to_string(), "1".to_string()),
        ]
    );
    assert_eq!(result.body.read_to_end().await.unwrap(), Bytes::from("missing"));
}

#[tokio::test]
async fn test_parse_output_lf_only() {
    let output = b"Content-Type: text/html\n\n<p>hi</p>\n\nmore";
    let mut result = parse_cgi_output(output).unwrap();
    assert_eq!(result.status, 200);
    assert_eq!(result.headers.len(), 1);
    // ボディ内の空行はそのまま残る
    assert_eq!(
        result.body.read_to_end().await.unwrap(),
        Bytes::from("<p>hi</p>\n\nmore")
    );
}

#[test]
fn test_parse_output_location_defaults_to_redirect() {
    let result = parse_cgi_output(b"Location: /login\n\n").unwrap();
    assert_eq!(result.status, 302);
    assert_eq!(result.headers[0], ("Location".to_string(), "/login".to_string()));

    // Statusが明示されていればそちらを優先
    let result = parse_cgi_output(b"Status: 301\nLocation: /new\n\n").unwrap();
    assert_eq!(result.status, 301);
}

#[test]
fn test_parse_output_status_case_insensitive() {
    let result = parse_cgi_output(b"status: 204 No Content\r\n\r\n").unwrap();
    assert_eq!(result.status, 204);
    assert!(result.headers.is_empty());
}

#[test]
fn test_parse_output_errors() {
    assert!(matches!(parse_cgi_output(b""), Err(Error::CgiScriptError(_))));
    assert!(matches!(
        parse_cgi_output(b"Content-Type: text/plain\r\n"),
        Err(Error::CgiScriptError(_))
    ));
    assert!(matches!(
        parse_cgi_output(b"not a header\n\nbody"),
        Err(Error::CgiScriptError(_))
    ));
    assert!(matches!(
        parse_cgi_output(b"Status: teapot\n\n"),
        Err(Error::CgiScriptError(_))
    ));
    assert!(matches!(
        parse_cgi_output(b"Bad Name: x\n\n"),
        Err(Error::CgiScriptError(_))
    ));
}

#[test]
fn test_is_sensitive_key() {
    assert!(is_sensitive_key("HTTP_AUTHORIZATION"));
    assert!(is_sensitive_key("HTTP_COOKIE"));
    assert!(is_sensitive_key("access_token"));
    assert!(is_sensitive_key("X_API_KEY"));
    assert!(!is_sensitive_key("HTTP_USER_AGENT"));
    assert!(!is_sensitive_key("REQUEST_METHOD"));
}

#[test]
fn test_redact_query() {
    assert_eq!(
        redact_query("user=alice&token=abc123&page=2"),
        "user=alice&token=***redacted***&page=2"
    );
    assert_eq!(redact_query(""), "");
    assert_eq!(redact_query("flag&&x=1"), "flag&x=1");
}

#[test]
fn test_redact_var() {
    assert_eq!(redact_var("HTTP_COOKIE", "sid=1"), "***redacted***");
    assert_eq!(redact_var("QUERY_STRING", "password=x"), "password=***redacted***");
    assert_eq!(redact_var("PATH_INFO", "/a"), "/a");

    let long = "あ".repeat(100);
    let redacted = redact_var("HTTP_USER_AGENT", &long);
    assert!(redacted.ends_with("...[truncated]"));
    assert!(redacted.len() < long.len());
}

#[test]
fn test_describe_vars() {
    let vars = vec![
        ("REQUEST_METHOD".to_string(), "POST".to_string()),
        ("HTTP_AUTHORIZATION".to_string(), "Bearer xyz".to_string()),
    ];
    let described = describe_vars(&vars);
    assert_eq!(
        described,
        "  REQUEST_METHOD=POST\n  HTTP_AUTHORIZATION=***redacted***"
    );
    assert!(!described.contains("xyz"));
}

#[test]
fn test_child_vars_drop_http_proxy() {
    let vars = vec![
        ("REQUEST_METHOD".to_string(), "GET".to_string()),
        ("HTTP_PROXY".to_string(), "http://attacker:8080".to_string()),
        ("HTTP_PROXY_AUTHORIZATION".to_string(), "kept".to_string()),
        ("HTTP_ACCEPT".to_string(), "*/*".to_string()),
    ];
    let passed: Vec<(&str, &str)> = child_vars(&vars).collect();
    assert_eq!(
        passed,
        vec![
            ("REQUEST_METHOD", "GET"),
            ("HTTP_PROXY_AUTHORIZATION", "kept"),
            ("HTTP_ACCEPT", "*/*"),
        ]
    );
}

#[tokio::test]
async fn test_read_bounded_limits() {
    assert_eq!(read_bounded(&b"abc"[..], 3).await.unwrap(), b"abc".to_vec());
    assert!(matches!(
        read_bounded(&b"abcd"[..], 3).await,
        Err(Error::CgiScriptError(_))
    ));
    // 上限が最大値でもあふれない
    assert_eq!(read_bounded(&b"abc"[..], usize::MAX).await.unwrap(), b"abc".to_vec());
}
