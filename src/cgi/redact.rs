//! ログ出力用の環境変数マスク

/// 機密情報を含みうるキーの部分文字列
const SENSITIVE_PATTERNS: &[&str] = &[
    "authorization",
    "cookie",
    "token",
    "secret",
    "password",
    "api_key",
    "apikey",
    "jwt",
    "session",
    "csrf",
    "signature",
    "credential",
];

/// これより長い値は切り詰める
const MAX_VALUE_LEN: usize = 200;

const REDACTED: &str = "***redacted***";

/// 小文字化したキー名が機密情報らしいかどうか
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// クエリ文字列中の機密パラメータの値をマスクする
pub fn redact_query(query: &str) -> String {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, _)) if is_sensitive_key(key) => format!("{}={}", key, REDACTED),
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// 1つの環境変数の値をログ向けにマスク・切り詰めする
pub fn redact_var(key: &str, value: &str) -> String {
    if key == "QUERY_STRING" {
        return redact_query(value);
    }
    if is_sensitive_key(key) {
        return REDACTED.to_string();
    }
    if value.len() > MAX_VALUE_LEN {
        let mut end = MAX_VALUE_LEN;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &value[..end])
    } else {
        value.to_string()
    }
}

/// 失敗時のログに添える環境変数一覧（1行1変数、マスク済み）
pub fn describe_vars(vars: &[(String, String)]) -> String {
    vars.iter()
        .map(|(key, value)| format!("  {}={}", key, redact_var(key, value)))
        .collect::<Vec<_>>()
        .join("\n")
}
