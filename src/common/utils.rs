//! 共通ユーティリティ関数群（環境設定の読み込み、ロガー初期化 等）

use std::env;
use std::time::Duration;

use env_logger::Env;

/// デフォルトのCGI実行タイムアウト（秒）
pub const DEFAULT_CGI_TIMEOUT_SECS: u64 = 30;

/// デフォルトのCGI出力上限（バイト）
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// デフォルトのエラーログファイル
pub const DEFAULT_ERROR_LOG: &str = "rackbridge_error.log";

/// ロガーを初期化する（標準エラー出力、デフォルトレベルは info）
///
/// すでに初期化済みの場合は何もしない。
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .try_init();
}

/// 真偽値の環境変数を読む。未設定・不正値の場合はデフォルト
pub fn get_bool_env(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// CGIスクリプトの実行タイムアウトを取得する
/// 優先順位: 環境変数 `RACKBRIDGE_CGI_TIMEOUT_SECS` -> デフォルト 30秒
pub fn get_cgi_timeout() -> Duration {
    let secs = env::var("RACKBRIDGE_CGI_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&s| s > 0)
        .unwrap_or(DEFAULT_CGI_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// CGIスクリプト出力の最大サイズ（バイト）を取得する
/// 優先順位: 環境変数 `RACKBRIDGE_MAX_OUTPUT_SIZE` -> デフォルト 5MB
pub fn get_max_output_size() -> usize {
    env::var("RACKBRIDGE_MAX_OUTPUT_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_OUTPUT_SIZE)
}

/// エラーログファイルのパスを取得する
pub fn get_error_log_path() -> String {
    env::var("RACKBRIDGE_ERROR_LOG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_ERROR_LOG.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_env::with_vars;

    #[test]
    fn test_get_bool_env() {
        with_vars([
            ("RB_TEST_TRUE", Some("yes")),
            ("RB_TEST_FALSE", Some("0")),
            ("RB_TEST_INVALID", Some("maybe")),
            ("RB_TEST_UNSET", None::<&str>),
        ], || {
            assert!(get_bool_env("RB_TEST_TRUE", false));
            assert!(!get_bool_env("RB_TEST_FALSE", true));
            assert!(get_bool_env("RB_TEST_INVALID", true));
            assert!(!get_bool_env("RB_TEST_UNSET", false));
        });
    }

    #[test]
    fn test_get_cgi_timeout() {
        with_vars([("RACKBRIDGE_CGI_TIMEOUT_SECS", None::<&str>)], || {
            assert_eq!(get_cgi_timeout(), Duration::from_secs(30));
        });
        with_vars([("RACKBRIDGE_CGI_TIMEOUT_SECS", Some("5"))], || {
            assert_eq!(get_cgi_timeout(), Duration::from_secs(5));
        });
        // 0や不正値はデフォルトにフォールバック
        with_vars([("RACKBRIDGE_CGI_TIMEOUT_SECS", Some("0"))], || {
            assert_eq!(get_cgi_timeout(), Duration::from_secs(30));
        });
        with_vars([("RACKBRIDGE_CGI_TIMEOUT_SECS", Some("soon"))], || {
            assert_eq!(get_cgi_timeout(), Duration::from_secs(30));
        });
    }

    #[test]
    fn test_get_max_output_size() {
        with_vars([("RACKBRIDGE_MAX_OUTPUT_SIZE", None::<&str>)], || {
            assert_eq!(get_max_output_size(), 5 * 1024 * 1024);
        });
        with_vars([("RACKBRIDGE_MAX_OUTPUT_SIZE", Some("1048576"))], || {
            assert_eq!(get_max_output_size(), 1048576);
        });
        with_vars([("RACKBRIDGE_MAX_OUTPUT_SIZE", Some("invalid"))], || {
            assert_eq!(get_max_output_size(), 5 * 1024 * 1024);
        });
    }

    #[test]
    fn test_get_error_log_path() {
        with_vars([("RACKBRIDGE_ERROR_LOG", None::<&str>)], || {
            assert_eq!(get_error_log_path(), "rackbridge_error.log");
        });
        with_vars([("RACKBRIDGE_ERROR_LOG", Some("/var/log/app.log"))], || {
            assert_eq!(get_error_log_path(), "/var/log/app.log");
        });
    }

    #[test]
    fn test_init_logging_twice() {
        // 2回目以降の初期化は無視される
        init_logging();
        init_logging();
        log::info!("logging initialized");
    }
}
