//! アプリケーションへ渡すロガー（`rack.logger`）

use std::sync::Arc;

use log::Level;

/// `rack.logger` のデフォルトターゲット
pub const DEFAULT_LOG_TARGET: &str = "rackbridge::app";

/// `log` ファサードへ転送するロガーハンドル
///
/// 構築後は不変で、複数リクエスト間で安全に共有できる。
#[derive(Debug, Clone)]
pub struct Logger {
    target: Arc<str>,
}

impl Logger {
    /// 指定ターゲットのロガーを作成
    pub fn new(target: &str) -> Self {
        Self {
            target: Arc::from(target),
        }
    }

    /// ログターゲット
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn log(&self, level: Level, message: &str) {
        log::log!(target: self.target(), level, "{}", message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_TARGET)
    }
}
