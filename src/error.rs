//! エラー型の定義

use thiserror::Error;

/// アダプターのエラー型
#[derive(Error, Debug)]
pub enum Error {
    /// 設定エラー（アプリケーション未設定など、構築時に検出される致命的エラー）
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 無効なリクエスト
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// リクエストボディの読み込みエラー
    #[error("Body error: {0}")]
    BodyError(String),

    /// すでにクローズされたボディへのアクセス
    #[error("Body already closed")]
    BodyClosed,

    /// アプリケーションが返した三つ組が不正
    #[error("Invalid application response: {0}")]
    InvalidResponse(String),

    /// アプリケーション内部のエラー
    #[error("Application error: {0}")]
    ApplicationError(String),

    /// アプリケーション内でpanicが発生
    #[error("Application panicked: {0}")]
    ApplicationPanic(String),

    /// CGIスクリプトの実行・出力エラー
    #[error("CGI script error: {0}")]
    CgiScriptError(String),

    /// タイムアウト
    #[error("Timeout: {0}")]
    Timeout(String),

    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ConfigurationError(_) => 500,
            Error::InvalidRequest(_) => 400,
            Error::BodyError(_) => 400,
            Error::BodyClosed => 500,
            Error::InvalidResponse(_) => 500,
            Error::ApplicationError(_) => 500,
            Error::ApplicationPanic(_) => 500,
            Error::CgiScriptError(_) => 502,
            Error::Timeout(_) => 504,
            Error::Io(_) => 500,
        }
    }

    /// 診断ログに記録する種別名
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigurationError(_) => "ConfigurationError",
            Error::InvalidRequest(_) => "InvalidRequest",
            Error::BodyError(_) => "BodyError",
            Error::BodyClosed => "BodyClosed",
            Error::InvalidResponse(_) => "InvalidResponse",
            Error::ApplicationError(_) => "ApplicationError",
            Error::ApplicationPanic(_) => "ApplicationPanic",
            Error::CgiScriptError(_) => "CgiScriptError",
            Error::Timeout(_) => "Timeout",
            Error::Io(_) => "Io",
        }
    }
}
