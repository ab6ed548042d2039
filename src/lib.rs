//! RackBridge: 構造化HTTPリクエスト/レスポンスとRack/CGI形式の呼び出し規約を相互に変換するアダプター
//!
//! レガシー規約で書かれたアプリケーションを、構造化HTTPを扱うサーバーの背後で変更なしに動かすためのライブラリ

use std::sync::Arc;

pub mod adapter;
pub mod common;
pub mod error;

#[cfg(feature = "cgi")]
pub mod cgi;

pub use adapter::{
    needs_rewind, Environment, EnvironmentBuilder, HeaderFields, InputStream, LegacyResult,
    Rewindable,
};
pub use common::{
    from_fn, AdapterConfig, Application, Body, ErrorSink, FileSink, Logger, MemorySink,
    Middleware, RemoteAddr, Request, RequestHead, Response, StderrSink,
};
pub use error::Error;

/// アダプターを構築するためのビルダー
#[derive(Default)]
pub struct AdapterBuilder {
    application: Option<Arc<dyn common::Application>>,
    middlewares: Vec<Box<dyn common::Middleware>>,
    errors: Option<Arc<dyn common::ErrorSink>>,
    logger: Option<common::Logger>,
    config: Option<common::AdapterConfig>,
}

impl AdapterBuilder {
    /// 新しいAdapterBuilderインスタンスを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ラップするアプリケーションを設定
    pub fn application<A>(mut self, application: A) -> Self
    where
        A: common::Application + 'static,
    {
        self.application = Some(Arc::new(application));
        self
    }

    /// ミドルウェアを追加（登録順に適用）
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: common::Middleware + 'static,
    {
        self.middlewares.push(Box::new(middleware));
        self
    }

    /// 診断出力先を設定（省略時は標準エラー出力）
    pub fn errors<S>(mut self, errors: S) -> Self
    where
        S: common::ErrorSink + 'static,
    {
        self.errors = Some(Arc::new(errors));
        self
    }

    /// 共有済みの診断出力先を設定
    pub fn shared_errors(mut self, errors: Arc<dyn common::ErrorSink>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// ロガーを設定
    pub fn logger(mut self, logger: common::Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// 設定を指定（省略時は環境変数から読み込む）
    pub fn config(mut self, config: common::AdapterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// アダプターをビルドして返却
    ///
    /// アプリケーションが設定されていない場合は設定エラー。
    pub fn build(self) -> Result<Adapter, Error> {
        let application = self.application.ok_or_else(|| {
            Error::ConfigurationError("no application configured for adapter".to_string())
        })?;
        let errors = self
            .errors
            .unwrap_or_else(|| Arc::new(common::StderrSink));
        let environment = adapter::EnvironmentBuilder::new(
            errors,
            self.logger.unwrap_or_default(),
            self.config.unwrap_or_else(common::AdapterConfig::from_env),
        );
        Ok(Adapter {
            application,
            middlewares: self.middlewares,
            environment,
        })
    }
}

/// レガシーアプリケーションを包むアダプター
pub struct Adapter {
    application: Arc<dyn common::Application>,
    middlewares: Vec<Box<dyn common::Middleware>>,
    environment: adapter::EnvironmentBuilder,
}

impl Adapter {
    /// 新しいAdapterBuilderインスタンスを作成
    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::new()
    }

    /// ミドルウェアのリストを取得
    pub fn middlewares(&self) -> &[Box<dyn common::Middleware>] {
        &self.middlewares
    }

    /// 環境構築器を取得
    pub fn environment_builder(&self) -> &adapter::EnvironmentBuilder {
        &self.environment
    }
}
