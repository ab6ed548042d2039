//! コアトレイト定義（Application、Middleware）

use async_trait::async_trait;

use crate::adapter::{Environment, LegacyResult};
use crate::error::Error;
use super::http::{Request, Response};

/// ラップされるレガシーアプリケーションの特性
///
/// 環境を受け取り、`(status, headers, body)` の三つ組を返す。
/// 環境の所有権はアダプター側に残り、失敗時には入力ボディが解放される。
#[async_trait]
pub trait Application: Send + Sync {
    /// リクエストを処理
    async fn call(&self, env: &mut Environment) -> Result<LegacyResult, Error>;
}

/// ミドルウェアの特性
#[async_trait]
pub trait Middleware: Send + Sync {
    /// 環境構築前のリクエスト処理
    async fn pre_process(&self, req: Request) -> Result<Request, Error>;

    /// レスポンス後の処理
    async fn post_process(&self, res: Response) -> Result<Response, Error> {
        Ok(res)
    }
}

/// 同期関数をアプリケーションとして扱うためのラッパー
pub struct FnApplication<F> {
    f: F,
}

/// 同期関数からアプリケーションを作成
pub fn from_fn<F>(f: F) -> FnApplication<F>
where
    F: Fn(&mut Environment) -> Result<LegacyResult, Error> + Send + Sync + 'static,
{
    FnApplication { f }
}

#[async_trait]
impl<F> Application for FnApplication<F>
where
    F: Fn(&mut Environment) -> Result<LegacyResult, Error> + Send + Sync + 'static,
{
    async fn call(&self, env: &mut Environment) -> Result<LegacyResult, Error> {
        (self.f)(env)
    }
}
