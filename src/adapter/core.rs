//! アダプターの呼び出し処理

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use log::{debug, info};

use crate::common::{Request, Response};
use crate::error::Error;
use crate::Adapter;
use super::environment::Environment;
use super::response::{failure_response, wrap_response};

/// panicのペイロードからメッセージを取り出す
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// 処理を実行し、途中のpanicを `Error::ApplicationPanic` に変換する
async fn catch_panic<T, F>(future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::ApplicationPanic(panic_message(payload.as_ref()))),
    }
}

impl Adapter {
    /// リクエストを処理してレスポンスを返す
    ///
    /// 失敗は境界ですべて回収され、診断出力先へ1件記録したうえでエラーレスポンスになる。
    pub async fn call(&self, request: Request) -> Response {
        let head = request.head();
        debug!("Processing request: {} {}", head.method, head.path);

        // ミドルウェアの前処理を適用（panicも失敗として回収する）
        let mut request = request;
        for middleware in self.middlewares() {
            match catch_panic(middleware.pre_process(request)).await {
                Ok(processed) => request = processed,
                Err(e) => {
                    return failure_response(&e, self.environment.errors().as_ref(), &head);
                }
            }
        }

        let mut env = self.environment.build(request);
        let mut response = match self.invoke(&mut env).await {
            Ok(res) => res,
            Err(e) => {
                // 途中まで読まれた入力ボディも含めて解放する
                env.input.close();
                return failure_response(&e, env.errors.as_ref(), &env.request);
            }
        };

        // ミドルウェアの後処理を適用
        for middleware in self.middlewares() {
            match catch_panic(middleware.post_process(response)).await {
                Ok(processed) => response = processed,
                Err(e) => {
                    env.input.close();
                    return failure_response(&e, env.errors.as_ref(), &env.request);
                }
            }
        }

        info!("{} {} -> {}", head.method, head.path, response.status.as_u16());
        response
    }

    /// 環境をアプリケーションへ渡し、返された三つ組を構造化レスポンスへ包む
    ///
    /// アプリケーション内のpanicは `Error::ApplicationPanic` として返す。
    pub async fn invoke(&self, env: &mut Environment) -> Result<Response, Error> {
        let result = catch_panic(self.application.call(env)).await?;
        wrap_response(result, &env.request)
    }
}
