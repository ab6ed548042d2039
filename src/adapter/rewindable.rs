//! 複数回読まれうるリクエストボディを巻き戻し可能にするミドルウェア

use std::sync::OnceLock;

use async_trait::async_trait;
use http::Method;
use log::{debug, error};
use regex::Regex;

use crate::common::{Body, Middleware, Request};
use crate::error::Error;

/// バッファリング対象のメディアタイプ（パラメータが続いてもよいよう部分一致）
const BUFFERED_MEDIA_TYPES: &str =
    r"application/x-www-form-urlencoded|multipart/form-data|multipart/related|multipart/mixed";

fn buffered_media_types() -> &'static Result<Regex, regex::Error> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BUFFERED_MEDIA_TYPES))
}

/// ボディの巻き戻しが必要かどうかを判定する
///
/// - Content-TypeのないPOST
/// - Content-Typeがフォーム/マルチパート系
pub fn needs_rewind(method: &Method, content_type: Option<&str>) -> bool {
    match content_type {
        None => *method == Method::POST,
        Some(content_type) => match buffered_media_types() {
            Ok(re) => re.is_match(content_type),
            Err(e) => {
                error!("Invalid media type pattern: {}", e);
                false
            }
        },
    }
}

/// 必要であればリクエストボディを巻き戻し可能なラッパーに差し替える
pub fn make_rewindable(mut request: Request) -> Request {
    let rewind = needs_rewind(&request.method, request.content_type().as_deref());
    if rewind {
        if let Some(body) = request.body.take() {
            debug!("Buffering request body for {} {}", request.method, request.path);
            request.body = Some(Body::rewindable(body));
        }
    }
    request
}

/// 環境構築前に適用する巻き戻しミドルウェア
#[derive(Debug, Default, Clone, Copy)]
pub struct Rewindable;

impl Rewindable {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for Rewindable {
    async fn pre_process(&self, req: Request) -> Result<Request, Error> {
        Ok(make_rewindable(req))
    }
}
