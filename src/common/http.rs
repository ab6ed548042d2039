//! HTTP関連の基本型（構造化リクエスト/レスポンス）

use std::borrow::Cow;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode, Version};
use log::warn;

use crate::adapter::headers::VALUE_SEPARATOR;
use crate::error::Error;
use super::body::Body;

/// 接続元アドレス
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAddr {
    /// IPソケット
    Inet(SocketAddr),
    /// Unixドメインソケット
    Unix(PathBuf),
}

impl RemoteAddr {
    /// IPリテラルを持つ場合のみIPアドレスを返す
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            RemoteAddr::Inet(addr) => Some(addr.ip()),
            RemoteAddr::Unix(_) => None,
        }
    }
}

impl From<SocketAddr> for RemoteAddr {
    fn from(addr: SocketAddr) -> Self {
        RemoteAddr::Inet(addr)
    }
}

impl fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteAddr::Inet(addr) => write!(f, "{}", addr),
            RemoteAddr::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// アップグレード/ALPNプロトコル識別子（`http::Request` の拡張として渡す）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeProtocol(pub String);

/// HTTPリクエスト
#[derive(Debug)]
pub struct Request {
    /// HTTPメソッド
    pub method: Method,
    /// リクエストパス（`?` 以降のクエリを含みうる）
    pub path: String,
    /// オーソリティ（"host:port" または "host"）
    pub authority: Option<String>,
    /// スキーム
    pub scheme: String,
    /// アップグレードプロトコル
    pub protocol: Option<String>,
    /// HTTPバージョン
    pub version: Version,
    /// HTTPヘッダー
    pub headers: HeaderMap,
    /// リクエストボディ
    pub body: Option<Body>,
    /// 接続元アドレス
    pub remote_addr: Option<RemoteAddr>,
}

impl Request {
    /// 新しいリクエストを作成
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            authority: None,
            scheme: "http".to_string(),
            protocol: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: None,
            remote_addr: None,
        }
    }

    /// オーソリティを設定
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// スキームを設定
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// アップグレードプロトコルを設定
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// HTTPバージョンを設定
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// ヘッダーを追加（同名ヘッダーは上書きせず追加する）
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        match (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!("Ignoring invalid request header: {:?}", key),
        }
        self
    }

    /// ボディを設定
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// 接続元アドレスを設定
    pub fn with_remote_addr(mut self, addr: impl Into<RemoteAddr>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Content-Typeヘッダーの値
    ///
    /// 非ASCIIバイトは置換文字として読み、複数ある場合は `;` で連結する。
    pub fn content_type(&self) -> Option<Cow<'_, str>> {
        let mut values = self
            .headers
            .get_all(CONTENT_TYPE)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()));
        let first = values.next()?;
        Some(values.fold(first, |mut joined, value| {
            let current = joined.to_mut();
            current.push(VALUE_SEPARATOR);
            current.push_str(&value);
            joined
        }))
    }

    /// HEADリクエストかどうか
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// ボディを除いたリクエスト情報の複製を取得
    pub fn head(&self) -> RequestHead {
        RequestHead {
            method: self.method.clone(),
            path: self.path.clone(),
            authority: self.authority.clone(),
            scheme: self.scheme.clone(),
            protocol: self.protocol.clone(),
            version: self.version,
            headers: self.headers.clone(),
            remote_addr: self.remote_addr.clone(),
        }
    }

    /// `http::Request` から変換する
    ///
    /// 接続元アドレスとアップグレードプロトコルは拡張（`RemoteAddr`、`UpgradeProtocol`）から取得する。
    pub fn from_http<B: Into<Body>>(request: http::Request<B>) -> Self {
        let (mut parts, body) = request.into_parts();

        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let authority = parts.uri.authority().map(|a| a.as_str().to_string());
        let scheme = parts.uri.scheme_str().unwrap_or("http").to_string();
        let protocol = parts.extensions.remove::<UpgradeProtocol>().map(|p| p.0);
        let remote_addr = parts.extensions.remove::<RemoteAddr>();

        let body: Body = body.into();
        let body = if body.is_empty() { None } else { Some(body) };

        Self {
            method: parts.method,
            path,
            authority,
            scheme,
            protocol,
            version: parts.version,
            headers: parts.headers,
            body,
            remote_addr,
        }
    }
}

/// ボディを除いたリクエスト情報（環境へのパススルー用）
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub authority: Option<String>,
    pub scheme: String,
    pub protocol: Option<String>,
    pub version: Version,
    pub headers: HeaderMap,
    pub remote_addr: Option<RemoteAddr>,
}

impl RequestHead {
    /// HEADリクエストかどうか
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

/// HTTPレスポンス
#[derive(Debug)]
pub struct Response {
    /// HTTPステータスコード
    pub status: StatusCode,
    /// HTTPヘッダー
    pub headers: HeaderMap,
    /// レスポンスボディ
    pub body: Option<Body>,
}

impl Response {
    /// 新しいレスポンスを作成
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// ヘッダーを追加
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        match (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!("Ignoring invalid response header: {:?}", key),
        }
        self
    }

    /// ボディを設定
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Error型から固定メッセージのレスポンスを生成
    pub fn from_error(error: &Error) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = status.canonical_reason().unwrap_or("Error");
        Response::new(status)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(message)
    }

    /// ボディを読み切ってバイト列として返す
    pub async fn into_bytes(self) -> Result<Bytes, Error> {
        match self.body {
            Some(mut body) => body.read_to_end().await,
            None => Ok(Bytes::new()),
        }
    }

    /// `http::Response` に変換する（ボディなしの場合は空ボディ）
    pub fn into_http(self) -> http::Response<Body> {
        let mut response = http::Response::new(self.body.unwrap_or_default());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
