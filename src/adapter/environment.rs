//! 構造化リクエストからCGI/Rack形式の環境を構築する

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::Version;
use log::debug;

use crate::common::{AdapterConfig, ErrorSink, Logger, Request, RequestHead};
use super::headers::{http_key, project_headers, HeaderFields};
use super::input::InputStream;

/// 環境キー名（レガシー規約との互換のため固定）
pub mod keys {
    pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
    pub const SCRIPT_NAME: &str = "SCRIPT_NAME";
    pub const PATH_INFO: &str = "PATH_INFO";
    pub const REQUEST_PATH: &str = "REQUEST_PATH";
    pub const REQUEST_URI: &str = "REQUEST_URI";
    pub const QUERY_STRING: &str = "QUERY_STRING";
    pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";
    pub const SERVER_NAME: &str = "SERVER_NAME";
    pub const SERVER_PORT: &str = "SERVER_PORT";
    pub const CONTENT_TYPE: &str = "CONTENT_TYPE";
    pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
    pub const REMOTE_ADDR: &str = "REMOTE_ADDR";
    pub const HTTP_HOST: &str = "HTTP_HOST";
    pub const HTTP_X_FORWARDED_PROTO: &str = "HTTP_X_FORWARDED_PROTO";

    pub const RACK_INPUT: &str = "rack.input";
    pub const RACK_ERRORS: &str = "rack.errors";
    pub const RACK_LOGGER: &str = "rack.logger";
    pub const RACK_URL_SCHEME: &str = "rack.url_scheme";
    pub const RACK_PROTOCOL: &str = "rack.protocol";
    pub const RACK_MULTITHREAD: &str = "rack.multithread";
    pub const RACK_MULTIPROCESS: &str = "rack.multiprocess";
    pub const RACK_RUN_ONCE: &str = "rack.run_once";

    /// 元のリクエストへのパススルー用キー
    pub const PROTOCOL_HTTP_REQUEST: &str = "protocol.http.request";
}

/// アプリケーションへ渡す環境
///
/// 固定フィールドは型付きで保持し、ヘッダー由来の `HTTP_*` のみ文字列マップで持つ。
pub struct Environment {
    pub request_method: String,
    pub script_name: String,
    pub path_info: String,
    pub request_path: String,
    pub request_uri: String,
    pub query_string: String,
    pub server_protocol: String,
    pub server_name: String,
    pub server_port: String,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub remote_addr: Option<String>,
    pub url_scheme: String,
    pub protocol: String,
    pub multithread: bool,
    pub multiprocess: bool,
    pub run_once: bool,
    /// `HTTP_*` フィールド
    pub headers: HeaderFields,
    /// `rack.input`
    pub input: InputStream,
    /// `rack.errors`
    pub errors: Arc<dyn ErrorSink>,
    /// `rack.logger`
    pub logger: Logger,
    /// `protocol.http.request`
    pub request: RequestHead,
}

impl Environment {
    /// 文字列値を持つキーの値を取得する
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        let value: &str = match key {
            keys::REQUEST_METHOD => self.request_method.as_str(),
            keys::SCRIPT_NAME => self.script_name.as_str(),
            keys::PATH_INFO => self.path_info.as_str(),
            keys::REQUEST_PATH => self.request_path.as_str(),
            keys::REQUEST_URI => self.request_uri.as_str(),
            keys::QUERY_STRING => self.query_string.as_str(),
            keys::SERVER_PROTOCOL => self.server_protocol.as_str(),
            keys::SERVER_NAME => self.server_name.as_str(),
            keys::SERVER_PORT => self.server_port.as_str(),
            keys::CONTENT_TYPE => self.content_type.as_deref()?,
            keys::CONTENT_LENGTH => self.content_length.as_deref()?,
            keys::REMOTE_ADDR => self.remote_addr.as_deref()?,
            keys::RACK_URL_SCHEME => self.url_scheme.as_str(),
            keys::RACK_PROTOCOL => self.protocol.as_str(),
            keys::RACK_MULTITHREAD => return Some(Cow::Owned(self.multithread.to_string())),
            keys::RACK_MULTIPROCESS => return Some(Cow::Owned(self.multiprocess.to_string())),
            keys::RACK_RUN_ONCE => return Some(Cow::Owned(self.run_once.to_string())),
            other => self.headers.get(other)?,
        };
        Some(Cow::Borrowed(value))
    }

    /// ヘッダー名（例: `User-Agent`）から `HTTP_*` フィールドの値を取得する
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&http_key(name))
    }

    /// プロセス環境変数として渡せる文字列キーをすべて列挙する
    pub fn to_vars(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = vec![
            (keys::REQUEST_METHOD.to_string(), self.request_method.clone()),
            (keys::SCRIPT_NAME.to_string(), self.script_name.clone()),
            (keys::PATH_INFO.to_string(), self.path_info.clone()),
            (keys::REQUEST_PATH.to_string(), self.request_path.clone()),
            (keys::REQUEST_URI.to_string(), self.request_uri.clone()),
            (keys::QUERY_STRING.to_string(), self.query_string.clone()),
            (keys::SERVER_PROTOCOL.to_string(), self.server_protocol.clone()),
            (keys::SERVER_NAME.to_string(), self.server_name.clone()),
            (keys::SERVER_PORT.to_string(), self.server_port.clone()),
        ];
        let optional = [
            (keys::CONTENT_TYPE, &self.content_type),
            (keys::CONTENT_LENGTH, &self.content_length),
            (keys::REMOTE_ADDR, &self.remote_addr),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                vars.push((key.to_string(), value.clone()));
            }
        }
        vars.extend(
            self.headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        vars
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("request_method", &self.request_method)
            .field("path_info", &self.path_info)
            .field("query_string", &self.query_string)
            .field("server_name", &self.server_name)
            .field("server_port", &self.server_port)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("url_scheme", &self.url_scheme)
            .field("headers", &self.headers)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

/// パスを最初の `?` で (パス, クエリ) に分割する。`?` がなければクエリは空
pub fn split_path(path: &str) -> (&str, &str) {
    path.split_once('?').unwrap_or((path, ""))
}

/// オーソリティを最初の `:` で (ホスト, ポート) に分割する
///
/// オーソリティがなければ両方空、`:` がなければポートは空。
pub fn split_authority(authority: Option<&str>) -> (&str, &str) {
    match authority {
        Some(authority) => authority.split_once(':').unwrap_or((authority, "")),
        None => ("", ""),
    }
}

/// HTTPバージョンを `SERVER_PROTOCOL` の文字列へ変換する
pub fn server_protocol(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    }
}

/// 環境の構築器
///
/// 診断出力先とロガーはプロセス全体で共有し、各リクエストの環境へ参照を渡す。
#[derive(Clone)]
pub struct EnvironmentBuilder {
    errors: Arc<dyn ErrorSink>,
    logger: Logger,
    config: AdapterConfig,
}

impl EnvironmentBuilder {
    pub fn new(errors: Arc<dyn ErrorSink>, logger: Logger, config: AdapterConfig) -> Self {
        Self {
            errors,
            logger,
            config,
        }
    }

    /// 診断出力先
    pub fn errors(&self) -> &Arc<dyn ErrorSink> {
        &self.errors
    }

    /// リクエストから環境を構築する
    ///
    /// 失敗することはなく、不正な値は空文字列または未設定として扱う。
    pub fn build(&self, mut request: Request) -> Environment {
        let (request_path, query_string) = split_path(&request.path);
        let request_path = request_path.to_string();
        let query_string = query_string.to_string();
        let (server_name, server_port) = split_authority(request.authority.as_deref());
        let server_name = server_name.to_string();
        let server_port = server_port.to_string();

        // Content-Typeは独立したフィールドとし、HTTP_CONTENT_TYPEとの重複を避ける
        // 複数ある場合は他のヘッダーと同じく `;` で連結する
        let content_type = request.content_type().map(Cow::into_owned);
        request.headers.remove(CONTENT_TYPE);

        let body = request.body.take();
        // 長さ不明のボディは "0" にせず未設定のままにする
        let content_length = body.as_ref().and_then(|b| b.length()).map(|len| len.to_string());

        let mut headers = HeaderFields::new();
        project_headers(&request.headers, &mut headers);

        if !server_name.is_empty() {
            headers.insert_if_absent(keys::HTTP_HOST, &server_name);
        }
        if !request.scheme.is_empty() {
            headers.insert_if_absent(keys::HTTP_X_FORWARDED_PROTO, &request.scheme);
        }

        let remote_addr = request
            .remote_addr
            .as_ref()
            .and_then(|addr| addr.ip())
            .map(|ip| ip.to_string());

        debug!(
            "Built environment for {} {} ({} header fields)",
            request.method,
            request.path,
            headers.len()
        );

        Environment {
            request_method: request.method.to_string(),
            script_name: String::new(),
            path_info: request_path.clone(),
            request_path,
            request_uri: request.path.clone(),
            query_string,
            server_protocol: server_protocol(request.version).to_string(),
            server_name,
            server_port,
            content_type,
            content_length,
            remote_addr,
            url_scheme: request.scheme.clone(),
            protocol: request.protocol.clone().unwrap_or_default(),
            multithread: self.config.multithread,
            multiprocess: self.config.multiprocess,
            run_once: self.config.run_once,
            headers,
            input: InputStream::new(body),
            errors: self.errors.clone(),
            logger: self.logger.clone(),
            request: request.head(),
        }
    }
}
