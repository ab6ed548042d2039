//! 共通の抽象化レイヤーとトレイト定義

pub mod body;
pub mod config;
pub mod http;
pub mod logger;
pub mod sink;
pub mod traits;
pub mod utils;

pub use self::body::{Body, RewindState};
pub use self::config::AdapterConfig;
pub use self::http::{RemoteAddr, Request, RequestHead, Response, UpgradeProtocol};
pub use self::logger::{Logger, DEFAULT_LOG_TARGET};
pub use self::sink::{ErrorSink, FailureRecord, FileSink, MemorySink, StderrSink};
pub use self::traits::{from_fn, Application, FnApplication, Middleware};
pub use self::utils::{get_cgi_timeout, get_error_log_path, get_max_output_size, init_logging};
