//! 構造化HTTPとRack/CGI規約の変換（分割モジュール）
//!
//! # 処理の流れ
//! ```text
//! Request
//!     → rewindable.rs（必要ならボディを巻き戻し可能に）
//!     → environment.rs（headers.rs で HTTP_* を展開し、環境を構築）
//!     → アプリケーション呼び出し（core.rs）
//!     → response.rs（三つ組をレスポンスへ包む／失敗をエラーレスポンスへ）
//! ```

pub mod core;
pub mod environment;
pub mod headers;
pub mod input;
pub mod response;
pub mod rewindable;

pub use environment::{keys, split_authority, split_path, Environment, EnvironmentBuilder};
pub use headers::{http_key, project_headers, HeaderFields};
pub use input::InputStream;
pub use response::{failure_response, wrap_response, LegacyResult, HOP_HEADERS};
pub use rewindable::{make_rewindable, needs_rewind, Rewindable};
