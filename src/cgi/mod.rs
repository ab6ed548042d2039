//! 外部CGIスクリプトをレガシーアプリケーションとして実行するモジュール
//!
//! 環境を子プロセスの環境変数へ、`rack.input` を標準入力へ渡し、
//! 標準出力（`Status:` 行、ヘッダー、空行、ボディ）を三つ組へ変換します。

pub mod redact;
pub mod response;
pub mod script;
pub mod validation;

pub use response::parse_cgi_output;
pub use script::{CgiScript, SERVER_SOFTWARE};

#[cfg(test)]
mod tests;
