//! 診断出力先（`rack.errors`）と障害記録

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use log::error;
use serde::Serialize;

use crate::error::Error;
use super::http::RequestHead;
use super::utils::get_error_log_path;

/// 診断出力先
///
/// 複数リクエストから同時に書き込まれても行が混ざらないこと。
#[cfg_attr(test, mockall::automock)]
pub trait ErrorSink: Send + Sync {
    /// 1レコード（1行）を追記する
    fn write_record(&self, record: &str);
}

/// 標準エラー出力への出力先
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl ErrorSink for StderrSink {
    fn write_record(&self, record: &str) {
        // ロックを取って1行まとめて書き込む
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{}", record);
    }
}

/// ファイルへ追記する出力先
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSink {
    /// 指定パスへ追記する出力先を作成
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// `RACKBRIDGE_ERROR_LOG` 環境変数のパスへ追記する出力先を作成
    pub fn from_env() -> Self {
        Self::new(get_error_log_path())
    }

    /// 出力先パス
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ErrorSink for FileSink {
    fn write_record(&self, record: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC");
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(mut file) => {
                let line = format!("[{}] pid={} {}\n", timestamp, std::process::id(), record);
                if let Err(e) = file.write_all(line.as_bytes()) {
                    error!("Failed to append to {}: {}", self.path.display(), e);
                }
            }
            Err(e) => error!("Failed to open {}: {}", self.path.display(), e),
        }
    }
}

/// メモリ上に記録を保持する出力先
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録済みレコードの複製
    pub fn records(&self) -> Vec<String> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for MemorySink {
    fn write_record(&self, record: &str) {
        let mut records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(record.to_string());
    }
}

/// 障害1件分の記録
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub timestamp: String,
    pub kind: String,
    pub message: String,
    pub method: String,
    pub path: String,
}

impl FailureRecord {
    /// エラーとリクエスト情報から記録を作成
    pub fn new(err: &Error, request: &RequestHead) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind: err.kind().to_string(),
            message: err.to_string(),
            method: request.method.to_string(),
            path: request.path.clone(),
        }
    }

    /// JSON1行に整形する
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!("{} {} {}: {}", self.method, self.path, self.kind, self.message)
        })
    }
}
