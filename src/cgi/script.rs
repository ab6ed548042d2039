//! CGIスクリプトの起動と入出力

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};

use crate::adapter::{Environment, InputStream, LegacyResult};
use crate::common::{get_cgi_timeout, get_max_output_size, Application};
use crate::error::Error;
use super::redact::describe_vars;
use super::response::parse_cgi_output;

/// 子プロセスへ渡す `SERVER_SOFTWARE`
pub const SERVER_SOFTWARE: &str = concat!("rackbridge/", env!("CARGO_PKG_VERSION"));

/// 子プロセスへ渡さない環境変数
///
/// `HTTP_PROXY` はクライアントの `Proxy:` ヘッダーから作られるが、
/// 子プロセス内のHTTPクライアントがプロキシ設定として読んでしまう（httpoxy）。
pub const EXCLUDED_CHILD_VARS: &[&str] = &["HTTP_PROXY"];

/// 子プロセスへ渡す変数だけを取り出す
pub(crate) fn child_vars(vars: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    vars.iter()
        .filter(|(k, _)| !EXCLUDED_CHILD_VARS.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), v.as_str()))
}

/// 外部CGIスクリプトを実行するアプリケーション
#[derive(Debug, Clone)]
pub struct CgiScript {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    timeout: Duration,
    working_dir: Option<PathBuf>,
    max_output_size: usize,
}

impl CgiScript {
    /// 実行ファイルを指定して作成（タイムアウトと出力上限は環境変数から）
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            timeout: get_cgi_timeout(),
            working_dir: None,
            max_output_size: get_max_output_size(),
        }
    }

    /// 引数を追加
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// 追加の環境変数を設定（リクエスト由来の値より優先）
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// 実行タイムアウトを設定
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 作業ディレクトリを設定
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// 標準出力・標準エラー出力の上限（バイト）を設定
    pub fn with_max_output_size(mut self, size: usize) -> Self {
        self.max_output_size = size;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// スクリプトを実行し、終了ステータスと標準出力・標準エラー出力を返す
    async fn run(
        &self,
        vars: &[(String, String)],
        input: &mut InputStream,
    ) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), Error> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env_clear()
            .envs(child_vars(vars))
            .env("GATEWAY_INTERFACE", "CGI/1.1")
            .env("SERVER_SOFTWARE", SERVER_SOFTWARE)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            Error::CgiScriptError(format!("failed to spawn {}: {}", self.program.display(), e))
        })?;
        debug!("Spawned CGI script {} (pid {:?})", self.program.display(), child.id());

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::CgiScriptError("unable to capture script stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::CgiScriptError("unable to capture script stderr".to_string()))?;

        let limit = self.max_output_size;
        let io = async {
            let (_, stdout, stderr) = tokio::try_join!(
                feed_stdin(stdin, input),
                read_bounded(stdout, limit),
                read_bounded(stderr, limit)
            )?;
            let status = child.wait().await?;
            Ok::<_, Error>((status, stdout, stderr))
        };

        match tokio::time::timeout(self.timeout, io).await {
            Ok(result) => result,
            // タイムアウト時の子プロセスは kill_on_drop で終了させる
            Err(_) => Err(Error::Timeout(format!(
                "{} did not finish within {:?}",
                self.program.display(),
                self.timeout
            ))),
        }
    }
}

/// リクエストボディを子プロセスの標準入力へ流し込み、最後に閉じる
///
/// スクリプトが入力を読まずに終了した場合の BrokenPipe は無視する。
async fn feed_stdin(stdin: Option<ChildStdin>, input: &mut InputStream) -> Result<(), Error> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    while let Some(chunk) = input.next_chunk().await? {
        if let Err(e) = stdin.write_all(&chunk).await {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                debug!("CGI script closed stdin early");
                return Ok(());
            }
            return Err(e.into());
        }
    }
    drop(stdin);
    Ok(())
}

/// 上限付きで最後まで読み込む
pub(crate) async fn read_bounded<R>(reader: R, limit: usize) -> Result<Vec<u8>, Error>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut buf)
        .await?;
    if buf.len() > limit {
        return Err(Error::CgiScriptError(format!(
            "script output exceeds {} bytes",
            limit
        )));
    }
    Ok(buf)
}

#[async_trait]
impl Application for CgiScript {
    async fn call(&self, env: &mut Environment) -> Result<LegacyResult, Error> {
        let vars = env.to_vars();
        let logger = env.logger.clone();

        let outcome = self.run(&vars, &mut env.input).await;
        let (status, stdout, stderr) = match outcome {
            Ok(output) => output,
            Err(e) => {
                logger.error(&format!(
                    "CGI script {} failed: {}\n{}",
                    self.program.display(),
                    e,
                    describe_vars(&vars)
                ));
                return Err(e);
            }
        };

        for line in String::from_utf8_lossy(&stderr).lines() {
            logger.warn(&format!("[{}] {}", self.program.display(), line));
        }

        if !status.success() {
            if stdout.is_empty() {
                return Err(Error::CgiScriptError(format!(
                    "{} exited with {} and produced no output",
                    self.program.display(),
                    status
                )));
            }
            warn!("CGI script {} exited with {}", self.program.display(), status);
        }

        parse_cgi_output(&stdout)
    }
}
