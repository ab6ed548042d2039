//! `rack.input` に相当する入力ストリーム

use bytes::{Bytes, BytesMut};

use crate::common::Body;
use crate::error::Error;

/// リクエストボディを読み出す入力ストリーム
///
/// 基本は一度きりの読み出しで、ボディが巻き戻し可能な場合のみ `rewind` できる。
#[derive(Debug, Default)]
pub struct InputStream {
    body: Option<Body>,
    buffer: BytesMut,
    finished: bool,
}

impl InputStream {
    /// ボディから入力ストリームを作成（`None` は空入力）
    pub fn new(body: Option<Body>) -> Self {
        Self {
            body,
            buffer: BytesMut::new(),
            finished: false,
        }
    }

    /// 空の入力ストリーム
    pub fn empty() -> Self {
        Self::new(None)
    }

    /// ボディの全長（不明またはボディなしは `None`）
    pub fn length(&self) -> Option<u64> {
        self.body.as_ref().and_then(Body::length)
    }

    /// 巻き戻し可能かどうか
    pub fn is_rewindable(&self) -> bool {
        self.body.as_ref().map_or(false, Body::is_rewindable)
    }

    /// クローズ済みかどうか
    pub fn is_closed(&self) -> bool {
        self.body.as_ref().map_or(false, Body::is_closed)
    }

    /// ボディを取り出す（以後この入力は空になる）
    pub fn take_body(&mut self) -> Option<Body> {
        self.buffer.clear();
        self.finished = true;
        self.body.take()
    }

    /// 上流から1チャンク読み込んでバッファへ追加する。終端なら `false`
    async fn fill(&mut self) -> Result<bool, Error> {
        if self.finished {
            return Ok(false);
        }
        let chunk = match self.body.as_mut() {
            Some(body) => body.read_chunk().await?,
            None => None,
        };
        match chunk {
            Some(chunk) => {
                self.buffer.extend_from_slice(&chunk);
                Ok(true)
            }
            None => {
                self.finished = true;
                Ok(false)
            }
        }
    }

    /// 読み込み
    ///
    /// - `None`: 残り全体を返す（終端では空）
    /// - `Some(n)`: 最大 `n` バイトを返す（終端では `None`）
    pub async fn read(&mut self, length: Option<usize>) -> Result<Option<Bytes>, Error> {
        match length {
            None => {
                while self.fill().await? {}
                Ok(Some(self.buffer.split().freeze()))
            }
            Some(0) => Ok(Some(Bytes::new())),
            Some(n) => {
                while self.buffer.len() < n && self.fill().await? {}
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let take = n.min(self.buffer.len());
                Ok(Some(self.buffer.split_to(take).freeze()))
            }
        }
    }

    /// 残り全体を読み込む
    pub async fn read_to_end(&mut self) -> Result<Bytes, Error> {
        Ok(self.read(None).await?.unwrap_or_default())
    }

    /// 改行まで（改行を含む）を1行として読み込む。終端では `None`
    pub async fn gets(&mut self) -> Result<Option<Bytes>, Error> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                return Ok(Some(self.buffer.split_to(pos + 1).freeze()));
            }
            if !self.fill().await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.buffer.split().freeze()));
            }
        }
    }

    /// 次のチャンクを読み込む（`each` 相当）。終端では `None`
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.buffer.split().freeze()));
        }
        if self.fill().await? {
            Ok(Some(self.buffer.split().freeze()))
        } else {
            Ok(None)
        }
    }

    /// 先頭へ巻き戻す。ボディが巻き戻し可能でなければ `false`
    pub fn rewind(&mut self) -> bool {
        let rewound = self.body.as_mut().map_or(false, Body::rewind);
        if rewound {
            self.buffer.clear();
            self.finished = false;
        }
        rewound
    }

    /// ボディを閉じる
    pub fn close(&mut self) {
        if let Some(body) = self.body.as_mut() {
            body.close();
        }
        self.buffer.clear();
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn streamed(parts: &[&'static str]) -> Body {
        let items: Vec<Result<Bytes, Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        Body::from_stream(stream::iter(items), None)
    }

    #[tokio::test]
    async fn test_read_with_length() {
        let mut input = InputStream::new(Some(streamed(&["hel", "lo wor", "ld"])));
        assert_eq!(input.read(Some(5)).await.unwrap(), Some(Bytes::from("hello")));
        assert_eq!(input.read(Some(100)).await.unwrap(), Some(Bytes::from(" world")));
        assert_eq!(input.read(Some(1)).await.unwrap(), None);
        // 長さ指定なしは終端で空を返す
        assert_eq!(input.read(None).await.unwrap(), Some(Bytes::new()));
    }

    #[tokio::test]
    async fn test_gets_splits_lines() {
        let mut input = InputStream::new(Some(streamed(&["first\nsec", "ond\nlast"])));
        assert_eq!(input.gets().await.unwrap(), Some(Bytes::from("first\n")));
        assert_eq!(input.gets().await.unwrap(), Some(Bytes::from("second\n")));
        assert_eq!(input.gets().await.unwrap(), Some(Bytes::from("last")));
        assert_eq!(input.gets().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rewind_requires_rewindable_body() {
        let mut input = InputStream::new(Some(Body::from("abc")));
        assert_eq!(input.read_to_end().await.unwrap(), Bytes::from("abc"));
        assert!(!input.rewind());
        assert_eq!(input.read_to_end().await.unwrap(), Bytes::new());

        let mut input = InputStream::new(Some(Body::rewindable(streamed(&["a", "bc"]))));
        assert_eq!(input.read(Some(2)).await.unwrap(), Some(Bytes::from("ab")));
        assert!(input.rewind());
        assert_eq!(input.read_to_end().await.unwrap(), Bytes::from("abc"));
    }

    #[tokio::test]
    async fn test_rewind_after_full_read_repeats() {
        let mut input = InputStream::new(Some(Body::rewindable(streamed(&["line1\n", "line2"]))));
        assert_eq!(input.gets().await.unwrap(), Some(Bytes::from("line1\n")));
        assert_eq!(input.read_to_end().await.unwrap(), Bytes::from("line2"));
        assert!(input.rewind());
        assert_eq!(input.gets().await.unwrap(), Some(Bytes::from("line1\n")));
        assert!(input.rewind());
        assert_eq!(input.read_to_end().await.unwrap(), Bytes::from("line1\nline2"));
        assert!(input.rewind());
        assert_eq!(input.read_to_end().await.unwrap(), Bytes::from("line1\nline2"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let mut input = InputStream::empty();
        assert_eq!(input.length(), None);
        assert_eq!(input.read(Some(10)).await.unwrap(), None);
        assert_eq!(input.next_chunk().await.unwrap(), None);
        assert!(!input.rewind());
    }

    #[tokio::test]
    async fn test_close_releases_body() {
        let mut input = InputStream::new(Some(Body::from("abc")));
        input.close();
        assert!(input.is_closed());
        assert_eq!(input.read(Some(1)).await.unwrap(), None);
    }
}
