//! リクエスト/レスポンスボディの抽象化
//!
//! 全長が既知かどうか、一度しか読めないか巻き戻し可能か、を表現し、
//! チャンク単位で非同期に読み出す。

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::future::poll_fn;
use futures::stream::{BoxStream, Stream, StreamExt};

use crate::error::Error;

/// 巻き戻し可能ボディのバッファ状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindState {
    /// まだ上流から一度も読んでいない
    Unbuffered,
    /// 上流から読みながらキャッシュしている途中
    Buffering,
    /// 上流を読み切り、全データがキャッシュ済み
    Cached,
}

/// 上流ボディを遅延的に読み込み、先頭からの再読込を可能にするラッパー
struct Rewindable {
    source: Box<Body>,
    chunks: Vec<Bytes>,
    index: usize,
    state: RewindState,
    length: Option<u64>,
}

impl Rewindable {
    fn new(source: Body) -> Self {
        let length = source.length();
        Self {
            source: Box::new(source),
            chunks: Vec::new(),
            index: 0,
            state: RewindState::Unbuffered,
            length,
        }
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, Error>>> {
        // キャッシュ済みの範囲はキャッシュから返す
        if let Some(chunk) = self.chunks.get(self.index) {
            self.index += 1;
            return Poll::Ready(Some(Ok(chunk.clone())));
        }

        if self.state == RewindState::Cached {
            return Poll::Ready(None);
        }

        match self.source.poll_chunk(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => {
                self.state = RewindState::Buffering;
                self.chunks.push(chunk.clone());
                self.index += 1;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => {
                // 上流は以後不要なので解放する
                self.source.close();
                self.state = RewindState::Cached;
                Poll::Ready(None)
            }
        }
    }

    fn rewind(&mut self) {
        self.index = 0;
    }
}

enum Kind {
    Empty,
    Full(Option<Bytes>),
    Chunks(VecDeque<Bytes>),
    Stream(BoxStream<'static, Result<Bytes, Error>>),
    Rewindable(Rewindable),
    Closed,
}

/// ボディ
pub struct Body {
    kind: Kind,
    length: Option<u64>,
}

impl Body {
    /// 空のボディを作成
    pub fn empty() -> Self {
        Self {
            kind: Kind::Empty,
            length: Some(0),
        }
    }

    /// メモリ上のバイト列からボディを作成（長さ既知、一度だけ読める）
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let length = Some(bytes.len() as u64);
        Self {
            kind: Kind::Full(Some(bytes)),
            length,
        }
    }

    /// 列挙可能なチャンク列からボディを作成（長さはチャンク合計）
    pub fn from_chunks<I, T>(chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        let chunks: VecDeque<Bytes> = chunks.into_iter().map(Into::into).collect();
        let length = chunks.iter().map(|c| c.len() as u64).sum();
        Self {
            kind: Kind::Chunks(chunks),
            length: Some(length),
        }
    }

    /// 任意のストリームからボディを作成
    ///
    /// `length` が `None` の場合、全長は不明として扱われる。
    pub fn from_stream<S>(stream: S, length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<Bytes, Error>> + Send + 'static,
    {
        Self {
            kind: Kind::Stream(stream.boxed()),
            length,
        }
    }

    /// ボディを巻き戻し可能なラッパーで包む（すでに巻き戻し可能ならそのまま）
    pub fn rewindable(body: Body) -> Self {
        if body.is_rewindable() {
            return body;
        }
        let rewindable = Rewindable::new(body);
        let length = rewindable.length;
        Self {
            kind: Kind::Rewindable(rewindable),
            length,
        }
    }

    /// 全長（不明な場合は `None`）
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// データを持たないことが構築時点で確定しているか
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::Empty)
    }

    /// 巻き戻し可能かどうか
    pub fn is_rewindable(&self) -> bool {
        matches!(self.kind, Kind::Rewindable(_))
    }

    /// クローズ済みかどうか
    pub fn is_closed(&self) -> bool {
        matches!(self.kind, Kind::Closed)
    }

    /// 巻き戻し可能ボディのバッファ状態
    pub fn rewind_state(&self) -> Option<RewindState> {
        match &self.kind {
            Kind::Rewindable(r) => Some(r.state),
            _ => None,
        }
    }

    /// 次のチャンクをポーリングする
    pub fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, Error>>> {
        match &mut self.kind {
            Kind::Empty => Poll::Ready(None),
            Kind::Full(bytes) => Poll::Ready(bytes.take().map(Ok)),
            Kind::Chunks(chunks) => Poll::Ready(chunks.pop_front().map(Ok)),
            Kind::Stream(stream) => stream.poll_next_unpin(cx),
            Kind::Rewindable(r) => r.poll_chunk(cx),
            Kind::Closed => Poll::Ready(Some(Err(Error::BodyClosed))),
        }
    }

    /// 次のチャンクを読み込む（終端では `None`）
    pub async fn read_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        poll_fn(|cx| self.poll_chunk(cx)).await.transpose()
    }

    /// 残りのデータをすべて読み込む
    pub async fn read_to_end(&mut self) -> Result<Bytes, Error> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.read_chunk().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer.freeze())
    }

    /// 読み込み位置を先頭に戻す。巻き戻し可能でなければ `false`
    pub fn rewind(&mut self) -> bool {
        match &mut self.kind {
            Kind::Rewindable(r) => {
                r.rewind();
                true
            }
            _ => false,
        }
    }

    /// ボディを閉じ、保持している上流とバッファを解放する
    pub fn close(&mut self) {
        if let Kind::Rewindable(r) = &mut self.kind {
            r.source.close();
        }
        self.kind = Kind::Closed;
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            Kind::Empty => "Empty",
            Kind::Full(_) => "Full",
            Kind::Chunks(_) => "Chunks",
            Kind::Stream(_) => "Stream",
            Kind::Rewindable(_) => "Rewindable",
            Kind::Closed => "Closed",
        };
        f.debug_struct("Body")
            .field("kind", &kind)
            .field("length", &self.length)
            .finish()
    }
}

impl Stream for Body {
    type Item = Result<Bytes, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_chunk(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::from_bytes(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::from_bytes(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::from_bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<Vec<String>> for Body {
    fn from(chunks: Vec<String>) -> Self {
        Body::from_chunks(chunks)
    }
}
