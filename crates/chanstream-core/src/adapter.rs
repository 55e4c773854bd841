//! ChannelStreamAdapter: 能力判定に応じた 3 つの形
//!
//! | 判定結果 | 形 |
//! |---|---|
//! | 読み込みのみ | `Reader` |
//! | 書き込みのみ | `Writer` |
//! | 両方 | `Duplex`（方向ごとに別の NativeBuffer） |
//! | どちらもなし | `StreamError::UnsupportedChannelType` |

use crate::channel::{Capabilities, ChannelProbe, Probed, ReadableChannel, WritableChannel};
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::reader::ChannelReader;
use crate::stats::{ReadStats, StreamStats};
use crate::writer::ChannelWriter;

/// 外部チャンネル一つをバッファ付きストリームとして扱うアダプタ
pub enum ChannelStreamAdapter<R: ReadableChannel, W: WritableChannel> {
    Reader(ChannelReader<R>),
    Writer(ChannelWriter<W>),
    Duplex {
        reader: ChannelReader<R>,
        writer: ChannelWriter<W>,
    },
}

impl<R: ReadableChannel, W: WritableChannel> ChannelStreamAdapter<R, W> {
    /// 能力判定済みのゲートウェイからアダプタを生成する
    ///
    /// # エラー
    /// - `StreamError::UnsupportedChannelType`: 読み込みにも書き込みにも対応していない
    ///   （この場合バッファは確保しない）
    /// - `StreamError::InvalidBufferSize`: バッファサイズが範囲外
    pub fn open(probed: Probed<R, W>, config: &StreamConfig) -> Result<Self, StreamError> {
        if !probed.capabilities().is_supported() {
            return Err(StreamError::UnsupportedChannelType);
        }
        config.validate()?;

        let adapter = match (probed.readable, probed.writable) {
            (Some(r), Some(w)) => ChannelStreamAdapter::Duplex {
                reader: ChannelReader::new(r, config)?,
                writer: ChannelWriter::new(w, config)?,
            },
            (Some(r), None) => ChannelStreamAdapter::Reader(ChannelReader::new(r, config)?),
            (None, Some(w)) => ChannelStreamAdapter::Writer(ChannelWriter::new(w, config)?),
            (None, None) => return Err(StreamError::UnsupportedChannelType),
        };

        tracing::debug!(
            can_read = adapter.can_read(),
            can_write = adapter.can_write(),
            buffer_size = config.buffer_size,
            "opened channel stream"
        );
        Ok(adapter)
    }

    /// 型検査でチャンネルの能力を判定してからアダプタを生成する
    pub fn from_channel<P>(channel: &P, config: &StreamConfig) -> Result<Self, StreamError>
    where
        P: ChannelProbe<Readable = R, Writable = W>,
    {
        Self::open(channel.probe(), config)
    }

    pub fn can_read(&self) -> bool {
        self.reader().is_some()
    }

    pub fn can_write(&self) -> bool {
        self.writer().is_some()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_read: self.can_read(),
            can_write: self.can_write(),
        }
    }

    pub fn reader(&self) -> Option<&ChannelReader<R>> {
        match self {
            ChannelStreamAdapter::Reader(reader) => Some(reader),
            ChannelStreamAdapter::Duplex { reader, .. } => Some(reader),
            ChannelStreamAdapter::Writer(_) => None,
        }
    }

    pub fn reader_mut(&mut self) -> Option<&mut ChannelReader<R>> {
        match self {
            ChannelStreamAdapter::Reader(reader) => Some(reader),
            ChannelStreamAdapter::Duplex { reader, .. } => Some(reader),
            ChannelStreamAdapter::Writer(_) => None,
        }
    }

    pub fn writer(&self) -> Option<&ChannelWriter<W>> {
        match self {
            ChannelStreamAdapter::Writer(writer) => Some(writer),
            ChannelStreamAdapter::Duplex { writer, .. } => Some(writer),
            ChannelStreamAdapter::Reader(_) => None,
        }
    }

    pub fn writer_mut(&mut self) -> Option<&mut ChannelWriter<W>> {
        match self {
            ChannelStreamAdapter::Writer(writer) => Some(writer),
            ChannelStreamAdapter::Duplex { writer, .. } => Some(writer),
            ChannelStreamAdapter::Reader(_) => None,
        }
    }

    /// 次のバイトを消費せずに返す（`None` は終端）
    pub fn peek_byte(&mut self) -> Result<Option<u8>, StreamError> {
        self.reader_mut().ok_or(StreamError::NotReadable)?.underflow()
    }

    /// 次のバイトを読む（`None` は終端）
    pub fn read_byte(&mut self) -> Result<Option<u8>, StreamError> {
        self.reader_mut().ok_or(StreamError::NotReadable)?.read_byte()
    }

    /// `dst` に読み込んだバイト数を返す（0 は終端）
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize, StreamError> {
        self.reader_mut().ok_or(StreamError::NotReadable)?.read(dst)
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), StreamError> {
        self.writer_mut().ok_or(StreamError::NotWritable)?.write_byte(byte)
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        self.writer_mut().ok_or(StreamError::NotWritable)?.write(data)
    }

    /// 明示的な flush
    ///
    /// 読み込み専用のアダプタでは何もしない。
    pub fn sync(&mut self) -> Result<(), StreamError> {
        match self.writer_mut() {
            Some(writer) => writer.sync(),
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> StreamStats {
        let buffer_size = self
            .reader()
            .map(|r| r.capacity())
            .or_else(|| self.writer().map(|w| w.capacity()))
            .unwrap_or(0);
        StreamStats {
            capabilities: self.capabilities(),
            buffer_size,
            read: self.reader().map(|r| r.stats()).unwrap_or_default(),
            write: self.writer().map(|w| w.stats()).unwrap_or_default(),
        }
    }
}

impl<R: ReadableChannel, W: WritableChannel> core::fmt::Debug for ChannelStreamAdapter<R, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let read: Option<ReadStats> = self.reader().map(|r| r.stats());
        f.debug_struct("ChannelStreamAdapter")
            .field("capabilities", &self.capabilities())
            .field("read", &read)
            .field("pending_write", &self.writer().map(|w| w.pending()))
            .finish()
    }
}
