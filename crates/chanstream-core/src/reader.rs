//! get 側: refill（underflow）
//!
//! ## 状態遷移
//!
//! ```text
//! Empty ──refill(n > 0)──> HasData ──consume で pos == end──> Empty
//!   └──refill(n <= 0)──> Empty（終端を報告）
//! ```

use alloc::string::String;

use crate::buffer::NativeBuffer;
use crate::channel::ReadableChannel;
use crate::config::{ReadFailurePolicy, StreamConfig};
use crate::error::StreamError;
use crate::stats::ReadStats;

/// 読み込み可能チャンネルの上のバッファ付きリーダー
///
/// ウィンドウ `[pos, end)` に未読データがある間は境界を越えない。
/// 空になったときだけ、バッファ全体のリージョンで `read` を一回呼ぶ。
pub struct ChannelReader<R> {
    channel: R,
    buffer: NativeBuffer,
    /// 次に返すバイトの位置
    pos: usize,
    /// 有効データの終端
    end: usize,
    policy: ReadFailurePolicy,
    /// EndOfStream 方針で吸収した最後の例外
    last_fault: Option<String>,
    stats: ReadStats,
}

impl<R: ReadableChannel> ChannelReader<R> {
    /// リーダーを生成する。最初の読み込みで必ず refill が走る。
    pub fn new(channel: R, config: &StreamConfig) -> Result<Self, StreamError> {
        let buffer = NativeBuffer::new(config.buffer_size)?;
        Ok(ChannelReader {
            channel,
            buffer,
            pos: 0,
            end: 0,
            policy: config.read_failure,
            last_fault: None,
            stats: ReadStats::default(),
        })
    }

    /// 次のバイトを消費せずに返す。`None` は終端。
    ///
    /// ウィンドウが空のときだけ境界呼び出しを行う。
    pub fn underflow(&mut self) -> Result<Option<u8>, StreamError> {
        if self.pos < self.end {
            return Ok(Some(self.buffer.bytes()[self.pos]));
        }
        if self.refill()? == 0 {
            return Ok(None);
        }
        Ok(Some(self.buffer.bytes()[self.pos]))
    }

    /// 次のバイトを読んで消費する。`None` は終端。
    pub fn read_byte(&mut self) -> Result<Option<u8>, StreamError> {
        let byte = self.underflow()?;
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    /// 未読ウィンドウを返す。空ならまず refill する。空スライスは終端。
    pub fn fill_buf(&mut self) -> Result<&[u8], StreamError> {
        if self.pos >= self.end {
            self.refill()?;
        }
        Ok(&self.buffer.bytes()[self.pos..self.end])
    }

    /// ウィンドウを `amt` バイト進める（ウィンドウ長で頭打ち）
    pub fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.end);
    }

    /// `dst` にコピーして読んだバイト数を返す。0 は終端。
    ///
    /// 境界呼び出しは最大一回。
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize, StreamError> {
        if dst.is_empty() {
            return Ok(0);
        }
        let window = self.fill_buf()?;
        let n = window.len().min(dst.len());
        dst[..n].copy_from_slice(&window[..n]);
        self.consume(n);
        Ok(n)
    }

    /// 現在ウィンドウに残っている未読バイト数
    pub fn available(&self) -> usize {
        self.end - self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// EndOfStream 方針で終端に置き換えた最後の例外
    pub fn last_fault(&self) -> Option<&str> {
        self.last_fault.as_deref()
    }

    pub fn take_fault(&mut self) -> Option<String> {
        self.last_fault.take()
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    pub fn get_ref(&self) -> &R {
        &self.channel
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.channel
    }

    /// チャンネルを取り出す。未読ウィンドウは捨てる。
    pub fn into_inner(self) -> R {
        self.channel
    }

    /// 境界を越えてバッファ全体を読み直す。新しいウィンドウ長を返す（0 は終端）。
    fn refill(&mut self) -> Result<usize, StreamError> {
        let capacity = self.buffer.capacity();
        let outcome = self.channel.read(self.buffer.fill_region());
        self.stats.refills += 1;
        self.pos = 0;
        self.end = 0;

        match outcome {
            Ok(n) if n > 0 => {
                let n_bytes = n as usize;
                if n_bytes > capacity {
                    return Err(StreamError::InvalidCount { returned: n, capacity });
                }
                self.end = n_bytes;
                self.stats.bytes_read += n_bytes as u64;
                tracing::trace!(bytes = n_bytes, "refilled read window");
                Ok(n_bytes)
            }
            Ok(status) => {
                tracing::trace!(status, "channel reported end of data");
                self.stats.end_of_stream += 1;
                Ok(0)
            }
            Err(err) => {
                self.stats.faults += 1;
                match self.policy {
                    ReadFailurePolicy::Propagate => Err(err),
                    ReadFailurePolicy::EndOfStream => {
                        tracing::warn!(error = %err, "read failure reported as end of stream");
                        self.stats.end_of_stream += 1;
                        self.last_fault = Some(match err {
                            StreamError::ChannelFault(msg) => msg,
                            other => alloc::string::ToString::to_string(&other),
                        });
                        Ok(0)
                    }
                }
            }
        }
    }
}
