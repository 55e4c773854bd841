//! put 側: drain-on-full / flush-buffer / sync
//!
//! ## 状態遷移
//!
//! ```text
//! Empty ──write──> HasData ──pos == capacity──> drain ──> Empty
//!                     └──sync──> flush ──> Empty
//! ```
//!
//! 書き込み開始位置は常にバッファ先頭（0）。送信待ちは `[0, pos)`。

use crate::buffer::NativeBuffer;
use crate::channel::WritableChannel;
use crate::config::{ShortWritePolicy, StreamConfig};
use crate::error::StreamError;
use crate::stats::WriteStats;

/// flush_buffer の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// flush 開始時の送信待ちバイト数
    pub pending: usize,
    /// チャンネルが受け付けたバイト数
    pub accepted: usize,
}

impl FlushReport {
    /// 送信待ちがすべて受け付けられたか
    pub fn is_complete(&self) -> bool {
        self.accepted >= self.pending
    }
}

/// 書き込み可能チャンネルの上のバッファ付きライター
///
/// drop 時に flush は行わない。未送信データを失いたくなければ
/// 破棄の前に [`ChannelWriter::sync`] を呼ぶこと。
pub struct ChannelWriter<W: WritableChannel> {
    channel: W,
    buffer: NativeBuffer,
    /// 次に書き込む位置（= 送信待ちバイト数）
    pos: usize,
    policy: ShortWritePolicy,
    stats: WriteStats,
}

impl<W: WritableChannel> ChannelWriter<W> {
    /// ライターを生成する。カーソルはバッファ全体を覆う。
    pub fn new(channel: W, config: &StreamConfig) -> Result<Self, StreamError> {
        let buffer = NativeBuffer::new(config.buffer_size)?;
        Ok(ChannelWriter {
            channel,
            buffer,
            pos: 0,
            policy: config.short_write,
            stats: WriteStats::default(),
        })
    }

    /// 1 バイト書き込む
    ///
    /// カーソルが公称容量に達したら、その場で drain する。バイトを格納した後の
    /// drain 失敗はこの呼び出しでは返さず、次の `write_byte` / `write` / `sync` で
    /// 表面化する。`Err` が返るのはバイトを格納していないときだけなので、
    /// 呼び出し側は同じバイトで再試行してよい。
    pub fn write_byte(&mut self, byte: u8) -> Result<(), StreamError> {
        if self.pos >= self.buffer.capacity() {
            // 直前の drain が失敗して満杯のまま残っている。格納前に drain し直す
            self.flush_buffer()?;
        }
        self.buffer.bytes_mut()[self.pos] = byte;
        self.pos += 1;
        if self.pos == self.buffer.capacity() {
            if let Err(err) = self.flush_buffer() {
                self.note_deferred_failure(&err, 1);
            }
        }
        Ok(())
    }

    /// バイト列を書き込み、バッファに取り込んだバイト数を返す
    ///
    /// バッファが埋まるたびに drain する。途中で drain に失敗した場合、
    /// それまでに取り込んだ分があればその数を返し、なければエラーを返す。
    pub fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        let capacity = self.buffer.capacity();
        let mut written = 0;

        while written < data.len() {
            if self.pos >= capacity {
                if let Err(err) = self.flush_buffer() {
                    if written == 0 {
                        return Err(err);
                    }
                    self.note_deferred_failure(&err, written);
                    return Ok(written);
                }
                // Rebuffer/Retry で残りが詰め直された場合も空きはできている
                if self.pos >= capacity {
                    return if written > 0 {
                        Ok(written)
                    } else {
                        Err(StreamError::BufferFull { capacity })
                    };
                }
            }
            let n = (capacity - self.pos).min(data.len() - written);
            self.buffer.bytes_mut()[self.pos..self.pos + n]
                .copy_from_slice(&data[written..written + n]);
            self.pos += n;
            written += n;

            if self.pos == capacity {
                if let Err(err) = self.flush_buffer() {
                    self.note_deferred_failure(&err, written);
                    return Ok(written);
                }
            }
        }
        Ok(written)
    }

    /// 満杯時の drain
    ///
    /// `c` が `Some` ならカーソル位置に格納して 1 進める（予備スロットを使うことがある）。
    /// その後 flush_buffer し、成功すれば `c` をそのまま返す。
    pub fn overflow(&mut self, c: Option<u8>) -> Result<Option<u8>, StreamError> {
        if let Some(byte) = c {
            let capacity = self.buffer.capacity();
            if self.pos > capacity {
                // 予備スロットも未送信データで埋まっている
                return Err(StreamError::BufferFull { capacity });
            }
            self.buffer.bytes_mut()[self.pos] = byte;
            self.pos += 1;
        }
        self.flush_buffer()?;
        Ok(c)
    }

    /// 送信待ち `[0, pos)` をチャンネルに書き出す
    ///
    /// 送信待ちが公称容量ちょうどならバッファ全体のリージョン（生成済みの記述子を
    /// 使い回せる）、それ以外は部分リージョンを渡す。short write の扱いは
    /// [`ShortWritePolicy`] に従う。
    pub fn flush_buffer(&mut self) -> Result<FlushReport, StreamError> {
        let pending = self.pos;
        if pending == 0 {
            return Ok(FlushReport { pending: 0, accepted: 0 });
        }
        self.stats.flushes += 1;

        let result = match self.policy {
            ShortWritePolicy::Discard => self.flush_discard(pending),
            ShortWritePolicy::Rebuffer => self.flush_once(pending),
            ShortWritePolicy::Retry => self.flush_retry(pending),
        };
        if let Ok(report) = &result {
            tracing::trace!(pending = report.pending, accepted = report.accepted, "flushed write buffer");
        }
        result
    }

    /// 送信待ちがあれば flush する。なければ何もしない。
    pub fn sync(&mut self) -> Result<(), StreamError> {
        if self.pos == 0 {
            return Ok(());
        }
        self.flush_buffer().map(|_| ())
    }

    /// 送信待ちバイト数
    pub fn pending(&self) -> usize {
        self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// 送信待ちデータ（テスト・診断用）
    pub fn buffered(&self) -> &[u8] {
        &self.buffer.bytes()[..self.pos]
    }

    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    pub fn get_ref(&self) -> &W {
        &self.channel
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.channel
    }

    /// 互換動作: 受付数に関わらず pending 分巻き戻す
    fn flush_discard(&mut self, pending: usize) -> Result<FlushReport, StreamError> {
        let outcome = self.call_write(0, pending);
        self.pos = 0;
        let accepted = match outcome {
            Ok(n) => n,
            Err(err) => {
                self.stats.bytes_dropped += pending as u64;
                tracing::warn!(pending, dropped = pending, error = %err, "write failed: pending bytes discarded");
                return Err(err);
            }
        };
        if accepted < pending {
            let dropped = pending - accepted;
            self.stats.bytes_dropped += dropped as u64;
            tracing::warn!(pending, accepted, dropped, "short write: unaccepted bytes discarded");
        }
        Ok(FlushReport { pending, accepted })
    }

    /// write は一回。残りは先頭に詰め直してエラー
    fn flush_once(&mut self, pending: usize) -> Result<FlushReport, StreamError> {
        let accepted = self.call_write(0, pending)?;
        self.retain_tail(accepted, pending);
        if accepted < pending {
            return Err(StreamError::ShortWrite { pending, accepted });
        }
        Ok(FlushReport { pending, accepted })
    }

    /// 受付 0 以下になるまで残りを書き出す
    fn flush_retry(&mut self, pending: usize) -> Result<FlushReport, StreamError> {
        let mut accepted = 0;
        while accepted < pending {
            let n = match self.call_write(accepted, pending) {
                Ok(n) => n,
                Err(err) => {
                    self.retain_tail(accepted, pending);
                    return Err(err);
                }
            };
            if n == 0 {
                self.retain_tail(accepted, pending);
                return Err(StreamError::ShortWrite { pending, accepted });
            }
            accepted += n;
        }
        self.pos = 0;
        Ok(FlushReport { pending, accepted })
    }

    /// 取り込み済みのバイトがある呼び出しで drain に失敗した
    ///
    /// Discard ではデータが既に捨てられているので warn。それ以外は送信待ちに残っている。
    fn note_deferred_failure(&self, err: &StreamError, written: usize) {
        if self.policy == ShortWritePolicy::Discard {
            tracing::warn!(error = %err, written, "drain failed during write, buffered bytes discarded");
        } else {
            tracing::debug!(error = %err, written, pending = self.pos, "drain failed during write, deferred");
        }
    }

    /// `[start, end)` を一回書き出し、受付数（0 以上、リージョン長以下）を返す
    fn call_write(&mut self, start: usize, end: usize) -> Result<usize, StreamError> {
        let region = self.buffer.drain_region(start..end);
        let len = region.len();
        if region.is_whole_buffer() {
            self.stats.full_region_reuses += 1;
        } else {
            self.stats.transient_regions += 1;
        }
        self.stats.write_calls += 1;

        let n = self.channel.write(region)?;
        if n < 0 {
            return Ok(0);
        }
        let n_bytes = n as usize;
        if n_bytes > len {
            return Err(StreamError::InvalidCount { returned: n, capacity: len });
        }
        self.stats.bytes_written += n_bytes as u64;
        Ok(n_bytes)
    }

    /// 未受付の `[accepted, pending)` をバッファ先頭に詰める
    fn retain_tail(&mut self, accepted: usize, pending: usize) {
        if accepted > 0 {
            self.buffer.bytes_mut().copy_within(accepted..pending, 0);
        }
        self.pos = pending - accepted;
    }
}

impl<W: WritableChannel> Drop for ChannelWriter<W> {
    fn drop(&mut self) {
        if self.pos > 0 {
            tracing::warn!(pending = self.pos, "channel writer dropped with unflushed bytes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::DrainRegion;
    use alloc::collections::VecDeque;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;

    /// write 呼び出しを記録するチャンネル
    ///
    /// `limits` に値があれば、その呼び出しで受け付ける最大バイト数として使う。
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Vec<u8>, bool)>,
        limits: VecDeque<i32>,
        fail_next: bool,
    }

    impl WritableChannel for Recorder {
        fn write(&mut self, region: DrainRegion<'_>) -> Result<i32, StreamError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(StreamError::ChannelFault("channel closed".to_string()));
            }
            let limit = self.limits.pop_front();
            let accept = match limit {
                Some(l) if l < 0 => return Ok(l),
                Some(l) => (l as usize).min(region.len()),
                None => region.len(),
            };
            self.calls
                .push((region.as_slice()[..accept].to_vec(), region.is_whole_buffer()));
            Ok(accept as i32)
        }
    }

    fn writer(size: usize, policy: ShortWritePolicy) -> ChannelWriter<Recorder> {
        let config = StreamConfig::with_buffer_size(size).short_write(policy);
        ChannelWriter::new(Recorder::default(), &config).unwrap()
    }

    #[test]
    fn test_write_then_sync_issues_one_call() {
        let mut w = writer(16, ShortWritePolicy::Retry);
        w.write(b"hello").unwrap();
        assert!(w.get_ref().calls.is_empty(), "sync 前は境界を越えない");

        w.sync().unwrap();
        assert_eq!(w.get_ref().calls.len(), 1);
        assert_eq!(w.get_ref().calls[0].0, b"hello");
        assert!(!w.get_ref().calls[0].1, "部分 flush は一時リージョン");
        assert_eq!(w.pending(), 0);
    }

    #[test]
    fn test_sync_without_pending_is_noop() {
        let mut w = writer(16, ShortWritePolicy::Retry);
        w.sync().unwrap();
        assert!(w.get_ref().calls.is_empty());
        assert_eq!(w.stats().flushes, 0);
    }

    #[test]
    fn test_filling_to_capacity_drains_whole_buffer_once() {
        let mut w = writer(4, ShortWritePolicy::Retry);
        for b in 1..=4u8 {
            w.write_byte(b).unwrap();
        }
        let calls = &w.get_ref().calls;
        assert_eq!(calls.len(), 1, "ちょうど満杯で一回だけ drain");
        assert_eq!(calls[0].0, vec![1, 2, 3, 4]);
        assert!(calls[0].1, "満杯の flush は全体リージョンを使い回す");
        assert_eq!(w.pending(), 0);
        assert_eq!(w.stats().full_region_reuses, 1);
        assert_eq!(w.stats().transient_regions, 0);
    }

    #[test]
    fn test_overflow_uses_spare_slot() {
        let mut w = writer(3, ShortWritePolicy::Retry);
        w.write(b"ab").unwrap();
        // カーソルを容量ぴったりまで進めた状態を作る
        w.buffer.bytes_mut()[2] = b'c';
        w.pos = 3;
        assert_eq!(w.overflow(Some(b'd')).unwrap(), Some(b'd'));
        assert_eq!(w.get_ref().calls[0].0, b"abcd", "予備スロットの 1 バイトも送る");
        assert_eq!(w.pending(), 0);
    }

    #[test]
    fn test_overflow_none_only_flushes() {
        let mut w = writer(8, ShortWritePolicy::Retry);
        w.write(b"xy").unwrap();
        assert_eq!(w.overflow(None).unwrap(), None);
        assert_eq!(w.get_ref().calls[0].0, b"xy");
    }

    #[test]
    fn test_discard_resets_cursor_on_short_write() {
        let mut w = writer(8, ShortWritePolicy::Discard);
        w.get_mut().limits.push_back(2);
        w.write(b"abcde").unwrap();

        let report = w.flush_buffer().unwrap();
        assert_eq!(report, FlushReport { pending: 5, accepted: 2 });
        assert!(!report.is_complete());
        // 受け付けられなかった 3 バイトは捨てられ、カーソルは先頭に戻る
        assert_eq!(w.pending(), 0);
        assert_eq!(w.stats().bytes_dropped, 3);
        assert_eq!(w.get_ref().calls.len(), 1);
    }

    #[test]
    fn test_retry_sends_unaccepted_tail() {
        let mut w = writer(8, ShortWritePolicy::Retry);
        w.get_mut().limits.extend([2, 2]);
        w.write(b"abcde").unwrap();

        let report = w.flush_buffer().unwrap();
        assert_eq!(report, FlushReport { pending: 5, accepted: 5 });
        let sent: Vec<Vec<u8>> = w.get_ref().calls.iter().map(|c| c.0.clone()).collect();
        assert_eq!(sent, vec![b"ab".to_vec(), b"cd".to_vec(), b"e".to_vec()]);
        assert_eq!(w.pending(), 0);
    }

    #[test]
    fn test_retry_stops_on_stalled_channel() {
        let mut w = writer(8, ShortWritePolicy::Retry);
        w.get_mut().limits.extend([3, 0]);
        w.write(b"abcdef").unwrap();

        let err = w.flush_buffer().unwrap_err();
        assert_eq!(err, StreamError::ShortWrite { pending: 6, accepted: 3 });
        assert_eq!(w.buffered(), b"def", "未受付分は先頭に詰め直される");

        // 次の sync で残りが送られる
        w.sync().unwrap();
        assert_eq!(w.get_ref().calls.last().unwrap().0, b"def");
        assert_eq!(w.pending(), 0);
    }

    #[test]
    fn test_rebuffer_single_call_keeps_tail() {
        let mut w = writer(8, ShortWritePolicy::Rebuffer);
        w.get_mut().limits.push_back(1);
        w.write(b"xyz").unwrap();

        assert_eq!(
            w.sync(),
            Err(StreamError::ShortWrite { pending: 3, accepted: 1 })
        );
        assert_eq!(w.get_ref().calls.len(), 1, "Rebuffer は再送しない");
        assert_eq!(w.buffered(), b"yz");
    }

    #[test]
    fn test_negative_write_counts_as_nothing_accepted() {
        let mut w = writer(8, ShortWritePolicy::Rebuffer);
        w.get_mut().limits.push_back(-1);
        w.write(b"ab").unwrap();
        assert_eq!(
            w.sync(),
            Err(StreamError::ShortWrite { pending: 2, accepted: 0 })
        );
        assert_eq!(w.buffered(), b"ab");
    }

    #[test]
    fn test_fault_keeps_data_unless_discard() {
        let mut w = writer(8, ShortWritePolicy::Retry);
        w.write(b"keep").unwrap();
        w.get_mut().fail_next = true;
        assert!(matches!(w.sync(), Err(StreamError::ChannelFault(_))));
        assert_eq!(w.buffered(), b"keep");

        let mut d = writer(8, ShortWritePolicy::Discard);
        d.write(b"lost").unwrap();
        d.get_mut().fail_next = true;
        assert!(matches!(d.sync(), Err(StreamError::ChannelFault(_))));
        assert_eq!(d.pending(), 0, "Discard は例外時も巻き戻す");
    }

    #[test]
    fn test_bulk_write_larger_than_buffer() {
        let mut w = writer(4, ShortWritePolicy::Retry);
        let n = w.write(b"0123456789").unwrap();
        assert_eq!(n, 10);
        w.sync().unwrap();
        let sent: Vec<u8> = w.get_ref().calls.iter().flat_map(|c| c.0.clone()).collect();
        assert_eq!(sent, b"0123456789");
        // 4 + 4 が全体リージョン、残り 2 が一時リージョン
        assert_eq!(w.stats().full_region_reuses, 2);
        assert_eq!(w.stats().transient_regions, 1);
    }

    #[test]
    fn test_write_byte_stall_defers_error_without_duplicate() {
        let mut w = writer(4, ShortWritePolicy::Retry);
        w.get_mut().limits.push_back(0);
        for b in *b"abcd" {
            // 満杯時の drain は受付 0 で失敗するが、'd' は格納済みなので Ok
            w.write_byte(b).unwrap();
        }
        assert_eq!(w.buffered(), b"abcd");

        w.write_byte(b'e').unwrap();
        w.sync().unwrap();
        let sent: Vec<u8> = w.get_ref().calls.iter().flat_map(|c| c.0.clone()).collect();
        assert_eq!(sent, b"abcde", "同じバイトが二度送られない");
    }

    #[test]
    fn test_write_byte_retry_after_error_is_safe() {
        let mut w = writer(2, ShortWritePolicy::Rebuffer);
        w.get_mut().limits.extend([0, 0]);
        w.write_byte(b'a').unwrap();
        w.write_byte(b'b').unwrap();
        assert_eq!(w.pending(), 2);

        // 満杯のまま: 格納前の drain が失敗し、'c' は取り込まれない
        assert_eq!(
            w.write_byte(b'c'),
            Err(StreamError::ShortWrite { pending: 2, accepted: 0 })
        );
        assert_eq!(w.buffered(), b"ab");

        w.write_byte(b'c').unwrap();
        w.sync().unwrap();
        let sent: Vec<u8> = w.get_ref().calls.iter().flat_map(|c| c.0.clone()).collect();
        assert_eq!(sent, b"abc");
    }

    #[test]
    fn test_discard_counts_bytes_lost_to_raised_write() {
        let mut w = writer(4, ShortWritePolicy::Discard);
        w.get_mut().fail_next = true;
        // 満杯時の drain が例外。取り込んだ分は Ok で返るが、捨てた分は記録される
        assert_eq!(w.write(b"abcd"), Ok(4));
        assert_eq!(w.pending(), 0);
        assert_eq!(w.stats().bytes_dropped, 4);

        w.write(b"xy").unwrap();
        w.get_mut().fail_next = true;
        assert!(matches!(w.sync(), Err(StreamError::ChannelFault(_))));
        assert_eq!(w.stats().bytes_dropped, 6);
    }

    #[test]
    fn test_drop_does_not_flush() {
        let mut rec = Recorder::default();
        {
            let config = StreamConfig::with_buffer_size(8);
            let mut w = ChannelWriter::new(&mut rec, &config).unwrap();
            w.write(b"unsent").unwrap();
        }
        assert!(rec.calls.is_empty(), "drop で暗黙の flush をしない");
    }
}
