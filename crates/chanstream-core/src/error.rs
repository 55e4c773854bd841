//! ストリームエラー型

use alloc::string::String;

/// アダプタ操作のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// チャンネルが読み込みにも書き込みにも対応していない
    UnsupportedChannelType,
    /// バッファサイズが 0、または i32 の範囲を超えている
    InvalidBufferSize(usize),
    /// 境界呼び出しが例外を送出した（メッセージは向こう側のもの）
    ChannelFault(String),
    /// チャンネルがリージョン長を超えるバイト数を報告した
    InvalidCount {
        /// チャンネルの戻り値
        returned: i32,
        /// 渡したリージョンの長さ
        capacity: usize,
    },
    /// flush で一部のバイトしか受け付けられなかった
    ShortWrite {
        /// flush 開始時の送信待ちバイト数
        pending: usize,
        /// チャンネルが受け付けたバイト数
        accepted: usize,
    },
    /// オーバーフロー用の予備スロットまで送信待ちデータで埋まっている
    BufferFull {
        /// 公称バッファ容量
        capacity: usize,
    },
    /// 読み込み非対応のアダプタで get 側操作を呼んだ
    NotReadable,
    /// 書き込み非対応のアダプタで put 側操作を呼んだ
    NotWritable,
}

impl core::fmt::Display for StreamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StreamError::UnsupportedChannelType => {
                write!(f, "{}", crate::UNSUPPORTED_CHANNEL_MESSAGE)
            }
            StreamError::InvalidBufferSize(size) => write!(
                f,
                "Invalid buffer size: {} (expected 1..={})",
                size,
                crate::MAX_BUFFER_SIZE
            ),
            StreamError::ChannelFault(msg) => write!(f, "Channel call failed: {}", msg),
            StreamError::InvalidCount { returned, capacity } => write!(
                f,
                "Channel reported {} bytes for a region of {} bytes",
                returned, capacity
            ),
            StreamError::ShortWrite { pending, accepted } => write!(
                f,
                "Short write: channel accepted {} of {} pending bytes",
                accepted, pending
            ),
            StreamError::BufferFull { capacity } => {
                write!(f, "Write buffer full ({} bytes) and could not be flushed", capacity)
            }
            StreamError::NotReadable => write!(f, "Stream is not readable"),
            StreamError::NotWritable => write!(f, "Stream is not writable"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StreamError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_unsupported_channel_message() {
        assert_eq!(
            StreamError::UnsupportedChannelType.to_string(),
            "Input or output channel expected"
        );
    }

    #[test]
    fn test_short_write_message_names_counts() {
        let msg = StreamError::ShortWrite { pending: 10, accepted: 4 }.to_string();
        assert!(msg.contains("4 of 10"), "メッセージに受付数が含まれるべき: {}", msg);
    }
}
