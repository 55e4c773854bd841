//! アダプタ設定
//!
//! JS 側からは JSON で渡せるよう `serde::Deserialize` を実装する。
//!
//! ```json
//! { "bufferSize": 4096, "readFailure": "propagate", "shortWrite": "rebuffer" }
//! ```
//!
//! 省略したフィールドはデフォルト値になる。

use core::str::FromStr;

use serde::Deserialize;

use crate::error::StreamError;
use crate::{DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};

/// 読み込み呼び出しが例外を送出したときの扱い
///
/// 戻り値 `<= 0` は方針に関わらず常にデータ終端として扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadFailurePolicy {
    /// 終端として報告し、例外は `last_fault()` に保持する
    #[default]
    EndOfStream,
    /// `StreamError::ChannelFault` として呼び出し元に返す
    Propagate,
}

/// flush で受付数が送信待ち数に満たなかったときの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShortWritePolicy {
    /// 残りを受け付けられるまで write を繰り返す。受付 0 以下で中断し、残りを保持する
    #[default]
    Retry,
    /// write は一回だけ。残りはバッファ先頭に詰め直してエラーを返す
    Rebuffer,
    /// 受付数に関わらずカーソルを巻き戻す（残りは捨てる）
    Discard,
}

impl FromStr for ReadFailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "endOfStream" | "end_of_stream" | "eof" => Ok(ReadFailurePolicy::EndOfStream),
            "propagate" => Ok(ReadFailurePolicy::Propagate),
            _ => Err(()),
        }
    }
}

impl FromStr for ShortWritePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retry" => Ok(ShortWritePolicy::Retry),
            "rebuffer" => Ok(ShortWritePolicy::Rebuffer),
            "discard" => Ok(ShortWritePolicy::Discard),
            _ => Err(()),
        }
    }
}

/// アダプタ生成時の設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamConfig {
    /// NativeBuffer の公称容量（バイト）
    pub buffer_size: usize,
    pub read_failure: ReadFailurePolicy,
    pub short_write: ShortWritePolicy,
}

impl StreamConfig {
    /// デフォルト設定でバッファサイズだけ指定する
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        StreamConfig {
            buffer_size,
            ..Self::default()
        }
    }

    pub fn read_failure(mut self, policy: ReadFailurePolicy) -> Self {
        self.read_failure = policy;
        self
    }

    pub fn short_write(mut self, policy: ShortWritePolicy) -> Self {
        self.short_write = policy;
        self
    }

    /// バッファサイズが境界呼び出しで扱える範囲か検証する
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.buffer_size == 0 || self.buffer_size > MAX_BUFFER_SIZE {
            return Err(StreamError::InvalidBufferSize(self.buffer_size));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
            read_failure: ReadFailurePolicy::default(),
            short_write: ShortWritePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.buffer_size, 8192);
        assert_eq!(config.read_failure, ReadFailurePolicy::EndOfStream);
        assert_eq!(config.short_write, ShortWritePolicy::Retry);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = StreamConfig::with_buffer_size(64)
            .read_failure(ReadFailurePolicy::Propagate)
            .short_write(ShortWritePolicy::Discard);
        assert_eq!(config.buffer_size, 64);
        assert_eq!(config.read_failure, ReadFailurePolicy::Propagate);
        assert_eq!(config.short_write, ShortWritePolicy::Discard);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = StreamConfig::with_buffer_size(0);
        assert_eq!(config.validate(), Err(StreamError::InvalidBufferSize(0)));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("rebuffer".parse(), Ok(ShortWritePolicy::Rebuffer));
        assert_eq!("eof".parse(), Ok(ReadFailurePolicy::EndOfStream));
        assert!("sometimes".parse::<ShortWritePolicy>().is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: StreamConfig =
            serde_json::from_str(r#"{"bufferSize":16,"shortWrite":"discard"}"#).unwrap();
        assert_eq!(config.buffer_size, 16);
        assert_eq!(config.short_write, ShortWritePolicy::Discard);
        // 省略したフィールドはデフォルト
        assert_eq!(config.read_failure, ReadFailurePolicy::EndOfStream);
    }

    #[test]
    fn test_deserialize_unknown_policy_fails() {
        let result = serde_json::from_str::<StreamConfig>(r#"{"shortWrite":"maybe"}"#);
        assert!(result.is_err());
    }
}
