//! # chanstream-core
//!
//! 外部ランタイム側のバイトチャンネルを、ネイティブ側の
//! バッファ付きストリームとして扱うためのアダプタ。
//!
//! ## 構成
//!
//! ```text
//! ChannelStreamAdapter
//!   ├── ChannelReader  - get 側: NativeBuffer + (pos, end) カーソル、refill
//!   └── ChannelWriter  - put 側: NativeBuffer + pos カーソル、drain / flush / sync
//!
//! 境界呼び出し:
//!   ReadableChannel::read(FillRegion)   -> i32 (読み込んだバイト数、<= 0 で終端)
//!   WritableChannel::write(DrainRegion) -> i32 (受け付けたバイト数)
//! ```
//!
//! リージョンは NativeBuffer の一部をそのまま借用して渡す（ゼロコピー）。
//! 境界の向こう側（JS など）はリージョンが示す範囲だけを読み書きする前提。
//!
//! ## フィーチャー
//!
//! - `std`（デフォルト）: `std::io::{Read, BufRead, Write}` 実装と
//!   任意の `std::io` オブジェクトをチャンネル化する [`IoChannel`]

#![no_std]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod adapter;
pub mod buffer;
pub mod channel;
pub mod config;
mod error;
pub mod reader;
pub mod stats;
pub mod writer;

#[cfg(feature = "std")]
mod io;

pub use adapter::ChannelStreamAdapter;
pub use buffer::{DrainRegion, FillRegion, NativeBuffer};
pub use channel::{Capabilities, ChannelProbe, Probed, ReadableChannel, WritableChannel};
pub use config::{ReadFailurePolicy, ShortWritePolicy, StreamConfig};
pub use error::StreamError;
pub use reader::ChannelReader;
pub use stats::{ReadStats, StreamStats, WriteStats};
pub use writer::{ChannelWriter, FlushReport};

#[cfg(feature = "std")]
pub use io::IoChannel;

/// デフォルトのバッファサイズ（バイト）
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// 境界呼び出しの戻り値は i32 なので、リージョン長もこの範囲に収める
pub const MAX_BUFFER_SIZE: usize = i32::MAX as usize;

/// 型不一致時の固定メッセージ
pub const UNSUPPORTED_CHANNEL_MESSAGE: &str = "Input or output channel expected";
