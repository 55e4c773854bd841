//! # chanstream-wasm
//!
//! wasm-bindgen エクスポート：JS のバイトチャンネルをネイティブのバッファ付き
//! ストリームとして扱う公開 API。
//!
//! ## 使用方法（TypeScript）
//!
//! ```typescript
//! import { ChannelStream, init_panic_hook } from '../chanstream-wasm-pkg/chanstream_wasm';
//!
//! // パニック時のスタックトレースを有効化（開発時）
//! init_panic_hook();
//!
//! // 読み込みチャンネル: region に書き込んで件数を返す。終端は -1
//! const source = {
//!     read(region: Uint8Array): number {
//!         const n = file.readSync(region);
//!         return n === 0 ? -1 : n;
//!     },
//! };
//! const input = new ChannelStream(source, 4096);
//! let b;
//! while ((b = input.readByte()) !== -1) { ... }
//!
//! // 書き込みチャンネル: region を読んで受け付けた件数を返す
//! const sink = { write: (region: Uint8Array) => { socket.write(region.slice()); return region.length; } };
//! const output = new ChannelStream(sink);
//! output.write(payload);
//! output.flush();   // 破棄前に必ず呼ぶ（暗黙の flush はしない）
//! output.free();
//! ```

use wasm_bindgen::prelude::*;

pub mod channel;
mod error;
pub mod stream;

pub use channel::{JsChannel, JsReadable, JsWritable};
pub use error::type_mismatch_error;
pub use stream::{parse_config, stats_json, ChannelStream};

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 開発時に必ず呼び出すこと。本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// デフォルトのバッファサイズ（JS から参照する用）
#[wasm_bindgen(js_name = "defaultBufferSize")]
pub fn default_buffer_size() -> u32 {
    chanstream_core::DEFAULT_BUFFER_SIZE as u32
}
