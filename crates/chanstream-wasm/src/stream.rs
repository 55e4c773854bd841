//! ChannelStream wasm-bindgen エクスポート
//!
//! JS のチャンネルオブジェクトを一つ受け取り、ネイティブバッファ付きの
//! ストリームとして提供する主エントリポイント。

use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;

use chanstream_core::{ChannelStreamAdapter, StreamConfig, StreamStats, DEFAULT_BUFFER_SIZE};

use crate::channel::{JsChannel, JsReadable, JsWritable};
use crate::error::to_js_error;

/// JS チャンネル上のバッファ付きストリーム
///
/// ## 内部アーキテクチャ
///
/// ```text
/// ChannelStream
///   └── ChannelStreamAdapter (chanstream-core)
///         ├── ChannelReader<JsReadable> - read(Uint8Array) で refill
///         └── ChannelWriter<JsWritable> - write(Uint8Array) で drain / flush
/// ```
///
/// ## 注意
///
/// - 破棄（`free()`）時に flush はしない。先に `flush()` を呼ぶこと
/// - 境界呼び出しは同期・ブロッキング。チャンネル側が返らなければ呼び出し元も返らない
#[wasm_bindgen]
pub struct ChannelStream {
    inner: ChannelStreamAdapter<JsReadable, JsWritable>,
}

#[wasm_bindgen]
impl ChannelStream {
    /// チャンネルを検査してストリームを生成する
    ///
    /// # 引数
    /// - `channel`: `read(Uint8Array)` と `write(Uint8Array)` の少なくとも一方を持つオブジェクト
    /// - `buffer_size`: ネイティブバッファのバイト数。省略時は 8192。
    ///
    /// # エラー
    /// - `TypeError("Input or output channel expected")`: どちらのメソッドも持たない
    /// - バッファサイズが 0
    ///
    /// # 例（TypeScript）
    /// ```typescript
    /// const stream = new ChannelStream({ write: (region) => { sock.send(region.slice()); return region.length; } });
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(channel: JsValue, buffer_size: Option<u32>) -> Result<ChannelStream, JsValue> {
        let size = buffer_size.map_or(DEFAULT_BUFFER_SIZE, |n| n as usize);
        Self::open(channel, &StreamConfig::with_buffer_size(size))
    }

    /// JSON 設定でストリームを生成する
    ///
    /// ```typescript
    /// ChannelStream.withConfig(ch, '{"bufferSize":4096,"shortWrite":"rebuffer"}');
    /// ```
    #[wasm_bindgen(js_name = "withConfig")]
    pub fn with_config(channel: JsValue, config_json: &str) -> Result<ChannelStream, JsValue> {
        let config = parse_config(config_json).map_err(|e| JsValue::from(JsError::new(&e)))?;
        Self::open(channel, &config)
    }

    #[wasm_bindgen(getter, js_name = "canRead")]
    pub fn can_read(&self) -> bool {
        self.inner.can_read()
    }

    #[wasm_bindgen(getter, js_name = "canWrite")]
    pub fn can_write(&self) -> bool {
        self.inner.can_write()
    }

    /// 次のバイトを消費せずに返す。終端なら -1。
    #[wasm_bindgen(js_name = "peekByte")]
    pub fn peek_byte(&mut self) -> Result<i32, JsValue> {
        let byte = self.inner.peek_byte().map_err(to_js_error)?;
        Ok(byte.map_or(-1, i32::from))
    }

    /// 次のバイトを読む。終端なら -1。
    #[wasm_bindgen(js_name = "readByte")]
    pub fn read_byte(&mut self) -> Result<i32, JsValue> {
        let byte = self.inner.read_byte().map_err(to_js_error)?;
        Ok(byte.map_or(-1, i32::from))
    }

    /// 最大 `max_len` バイト読む。長さ 0 の Uint8Array は終端。
    ///
    /// 境界呼び出しは最大一回。`max_len` が 0 だと終端と区別できないのでエラー。
    pub fn read(&mut self, max_len: u32) -> Result<Uint8Array, JsValue> {
        let capacity = self.inner.reader().map_or(0, |r| r.capacity());
        let len = read_len(max_len, capacity).map_err(|e| JsValue::from(JsError::new(e)))?;
        let mut data = vec![0u8; len];
        let n = self.inner.read(&mut data).map_err(to_js_error)?;
        let arr = Uint8Array::new_with_length(n as u32);
        arr.copy_from(&data[..n]);
        Ok(arr)
    }

    #[wasm_bindgen(js_name = "writeByte")]
    pub fn write_byte(&mut self, byte: u8) -> Result<(), JsValue> {
        self.inner.write_byte(byte).map_err(to_js_error)
    }

    /// バイト列をバッファに書き込み、取り込んだバイト数を返す
    pub fn write(&mut self, data: &[u8]) -> Result<u32, JsValue> {
        let n = self.inner.write(data).map_err(to_js_error)?;
        Ok(n as u32)
    }

    /// 送信待ちデータをチャンネルに書き出す
    pub fn flush(&mut self) -> Result<(), JsValue> {
        self.inner.sync().map_err(to_js_error)
    }

    /// 統計を JSON 文字列で返す
    ///
    /// ```json
    /// {
    ///   "capabilities": { "can_read": true, "can_write": false },
    ///   "buffer_size": 8192,
    ///   "read": { "refills": 3, "bytes_read": 20480, "end_of_stream": 1, "faults": 0 },
    ///   "write": { "flushes": 0, "write_calls": 0, ... }
    /// }
    /// ```
    #[wasm_bindgen(js_name = "getStats")]
    pub fn get_stats(&self) -> String {
        stats_json(&self.inner.stats())
    }

    /// 終端として扱われた最後の read 例外メッセージ
    #[wasm_bindgen(js_name = "lastReadFault")]
    pub fn last_read_fault(&self) -> Option<String> {
        self.inner
            .reader()
            .and_then(|r| r.last_fault())
            .map(String::from)
    }
}

impl ChannelStream {
    fn open(channel: JsValue, config: &StreamConfig) -> Result<ChannelStream, JsValue> {
        let inner = ChannelStreamAdapter::from_channel(&JsChannel::new(channel), config)
            .map_err(to_js_error)?;
        Ok(ChannelStream { inner })
    }
}

/// JSON 設定を読み、範囲を検証する
pub fn parse_config(json: &str) -> Result<StreamConfig, String> {
    let config: StreamConfig =
        serde_json::from_str(json).map_err(|e| format!("Invalid stream config: {}", e))?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// `read(max_len)` で確保する長さ。0 は終端の空配列と区別できないので拒否する。
fn read_len(max_len: u32, capacity: usize) -> Result<usize, &'static str> {
    if max_len == 0 {
        return Err("read length must be positive");
    }
    Ok((max_len as usize).min(capacity))
}

/// 統計を JSON 文字列にする
pub fn stats_json(stats: &StreamStats) -> String {
    serde_json::to_string(stats).unwrap_or_else(|_| String::from("{}"))
}
