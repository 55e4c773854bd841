//! JS チャンネルへのゲートウェイ
//!
//! JS 側のチャンネルは次の形のオブジェクト:
//!
//! ```typescript
//! interface ReadableChannel { read(region: Uint8Array): number }
//! interface WritableChannel { write(region: Uint8Array): number }
//! ```
//!
//! `region` は WASM 線形メモリ上の NativeBuffer を直接指す `Uint8Array` ビュー
//! （コピーなし）。JS 側はビューの範囲だけを読み書きすること。
//!
//! ## ビューの寿命
//!
//! WASM メモリが拡張されると既存のビューは detach され `byteLength` が 0 になる。
//! 全体リージョンのビューはキャッシュし、detach されていたら作り直す。
//! コールバック中に WASM 側でアロケーションが起きるとビューが無効になりうる。

use js_sys::{Function, Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};

use chanstream_core::{
    ChannelProbe, DrainRegion, FillRegion, Probed, ReadableChannel, StreamError, WritableChannel,
};

/// 能力判定前の JS チャンネルハンドル
///
/// 所有権は JS 側にある。アダプタの寿命の間、参照を保持する。
#[derive(Clone)]
pub struct JsChannel {
    target: JsValue,
}

impl JsChannel {
    pub fn new(target: JsValue) -> Self {
        JsChannel { target }
    }

    /// `name` プロパティが関数ならそれを返す
    ///
    /// null / undefined / プリミティブに対する `Reflect.get` は例外になるので None 扱い。
    fn bound_method(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.target, &JsValue::from_str(name))
            .ok()?
            .dyn_into::<Function>()
            .ok()
    }
}

impl ChannelProbe for JsChannel {
    type Readable = JsReadable;
    type Writable = JsWritable;

    fn probe(&self) -> Probed<JsReadable, JsWritable> {
        Probed {
            readable: self.bound_method("read").map(|read| JsReadable {
                target: self.target.clone(),
                read,
                whole: CachedView::default(),
            }),
            writable: self.bound_method("write").map(|write| JsWritable {
                target: self.target.clone(),
                write,
                whole: CachedView::default(),
            }),
        }
    }
}

/// 全体リージョン用のキャッシュ済みビュー
#[derive(Default)]
struct CachedView {
    view: Option<Uint8Array>,
}

impl CachedView {
    /// `[ptr, ptr + len)` を指す有効なビューを返す。無効なら作り直す。
    ///
    /// # Safety
    /// `ptr` から `len` バイトが WASM 線形メモリ上で有効であること。
    unsafe fn get(&mut self, ptr: *mut u8, len: usize) -> Uint8Array {
        if let Some(view) = &self.view {
            let valid = view.byte_length() as usize == len
                && view.byte_offset() as usize == ptr as usize;
            if valid {
                return view.clone();
            }
            tracing::debug!(len, "whole-buffer view detached, recreating");
        }
        let view = Uint8Array::view_mut_raw(ptr, len);
        self.view = Some(view.clone());
        view
    }
}

/// `read` メソッドを解決済みのゲートウェイ
pub struct JsReadable {
    target: JsValue,
    read: Function,
    whole: CachedView,
}

impl ReadableChannel for JsReadable {
    fn read(&mut self, mut region: FillRegion<'_>) -> Result<i32, StreamError> {
        // refill は常にバッファ全体を渡す
        debug_assert!(region.is_whole_buffer());
        let len = region.len();
        let ptr = region.as_mut_ptr();
        // SAFETY: region は NativeBuffer 全体を排他的に借用しており、
        // 呼び出しが終わるまで解放も移動もされない
        let view = unsafe { self.whole.get(ptr, len) };
        let result = self.read.call1(&self.target, &view);
        count_from(result, "read")
    }
}

/// `write` メソッドを解決済みのゲートウェイ
pub struct JsWritable {
    target: JsValue,
    write: Function,
    whole: CachedView,
}

impl WritableChannel for JsWritable {
    fn write(&mut self, region: DrainRegion<'_>) -> Result<i32, StreamError> {
        // SAFETY: JsReadable::read と同じ。JS 側は書き出し時にビューを読むだけ
        let view = unsafe {
            if region.is_whole_buffer() {
                self.whole.get(region.as_ptr() as *mut u8, region.len())
            } else {
                Uint8Array::view(region.as_slice())
            }
        };
        let result = self.write.call1(&self.target, &view);
        count_from(result, "write")
    }
}

/// 境界呼び出しの戻り値をバイト数に変換する
fn count_from(result: Result<JsValue, JsValue>, method: &str) -> Result<i32, StreamError> {
    match result {
        Ok(value) => match value.as_f64() {
            Some(n) => Ok(n as i32),
            None => Err(StreamError::ChannelFault(format!(
                "{}() must return a number",
                method
            ))),
        },
        Err(exception) => Err(StreamError::ChannelFault(describe_exception(&exception))),
    }
}

/// JS 例外から人が読めるメッセージを取り出す
pub(crate) fn describe_exception(exception: &JsValue) -> String {
    if let Some(err) = exception.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    match exception.as_string() {
        Some(msg) => msg,
        None => format!("{:?}", exception),
    }
}
