//! StreamError → JS 例外
//!
//! 型不一致は JS の `TypeError` として送出する。

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use chanstream_core::StreamError;

/// StreamError を JS に投げる値へ変換する
pub(crate) fn to_js_error(err: StreamError) -> JsValue {
    match err {
        StreamError::UnsupportedChannelType => type_mismatch_error(&err.to_string()),
        other => JsError::new(&other.to_string()).into(),
    }
}

/// `TypeError` を生成する
///
/// 1. グローバルの `TypeError` コンストラクタで生成
/// 2. 取得・生成に失敗したら console.error に診断を出し、`Error` で代用する
pub fn type_mismatch_error(message: &str) -> JsValue {
    if let Some(err) = construct_error("TypeError", message) {
        return err;
    }
    tracing::warn!(msg = message, "TypeError unavailable, falling back to Error");
    web_sys::console::error_2(
        &JsValue::from_str("#chanstream: raising TypeError failed:"),
        &JsValue::from_str(message),
    );
    js_sys::Error::new(message).into()
}

/// グローバルから `class_name` のエラークラスを引いて生成する。一回だけ試す。
fn construct_error(class_name: &str, message: &str) -> Option<JsValue> {
    let ctor = Reflect::get(&js_sys::global(), &JsValue::from_str(class_name))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    Reflect::construct(&ctor, &Array::of1(&JsValue::from_str(message))).ok()
}
