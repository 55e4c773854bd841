//! 境界の向こう側にあるチャンネルの能力インターフェース
//!
//! 読み込み能力と書き込み能力は別々のトレイトで表す。
//! 一つのオブジェクトが両方を持つかどうかは [`ChannelProbe`] が生成時に一度だけ判定する。

use alloc::boxed::Box;

use crate::buffer::{DrainRegion, FillRegion};
use crate::error::StreamError;

/// リージョンへ読み込めるチャンネル
pub trait ReadableChannel {
    /// `region` にバイトを書き込み、書き込んだバイト数を返す
    ///
    /// # 戻り値
    /// - `Ok(n)` (`n > 0`): `region` の先頭 `n` バイトが有効
    /// - `Ok(n)` (`n <= 0`): データ終端（またはチャンネル側の失敗）
    /// - `Err(_)`: 境界呼び出しそのものが例外を送出した
    fn read(&mut self, region: FillRegion<'_>) -> Result<i32, StreamError>;
}

/// リージョンから書き出せるチャンネル
pub trait WritableChannel {
    /// `region` のバイトを書き出し、受け付けたバイト数を返す
    ///
    /// 受付数が `region.len()` より小さい場合がある（short write）。
    fn write(&mut self, region: DrainRegion<'_>) -> Result<i32, StreamError>;
}

impl<T: ReadableChannel + ?Sized> ReadableChannel for &mut T {
    fn read(&mut self, region: FillRegion<'_>) -> Result<i32, StreamError> {
        (**self).read(region)
    }
}

impl<T: ReadableChannel + ?Sized> ReadableChannel for Box<T> {
    fn read(&mut self, region: FillRegion<'_>) -> Result<i32, StreamError> {
        (**self).read(region)
    }
}

impl<T: WritableChannel + ?Sized> WritableChannel for &mut T {
    fn write(&mut self, region: DrainRegion<'_>) -> Result<i32, StreamError> {
        (**self).write(region)
    }
}

impl<T: WritableChannel + ?Sized> WritableChannel for Box<T> {
    fn write(&mut self, region: DrainRegion<'_>) -> Result<i32, StreamError> {
        (**self).write(region)
    }
}

/// 能力判定の結果
///
/// 各フィールドはメソッド解決済みのゲートウェイ。能力がなければ `None`。
pub struct Probed<R, W> {
    pub readable: Option<R>,
    pub writable: Option<W>,
}

impl<R, W> Probed<R, W> {
    /// 読み込み専用
    pub fn readable(reader: R) -> Self {
        Probed { readable: Some(reader), writable: None }
    }

    /// 書き込み専用
    pub fn writable(writer: W) -> Self {
        Probed { readable: None, writable: Some(writer) }
    }

    /// 読み書き両対応（方向ごとに別のゲートウェイ）
    pub fn duplex(reader: R, writer: W) -> Self {
        Probed { readable: Some(reader), writable: Some(writer) }
    }

    /// どちらにも対応しない
    pub fn unsupported() -> Self {
        Probed { readable: None, writable: None }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_read: self.readable.is_some(),
            can_write: self.writable.is_some(),
        }
    }
}

/// 生成時に確定する能力フラグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Capabilities {
    pub can_read: bool,
    pub can_write: bool,
}

impl Capabilities {
    /// 少なくとも一方の能力があるか
    pub fn is_supported(&self) -> bool {
        self.can_read || self.can_write
    }
}

/// 実行時の型検査でチャンネルの能力を判定する
///
/// JS オブジェクトのように静的な型を持たないハンドルに実装する。
pub trait ChannelProbe {
    type Readable: ReadableChannel;
    type Writable: WritableChannel;

    fn probe(&self) -> Probed<Self::Readable, Self::Writable>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl ReadableChannel for Nothing {
        fn read(&mut self, _region: FillRegion<'_>) -> Result<i32, StreamError> {
            Ok(-1)
        }
    }

    impl WritableChannel for Nothing {
        fn write(&mut self, region: DrainRegion<'_>) -> Result<i32, StreamError> {
            Ok(region.len() as i32)
        }
    }

    #[test]
    fn test_capabilities_from_probe() {
        let r: Probed<Nothing, Nothing> = Probed::readable(Nothing);
        assert_eq!(r.capabilities(), Capabilities { can_read: true, can_write: false });

        let w: Probed<Nothing, Nothing> = Probed::writable(Nothing);
        assert_eq!(w.capabilities(), Capabilities { can_read: false, can_write: true });

        let d: Probed<Nothing, Nothing> = Probed::duplex(Nothing, Nothing);
        assert!(d.capabilities().can_read && d.capabilities().can_write);
    }

    #[test]
    fn test_unsupported_has_no_capability() {
        let none: Probed<Nothing, Nothing> = Probed::unsupported();
        assert!(!none.capabilities().is_supported());
    }

    #[test]
    fn test_boxed_channel_dispatch() {
        let mut boxed: Box<dyn WritableChannel> = Box::new(Nothing);
        let buf = crate::NativeBuffer::new(3).unwrap();
        assert_eq!(boxed.write(buf.drain_region(0..3)).unwrap(), 3);
    }
}
