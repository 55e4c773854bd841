//! ネイティブバッファと境界に渡すリージョン記述子
//!
//! ## メモリレイアウト
//!
//! ```text
//! [0 .............................. capacity)[spare]
//!  ↑ 公称容量。get/put カーソルはこの範囲を動く   ↑ overflow 時の 1 バイト
//! ```

use alloc::boxed::Box;
use alloc::vec;
use core::ops::Range;

use crate::error::StreamError;
use crate::MAX_BUFFER_SIZE;

/// 固定長のネイティブバイト領域
///
/// 生成時に確保し、drop で一度だけ解放する。サイズ変更はしない。
/// 一つの方向（reader か writer）が排他的に所有する。
pub struct NativeBuffer {
    /// capacity + 1 バイト（末尾はオーバーフロー用の予備スロット）
    bytes: Box<[u8]>,
    /// 公称容量
    capacity: usize,
}

impl NativeBuffer {
    /// `capacity` バイトのバッファを確保する
    ///
    /// # エラー
    /// - `StreamError::InvalidBufferSize`: 0、または `MAX_BUFFER_SIZE` 超
    pub fn new(capacity: usize) -> Result<Self, StreamError> {
        if capacity == 0 || capacity > MAX_BUFFER_SIZE {
            return Err(StreamError::InvalidBufferSize(capacity));
        }
        Ok(NativeBuffer {
            bytes: vec![0u8; capacity + 1].into_boxed_slice(),
            capacity,
        })
    }

    /// 公称容量（予備スロットを含まない）
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 予備スロットを含む全領域の読み取り
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 予備スロットを含む全領域の書き込み
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// バッファ全体（公称容量）を読み込み先リージョンとして貸し出す
    pub fn fill_region(&mut self) -> FillRegion<'_> {
        let capacity = self.capacity;
        FillRegion {
            bytes: &mut self.bytes[..capacity],
            whole: true,
        }
    }

    /// `range` を書き出し元リージョンとして貸し出す
    ///
    /// 範囲が公称容量ちょうどのときだけ whole として扱う。
    pub fn drain_region(&self, range: Range<usize>) -> DrainRegion<'_> {
        let whole = range.start == 0 && range.end == self.capacity;
        DrainRegion {
            bytes: &self.bytes[range],
            whole,
        }
    }
}

impl core::fmt::Debug for NativeBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// チャンネルが書き込む先のリージョン（read 呼び出し用）
pub struct FillRegion<'a> {
    bytes: &'a mut [u8],
    whole: bool,
}

impl<'a> FillRegion<'a> {
    /// バッファ全体を覆うリージョンか
    ///
    /// 境界側はこれが true の間、生成済みのビューを使い回してよい。
    pub fn is_whole_buffer(&self) -> bool {
        self.whole
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }
}

/// チャンネルが読み出す元のリージョン（write 呼び出し用）
pub struct DrainRegion<'a> {
    bytes: &'a [u8],
    whole: bool,
}

impl<'a> DrainRegion<'a> {
    /// バッファ全体を覆うリージョンか
    pub fn is_whole_buffer(&self) -> bool {
        self.whole
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }
}
