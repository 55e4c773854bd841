//! 境界呼び出しの統計

use serde::Serialize;

use crate::channel::Capabilities;

/// get 側の統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadStats {
    /// read 境界呼び出しの回数
    pub refills: u64,
    /// チャンネルから受け取った総バイト数
    pub bytes_read: u64,
    /// 終端（戻り値 <= 0 または例外の吸収）を報告した回数
    pub end_of_stream: u64,
    /// 例外を送出した read 呼び出しの回数
    pub faults: u64,
}

/// put 側の統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
    /// flush_buffer の回数（空 flush は数えない）
    pub flushes: u64,
    /// write 境界呼び出しの回数（Retry の再送を含む）
    pub write_calls: u64,
    /// チャンネルが受け付けた総バイト数
    pub bytes_written: u64,
    /// Discard 方針で捨てたバイト数
    pub bytes_dropped: u64,
    /// 生成済みの全体リージョンを使い回した回数
    pub full_region_reuses: u64,
    /// 部分リージョンを作った回数
    pub transient_regions: u64,
}

/// アダプタ全体の統計（JSON で JS に返す）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub capabilities: Capabilities,
    pub buffer_size: usize,
    pub read: ReadStats,
    pub write: WriteStats,
}
