//! 原始输入帧源.
//!
//! 两种输入都是 "4 字节小端毫秒时间戳 + 定长负载" 的重复分块:
//!
//! - [`AudioSource`]: S16LE 交错 PCM, 分块大小与编码帧大小无关, 按帧重新切分
//! - [`VideoSource`]: 每块恰好一帧 YUV420P
//!
//! 帧源持有并复用自己的帧缓冲区, 返回的切片只在下一次读取前有效.

mod audio;
mod video;

pub use audio::AudioSource;
pub use video::VideoSource;

use videopack_core::{MediaType, PackResult};

/// 一次读取的结果
#[derive(Debug, PartialEq, Eq)]
pub enum SourceFrame<'a> {
    /// 完整的一帧, `pts` 以微秒为单位
    Frame { data: &'a [u8], pts: i64 },
    /// 输入结束 (不足一帧的尾部数据已丢弃)
    End,
}

/// 帧源 trait
pub trait FrameSource {
    /// 媒体类型
    fn media_type(&self) -> MediaType;

    /// 下一次 `read_frame` 将返回的帧的 pts (微秒), 输入结束时为 `None`
    fn next_pts(&mut self) -> PackResult<Option<i64>>;

    /// 读取下一帧
    fn read_frame(&mut self) -> PackResult<SourceFrame<'_>>;

    /// 已读出的完整帧数
    fn frames_read(&self) -> u64;
}
