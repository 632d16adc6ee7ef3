//! 媒体类型定义.
//!
//! 对标 FFmpeg 的 `AVMediaType`, 仅保留输出容器会用到的两种.

use std::fmt;

/// 媒体流类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// 视频流
    Video,
    /// 音频流
    Audio,
}

impl MediaType {
    /// framecrc 等文本输出中使用的英文名称
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Video => "视频",
            Self::Audio => "音频",
        };
        write!(f, "{name}")
    }
}
