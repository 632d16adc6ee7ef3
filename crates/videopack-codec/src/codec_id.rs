//! 编码器标识符.
//!
//! 对标 FFmpeg 的 `AVCodecID`.

use std::fmt;
use videopack_core::MediaType;

/// 编码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CodecId {
    /// H.264 / AVC
    H264,
    /// Raw 视频 (未压缩)
    RawVideo,
    /// AAC (Advanced Audio Coding)
    Aac,
    /// PCM 有符号 16 位小端
    PcmS16le,
    /// PCM 有符号 16 位大端
    PcmS16be,
}

impl CodecId {
    /// 所有已知的编码器标识
    pub const ALL: [CodecId; 5] = [
        Self::H264,
        Self::RawVideo,
        Self::Aac,
        Self::PcmS16le,
        Self::PcmS16be,
    ];

    /// 编码器对应的媒体类型
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::H264 | Self::RawVideo => MediaType::Video,
            Self::Aac | Self::PcmS16le | Self::PcmS16be => MediaType::Audio,
        }
    }

    /// FFmpeg 风格的名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::RawVideo => "rawvideo",
            Self::Aac => "aac",
            Self::PcmS16le => "pcm_s16le",
            Self::PcmS16be => "pcm_s16be",
        }
    }

    /// 按名称查找, 用于解析配置与命令行参数
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "avc" | "libx264" => Some(Self::H264),
            other => Self::ALL.into_iter().find(|id| id.name() == other),
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
