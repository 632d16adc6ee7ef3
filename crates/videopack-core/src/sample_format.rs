//! 音频采样格式定义.
//!
//! 对标 FFmpeg 的 `AVSampleFormat`.

use std::fmt;

/// 音频采样格式
///
/// - 交错 (Interleaved): 所有声道的采样点交替排列, 如 LRLRLR...
/// - 平面 (Planar): 每个声道独立存储, 如 LLL...RRR...
///
/// 输入 PCM 固定为 `S16` 交错; AAC 编码器需要 `F32p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// 未指定
    None,
    /// 有符号 16 位整数, 交错
    S16,
    /// 32 位浮点, 交错
    F32,
    /// 有符号 16 位整数, 平面
    S16p,
    /// 32 位浮点, 平面
    F32p,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::S16 | Self::S16p => 2,
            Self::F32 | Self::F32p => 4,
        }
    }

    /// 是否为平面格式
    pub const fn is_planar(&self) -> bool {
        matches!(self, Self::S16p | Self::F32p)
    }

    /// 一帧 `nb_samples` 个采样 (每声道) 占用的总字节数
    pub const fn frame_bytes(&self, nb_samples: u32, channels: u32) -> usize {
        nb_samples as usize * channels as usize * self.bytes_per_sample() as usize
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::S16 => "s16",
            Self::F32 => "flt",
            Self::S16p => "s16p",
            Self::F32p => "fltp",
        };
        write!(f, "{name}")
    }
}
