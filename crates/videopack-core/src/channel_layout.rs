//! 音频声道布局定义.
//!
//! 对标 FFmpeg 的 `AVChannelLayout` / `AV_CH_LAYOUT_*`.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// 声道位掩码, 每个位代表一个扬声器位置 (与 FFmpeg `AV_CH_*` 位值一致)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelMask: u64 {
        /// 前方左声道
        const FRONT_LEFT    = 1 << 0;
        /// 前方右声道
        const FRONT_RIGHT   = 1 << 1;
        /// 前方中央声道
        const FRONT_CENTER  = 1 << 2;
        /// 低频效果
        const LOW_FREQUENCY = 1 << 3;
        /// 后方左声道
        const BACK_LEFT     = 1 << 4;
        /// 后方右声道
        const BACK_RIGHT    = 1 << 5;
    }
}

/// 声道布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelLayout {
    /// 声道数量
    pub channels: u32,
    /// 声道位掩码, 非标准布局为空
    pub mask: ChannelMask,
}

impl ChannelLayout {
    /// 单声道
    pub const MONO: Self = Self {
        channels: 1,
        mask: ChannelMask::FRONT_CENTER,
    };

    /// 立体声
    pub const STEREO: Self = Self {
        channels: 2,
        mask: ChannelMask::FRONT_LEFT.union(ChannelMask::FRONT_RIGHT),
    };

    /// 5.1 环绕声
    pub const SURROUND_5_1: Self = Self {
        channels: 6,
        mask: ChannelMask::FRONT_LEFT
            .union(ChannelMask::FRONT_RIGHT)
            .union(ChannelMask::FRONT_CENTER)
            .union(ChannelMask::LOW_FREQUENCY)
            .union(ChannelMask::BACK_LEFT)
            .union(ChannelMask::BACK_RIGHT),
    };

    /// 根据声道数创建默认布局
    pub fn from_channels(channels: u32) -> Self {
        match channels {
            1 => Self::MONO,
            2 => Self::STEREO,
            6 => Self::SURROUND_5_1,
            n => Self {
                channels: n,
                mask: ChannelMask::empty(),
            },
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::MONO => write!(f, "mono"),
            Self::STEREO => write!(f, "stereo"),
            Self::SURROUND_5_1 => write!(f, "5.1"),
            _ => write!(f, "{} channels", self.channels),
        }
    }
}
