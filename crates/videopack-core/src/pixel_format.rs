//! 像素格式定义.
//!
//! 对标 FFmpeg 的 `AVPixelFormat`. 输入视频固定为 8 位 YUV 4:2:0 平面格式.

use std::fmt;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 未指定
    None,
    /// YUV 4:2:0 平面格式, 8 位 (H.264 默认, 也是输入文件格式)
    Yuv420p,
}

impl PixelFormat {
    /// 色度子采样 (log2 水平, log2 垂直)
    pub const fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p => (1, 1),
            Self::None => (0, 0),
        }
    }

    /// 平面数量
    pub const fn plane_count(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Yuv420p => 3,
        }
    }

    /// 指定平面每行的字节数
    ///
    /// 格式为 `None` 或平面索引越界时返回 `None`.
    pub fn plane_linesize(&self, plane: usize, width: u32) -> Option<usize> {
        if plane >= self.plane_count() as usize {
            return None;
        }
        let (sub_h, _) = self.chroma_subsampling();
        let w = width as usize;
        Some(if plane == 0 { w } else { w >> sub_h })
    }

    /// 指定平面的行数
    pub fn plane_height(&self, plane: usize, height: u32) -> Option<usize> {
        if plane >= self.plane_count() as usize {
            return None;
        }
        let (_, sub_v) = self.chroma_subsampling();
        let h = height as usize;
        Some(if plane == 0 { h } else { h >> sub_v })
    }

    /// 整帧紧密排列时的字节数
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        if *self == Self::None {
            return None;
        }
        let mut total = 0usize;
        for plane in 0..self.plane_count() as usize {
            total += self.plane_linesize(plane, width)? * self.plane_height(plane, height)?;
        }
        Some(total)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Yuv420p => "yuv420p",
        };
        write!(f, "{name}")
    }
}
