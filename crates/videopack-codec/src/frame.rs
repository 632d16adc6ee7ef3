//! 原始帧数据 (Frame).
//!
//! 对标 FFmpeg 的 `AVFrame`. 帧的缓冲区在多次编码之间复用,
//! 每次只通过 `fill_from_*` 覆盖内容.

use videopack_core::{
    ChannelLayout, NOPTS_VALUE, PackError, PackResult, PixelFormat, Rational, SampleFormat,
};

/// 视频帧
///
/// 平面格式每个平面一个缓冲区, 例如 YUV420P 有 Y, U, V 三个平面.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// 各平面的像素数据
    pub data: Vec<Vec<u8>>,
    /// 各平面每行的字节数 (紧密排列)
    pub linesize: Vec<usize>,
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
    /// 帧时长 (以 time_base 为单位)
    pub duration: i64,
}

impl VideoFrame {
    /// 创建空的视频帧
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let plane_count = pixel_format.plane_count() as usize;
        let linesize = (0..plane_count)
            .map(|p| pixel_format.plane_linesize(p, width).unwrap_or(0))
            .collect();
        Self {
            data: vec![Vec::new(); plane_count],
            linesize,
            width,
            height,
            pixel_format,
            pts: NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
            duration: 0,
        }
    }

    /// 按像素格式的平面几何把紧密排列的一帧拆分到各平面
    ///
    /// 大小与帧几何不符时返回 `InvalidData`, 帧内容保持不变.
    pub fn fill_from_packed(&mut self, src: &[u8]) -> PackResult<()> {
        let pf = self.pixel_format;
        let expected = pf.frame_size(self.width, self.height).ok_or_else(|| {
            PackError::InvalidArgument(format!("无法计算 {pf} 的帧大小"))
        })?;
        if src.len() != expected {
            return Err(PackError::InvalidData(format!(
                "视频帧大小 {} 与 {}x{} {} 的 {} 字节不符",
                src.len(),
                self.width,
                self.height,
                pf,
                expected,
            )));
        }

        let mut offset = 0;
        for (plane, buf) in self.data.iter_mut().enumerate() {
            let linesize = pf.plane_linesize(plane, self.width).unwrap_or(0);
            let rows = pf.plane_height(plane, self.height).unwrap_or(0);
            let size = linesize * rows;
            buf.clear();
            buf.extend_from_slice(&src[offset..offset + size]);
            offset += size;
        }
        Ok(())
    }
}

/// 音频帧
///
/// 交错格式: data 中只有一个缓冲区, 所有声道交替排列.
/// 平面格式: data 中每个缓冲区对应一个声道.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// 音频采样数据
    pub data: Vec<Vec<u8>>,
    /// 本帧包含的采样数 (每声道)
    pub nb_samples: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 采样格式
    pub sample_format: SampleFormat,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
    /// 帧时长 (以 time_base 为单位)
    pub duration: i64,
}

impl AudioFrame {
    /// 创建空的音频帧
    pub fn new(
        nb_samples: u32,
        sample_rate: u32,
        sample_format: SampleFormat,
        channel_layout: ChannelLayout,
    ) -> Self {
        let plane_count = if sample_format.is_planar() {
            channel_layout.channels as usize
        } else {
            1
        };
        Self {
            data: vec![Vec::new(); plane_count],
            nb_samples,
            sample_rate,
            sample_format,
            channel_layout,
            pts: NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
            duration: 0,
        }
    }

    /// 用交错排列的采样数据填充帧, 并据此计算 `nb_samples`
    ///
    /// 仅适用于交错格式. 数据为空或不是整数个采样帧时返回 `InvalidData`.
    pub fn fill_from_interleaved(&mut self, src: &[u8]) -> PackResult<()> {
        if self.sample_format.is_planar() {
            return Err(PackError::InvalidArgument(format!(
                "{} 不是交错格式",
                self.sample_format
            )));
        }
        let block = self.sample_format.frame_bytes(1, self.channel_layout.channels);
        if block == 0 || src.is_empty() || src.len() % block != 0 {
            return Err(PackError::InvalidData(format!(
                "音频帧大小 {} 不是 {} 字节采样帧的整数倍",
                src.len(),
                block,
            )));
        }
        self.nb_samples = (src.len() / block) as u32;
        self.data[0].clear();
        self.data[0].extend_from_slice(src);
        Ok(())
    }
}

/// 帧 (视频帧或音频帧的统一包装)
#[derive(Debug, Clone)]
pub enum Frame {
    /// 视频帧
    Video(VideoFrame),
    /// 音频帧
    Audio(AudioFrame),
}

impl Frame {
    /// 显示时间戳
    pub fn pts(&self) -> i64 {
        match self {
            Self::Video(v) => v.pts,
            Self::Audio(a) => a.pts,
        }
    }

    /// 设置显示时间戳与时间基
    pub fn set_pts(&mut self, pts: i64, time_base: Rational) {
        match self {
            Self::Video(v) => {
                v.pts = pts;
                v.time_base = time_base;
            }
            Self::Audio(a) => {
                a.pts = pts;
                a.time_base = time_base;
            }
        }
    }
}
