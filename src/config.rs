//! 封装任务配置.
//!
//! 所有字段都有默认值, 可以从 JSON 文件加载, 命令行参数再覆盖文件中的值.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use videopack_codec::{AudioCodecParams, CodecId, CodecParameters, VideoCodecParams};
use videopack_core::{
    ChannelLayout, MediaType, PackError, PackResult, PixelFormat, Rational, SampleFormat,
};
use videopack_format::FormatId;

/// 封装任务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// 视频宽度 (像素)
    pub width: u32,
    /// 视频高度 (像素)
    pub height: u32,
    /// 帧率 (整数 fps)
    pub fps: u32,
    /// 视频码率 (bits/s)
    pub video_bit_rate: u64,
    /// GOP 长度
    pub gop_size: u32,
    /// 视频编码器名称
    pub video_codec: String,

    /// 声道数
    pub channels: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 音频码率 (bits/s)
    pub audio_bit_rate: u64,
    /// 音频编码器名称
    pub audio_codec: String,
    /// 每个音频帧的采样数 (每声道), 固定帧长的编码器会覆盖此值
    pub audio_frame_size: u32,
    /// 音频输入中每个分块的 PCM 字节数 (不含 4 字节时间戳)
    pub audio_chunk_size: usize,

    /// 输出文件路径
    pub output_path: Option<PathBuf>,
    /// 视频输入 (YUV420P 分块) 路径
    pub video_input_path: Option<PathBuf>,
    /// 音频输入 (S16LE 分块) 路径
    pub audio_input_path: Option<PathBuf>,
    /// 输出格式短名称, 为空时按输出文件扩展名猜测
    pub format: Option<String>,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 25,
            video_bit_rate: 10_000_000,
            gop_size: 12,
            video_codec: "h264".into(),
            channels: 2,
            sample_rate: 44_100,
            audio_bit_rate: 128_000,
            audio_codec: "aac".into(),
            audio_frame_size: 1024,
            audio_chunk_size: 3528,
            output_path: None,
            video_input_path: None,
            audio_input_path: None,
            format: None,
        }
    }
}

fn invalid(msg: impl Into<String>) -> PackError {
    PackError::InvalidArgument(msg.into())
}

impl PackConfig {
    /// 从 JSON 文本解析
    pub fn from_json_str(text: &str) -> PackResult<Self> {
        serde_json::from_str(text).map_err(|e| invalid(format!("配置解析失败: {e}")))
    }

    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> PackResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// 检查配置是否完整且自洽 (包括输入输出路径)
    pub fn validate(&self) -> PackResult<()> {
        self.validate_params()?;
        if self.video_input_path.is_none() {
            return Err(invalid("未指定视频输入路径"));
        }
        if self.audio_input_path.is_none() {
            return Err(invalid("未指定音频输入路径"));
        }
        if self.output_path.is_none() {
            return Err(invalid("未指定输出路径"));
        }
        self.format_id()?;
        Ok(())
    }

    /// 只检查编码参数, 不要求路径
    pub fn validate_params(&self) -> PackResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "视频尺寸不能为 0: {}x{}",
                self.width, self.height
            )));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(invalid(format!(
                "YUV420P 要求宽高为偶数: {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 || self.fps > i32::MAX as u32 {
            return Err(invalid(format!("无效帧率: {}", self.fps)));
        }
        if self.sample_rate == 0 || self.sample_rate > i32::MAX as u32 {
            return Err(invalid(format!("无效采样率: {}", self.sample_rate)));
        }
        if self.channels == 0 {
            return Err(invalid("声道数不能为 0"));
        }
        if self.audio_frame_size == 0 {
            return Err(invalid("音频帧长不能为 0"));
        }
        let block = self.sample_block_bytes();
        if self.audio_chunk_size == 0 || self.audio_chunk_size % block != 0 {
            return Err(invalid(format!(
                "音频分块大小 {} 不是 {} 字节采样帧的整数倍",
                self.audio_chunk_size, block
            )));
        }

        let video_codec = self.video_codec_id()?;
        if video_codec.media_type() != MediaType::Video {
            return Err(invalid(format!("{video_codec} 不是视频编码器")));
        }
        let audio_codec = self.audio_codec_id()?;
        if audio_codec.media_type() != MediaType::Audio {
            return Err(invalid(format!("{audio_codec} 不是音频编码器")));
        }
        Ok(())
    }

    pub fn frame_rate(&self) -> Rational {
        Rational::new(self.fps as i32, 1)
    }

    /// 一个采样帧 (所有声道) 的字节数
    pub fn sample_block_bytes(&self) -> usize {
        SampleFormat::S16.frame_bytes(1, self.channels)
    }

    pub fn video_codec_id(&self) -> PackResult<CodecId> {
        CodecId::from_name(&self.video_codec)
            .ok_or_else(|| invalid(format!("未知视频编码器: {}", self.video_codec)))
    }

    pub fn audio_codec_id(&self) -> PackResult<CodecId> {
        CodecId::from_name(&self.audio_codec)
            .ok_or_else(|| invalid(format!("未知音频编码器: {}", self.audio_codec)))
    }

    /// 输出格式: 显式指定优先, 否则按输出文件扩展名猜测
    pub fn format_id(&self) -> PackResult<FormatId> {
        if let Some(name) = &self.format {
            return FormatId::from_name(name)
                .ok_or_else(|| invalid(format!("未知输出格式: {name}")));
        }
        let path = self
            .output_path
            .as_ref()
            .ok_or_else(|| invalid("未指定输出路径"))?;
        FormatId::from_filename(path).ok_or_else(|| {
            invalid(format!(
                "无法从输出文件名确定格式: '{}', 请使用 -f 指定",
                path.display()
            ))
        })
    }

    /// 视频编码参数 (禁用 B 帧)
    pub fn video_params(&self) -> PackResult<CodecParameters> {
        Ok(CodecParameters::new_video(
            self.video_codec_id()?,
            self.video_bit_rate,
            VideoCodecParams {
                width: self.width,
                height: self.height,
                pixel_format: PixelFormat::Yuv420p,
                frame_rate: self.frame_rate(),
                gop_size: self.gop_size,
                max_b_frames: 0,
            },
        ))
    }

    /// 音频编码参数 (输入为交错 S16)
    pub fn audio_params(&self) -> PackResult<CodecParameters> {
        Ok(CodecParameters::new_audio(
            self.audio_codec_id()?,
            self.audio_bit_rate,
            AudioCodecParams {
                sample_rate: self.sample_rate,
                channel_layout: ChannelLayout::from_channels(self.channels),
                sample_format: SampleFormat::S16,
                frame_size: self.audio_frame_size,
            },
        ))
    }
}
