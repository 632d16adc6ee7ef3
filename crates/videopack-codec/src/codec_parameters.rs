//! 编码器参数.
//!
//! 对标 FFmpeg 的 `AVCodecParameters`, 同时携带编码器时间基.
//! 编码器打开前由调用方填写, 打开后由编码器回填 (时间基、帧长、extradata).

use videopack_core::{ChannelLayout, MediaType, PixelFormat, Rational, SampleFormat};

use crate::codec_id::CodecId;

/// 编码器参数
#[derive(Debug, Clone, PartialEq)]
pub struct CodecParameters {
    /// 编码器标识
    pub codec_id: CodecId,
    /// 额外数据 (如 H.264 的 SPS/PPS, AAC 的 AudioSpecificConfig)
    pub extra_data: Vec<u8>,
    /// 码率 (bits/s)
    pub bit_rate: u64,
    /// 编码器时间基, 未设置时由编码器按帧率/采样率推导
    pub time_base: Rational,
    /// 媒体类型特定参数
    pub params: CodecParamsType,
}

/// 媒体类型特定参数
#[derive(Debug, Clone, PartialEq)]
pub enum CodecParamsType {
    /// 视频参数
    Video(VideoCodecParams),
    /// 音频参数
    Audio(AudioCodecParams),
}

/// 视频编码参数
#[derive(Debug, Clone, PartialEq)]
pub struct VideoCodecParams {
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 帧率
    pub frame_rate: Rational,
    /// 关键帧间隔 (GOP 长度)
    pub gop_size: u32,
    /// 最大连续 B 帧数, 0 表示禁用 B 帧
    pub max_b_frames: u32,
}

/// 音频编码参数
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCodecParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 采样格式
    pub sample_format: SampleFormat,
    /// 每帧采样数 (每声道), 0 表示可变
    pub frame_size: u32,
}

impl CodecParameters {
    /// 构造视频参数, 时间基为帧率的倒数
    pub fn new_video(codec_id: CodecId, bit_rate: u64, video: VideoCodecParams) -> Self {
        Self {
            codec_id,
            extra_data: Vec::new(),
            bit_rate,
            time_base: video.frame_rate.invert(),
            params: CodecParamsType::Video(video),
        }
    }

    /// 构造音频参数, 时间基为 1/采样率
    pub fn new_audio(codec_id: CodecId, bit_rate: u64, audio: AudioCodecParams) -> Self {
        Self {
            codec_id,
            extra_data: Vec::new(),
            bit_rate,
            time_base: Rational::new(1, audio.sample_rate as i32),
            params: CodecParamsType::Audio(audio),
        }
    }

    /// 媒体类型
    pub fn media_type(&self) -> MediaType {
        match self.params {
            CodecParamsType::Video(_) => MediaType::Video,
            CodecParamsType::Audio(_) => MediaType::Audio,
        }
    }

    /// 获取视频参数 (如果是视频流)
    pub fn video(&self) -> Option<&VideoCodecParams> {
        match &self.params {
            CodecParamsType::Video(v) => Some(v),
            CodecParamsType::Audio(_) => None,
        }
    }

    /// 获取音频参数 (如果是音频流)
    pub fn audio(&self) -> Option<&AudioCodecParams> {
        match &self.params {
            CodecParamsType::Audio(a) => Some(a),
            CodecParamsType::Video(_) => None,
        }
    }

    /// 有效的编码器时间基
    ///
    /// 显式设置的时间基优先, 否则视频取 1/帧率, 音频取 1/采样率.
    pub fn effective_time_base(&self) -> Rational {
        if self.time_base.is_valid() {
            return self.time_base;
        }
        match &self.params {
            CodecParamsType::Video(v) => v.frame_rate.invert(),
            CodecParamsType::Audio(a) => Rational::new(1, a.sample_rate as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_默认时间基() {
        let mut params = CodecParameters::new_video(
            CodecId::RawVideo,
            0,
            VideoCodecParams {
                width: 64,
                height: 48,
                pixel_format: PixelFormat::Yuv420p,
                frame_rate: Rational::new(25, 1),
                gop_size: 12,
                max_b_frames: 0,
            },
        );
        assert_eq!(params.time_base, Rational::new(1, 25));
        params.time_base = Rational::UNDEFINED;
        assert_eq!(params.effective_time_base(), Rational::new(1, 25));
        assert_eq!(params.media_type(), MediaType::Video);
        assert!(params.audio().is_none());
    }
}
