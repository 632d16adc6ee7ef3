//! FFmpeg 音频编码器 (AAC).
//!
//! 输入固定为交错 S16, 送入 libavcodec 前由 libswresample 转换为 AAC 需要的平面 f32 (fltp).
//! 打开后编码器给出固定帧长 (通常 1024), 调用方按该帧长切分输入.

use ffmpeg_next as ffmpeg;
use ffmpeg::ChannelLayout;
use ffmpeg::format::Sample;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::software::resampling;
use log::debug;
use videopack_core::{PackError, PackResult, SampleFormat};

use super::{av_codec_id, av_sample, init, opened_state, receive, send, to_av_rational};
use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::encoder::Encoder;
use crate::frame::Frame;
use crate::packet::Packet;

/// FFmpeg 音频编码器
pub struct FfmpegAudioEncoder {
    codec_id: CodecId,
    encoder: Option<ffmpeg::encoder::audio::Encoder>,
    /// s16 → fltp, 采样率与声道布局不变
    resampler: Option<resampling::Context>,
    layout: ChannelLayout,
    params: Option<CodecParameters>,
    done: bool,
}

impl FfmpegAudioEncoder {
    pub fn create_aac() -> PackResult<Box<dyn Encoder>> {
        init()?;
        Ok(Box::new(Self {
            codec_id: CodecId::Aac,
            encoder: None,
            resampler: None,
            layout: ChannelLayout::STEREO,
            params: None,
            done: false,
        }))
    }
}

/// 把交错 S16 小端数据装入一个 FFmpeg 音频帧
fn s16_frame(
    data: &[u8],
    nb_samples: u32,
    layout: ChannelLayout,
    sample_rate: u32,
) -> ffmpeg::frame::Audio {
    let mut frame = ffmpeg::frame::Audio::new(
        Sample::I16(SampleType::Packed),
        nb_samples as usize,
        layout,
    );
    frame.set_rate(sample_rate);
    frame.data_mut(0)[..data.len()].copy_from_slice(data);
    frame
}

impl Encoder for FfmpegAudioEncoder {
    fn codec_id(&self) -> CodecId {
        self.codec_id
    }

    fn name(&self) -> &str {
        self.codec_id.name()
    }

    fn open(&mut self, params: &CodecParameters) -> PackResult<()> {
        let audio = match &params.params {
            CodecParamsType::Audio(a) => a,
            CodecParamsType::Video(_) => {
                return Err(PackError::InvalidArgument(format!(
                    "{} 编码器需要音频参数",
                    self.name()
                )));
            }
        };
        if audio.sample_rate == 0 || audio.channel_layout.channels == 0 {
            return Err(PackError::InvalidArgument(format!(
                "无效的音频参数: {} Hz, {} 声道",
                audio.sample_rate, audio.channel_layout.channels
            )));
        }

        let codec = ffmpeg::encoder::find(av_codec_id(self.codec_id)).ok_or_else(|| {
            PackError::CodecNotFound(format!("FFmpeg 未提供 {} 编码器", self.codec_id))
        })?;
        let mut ctx = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()
            .map_err(|e| PackError::Codec(format!("创建 {} 编码器上下文失败: {e}", self.codec_id)))?;

        let layout = ChannelLayout::default(audio.channel_layout.channels as i32);
        let encoder_format = av_sample(SampleFormat::F32p)?;
        ctx.set_rate(audio.sample_rate as i32);
        ctx.set_channel_layout(layout);
        ctx.set_format(encoder_format);
        ctx.set_bit_rate(params.bit_rate as usize);
        ctx.set_time_base(to_av_rational(params.effective_time_base()));
        ctx.set_flags(ffmpeg::codec::flag::Flags::GLOBAL_HEADER);

        let encoder = ctx
            .open_with(ffmpeg::Dictionary::new())
            .map_err(|e| PackError::Codec(format!("打开 {} 编码器失败: {e}", self.codec_id)))?;
        let resampler = resampling::Context::get(
            av_sample(SampleFormat::S16)?,
            layout,
            audio.sample_rate,
            encoder_format,
            layout,
            audio.sample_rate,
        )
        .map_err(|e| PackError::Codec(format!("创建音频重采样器失败: {e}")))?;

        let (time_base, frame_size, extra_data) = opened_state(&encoder);
        let mut opened = params.clone();
        opened.codec_id = self.codec_id;
        opened.time_base = time_base;
        opened.extra_data = extra_data;
        if let CodecParamsType::Audio(a) = &mut opened.params {
            a.sample_format = SampleFormat::F32p;
            if frame_size > 0 {
                a.frame_size = frame_size;
            }
        }

        debug!(
            "打开 {} 编码器: {} Hz, {} 声道, {} bps, 帧长={}, 时间基={}",
            self.codec_id,
            audio.sample_rate,
            audio.channel_layout.channels,
            params.bit_rate,
            frame_size,
            time_base,
        );

        self.encoder = Some(encoder);
        self.resampler = Some(resampler);
        self.layout = layout;
        self.params = Some(opened);
        self.done = false;
        Ok(())
    }

    fn parameters(&self) -> Option<&CodecParameters> {
        self.params.as_ref()
    }

    fn send_frame(&mut self, frame: Option<&Frame>) -> PackResult<()> {
        let (Some(encoder), Some(resampler), Some(params)) = (
            self.encoder.as_mut(),
            self.resampler.as_mut(),
            self.params.as_ref(),
        ) else {
            return Err(PackError::Codec("编码器未打开, 请先调用 open()".into()));
        };
        if self.done {
            return Err(PackError::Eof);
        }

        let Some(frame) = frame else {
            send(encoder, None)?;
            self.done = true;
            return Ok(());
        };
        let af = match frame {
            Frame::Audio(a) => a,
            Frame::Video(_) => {
                return Err(PackError::InvalidArgument(format!(
                    "{} 编码器不接受视频帧",
                    self.codec_id
                )));
            }
        };
        let Some(opened) = params.audio() else {
            return Err(PackError::Internal("音频编码器参数不是音频参数".into()));
        };
        let channels = opened.channel_layout.channels;
        if af.sample_format != SampleFormat::S16 || af.channel_layout.channels != channels {
            return Err(PackError::InvalidArgument(format!(
                "期望 s16 {} 声道, 实际为 {} {} 声道",
                channels, af.sample_format, af.channel_layout.channels,
            )));
        }
        let expected = SampleFormat::S16.frame_bytes(af.nb_samples, channels);
        if af.nb_samples == 0 || af.data[0].len() != expected {
            return Err(PackError::InvalidData(format!(
                "音频帧数据 {} 字节, 期望 {} 字节",
                af.data[0].len(),
                expected,
            )));
        }
        if opened.frame_size > 0 && af.nb_samples > opened.frame_size {
            return Err(PackError::InvalidData(format!(
                "音频帧 {} 个采样, 超过编码器帧长 {}",
                af.nb_samples, opened.frame_size,
            )));
        }

        let src = s16_frame(&af.data[0], af.nb_samples, self.layout, opened.sample_rate);
        let mut fltp = ffmpeg::frame::Audio::empty();
        resampler
            .run(&src, &mut fltp)
            .map_err(|e| PackError::Codec(format!("音频重采样失败: {e}")))?;
        fltp.set_pts(Some(af.pts));
        send(encoder, Some(&*fltp))
    }

    fn receive_packet(&mut self) -> PackResult<Packet> {
        let (Some(encoder), Some(params)) = (self.encoder.as_mut(), self.params.as_ref()) else {
            return Err(PackError::Codec("编码器未打开, 请先调用 open()".into()));
        };
        receive(encoder, params.time_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec_parameters::AudioCodecParams;

    #[test]
    fn test_s16_经重采样转平面_f32() {
        init().unwrap();
        // 两个立体声采样: (1, -1), (16384, -32768)
        let mut src = Vec::new();
        for v in [1i16, -1, 16384, -32768] {
            src.extend_from_slice(&v.to_le_bytes());
        }
        let frame = s16_frame(&src, 2, ChannelLayout::STEREO, 44_100);
        assert_eq!(frame.samples(), 2);

        let mut rs = resampling::Context::get(
            Sample::I16(SampleType::Packed),
            ChannelLayout::STEREO,
            44_100,
            Sample::F32(SampleType::Planar),
            ChannelLayout::STEREO,
            44_100,
        )
        .unwrap();
        let mut fltp = ffmpeg::frame::Audio::empty();
        rs.run(&frame, &mut fltp).unwrap();
        assert_eq!(fltp.samples(), 2);
        assert_eq!(fltp.plane::<f32>(0), &[1.0 / 32768.0, 0.5]);
        assert_eq!(fltp.plane::<f32>(1), &[-1.0 / 32768.0, -1.0]);
    }

    #[test]
    fn test_打开后报告帧长() {
        let mut enc = FfmpegAudioEncoder::create_aac().unwrap();
        let params = CodecParameters::new_audio(
            CodecId::Aac,
            128_000,
            AudioCodecParams {
                sample_rate: 44_100,
                channel_layout: videopack_core::ChannelLayout::STEREO,
                sample_format: SampleFormat::S16,
                frame_size: 0,
            },
        );
        enc.open(&params).unwrap();
        let opened = enc.parameters().unwrap().audio().unwrap();
        assert_eq!(opened.frame_size, 1024);
        assert_eq!(opened.sample_format, SampleFormat::F32p);
    }
}
