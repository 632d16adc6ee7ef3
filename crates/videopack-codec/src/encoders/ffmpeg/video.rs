//! FFmpeg 视频编码器 (H.264).
//!
//! 固定 GOP, 不使用 B 帧, 总是输出全局头 (SPS/PPS 放在 extradata 中).

use ffmpeg_next as ffmpeg;
use log::debug;
use videopack_core::{PackError, PackResult};

use super::{av_codec_id, av_pixel, init, opened_state, receive, send, to_av_rational};
use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::encoder::Encoder;
use crate::frame::Frame;
use crate::packet::Packet;

/// 已打开的编码器上下文与复用的输入帧
struct OpenedVideo {
    encoder: ffmpeg::encoder::video::Encoder,
    frame: ffmpeg::frame::Video,
}

/// FFmpeg 视频编码器
pub struct FfmpegVideoEncoder {
    codec_id: CodecId,
    state: Option<OpenedVideo>,
    params: Option<CodecParameters>,
    done: bool,
}

impl FfmpegVideoEncoder {
    pub fn create_h264() -> PackResult<Box<dyn Encoder>> {
        init()?;
        Ok(Box::new(Self {
            codec_id: CodecId::H264,
            state: None,
            params: None,
            done: false,
        }))
    }
}

impl Encoder for FfmpegVideoEncoder {
    fn codec_id(&self) -> CodecId {
        self.codec_id
    }

    fn name(&self) -> &str {
        self.codec_id.name()
    }

    fn open(&mut self, params: &CodecParameters) -> PackResult<()> {
        let video = match &params.params {
            CodecParamsType::Video(v) => v,
            CodecParamsType::Audio(_) => {
                return Err(PackError::InvalidArgument(format!(
                    "{} 编码器需要视频参数",
                    self.name()
                )));
            }
        };
        if video.width == 0 || video.height == 0 || !video.frame_rate.is_valid() {
            return Err(PackError::InvalidArgument(format!(
                "无效的视频参数: {}x{} @ {}",
                video.width, video.height, video.frame_rate
            )));
        }
        let pixel = av_pixel(video.pixel_format)?;

        let codec = ffmpeg::encoder::find(av_codec_id(self.codec_id)).ok_or_else(|| {
            PackError::CodecNotFound(format!("FFmpeg 未提供 {} 编码器", self.codec_id))
        })?;
        let mut ctx = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| PackError::Codec(format!("创建 {} 编码器上下文失败: {e}", self.codec_id)))?;

        ctx.set_width(video.width);
        ctx.set_height(video.height);
        ctx.set_format(pixel);
        ctx.set_time_base(to_av_rational(params.effective_time_base()));
        ctx.set_frame_rate(Some(to_av_rational(video.frame_rate)));
        ctx.set_bit_rate(params.bit_rate as usize);
        ctx.set_gop(video.gop_size);
        ctx.set_max_b_frames(video.max_b_frames as usize);
        ctx.set_flags(ffmpeg::codec::flag::Flags::GLOBAL_HEADER);

        let encoder = ctx
            .open_with(ffmpeg::Dictionary::new())
            .map_err(|e| PackError::Codec(format!("打开 {} 编码器失败: {e}", self.codec_id)))?;

        let (time_base, _, extra_data) = opened_state(&encoder);
        let mut opened = params.clone();
        opened.codec_id = self.codec_id;
        opened.time_base = time_base;
        opened.extra_data = extra_data;

        debug!(
            "打开 {} 编码器: {}x{}, {} fps, {} bps, gop={}, 时间基={}, extradata={} 字节",
            self.codec_id,
            video.width,
            video.height,
            video.frame_rate,
            params.bit_rate,
            video.gop_size,
            time_base,
            opened.extra_data.len(),
        );

        self.state = Some(OpenedVideo {
            encoder,
            frame: ffmpeg::frame::Video::new(pixel, video.width, video.height),
        });
        self.params = Some(opened);
        self.done = false;
        Ok(())
    }

    fn parameters(&self) -> Option<&CodecParameters> {
        self.params.as_ref()
    }

    fn send_frame(&mut self, frame: Option<&Frame>) -> PackResult<()> {
        let (Some(state), Some(params)) = (self.state.as_mut(), self.params.as_ref()) else {
            return Err(PackError::Codec("编码器未打开, 请先调用 open()".into()));
        };
        if self.done {
            return Err(PackError::Eof);
        }

        let Some(frame) = frame else {
            send(&mut state.encoder, None)?;
            self.done = true;
            return Ok(());
        };
        let vf = match frame {
            Frame::Video(v) => v,
            Frame::Audio(_) => {
                return Err(PackError::InvalidArgument(format!(
                    "{} 编码器不接受音频帧",
                    self.codec_id
                )));
            }
        };
        let Some(expected) = params.video() else {
            return Err(PackError::Internal("视频编码器参数不是视频参数".into()));
        };
        if vf.width != expected.width
            || vf.height != expected.height
            || vf.pixel_format != expected.pixel_format
        {
            return Err(PackError::InvalidArgument(format!(
                "期望 {}x{} {}, 实际为 {}x{} {}",
                expected.width,
                expected.height,
                expected.pixel_format,
                vf.width,
                vf.height,
                vf.pixel_format,
            )));
        }

        let pf = vf.pixel_format;
        for (plane, src) in vf.data.iter().enumerate() {
            let linesize = pf.plane_linesize(plane, vf.width).unwrap_or(0);
            let rows = pf.plane_height(plane, vf.height).unwrap_or(0);
            if src.len() != linesize * rows {
                return Err(PackError::InvalidData(format!(
                    "平面 {} 数据 {} 字节, 期望 {} 字节",
                    plane,
                    src.len(),
                    linesize * rows,
                )));
            }
            if linesize == 0 {
                continue;
            }
            let stride = state.frame.stride(plane);
            let dst = state.frame.data_mut(plane);
            for (row, line) in src.chunks_exact(linesize).enumerate() {
                dst[row * stride..row * stride + linesize].copy_from_slice(line);
            }
        }
        state.frame.set_pts(Some(vf.pts));
        state.frame.set_kind(ffmpeg::picture::Type::None);

        send(&mut state.encoder, Some(&*state.frame))
    }

    fn receive_packet(&mut self) -> PackResult<Packet> {
        let (Some(state), Some(params)) = (self.state.as_mut(), self.params.as_ref()) else {
            return Err(PackError::Codec("编码器未打开, 请先调用 open()".into()));
        };
        receive(&mut state.encoder, params.time_base)
    }
}
