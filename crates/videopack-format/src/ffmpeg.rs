//! 基于 FFmpeg libavformat 的容器写入器.
//!
//! FLV/MP4/MKV 等真实容器的字节布局完全交给 libavformat. 写头部前把
//! `CodecParameters` (含 extradata) 填入各流的 codecpar, 写头部后读回
//! 复用器选定的容器时间基.

use ffmpeg_next as ffmpeg;
use log::debug;
use videopack_codec::encoders::ffmpeg::{
    av_codec_id, av_pixel, av_sample, from_av_rational, init, to_av_rational,
};
use videopack_codec::{CodecParameters, CodecParamsType, Packet};
use videopack_core::{NOPTS_VALUE, PackError, PackResult};

use crate::format_id::FormatId;
use crate::io::OutputTarget;
use crate::registry::FormatRegistry;
use crate::stream::Stream;
use crate::writer::FormatWriter;

/// 注册 FFmpeg 容器写入器
pub fn register_ffmpeg_writers(registry: &mut FormatRegistry) {
    registry.register_writer(FormatId::Flv, "flv (ffmpeg)", |t| {
        FfmpegWriter::create(FormatId::Flv, t)
    });
    registry.register_writer(FormatId::Mp4, "mp4 (ffmpeg)", |t| {
        FfmpegWriter::create(FormatId::Mp4, t)
    });
    registry.register_writer(FormatId::Matroska, "matroska (ffmpeg)", |t| {
        FfmpegWriter::create(FormatId::Matroska, t)
    });
    registry.register_writer(FormatId::Avi, "avi (ffmpeg)", |t| {
        FfmpegWriter::create(FormatId::Avi, t)
    });
    registry.register_writer(FormatId::Mov, "mov (ffmpeg)", |t| {
        FfmpegWriter::create(FormatId::Mov, t)
    });
    registry.register_writer(FormatId::MpegTs, "mpegts (ffmpeg)", |t| {
        FfmpegWriter::create(FormatId::MpegTs, t)
    });
    registry.register_writer(FormatId::Nut, "nut (ffmpeg)", |t| {
        FfmpegWriter::create(FormatId::Nut, t)
    });
}

fn av_err(what: &str) -> impl FnOnce(ffmpeg::Error) -> PackError + '_ {
    move |e| PackError::Format(format!("{what}: {e}"))
}

/// FFmpeg 容器写入器
pub struct FfmpegWriter {
    format: FormatId,
    target: OutputTarget,
    octx: Option<ffmpeg::format::context::Output>,
}

impl FfmpegWriter {
    /// 创建写入器 (只支持文件输出)
    pub fn create(format: FormatId, target: OutputTarget) -> PackResult<Box<dyn FormatWriter>> {
        if target.path().is_none() {
            return Err(PackError::Unsupported(format!(
                "{format} 写入器只支持文件输出"
            )));
        }
        init()?;
        Ok(Box::new(Self {
            format,
            target,
            octx: None,
        }))
    }

    fn octx(&mut self) -> PackResult<&mut ffmpeg::format::context::Output> {
        self.octx
            .as_mut()
            .ok_or_else(|| PackError::InvalidArgument(format!("{} 输出尚未打开", self.format)))
    }
}

/// 把编码参数写入流的 codecpar
///
/// # Safety
/// `par` 必须指向输出上下文中某条流有效的 `AVCodecParameters`.
unsafe fn fill_codecpar(
    par: *mut ffmpeg::ffi::AVCodecParameters,
    params: &CodecParameters,
) -> PackResult<()> {
    let codec_id: ffmpeg::ffi::AVCodecID = av_codec_id(params.codec_id).into();
    // SAFETY: 调用方保证 par 有效; extradata 由 av_mallocz 分配, 归 codecpar 所有
    unsafe {
        (*par).codec_id = codec_id;
        (*par).bit_rate = params.bit_rate as i64;
        match &params.params {
            CodecParamsType::Video(v) => {
                let pixel: ffmpeg::ffi::AVPixelFormat = av_pixel(v.pixel_format)?.into();
                (*par).codec_type = ffmpeg::ffi::AVMediaType::AVMEDIA_TYPE_VIDEO;
                (*par).width = v.width as i32;
                (*par).height = v.height as i32;
                (*par).format = pixel as i32;
            }
            CodecParamsType::Audio(a) => {
                let sample: ffmpeg::ffi::AVSampleFormat = av_sample(a.sample_format)?.into();
                (*par).codec_type = ffmpeg::ffi::AVMediaType::AVMEDIA_TYPE_AUDIO;
                (*par).sample_rate = a.sample_rate as i32;
                (*par).format = sample as i32;
                (*par).frame_size = a.frame_size as i32;
                ffmpeg::ffi::av_channel_layout_default(
                    &mut (*par).ch_layout,
                    a.channel_layout.channels as i32,
                );
            }
        }

        let extra = &params.extra_data;
        if !extra.is_empty() {
            let padding = ffmpeg::ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize;
            let buf = ffmpeg::ffi::av_mallocz(extra.len() + padding) as *mut u8;
            if buf.is_null() {
                return Err(PackError::Format("分配 extradata 失败".into()));
            }
            std::ptr::copy_nonoverlapping(extra.as_ptr(), buf, extra.len());
            (*par).extradata = buf;
            (*par).extradata_size = extra.len() as i32;
        }
    }
    Ok(())
}

impl FormatWriter for FfmpegWriter {
    fn format_id(&self) -> FormatId {
        self.format
    }

    fn name(&self) -> &str {
        self.format.name()
    }

    fn open(&mut self) -> PackResult<()> {
        let Some(path) = self.target.path() else {
            return Err(PackError::Unsupported(format!(
                "{} 写入器只支持文件输出",
                self.format
            )));
        };
        let octx = ffmpeg::format::output_as(&path, self.format.name())
            .map_err(av_err("打开输出失败"))?;
        debug!("打开 {} 输出: {}", self.format, self.target);
        self.octx = Some(octx);
        Ok(())
    }

    fn write_header(&mut self, streams: &mut [Stream]) -> PackResult<()> {
        let octx = self.octx()?;
        for s in streams.iter() {
            let codec = ffmpeg::encoder::find(av_codec_id(s.codec_id()));
            let mut ost = octx.add_stream(codec).map_err(av_err("添加输出流失败"))?;
            ost.set_time_base(to_av_rational(s.time_base));
            let index = ost.index();
            if index != s.index {
                return Err(PackError::Internal(format!(
                    "输出流索引不一致: {} != {}",
                    index, s.index
                )));
            }
            // SAFETY: 流刚由 avformat_new_stream 创建, 索引在 nb_streams 之内
            unsafe {
                let st = *(*octx.as_mut_ptr()).streams.add(index);
                fill_codecpar((*st).codecpar, &s.codec_params)?;
            }
        }

        octx.write_header().map_err(av_err("写入头部失败"))?;

        for s in streams.iter_mut() {
            if let Some(ost) = octx.stream(s.index) {
                s.time_base = from_av_rational(ost.time_base());
            }
        }
        debug!("{} 写入头部: {} 条流", self.format, streams.len());
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> PackResult<()> {
        let octx = self.octx()?;
        let mut pkt = ffmpeg::Packet::copy(&packet.data);
        pkt.set_pts((packet.pts != NOPTS_VALUE).then_some(packet.pts));
        pkt.set_dts((packet.dts != NOPTS_VALUE).then_some(packet.dts));
        pkt.set_duration(packet.duration);
        pkt.set_stream(packet.stream_index);
        if packet.is_keyframe {
            pkt.set_flags(ffmpeg::packet::Flags::KEY);
        }
        pkt.write_interleaved(octx).map_err(av_err("写入数据包失败"))
    }

    fn write_trailer(&mut self) -> PackResult<()> {
        let octx = self.octx()?;
        octx.write_trailer().map_err(av_err("写入尾部失败"))?;
        debug!("{} 写入尾部: {}", self.format, self.target);
        self.octx = None;
        Ok(())
    }
}
