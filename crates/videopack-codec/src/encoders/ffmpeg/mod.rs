//! 基于 FFmpeg 的编码器 (ffmpeg-next 绑定).
//!
//! H.264 与 AAC 的压缩完全交给 libavcodec, 这里只负责参数映射、
//! 帧数据拷贝以及 send/receive 协议到 `Encoder` trait 的转换.

pub mod audio;
pub mod video;

use bytes::Bytes;
use ffmpeg_next as ffmpeg;
use ffmpeg::util::error::EAGAIN;
use videopack_core::{NOPTS_VALUE, PackError, PackResult, PixelFormat, Rational, SampleFormat};

use crate::codec_id::CodecId;
use crate::packet::Packet;
use crate::registry::CodecRegistry;

/// 注册 FFmpeg 编码器
pub fn register_ffmpeg_encoders(registry: &mut CodecRegistry) {
    registry.register_encoder(
        CodecId::H264,
        "h264 (ffmpeg)",
        video::FfmpegVideoEncoder::create_h264,
    );
    registry.register_encoder(
        CodecId::Aac,
        "aac (ffmpeg)",
        audio::FfmpegAudioEncoder::create_aac,
    );
}

/// 初始化 FFmpeg 库 (可重复调用)
pub fn init() -> PackResult<()> {
    ffmpeg::init().map_err(|e| PackError::Codec(format!("FFmpeg 初始化失败: {e}")))
}

/// CodecId 到 FFmpeg 编码器 ID 的映射
pub fn av_codec_id(id: CodecId) -> ffmpeg::codec::Id {
    match id {
        CodecId::H264 => ffmpeg::codec::Id::H264,
        CodecId::RawVideo => ffmpeg::codec::Id::RAWVIDEO,
        CodecId::Aac => ffmpeg::codec::Id::AAC,
        CodecId::PcmS16le => ffmpeg::codec::Id::PCM_S16LE,
        CodecId::PcmS16be => ffmpeg::codec::Id::PCM_S16BE,
    }
}

/// 像素格式映射
pub fn av_pixel(pf: PixelFormat) -> PackResult<ffmpeg::format::Pixel> {
    match pf {
        PixelFormat::Yuv420p => Ok(ffmpeg::format::Pixel::YUV420P),
        PixelFormat::None => Err(PackError::InvalidArgument("像素格式不能为 None".into())),
    }
}

/// 采样格式映射
pub fn av_sample(sf: SampleFormat) -> PackResult<ffmpeg::format::Sample> {
    use ffmpeg::format::Sample;
    use ffmpeg::format::sample::Type;
    match sf {
        SampleFormat::S16 => Ok(Sample::I16(Type::Packed)),
        SampleFormat::S16p => Ok(Sample::I16(Type::Planar)),
        SampleFormat::F32 => Ok(Sample::F32(Type::Packed)),
        SampleFormat::F32p => Ok(Sample::F32(Type::Planar)),
        SampleFormat::None => Err(PackError::InvalidArgument("采样格式不能为 None".into())),
    }
}

pub fn to_av_rational(r: Rational) -> ffmpeg::Rational {
    ffmpeg::Rational::new(r.num, r.den)
}

pub fn from_av_rational(r: ffmpeg::Rational) -> Rational {
    Rational::new(r.numerator(), r.denominator())
}

/// 打开后的编码器上下文状态: (时间基, 每帧采样数, extradata)
fn opened_state(ctx: &ffmpeg::codec::Context) -> (Rational, u32, Vec<u8>) {
    // SAFETY: 上下文由 ffmpeg-next 持有, 借用期间指针有效且已完成 avcodec_open2
    unsafe {
        let raw = &*ctx.as_ptr();
        let time_base = Rational::new(raw.time_base.num, raw.time_base.den);
        let frame_size = raw.frame_size.max(0) as u32;
        let extra_data = if raw.extradata.is_null() || raw.extradata_size <= 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(raw.extradata, raw.extradata_size as usize).to_vec()
        };
        (time_base, frame_size, extra_data)
    }
}

/// 送帧, `None` 表示送入结束信号
fn send(encoder: &mut ffmpeg::encoder::Encoder, frame: Option<&ffmpeg::Frame>) -> PackResult<()> {
    let result = match frame {
        Some(f) => encoder.send_frame(f),
        None => encoder.send_eof(),
    };
    result.map_err(|e| match e {
        ffmpeg::Error::Eof => PackError::Eof,
        ffmpeg::Error::Other { errno } if errno == EAGAIN => PackError::NeedMoreData,
        e => PackError::Codec(format!("送帧失败: {e}")),
    })
}

/// 取出一个数据包并转换为 `Packet`
fn receive(encoder: &mut ffmpeg::encoder::Encoder, time_base: Rational) -> PackResult<Packet> {
    let mut av_packet = ffmpeg::Packet::empty();
    match encoder.receive_packet(&mut av_packet) {
        Ok(()) => {}
        Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => {
            return Err(PackError::NeedMoreData);
        }
        Err(ffmpeg::Error::Eof) => return Err(PackError::Eof),
        Err(e) => return Err(PackError::Codec(format!("取包失败: {e}"))),
    }

    let mut pkt = Packet::from_data(Bytes::copy_from_slice(
        av_packet.data().unwrap_or_default(),
    ));
    pkt.pts = av_packet.pts().unwrap_or(NOPTS_VALUE);
    pkt.dts = av_packet.dts().unwrap_or(pkt.pts);
    pkt.duration = av_packet.duration();
    pkt.time_base = time_base;
    pkt.is_keyframe = av_packet.is_key();
    Ok(pkt)
}
