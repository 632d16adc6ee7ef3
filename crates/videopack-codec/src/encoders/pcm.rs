//! PCM 透传编码器.
//!
//! 把交错 S16 音频帧直接重新打包为数据包, 不经过任何压缩.
//! 每次送帧产生一个数据包; 收到结束信号后锁定为完成状态, 拒绝后续输入.

use bytes::Bytes;
use log::debug;
use videopack_core::{PackError, PackResult, Rational, SampleFormat, rescale_q};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::encoder::Encoder;
use crate::frame::Frame;
use crate::packet::Packet;

/// PCM 编码格式描述
struct PcmEncodeDesc {
    /// 编码器 ID
    codec_id: CodecId,
    /// 编码转换函数
    encode_fn: fn(&[u8], &mut Vec<u8>),
}

/// 直接拷贝
fn encode_copy(src: &[u8], dst: &mut Vec<u8>) {
    dst.extend_from_slice(src);
}

/// S16 小端转大端: 每 2 字节翻转
fn encode_s16be(src: &[u8], dst: &mut Vec<u8>) {
    for chunk in src.chunks_exact(2) {
        dst.push(chunk[1]);
        dst.push(chunk[0]);
    }
}

fn get_pcm_encode_desc(codec_id: CodecId) -> Option<PcmEncodeDesc> {
    Some(match codec_id {
        CodecId::PcmS16le => PcmEncodeDesc {
            codec_id,
            encode_fn: encode_copy,
        },
        CodecId::PcmS16be => PcmEncodeDesc {
            codec_id,
            encode_fn: encode_s16be,
        },
        _ => return None,
    })
}

/// PCM 透传编码器
pub struct PcmEncoder {
    /// 编码格式描述
    desc: PcmEncodeDesc,
    /// 打开后的参数
    params: Option<CodecParameters>,
    /// 待取出的数据包
    output_packet: Option<Packet>,
    /// 已收到结束信号
    done: bool,
}

impl PcmEncoder {
    fn create(codec_id: CodecId) -> PackResult<Box<dyn Encoder>> {
        let desc = get_pcm_encode_desc(codec_id)
            .ok_or_else(|| PackError::CodecNotFound(format!("不支持的 PCM 格式: {codec_id}")))?;
        Ok(Box::new(Self {
            desc,
            params: None,
            output_packet: None,
            done: false,
        }))
    }

    pub fn new_s16le() -> PackResult<Box<dyn Encoder>> {
        Self::create(CodecId::PcmS16le)
    }

    pub fn new_s16be() -> PackResult<Box<dyn Encoder>> {
        Self::create(CodecId::PcmS16be)
    }
}

impl Encoder for PcmEncoder {
    fn codec_id(&self) -> CodecId {
        self.desc.codec_id
    }

    fn name(&self) -> &str {
        self.desc.codec_id.name()
    }

    fn open(&mut self, params: &CodecParameters) -> PackResult<()> {
        let audio = match &params.params {
            CodecParamsType::Audio(a) => a,
            CodecParamsType::Video(_) => {
                return Err(PackError::InvalidArgument("PCM 编码器需要音频参数".into()));
            }
        };
        if audio.sample_rate == 0 {
            return Err(PackError::InvalidArgument("采样率不能为 0".into()));
        }
        if audio.channel_layout.channels == 0 {
            return Err(PackError::InvalidArgument("声道数不能为 0".into()));
        }
        if !matches!(audio.sample_format, SampleFormat::S16 | SampleFormat::None) {
            return Err(PackError::Unsupported(format!(
                "{} 只接受 s16 输入, 实际为 {}",
                self.name(),
                audio.sample_format
            )));
        }

        let mut opened = params.clone();
        opened.codec_id = self.desc.codec_id;
        opened.time_base = params.effective_time_base();
        opened.bit_rate = u64::from(audio.sample_rate) * u64::from(audio.channel_layout.channels) * 16;
        if let CodecParamsType::Audio(a) = &mut opened.params {
            a.sample_format = SampleFormat::S16;
        }

        debug!(
            "打开 {} 编码器: {} Hz, {} 声道, 时间基={}",
            self.name(),
            audio.sample_rate,
            audio.channel_layout.channels,
            opened.time_base,
        );
        self.params = Some(opened);
        self.output_packet = None;
        self.done = false;
        Ok(())
    }

    fn parameters(&self) -> Option<&CodecParameters> {
        self.params.as_ref()
    }

    fn send_frame(&mut self, frame: Option<&Frame>) -> PackResult<()> {
        let Some(params) = &self.params else {
            return Err(PackError::Codec("编码器未打开, 请先调用 open()".into()));
        };
        if self.done {
            return Err(PackError::Eof);
        }
        if self.output_packet.is_some() {
            return Err(PackError::NeedMoreData);
        }

        let Some(frame) = frame else {
            self.done = true;
            return Ok(());
        };
        let audio = match frame {
            Frame::Audio(a) => a,
            Frame::Video(_) => {
                return Err(PackError::InvalidArgument("PCM 编码器不接受视频帧".into()));
            }
        };
        let Some(opened) = params.audio() else {
            return Err(PackError::Internal("PCM 编码器参数不是音频参数".into()));
        };

        if audio.sample_format != SampleFormat::S16 {
            return Err(PackError::InvalidArgument(format!(
                "期望采样格式 s16, 实际为 {}",
                audio.sample_format,
            )));
        }
        let channels = opened.channel_layout.channels;
        if audio.channel_layout.channels != channels {
            return Err(PackError::InvalidArgument(format!(
                "期望 {} 声道, 实际为 {}",
                channels, audio.channel_layout.channels,
            )));
        }
        let expected = SampleFormat::S16.frame_bytes(audio.nb_samples, channels);
        if audio.nb_samples == 0 || audio.data[0].len() != expected {
            return Err(PackError::InvalidData(format!(
                "音频帧数据 {} 字节, 期望 {} 字节",
                audio.data[0].len(),
                expected,
            )));
        }

        let mut encoded = Vec::with_capacity(expected);
        (self.desc.encode_fn)(&audio.data[0], &mut encoded);

        let sample_tb = Rational::new(1, opened.sample_rate as i32);
        let mut pkt = Packet::from_data(Bytes::from(encoded));
        pkt.pts = audio.pts;
        pkt.dts = audio.pts;
        pkt.duration = rescale_q(i64::from(audio.nb_samples), sample_tb, params.time_base);
        pkt.time_base = params.time_base;
        pkt.is_keyframe = true;

        self.output_packet = Some(pkt);
        Ok(())
    }

    fn receive_packet(&mut self) -> PackResult<Packet> {
        if self.params.is_none() {
            return Err(PackError::Codec("编码器未打开, 请先调用 open()".into()));
        }
        if let Some(pkt) = self.output_packet.take() {
            return Ok(pkt);
        }
        if self.done {
            return Err(PackError::Eof);
        }
        Err(PackError::NeedMoreData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec_parameters::AudioCodecParams;
    use crate::frame::AudioFrame;
    use videopack_core::ChannelLayout;

    fn make_audio_params(codec_id: CodecId, channels: u32) -> CodecParameters {
        CodecParameters::new_audio(
            codec_id,
            0,
            AudioCodecParams {
                sample_rate: 44_100,
                channel_layout: ChannelLayout::from_channels(channels),
                sample_format: SampleFormat::S16,
                frame_size: 1024,
            },
        )
    }

    fn make_frame(data: &[u8], channels: u32, pts: i64) -> Frame {
        let mut af = AudioFrame::new(
            0,
            44_100,
            SampleFormat::S16,
            ChannelLayout::from_channels(channels),
        );
        af.fill_from_interleaved(data).unwrap();
        af.pts = pts;
        Frame::Audio(af)
    }

    #[test]
    fn test_pcm_s16le_透传() {
        let mut enc = PcmEncoder::new_s16le().unwrap();
        enc.open(&make_audio_params(CodecId::PcmS16le, 2)).unwrap();
        let params = enc.parameters().unwrap();
        assert_eq!(params.time_base, Rational::new(1, 44_100));
        assert_eq!(params.bit_rate, 44_100 * 2 * 16);

        let data = vec![1u8, 0, 2, 0, 3, 0, 4, 0];
        enc.send_frame(Some(&make_frame(&data, 2, 1024))).unwrap();
        let pkt = enc.receive_packet().unwrap();
        assert_eq!(&pkt.data[..], &data[..]);
        assert_eq!(pkt.pts, 1024);
        assert_eq!(pkt.dts, 1024);
        assert_eq!(pkt.duration, 2);
        assert_eq!(pkt.time_base, Rational::new(1, 44_100));
        assert!(matches!(enc.receive_packet(), Err(PackError::NeedMoreData)));
    }

    #[test]
    fn test_pcm_s16be_字节序翻转() {
        let mut enc = PcmEncoder::new_s16be().unwrap();
        enc.open(&make_audio_params(CodecId::PcmS16be, 1)).unwrap();
        enc.send_frame(Some(&make_frame(&[0x00, 0x01, 0xFF, 0x7F], 1, 0)))
            .unwrap();
        let pkt = enc.receive_packet().unwrap();
        assert_eq!(&pkt.data[..], &[0x01, 0x00, 0x7F, 0xFF]);
    }

    #[test]
    fn test_结束后锁定() {
        let mut enc = PcmEncoder::new_s16le().unwrap();
        enc.open(&make_audio_params(CodecId::PcmS16le, 1)).unwrap();
        enc.send_frame(None).unwrap();
        assert!(matches!(enc.receive_packet(), Err(PackError::Eof)));
        let err = enc.send_frame(Some(&make_frame(&[0, 0], 1, 0))).unwrap_err();
        assert!(matches!(err, PackError::Eof));
        assert!(matches!(enc.send_frame(None), Err(PackError::Eof)));
    }

    #[test]
    fn test_未打开报错() {
        let mut enc = PcmEncoder::new_s16le().unwrap();
        let err = enc.send_frame(Some(&make_frame(&[0, 0], 1, 0))).unwrap_err();
        assert!(matches!(err, PackError::Codec(_)));
        assert!(enc.parameters().is_none());
    }

    #[test]
    fn test_声道数不符() {
        let mut enc = PcmEncoder::new_s16le().unwrap();
        enc.open(&make_audio_params(CodecId::PcmS16le, 2)).unwrap();
        let err = enc.send_frame(Some(&make_frame(&[0, 0], 1, 0))).unwrap_err();
        assert!(matches!(err, PackError::InvalidArgument(_)));
        // 编码器状态不受影响
        assert!(matches!(enc.receive_packet(), Err(PackError::NeedMoreData)));
    }
}
