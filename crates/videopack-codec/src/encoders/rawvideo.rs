//! RAW 视频编码器.
//!
//! 将 VideoFrame 的各平面数据拼接为 Packet, 不做任何压缩.

use bytes::Bytes;
use log::debug;
use videopack_core::{PackError, PackResult, PixelFormat, rescale_q};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::encoder::Encoder;
use crate::frame::Frame;
use crate::packet::Packet;

/// RAW 视频编码器
pub struct RawVideoEncoder {
    /// 打开后的参数
    params: Option<CodecParameters>,
    /// 每帧总字节数
    frame_size: usize,
    /// 单帧时长 (编码器时间基)
    frame_duration: i64,
    /// 待取出的数据包
    output_packet: Option<Packet>,
    /// 已收到结束信号
    done: bool,
}

impl RawVideoEncoder {
    pub fn create() -> PackResult<Box<dyn Encoder>> {
        Ok(Box::new(Self {
            params: None,
            frame_size: 0,
            frame_duration: 0,
            output_packet: None,
            done: false,
        }))
    }
}

impl Encoder for RawVideoEncoder {
    fn codec_id(&self) -> CodecId {
        CodecId::RawVideo
    }

    fn name(&self) -> &str {
        "rawvideo"
    }

    fn open(&mut self, params: &CodecParameters) -> PackResult<()> {
        let video = match &params.params {
            CodecParamsType::Video(v) => v,
            CodecParamsType::Audio(_) => {
                return Err(PackError::InvalidArgument(
                    "rawvideo 编码器需要视频参数".into(),
                ));
            }
        };
        if video.width == 0 || video.height == 0 {
            return Err(PackError::InvalidArgument("宽度和高度不能为 0".into()));
        }
        if !video.frame_rate.is_valid() {
            return Err(PackError::InvalidArgument(format!(
                "无效帧率: {}",
                video.frame_rate
            )));
        }
        let pf = video.pixel_format;
        if pf == PixelFormat::None {
            return Err(PackError::InvalidArgument("像素格式不能为 None".into()));
        }
        let frame_size = pf
            .frame_size(video.width, video.height)
            .ok_or_else(|| PackError::InvalidArgument(format!("无法计算 {pf} 的帧大小")))?;

        let mut opened = params.clone();
        opened.codec_id = CodecId::RawVideo;
        opened.time_base = params.effective_time_base();
        opened.bit_rate = frame_size as u64 * 8 * video.frame_rate.num as u64
            / video.frame_rate.den.max(1) as u64;

        self.frame_size = frame_size;
        self.frame_duration = rescale_q(1, video.frame_rate.invert(), opened.time_base).max(1);
        self.output_packet = None;
        self.done = false;

        debug!(
            "打开 rawvideo 编码器: {}x{}, 格式={}, 帧大小={}, 时间基={}",
            video.width, video.height, pf, frame_size, opened.time_base,
        );
        self.params = Some(opened);
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
        let video = match frame {
            Frame::Video(v) => v,
            Frame::Audio(_) => {
                return Err(PackError::InvalidArgument(
                    "rawvideo 编码器不接受音频帧".into(),
                ));
            }
        };
        let Some(expected) = params.video() else {
            return Err(PackError::Internal("rawvideo 编码器参数不是视频参数".into()));
        };
        if expected.width != video.width
            || expected.height != video.height
            || expected.pixel_format != video.pixel_format
        {
            return Err(PackError::InvalidArgument(format!(
                "期望 {}x{} {}, 实际为 {}x{} {}",
                expected.width,
                expected.height,
                expected.pixel_format,
                video.width,
                video.height,
                video.pixel_format,
            )));
        }

        let total: usize = video.data.iter().map(Vec::len).sum();
        if total != self.frame_size {
            return Err(PackError::InvalidData(format!(
                "帧数据大小 {} 与预期 {} 不匹配",
                total, self.frame_size,
            )));
        }
        let mut buf = Vec::with_capacity(self.frame_size);
        for plane_data in &video.data {
            buf.extend_from_slice(plane_data);
        }

        let mut pkt = Packet::from_data(Bytes::from(buf));
        pkt.pts = video.pts;
        pkt.dts = video.pts; // 无 B 帧, DTS = PTS
        pkt.duration = self.frame_duration;
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
    use crate::codec_parameters::VideoCodecParams;
    use crate::frame::VideoFrame;
    use videopack_core::Rational;

    fn make_video_params(w: u32, h: u32) -> CodecParameters {
        CodecParameters::new_video(
            CodecId::RawVideo,
            0,
            VideoCodecParams {
                width: w,
                height: h,
                pixel_format: PixelFormat::Yuv420p,
                frame_rate: Rational::new(25, 1),
                gop_size: 12,
                max_b_frames: 0,
            },
        )
    }

    #[test]
    fn test_yuv420p_拼接平面() {
        let mut enc = RawVideoEncoder::create().unwrap();
        enc.open(&make_video_params(4, 4)).unwrap();

        let mut vf = VideoFrame::new(4, 4, PixelFormat::Yuv420p);
        vf.data[0] = vec![10u8; 16];
        vf.data[1] = vec![20u8; 4];
        vf.data[2] = vec![30u8; 4];
        vf.pts = 7;

        enc.send_frame(Some(&Frame::Video(vf))).unwrap();
        let pkt = enc.receive_packet().unwrap();
        assert_eq!(pkt.size(), 24);
        assert_eq!(pkt.data[16], 20);
        assert_eq!(pkt.data[20], 30);
        assert_eq!(pkt.pts, 7);
        assert_eq!(pkt.duration, 1);
        assert_eq!(pkt.time_base, Rational::new(1, 25));
        assert!(pkt.is_keyframe);
    }

    #[test]
    fn test_自定义时间基下的帧时长() {
        let mut params = make_video_params(4, 4);
        params.time_base = Rational::new(1, 1000);
        let mut enc = RawVideoEncoder::create().unwrap();
        enc.open(&params).unwrap();
        let mut vf = VideoFrame::new(4, 4, PixelFormat::Yuv420p);
        vf.fill_from_packed(&[0u8; 24]).unwrap();
        enc.send_frame(Some(&Frame::Video(vf))).unwrap();
        assert_eq!(enc.receive_packet().unwrap().duration, 40);
    }

    #[test]
    fn test_数据大小不符() {
        let mut enc = RawVideoEncoder::create().unwrap();
        enc.open(&make_video_params(4, 4)).unwrap();
        let mut vf = VideoFrame::new(4, 4, PixelFormat::Yuv420p);
        vf.data[0] = vec![0u8; 15];
        let err = enc.send_frame(Some(&Frame::Video(vf))).unwrap_err();
        assert!(matches!(err, PackError::InvalidData(_)));
    }

    #[test]
    fn test_排空后返回_eof() {
        let mut enc = RawVideoEncoder::create().unwrap();
        enc.open(&make_video_params(2, 2)).unwrap();
        enc.send_frame(None).unwrap();
        assert!(matches!(enc.receive_packet(), Err(PackError::Eof)));
        let vf = VideoFrame::new(2, 2, PixelFormat::Yuv420p);
        assert!(matches!(
            enc.send_frame(Some(&Frame::Video(vf))),
            Err(PackError::Eof)
        ));
    }
}
