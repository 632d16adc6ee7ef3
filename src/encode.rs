//! 流编码适配器.
//!
//! 把帧源给出的原始字节切片包装成 [`Frame`] 送入编码器, 并收集编码器
//! 当前能给出的全部数据包. 编码器独占于适配器, 帧缓冲区在多次调用间复用.

use tracing::{debug, trace};
use videopack_codec::{
    AudioFrame, CodecParameters, CodecParamsType, Encoder, Frame, Packet, VideoFrame,
};
use videopack_core::{MediaType, PackError, PackResult, Rational, SampleFormat, rescale_q};

/// 流编码适配器
pub struct StreamEncoder {
    media: MediaType,
    encoder: Box<dyn Encoder>,
    /// 复用的输入帧, 打开编码器后按参数创建
    frame: Option<Frame>,
    /// 编码器已排空
    drained: bool,
}

impl StreamEncoder {
    /// 包装一个尚未打开的编码器
    pub fn new(encoder: Box<dyn Encoder>) -> Self {
        Self {
            media: encoder.codec_id().media_type(),
            encoder,
            frame: None,
            drained: false,
        }
    }

    /// 打开编码器, 返回打开后的参数 (时间基、帧长、extradata 已回填)
    pub fn open(&mut self, params: &CodecParameters) -> PackResult<&CodecParameters> {
        if params.media_type() != self.media {
            return Err(PackError::InvalidArgument(format!(
                "{} 编码器不能使用{}参数",
                self.encoder.name(),
                params.media_type()
            )));
        }
        self.encoder.open(params)?;
        let opened = self.opened_params()?;
        let frame = match (&opened.params, self.media) {
            (CodecParamsType::Video(v), MediaType::Video) => {
                Frame::Video(VideoFrame::new(v.width, v.height, v.pixel_format))
            }
            (CodecParamsType::Audio(a), MediaType::Audio) => {
                Frame::Audio(AudioFrame::new(
                    0,
                    a.sample_rate,
                    SampleFormat::S16,
                    a.channel_layout,
                ))
            }
            _ => {
                return Err(PackError::Internal(format!(
                    "{} 编码器回填的参数类型不符",
                    self.encoder.name()
                )));
            }
        };
        debug!(
            "{}编码器 {} 已打开, 时间基={}",
            self.media,
            self.encoder.name(),
            opened.time_base
        );
        self.frame = Some(frame);
        self.drained = false;
        self.opened_params()
    }

    fn opened_params(&self) -> PackResult<&CodecParameters> {
        self.encoder
            .parameters()
            .ok_or_else(|| PackError::Codec(format!("{} 编码器未打开", self.encoder.name())))
    }

    pub fn media_type(&self) -> MediaType {
        self.media
    }

    pub fn name(&self) -> &str {
        self.encoder.name()
    }

    /// 打开后的编码参数
    pub fn parameters(&self) -> Option<&CodecParameters> {
        self.encoder.parameters()
    }

    /// 编码器时间基
    pub fn time_base(&self) -> Option<Rational> {
        self.encoder.parameters().map(|p| p.time_base)
    }

    /// 编码器已排空
    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// 编码一帧, `None` 表示进入排空模式
    ///
    /// # 参数
    /// - `frame`: 原始帧字节 (音频为交错 S16, 视频为紧凑排列的 YUV 平面)
    /// - `stream_index`: 写入数据包的输出流索引
    /// - `pts`: 帧时间戳, 以 `source_time_base` 为单位
    ///
    /// 返回编码器当前给出的全部数据包 (可能为空).
    pub fn encode(
        &mut self,
        frame: Option<&[u8]>,
        stream_index: usize,
        pts: i64,
        source_time_base: Rational,
    ) -> PackResult<Vec<Packet>> {
        if self.drained {
            return Err(PackError::Eof);
        }
        let time_base = self.opened_params()?.time_base;
        let Some(reusable) = self.frame.as_mut() else {
            return Err(PackError::Codec(format!(
                "{} 编码器未打开",
                self.encoder.name()
            )));
        };

        match frame {
            Some(bytes) => {
                match reusable {
                    Frame::Audio(a) => a.fill_from_interleaved(bytes)?,
                    Frame::Video(v) => v.fill_from_packed(bytes)?,
                }
                let codec_pts = rescale_q(pts, source_time_base, time_base);
                reusable.set_pts(codec_pts, time_base);
                trace!(
                    "{}送帧: pts={} ({} → {}), {} 字节",
                    self.media,
                    codec_pts,
                    source_time_base,
                    time_base,
                    bytes.len()
                );
                self.encoder.send_frame(Some(&*reusable))?;
            }
            None => {
                debug!("{}编码器 {} 进入排空", self.media, self.encoder.name());
                self.encoder.send_frame(None)?;
            }
        }

        let mut packets = Vec::new();
        loop {
            match self.encoder.receive_packet() {
                Ok(mut pkt) => {
                    pkt.stream_index = stream_index;
                    pkt.time_base = time_base;
                    packets.push(pkt);
                }
                Err(PackError::NeedMoreData) => break,
                Err(PackError::Eof) => {
                    debug!("{}编码器 {} 已排空", self.media, self.encoder.name());
                    self.drained = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(packets)
    }
}
