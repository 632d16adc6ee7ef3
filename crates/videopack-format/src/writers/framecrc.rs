//! framecrc 写入器.
//!
//! 输出与 FFmpeg `-f framecrc` 相同的文本: 头部为每条流的时间基与参数,
//! 随后每个数据包一行:
//!
//! ```text
//! stream_index, dts, pts, duration, size, 0xADLER32
//! ```
//!
//! 校验和为以 0 为初值的 Adler-32. 非关键帧追加 `, F=0x0`.

use log::debug;
use videopack_codec::{CodecParamsType, Packet};
use videopack_core::{PackError, PackResult, adler32_update};

use crate::format_id::FormatId;
use crate::io::{IoContext, OutputTarget};
use crate::stream::Stream;
use crate::writer::FormatWriter;

/// framecrc 写入器
pub struct FrameCrcWriter {
    target: OutputTarget,
    io: Option<IoContext>,
    packets: u64,
}

impl FrameCrcWriter {
    /// 创建 framecrc 写入器实例 (工厂函数)
    pub fn create(target: OutputTarget) -> PackResult<Box<dyn FormatWriter>> {
        Ok(Box::new(Self {
            target,
            io: None,
            packets: 0,
        }))
    }

    fn io(&mut self) -> PackResult<&mut IoContext> {
        self.io
            .as_mut()
            .ok_or_else(|| PackError::InvalidArgument("framecrc 输出尚未打开".into()))
    }
}

/// 格式化一行数据包记录
fn packet_line(packet: &Packet) -> String {
    let crc = adler32_update(0, &packet.data);
    let mut line = format!(
        "{}, {:>10}, {:>10}, {:>8}, {:>8}, 0x{:08x}",
        packet.stream_index,
        packet.dts,
        packet.pts,
        packet.duration,
        packet.size(),
        crc,
    );
    if !packet.is_keyframe {
        line.push_str(", F=0x0");
    }
    line
}

/// 格式化一条流的头部记录
fn stream_header_lines(stream: &Stream) -> Vec<String> {
    let i = stream.index;
    let mut lines = vec![
        format!("#tb {i}: {}/{}", stream.time_base.num, stream.time_base.den),
        format!("#media_type {i}: {}", stream.media_type.as_str()),
        format!("#codec_id {i}: {}", stream.codec_id().name()),
    ];
    match &stream.codec_params.params {
        CodecParamsType::Video(v) => {
            lines.push(format!("#dimensions {i}: {}x{}", v.width, v.height));
            lines.push(format!("#sar {i}: 0/1"));
        }
        CodecParamsType::Audio(a) => {
            lines.push(format!("#sample_rate {i}: {}", a.sample_rate));
            lines.push(format!("#channel_layout_name {i}: {}", a.channel_layout));
        }
    }
    lines
}

impl FormatWriter for FrameCrcWriter {
    fn format_id(&self) -> FormatId {
        FormatId::FrameCrc
    }

    fn name(&self) -> &str {
        "framecrc"
    }

    fn open(&mut self) -> PackResult<()> {
        self.io = Some(IoContext::open_target(&self.target)?);
        debug!("framecrc 输出已打开: {}", self.target);
        Ok(())
    }

    fn write_header(&mut self, streams: &mut [Stream]) -> PackResult<()> {
        let io = self.io()?;
        for s in streams.iter() {
            let extra = &s.codec_params.extra_data;
            if !extra.is_empty() {
                io.write_line(&format!(
                    "#extradata {}: {:>8}, 0x{:08x}",
                    s.index,
                    extra.len(),
                    adler32_update(0, extra),
                ))?;
            }
        }
        for s in streams.iter() {
            for line in stream_header_lines(s) {
                io.write_line(&line)?;
            }
        }
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> PackResult<()> {
        let line = packet_line(packet);
        self.io()?.write_line(&line)?;
        self.packets += 1;
        Ok(())
    }

    fn write_trailer(&mut self) -> PackResult<()> {
        let packets = self.packets;
        let io = self.io()?;
        io.flush()?;
        debug!(
            "framecrc 写入尾部: {} 个数据包, {} 字节",
            packets,
            io.bytes_written()
        );
        self.io = None;
        Ok(())
    }
}
