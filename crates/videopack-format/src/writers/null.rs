//! null 写入器: 丢弃所有数据包, 只做计数 (对应 FFmpeg `-f null`).

use log::debug;
use videopack_codec::Packet;
use videopack_core::PackResult;

use crate::format_id::FormatId;
use crate::io::OutputTarget;
use crate::stream::Stream;
use crate::writer::FormatWriter;

/// null 写入器
pub struct NullWriter {
    packets: u64,
    bytes: u64,
}

impl NullWriter {
    /// 创建 null 写入器实例 (工厂函数, 忽略输出目标)
    pub fn create(_target: OutputTarget) -> PackResult<Box<dyn FormatWriter>> {
        Ok(Box::new(Self {
            packets: 0,
            bytes: 0,
        }))
    }
}

impl FormatWriter for NullWriter {
    fn format_id(&self) -> FormatId {
        FormatId::Null
    }

    fn name(&self) -> &str {
        "null"
    }

    fn open(&mut self) -> PackResult<()> {
        Ok(())
    }

    fn write_header(&mut self, _streams: &mut [Stream]) -> PackResult<()> {
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> PackResult<()> {
        self.packets += 1;
        self.bytes += packet.size() as u64;
        Ok(())
    }

    fn write_trailer(&mut self) -> PackResult<()> {
        debug!("null 输出: 丢弃 {} 个数据包, {} 字节", self.packets, self.bytes);
        Ok(())
    }
}
