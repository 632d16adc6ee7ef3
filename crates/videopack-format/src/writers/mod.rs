//! 格式写入器实现模块.

pub mod framecrc;
pub mod null;

use crate::format_id::FormatId;
use crate::registry::FormatRegistry;

/// 注册所有内置写入器
pub fn register_all_writers(registry: &mut FormatRegistry) {
    registry.register_writer(FormatId::FrameCrc, "framecrc", framecrc::FrameCrcWriter::create);
    registry.register_writer(FormatId::Null, "null", null::NullWriter::create);

    #[cfg(feature = "ffmpeg")]
    crate::ffmpeg::register_ffmpeg_writers(registry);
}
