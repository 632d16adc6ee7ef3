//! # videopack-format
//!
//! videopack 封装层, 对标 FFmpeg 的 libavformat 输出部分.
//!
//! - [`Muxer`] / [`OutputContext`]: 流登记、状态机、时间基换算
//! - [`FormatWriter`]: 具体输出格式 (framecrc, null, FFmpeg 容器)
//! - [`FormatRegistry`]: 按 [`FormatId`] 创建写入器

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod format_id;
pub mod io;
pub mod muxer;
pub mod registry;
pub mod stream;
pub mod writer;
pub mod writers;

// 重导出常用类型
pub use format_id::FormatId;
pub use io::{IoContext, OutputTarget, SharedBuffer};
pub use muxer::{Muxer, MuxerState, OutputContext, WriteOutcome};
pub use registry::FormatRegistry;
pub use stream::Stream;
pub use writer::FormatWriter;

/// 注册所有内置写入器
pub fn register_all(registry: &mut FormatRegistry) {
    writers::register_all_writers(registry);
}
