//! 格式写入器 (FormatWriter) trait 定义.
//!
//! 对标 FFmpeg 的 `AVOutputFormat`, 负责把已经换算到容器时间基的数据包
//! 写成具体的输出格式. 状态检查与时间戳换算由 [`OutputContext`](crate::OutputContext) 完成,
//! 写入器只关心字节布局.

use videopack_codec::Packet;
use videopack_core::PackResult;

use crate::format_id::FormatId;
use crate::stream::Stream;

/// 格式写入器 trait
///
/// 调用顺序由输出上下文保证:
/// 1. `open()` 打开输出资源
/// 2. `write_header()` 写入头部, 可改写各流的容器时间基
/// 3. 循环调用 `write_packet()`
/// 4. `write_trailer()` 写入尾部并关闭
pub trait FormatWriter: Send {
    /// 获取格式标识
    fn format_id(&self) -> FormatId;

    /// 获取写入器名称
    fn name(&self) -> &str;

    /// 打开输出资源 (文件/内存)
    fn open(&mut self) -> PackResult<()>;

    /// 写入头部
    ///
    /// # 参数
    /// - `streams`: 输出流列表, 写入器可修改其中的 `time_base`
    fn write_header(&mut self, streams: &mut [Stream]) -> PackResult<()>;

    /// 写入一个数据包 (时间戳以容器时间基为单位)
    fn write_packet(&mut self, packet: &Packet) -> PackResult<()>;

    /// 写入尾部, 完成封装
    fn write_trailer(&mut self) -> PackResult<()>;
}
