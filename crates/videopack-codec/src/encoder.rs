//! 编码器 trait 定义.
//!
//! 所有编码器实现 (内置透传编码器与 FFmpeg 编码器) 都实现 `Encoder` trait.

use videopack_core::PackResult;

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::Frame;
use crate::packet::Packet;

/// 编码器 trait
///
/// 编码流程:
/// 1. 调用 `open()` 配置编码器, 再通过 `parameters()` 读取实际生效的参数
/// 2. 调用 `send_frame()` 送入原始帧, 帧的 pts 已位于编码器时间基
/// 3. 循环调用 `receive_packet()` 直到返回 `NeedMoreData` 或 `Eof`
/// 4. 送入 `None` 表示输入结束, 之后取出的数据包是编码器缓存的尾部数据
pub trait Encoder: Send {
    /// 编码器标识
    fn codec_id(&self) -> CodecId;

    /// 编码器名称
    fn name(&self) -> &str;

    /// 使用参数配置并打开编码器
    fn open(&mut self, params: &CodecParameters) -> PackResult<()>;

    /// 打开后实际生效的参数 (时间基、帧长、extradata 等), 未打开时为 `None`
    fn parameters(&self) -> Option<&CodecParameters>;

    /// 送入一帧原始数据
    ///
    /// - `Some(frame)`: 编码该帧
    /// - `None`: 输入结束, 进入排空模式
    ///
    /// 编码器未打开返回 `PackError::Codec`; 已排空后再送帧返回 `PackError::Eof`.
    fn send_frame(&mut self, frame: Option<&Frame>) -> PackResult<()>;

    /// 取出一个压缩数据包
    ///
    /// - `Err(PackError::NeedMoreData)`: 需要送入更多帧
    /// - `Err(PackError::Eof)`: 所有数据包已取出
    fn receive_packet(&mut self) -> PackResult<Packet>;
}
