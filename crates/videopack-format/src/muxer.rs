//! 封装器 (Muxer) 适配层.
//!
//! [`Muxer`] 是驱动循环看到的输出接口; [`OutputContext`] 是它的实现,
//! 负责流登记、状态机检查、时间基换算和单调性校验, 最终把数据包交给
//! [`FormatWriter`] 写出.
//!
//! 状态流转:
//!
//! ```text
//! Created --open()--> Opened --write_header()--> HeaderWritten --write_trailer()--> TrailerWritten
//! ```

use std::fmt;

use log::{debug, trace, warn};
use videopack_codec::{CodecParameters, Packet};
use videopack_core::{MediaType, NOPTS_VALUE, PackError, PackResult, rescale_q};

use crate::stream::Stream;
use crate::writer::FormatWriter;

/// 写包结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 已交给格式写入器
    Written,
    /// 空数据包, 已丢弃
    Skipped,
}

/// 输出上下文状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MuxerState {
    /// 已创建, 可以添加流
    Created,
    /// 输出资源已打开
    Opened,
    /// 头部已写入, 可以写包
    HeaderWritten,
    /// 尾部已写入, 封装结束
    TrailerWritten,
}

impl fmt::Display for MuxerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Opened => "opened",
            Self::HeaderWritten => "header-written",
            Self::TrailerWritten => "trailer-written",
        };
        write!(f, "{name}")
    }
}

/// 封装器 trait
///
/// 使用流程:
/// 1. `add_stream()` 登记输出流 (最多一条音频、一条视频)
/// 2. `open()` 打开输出
/// 3. `write_header()` 写入容器头部
/// 4. 循环调用 `write_packet()`, 数据包时间戳以编码器时间基为单位
/// 5. `write_trailer()` 写入容器尾部
pub trait Muxer {
    /// 添加一条输出流, 返回流索引
    fn add_stream(&mut self, params: &CodecParameters) -> PackResult<usize>;

    /// 打开输出资源
    fn open(&mut self) -> PackResult<()>;

    /// 写入容器头部
    fn write_header(&mut self) -> PackResult<()>;

    /// 写入一个数据包 (数据包在调用后被丢弃)
    fn write_packet(&mut self, packet: Packet) -> PackResult<WriteOutcome>;

    /// 写入容器尾部
    fn write_trailer(&mut self) -> PackResult<()>;

    /// 已登记的输出流
    fn streams(&self) -> &[Stream];

    /// 当前状态
    fn state(&self) -> MuxerState;

    /// 音频流索引
    fn audio_stream_index(&self) -> Option<usize>;

    /// 视频流索引
    fn video_stream_index(&self) -> Option<usize>;
}

/// 输出上下文
pub struct OutputContext {
    writer: Box<dyn FormatWriter>,
    streams: Vec<Stream>,
    state: MuxerState,
    audio_index: Option<usize>,
    video_index: Option<usize>,
    /// 每条流最后写入的 DTS (容器时间基)
    last_dts: Vec<i64>,
    packets_written: u64,
    packets_skipped: u64,
}

impl OutputContext {
    pub fn new(writer: Box<dyn FormatWriter>) -> Self {
        Self {
            writer,
            streams: Vec::new(),
            state: MuxerState::Created,
            audio_index: None,
            video_index: None,
            last_dts: Vec::new(),
            packets_written: 0,
            packets_skipped: 0,
        }
    }

    /// 格式写入器名称
    pub fn format_name(&self) -> &str {
        self.writer.name()
    }

    /// 已写入的数据包数
    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// 因空负载被跳过的数据包数
    pub fn packets_skipped(&self) -> u64 {
        self.packets_skipped
    }

    fn expect_state(&self, expected: MuxerState, operation: &str) -> PackResult<()> {
        if self.state != expected {
            return Err(PackError::InvalidArgument(format!(
                "{operation} 需要状态 {expected}, 当前为 {}",
                self.state
            )));
        }
        Ok(())
    }
}

impl Muxer for OutputContext {
    fn add_stream(&mut self, params: &CodecParameters) -> PackResult<usize> {
        self.expect_state(MuxerState::Created, "add_stream")?;

        let media = params.media_type();
        let slot = match media {
            MediaType::Audio => &mut self.audio_index,
            MediaType::Video => &mut self.video_index,
        };
        if let Some(existing) = *slot {
            return Err(PackError::Unsupported(format!(
                "已存在{media}流 (索引 {existing}), 不支持多条{media}流"
            )));
        }

        let index = self.streams.len();
        *slot = Some(index);
        let stream = Stream::new(index, params);
        debug!(
            "添加{}流 #{}: {}, 时间基={}",
            media, index, stream.codec_params.codec_id, stream.codec_time_base,
        );
        self.streams.push(stream);
        self.last_dts.push(NOPTS_VALUE);
        Ok(index)
    }

    fn open(&mut self) -> PackResult<()> {
        self.expect_state(MuxerState::Created, "open")?;
        self.writer.open()?;
        self.state = MuxerState::Opened;
        Ok(())
    }

    fn write_header(&mut self) -> PackResult<()> {
        self.expect_state(MuxerState::Opened, "write_header")?;
        if self.streams.is_empty() {
            return Err(PackError::InvalidArgument("写头部前至少需要一条流".into()));
        }
        self.writer.write_header(&mut self.streams)?;
        for s in &self.streams {
            debug!(
                "流 #{} ({}): 编码器时间基={}, 容器时间基={}",
                s.index, s.media_type, s.codec_time_base, s.time_base,
            );
        }
        self.state = MuxerState::HeaderWritten;
        Ok(())
    }

    fn write_packet(&mut self, mut packet: Packet) -> PackResult<WriteOutcome> {
        self.expect_state(MuxerState::HeaderWritten, "write_packet")?;
        let index = packet.stream_index;
        let stream = self
            .streams
            .get(index)
            .ok_or(PackError::StreamNotFound(index))?;

        if packet.is_empty() {
            warn!("流 #{} 收到空数据包 (pts={}), 已跳过", index, packet.pts);
            self.packets_skipped += 1;
            return Ok(WriteOutcome::Skipped);
        }

        let from = stream.codec_time_base;
        let to = stream.time_base;
        packet.pts = rescale_q(packet.pts, from, to);
        packet.dts = if packet.dts == NOPTS_VALUE {
            packet.pts
        } else {
            rescale_q(packet.dts, from, to)
        };
        packet.duration = if packet.duration > 0 {
            rescale_q(packet.duration, from, to)
        } else {
            0
        };
        packet.time_base = to;

        let last = self.last_dts[index];
        if packet.dts != NOPTS_VALUE && last != NOPTS_VALUE && packet.dts < last {
            return Err(PackError::Format(format!(
                "流 #{} DTS 非单调: {} < {}",
                index, packet.dts, last
            )));
        }

        trace!(
            "写包: 流 #{}, pts={}, dts={}, 时长={}, {} 字节",
            index,
            packet.pts,
            packet.dts,
            packet.duration,
            packet.size(),
        );
        self.writer.write_packet(&packet)?;
        if packet.dts != NOPTS_VALUE {
            self.last_dts[index] = packet.dts;
        }
        self.packets_written += 1;
        Ok(WriteOutcome::Written)
    }

    fn write_trailer(&mut self) -> PackResult<()> {
        self.expect_state(MuxerState::HeaderWritten, "write_trailer")?;
        self.writer.write_trailer()?;
        self.state = MuxerState::TrailerWritten;
        debug!(
            "{} 封装完成: 写入 {} 个数据包, 跳过 {} 个",
            self.writer.name(),
            self.packets_written,
            self.packets_skipped,
        );
        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn state(&self) -> MuxerState {
        self.state
    }

    fn audio_stream_index(&self) -> Option<usize> {
        self.audio_index
    }

    fn video_stream_index(&self) -> Option<usize> {
        self.video_index
    }
}
