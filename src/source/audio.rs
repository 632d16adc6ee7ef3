//! 音频帧源: 把带时间戳的 PCM 分块重新切分为定长编码帧.

use std::io::{ErrorKind, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, warn};
use videopack_core::{MediaType, PackError, PackResult, Rational, SampleFormat, rescale_q};

use super::{FrameSource, SourceFrame};

/// 音频帧源
///
/// 输入布局为重复的 `{ u32 LE 毫秒时间戳, pcm[chunk_size] }`.
/// 一帧可能跨越多个分块; 帧的 pts 取首个采样所在分块的时间戳,
/// 加上该分块中已消耗采样数对应的时长.
pub struct AudioSource<R> {
    reader: R,
    sample_rate: u32,
    /// 一个采样帧 (所有声道) 的字节数
    block_align: usize,
    /// 当前分块负载
    chunk: Vec<u8>,
    /// 当前分块有效字节数
    chunk_len: usize,
    /// 当前分块已消耗字节数
    chunk_pos: usize,
    /// 当前分块时间戳 (微秒)
    chunk_ts: i64,
    /// 输入已无更多分块
    input_ended: bool,
    /// 复用的帧缓冲区
    frame: Vec<u8>,
    frames_read: u64,
    /// 已返回 End
    ended: bool,
}

/// 尽量读满缓冲区, 返回实际读取的字节数 (遇到 EOF 时小于缓冲区长度)
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl<R: Read> AudioSource<R> {
    /// 创建音频帧源
    ///
    /// # 参数
    /// - `chunk_size`: 每个分块的 PCM 字节数, 必须是采样帧的整数倍
    /// - `frame_size`: 每帧采样数 (每声道)
    pub fn new(
        reader: R,
        chunk_size: usize,
        channels: u32,
        sample_rate: u32,
        frame_size: u32,
    ) -> PackResult<Self> {
        let block_align = SampleFormat::S16.frame_bytes(1, channels);
        if block_align == 0 || sample_rate == 0 || frame_size == 0 {
            return Err(PackError::InvalidArgument(format!(
                "无效的音频参数: {channels} 声道, {sample_rate} Hz, 帧长 {frame_size}"
            )));
        }
        if chunk_size == 0 || chunk_size % block_align != 0 {
            return Err(PackError::InvalidArgument(format!(
                "音频分块大小 {chunk_size} 不是 {block_align} 字节采样帧的整数倍"
            )));
        }
        Ok(Self {
            reader,
            sample_rate,
            block_align,
            chunk: vec![0u8; chunk_size],
            chunk_len: 0,
            chunk_pos: 0,
            chunk_ts: 0,
            input_ended: false,
            frame: vec![0u8; frame_size as usize * block_align],
            frames_read: 0,
            ended: false,
        })
    }

    /// 每帧字节数
    pub fn frame_bytes(&self) -> usize {
        self.frame.len()
    }

    /// 保证当前分块还有未消耗的数据, 输入结束时返回 false
    fn ensure_chunk(&mut self) -> PackResult<bool> {
        while self.chunk_pos >= self.chunk_len {
            if self.input_ended {
                return Ok(false);
            }
            let ts_ms = match self.reader.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    self.input_ended = true;
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            };
            let n = read_full(&mut self.reader, &mut self.chunk)?;
            if n < self.chunk.len() {
                debug!("音频分块被截断: {} / {} 字节", n, self.chunk.len());
                self.input_ended = true;
            }
            self.chunk_len = n - n % self.block_align;
            self.chunk_pos = 0;
            self.chunk_ts = i64::from(ts_ms) * 1000;
        }
        Ok(true)
    }

    /// 当前读取位置的 pts (微秒)
    fn position_pts(&self) -> i64 {
        let consumed = (self.chunk_pos / self.block_align) as i64;
        self.chunk_ts
            + rescale_q(
                consumed,
                Rational::new(1, self.sample_rate as i32),
                Rational::MICRO,
            )
    }
}

impl<R: Read> FrameSource for AudioSource<R> {
    fn media_type(&self) -> MediaType {
        MediaType::Audio
    }

    fn next_pts(&mut self) -> PackResult<Option<i64>> {
        if self.ended || !self.ensure_chunk()? {
            return Ok(None);
        }
        Ok(Some(self.position_pts()))
    }

    fn read_frame(&mut self) -> PackResult<SourceFrame<'_>> {
        if self.ended || !self.ensure_chunk()? {
            self.ended = true;
            return Ok(SourceFrame::End);
        }
        let pts = self.position_pts();
        let frame_bytes = self.frame.len();
        let mut filled = 0;
        while filled < frame_bytes {
            if !self.ensure_chunk()? {
                warn!(
                    "音频输入结束, 丢弃不足一帧的 {} 字节 ({} 个采样)",
                    filled,
                    filled / self.block_align
                );
                self.ended = true;
                return Ok(SourceFrame::End);
            }
            let n = (frame_bytes - filled).min(self.chunk_len - self.chunk_pos);
            self.frame[filled..filled + n]
                .copy_from_slice(&self.chunk[self.chunk_pos..self.chunk_pos + n]);
            self.chunk_pos += n;
            filled += n;
        }
        self.frames_read += 1;
        Ok(SourceFrame::Frame {
            data: &self.frame,
            pts,
        })
    }

    fn frames_read(&self) -> u64 {
        self.frames_read
    }
}
