//! 视频帧源: 每个分块恰好一帧 YUV420P.

use std::io::{ErrorKind, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, warn};
use videopack_core::{MediaType, PackError, PackResult, PixelFormat};

use super::{FrameSource, SourceFrame};

/// 视频帧源
///
/// 输入布局为重复的 `{ u32 LE 毫秒时间戳, yuv[width * (height + height / 2)] }`.
/// 时间戳头会被预读, 因此在读取帧数据之前就能知道下一帧的 pts.
pub struct VideoSource<R> {
    reader: R,
    /// 复用的帧缓冲区
    frame: Vec<u8>,
    /// 已预读的下一帧时间戳 (微秒)
    next_ts: Option<i64>,
    ended: bool,
    frames_read: u64,
}

impl<R: Read> VideoSource<R> {
    pub fn new(reader: R, width: u32, height: u32) -> PackResult<Self> {
        let frame_bytes = PixelFormat::Yuv420p
            .frame_size(width, height)
            .filter(|&n| n > 0 && width % 2 == 0 && height % 2 == 0)
            .ok_or_else(|| {
                PackError::InvalidArgument(format!("无效的 YUV420P 尺寸: {width}x{height}"))
            })?;
        Ok(Self {
            reader,
            frame: vec![0u8; frame_bytes],
            next_ts: None,
            ended: false,
            frames_read: 0,
        })
    }

    /// 每帧字节数
    pub fn frame_bytes(&self) -> usize {
        self.frame.len()
    }

    /// 预读下一个时间戳头
    fn read_ahead(&mut self) -> PackResult<Option<i64>> {
        if self.ended {
            return Ok(None);
        }
        if self.next_ts.is_none() {
            match self.reader.read_u32::<LittleEndian>() {
                Ok(ms) => self.next_ts = Some(i64::from(ms) * 1000),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    debug!("视频输入结束, 共 {} 帧", self.frames_read);
                    self.ended = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(self.next_ts)
    }
}

impl<R: Read> FrameSource for VideoSource<R> {
    fn media_type(&self) -> MediaType {
        MediaType::Video
    }

    fn next_pts(&mut self) -> PackResult<Option<i64>> {
        self.read_ahead()
    }

    fn read_frame(&mut self) -> PackResult<SourceFrame<'_>> {
        let Some(pts) = self.read_ahead()? else {
            return Ok(SourceFrame::End);
        };
        self.next_ts = None;
        match self.reader.read_exact(&mut self.frame) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!("视频帧被截断 (pts={}us), 丢弃并结束输入", pts);
                self.ended = true;
                return Ok(SourceFrame::End);
            }
            Err(e) => return Err(e.into()),
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

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn push_frame(out: &mut Vec<u8>, ts_ms: u32, fill: u8, size: usize) {
        out.extend_from_slice(&ts_ms.to_le_bytes());
        out.extend(std::iter::repeat_n(fill, size));
    }

    #[test]
    fn test_读取帧与预读时间戳() {
        // 4x4 YUV420P = 24 字节
        let mut input = Vec::new();
        push_frame(&mut input, 0, 1, 24);
        push_frame(&mut input, 40, 2, 24);
        let mut src = VideoSource::new(Cursor::new(input), 4, 4).unwrap();
        assert_eq!(src.frame_bytes(), 24);

        assert_eq!(src.next_pts().unwrap(), Some(0));
        // 重复调用不会多读
        assert_eq!(src.next_pts().unwrap(), Some(0));
        match src.read_frame().unwrap() {
            SourceFrame::Frame { data, pts } => {
                assert_eq!(pts, 0);
                assert_eq!(data, &[1u8; 24][..]);
            }
            SourceFrame::End => panic!("应当读到第一帧"),
        }
        assert_eq!(src.next_pts().unwrap(), Some(40_000));
        assert!(matches!(
            src.read_frame().unwrap(),
            SourceFrame::Frame { pts: 40_000, .. }
        ));
        assert_eq!(src.next_pts().unwrap(), None);
        assert_eq!(src.read_frame().unwrap(), SourceFrame::End);
        assert_eq!(src.frames_read(), 2);
    }

    #[test]
    fn test_截断的帧是正常结束() {
        let mut input = Vec::new();
        push_frame(&mut input, 0, 1, 24);
        push_frame(&mut input, 40, 2, 10);
        let mut src = VideoSource::new(Cursor::new(input), 4, 4).unwrap();
        assert!(matches!(src.read_frame().unwrap(), SourceFrame::Frame { .. }));
        // 时间戳头完整, 所以 next_pts 仍然可知
        assert_eq!(src.next_pts().unwrap(), Some(40_000));
        assert_eq!(src.read_frame().unwrap(), SourceFrame::End);
        assert_eq!(src.next_pts().unwrap(), None);
        assert_eq!(src.frames_read(), 1);
    }

    #[test]
    fn test_非法尺寸() {
        assert!(VideoSource::new(Cursor::new(Vec::new()), 0, 4).is_err());
        assert!(VideoSource::new(Cursor::new(Vec::new()), 5, 4).is_err());
    }
}
