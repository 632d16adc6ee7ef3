//! 输出 I/O 抽象层.
//!
//! 对标 FFmpeg 的 `AVIOContext` 写入部分, 为格式写入器提供统一的写接口,
//! 支持文件和共享内存缓冲区两种后端.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use videopack_core::{PackError, PackResult};

/// 输出目标
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// 写入文件
    File(PathBuf),
    /// 写入内存缓冲区
    Memory(SharedBuffer),
}

impl OutputTarget {
    /// 文件路径 (内存目标返回 None)
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(p) => Some(p),
            Self::Memory(_) => None,
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Memory(_) => write!(f, "<memory>"),
        }
    }
}

/// 可共享的内存缓冲区
///
/// 写入器持有一份, 调用方持有另一份, 封装结束后从调用方读取结果.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // 写入方 panic 后数据仍然可读
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 当前内容按 UTF-8 解释 (非法字节替换)
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// I/O 后端 trait
///
/// 实现此 trait 以支持不同的输出目的地.
pub trait IoBackend: Send {
    /// 全部写入
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    /// 刷新缓冲
    fn flush(&mut self) -> io::Result<()>;
}

/// 输出 I/O 上下文
pub struct IoContext {
    inner: Box<dyn IoBackend>,
    /// 已写入字节数
    bytes_written: u64,
}

impl IoContext {
    /// 从 I/O 后端创建上下文
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            bytes_written: 0,
        }
    }

    /// 创建 (或截断) 文件用于写入
    pub fn open_write(path: &Path) -> PackResult<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 按输出目标打开
    pub fn open_target(target: &OutputTarget) -> PackResult<Self> {
        match target {
            OutputTarget::File(path) => Self::open_write(path),
            OutputTarget::Memory(buf) => Ok(Self::new(Box::new(MemoryBackend::new(buf.clone())))),
        }
    }

    /// 写入全部数据
    pub fn write_all(&mut self, buf: &[u8]) -> PackResult<()> {
        self.inner.write_all(buf)?;
        self.bytes_written += buf.len() as u64;
        Ok(())
    }

    /// 写入一行文本 (自动追加 `\n`)
    pub fn write_line(&mut self, line: &str) -> PackResult<()> {
        self.write_all(line.as_bytes())?;
        self.write_all(b"\n")
    }

    pub fn flush(&mut self) -> PackResult<()> {
        self.inner.flush().map_err(PackError::Io)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// 文件 I/O 后端 (带写缓冲)
struct FileBackend {
    file: io::BufWriter<std::fs::File>,
}

impl FileBackend {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: io::BufWriter::new(file),
        }
    }
}

impl IoBackend for FileBackend {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// 内存缓冲区 I/O 后端
///
/// 用于测试和内存中处理, 总是追加写入.
pub struct MemoryBackend {
    buffer: SharedBuffer,
}

impl MemoryBackend {
    pub fn new(buffer: SharedBuffer) -> Self {
        Self { buffer }
    }
}

impl IoBackend for MemoryBackend {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
