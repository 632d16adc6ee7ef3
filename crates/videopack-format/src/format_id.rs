//! 输出格式标识符.
//!
//! 对标 FFmpeg 的输出格式短名称 (`-f flv` 等).

use std::fmt;
use std::path::Path;

/// 输出格式标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormatId {
    // ========================
    // 校验/调试输出
    // ========================
    /// 逐包 Adler-32 校验文本 (FFmpeg framecrc)
    FrameCrc,
    /// 丢弃所有数据包
    Null,

    // ========================
    // 容器 (需要 FFmpeg)
    // ========================
    /// Flash Video (FLV)
    Flv,
    /// MPEG-4 Part 14 (MP4)
    Mp4,
    /// Matroska (MKV)
    Matroska,
    /// Audio Video Interleave (AVI)
    Avi,
    /// QuickTime (MOV)
    Mov,
    /// MPEG Transport Stream (TS)
    MpegTs,
    /// NUT
    Nut,
}

impl FormatId {
    /// 所有已知格式标识的列表
    pub const ALL: &[FormatId] = &[
        Self::FrameCrc,
        Self::Null,
        Self::Flv,
        Self::Mp4,
        Self::Matroska,
        Self::Avi,
        Self::Mov,
        Self::MpegTs,
        Self::Nut,
    ];

    /// 格式短名称 (与 FFmpeg 一致)
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FrameCrc => "framecrc",
            Self::Null => "null",
            Self::Flv => "flv",
            Self::Mp4 => "mp4",
            Self::Matroska => "matroska",
            Self::Avi => "avi",
            Self::Mov => "mov",
            Self::MpegTs => "mpegts",
            Self::Nut => "nut",
        }
    }

    /// 格式常用的文件扩展名
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::FrameCrc => &["crc"],
            Self::Null => &[],
            Self::Flv => &["flv"],
            Self::Mp4 => &["mp4", "m4v"],
            Self::Matroska => &["mkv"],
            Self::Avi => &["avi"],
            Self::Mov => &["mov"],
            Self::MpegTs => &["ts", "m2ts"],
            Self::Nut => &["nut"],
        }
    }

    /// 是否为真实容器格式 (需要 FFmpeg 写入)
    pub const fn is_container(&self) -> bool {
        !matches!(self, Self::FrameCrc | Self::Null)
    }

    /// 按短名称查找 (`mkv` 作为 `matroska` 的别名)
    pub fn from_name(name: &str) -> Option<FormatId> {
        let lower = name.to_ascii_lowercase();
        if lower == "mkv" {
            return Some(Self::Matroska);
        }
        Self::ALL.iter().find(|id| id.name() == lower).copied()
    }

    /// 根据文件扩展名猜测格式
    ///
    /// # 参数
    /// - `ext`: 文件扩展名 (不含 `.`, 如 "flv")
    pub fn from_extension(ext: &str) -> Option<FormatId> {
        let ext_lower = ext.to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|id| id.extensions().contains(&ext_lower.as_str()))
            .copied()
    }

    /// 从文件路径猜测格式
    pub fn from_filename(path: impl AsRef<Path>) -> Option<FormatId> {
        let ext = path.as_ref().extension()?.to_str()?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_按扩展名猜测() {
        assert_eq!(FormatId::from_filename("out.flv"), Some(FormatId::Flv));
        assert_eq!(FormatId::from_filename("a/b/OUT.MKV"), Some(FormatId::Matroska));
        assert_eq!(FormatId::from_filename("x.crc"), Some(FormatId::FrameCrc));
        assert_eq!(FormatId::from_filename("x.ts"), Some(FormatId::MpegTs));
        assert_eq!(FormatId::from_filename("noext"), None);
        assert_eq!(FormatId::from_filename("x.wav"), None);
    }

    #[test]
    fn test_按名称查找() {
        assert_eq!(FormatId::from_name("null"), Some(FormatId::Null));
        assert_eq!(FormatId::from_name("MKV"), Some(FormatId::Matroska));
        assert_eq!(FormatId::from_name("mpegts"), Some(FormatId::MpegTs));
        assert_eq!(FormatId::from_name("wav"), None);
        assert!(!FormatId::FrameCrc.is_container());
        assert!(FormatId::Mp4.is_container());
    }
}
