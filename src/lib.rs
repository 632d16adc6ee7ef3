//! # videopack
//!
//! 把两路带时间戳的原始输入 (S16LE 交错 PCM 与 YUV420P 帧) 编码后
//! 交错写入同一个容器文件.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use videopack::PackConfig;
//!
//! let config = PackConfig {
//!     video_input_path: Some("camera.i420".into()),
//!     audio_input_path: Some("mic.pcm".into()),
//!     output_path: Some("out.flv".into()),
//!     ..PackConfig::default()
//! };
//! let stats = videopack::pack(&config)?;
//! println!("共写出 {} 个数据包", stats.total_packets());
//! # Ok::<(), videopack::core::PackError>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `videopack-core` | 时间基、错误类型、媒体类型 |
//! | `videopack-codec` | 编码器框架 (透传编码器, 可选 FFmpeg 编码器) |
//! | `videopack-format` | 封装框架 (framecrc/null, 可选 FFmpeg 容器) |

/// 核心类型与工具
pub use videopack_core as core;

/// 编码器框架
pub use videopack_codec as codec;

/// 封装框架
pub use videopack_format as format;

pub mod config;
pub mod encode;
pub mod pipeline;
pub mod source;

pub use config::PackConfig;
pub use encode::StreamEncoder;
pub use pipeline::{PackStats, Packer, StreamStats, pack, pack_readers};
pub use source::{AudioSource, FrameSource, SourceFrame, VideoSource};

/// 获取 videopack 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置编码器的注册表
pub fn default_codec_registry() -> videopack_codec::CodecRegistry {
    let mut registry = videopack_codec::CodecRegistry::new();
    videopack_codec::register_all(&mut registry);
    registry
}

/// 创建已注册所有内置格式写入器的注册表
pub fn default_format_registry() -> videopack_format::FormatRegistry {
    let mut registry = videopack_format::FormatRegistry::new();
    videopack_format::register_all(&mut registry);
    registry
}
