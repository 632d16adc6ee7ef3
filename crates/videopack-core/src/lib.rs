//! # videopack-core
//!
//! videopack 的核心库, 提供时间基、时间戳重缩放、统一错误类型与音视频格式定义.
//!
//! 其余 crate (编码器适配、封装器适配、驱动循环) 都建立在这些类型之上.

pub mod channel_layout;
pub mod checksum;
pub mod error;
pub mod media_type;
pub mod pixel_format;
pub mod rational;
pub mod sample_format;

// 重导出常用类型
pub use channel_layout::ChannelLayout;
pub use checksum::adler32_update;
pub use error::{PackError, PackResult};
pub use media_type::MediaType;
pub use pixel_format::PixelFormat;
pub use rational::{NOPTS_VALUE, Rational, Rounding, rescale_q, rescale_q_rnd};
pub use sample_format::SampleFormat;
