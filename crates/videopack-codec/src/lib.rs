//! # videopack-codec
//!
//! videopack 编码器适配层, 提供编码器框架与 Frame/Packet 抽象.
//!
//! ## 内置编码器
//!
//! - **透传**: rawvideo, pcm_s16le, pcm_s16be
//! - **FFmpeg** (feature `ffmpeg`): h264, aac
//!
//! ## 使用示例
//!
//! ```rust
//! use videopack_codec::{CodecId, CodecRegistry};
//!
//! let mut reg = CodecRegistry::new();
//! videopack_codec::register_all(&mut reg);
//!
//! let encoder = reg.create_encoder(CodecId::PcmS16le).unwrap();
//! assert_eq!(encoder.name(), "pcm_s16le");
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod encoder;
pub mod encoders;
pub mod frame;
pub mod packet;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::{AudioCodecParams, CodecParameters, CodecParamsType, VideoCodecParams};
pub use encoder::Encoder;
pub use frame::{AudioFrame, Frame, VideoFrame};
pub use packet::Packet;
pub use registry::CodecRegistry;

/// 注册所有内置编码器
pub fn register_all(registry: &mut CodecRegistry) {
    encoders::register_all_encoders(registry);
}
