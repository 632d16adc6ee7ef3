//! 编码器实现模块.

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod pcm;
pub mod rawvideo;

use crate::codec_id::CodecId;
use crate::registry::CodecRegistry;

/// 注册所有内置编码器
pub fn register_all_encoders(registry: &mut CodecRegistry) {
    registry.register_encoder(
        CodecId::RawVideo,
        "rawvideo",
        rawvideo::RawVideoEncoder::create,
    );
    registry.register_encoder(CodecId::PcmS16le, "pcm_s16le", pcm::PcmEncoder::new_s16le);
    registry.register_encoder(CodecId::PcmS16be, "pcm_s16be", pcm::PcmEncoder::new_s16be);

    #[cfg(feature = "ffmpeg")]
    ffmpeg::register_ffmpeg_encoders(registry);
}
