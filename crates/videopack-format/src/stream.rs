//! 输出流描述.
//!
//! 对标 FFmpeg 的 `AVStream`: 记录流在容器中的索引、编码参数,
//! 以及编码器时间基与容器时间基两套时钟.

use videopack_codec::{CodecId, CodecParameters};
use videopack_core::{MediaType, Rational};

/// 输出流
#[derive(Debug, Clone)]
pub struct Stream {
    /// 流索引 (在容器中的位置, 从 0 开始)
    pub index: usize,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编码参数 (编码器打开后的参数, 含 extradata)
    pub codec_params: CodecParameters,
    /// 编码器时间基, 数据包时间戳以此为单位送入
    pub codec_time_base: Rational,
    /// 容器时间基, 写头部时可能被格式写入器改写
    pub time_base: Rational,
}

impl Stream {
    /// 由编码参数创建流, 容器时间基初始等于编码器时间基
    pub fn new(index: usize, codec_params: &CodecParameters) -> Self {
        let codec_time_base = codec_params.effective_time_base();
        Self {
            index,
            media_type: codec_params.media_type(),
            codec_params: codec_params.clone(),
            codec_time_base,
            time_base: codec_time_base,
        }
    }

    pub fn codec_id(&self) -> CodecId {
        self.codec_params.codec_id
    }
}
