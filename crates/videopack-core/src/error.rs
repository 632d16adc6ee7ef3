//! 统一错误类型定义.
//!
//! 所有 videopack crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

use crate::media_type::MediaType;

/// videopack 统一错误类型
#[derive(Debug, Error)]
pub enum PackError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 编码器错误
    #[error("编码器错误: {0}")]
    Codec(String),

    /// 容器格式错误
    #[error("格式错误: {0}")]
    Format(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 编码器暂无输出, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾 (编码器已排空)
    #[error("已到达流末尾")]
    Eof,

    /// 未找到指定的编码器
    #[error("未找到编码器: {0}")]
    CodecNotFound(String),

    /// 未找到指定的容器格式
    #[error("未找到容器格式: {0}")]
    FormatNotFound(String),

    /// 未找到指定的流
    #[error("未找到流: 索引 {0}")]
    StreamNotFound(usize),

    /// 无效数据 (帧大小不匹配等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 某条流的编码/封装操作失败
    #[error("{media}流{operation}失败")]
    Stream {
        /// 出错的流类型
        media: MediaType,
        /// 出错的操作 (读取/编码/排空/写包)
        operation: &'static str,
        /// 原始错误
        #[source]
        source: Box<PackError>,
    },

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

impl PackError {
    /// 为错误附加所属流与操作
    pub fn in_stream(self, media: MediaType, operation: &'static str) -> Self {
        Self::Stream {
            media,
            operation,
            source: Box::new(self),
        }
    }
}

/// videopack 统一 Result 类型
pub type PackResult<T> = Result<T, PackError>;
