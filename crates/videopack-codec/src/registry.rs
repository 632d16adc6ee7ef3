//! 编码器注册表.
//!
//! 对标 FFmpeg 的编码器注册机制, 按 `CodecId` 查找并实例化编码器.

use std::collections::HashMap;

use videopack_core::{PackError, PackResult};

use crate::codec_id::CodecId;
use crate::encoder::Encoder;

/// 编码器工厂函数类型
pub type EncoderFactory = fn() -> PackResult<Box<dyn Encoder>>;

/// 编码器注册表
pub struct CodecRegistry {
    /// 编码器工厂映射, 同一 CodecId 下先注册者优先
    encoders: HashMap<CodecId, Vec<EncoderEntry>>,
}

/// 编码器注册条目
struct EncoderEntry {
    /// 编码器名称
    name: String,
    /// 工厂函数
    factory: EncoderFactory,
}

impl CodecRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            encoders: HashMap::new(),
        }
    }

    /// 注册一个编码器
    pub fn register_encoder(
        &mut self,
        codec_id: CodecId,
        name: impl Into<String>,
        factory: EncoderFactory,
    ) {
        self.encoders
            .entry(codec_id)
            .or_default()
            .push(EncoderEntry {
                name: name.into(),
                factory,
            });
    }

    /// 创建指定 CodecId 的编码器实例
    pub fn create_encoder(&self, codec_id: CodecId) -> PackResult<Box<dyn Encoder>> {
        let entry = self
            .encoders
            .get(&codec_id)
            .and_then(|entries| entries.first())
            .ok_or_else(|| PackError::CodecNotFound(format!("未找到 {codec_id} 的编码器")))?;
        (entry.factory)()
    }

    /// 是否注册了指定编码器
    pub fn has_encoder(&self, codec_id: CodecId) -> bool {
        self.encoders.contains_key(&codec_id)
    }

    /// 获取所有已注册的编码器, 按 CodecId 排序
    pub fn list_encoders(&self) -> Vec<(CodecId, &str)> {
        let mut result: Vec<(CodecId, &str)> = self
            .encoders
            .iter()
            .flat_map(|(id, entries)| entries.iter().map(|e| (*id, e.name.as_str())))
            .collect();
        result.sort_by_key(|(id, _)| *id);
        result
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
