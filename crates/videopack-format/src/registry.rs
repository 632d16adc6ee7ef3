//! 输出格式注册表.
//!
//! 管理所有已注册的格式写入器, 按格式标识查找并创建实例.

use std::collections::HashMap;

use videopack_core::{PackError, PackResult};

use crate::format_id::FormatId;
use crate::io::OutputTarget;
use crate::writer::FormatWriter;

/// 格式写入器工厂函数类型
pub type WriterFactory = fn(OutputTarget) -> PackResult<Box<dyn FormatWriter>>;

/// 写入器注册条目
struct WriterEntry {
    /// 写入器名称
    name: String,
    /// 工厂函数
    factory: WriterFactory,
}

/// 输出格式注册表
pub struct FormatRegistry {
    writers: HashMap<FormatId, WriterEntry>,
}

impl FormatRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            writers: HashMap::new(),
        }
    }

    /// 注册一个格式写入器, 同一格式后注册的覆盖先注册的
    pub fn register_writer(
        &mut self,
        format_id: FormatId,
        name: impl Into<String>,
        factory: WriterFactory,
    ) {
        self.writers.insert(
            format_id,
            WriterEntry {
                name: name.into(),
                factory,
            },
        );
    }

    /// 创建指定格式的写入器实例
    pub fn create_writer(
        &self,
        format_id: FormatId,
        target: OutputTarget,
    ) -> PackResult<Box<dyn FormatWriter>> {
        let entry = self.writers.get(&format_id).ok_or_else(|| {
            let hint = if format_id.is_container() {
                " (容器格式需要启用 ffmpeg 特性)"
            } else {
                ""
            };
            PackError::FormatNotFound(format!("未找到 {format_id} 的写入器{hint}"))
        })?;
        (entry.factory)(target)
    }

    /// 是否已注册指定格式
    pub fn has_writer(&self, format_id: FormatId) -> bool {
        self.writers.contains_key(&format_id)
    }

    /// 获取所有已注册的写入器 (按格式标识排序)
    pub fn list_writers(&self) -> Vec<(FormatId, &str)> {
        let mut list: Vec<_> = self
            .writers
            .iter()
            .map(|(id, entry)| (*id, entry.name.as_str()))
            .collect();
        list.sort_by_key(|(id, _)| *id);
        list
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
