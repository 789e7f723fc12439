/// 子网格数据注册表
///
/// 按内容哈希去重已解码的 `MeshData`。先写入者获胜：同一 `(hash, material)`
/// 的重复保存只记录警告，从不覆盖。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::geometry::mesh::MeshData;

#[derive(Debug)]
struct RegistryEntry {
    data: Arc<MeshData>,
    materials: Vec<String>,
}

#[derive(Debug)]
pub struct MeshDataRegistry {
    entries: HashMap<u64, RegistryEntry>,
    empty: Arc<MeshData>,
}

impl MeshDataRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            empty: Arc::new(MeshData::empty()),
        }
    }

    /// 查询共享数据
    ///
    /// 未命中时返回空哨兵（零长度缓冲），调用方需用 `is_empty()` 检查。
    pub fn get(&self, hash: u64) -> Arc<MeshData> {
        match self.entries.get(&hash) {
            Some(entry) => Arc::clone(&entry.data),
            None => Arc::clone(&self.empty),
        }
    }

    /// 保存数据
    ///
    /// - 新哈希：存入数据并绑定材质，返回 `true`
    /// - 已知哈希、新材质：仅绑定材质，保留第一次写入的数据，返回 `true`
    /// - 重复的 `(hash, material)`：警告并忽略，返回 `false`
    pub fn save(&mut self, hash: u64, material: &str, data: Arc<MeshData>) -> bool {
        match self.entries.get_mut(&hash) {
            Some(entry) => {
                if entry.materials.iter().any(|m| m == material) {
                    warn!(hash, material, "Duplicate mesh data save ignored");
                    return false;
                }
                entry.materials.push(material.to_string());
                debug!(hash, material, "Bound material to existing mesh data");
                true
            }
            None => {
                self.entries.insert(
                    hash,
                    RegistryEntry {
                        data,
                        materials: vec![material.to_string()],
                    },
                );
                debug!(hash, material, "Registered mesh data");
                true
            }
        }
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.entries.contains_key(&hash)
    }

    /// 绑定到某个哈希的材质名
    pub fn materials(&self, hash: u64) -> &[String] {
        self.entries
            .get(&hash)
            .map(|entry| entry.materials.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MeshDataRegistry {
    fn default() -> Self {
        Self::new()
    }
}
