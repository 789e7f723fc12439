//! 资源上下文
//!
//! 取代全局可变单例（网格注册表、"当前资源管理器"）的显式上下文对象。
//! 解码器、实例管理器和蒙皮子系统都从这里拿配置和共享注册表，
//! 而不是访问进程级的静态变量。

use crate::core::config::Config;
use crate::geometry::registry::MeshDataRegistry;
use crate::instancing::{MeshInstanceManager, MeshKey, MeshKind};
use crate::skinning::SkinningSubsystem;

/// 导入与渲染共享的资源上下文
#[derive(Debug)]
pub struct ResourceContext {
    config: Config,

    /// 按内容哈希去重的子网格数据
    pub mesh_registry: MeshDataRegistry,
}

impl ResourceContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            mesh_registry: MeshDataRegistry::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 按配置容量和默认颜色创建实例管理器
    pub fn create_instance_manager(&self, key: MeshKey, kind: MeshKind) -> MeshInstanceManager {
        MeshInstanceManager::new(
            key,
            kind,
            self.config.instancing.max_instances,
            self.config.instancing.default_color,
        )
    }

    /// 按配置上限创建蒙皮子系统
    pub fn create_skinning(&self) -> SkinningSubsystem {
        SkinningSubsystem::with_limits(
            self.config.skinning.max_bones_per_mesh,
            self.config.skinning.max_joints,
        )
    }
}

impl Default for ResourceContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
