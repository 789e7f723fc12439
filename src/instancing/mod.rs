//! GPU 实例管理
//!
//! 每个 (子网格, 材质) 组合一个 `MeshInstanceManager`，持有定长的实例记录数组。
//! 所有引用同一子网格的场景节点共享这个数组，每个节点占一个槽位。

pub mod draw;
pub mod manager;
pub mod record;

pub use draw::{DrawCall, RecordingPass, RenderPass, Topology};
pub use manager::{DrawRanges, MeshInstanceManager, Relocation};
pub use record::{InstanceRecord, STRIDE_BYTES, STRIDE_FLOATS};

/// 实例管理器的键：子网格内容哈希 + 材质名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeshKey {
    pub mesh_hash: u64,
    pub material: String,
}

impl MeshKey {
    pub fn new(mesh_hash: u64, material: impl Into<String>) -> Self {
        Self {
            mesh_hash,
            material: material.into(),
        }
    }
}

/// 碰撞体形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionShape {
    /// 物理网格，用物理索引范围绘制
    Mesh,
    /// 基本体（盒、球等），用图形索引绘制
    Primitive,
}

/// 网格类别，决定绘制方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    Mesh,
    Collision(CollisionShape),
    Locator,
    Joint,
    Light,
}

impl MeshKind {
    /// 是否需要子网格的索引范围才能绘制
    pub fn is_indexed(&self) -> bool {
        matches!(self, MeshKind::Mesh | MeshKind::Collision(_))
    }
}
