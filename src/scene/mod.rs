//! 场景图
//!
//! - `graph`：节点 arena、节点类别、实例句柄
//! - `propagate`：变换传播与可见性 / LOD 传播
//! - `world`：场景（场景图 + 实例管理器 + 蒙皮）
//! - `description`：TOML 场景描述
//! - `import`：从场景描述构建场景

pub mod description;
pub mod graph;
pub mod import;
pub mod propagate;
pub mod world;

pub use description::{CameraDescription, NodeDescription, NodeKindDescription, SceneDescription};
pub use graph::{InstanceHandle, MeshNode, NodeId, NodeKind, SceneGraph, SceneNode};
pub use import::{ImportStats, SceneImporter};
pub use propagate::{select_lod, TransformPropagator, VisibilityPropagator, VisibilityStats};
pub use world::{PropagationStats, Scene};
