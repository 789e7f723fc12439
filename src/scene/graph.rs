//! 场景图
//!
//! 节点存放在 arena 中，用 `NodeId` 寻址，父子关系都是 id。
//! 节点类别是带标签的枚举，而不是继承层次。
//!
//! 世界矩阵只由变换传播写入，其他地方只读。

use std::path::PathBuf;
use std::sync::Arc;

use crate::component::{Light, LocalTransform};
use crate::geometry::geom_object::GeomObject;
use crate::geometry::mesh::MeshMetaData;
use crate::instancing::{CollisionShape, MeshKey, MeshKind};
use crate::math::{Matrix4, Vector3};
use crate::skinning::SkinBinding;

/// 节点 id（arena 下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// 节点在实例管理器中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHandle {
    pub key: MeshKey,
    pub slot: usize,
}

/// 引用一个子网格的节点数据
#[derive(Debug, Clone)]
pub struct MeshNode {
    pub geometry: Arc<GeomObject>,
    pub submesh: u64,
    pub material: String,
    /// 蒙皮子网格的骨骼重映射
    pub skin: Option<SkinBinding>,
    /// 升序的 LOD 切换距离
    pub lod_distances: Vec<f32>,
}

impl MeshNode {
    pub fn meta(&self) -> Option<&MeshMetaData> {
        self.geometry.meta(self.submesh)
    }
}

/// 节点类别
#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
    Collision { mesh: MeshNode, shape: CollisionShape },
    Locator,
    /// `skeleton` 为 `None` 时属于场景的第一个骨架
    Joint { skeleton: Option<Arc<GeomObject>>, index: usize },
    Light(Light),
    /// 缺失的子场景引用
    Missing { path: PathBuf },
}

impl NodeKind {
    pub fn mesh(&self) -> Option<&MeshNode> {
        match self {
            NodeKind::Mesh(mesh) | NodeKind::Collision { mesh, .. } => Some(mesh),
            _ => None,
        }
    }

    /// 对应的实例绘制类别；组节点和缺失节点没有实例
    pub fn mesh_kind(&self) -> Option<MeshKind> {
        match self {
            NodeKind::Mesh(_) => Some(MeshKind::Mesh),
            NodeKind::Collision { shape, .. } => Some(MeshKind::Collision(*shape)),
            NodeKind::Locator => Some(MeshKind::Locator),
            NodeKind::Joint { .. } => Some(MeshKind::Joint),
            NodeKind::Light(_) => Some(MeshKind::Light),
            NodeKind::Group | NodeKind::Missing { .. } => None,
        }
    }

    /// 实例管理器的键
    ///
    /// 网格按 (子网格哈希, 材质)；辅助图元每类共用一个管理器。
    pub fn instance_key(&self) -> Option<MeshKey> {
        match self {
            NodeKind::Mesh(mesh) => Some(MeshKey::new(mesh.submesh, mesh.material.clone())),
            NodeKind::Collision { mesh, .. } => {
                Some(MeshKey::new(mesh.submesh, format!("{}#collision", mesh.material)))
            }
            NodeKind::Locator => Some(MeshKey::new(0, "#locator")),
            NodeKind::Joint { .. } => Some(MeshKey::new(0, "#joint")),
            NodeKind::Light(_) => Some(MeshKey::new(0, "#light")),
            NodeKind::Group | NodeKind::Missing { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Mesh(_) => "mesh",
            NodeKind::Collision { .. } => "collision",
            NodeKind::Locator => "locator",
            NodeKind::Joint { .. } => "joint",
            NodeKind::Light(_) => "light",
            NodeKind::Missing { .. } => "missing",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: LocalTransform,
    pub kind: NodeKind,

    /// 局部变换已修改、等待下一次变换传播
    pub updated: bool,

    /// 最近一次传播得到的世界矩阵与世界位置
    pub world: Matrix4,
    pub world_position: Vector3,

    pub instance: Option<InstanceHandle>,
    pub occluded: bool,
    pub active_lod: usize,
    pub selected: bool,
    pub color: Option<[f32; 4]>,

    /// 在蒙皮纹理中的实例区域
    pub skin_region: Option<usize>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, transform: LocalTransform, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform,
            kind,
            updated: true,
            world: Matrix4::identity(),
            world_position: Vector3::zeros(),
            instance: None,
            occluded: false,
            active_lod: 0,
            selected: false,
            color: None,
            skin_region: None,
        }
    }

    /// 修改局部变换并标记
    pub fn set_transform(&mut self, transform: LocalTransform) {
        self.transform = transform;
        self.updated = true;
    }
}

/// 节点 arena
///
/// 分离的节点留下空位，id 不会被复用。
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<Option<SceneNode>>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加节点；`parent` 必须是图中的节点，否则作为根节点
    pub fn add_node(&mut self, parent: Option<NodeId>, mut node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = parent.filter(|p| self.contains(*p));
        node.parent = parent;
        self.nodes.push(Some(node));

        match parent.and_then(|p| self.node_mut(p)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// 存活节点数
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按名称查找（先序中的第一个）
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.pre_order()
            .into_iter()
            .find(|&id| self.node(id).is_some_and(|n| n.name == name))
    }

    /// 先序遍历：父节点总在子节点之前，兄弟按插入顺序
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                order.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    /// 分离子树并返回其中的全部节点（先序）
    pub fn detach(&mut self, id: NodeId) -> Vec<(NodeId, SceneNode)> {
        let Some(parent) = self.node(id).map(|n| n.parent) else {
            return Vec::new();
        };

        match parent.and_then(|p| self.node_mut(p)) {
            Some(parent_node) => parent_node.children.retain(|&c| c != id),
            None => self.roots.retain(|&r| r != id),
        }

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children.iter().rev());
                removed.push((current, node));
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(graph: &mut SceneGraph, parent: Option<NodeId>, name: &str) -> NodeId {
        graph.add_node(parent, SceneNode::new(name, LocalTransform::new(), NodeKind::Group))
    }

    #[test]
    fn test_pre_order_visits_parent_first() {
        let mut graph = SceneGraph::new();
        let root = group(&mut graph, None, "root");
        let a = group(&mut graph, Some(root), "a");
        let b = group(&mut graph, Some(root), "b");
        let a1 = group(&mut graph, Some(a), "a1");
        let other = group(&mut graph, None, "other");

        assert_eq!(graph.pre_order(), vec![root, a, a1, b, other]);
        assert_eq!(graph.find("a1"), Some(a1));
        assert_eq!(graph.node(a1).unwrap().parent, Some(a));
    }

    #[test]
    fn test_detach_removes_subtree() {
        let mut graph = SceneGraph::new();
        let root = group(&mut graph, None, "root");
        let a = group(&mut graph, Some(root), "a");
        let a1 = group(&mut graph, Some(a), "a1");
        let b = group(&mut graph, Some(root), "b");

        let removed: Vec<NodeId> = graph.detach(a).into_iter().map(|(id, _)| id).collect();
        assert_eq!(removed, vec![a, a1]);
        assert!(!graph.contains(a1));
        assert_eq!(graph.node(root).unwrap().children, vec![b]);
        assert_eq!(graph.len(), 2);

        // id 不复用
        let c = group(&mut graph, None, "c");
        assert_eq!(c.index(), 4);
    }

    #[test]
    fn test_unknown_parent_becomes_root() {
        let mut graph = SceneGraph::new();
        let id = group(&mut graph, Some(NodeId::new(42)), "orphan");
        assert_eq!(graph.roots(), &[id]);
        assert_eq!(graph.node(id).unwrap().parent, None);
    }

    #[test]
    fn test_kind_keys() {
        assert_eq!(NodeKind::Group.instance_key(), None);
        assert_eq!(NodeKind::Locator.mesh_kind(), Some(MeshKind::Locator));
        assert_eq!(
            NodeKind::Joint { skeleton: None, index: 3 }.instance_key(),
            Some(MeshKey::new(0, "#joint"))
        );
        assert_eq!(NodeKind::Missing { path: PathBuf::from("x.toml") }.label(), "missing");
    }
}
