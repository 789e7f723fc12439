//! 场景
//!
//! 把场景图、相机、按 (子网格, 材质) 分组的实例管理器以及蒙皮状态放在一起。
//! 节点的增删都经过这里，保证实例槽位和节点保存的句柄一致。

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::component::Camera;
use crate::core::context::ResourceContext;
use crate::core::error::{Result, SceneError};
use crate::geometry::geom_object::GeomObject;
use crate::instancing::{DrawRanges, MeshInstanceManager, MeshKey, RenderPass};
use crate::skinning::{JointPalette, SkinnedInstance, SkinningSubsystem};

use super::graph::{InstanceHandle, MeshNode, NodeId, NodeKind, SceneGraph, SceneNode};
use super::propagate::{TransformPropagator, VisibilityPropagator, VisibilityStats};

/// 一次完整传播的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationStats {
    pub transformed: usize,
    pub visibility: VisibilityStats,
    pub skinned: usize,
}

/// 一个几何对象的骨架
#[derive(Debug)]
struct Skeleton {
    geometry: Arc<GeomObject>,
    palette: JointPalette,
}

fn skeleton_index(skeletons: &[Skeleton], geometry: &Arc<GeomObject>) -> Option<usize> {
    skeletons.iter().position(|s| Arc::ptr_eq(&s.geometry, geometry))
}

#[derive(Debug)]
pub struct Scene {
    pub graph: SceneGraph,
    pub camera: Camera,
    managers: HashMap<MeshKey, MeshInstanceManager>,
    /// 管理器的创建顺序，保证绘制顺序稳定
    manager_order: Vec<MeshKey>,
    /// 按登记顺序；未指明骨架的关节节点属于第一个
    skeletons: Vec<Skeleton>,
    skinning: SkinningSubsystem,
}

impl Scene {
    pub fn new(context: &ResourceContext) -> Self {
        Self {
            graph: SceneGraph::new(),
            camera: Camera::new(),
            managers: HashMap::new(),
            manager_order: Vec::new(),
            skeletons: Vec::new(),
            skinning: context.create_skinning(),
        }
    }

    /// 登记几何对象的骨架，已登记时返回原有的序号
    ///
    /// 关节表的世界矩阵初始为绑定姿态。
    pub fn register_skeleton(&mut self, geometry: &Arc<GeomObject>) -> usize {
        if let Some(index) = skeleton_index(&self.skeletons, geometry) {
            return index;
        }
        self.skeletons.push(Skeleton {
            geometry: geometry.clone(),
            palette: JointPalette::from_geom(geometry),
        });
        self.skeletons.len() - 1
    }

    pub fn palette_for(&self, geometry: &Arc<GeomObject>) -> Option<&JointPalette> {
        skeleton_index(&self.skeletons, geometry).map(|index| &self.skeletons[index].palette)
    }

    pub fn skeleton_count(&self) -> usize {
        self.skeletons.len()
    }

    /// 所有骨架的关节总数
    pub fn joint_count(&self) -> usize {
        self.skeletons.iter().map(|s| s.palette.joint_count()).sum()
    }

    pub fn skinning(&self) -> &SkinningSubsystem {
        &self.skinning
    }

    pub fn manager(&self, key: &MeshKey) -> Option<&MeshInstanceManager> {
        self.managers.get(key)
    }

    /// 按创建顺序遍历实例管理器
    pub fn managers(&self) -> impl Iterator<Item = &MeshInstanceManager> {
        self.manager_order.iter().filter_map(|key| self.managers.get(key))
    }

    pub fn manager_count(&self) -> usize {
        self.managers.len()
    }

    pub fn instance_count(&self) -> usize {
        self.managers.values().map(MeshInstanceManager::count).sum()
    }

    pub fn visible_instance_count(&self) -> usize {
        self.managers.values().map(MeshInstanceManager::visible_instances).sum()
    }

    /// 添加节点并为可绘制节点登记实例
    ///
    /// 蒙皮网格和指明骨架的关节节点同时登记所属几何的骨架。
    pub fn add_node(
        &mut self,
        context: &ResourceContext,
        parent: Option<NodeId>,
        node: SceneNode,
    ) -> Result<NodeId> {
        let skeleton = match &node.kind {
            NodeKind::Joint { skeleton, .. } => skeleton.clone(),
            kind => kind
                .mesh()
                .filter(|mesh| mesh.skin.is_some())
                .map(|mesh| mesh.geometry.clone()),
        };
        if let Some(geometry) = skeleton {
            self.register_skeleton(&geometry);
        }

        let id = self.graph.add_node(parent, node);
        self.attach_instance(context, id)?;
        Ok(id)
    }

    /// 在节点对应的管理器中登记实例
    ///
    /// 管理器按需创建，容量和默认颜色取自配置。组节点和缺失节点返回 `None`。
    pub fn attach_instance(&mut self, context: &ResourceContext, id: NodeId) -> Result<Option<InstanceHandle>> {
        let node = self.graph.node(id).ok_or_else(|| SceneError::InvalidNode {
            name: format!("#{}", id.index()),
            reason: "node is not in the scene graph".to_string(),
        })?;

        let (Some(key), Some(kind)) = (node.kind.instance_key(), node.kind.mesh_kind()) else {
            return Ok(None);
        };
        let ranges = node.kind.mesh().and_then(MeshNode::meta).map(DrawRanges::from);
        let world = node.world;
        let selected = node.selected;
        let color = node.color;

        let manager = match self.managers.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.manager_order.push(key.clone());
                let manager = context.create_instance_manager(key.clone(), kind);
                entry.insert(match ranges {
                    Some(ranges) => manager.with_ranges(ranges),
                    None => manager,
                })
            }
        };

        let slot = manager.add_instance(id, &world)?;
        if selected {
            manager.set_instance_selected(slot, true)?;
        }
        if let Some(color) = color {
            manager.set_instance_color(slot, color)?;
        }

        let handle = InstanceHandle { key, slot };
        if let Some(node) = self.graph.node_mut(id) {
            node.instance = Some(handle.clone());
        }
        Ok(Some(handle))
    }

    /// 移除节点及其子树，返回移除的节点数
    ///
    /// 每个实例从管理器中移除；被移入空槽的节点更新其保存的槽位。
    pub fn remove_node(&mut self, id: NodeId) -> Result<usize> {
        let removed = self.graph.detach(id);

        for (node_id, node) in &removed {
            let Some(handle) = &node.instance else {
                continue;
            };
            let Some(manager) = self.managers.get_mut(&handle.key) else {
                continue;
            };

            if let Some(relocation) = manager.remove_instance(*node_id)? {
                if let Some(handle) = self
                    .graph
                    .node_mut(relocation.node)
                    .and_then(|moved| moved.instance.as_mut())
                {
                    handle.slot = relocation.slot;
                }
            }
        }
        Ok(removed.len())
    }

    /// 变换传播、可见性传播，然后更新蒙皮
    pub fn propagate(&mut self) -> Result<PropagationStats> {
        let transformed = TransformPropagator::run(&mut self.graph);
        let visibility = VisibilityPropagator::new(&self.camera).run(&mut self.graph, &mut self.managers)?;
        let skinned = self.update_skinning()?;

        Ok(PropagationStats {
            transformed,
            visibility,
            skinned,
        })
    }

    /// 收集关节节点的世界矩阵，为所有蒙皮实例计算蒙皮矩阵
    ///
    /// 每个蒙皮实例使用自己几何的骨架。蒙皮实例按先序编号，编号即在蒙皮纹理中的区域。
    fn update_skinning(&mut self) -> Result<usize> {
        let order = self.graph.pre_order();

        for &id in &order {
            let Some(node) = self.graph.node(id) else {
                continue;
            };
            let NodeKind::Joint { skeleton, index } = &node.kind else {
                continue;
            };
            let target = match skeleton {
                Some(geometry) => skeleton_index(&self.skeletons, geometry),
                None if self.skeletons.is_empty() => None,
                None => Some(0),
            };
            let Some(palette) = target.map(|t| &mut self.skeletons[t].palette) else {
                warn!(node = %node.name, joint = *index, "Joint node has no skeleton");
                continue;
            };
            if *index >= palette.joint_count() {
                warn!(node = %node.name, joint = *index, "Joint node outside the joint table");
                continue;
            }
            palette.set_world(*index, node.world)?;
        }

        let mut regions = Vec::new();
        let mut instances = Vec::new();
        for &id in &order {
            let Some(mesh) = self.graph.node(id).and_then(|node| node.kind.mesh()) else {
                continue;
            };
            let Some(binding) = mesh.skin.as_ref() else {
                continue;
            };
            let Some(index) = skeleton_index(&self.skeletons, &mesh.geometry) else {
                warn!(node = id.index(), "Skinned mesh without a registered skeleton");
                continue;
            };
            regions.push(id);
            instances.push(SkinnedInstance {
                node: id,
                binding,
                palette: &self.skeletons[index].palette,
            });
        }

        if instances.is_empty() && self.skinning.instance_count() == 0 {
            return Ok(0);
        }
        self.skinning.update(&instances)?;

        for (region, id) in regions.iter().enumerate() {
            if let Some(node) = self.graph.node_mut(*id) {
                node.skin_region = Some(region);
            }
        }
        Ok(regions.len())
    }

    /// 为每个管理器发出绘制调用，返回调用总数
    pub fn render(&self, pass: &mut dyn RenderPass) -> usize {
        self.managers().map(|manager| manager.render(pass)).sum()
    }

    /// 输出场景统计
    pub fn log_summary(&self) {
        info!(
            nodes = self.graph.len(),
            managers = self.manager_count(),
            instances = self.instance_count(),
            visible = self.visible_instance_count(),
            skeletons = self.skeleton_count(),
            joints = self.joint_count(),
            skinned = self.skinning.instance_count(),
            "Scene summary"
        );
    }
}
