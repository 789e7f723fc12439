//! 场景图传播
//!
//! 两次深度优先先序遍历，父节点总在子节点之前：
//!
//! 1. 变换：`world = parent.world * local`，`local = T * R * S * Pose`
//! 2. 可见性 / LOD：包围球视锥测试、按相机距离选 LOD，
//!    把世界矩阵及其导出矩阵和遮挡标志推入实例槽位
//!
//! 每次都完整遍历，不按脏标志跳过子树。

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::component::Camera;
use crate::core::error::Result;
use crate::instancing::{MeshInstanceManager, MeshKey};
use crate::math::geometry::Frustum;
use crate::math::{matrix, Matrix4, Vector3};

use super::graph::{NodeId, SceneGraph};

/// LOD 索引：距离表中 `<= distance` 的项数
///
/// 空表只有 LOD 0。
pub fn select_lod(distances: &[f32], distance: f32) -> usize {
    distances.iter().filter(|&&d| d <= distance).count()
}

/// 变换传播
pub struct TransformPropagator;

impl TransformPropagator {
    /// 重新计算所有节点的世界矩阵，返回访问的节点数
    pub fn run(graph: &mut SceneGraph) -> usize {
        let mut visited = 0;
        let mut stack: Vec<(NodeId, Matrix4)> = graph
            .roots()
            .iter()
            .rev()
            .map(|&id| (id, Matrix4::identity()))
            .collect();

        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = graph.node_mut(id) else {
                continue;
            };

            node.world = parent_world * node.transform.to_matrix();
            node.world_position = matrix::transform_point(&node.world, &Vector3::zeros());
            node.updated = false;
            visited += 1;

            let world = node.world;
            stack.extend(node.children.iter().rev().map(|&child| (child, world)));
        }
        visited
    }
}

/// 一次可见性传播的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityStats {
    pub visited: usize,
    /// 视锥外
    pub culled: usize,
    /// 在视锥内，但 LOD 与当前距离不符
    pub lod_rejected: usize,
    /// 写入实例槽位的节点数
    pub pushed: usize,
}

/// 可见性与 LOD 传播
pub struct VisibilityPropagator<'a> {
    camera: &'a Camera,
    frustum: Frustum,
}

impl<'a> VisibilityPropagator<'a> {
    pub fn new(camera: &'a Camera) -> Self {
        Self {
            camera,
            frustum: camera.frustum(),
        }
    }

    pub fn run(
        &self,
        graph: &mut SceneGraph,
        managers: &mut HashMap<MeshKey, MeshInstanceManager>,
    ) -> Result<VisibilityStats> {
        let mut stats = VisibilityStats::default();

        for id in graph.pre_order() {
            let Some(node) = graph.node_mut(id) else {
                continue;
            };
            stats.visited += 1;

            // 没有包围盒的节点（定位器、关节、灯光）不参与剔除
            let mut occluded = false;
            if let Some(mesh) = node.kind.mesh() {
                if let Some(meta) = mesh.meta() {
                    let sphere = meta.bounding_sphere().transformed(&node.world);
                    let lod = select_lod(&mesh.lod_distances, self.camera.distance_to(&sphere.center));
                    node.active_lod = lod;

                    if !self.frustum.intersects_sphere(&sphere) {
                        occluded = true;
                        stats.culled += 1;
                    } else if meta.lod_level as usize != lod {
                        occluded = true;
                        stats.lod_rejected += 1;
                    }
                }
            }
            node.occluded = occluded;

            let Some(handle) = &node.instance else {
                continue;
            };
            let Some(manager) = managers.get_mut(&handle.key) else {
                debug!(node = %node.name, material = %handle.key.material, "Instance handle without manager");
                continue;
            };

            if !manager.set_instance_transform(handle.slot, &node.world)? {
                warn!(node = %node.name, "Singular world matrix, derived matrices reset to identity");
            }
            manager.set_instance_occluded(handle.slot, occluded)?;
            manager.set_instance_selected(handle.slot, node.selected)?;
            stats.pushed += 1;
        }

        crate::render_debug!(
            visited = stats.visited,
            culled = stats.culled,
            lod_rejected = stats.lod_rejected,
            "Visibility pass finished"
        );
        Ok(stats)
    }
}
