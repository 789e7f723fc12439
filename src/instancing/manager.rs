//! 实例管理器
//!
//! 定长实例记录数组，容量在创建时确定，GPU 缓冲按 `capacity * STRIDE_BYTES`
//! 一次性分配，从不增长。
//!
//! - 添加：追加到下一个空槽，超出容量返回 `CapacityExceeded`
//! - 移除：把最后一个活动槽移入空出的槽，返回被移动节点的新槽位
//! - 可见实例计数随遮挡标志的每次翻转增量更新

use std::ops::Range;

use crate::core::error::InstanceError;
use crate::geometry::mesh::{ElementRange, MeshMetaData};
use crate::math::Matrix4;
use crate::scene::NodeId;

use super::draw::{RenderPass, Topology, JOINT_VERTEX_COUNT, LIGHT_VERTEX_COUNT, LOCATOR_VERTEX_COUNT};
use super::record::{InstanceRecord, STRIDE_BYTES};
use super::{CollisionShape, MeshKey, MeshKind};

/// 移除实例后被移动的节点及其新槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub node: NodeId,
    pub slot: usize,
}

/// 绘制所需的子网格范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawRanges {
    pub indices: ElementRange,
    pub physics_vertices: ElementRange,
    pub physics_indices: ElementRange,
}

impl From<&MeshMetaData> for DrawRanges {
    fn from(meta: &MeshMetaData) -> Self {
        Self {
            indices: meta.indices,
            physics_vertices: meta.physics_vertices,
            physics_indices: meta.physics_indices,
        }
    }
}

#[derive(Debug)]
pub struct MeshInstanceManager {
    key: MeshKey,
    kind: MeshKind,
    capacity: usize,
    default_color: [f32; 4],
    ranges: Option<DrawRanges>,
    records: Vec<InstanceRecord>,
    owners: Vec<NodeId>,
    visible: usize,
    dirty: Option<Range<usize>>,
}

impl MeshInstanceManager {
    pub fn new(key: MeshKey, kind: MeshKind, capacity: usize, default_color: [f32; 4]) -> Self {
        Self {
            key,
            kind,
            capacity,
            default_color,
            ranges: None,
            records: Vec::with_capacity(capacity),
            owners: Vec::with_capacity(capacity),
            visible: 0,
            dirty: None,
        }
    }

    /// 设置索引类网格的绘制范围
    pub fn with_ranges(mut self, ranges: DrawRanges) -> Self {
        self.ranges = Some(ranges);
        self
    }

    pub fn key(&self) -> &MeshKey {
        &self.key
    }

    pub fn kind(&self) -> MeshKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_color(&self) -> [f32; 4] {
        self.default_color
    }

    /// 活动实例数
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 未遮挡的实例数
    pub fn visible_instances(&self) -> usize {
        self.visible
    }

    /// GPU 缓冲大小
    pub fn buffer_size_bytes(&self) -> usize {
        self.capacity * STRIDE_BYTES
    }

    /// 添加实例，返回槽位
    ///
    /// 新记录写入节点当前的世界矩阵及其导出矩阵，可见、未选中、默认颜色。
    pub fn add_instance(&mut self, node: NodeId, world: &Matrix4) -> Result<usize, InstanceError> {
        if self.records.len() >= self.capacity {
            return Err(InstanceError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let mut record = InstanceRecord::new(self.default_color);
        record.set_transform(world);

        let slot = self.records.len();
        self.records.push(record);
        self.owners.push(node);
        self.visible += 1;
        self.mark_dirty(slot);

        crate::render_debug!(node = node.index(), slot, material = %self.key.material, "Instance added");
        Ok(slot)
    }

    /// 移除节点的实例
    ///
    /// 最后一个活动槽移入空出的槽。若有节点被移动，返回它的新槽位，
    /// 调用方需更新该节点保存的槽位。
    pub fn remove_instance(&mut self, node: NodeId) -> Result<Option<Relocation>, InstanceError> {
        let slot = self
            .slot_of(node)
            .ok_or(InstanceError::UnknownNode(node.index()))?;
        self.remove_slot(slot)
    }

    /// 按槽位移除
    pub fn remove_slot(&mut self, slot: usize) -> Result<Option<Relocation>, InstanceError> {
        self.check_slot(slot)?;

        if !self.records[slot].is_occluded() {
            self.visible -= 1;
        }

        let last = self.records.len() - 1;
        self.records.swap_remove(slot);
        self.owners.swap_remove(slot);
        self.clamp_dirty();

        if slot == last {
            return Ok(None);
        }

        self.mark_dirty(slot);
        let relocation = Relocation {
            node: self.owners[slot],
            slot,
        };
        crate::render_debug!(
            node = relocation.node.index(),
            from = last,
            to = slot,
            "Instance relocated"
        );
        Ok(Some(relocation))
    }

    /// 节点占用的槽位
    pub fn slot_of(&self, node: NodeId) -> Option<usize> {
        self.owners.iter().position(|&owner| owner == node)
    }

    /// 槽位的所属节点
    pub fn owner(&self, slot: usize) -> Option<NodeId> {
        self.owners.get(slot).copied()
    }

    /// 写入世界矩阵并同步法线矩阵与世界逆矩阵
    ///
    /// 世界矩阵奇异时返回 `Ok(false)`，导出矩阵写为单位矩阵。
    pub fn set_instance_transform(&mut self, slot: usize, world: &Matrix4) -> Result<bool, InstanceError> {
        let invertible = self.record_mut(slot)?.set_transform(world);
        Ok(invertible)
    }

    pub fn set_instance_world_mat(&mut self, slot: usize, world: &Matrix4) -> Result<(), InstanceError> {
        self.record_mut(slot)?.set_world(world);
        Ok(())
    }

    pub fn set_instance_normal_mat(&mut self, slot: usize, normal: &Matrix4) -> Result<(), InstanceError> {
        self.record_mut(slot)?.set_normal(normal);
        Ok(())
    }

    pub fn set_instance_world_mat_inv(&mut self, slot: usize, world_inv: &Matrix4) -> Result<(), InstanceError> {
        self.record_mut(slot)?.set_world_inv(world_inv);
        Ok(())
    }

    /// 设置遮挡标志，并增量更新可见计数
    pub fn set_instance_occluded(&mut self, slot: usize, occluded: bool) -> Result<(), InstanceError> {
        let record = self.record_mut(slot)?;
        let was_occluded = record.is_occluded();
        record.occluded = if occluded { 1.0 } else { 0.0 };

        match (was_occluded, occluded) {
            (false, true) => self.visible -= 1,
            (true, false) => self.visible += 1,
            _ => {}
        }
        Ok(())
    }

    pub fn set_instance_selected(&mut self, slot: usize, selected: bool) -> Result<(), InstanceError> {
        self.record_mut(slot)?.selected = if selected { 1.0 } else { 0.0 };
        Ok(())
    }

    pub fn set_instance_color(&mut self, slot: usize, color: [f32; 4]) -> Result<(), InstanceError> {
        self.record_mut(slot)?.color = color;
        Ok(())
    }

    pub fn instance(&self, slot: usize) -> Result<&InstanceRecord, InstanceError> {
        self.check_slot(slot)?;
        Ok(&self.records[slot])
    }

    pub fn instance_world_mat(&self, slot: usize) -> Result<Matrix4, InstanceError> {
        Ok(self.instance(slot)?.world_matrix())
    }

    pub fn instance_normal_mat(&self, slot: usize) -> Result<Matrix4, InstanceError> {
        Ok(self.instance(slot)?.normal_matrix())
    }

    pub fn instance_world_mat_inv(&self, slot: usize) -> Result<Matrix4, InstanceError> {
        Ok(self.instance(slot)?.world_inv_matrix())
    }

    pub fn is_instance_occluded(&self, slot: usize) -> Result<bool, InstanceError> {
        Ok(self.instance(slot)?.is_occluded())
    }

    pub fn is_instance_selected(&self, slot: usize) -> Result<bool, InstanceError> {
        Ok(self.instance(slot)?.is_selected())
    }

    /// 活动记录
    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    /// 活动记录的字节视图，用于上传
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    /// 取出并清空自上次上传以来修改过的槽位范围
    pub fn take_dirty_range(&mut self) -> Option<Range<usize>> {
        self.dirty.take()
    }

    /// 发出本管理器的实例化绘制调用，返回调用数
    ///
    /// 没有活动实例时不发任何调用。
    pub fn render(&self, pass: &mut dyn RenderPass) -> usize {
        if self.records.is_empty() {
            return 0;
        }
        let instances = self.records.len() as u32;

        let ranges = match self.ranges {
            Some(ranges) => ranges,
            None if self.kind.is_indexed() => {
                crate::render_debug!(hash = self.key.mesh_hash, "No index ranges, draw skipped");
                return 0;
            }
            None => DrawRanges::default(),
        };

        match self.kind {
            MeshKind::Mesh | MeshKind::Collision(CollisionShape::Primitive) => {
                pass.draw_indexed_instanced(
                    Topology::Triangles,
                    ranges.indices.start,
                    ranges.indices.count,
                    instances,
                );
            }
            MeshKind::Collision(CollisionShape::Mesh) => {
                pass.draw_indexed_base_vertex_instanced(
                    Topology::Triangles,
                    ranges.physics_indices.start,
                    ranges.physics_indices.count,
                    ranges.physics_vertices.start,
                    instances,
                );
            }
            MeshKind::Locator => pass.draw_instanced(Topology::Lines, LOCATOR_VERTEX_COUNT, instances),
            MeshKind::Joint => pass.draw_instanced(Topology::Lines, JOINT_VERTEX_COUNT, instances),
            MeshKind::Light => pass.draw_instanced(Topology::Points, LIGHT_VERTEX_COUNT, instances),
        }
        1
    }

    fn check_slot(&self, slot: usize) -> Result<(), InstanceError> {
        if slot >= self.records.len() {
            return Err(InstanceError::SlotOutOfRange {
                slot,
                count: self.records.len(),
            });
        }
        Ok(())
    }

    fn record_mut(&mut self, slot: usize) -> Result<&mut InstanceRecord, InstanceError> {
        self.check_slot(slot)?;
        self.mark_dirty(slot);
        Ok(&mut self.records[slot])
    }

    /// 脏范围不超出活动实例
    fn clamp_dirty(&mut self) {
        let count = self.records.len();
        self.dirty = self
            .dirty
            .take()
            .map(|range| range.start.min(count)..range.end.min(count))
            .filter(|range| !range.is_empty());
    }

    fn mark_dirty(&mut self, slot: usize) {
        self.dirty = Some(match self.dirty.take() {
            Some(range) => range.start.min(slot)..range.end.max(slot + 1),
            None => slot..slot + 1,
        });
    }
}
