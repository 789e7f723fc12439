//! 蒙皮子系统
//!
//! 每个蒙皮子网格有一张骨骼重映射表（局部骨骼槽位 -> 所属骨架的关节索引，
//! 最多 128 项），每个骨架最多 256 个关节。骨架按几何对象区分，各有一张
//! 关节表。姿态更新时，对每个蒙皮实例的每个槽位 `i` 用它自己骨架的关节表计算
//!
//! ```text
//! skin[i] = world(joint) * inverse_bind(joint),  joint = remap[i]
//! ```
//!
//! 写入大小为 `instance_count * 128 * 16` 的浮点纹理，实例数变化时重新分配。
//! 超出任一上限都是配置错误，直接返回。

use tracing::{debug, warn};

use crate::core::config::{MAX_BONES_PER_MESH, MAX_JOINTS};
use crate::core::error::SkinningError;
use crate::geometry::geom_object::GeomObject;
use crate::geometry::mesh::MeshMetaData;
use crate::math::Matrix4;
use crate::scene::NodeId;

/// 每个实例在纹理中的浮点数
pub const INSTANCE_REGION_FLOATS: usize = MAX_BONES_PER_MESH * 16;

/// 子网格的骨骼重映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinBinding {
    remap: Vec<u16>,
}

impl SkinBinding {
    /// 从子网格的蒙皮范围切出重映射表，按硬上限校验
    pub fn new(meta: &MeshMetaData, geom: &GeomObject) -> Result<Self, SkinningError> {
        Self::with_limits(meta, geom, MAX_BONES_PER_MESH, MAX_JOINTS)
    }

    pub fn with_limits(
        meta: &MeshMetaData,
        geom: &GeomObject,
        max_bones: usize,
        max_joints: usize,
    ) -> Result<Self, SkinningError> {
        let joint_count = geom.joint_count();
        if joint_count > max_joints {
            return Err(SkinningError::TooManyJoints {
                count: joint_count,
                cap: max_joints,
            });
        }

        let bones = meta.skin_count() as usize;
        if bones > max_bones {
            return Err(SkinningError::TooManyBones {
                count: bones,
                cap: max_bones,
            });
        }

        Self::from_remap(geom.bone_remap_for(meta).to_vec(), joint_count, max_bones)
    }

    /// 直接从重映射表构建
    pub fn from_remap(remap: Vec<u16>, joint_count: usize, max_bones: usize) -> Result<Self, SkinningError> {
        if remap.len() > max_bones {
            return Err(SkinningError::TooManyBones {
                count: remap.len(),
                cap: max_bones,
            });
        }
        if let Some((slot, &joint)) = remap
            .iter()
            .enumerate()
            .find(|(_, &joint)| joint as usize >= joint_count)
        {
            return Err(SkinningError::JointOutOfRange {
                slot,
                joint: joint as usize,
                joint_count,
            });
        }
        Ok(Self { remap })
    }

    pub fn remap(&self) -> &[u16] {
        &self.remap
    }

    pub fn bone_count(&self) -> usize {
        self.remap.len()
    }
}

/// 一个骨架的关节表：每个关节的世界矩阵与逆绑定矩阵
#[derive(Debug, Clone, Default)]
pub struct JointPalette {
    world: Vec<Matrix4>,
    inverse_bind: Vec<Matrix4>,
}

impl JointPalette {
    /// 世界矩阵初始为单位矩阵
    pub fn new(inverse_bind: Vec<Matrix4>) -> Self {
        Self {
            world: vec![Matrix4::identity(); inverse_bind.len()],
            inverse_bind,
        }
    }

    /// 取几何对象的关节，世界矩阵初始为绑定姿态
    pub fn from_geom(geom: &GeomObject) -> Self {
        Self {
            world: geom.joints.iter().map(|j| j.bind).collect(),
            inverse_bind: geom.joints.iter().map(|j| j.inverse_bind).collect(),
        }
    }

    pub fn joint_count(&self) -> usize {
        self.inverse_bind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inverse_bind.is_empty()
    }

    pub fn set_world(&mut self, joint: usize, world: Matrix4) -> Result<(), SkinningError> {
        let joint_count = self.joint_count();
        match self.world.get_mut(joint) {
            Some(slot) => {
                *slot = world;
                Ok(())
            }
            None => Err(SkinningError::JointOutOfRange {
                slot: joint,
                joint,
                joint_count,
            }),
        }
    }

    pub fn world(&self, joint: usize) -> Option<&Matrix4> {
        self.world.get(joint)
    }

    pub fn inverse_bind(&self, joint: usize) -> Option<&Matrix4> {
        self.inverse_bind.get(joint)
    }

    /// `world(joint) * inverse_bind(joint)`
    pub fn skin_matrix(&self, joint: usize) -> Option<Matrix4> {
        Some(self.world.get(joint)? * self.inverse_bind.get(joint)?)
    }
}

/// 一次姿态更新中的蒙皮实例
#[derive(Debug, Clone, Copy)]
pub struct SkinnedInstance<'a> {
    pub node: NodeId,
    pub binding: &'a SkinBinding,
    /// 实例所属骨架的关节表
    pub palette: &'a JointPalette,
}

#[derive(Debug)]
pub struct SkinningSubsystem {
    max_bones: usize,
    max_joints: usize,
    texture: Vec<f32>,
    instance_count: usize,
}

impl SkinningSubsystem {
    pub fn new() -> Self {
        Self::with_limits(MAX_BONES_PER_MESH, MAX_JOINTS)
    }

    /// 上限只能比硬上限更严格
    pub fn with_limits(max_bones: usize, max_joints: usize) -> Self {
        Self {
            max_bones: max_bones.min(MAX_BONES_PER_MESH),
            max_joints: max_joints.min(MAX_JOINTS),
            texture: Vec::new(),
            instance_count: 0,
        }
    }

    pub fn max_bones(&self) -> usize {
        self.max_bones
    }

    pub fn max_joints(&self) -> usize {
        self.max_joints
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// 蒙皮矩阵纹理，列主序，每实例 `128 * 16` 个浮点
    pub fn texture(&self) -> &[f32] {
        &self.texture
    }

    /// 为所有蒙皮实例计算蒙皮矩阵
    ///
    /// 未使用的槽位写单位矩阵。
    pub fn update(&mut self, instances: &[SkinnedInstance<'_>]) -> Result<(), SkinningError> {
        if let Some(instance) = instances.iter().find(|i| i.palette.joint_count() > self.max_joints) {
            return Err(SkinningError::TooManyJoints {
                count: instance.palette.joint_count(),
                cap: self.max_joints,
            });
        }
        if let Some(instance) = instances.iter().find(|i| i.binding.bone_count() > self.max_bones) {
            return Err(SkinningError::TooManyBones {
                count: instance.binding.bone_count(),
                cap: self.max_bones,
            });
        }

        if instances.len() != self.instance_count {
            debug!(
                from = self.instance_count,
                to = instances.len(),
                "Reallocating skin matrix texture"
            );
            self.instance_count = instances.len();
            self.texture = vec![0.0; self.instance_count * INSTANCE_REGION_FLOATS];
        }

        let identity = Matrix4::identity();
        for (instance, region) in instances
            .iter()
            .zip(self.texture.chunks_exact_mut(INSTANCE_REGION_FLOATS))
        {
            let remap = instance.binding.remap();
            let palette = instance.palette;
            for (slot, out) in region.chunks_exact_mut(16).enumerate() {
                let skin = match remap.get(slot) {
                    Some(&joint) => palette.skin_matrix(joint as usize).ok_or_else(|| {
                        warn!(node = instance.node.index(), slot, joint, "Bone remap outside joint palette");
                        SkinningError::JointOutOfRange {
                            slot,
                            joint: joint as usize,
                            joint_count: palette.joint_count(),
                        }
                    })?,
                    None => identity,
                };
                out.copy_from_slice(skin.as_slice());
            }
        }
        Ok(())
    }

    /// 读回某实例某槽位的蒙皮矩阵
    pub fn skin_matrix(&self, instance: usize, slot: usize) -> Option<Matrix4> {
        if instance >= self.instance_count || slot >= MAX_BONES_PER_MESH {
            return None;
        }
        let start = instance * INSTANCE_REGION_FLOATS + slot * 16;
        Some(Matrix4::from_column_slice(&self.texture[start..start + 16]))
    }
}

impl Default for SkinningSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::loaders::test_support::{HeaderBuilder, SubmeshSpec};
    use crate::geometry::loaders::{GeomLoader, MeshLoader};
    use crate::math::{matrix, quaternion, utils, Vector3};

    fn palette(count: usize) -> JointPalette {
        let inverse_bind = (0..count)
            .map(|i| matrix::translation(&Vector3::new(0.0, -(i as f32), 0.0)))
            .collect();
        let mut palette = JointPalette::new(inverse_bind);
        for i in 0..count {
            let world = matrix::translation(&Vector3::new(i as f32, i as f32, 0.0))
                * matrix::from_quaternion(&quaternion::from_euler_degrees(&Vector3::new(0.0, 30.0 * i as f32, 0.0)));
            palette.set_world(i, world).unwrap();
        }
        palette
    }

    #[test]
    fn test_skin_matrix_is_world_times_inverse_bind() {
        let palette = palette(4);
        let a = SkinBinding::from_remap(vec![3, 1], 4, 128).unwrap();
        let b = SkinBinding::from_remap(vec![0, 2, 2], 4, 128).unwrap();
        let instances = [
            SkinnedInstance { node: NodeId::new(0), binding: &a, palette: &palette },
            SkinnedInstance { node: NodeId::new(1), binding: &b, palette: &palette },
        ];

        let mut skinning = SkinningSubsystem::new();
        skinning.update(&instances).unwrap();

        for (index, instance) in instances.iter().enumerate() {
            for (slot, &joint) in instance.binding.remap().iter().enumerate() {
                let joint = joint as usize;
                let expected = palette.world(joint).unwrap() * palette.inverse_bind(joint).unwrap();
                let actual = skinning.skin_matrix(index, slot).unwrap();
                assert!(utils::matrix_approx_eq(&actual, &expected, 1e-6));
            }
        }
    }

    #[test]
    fn test_unused_slots_are_identity() {
        let palette = palette(2);
        let binding = SkinBinding::from_remap(vec![1], 2, 128).unwrap();
        let mut skinning = SkinningSubsystem::new();
        skinning
            .update(&[SkinnedInstance { node: NodeId::new(0), binding: &binding, palette: &palette }])
            .unwrap();

        assert_eq!(skinning.skin_matrix(0, 1).unwrap(), Matrix4::identity());
        assert_eq!(skinning.skin_matrix(0, 127).unwrap(), Matrix4::identity());
        assert!(skinning.skin_matrix(0, 128).is_none());
        assert!(skinning.skin_matrix(1, 0).is_none());
    }

    #[test]
    fn test_texture_reallocates_on_instance_count_change() {
        let palette = palette(2);
        let binding = SkinBinding::from_remap(vec![0, 1], 2, 128).unwrap();
        let one = [SkinnedInstance { node: NodeId::new(0), binding: &binding, palette: &palette }];
        let three = [one[0], one[0], one[0]];

        let mut skinning = SkinningSubsystem::new();
        skinning.update(&one).unwrap();
        assert_eq!(skinning.texture().len(), 128 * 16);

        skinning.update(&three).unwrap();
        assert_eq!(skinning.instance_count(), 3);
        assert_eq!(skinning.texture().len(), 3 * 128 * 16);
    }

    #[test]
    fn test_bone_cap_is_error() {
        assert_eq!(
            SkinBinding::from_remap(vec![0; 129], 1, 128),
            Err(SkinningError::TooManyBones { count: 129, cap: 128 })
        );

        let binding = SkinBinding::from_remap(vec![0; 64], 1, 128).unwrap();
        let palette = palette(1);
        let mut skinning = SkinningSubsystem::with_limits(32, 256);
        let result = skinning.update(&[SkinnedInstance { node: NodeId::new(0), binding: &binding, palette: &palette }]);
        assert_eq!(result, Err(SkinningError::TooManyBones { count: 64, cap: 32 }));
    }

    #[test]
    fn test_joint_cap_is_error() {
        let palette = JointPalette::new(vec![Matrix4::identity(); 257]);
        let binding = SkinBinding::from_remap(vec![0], 257, 128).unwrap();
        let mut skinning = SkinningSubsystem::new();
        let result = skinning.update(&[SkinnedInstance { node: NodeId::new(0), binding: &binding, palette: &palette }]);
        assert_eq!(result, Err(SkinningError::TooManyJoints { count: 257, cap: 256 }));
    }

    #[test]
    fn test_each_instance_uses_its_own_skeleton() {
        let short = palette(2);
        let long = palette(5);
        let a = SkinBinding::from_remap(vec![1], 2, 128).unwrap();
        let b = SkinBinding::from_remap(vec![4], 5, 128).unwrap();

        let mut skinning = SkinningSubsystem::new();
        skinning
            .update(&[
                SkinnedInstance { node: NodeId::new(0), binding: &a, palette: &short },
                SkinnedInstance { node: NodeId::new(1), binding: &b, palette: &long },
            ])
            .unwrap();

        assert!(utils::matrix_approx_eq(
            &skinning.skin_matrix(0, 0).unwrap(),
            &short.skin_matrix(1).unwrap(),
            1e-6
        ));
        assert!(utils::matrix_approx_eq(
            &skinning.skin_matrix(1, 0).unwrap(),
            &long.skin_matrix(4).unwrap(),
            1e-6
        ));
    }

    #[test]
    fn test_remap_outside_palette_is_error() {
        assert_eq!(
            SkinBinding::from_remap(vec![0, 5], 2, 128),
            Err(SkinningError::JointOutOfRange { slot: 1, joint: 5, joint_count: 2 })
        );
    }

    #[test]
    fn test_binding_from_decoded_geometry() {
        let (header, data) = HeaderBuilder::new()
            .submesh(SubmeshSpec::new("Arm", 7, 4).skin(1, 3))
            .joints(3)
            .bone_remap(vec![0, 2, 1])
            .build();
        let geom = GeomLoader::load_from_memory(&header, &data).unwrap();
        let meta = geom.meta(7).unwrap();

        let binding = SkinBinding::new(meta, &geom).unwrap();
        assert_eq!(binding.remap(), &[2, 1]);

        // 绑定姿态下蒙皮矩阵为单位矩阵
        let palette = JointPalette::from_geom(&geom);
        let mut skinning = SkinningSubsystem::new();
        skinning
            .update(&[SkinnedInstance { node: NodeId::new(0), binding: &binding, palette: &palette }])
            .unwrap();
        assert!(utils::matrix_approx_eq(
            &skinning.skin_matrix(0, 0).unwrap(),
            &Matrix4::identity(),
            1e-5
        ));
    }

    #[test]
    fn test_binding_respects_stricter_limits() {
        let (header, data) = HeaderBuilder::new()
            .submesh(SubmeshSpec::new("Arm", 7, 4).skin(0, 3))
            .joints(3)
            .bone_remap(vec![0, 2, 1])
            .build();
        let geom = GeomLoader::load_from_memory(&header, &data).unwrap();
        let meta = geom.meta(7).unwrap();

        assert_eq!(
            SkinBinding::with_limits(meta, &geom, 2, 256),
            Err(SkinningError::TooManyBones { count: 3, cap: 2 })
        );
        assert_eq!(
            SkinBinding::with_limits(meta, &geom, 128, 2),
            Err(SkinningError::TooManyJoints { count: 3, cap: 2 })
        );
    }
}
