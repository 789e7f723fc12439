/// 关节绑定数据
///
/// 每个骨架关节一条记录：直接读取的逆绑定矩阵，以及由平移、四元数、
/// 缩放重建的绑定矩阵。除根关节外，`bind * inverse_bind ≈ I`。

use crate::math::{matrix, utils, Matrix4, Quaternion, Vector3};

/// 文件中每条关节记录的字节数
///
/// 16×f32 逆绑定矩阵 + 3×f32 平移 + 4×f32 四元数 + 3×f32 缩放。
pub const JOINT_RECORD_SIZE: usize = 104;

#[derive(Debug, Clone, PartialEq)]
pub struct JointBindingData {
    pub inverse_bind: Matrix4,
    pub translation: Vector3,
    pub rotation: Quaternion,
    pub scale: Vector3,
    pub bind: Matrix4,
}

impl JointBindingData {
    /// 从绑定分量构建，绑定矩阵按 `T * R * S` 重建
    pub fn new(inverse_bind: Matrix4, translation: Vector3, rotation: Quaternion, scale: Vector3) -> Self {
        let bind = matrix::compose_local(&translation, &rotation, &scale, None);
        Self {
            inverse_bind,
            translation,
            rotation,
            scale,
            bind,
        }
    }

    /// 绑定矩阵与逆绑定矩阵互逆
    pub fn is_consistent(&self, epsilon: f32) -> bool {
        utils::matrix_approx_eq(&(self.bind * self.inverse_bind), &Matrix4::identity(), epsilon)
    }
}
