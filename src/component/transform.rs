//! 局部变换组件
//!
//! 位置、旋转、缩放，以及可选的姿态矩阵。局部矩阵固定按
//! `T * R * S * Pose` 组合（先应用姿态，最后平移）。

use crate::math::{matrix, quaternion, Matrix4, Quaternion, Vector3};

#[derive(Debug, Clone, PartialEq)]
pub struct LocalTransform {
    /// 位置
    pub position: Vector3,

    /// 旋转
    pub rotation: Quaternion,

    /// 缩放
    pub scale: Vector3,

    /// 姿态矩阵（关节动画等，可选）
    pub pose: Option<Matrix4>,
}

impl LocalTransform {
    /// 单位变换
    pub fn new() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: Quaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            pose: None,
        }
    }

    /// 创建带位置的变换
    pub fn with_position(position: Vector3) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    /// 从位置、欧拉角（度数）、缩放创建
    pub fn from_euler(position: Vector3, euler_degrees: Vector3, scale: Vector3) -> Self {
        Self {
            position,
            rotation: quaternion::from_euler_degrees(&euler_degrees),
            scale,
            pose: None,
        }
    }

    pub fn with_pose(mut self, pose: Matrix4) -> Self {
        self.pose = Some(pose);
        self
    }

    /// 局部矩阵
    pub fn to_matrix(&self) -> Matrix4 {
        matrix::compose_local(&self.position, &self.rotation, &self.scale, self.pose.as_ref())
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::utils::approx_eq;

    #[test]
    fn test_identity() {
        assert_eq!(LocalTransform::new().to_matrix(), Matrix4::identity());
    }

    #[test]
    fn test_order_scale_rotate_translate() {
        let transform = LocalTransform::from_euler(
            Vector3::new(0.0, 0.0, 5.0),
            Vector3::new(0.0, 90.0, 0.0),
            Vector3::new(2.0, 2.0, 2.0),
        );
        // (1,0,0) 缩放为 (2,0,0)，绕 Y 转 90 度到 (0,0,-2)，再平移到 (0,0,3)
        let p = matrix::transform_point(&transform.to_matrix(), &Vector3::new(1.0, 0.0, 0.0));
        assert!(approx_eq(p.x, 0.0, 1e-5));
        assert!(approx_eq(p.z, 3.0, 1e-5));
    }

    #[test]
    fn test_pose_applied_first() {
        let transform = LocalTransform::with_position(Vector3::new(1.0, 0.0, 0.0))
            .with_pose(matrix::scaling(&Vector3::new(3.0, 3.0, 3.0)));
        let p = matrix::transform_point(&transform.to_matrix(), &Vector3::new(1.0, 0.0, 0.0));
        assert!(approx_eq(p.x, 4.0, 1e-5));
    }
}
