//! 相机组件
//!
//! 管理相机的位置、朝向和透视参数，并为可见性传播提供视锥体。

use crate::math::geometry::Frustum;
use crate::math::{matrix, Matrix4, Vector3};
use std::f32::consts::PI;

#[derive(Debug, Clone)]
pub struct Camera {
    /// 相机位置
    position: Vector3,

    /// 相机坐标系：右向量
    right: Vector3,

    /// 相机坐标系：上向量
    up: Vector3,

    /// 相机坐标系：前向量（Look）
    look: Vector3,

    /// 近裁剪面距离
    near_z: f32,

    /// 远裁剪面距离
    far_z: f32,

    /// 宽高比
    aspect: f32,

    /// 垂直视场角（弧度）
    fov_y: f32,
}

impl Camera {
    /// 创建相机：位于原点看向 -Z，FOV=45 度，aspect=1.0，near=1.0，far=1000.0
    pub fn new() -> Self {
        Self {
            position: Vector3::zeros(),
            right: Vector3::new(1.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            look: Vector3::new(0.0, 0.0, -1.0),
            near_z: 1.0,
            far_z: 1000.0,
            aspect: 1.0,
            fov_y: 0.25 * PI,
        }
    }

    // ========== 位置与坐标系 ==========

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }

    pub fn right(&self) -> Vector3 {
        self.right
    }

    pub fn up(&self) -> Vector3 {
        self.up
    }

    pub fn look(&self) -> Vector3 {
        self.look
    }

    // ========== 透视参数 ==========

    pub fn near_z(&self) -> f32 {
        self.near_z
    }

    pub fn far_z(&self) -> f32 {
        self.far_z
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// 垂直 FOV（弧度）
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    /// 设置透视投影参数
    ///
    /// # 参数
    /// - `fov_y`: 垂直视场角（弧度）
    /// - `aspect`: 宽高比
    /// - `near_z`: 近裁剪面距离
    /// - `far_z`: 远裁剪面距离
    pub fn set_lens(&mut self, fov_y: f32, aspect: f32, near_z: f32, far_z: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near_z = near_z;
        self.far_z = far_z;
    }

    /// 设置相机朝向目标点
    ///
    /// # 参数
    /// - `position`: 相机位置
    /// - `target`: 目标位置
    /// - `world_up`: 世界上向量（通常是 (0, 1, 0)）
    pub fn look_at(&mut self, position: Vector3, target: Vector3, world_up: Vector3) {
        let look = (target - position).normalize();
        let right = look.cross(&world_up).normalize();
        let up = right.cross(&look);

        self.position = position;
        self.look = look;
        self.right = right;
        self.up = up;
    }

    // ========== 矩阵与视锥 ==========

    pub fn view_matrix(&self) -> Matrix4 {
        matrix::look_at(&self.position, &(self.position + self.look), &self.up)
    }

    /// 可见性测试用的视锥体
    ///
    /// 近平面经过相机位置，远平面位于 `far_z`。
    pub fn frustum(&self) -> Frustum {
        Frustum::from_camera(
            &self.position,
            &self.look,
            &self.up,
            self.fov_y,
            self.aspect,
            self.far_z,
        )
    }

    /// 到某点的距离（LOD 选择用）
    pub fn distance_to(&self, point: &Vector3) -> f32 {
        (point - self.position).norm()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
