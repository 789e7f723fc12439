//! 统一的数学库模块
//!
//! 提供场景图、实例缓冲和蒙皮使用的数学类型和函数。
//! 基于 `nalgebra`，采用列向量约定：`world = parent * local`，
//! 局部矩阵按 `T * R * S * Pose` 组合。
//!
//! # 模块组织
//!
//! - **基础类型**：Vector3/4, Matrix3/4, Quaternion
//! - **常量**：PI, DEG_TO_RAD 等
//! - **工具函数**：approx_eq, deg_to_rad 等
//! - **矩阵辅助函数**：变换组合、法线矩阵、安全求逆
//! - **几何处理**：包围盒、包围球、视锥体（见 geometry 子模块）

pub use nalgebra::{
    Matrix3 as Mat3, Matrix4 as Mat4, Point3, UnitQuaternion,
    Vector3 as Vec3, Vector4 as Vec4,
};

// 类型别名，使用更简洁的名称
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix3 = Mat3<f32>;
pub type Matrix4 = Mat4<f32>;
pub type Quaternion = UnitQuaternion<f32>;

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-6;
}

/// 数学工具函数
pub mod utils {
    use super::*;

    /// 角度转弧度
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// 检查两个浮点数是否近似相等
    pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }

    /// 逐元素比较两个矩阵
    pub fn matrix_approx_eq(a: &Matrix4, b: &Matrix4, epsilon: f32) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| approx_eq(*x, *y, epsilon))
    }
}

/// 矩阵辅助函数
pub mod matrix {
    use super::*;

    /// 创建平移矩阵
    pub fn translation(v: &Vector3) -> Matrix4 {
        Matrix4::new_translation(v)
    }

    /// 创建非均匀缩放矩阵
    pub fn scaling(v: &Vector3) -> Matrix4 {
        Matrix4::new_nonuniform_scaling(v)
    }

    /// 从四元数创建旋转矩阵
    pub fn from_quaternion(quat: &Quaternion) -> Matrix4 {
        quat.to_homogeneous()
    }

    /// 组合局部矩阵：`T * R * S * Pose`
    ///
    /// 行向量写法中的 `pose * scale * rotation * translation`。
    /// 顺序固定，先应用姿态矩阵，最后平移。
    pub fn compose_local(
        position: &Vector3,
        rotation: &Quaternion,
        scale: &Vector3,
        pose: Option<&Matrix4>,
    ) -> Matrix4 {
        let trs = translation(position) * from_quaternion(rotation) * scaling(scale);
        match pose {
            Some(pose) => trs * pose,
            None => trs,
        }
    }

    /// 求逆；奇异矩阵返回 `None`
    pub fn try_inverse(m: &Matrix4) -> Option<Matrix4> {
        m.try_inverse()
    }

    /// 法线矩阵：左上 3x3 的逆转置，嵌入 4x4
    ///
    /// 奇异矩阵（例如某轴缩放为 0）返回单位矩阵。
    pub fn normal_matrix(world: &Matrix4) -> Matrix4 {
        let upper: Matrix3 = world.fixed_view::<3, 3>(0, 0).into_owned();
        match upper.try_inverse() {
            Some(inverse) => inverse.transpose().to_homogeneous(),
            None => Matrix4::identity(),
        }
    }

    /// 用矩阵变换一个点（w = 1）
    pub fn transform_point(m: &Matrix4, p: &Vector3) -> Vector3 {
        m.transform_point(&Point3::from(*p)).coords
    }

    /// 三个轴向缩放中的最大值
    pub fn max_axis_scale(m: &Matrix4) -> f32 {
        (0..3)
            .map(|c| m.fixed_view::<3, 1>(0, c).norm())
            .fold(0.0, f32::max)
    }

    /// 创建透视投影矩阵
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        Matrix4::new_perspective(aspect, fov_y, near, far)
    }

    /// 创建 Look-At 视图矩阵
    pub fn look_at(eye: &Vector3, target: &Vector3, up: &Vector3) -> Matrix4 {
        Matrix4::look_at_rh(&Point3::from(*eye), &Point3::from(*target), up)
    }
}

/// 四元数辅助函数
pub mod quaternion {
    use super::*;

    /// 从欧拉角（度数，pitch/yaw/roll）创建四元数
    pub fn from_euler_degrees(euler: &Vector3) -> Quaternion {
        UnitQuaternion::from_euler_angles(
            utils::deg_to_rad(euler.x),
            utils::deg_to_rad(euler.y),
            utils::deg_to_rad(euler.z),
        )
    }

    /// 从文件中的 (x, y, z, w) 分量创建单位四元数
    pub fn from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Quaternion {
        UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, x, y, z))
    }
}

// 几何处理模块（包围体、视锥体）
pub mod geometry;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_translation() {
        let mat = matrix::translation(&Vector3::new(1.0, 2.0, 3.0));
        let point = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let result = mat * point;

        assert!((result.x - 1.0).abs() < 1e-6);
        assert!((result.y - 2.0).abs() < 1e-6);
        assert!((result.z - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_compose_local_applies_scale_before_translation() {
        let local = matrix::compose_local(
            &Vector3::new(10.0, 0.0, 0.0),
            &Quaternion::identity(),
            &Vector3::new(2.0, 2.0, 2.0),
            None,
        );
        let p = matrix::transform_point(&local, &Vector3::new(1.0, 0.0, 0.0));
        assert!(utils::approx_eq(p.x, 12.0, 1e-5));
    }

    #[test]
    fn test_compose_local_applies_pose_first() {
        let pose = matrix::translation(&Vector3::new(0.0, 1.0, 0.0));
        let local = matrix::compose_local(
            &Vector3::zeros(),
            &Quaternion::identity(),
            &Vector3::new(3.0, 3.0, 3.0),
            Some(&pose),
        );
        // 姿态平移也被缩放
        let p = matrix::transform_point(&local, &Vector3::zeros());
        assert!(utils::approx_eq(p.y, 3.0, 1e-5));
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale() {
        let world = matrix::scaling(&Vector3::new(2.0, 2.0, 2.0));
        let normal = matrix::normal_matrix(&world);
        assert!(utils::approx_eq(normal[(0, 0)], 0.5, 1e-6));
        assert!(utils::approx_eq(normal[(3, 3)], 1.0, 1e-6));
    }

    #[test]
    fn test_normal_matrix_of_singular_is_identity() {
        let world = matrix::scaling(&Vector3::new(0.0, 1.0, 1.0));
        assert_eq!(matrix::normal_matrix(&world), Matrix4::identity());
    }

    #[test]
    fn test_max_axis_scale() {
        let world = matrix::scaling(&Vector3::new(1.0, 4.0, 2.0));
        assert!(utils::approx_eq(matrix::max_axis_scale(&world), 4.0, 1e-6));
    }

    #[test]
    fn test_quaternion_from_xyzw_identity() {
        let q = quaternion::from_xyzw(0.0, 0.0, 0.0, 1.0);
        assert!(utils::matrix_approx_eq(
            &matrix::from_quaternion(&q),
            &Matrix4::identity(),
            1e-6
        ));
    }
}
