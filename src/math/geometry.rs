//! 包围体与视锥体
//!
//! 提供可见性判定所需的几何类型：
//! - 轴对齐包围盒（AABB）及其外接球
//! - 平面（法线 + 距离，带符号距离）
//! - 六平面视锥体，可从相机参数或视图投影矩阵构建

use super::{matrix, Matrix4, Vector3};

/// 零半径包围球按此半径参与视锥测试
///
/// 位于视锥顶点（相机位置）的点状包围体到侧平面的距离恰好为 0，
/// 需要一个极小半径才能通过 `distance > -radius`。
pub const MIN_CULL_RADIUS: f32 = 1e-4;

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb {
    pub fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    /// 中心点：`min + 0.5 * (max - min)`
    pub fn center(&self) -> Vector3 {
        self.min + (self.max - self.min) * 0.5
    }

    /// 外接球
    ///
    /// 半径为对角线长度的一半：`0.5 * |max - min|`。
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere {
            center: self.center(),
            radius: 0.5 * (self.max - self.min).norm(),
        }
    }
}

/// 包围球
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vector3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vector3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// 用世界矩阵变换包围球
    ///
    /// 中心点按点变换，半径乘以最大轴向缩放，保证非均匀缩放后仍然包住原物体。
    pub fn transformed(&self, world: &Matrix4) -> BoundingSphere {
        BoundingSphere {
            center: matrix::transform_point(world, &self.center),
            radius: self.radius * matrix::max_axis_scale(world),
        }
    }
}

/// 平面：`normal · p + distance = 0`，法线指向视锥内侧
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vector3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// 过某点、给定法线的平面（法线会被归一化）
    pub fn from_point_normal(point: &Vector3, normal: &Vector3) -> Self {
        let n = normal.normalize();
        Self { normal: n, distance: -n.dot(point) }
    }

    /// 带符号距离（正值 = 内侧）
    pub fn signed_distance(&self, point: &Vector3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    fn normalized(self) -> Self {
        let length = self.normal.norm();
        if length > 0.0 {
            Self {
                normal: self.normal / length,
                distance: self.distance / length,
            }
        } else {
            self
        }
    }
}

/// 视锥体：左、右、下、上、近、远六个平面
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// 从相机参数构建视锥体
    ///
    /// 四个侧平面和近平面都经过相机位置，远平面位于 `far` 处。
    ///
    /// # 参数
    /// - `eye`: 相机位置
    /// - `forward`: 朝向
    /// - `up`: 上向量（不必与 forward 正交）
    /// - `fov_y`: 垂直视场角（弧度）
    /// - `aspect`: 宽高比
    /// - `far`: 远裁剪距离
    pub fn from_camera(
        eye: &Vector3,
        forward: &Vector3,
        up: &Vector3,
        fov_y: f32,
        aspect: f32,
        far: f32,
    ) -> Self {
        let f = forward.normalize();
        let r = f.cross(up).normalize();
        let u = r.cross(&f);

        let tan_v = (0.5 * fov_y).tan();
        let tan_h = tan_v * aspect;

        let left = Plane::from_point_normal(eye, &(r + f * tan_h));
        let right = Plane::from_point_normal(eye, &(-r + f * tan_h));
        let bottom = Plane::from_point_normal(eye, &(u + f * tan_v));
        let top = Plane::from_point_normal(eye, &(-u + f * tan_v));
        let near = Plane::from_point_normal(eye, &f);
        let far = Plane::from_point_normal(&(eye + f * far), &(-f));

        Self { planes: [left, right, bottom, top, near, far] }
    }

    /// 从视图投影矩阵提取平面（OpenGL 深度范围 [-1, 1]）
    pub fn from_view_projection(view_proj: &Matrix4) -> Self {
        let row = |i: usize| view_proj.row(i).transpose();
        let r0 = row(0);
        let r1 = row(1);
        let r2 = row(2);
        let r3 = row(3);

        let plane = |v: nalgebra::Vector4<f32>| {
            Plane::new(Vector3::new(v.x, v.y, v.z), v.w).normalized()
        };

        Self {
            planes: [
                plane(r3 + r0),
                plane(r3 - r0),
                plane(r3 + r1),
                plane(r3 - r1),
                plane(r3 + r2),
                plane(r3 - r2),
            ],
        }
    }

    /// 包围球可见性
    ///
    /// 对全部六个平面满足 `distance > -radius` 才可见。
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let radius = sphere.radius.max(MIN_CULL_RADIUS);
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(&sphere.center) > -radius)
    }
}
