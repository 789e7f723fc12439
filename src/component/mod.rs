//! 节点组件模块
//!
//! 场景节点由组件组合而成：局部变换、相机、灯光。
//! 网格与碰撞数据放在场景图的节点类别里（见 `scene::NodeKind`）。

mod camera;
mod light;
mod transform;

pub use camera::Camera;
pub use light::{Color, Light, LightType};
pub use transform::LocalTransform;
