//! 场景描述文件
//!
//! TOML 格式：一个相机块和一棵 `[[nodes]]` 节点树，子节点写在
//! `[[nodes.children]]` 中。子场景通过 `kind = "reference"` 引用另一个场景文件。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::component::{Camera, LocalTransform};
use crate::core::error::{Result, SceneError};
use crate::math::{utils, Matrix4, Vector3};

/// 节点类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKindDescription {
    #[default]
    Group,
    Mesh,
    Locator,
    Joint,
    Light,
    Collision,
    Reference,
}

/// 相机描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDescription {
    /// 相机位置
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],

    /// 观察目标
    #[serde(default)]
    pub target: [f32; 3],

    #[serde(default = "default_up")]
    pub up: [f32; 3],

    /// 垂直视野角度（度数）
    #[serde(default = "default_fov")]
    pub fov: f32,

    #[serde(default = "default_aspect")]
    pub aspect: f32,

    #[serde(default = "default_near_clip")]
    pub near_clip: f32,

    #[serde(default = "default_far_clip")]
    pub far_clip: f32,
}

fn default_camera_position() -> [f32; 3] {
    [0.0, 0.0, 10.0]
}

fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_fov() -> f32 {
    60.0
}

fn default_aspect() -> f32 {
    16.0 / 9.0
}

fn default_near_clip() -> f32 {
    0.1
}

fn default_far_clip() -> f32 {
    1000.0
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_material() -> String {
    "default".to_string()
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            target: [0.0, 0.0, 0.0],
            up: default_up(),
            fov: default_fov(),
            aspect: default_aspect(),
            near_clip: default_near_clip(),
            far_clip: default_far_clip(),
        }
    }
}

impl CameraDescription {
    pub fn to_camera(&self) -> Camera {
        let mut camera = Camera::new();
        camera.set_lens(
            utils::deg_to_rad(self.fov),
            self.aspect,
            self.near_clip,
            self.far_clip,
        );
        camera.look_at(
            Vector3::from(self.position),
            Vector3::from(self.target),
            Vector3::from(self.up),
        );
        camera
    }
}

/// 节点描述
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,

    #[serde(default)]
    pub kind: NodeKindDescription,

    #[serde(default)]
    pub position: [f32; 3],

    /// 欧拉角（度数）(pitch, yaw, roll)
    #[serde(default)]
    pub rotation: [f32; 3],

    #[serde(default = "default_scale")]
    pub scale: [f32; 3],

    /// 姿态矩阵，16 个浮点，列主序
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Vec<f32>>,

    /// 几何文件路径（相对于场景文件）；关节节点用它指明所属骨架
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,

    #[serde(default = "default_material")]
    pub material: String,

    /// 子网格哈希；省略时为几何中的每个子网格各建一个子节点
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submesh: Option<u64>,

    /// 骨架关节表中的索引
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint: Option<usize>,

    /// 灯光类型：directional / point / spot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_color: Option<[f32; 3]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,

    /// 碰撞体形状：mesh / primitive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision_shape: Option<String>,

    /// 子场景文件路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lod_distances: Vec<f32>,

    #[serde(default)]
    pub selected: bool,

    /// 实例颜色，省略时使用配置的默认颜色
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[f32; 4]>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDescription>,
}

impl NodeDescription {
    pub fn new(name: impl Into<String>, kind: NodeKindDescription) -> Self {
        Self {
            name: name.into(),
            kind,
            scale: default_scale(),
            material: default_material(),
            ..Default::default()
        }
    }

    /// 局部变换
    pub fn local_transform(&self) -> Result<LocalTransform> {
        let transform = LocalTransform::from_euler(
            Vector3::from(self.position),
            Vector3::from(self.rotation),
            Vector3::from(self.scale),
        );

        match &self.pose {
            Some(values) if values.len() == 16 => {
                Ok(transform.with_pose(Matrix4::from_column_slice(values)))
            }
            Some(values) => Err(SceneError::InvalidNode {
                name: self.name.clone(),
                reason: format!("pose has {} values, expected 16", values.len()),
            }
            .into()),
            None => Ok(transform),
        }
    }

    /// LOD 距离表必须升序
    pub fn validate_lod_distances(&self) -> Result<()> {
        if self.lod_distances.windows(2).any(|w| w[0] > w[1]) {
            return Err(SceneError::InvalidNode {
                name: self.name.clone(),
                reason: "lod_distances must be ascending".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// 场景描述
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub camera: CameraDescription,

    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
}

impl SceneDescription {
    /// 从文件加载场景描述
    ///
    /// 文件不存在返回 `SceneError::FileNotFound`，导入器据此生成缺失节点。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SceneError::FileNotFound(path.to_path_buf()).into());
        }

        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| SceneError::ParseError(format!("Failed to parse scene description: {}", e)).into())
    }

    /// 保存到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SceneError::ParseError(format!("Failed to serialize scene description: {}", e)))?;

        fs::write(path, contents)?;
        tracing::info!("Saved scene description to: {}", path.display());
        Ok(())
    }

    /// 节点总数（含所有层级的子节点，不展开引用）
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[NodeDescription]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.nodes)
    }
}
