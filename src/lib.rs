//! dist_geom - 二进制几何导入与实例化渲染
//!
//! 把二进制几何文件解码为共享的网格数据，由场景图驱动 GPU 实例缓冲与蒙皮矩阵。
//!
//! # 模块结构
//!
//! - `core`: 核心功能（日志、配置、错误处理、资源上下文）
//! - `math`: 数学库（矩阵约定、包围体、视锥体）
//! - `geometry`: 几何解码（头部/数据流、子网格注册表）
//! - `component`: 节点组件（局部变换、相机、灯光）
//! - `instancing`: 实例记录数组与绘制调用
//! - `skinning`: 骨骼重映射与蒙皮矩阵纹理
//! - `scene`: 场景图、变换/可见性传播、场景导入
//!
//! # 使用示例
//!
//! ```no_run
//! use dist_geom::core::{Config, ResourceContext};
//! use dist_geom::instancing::RecordingPass;
//! use dist_geom::scene::SceneImporter;
//!
//! let mut context = ResourceContext::new(Config::default());
//! let mut scene = SceneImporter::new(&mut context).import_file("assets/scene.toml")?;
//! scene.propagate()?;
//!
//! let mut pass = RecordingPass::new();
//! scene.render(&mut pass);
//! # Ok::<(), dist_geom::core::DistGeomError>(())
//! ```

pub mod core;
pub mod math;
pub mod geometry;
pub mod component;
pub mod instancing;
pub mod skinning;
pub mod scene;
