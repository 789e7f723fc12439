//! 核心功能模块
//!
//! 本模块提供了几何导入与实例化渲染的基础设施：日志系统、配置管理、
//! 错误处理，以及替代全局单例的资源上下文。
//!
//! # 模块组织
//!
//! - `log`：日志系统，基于 tracing 的结构化日志
//! - `config`：配置管理，支持从 TOML 文件加载
//! - `error`：错误处理，定义统一的错误类型
//! - `context`：资源上下文，显式传递给解码器、实例管理器和蒙皮子系统

pub mod log;
pub mod config;
pub mod error;
pub mod context;

// 重新导出常用类型，方便使用
pub use crate::math::{Vector3, Vector4, Matrix4, Quaternion};
pub use error::{Result, DistGeomError};
pub use config::Config;
pub use context::ResourceContext;
