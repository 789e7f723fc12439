//! 配置管理模块
//!
//! 提供引擎配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//!
//! [instancing]
//! max_instances = 512
//!
//! [skinning]
//! max_bones_per_mesh = 128
//! max_joints = 256
//!
//! [import]
//! data_extension = "geomdata"
//! placeholder_on_missing = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 每个实例管理器允许的最小容量
pub const MIN_INSTANCE_CAPACITY: usize = 300;

/// 每个实例管理器允许的最大容量
pub const MAX_INSTANCE_CAPACITY: usize = 512;

/// 单个网格骨骼重映射的硬上限
pub const MAX_BONES_PER_MESH: usize = 128;

/// 场景关节表的硬上限
pub const MAX_JOINTS: usize = 256;

/// 引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 实例缓冲配置
    #[serde(default)]
    pub instancing: InstancingConfig,

    /// 蒙皮配置
    #[serde(default)]
    pub skinning: SkinningConfig,

    /// 导入配置
    #[serde(default)]
    pub import: ImportConfig,

    /// 启动时导入的场景文件（可由 `--scene` 覆盖）
    #[serde(default)]
    pub scene: Option<String>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// 实例缓冲配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstancingConfig {
    /// 每个 (几何体, 材质) 组合的实例上限
    #[serde(default = "default_max_instances")]
    pub max_instances: usize,

    /// 新实例的默认颜色 (RGBA)
    #[serde(default = "default_color")]
    pub default_color: [f32; 4],
}

/// 蒙皮配置
///
/// 两个值都只能比硬上限更严格，不能放宽。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinningConfig {
    #[serde(default = "default_max_bones")]
    pub max_bones_per_mesh: usize,

    #[serde(default = "default_max_joints")]
    pub max_joints: usize,
}

/// 导入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// 数据流文件扩展名（与头部文件同名）
    #[serde(default = "default_data_extension")]
    pub data_extension: String,

    /// 几何文件缺失时是否替换为内置占位网格
    #[serde(default = "default_placeholder_on_missing")]
    pub placeholder_on_missing: bool,
}

// 默认值函数
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "dist_geom.log".to_string() }
fn default_max_instances() -> usize { MAX_INSTANCE_CAPACITY }
fn default_color() -> [f32; 4] { [1.0, 1.0, 1.0, 1.0] }
fn default_max_bones() -> usize { MAX_BONES_PER_MESH }
fn default_max_joints() -> usize { MAX_JOINTS }
fn default_data_extension() -> String { "geomdata".to_string() }
fn default_placeholder_on_missing() -> bool { true }

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            instancing: InstancingConfig::default(),
            skinning: SkinningConfig::default(),
            import: ImportConfig::default(),
            scene: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Default for InstancingConfig {
    fn default() -> Self {
        Self {
            max_instances: default_max_instances(),
            default_color: default_color(),
        }
    }
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            max_bones_per_mesh: default_max_bones(),
            max_joints: default_max_joints(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            data_extension: default_data_extension(),
            placeholder_on_missing: default_placeholder_on_missing(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--scene <path>`: 要导入的场景文件
    /// - `--max-instances <n>`: 每个实例管理器的容量
    /// - `--log-level <level>`: trace / debug / info / warn / error
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if let Some(idx) = args.iter().position(|a| a == "--scene") {
            if let Some(path) = args.get(idx + 1) {
                self.scene = Some(path.clone());
            }
        }

        if let Some(idx) = args.iter().position(|a| a == "--max-instances") {
            if let Some(value) = args.get(idx + 1) {
                if let Ok(max) = value.parse() {
                    self.instancing.max_instances = max;
                }
            }
        }

        if let Some(idx) = args.iter().position(|a| a == "--log-level") {
            if let Some(value) = args.get(idx + 1) {
                if let Some(level) = LogLevel::parse(value) {
                    self.logging.level = level;
                }
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        let max = self.instancing.max_instances;
        if !(MIN_INSTANCE_CAPACITY..=MAX_INSTANCE_CAPACITY).contains(&max) {
            return Err(ConfigError::InvalidValue {
                field: "instancing.max_instances".to_string(),
                reason: format!(
                    "must be within {}..={}",
                    MIN_INSTANCE_CAPACITY, MAX_INSTANCE_CAPACITY
                ),
            }.into());
        }

        if self.skinning.max_bones_per_mesh == 0 || self.skinning.max_bones_per_mesh > MAX_BONES_PER_MESH {
            return Err(ConfigError::InvalidValue {
                field: "skinning.max_bones_per_mesh".to_string(),
                reason: format!("must be within 1..={}", MAX_BONES_PER_MESH),
            }.into());
        }

        if self.skinning.max_joints == 0 || self.skinning.max_joints > MAX_JOINTS {
            return Err(ConfigError::InvalidValue {
                field: "skinning.max_joints".to_string(),
                reason: format!("must be within 1..={}", MAX_JOINTS),
            }.into());
        }

        if self.import.data_extension.is_empty() || self.import.data_extension.contains('.') {
            return Err(ConfigError::InvalidValue {
                field: "import.data_extension".to_string(),
                reason: "must be a bare extension without dots".to_string(),
            }.into());
        }

        Ok(())
    }
}

impl LogLevel {
    /// 从字符串解析日志级别（大小写不敏感）
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// `EnvFilter` 使用的指令字符串
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.instancing.max_instances, 512);
        assert_eq!(config.skinning.max_bones_per_mesh, 128);
        assert_eq!(config.skinning.max_joints, 256);
        assert_eq!(config.import.data_extension, "geomdata");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.instancing.max_instances = 100;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.skinning.max_joints = 300;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.import.data_extension = ".bin".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args([
            "dist_geom",
            "--scene",
            "assets/scene.toml",
            "--max-instances",
            "300",
            "--log-level",
            "DEBUG",
        ]);

        assert_eq!(config.scene.as_deref(), Some("assets/scene.toml"));
        assert_eq!(config.instancing.max_instances, 300);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[instancing]\nmax_instances = 400\n").unwrap();
        assert_eq!(config.instancing.max_instances, 400);
        assert_eq!(config.instancing.default_color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(config.logging.level, LogLevel::Info);
    }
}
