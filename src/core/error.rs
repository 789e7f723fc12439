//! 错误处理模块
//!
//! 定义了引擎中使用的统一错误类型。每个子系统（配置、几何解码、实例管理、
//! 蒙皮、场景导入）都有自己的错误枚举，并通过 `From` 汇入 `DistGeomError`，
//! 这样调用方可以直接使用 `?` 传播错误。
//!
//! # 致命与可恢复
//!
//! - `DecodeError` 一律视为致命错误：整个导入过程中止
//! - 缺失文件由导入器处理（占位资源 / 哨兵节点），不会以错误形式冒泡

use std::fmt;
use std::path::PathBuf;

/// 引擎统一的 Result 类型
pub type Result<T> = std::result::Result<T, DistGeomError>;

/// dist_geom 的顶层错误类型
#[derive(Debug)]
pub enum DistGeomError {
    /// 配置错误
    Config(ConfigError),

    /// 几何二进制解码错误
    Decode(DecodeError),

    /// 实例缓冲区错误
    Instancing(InstanceError),

    /// 蒙皮配置错误
    Skinning(SkinningError),

    /// 场景描述 / 导入错误
    Scene(SceneError),

    /// IO 错误
    Io(std::io::Error),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 几何头部流 / 数据流解码错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// 读取越过流末尾
    Truncated { offset: u64, needed: usize, available: u64 },

    /// 相对偏移解析出的目标位置不在流内
    OffsetOutOfRange { field: u64, target: i64 },

    /// 未知的顶点元素类型码
    UnknownTypeCode(i32),

    /// 未知的顶点语义
    UnknownSemantic(i32),

    /// 描述符的元素个数与类型码不符
    ElementCountMismatch { type_code: i32, expected: u32, found: i32 },

    /// 索引宽度标志既不是 0 也不是 1
    InvalidIndexWidth(i32),

    /// 计数字段为负数
    NegativeCount { table: &'static str, count: i32 },

    /// 表的条目数与子网格数不一致
    TableMismatch { table: &'static str, expected: usize, found: usize },

    /// 范围字段无效（起止颠倒或越界）
    InvalidRange { table: &'static str, index: usize, reason: String },

    /// 蒙皮上限被突破（骨骼重映射 128 / 关节 256）
    SkinCapExceeded { what: &'static str, count: usize, cap: usize },

    /// 数据流读取失败
    DataStream(String),
}

/// 实例管理相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    /// 超过实例上限
    CapacityExceeded { capacity: usize },

    /// 槽位超出活动实例范围
    SlotOutOfRange { slot: usize, count: usize },

    /// 节点没有在此管理器中登记
    UnknownNode(usize),
}

/// 蒙皮相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkinningError {
    /// 单个网格的骨骼重映射超过上限
    TooManyBones { count: usize, cap: usize },

    /// 场景关节数超过上限
    TooManyJoints { count: usize, cap: usize },

    /// 重映射指向不存在的关节
    JointOutOfRange { slot: usize, joint: usize, joint_count: usize },
}

/// 场景导入相关的错误
#[derive(Debug)]
pub enum SceneError {
    /// 场景文件不存在
    FileNotFound(PathBuf),

    /// 场景描述解析失败
    ParseError(String),

    /// 节点描述不合法
    InvalidNode { name: String, reason: String },
}

impl fmt::Display for DistGeomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistGeomError::Config(e) => write!(f, "Configuration error: {}", e),
            DistGeomError::Decode(e) => write!(f, "Geometry decode error: {}", e),
            DistGeomError::Instancing(e) => write!(f, "Instancing error: {}", e),
            DistGeomError::Skinning(e) => write!(f, "Skinning error: {}", e),
            DistGeomError::Scene(e) => write!(f, "Scene error: {}", e),
            DistGeomError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { offset, needed, available } => write!(
                f,
                "Stream truncated: need {} bytes at 0x{:X}, stream holds {} bytes",
                needed, offset, available
            ),
            DecodeError::OffsetOutOfRange { field, target } => write!(
                f,
                "Relative offset at 0x{:X} resolves outside the stream (target {})",
                field, target
            ),
            DecodeError::UnknownTypeCode(code) => write!(f, "Unknown vertex element type code {}", code),
            DecodeError::UnknownSemantic(id) => write!(f, "Unknown vertex semantic {}", id),
            DecodeError::ElementCountMismatch { type_code, expected, found } => write!(
                f,
                "Type code {} carries {} components, descriptor declares {}",
                type_code, expected, found
            ),
            DecodeError::InvalidIndexWidth(flag) => write!(f, "Invalid index width flag {}", flag),
            DecodeError::NegativeCount { table, count } => {
                write!(f, "Negative count {} in table '{}'", count, table)
            }
            DecodeError::TableMismatch { table, expected, found } => write!(
                f,
                "Table '{}' has {} entries, expected {}",
                table, found, expected
            ),
            DecodeError::InvalidRange { table, index, reason } => {
                write!(f, "Invalid range in '{}' entry {}: {}", table, index, reason)
            }
            DecodeError::SkinCapExceeded { what, count, cap } => {
                write!(f, "{} count {} exceeds hard cap {}", what, count, cap)
            }
            DecodeError::DataStream(msg) => write!(f, "Data stream error: {}", msg),
        }
    }
}

impl fmt::Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceError::CapacityExceeded { capacity } => {
                write!(f, "Instance capacity of {} exceeded", capacity)
            }
            InstanceError::SlotOutOfRange { slot, count } => {
                write!(f, "Instance slot {} out of range (active {})", slot, count)
            }
            InstanceError::UnknownNode(node) => write!(f, "Node {} has no instance here", node),
        }
    }
}

impl fmt::Display for SkinningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkinningError::TooManyBones { count, cap } => {
                write!(f, "Bone remap count {} exceeds cap {}", count, cap)
            }
            SkinningError::TooManyJoints { count, cap } => {
                write!(f, "Joint count {} exceeds cap {}", count, cap)
            }
            SkinningError::JointOutOfRange { slot, joint, joint_count } => write!(
                f,
                "Bone slot {} maps to joint {}, scene has {} joints",
                slot, joint, joint_count
            ),
        }
    }
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::FileNotFound(path) => write!(f, "Scene file not found: {}", path.display()),
            SceneError::ParseError(msg) => write!(f, "Failed to parse scene: {}", msg),
            SceneError::InvalidNode { name, reason } => {
                write!(f, "Invalid node '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for DistGeomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DistGeomError::Io(e) => Some(e),
            DistGeomError::Config(e) => Some(e),
            DistGeomError::Decode(e) => Some(e),
            DistGeomError::Instancing(e) => Some(e),
            DistGeomError::Skinning(e) => Some(e),
            DistGeomError::Scene(e) => Some(e),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for DecodeError {}
impl std::error::Error for InstanceError {}
impl std::error::Error for SkinningError {}
impl std::error::Error for SceneError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for DistGeomError {
    fn from(err: std::io::Error) -> Self {
        DistGeomError::Io(err)
    }
}

impl From<ConfigError> for DistGeomError {
    fn from(err: ConfigError) -> Self {
        DistGeomError::Config(err)
    }
}

impl From<DecodeError> for DistGeomError {
    fn from(err: DecodeError) -> Self {
        DistGeomError::Decode(err)
    }
}

impl From<InstanceError> for DistGeomError {
    fn from(err: InstanceError) -> Self {
        DistGeomError::Instancing(err)
    }
}

impl From<SkinningError> for DistGeomError {
    fn from(err: SkinningError) -> Self {
        DistGeomError::Skinning(err)
    }
}

impl From<SceneError> for DistGeomError {
    fn from(err: SceneError) -> Self {
        DistGeomError::Scene(err)
    }
}

impl DistGeomError {
    /// 是否为必须中止整个导入的解码错误
    pub fn is_decode(&self) -> bool {
        matches!(self, DistGeomError::Decode(_))
    }
}
