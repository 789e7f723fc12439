/// 网格数据结构模块
///
/// 定义解码后的子网格元数据（`MeshMetaData`）和按内容哈希共享的
/// 顶点/索引字节（`MeshData`）。两者在解码完成后都不再修改。

use crate::core::error::DecodeError;
use crate::geometry::vertex::BufferLayoutDescriptor;
use crate::math::geometry::{Aabb, BoundingSphere};

/// 连续元素范围（顶点、索引或包围壳顶点）
///
/// # 示例
///
/// ```rust
/// use dist_geom::geometry::mesh::ElementRange;
///
/// let range = ElementRange::new(10, 6);
/// assert_eq!(range.end(), 16);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementRange {
    /// 起始元素索引
    pub start: u32,

    /// 元素数量
    pub count: u32,
}

impl ElementRange {
    #[inline]
    pub fn new(start: u32, count: u32) -> Self {
        Self { start, count }
    }

    /// 结束位置（不包含）
    #[inline]
    pub fn end(&self) -> u32 {
        self.start + self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// 索引宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    /// 从头部的索引宽度标志解析：0 = 16 位，1 = 32 位
    pub fn from_flag(flag: i32) -> Result<Self, DecodeError> {
        match flag {
            0 => Ok(IndexWidth::U16),
            1 => Ok(IndexWidth::U32),
            other => Err(DecodeError::InvalidIndexWidth(other)),
        }
    }

    #[inline]
    pub fn byte_size(&self) -> usize {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// 子网格元数据
///
/// 每个子网格一份，来自头部流的各张表。字节偏移指向独立的数据流。
#[derive(Debug, Clone, PartialEq)]
pub struct MeshMetaData {
    /// 子网格名称
    pub name: String,

    /// 内容哈希（去重键）
    pub hash: u64,

    /// 局部空间包围盒
    pub aabb: Aabb,

    /// 图形顶点范围
    pub vertices: ElementRange,

    /// 图形索引范围
    pub indices: ElementRange,

    /// 物理（碰撞）顶点范围
    pub physics_vertices: ElementRange,

    /// 物理（碰撞）索引范围，位于图形索引之后
    pub physics_indices: ElementRange,

    /// 蒙皮矩阵范围 `first_skin_mat..last_skin_mat`，索引骨骼重映射表
    pub first_skin_mat: u32,
    pub last_skin_mat: u32,

    /// LOD 级别（0 = 最高细节）
    pub lod_level: u32,

    /// 包围壳顶点范围
    pub hull: ElementRange,

    /// 数据流中的顶点字节数与绝对偏移
    pub vertex_size: u32,
    pub vertex_offset: u32,

    /// 数据流中的索引字节数与绝对偏移
    pub index_size: u32,
    pub index_offset: u32,
}

impl MeshMetaData {
    /// 蒙皮矩阵个数
    #[inline]
    pub fn skin_count(&self) -> u32 {
        self.last_skin_mat - self.first_skin_mat
    }

    #[inline]
    pub fn is_skinned(&self) -> bool {
        self.skin_count() > 0
    }

    /// 局部空间包围球
    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.aabb.bounding_sphere()
    }
}

/// 子网格的顶点/索引字节及布局
///
/// 按内容哈希去重，被所有引用同一子网格的实例只读共享。
/// 零长度的 `MeshData` 是注册表未命中时返回的空哨兵。
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// 顶点字节
    pub vertex_data: Vec<u8>,

    /// 索引字节
    pub index_data: Vec<u8>,

    /// 主顶点布局
    pub layout: Vec<BufferLayoutDescriptor>,

    /// 精简顶点布局（可为空）
    pub small_layout: Vec<BufferLayoutDescriptor>,

    /// 索引宽度
    pub index_width: IndexWidth,
}

impl MeshData {
    /// 创建网格数据（16 位索引，无精简布局）
    pub fn new(
        vertex_data: Vec<u8>,
        index_data: Vec<u8>,
        layout: Vec<BufferLayoutDescriptor>,
    ) -> Self {
        Self {
            vertex_data,
            index_data,
            layout,
            small_layout: Vec::new(),
            index_width: IndexWidth::U16,
        }
    }

    /// 空哨兵
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn with_small_layout(mut self, small_layout: Vec<BufferLayoutDescriptor>) -> Self {
        self.small_layout = small_layout;
        self
    }

    pub fn with_index_width(mut self, index_width: IndexWidth) -> Self {
        self.index_width = index_width;
        self
    }

    /// 是否为空哨兵（零长度缓冲）
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_data.is_empty() && self.index_data.is_empty()
    }

    /// 主布局的顶点步长
    #[inline]
    pub fn stride(&self) -> u32 {
        self.layout.first().map_or(0, |d| d.stride)
    }

    /// 顶点数量
    pub fn vertex_count(&self) -> usize {
        match self.stride() {
            0 => 0,
            stride => self.vertex_data.len() / stride as usize,
        }
    }

    /// 索引数量
    #[inline]
    pub fn index_count(&self) -> usize {
        self.index_data.len() / self.index_width.byte_size()
    }

    /// 把索引字节展开为 u32
    pub fn indices(&self) -> Vec<u32> {
        match self.index_width {
            IndexWidth::U16 => self
                .index_data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            IndexWidth::U32 => self
                .index_data
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        }
    }
}

impl Default for MeshData {
    fn default() -> Self {
        Self::empty()
    }
}
