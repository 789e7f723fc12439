//! GPU 实例记录
//!
//! 每个场景节点在实例缓冲中占一条定长记录。布局是与着色管线共享的契约，
//! 修改时两侧必须同步：
//!
//! | 浮点偏移 | 字段 |
//! |---------|------|
//! | 0..16   | 世界矩阵 |
//! | 16..32  | 法线矩阵 |
//! | 32..48  | 世界逆矩阵 |
//! | 48      | 遮挡标志 |
//! | 49      | 选中标志 |
//! | 50..52  | 填充 |
//! | 52..56  | 颜色 RGBA |
//! | 56..64  | 填充到 256 字节 |
//!
//! 矩阵按列主序存储。

use bytemuck::{Pod, Zeroable};

use crate::math::{matrix, Matrix4};

/// 每条记录的浮点数
pub const STRIDE_FLOATS: usize = 64;

/// 每条记录的字节数（uniform 缓冲对齐到 256）
pub const STRIDE_BYTES: usize = STRIDE_FLOATS * 4;

pub const WORLD_OFFSET: usize = 0;
pub const NORMAL_OFFSET: usize = 16;
pub const WORLD_INV_OFFSET: usize = 32;
pub const OCCLUDED_OFFSET: usize = 48;
pub const SELECTED_OFFSET: usize = 49;
pub const COLOR_OFFSET: usize = 52;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    pub world: [f32; 16],
    pub normal: [f32; 16],
    pub world_inv: [f32; 16],
    pub occluded: f32,
    pub selected: f32,
    _pad0: [f32; 2],
    pub color: [f32; 4],
    _pad1: [f32; 8],
}

fn to_array(m: &Matrix4) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

impl InstanceRecord {
    /// 单位变换、可见、未选中
    pub fn new(color: [f32; 4]) -> Self {
        let identity = to_array(&Matrix4::identity());
        Self {
            world: identity,
            normal: identity,
            world_inv: identity,
            occluded: 0.0,
            selected: 0.0,
            _pad0: [0.0; 2],
            color,
            _pad1: [0.0; 8],
        }
    }

    /// 同时写入世界矩阵、法线矩阵和世界逆矩阵
    ///
    /// 奇异的世界矩阵导出的两个矩阵写为单位矩阵，返回 `false`。
    pub fn set_transform(&mut self, world: &Matrix4) -> bool {
        self.world = to_array(world);
        self.normal = to_array(&matrix::normal_matrix(world));
        match matrix::try_inverse(world) {
            Some(inverse) => {
                self.world_inv = to_array(&inverse);
                true
            }
            None => {
                self.world_inv = to_array(&Matrix4::identity());
                self.normal = self.world_inv;
                false
            }
        }
    }

    pub fn set_world(&mut self, world: &Matrix4) {
        self.world = to_array(world);
    }

    pub fn set_normal(&mut self, normal: &Matrix4) {
        self.normal = to_array(normal);
    }

    pub fn set_world_inv(&mut self, world_inv: &Matrix4) {
        self.world_inv = to_array(world_inv);
    }

    pub fn world_matrix(&self) -> Matrix4 {
        Matrix4::from_column_slice(&self.world)
    }

    pub fn normal_matrix(&self) -> Matrix4 {
        Matrix4::from_column_slice(&self.normal)
    }

    pub fn world_inv_matrix(&self) -> Matrix4 {
        Matrix4::from_column_slice(&self.world_inv)
    }

    #[inline]
    pub fn is_occluded(&self) -> bool {
        self.occluded != 0.0
    }

    #[inline]
    pub fn is_selected(&self) -> bool {
        self.selected != 0.0
    }
}
