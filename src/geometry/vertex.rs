/// 顶点布局与属性解码模块
///
/// 定义几何文件中的顶点缓冲布局描述符：语义、元素类型码、局部偏移和步长。
/// 类型码沿用 Direct3D 9 的声明类型编号，是固定查表，未知类型码属于致命错误。
///
/// # 支持的类型码
///
/// | 码 | 类型 | 字节 | 分量 |
/// |----|------|------|------|
/// | 0..=3 | Float1..Float4 | 4..16 | 1..4 |
/// | 4 | Color (BGRA8) | 4 | 1 |
/// | 5 | UByte4 | 4 | 1 |
/// | 14 | Dec3N (10-10-10-2) | 4 | 3 |
/// | 15 | Half2 | 4 | 2 |
/// | 16 | Half4 | 8 | 4 |

use crate::core::error::DecodeError;
use crate::geometry::mesh::MeshData;

/// 顶点语义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    TexCoord,
    Normal,
    Tangent,
    Color,
    BlendIndices,
    BlendWeights,
}

impl VertexSemantic {
    /// 从文件中的语义编号解析
    pub fn from_id(id: i32) -> Result<Self, DecodeError> {
        match id {
            0 => Ok(VertexSemantic::Position),
            1 => Ok(VertexSemantic::TexCoord),
            2 => Ok(VertexSemantic::Normal),
            3 => Ok(VertexSemantic::Tangent),
            4 => Ok(VertexSemantic::Color),
            5 => Ok(VertexSemantic::BlendIndices),
            6 => Ok(VertexSemantic::BlendWeights),
            other => Err(DecodeError::UnknownSemantic(other)),
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            VertexSemantic::Position => 0,
            VertexSemantic::TexCoord => 1,
            VertexSemantic::Normal => 2,
            VertexSemantic::Tangent => 3,
            VertexSemantic::Color => 4,
            VertexSemantic::BlendIndices => 5,
            VertexSemantic::BlendWeights => 6,
        }
    }
}

/// 顶点元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementType {
    Float1,
    Float2,
    Float3,
    Float4,
    /// 打包的 BGRA 颜色
    Color,
    /// 四个无符号字节（混合索引）
    UByte4,
    /// 10-10-10-2 打包的归一化有符号三元组
    Dec3N,
    Half2,
    Half4,
}

impl VertexElementType {
    /// 类型码查表
    pub fn from_code(code: i32) -> Result<Self, DecodeError> {
        match code {
            0 => Ok(VertexElementType::Float1),
            1 => Ok(VertexElementType::Float2),
            2 => Ok(VertexElementType::Float3),
            3 => Ok(VertexElementType::Float4),
            4 => Ok(VertexElementType::Color),
            5 => Ok(VertexElementType::UByte4),
            14 => Ok(VertexElementType::Dec3N),
            15 => Ok(VertexElementType::Half2),
            16 => Ok(VertexElementType::Half4),
            other => Err(DecodeError::UnknownTypeCode(other)),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            VertexElementType::Float1 => 0,
            VertexElementType::Float2 => 1,
            VertexElementType::Float3 => 2,
            VertexElementType::Float4 => 3,
            VertexElementType::Color => 4,
            VertexElementType::UByte4 => 5,
            VertexElementType::Dec3N => 14,
            VertexElementType::Half2 => 15,
            VertexElementType::Half4 => 16,
        }
    }

    /// 在顶点中占用的字节数
    pub fn byte_size(&self) -> usize {
        match self {
            VertexElementType::Float1 => 4,
            VertexElementType::Float2 => 8,
            VertexElementType::Float3 => 12,
            VertexElementType::Float4 => 16,
            VertexElementType::Color
            | VertexElementType::UByte4
            | VertexElementType::Dec3N
            | VertexElementType::Half2 => 4,
            VertexElementType::Half4 => 8,
        }
    }

    /// 描述符中声明的分量个数
    ///
    /// 打包的字节类型按 1 个分量计。
    pub fn component_count(&self) -> u32 {
        match self {
            VertexElementType::Float1 => 1,
            VertexElementType::Float2 => 2,
            VertexElementType::Float3 => 3,
            VertexElementType::Float4 => 4,
            VertexElementType::Color | VertexElementType::UByte4 => 1,
            VertexElementType::Dec3N => 3,
            VertexElementType::Half2 => 2,
            VertexElementType::Half4 => 4,
        }
    }

    /// 把一个元素解码为最多 4 个浮点数，缺失的分量为 0
    ///
    /// `bytes` 长度必须至少为 `byte_size()`。
    pub fn decode(&self, bytes: &[u8]) -> [f32; 4] {
        let f32_at = |i: usize| {
            f32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };
        let half_at = |i: usize| half_to_f32(u16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]));

        match self {
            VertexElementType::Float1 => [f32_at(0), 0.0, 0.0, 0.0],
            VertexElementType::Float2 => [f32_at(0), f32_at(1), 0.0, 0.0],
            VertexElementType::Float3 => [f32_at(0), f32_at(1), f32_at(2), 0.0],
            VertexElementType::Float4 => [f32_at(0), f32_at(1), f32_at(2), f32_at(3)],
            VertexElementType::Color => {
                // 内存顺序 B, G, R, A
                let n = |b: u8| b as f32 / 255.0;
                [n(bytes[2]), n(bytes[1]), n(bytes[0]), n(bytes[3])]
            }
            VertexElementType::UByte4 => [
                bytes[0] as f32,
                bytes[1] as f32,
                bytes[2] as f32,
                bytes[3] as f32,
            ],
            VertexElementType::Dec3N => {
                let packed = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                let v = unpack_dec3n(packed);
                [v[0], v[1], v[2], 0.0]
            }
            VertexElementType::Half2 => [half_at(0), half_at(1), 0.0, 0.0],
            VertexElementType::Half4 => [half_at(0), half_at(1), half_at(2), half_at(3)],
        }
    }
}

/// 顶点缓冲布局描述符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayoutDescriptor {
    pub semantic: VertexSemantic,
    pub element_count: u32,
    pub element_type: VertexElementType,
    /// 元素在顶点内的字节偏移
    pub offset: u32,
    /// 顶点步长（同一布局列表内所有描述符相同）
    pub stride: u32,
}

impl BufferLayoutDescriptor {
    /// 从文件中的四个 i32 字段和列表步长构建并校验
    pub fn from_raw(
        semantic: i32,
        element_count: i32,
        type_code: i32,
        offset: i32,
        stride: u32,
    ) -> Result<Self, DecodeError> {
        let semantic = VertexSemantic::from_id(semantic)?;
        let element_type = VertexElementType::from_code(type_code)?;

        if element_count < 0 || element_count as u32 != element_type.component_count() {
            return Err(DecodeError::ElementCountMismatch {
                type_code,
                expected: element_type.component_count(),
                found: element_count,
            });
        }

        if offset < 0 || offset as u32 + element_type.byte_size() as u32 > stride {
            return Err(DecodeError::InvalidRange {
                table: "vertex layout",
                index: semantic.id() as usize,
                reason: format!(
                    "element at offset {} with {} bytes does not fit stride {}",
                    offset,
                    element_type.byte_size(),
                    stride
                ),
            });
        }

        Ok(Self {
            semantic,
            element_count: element_count as u32,
            element_type,
            offset: offset as u32,
            stride,
        })
    }
}

/// 解码 10-10-10-2 打包向量
///
/// x/y/z 各占 10 位，按二进制补码符号扩展后归一化为单位向量。
/// 最高 2 位（w）被忽略。零向量保持为零。
pub fn unpack_dec3n(packed: u32) -> [f32; 3] {
    let component = |shift: u32| -> f32 {
        let raw = ((packed >> shift) & 0x3FF) as i32;
        // 符号扩展：第 9 位为符号位
        let signed = (raw << 22) >> 22;
        signed as f32
    };

    let x = component(0);
    let y = component(10);
    let z = component(20);

    let length = (x * x + y * y + z * z).sqrt();
    if length > 0.0 {
        [x / length, y / length, z / length]
    } else {
        [0.0, 0.0, 0.0]
    }
}

/// IEEE 754 半精度转单精度
pub fn half_to_f32(bits: u16) -> f32 {
    let sign = ((bits >> 15) & 0x1) as u32;
    let exponent = ((bits >> 10) & 0x1F) as u32;
    let mantissa = (bits & 0x3FF) as u32;

    let f32_bits = match (exponent, mantissa) {
        (0, 0) => sign << 31,
        (0, _) => {
            // 非规格化数：归一化尾数
            let mut e: i32 = -1;
            let mut m = mantissa;
            loop {
                e += 1;
                m <<= 1;
                if m & 0x400 != 0 {
                    break;
                }
            }
            let m = m & 0x3FF;
            let exp = (127 - 15 - e) as u32;
            (sign << 31) | (exp << 23) | (m << 13)
        }
        (0x1F, 0) => (sign << 31) | 0x7F80_0000,
        (0x1F, _) => (sign << 31) | 0x7FC0_0000 | (mantissa << 13),
        _ => (sign << 31) | ((exponent + 127 - 15) << 23) | (mantissa << 13),
    };

    f32::from_bits(f32_bits)
}

/// 解码某个语义的全部顶点属性
///
/// 在 `mesh` 的主布局中查找语义，逐顶点解码。语义不存在时返回 `None`。
pub fn decode_attribute(mesh: &MeshData, semantic: VertexSemantic) -> Option<Vec<[f32; 4]>> {
    let descriptor = mesh.layout.iter().find(|d| d.semantic == semantic)?;
    let stride = descriptor.stride as usize;
    if stride == 0 {
        return Some(Vec::new());
    }

    let offset = descriptor.offset as usize;
    let size = descriptor.element_type.byte_size();

    Some(
        mesh.vertex_data
            .chunks_exact(stride)
            .map(|vertex| descriptor.element_type.decode(&vertex[offset..offset + size]))
            .collect(),
    )
}
