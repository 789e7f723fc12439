/// 二进制几何解码器
///
/// 把头部字节流和独立的数据流解码为 `GeomObject`。
///
/// # 头部结构
///
/// ```text
/// 0x00..0x60  前导区（不解析）
/// 0x60        i32 顶点数、i32 索引数、i32 索引宽度标志、i32 碰撞索引数
/// 0x70        表目录：13 项 × 16 字节 { count, rel_offset, aux, reserved }
/// ```
///
/// `rel_offset` 是相对于该字段自身位置的有符号偏移。目录按解码顺序排列：
/// 关节、骨骼重映射、顶点起点、AABB 最小/最大、包围壳起点/终点、包围壳顶点、
/// 主布局、精简布局、索引缓冲、子网格范围、元数据。
///
/// 元数据表中的顶点/索引偏移是数据流中的绝对偏移。任何校验失败都是致命错误，
/// 整个导入随之中止。

use tracing::{debug, info};

use super::cursor::ByteCursor;
use super::stream::DataStream;
use crate::core::config::{MAX_BONES_PER_MESH, MAX_JOINTS};
use crate::core::error::DecodeError;
use crate::geometry::geom_object::{GeomObject, PLACEHOLDER_HASH};
use crate::geometry::joint::{JointBindingData, JOINT_RECORD_SIZE};
use crate::geometry::mesh::{ElementRange, IndexWidth, MeshData, MeshMetaData};
use crate::geometry::vertex::BufferLayoutDescriptor;
use crate::math::geometry::Aabb;
use crate::math::{quaternion, Matrix4, Vector3};

/// 头部计数字段的位置
pub const COUNTS_OFFSET: usize = 0x60;

/// 表目录的位置
pub const DIRECTORY_OFFSET: usize = 0x70;

pub const DIRECTORY_ENTRY_SIZE: usize = 16;

/// 带 4 字节填充的 3×f32 记录（AABB、包围壳顶点）
pub const VEC3_RECORD_SIZE: usize = 16;

pub const LAYOUT_RECORD_SIZE: usize = 16;

pub const SUBMESH_RANGE_SIZE: usize = 48;

pub const METADATA_NAME_SIZE: usize = 128;

pub const METADATA_RECORD_SIZE: usize = 152;

/// 目录中的表，按解码顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Joints,
    BoneRemap,
    VertexStart,
    AabbMin,
    AabbMax,
    HullStart,
    HullEnd,
    HullVertices,
    Layout,
    SmallLayout,
    Indices,
    SubmeshRanges,
    Metadata,
}

impl Table {
    pub const ALL: [Table; 13] = [
        Table::Joints,
        Table::BoneRemap,
        Table::VertexStart,
        Table::AabbMin,
        Table::AabbMax,
        Table::HullStart,
        Table::HullEnd,
        Table::HullVertices,
        Table::Layout,
        Table::SmallLayout,
        Table::Indices,
        Table::SubmeshRanges,
        Table::Metadata,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Joints => "joints",
            Table::BoneRemap => "bone remap",
            Table::VertexStart => "vertex start",
            Table::AabbMin => "aabb min",
            Table::AabbMax => "aabb max",
            Table::HullStart => "hull start",
            Table::HullEnd => "hull end",
            Table::HullVertices => "hull vertices",
            Table::Layout => "layout",
            Table::SmallLayout => "small layout",
            Table::Indices => "indices",
            Table::SubmeshRanges => "submesh ranges",
            Table::Metadata => "metadata",
        }
    }
}

/// 解析后的目录项
#[derive(Debug, Clone, Copy)]
struct TableEntry {
    table: Table,
    count: usize,
    /// 已解析的绝对位置（count 为 0 时无意义）
    offset: usize,
    aux: i32,
}

impl TableEntry {
    fn cursor<'a>(&self, header: &'a [u8]) -> Result<ByteCursor<'a>, DecodeError> {
        let mut cursor = ByteCursor::new(header);
        cursor.seek(self.offset)?;
        Ok(cursor)
    }

    fn expect_count(&self, expected: usize) -> Result<(), DecodeError> {
        if self.count != expected {
            return Err(DecodeError::TableMismatch {
                table: self.table.name(),
                expected,
                found: self.count,
            });
        }
        Ok(())
    }
}

/// 子网格范围表中的一条记录
#[derive(Debug, Clone, Copy)]
struct RawSubmeshRange {
    indices: ElementRange,
    physics_vertices: ElementRange,
    physics_indices: ElementRange,
    first_skin_mat: u32,
    last_skin_mat: u32,
    lod_level: u32,
}

/// 元数据表中的一条记录
#[derive(Debug, Clone)]
struct RawMetadata {
    name: String,
    hash: u64,
    vertex_size: u32,
    vertex_offset: u32,
    index_size: u32,
    index_offset: u32,
}

/// 几何解码器
///
/// 持有蒙皮上限；上限只能比硬上限（128 骨骼 / 256 关节）更严格。
#[derive(Debug, Clone, Copy)]
pub struct GeomDecoder {
    max_bones_per_mesh: usize,
    max_joints: usize,
}

impl GeomDecoder {
    pub fn new() -> Self {
        Self::with_limits(MAX_BONES_PER_MESH, MAX_JOINTS)
    }

    pub fn with_limits(max_bones_per_mesh: usize, max_joints: usize) -> Self {
        Self {
            max_bones_per_mesh: max_bones_per_mesh.min(MAX_BONES_PER_MESH),
            max_joints: max_joints.min(MAX_JOINTS),
        }
    }

    /// 解码头部流，并从数据流读取每个子网格的字节
    pub fn decode(&self, header: &[u8], data: &mut dyn DataStream) -> Result<GeomObject, DecodeError> {
        let mut cursor = ByteCursor::new(header);
        cursor.seek(COUNTS_OFFSET)?;

        let vertex_count = non_negative("vertex count", cursor.read_i32()?)?;
        let index_count = non_negative("index count", cursor.read_i32()?)?;
        let index_width = IndexWidth::from_flag(cursor.read_i32()?)?;
        let collision_index_count = non_negative("collision index count", cursor.read_i32()?)?;

        let directory = read_directory(&mut cursor)?;
        let entry = |table: Table| directory[table as usize];

        let mut geom = GeomObject::empty(index_width);
        geom.vertex_count = vertex_count;
        geom.index_count = index_count;
        geom.collision_index_count = collision_index_count;

        geom.joints = self.read_joints(header, &entry(Table::Joints))?;
        geom.bone_remap = read_bone_remap(header, &entry(Table::BoneRemap), geom.joints.len())?;

        geom.vertex_starts = read_u32_table(header, &entry(Table::VertexStart))?;
        let submesh_count = geom.vertex_starts.len();
        validate_vertex_starts(&geom.vertex_starts, vertex_count)?;

        let mins = read_vec3_table(header, &entry(Table::AabbMin))?;
        entry(Table::AabbMin).expect_count(submesh_count)?;
        let maxs = read_vec3_table(header, &entry(Table::AabbMax))?;
        entry(Table::AabbMax).expect_count(submesh_count)?;

        geom.hull_starts = read_optional_u32_table(header, &entry(Table::HullStart), submesh_count)?;
        geom.hull_ends = read_optional_u32_table(header, &entry(Table::HullEnd), submesh_count)?;
        geom.hull_vertices = read_vec3_table(header, &entry(Table::HullVertices))?;
        validate_hulls(&geom.hull_starts, &geom.hull_ends, geom.hull_vertices.len())?;

        let (layout, stride) = read_layout(header, &entry(Table::Layout))?;
        let (small_layout, small_stride) = read_layout(header, &entry(Table::SmallLayout))?;
        geom.layout = layout;
        geom.stride = stride;
        geom.small_layout = small_layout;
        geom.small_stride = small_stride;

        let indices = entry(Table::Indices);
        indices.expect_count((index_count + collision_index_count) as usize)?;
        geom.index_data = indices
            .cursor(header)?
            .read_bytes(indices.count * index_width.byte_size())?
            .to_vec();

        let ranges_entry = entry(Table::SubmeshRanges);
        ranges_entry.expect_count(submesh_count)?;
        let ranges = read_submesh_ranges(header, &ranges_entry)?;

        let metadata_entry = entry(Table::Metadata);
        metadata_entry.expect_count(submesh_count)?;
        let metadata = read_metadata(header, &metadata_entry)?;

        let vertex_ranges = geom.submesh_vertex_ranges();
        for i in 0..submesh_count {
            let range = ranges[i];
            self.validate_submesh_range(i, &range, &geom)?;

            let raw = &metadata[i];
            if raw.hash == PLACEHOLDER_HASH {
                return Err(DecodeError::InvalidRange {
                    table: Table::Metadata.name(),
                    index: i,
                    reason: format!("hash 0x{:X} is reserved for the placeholder mesh", raw.hash),
                });
            }
            let meta = MeshMetaData {
                name: raw.name.clone(),
                hash: raw.hash,
                aabb: Aabb::new(mins[i], maxs[i]),
                vertices: vertex_ranges[i],
                indices: range.indices,
                physics_vertices: range.physics_vertices,
                physics_indices: range.physics_indices,
                first_skin_mat: range.first_skin_mat,
                last_skin_mat: range.last_skin_mat,
                lod_level: range.lod_level,
                hull: ElementRange::new(
                    geom.hull_starts[i],
                    geom.hull_ends[i] - geom.hull_starts[i],
                ),
                vertex_size: raw.vertex_size,
                vertex_offset: raw.vertex_offset,
                index_size: raw.index_size,
                index_offset: raw.index_offset,
            };

            let expected_vertex_size = meta.vertices.count as u64 * stride as u64;
            if stride > 0 && meta.vertex_size as u64 != expected_vertex_size {
                return Err(DecodeError::InvalidRange {
                    table: Table::Metadata.name(),
                    index: i,
                    reason: format!(
                        "vertex size {} does not match {} vertices of stride {}",
                        meta.vertex_size, meta.vertices.count, stride
                    ),
                });
            }

            let expected_index_size = meta.indices.count as u64 * index_width.byte_size() as u64;
            if meta.index_size as u64 != expected_index_size {
                return Err(DecodeError::InvalidRange {
                    table: Table::Metadata.name(),
                    index: i,
                    reason: format!(
                        "index size {} does not match {} indices of {} bytes",
                        meta.index_size,
                        meta.indices.count,
                        index_width.byte_size()
                    ),
                });
            }

            let vertex_data = data.read_at(raw.vertex_offset as u64, raw.vertex_size as usize)?;
            let index_data = data.read_at(raw.index_offset as u64, raw.index_size as usize)?;
            let mesh_data = MeshData::new(vertex_data, index_data, geom.layout.clone())
                .with_small_layout(geom.small_layout.clone())
                .with_index_width(index_width);

            debug!(
                name = %meta.name,
                hash = meta.hash,
                vertices = meta.vertices.count,
                indices = meta.indices.count,
                lod = meta.lod_level,
                "Decoded submesh"
            );
            geom.insert_submesh(meta, mesh_data);
        }

        info!(
            submeshes = geom.submesh_count(),
            joints = geom.joint_count(),
            vertices = vertex_count,
            indices = index_count,
            "Geometry decoded"
        );
        Ok(geom)
    }

    fn read_joints(&self, header: &[u8], entry: &TableEntry) -> Result<Vec<JointBindingData>, DecodeError> {
        if entry.count > self.max_joints {
            return Err(DecodeError::SkinCapExceeded {
                what: "joints",
                count: entry.count,
                cap: self.max_joints,
            });
        }
        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let mut cursor = entry.cursor(header)?;
        let mut joints = Vec::with_capacity(entry.count);
        for _ in 0..entry.count {
            let start = cursor.position();
            let inverse_bind = Matrix4::from_column_slice(&cursor.read_f32s::<16>()?);
            let [tx, ty, tz] = cursor.read_f32s::<3>()?;
            let [qx, qy, qz, qw] = cursor.read_f32s::<4>()?;
            let [sx, sy, sz] = cursor.read_f32s::<3>()?;
            debug_assert_eq!(cursor.position() - start, JOINT_RECORD_SIZE);

            joints.push(JointBindingData::new(
                inverse_bind,
                Vector3::new(tx, ty, tz),
                quaternion::from_xyzw(qx, qy, qz, qw),
                Vector3::new(sx, sy, sz),
            ));
        }
        Ok(joints)
    }

    fn validate_submesh_range(
        &self,
        index: usize,
        range: &RawSubmeshRange,
        geom: &GeomObject,
    ) -> Result<(), DecodeError> {
        let invalid = |reason: String| DecodeError::InvalidRange {
            table: Table::SubmeshRanges.name(),
            index,
            reason,
        };

        if range.indices.end() > geom.index_count {
            return Err(invalid(format!(
                "graphics indices {}..{} exceed index count {}",
                range.indices.start,
                range.indices.end(),
                geom.index_count
            )));
        }

        let total_indices = geom.index_count + geom.collision_index_count;
        if range.physics_indices.end() > total_indices {
            return Err(invalid(format!(
                "physics indices {}..{} exceed index buffer of {}",
                range.physics_indices.start,
                range.physics_indices.end(),
                total_indices
            )));
        }

        if range.physics_vertices.end() > geom.vertex_count {
            return Err(invalid(format!(
                "physics vertices {}..{} exceed vertex count {}",
                range.physics_vertices.start,
                range.physics_vertices.end(),
                geom.vertex_count
            )));
        }

        if range.first_skin_mat > range.last_skin_mat {
            return Err(invalid(format!(
                "skin range {}..{} is reversed",
                range.first_skin_mat, range.last_skin_mat
            )));
        }

        if range.last_skin_mat as usize > geom.bone_remap.len() {
            return Err(invalid(format!(
                "skin range ends at {} past bone remap of {}",
                range.last_skin_mat,
                geom.bone_remap.len()
            )));
        }

        let bones = (range.last_skin_mat - range.first_skin_mat) as usize;
        if bones > self.max_bones_per_mesh {
            return Err(DecodeError::SkinCapExceeded {
                what: "bone remap",
                count: bones,
                cap: self.max_bones_per_mesh,
            });
        }

        Ok(())
    }
}

impl Default for GeomDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn non_negative(table: &'static str, value: i32) -> Result<u32, DecodeError> {
    if value < 0 {
        return Err(DecodeError::NegativeCount { table, count: value });
    }
    Ok(value as u32)
}

fn read_directory(cursor: &mut ByteCursor<'_>) -> Result<Vec<TableEntry>, DecodeError> {
    cursor.seek(DIRECTORY_OFFSET)?;

    let mut directory = Vec::with_capacity(Table::ALL.len());
    for table in Table::ALL {
        let count = non_negative(table.name(), cursor.read_i32()?)? as usize;
        let offset = if count == 0 {
            cursor.skip(4)?;
            0
        } else {
            cursor.read_relative_offset()?
        };
        let aux = cursor.read_i32()?;
        // reserved
        cursor.skip(4)?;

        directory.push(TableEntry { table, count, offset, aux });
    }
    Ok(directory)
}

fn read_u32_table(header: &[u8], entry: &TableEntry) -> Result<Vec<u32>, DecodeError> {
    if entry.count == 0 {
        return Ok(Vec::new());
    }
    let mut cursor = entry.cursor(header)?;
    (0..entry.count)
        .map(|_| non_negative(entry.table.name(), cursor.read_i32()?))
        .collect()
}

/// 可缺省的逐子网格表：count 为 0 时全部填 0
fn read_optional_u32_table(
    header: &[u8],
    entry: &TableEntry,
    submesh_count: usize,
) -> Result<Vec<u32>, DecodeError> {
    if entry.count == 0 {
        return Ok(vec![0; submesh_count]);
    }
    entry.expect_count(submesh_count)?;
    read_u32_table(header, entry)
}

fn read_vec3_table(header: &[u8], entry: &TableEntry) -> Result<Vec<Vector3>, DecodeError> {
    if entry.count == 0 {
        return Ok(Vec::new());
    }
    let mut cursor = entry.cursor(header)?;
    let mut out = Vec::with_capacity(entry.count);
    for _ in 0..entry.count {
        let [x, y, z] = cursor.read_f32s::<3>()?;
        cursor.skip(VEC3_RECORD_SIZE - 12)?;
        out.push(Vector3::new(x, y, z));
    }
    Ok(out)
}

fn read_bone_remap(header: &[u8], entry: &TableEntry, joint_count: usize) -> Result<Vec<u16>, DecodeError> {
    if entry.count == 0 {
        return Ok(Vec::new());
    }
    let mut cursor = entry.cursor(header)?;
    let mut remap = Vec::with_capacity(entry.count);
    for index in 0..entry.count {
        let joint = cursor.read_i32()?;
        if joint < 0 || joint > u16::MAX as i32 || joint as usize >= joint_count {
            return Err(DecodeError::InvalidRange {
                table: entry.table.name(),
                index,
                reason: format!("joint {} outside skeleton of {} joints", joint, joint_count),
            });
        }
        remap.push(joint as u16);
    }
    Ok(remap)
}

fn validate_vertex_starts(starts: &[u32], vertex_count: u32) -> Result<(), DecodeError> {
    let mut previous = 0;
    for (index, &start) in starts.iter().enumerate() {
        if start < previous || start > vertex_count {
            return Err(DecodeError::InvalidRange {
                table: Table::VertexStart.name(),
                index,
                reason: format!(
                    "start {} must be within {}..={}",
                    start, previous, vertex_count
                ),
            });
        }
        previous = start;
    }
    Ok(())
}

fn validate_hulls(starts: &[u32], ends: &[u32], hull_vertex_count: usize) -> Result<(), DecodeError> {
    for (index, (&start, &end)) in starts.iter().zip(ends).enumerate() {
        if start > end || end as usize > hull_vertex_count {
            return Err(DecodeError::InvalidRange {
                table: Table::HullEnd.name(),
                index,
                reason: format!(
                    "hull {}..{} outside {} hull vertices",
                    start, end, hull_vertex_count
                ),
            });
        }
    }
    Ok(())
}

fn read_layout(
    header: &[u8],
    entry: &TableEntry,
) -> Result<(Vec<BufferLayoutDescriptor>, u32), DecodeError> {
    if entry.count == 0 {
        return Ok((Vec::new(), 0));
    }
    let stride = non_negative(entry.table.name(), entry.aux)?;

    let mut cursor = entry.cursor(header)?;
    let mut layout = Vec::with_capacity(entry.count);
    for _ in 0..entry.count {
        let semantic = cursor.read_i32()?;
        let element_count = cursor.read_i32()?;
        let type_code = cursor.read_i32()?;
        let offset = cursor.read_i32()?;
        layout.push(BufferLayoutDescriptor::from_raw(
            semantic,
            element_count,
            type_code,
            offset,
            stride,
        )?);
    }
    Ok((layout, stride))
}

fn read_submesh_ranges(header: &[u8], entry: &TableEntry) -> Result<Vec<RawSubmeshRange>, DecodeError> {
    if entry.count == 0 {
        return Ok(Vec::new());
    }
    let name = entry.table.name();
    let mut cursor = entry.cursor(header)?;
    let mut ranges = Vec::with_capacity(entry.count);
    for _ in 0..entry.count {
        let mut field = || -> Result<u32, DecodeError> { non_negative(name, cursor.read_i32()?) };
        let index_start = field()?;
        let index_count = field()?;
        let physics_vertex_start = field()?;
        let physics_vertex_count = field()?;
        let physics_index_start = field()?;
        let physics_index_count = field()?;
        let first_skin_mat = field()?;
        let last_skin_mat = field()?;
        let lod_level = field()?;
        cursor.skip(SUBMESH_RANGE_SIZE - 9 * 4)?;

        ranges.push(RawSubmeshRange {
            indices: ElementRange::new(index_start, index_count),
            physics_vertices: ElementRange::new(physics_vertex_start, physics_vertex_count),
            physics_indices: ElementRange::new(physics_index_start, physics_index_count),
            first_skin_mat,
            last_skin_mat,
            lod_level,
        });
    }
    Ok(ranges)
}

fn read_metadata(header: &[u8], entry: &TableEntry) -> Result<Vec<RawMetadata>, DecodeError> {
    if entry.count == 0 {
        return Ok(Vec::new());
    }
    let mut cursor = entry.cursor(header)?;
    let mut records = Vec::with_capacity(entry.count);
    for _ in 0..entry.count {
        let name_bytes = cursor.read_bytes(METADATA_NAME_SIZE)?;
        let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(METADATA_NAME_SIZE);
        let name = String::from_utf8_lossy(&name_bytes[..name_len]).into_owned();

        records.push(RawMetadata {
            name,
            hash: cursor.read_u64()?,
            vertex_size: cursor.read_u32()?,
            vertex_offset: cursor.read_u32()?,
            index_size: cursor.read_u32()?,
            index_offset: cursor.read_u32()?,
        });
    }
    Ok(records)
}
