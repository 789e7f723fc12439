/// 解码后的几何对象
///
/// 一个几何文件解码一次得到一个 `GeomObject`，以 `Arc` 共享给所有引用它的
/// 场景节点。引用计数归零时释放。
///
/// # 内容
///
/// - 头部流中的原始索引缓冲、主/精简顶点布局
/// - 包围壳顶点及每个子网格的包围壳范围
/// - 骨骼重映射表与关节绑定数据
/// - `hash -> MeshMetaData` 字典，以及从数据流读出的 `hash -> MeshData`

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::MAX_JOINTS;
use crate::geometry::joint::JointBindingData;
use crate::geometry::mesh::{ElementRange, IndexWidth, MeshData, MeshMetaData};
use crate::geometry::vertex::BufferLayoutDescriptor;
use crate::math::geometry::Aabb;
use crate::math::Vector3;

/// 占位网格的内容哈希
///
/// 保留值，解码器拒绝使用该哈希的子网格。
pub const PLACEHOLDER_HASH: u64 = u64::MAX;

#[derive(Debug, Clone)]
pub struct GeomObject {
    /// 头部声明的顶点总数
    pub vertex_count: u32,

    /// 图形索引数量
    pub index_count: u32,

    /// 碰撞索引数量（追加在图形索引之后）
    pub collision_index_count: u32,

    pub index_width: IndexWidth,

    /// 头部流中的索引缓冲（图形 + 碰撞）
    pub index_data: Vec<u8>,

    pub layout: Vec<BufferLayoutDescriptor>,
    pub stride: u32,

    pub small_layout: Vec<BufferLayoutDescriptor>,
    pub small_stride: u32,

    pub hull_vertices: Vec<Vector3>,

    /// 每个子网格的顶点起点
    pub vertex_starts: Vec<u32>,

    /// 每个子网格的包围壳范围 `start..end`
    pub hull_starts: Vec<u32>,
    pub hull_ends: Vec<u32>,

    /// 局部骨骼槽位 -> 全局关节索引
    pub bone_remap: Vec<u16>,

    pub joints: Vec<JointBindingData>,

    /// 子网格元数据，按头部中的顺序
    submesh_order: Vec<u64>,
    metadata: HashMap<u64, MeshMetaData>,
    mesh_data: HashMap<u64, Arc<MeshData>>,
}

impl GeomObject {
    /// 创建空几何对象，解码器逐步填充
    pub(crate) fn empty(index_width: IndexWidth) -> Self {
        Self {
            vertex_count: 0,
            index_count: 0,
            collision_index_count: 0,
            index_width,
            index_data: Vec::new(),
            layout: Vec::new(),
            stride: 0,
            small_layout: Vec::new(),
            small_stride: 0,
            hull_vertices: Vec::new(),
            vertex_starts: Vec::new(),
            hull_starts: Vec::new(),
            hull_ends: Vec::new(),
            bone_remap: Vec::new(),
            joints: Vec::new(),
            submesh_order: Vec::new(),
            metadata: HashMap::new(),
            mesh_data: HashMap::new(),
        }
    }

    /// 插入一个子网格；同一文件内重复的哈希只保留第一份
    pub(crate) fn insert_submesh(&mut self, meta: MeshMetaData, data: MeshData) {
        if self.metadata.contains_key(&meta.hash) {
            return;
        }
        self.submesh_order.push(meta.hash);
        self.mesh_data.insert(meta.hash, Arc::new(data));
        self.metadata.insert(meta.hash, meta);
    }

    /// 内置单位立方体
    ///
    /// 引用的几何文件缺失时替换使用：8 个 Float3 顶点，36 个 16 位索引，
    /// 单个子网格，无关节。
    pub fn placeholder() -> Self {
        const CORNERS: [[f32; 3]; 8] = [
            [-0.5, -0.5, -0.5],
            [0.5, -0.5, -0.5],
            [0.5, 0.5, -0.5],
            [-0.5, 0.5, -0.5],
            [-0.5, -0.5, 0.5],
            [0.5, -0.5, 0.5],
            [0.5, 0.5, 0.5],
            [-0.5, 0.5, 0.5],
        ];
        const INDICES: [u16; 36] = [
            0, 2, 1, 0, 3, 2, // -z
            4, 5, 6, 4, 6, 7, // +z
            0, 1, 5, 0, 5, 4, // -y
            3, 7, 6, 3, 6, 2, // +y
            0, 4, 7, 0, 7, 3, // -x
            1, 2, 6, 1, 6, 5, // +x
        ];

        let vertex_data: Vec<u8> = CORNERS
            .iter()
            .flat_map(|c| c.iter().flat_map(|v| v.to_le_bytes()))
            .collect();
        let index_data: Vec<u8> = INDICES.iter().flat_map(|i| i.to_le_bytes()).collect();

        let stride = 12;
        let layout = match BufferLayoutDescriptor::from_raw(0, 3, 2, 0, stride) {
            Ok(position) => vec![position],
            Err(_) => Vec::new(),
        };

        let meta = MeshMetaData {
            name: "placeholder".to_string(),
            hash: PLACEHOLDER_HASH,
            aabb: Aabb::new(Vector3::new(-0.5, -0.5, -0.5), Vector3::new(0.5, 0.5, 0.5)),
            vertices: ElementRange::new(0, CORNERS.len() as u32),
            indices: ElementRange::new(0, INDICES.len() as u32),
            physics_vertices: ElementRange::default(),
            physics_indices: ElementRange::default(),
            first_skin_mat: 0,
            last_skin_mat: 0,
            lod_level: 0,
            hull: ElementRange::default(),
            vertex_size: vertex_data.len() as u32,
            vertex_offset: 0,
            index_size: index_data.len() as u32,
            index_offset: vertex_data.len() as u32,
        };
        let data = MeshData::new(vertex_data, index_data.clone(), layout.clone());

        let mut geom = Self::empty(IndexWidth::U16);
        geom.vertex_count = CORNERS.len() as u32;
        geom.index_count = INDICES.len() as u32;
        geom.index_data = index_data;
        geom.layout = layout;
        geom.stride = stride;
        geom.vertex_starts = vec![0];
        geom.hull_starts = vec![0];
        geom.hull_ends = vec![0];
        geom.insert_submesh(meta, data);
        geom
    }

    #[inline]
    pub fn submesh_count(&self) -> usize {
        self.submesh_order.len()
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// 按头部顺序遍历子网格元数据
    pub fn submeshes(&self) -> impl Iterator<Item = &MeshMetaData> {
        self.submesh_order.iter().filter_map(|hash| self.metadata.get(hash))
    }

    pub fn meta(&self, hash: u64) -> Option<&MeshMetaData> {
        self.metadata.get(&hash)
    }

    pub fn mesh_data(&self, hash: u64) -> Option<&Arc<MeshData>> {
        self.mesh_data.get(&hash)
    }

    /// 全部 `(hash, MeshData)`，按头部顺序
    pub fn mesh_data_entries(&self) -> impl Iterator<Item = (u64, &Arc<MeshData>)> {
        self.submesh_order
            .iter()
            .filter_map(|hash| self.mesh_data.get(hash).map(|data| (*hash, data)))
    }

    /// 由顶点起点表推导的每个子网格顶点范围
    ///
    /// `count[i] = start[i+1] - start[i]`，最后一个为 `vertex_count - start[last]`。
    pub fn submesh_vertex_ranges(&self) -> Vec<ElementRange> {
        self.vertex_starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = self
                    .vertex_starts
                    .get(i + 1)
                    .copied()
                    .unwrap_or(self.vertex_count);
                ElementRange::new(start, end.saturating_sub(start))
            })
            .collect()
    }

    /// 子网格使用的骨骼重映射切片 `first_skin_mat..last_skin_mat`
    pub fn bone_remap_for(&self, meta: &MeshMetaData) -> &[u16] {
        let first = meta.first_skin_mat as usize;
        let last = (meta.last_skin_mat as usize).min(self.bone_remap.len());
        self.bone_remap.get(first..last).unwrap_or(&[])
    }

    /// 子网格的包围壳顶点
    pub fn hull_for(&self, meta: &MeshMetaData) -> &[Vector3] {
        let start = meta.hull.start as usize;
        let end = meta.hull.end() as usize;
        self.hull_vertices.get(start..end).unwrap_or(&[])
    }

    /// 供直接上传的逆绑定矩阵数组
    ///
    /// 固定长度 `MAX_JOINTS * 16`，列主序，最后一个关节之后补零。
    pub fn inverse_bind_matrices(&self) -> Vec<f32> {
        let mut out = vec![0.0; MAX_JOINTS * 16];
        for (joint, chunk) in self.joints.iter().zip(out.chunks_exact_mut(16)) {
            chunk.copy_from_slice(joint.inverse_bind.as_slice());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::vertex::{decode_attribute, VertexSemantic};

    #[test]
    fn test_placeholder_cube() {
        let cube = GeomObject::placeholder();
        assert_eq!(cube.submesh_count(), 1);
        assert_eq!(cube.joint_count(), 0);

        let data = cube.mesh_data(PLACEHOLDER_HASH).unwrap();
        assert_eq!(data.vertex_count(), 8);
        assert_eq!(data.index_count(), 36);
        assert!(data.indices().iter().all(|&i| i < 8));

        let positions = decode_attribute(data, VertexSemantic::Position).unwrap();
        assert!(positions.iter().all(|p| p[0].abs() == 0.5 && p[2].abs() == 0.5));
    }

    #[test]
    fn test_vertex_ranges_from_starts() {
        let mut geom = GeomObject::empty(IndexWidth::U16);
        geom.vertex_count = 18;
        geom.vertex_starts = vec![0, 4, 10];

        let ranges = geom.submesh_vertex_ranges();
        assert_eq!(
            ranges,
            vec![ElementRange::new(0, 4), ElementRange::new(4, 6), ElementRange::new(10, 8)]
        );
        let total: u32 = ranges.iter().map(|r| r.count).sum();
        assert!(total <= geom.vertex_count);
    }

    #[test]
    fn test_inverse_bind_array_is_zero_padded() {
        let cube = GeomObject::placeholder();
        let matrices = cube.inverse_bind_matrices();
        assert_eq!(matrices.len(), 256 * 16);
        assert!(matrices.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_duplicate_submesh_hash_keeps_first() {
        let mut geom = GeomObject::placeholder();
        let meta = geom.meta(PLACEHOLDER_HASH).unwrap().clone();
        geom.insert_submesh(
            MeshMetaData { name: "other".to_string(), ..meta },
            MeshData::empty(),
        );
        assert_eq!(geom.submesh_count(), 1);
        assert_eq!(geom.meta(PLACEHOLDER_HASH).unwrap().name, "placeholder");
        assert!(!geom.mesh_data(PLACEHOLDER_HASH).unwrap().is_empty());
    }
}
