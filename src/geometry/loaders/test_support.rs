//! 测试用的合成几何文件构建器
//!
//! 按解码器的头部结构写出头部流和数据流。表之间插入可配置的填充，
//! 目录中的偏移都相对于各自的字段位置。

use super::geom_decoder::{COUNTS_OFFSET, DIRECTORY_ENTRY_SIZE, DIRECTORY_OFFSET, METADATA_NAME_SIZE, Table};
use crate::math::{Matrix4, Vector3};

#[derive(Debug, Clone)]
pub struct SubmeshSpec {
    pub name: String,
    pub hash: u64,
    pub vertex_count: u32,
    pub index_count: u32,
    pub lod_level: u32,
    pub skin: (u32, u32),
    pub aabb: ([f32; 3], [f32; 3]),
}

impl SubmeshSpec {
    pub fn new(name: &str, hash: u64, vertex_count: u32) -> Self {
        Self {
            name: name.to_string(),
            hash,
            vertex_count,
            index_count: 6,
            lod_level: 0,
            skin: (0, 0),
            aabb: ([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]),
        }
    }

    pub fn skin(mut self, first: u32, last: u32) -> Self {
        self.skin = (first, last);
        self
    }

    pub fn lod(mut self, level: u32) -> Self {
        self.lod_level = level;
        self
    }

    pub fn aabb(mut self, min: [f32; 3], max: [f32; 3]) -> Self {
        self.aabb = (min, max);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    submeshes: Vec<SubmeshSpec>,
    joint_count: usize,
    bone_remap: Vec<i32>,
    layout: Vec<[i32; 4]>,
    stride: i32,
    small_layout: Vec<[i32; 4]>,
    small_stride: i32,
    index_width: i32,
    gap: usize,
}

fn push_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn push_vec3(out: &mut Vec<u8>, v: [f32; 3]) {
    push_f32s(out, &v);
    out.extend_from_slice(&[0u8; 4]);
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self {
            submeshes: Vec::new(),
            joint_count: 0,
            bone_remap: Vec::new(),
            layout: vec![[0, 3, 2, 0]],
            stride: 16,
            small_layout: vec![[0, 3, 2, 0]],
            small_stride: 12,
            index_width: 0,
            gap: 8,
        }
    }

    pub fn submesh(mut self, spec: SubmeshSpec) -> Self {
        self.submeshes.push(spec);
        self
    }

    /// 关节 i 绑定在 (0, i, 0)
    pub fn joints(mut self, count: usize) -> Self {
        self.joint_count = count;
        self
    }

    pub fn bone_remap(mut self, remap: Vec<i32>) -> Self {
        self.bone_remap = remap;
        self
    }

    pub fn layout(mut self, layout: Vec<[i32; 4]>, stride: i32) -> Self {
        self.layout = layout;
        self.stride = stride;
        self
    }

    pub fn index_width(mut self, flag: i32) -> Self {
        self.index_width = flag;
        self
    }

    /// 表之间的填充字节数
    pub fn gap(mut self, bytes: usize) -> Self {
        self.gap = bytes;
        self
    }

    fn write_index(&self, out: &mut Vec<u8>, value: u32) {
        if self.index_width == 1 {
            out.extend_from_slice(&value.to_le_bytes());
        } else {
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
    }

    /// 返回 `(header, data)`
    pub fn build(&self) -> (Vec<u8>, Vec<u8>) {
        let stride = self.stride.max(12) as usize;

        // 数据流：每个子网格的顶点字节后跟索引字节
        let mut data = Vec::new();
        let mut records = Vec::new();
        for spec in &self.submeshes {
            let vertex_offset = data.len();
            for v in 0..spec.vertex_count {
                push_f32s(&mut data, &[spec.hash as f32, v as f32, 0.0]);
                data.extend(std::iter::repeat(0u8).take(stride - 12));
            }
            let index_offset = data.len();
            for k in 0..spec.index_count {
                self.write_index(&mut data, k % spec.vertex_count.max(1));
            }
            records.push((
                (index_offset - vertex_offset) as u32,
                vertex_offset as u32,
                (data.len() - index_offset) as u32,
                index_offset as u32,
            ));
        }

        let vertex_count: u32 = self.submeshes.iter().map(|s| s.vertex_count).sum();
        let index_count: u32 = self.submeshes.iter().map(|s| s.index_count).sum();
        let n = self.submeshes.len() as i32;

        // 各表内容：(count, bytes, aux)
        let mut tables: Vec<(i32, Vec<u8>, i32)> = Vec::new();

        let mut joints = Vec::new();
        for i in 0..self.joint_count {
            let t = Vector3::new(0.0, i as f32, 0.0);
            push_f32s(&mut joints, Matrix4::new_translation(&-t).as_slice());
            push_f32s(&mut joints, &[t.x, t.y, t.z]);
            push_f32s(&mut joints, &[0.0, 0.0, 0.0, 1.0]);
            push_f32s(&mut joints, &[1.0, 1.0, 1.0]);
        }
        tables.push((self.joint_count as i32, joints, 0));

        let mut remap = Vec::new();
        self.bone_remap.iter().for_each(|&j| push_i32(&mut remap, j));
        tables.push((self.bone_remap.len() as i32, remap, 0));

        let mut starts = Vec::new();
        let mut start = 0;
        for spec in &self.submeshes {
            push_i32(&mut starts, start);
            start += spec.vertex_count as i32;
        }
        tables.push((n, starts, 0));

        let mut mins = Vec::new();
        let mut maxs = Vec::new();
        for spec in &self.submeshes {
            push_vec3(&mut mins, spec.aabb.0);
            push_vec3(&mut maxs, spec.aabb.1);
        }
        tables.push((n, mins, 0));
        tables.push((n, maxs, 0));

        // 每个子网格一个包围壳顶点
        let mut hull_starts = Vec::new();
        let mut hull_ends = Vec::new();
        let mut hull_vertices = Vec::new();
        for (i, spec) in self.submeshes.iter().enumerate() {
            push_i32(&mut hull_starts, i as i32);
            push_i32(&mut hull_ends, i as i32 + 1);
            push_vec3(&mut hull_vertices, spec.aabb.1);
        }
        tables.push((n, hull_starts, 0));
        tables.push((n, hull_ends, 0));
        tables.push((n, hull_vertices, 0));

        let layout_bytes = |layout: &[[i32; 4]]| {
            let mut out = Vec::new();
            layout.iter().flatten().for_each(|&v| push_i32(&mut out, v));
            out
        };
        tables.push((self.layout.len() as i32, layout_bytes(&self.layout), self.stride));
        tables.push((
            self.small_layout.len() as i32,
            layout_bytes(&self.small_layout),
            self.small_stride,
        ));

        let mut indices = Vec::new();
        for spec in &self.submeshes {
            for k in 0..spec.index_count {
                self.write_index(&mut indices, k % spec.vertex_count.max(1));
            }
        }
        tables.push((index_count as i32, indices, 0));

        let mut ranges = Vec::new();
        let mut index_start = 0;
        for spec in &self.submeshes {
            for value in [
                index_start,
                spec.index_count as i32,
                0,
                0,
                index_count as i32,
                0,
                spec.skin.0 as i32,
                spec.skin.1 as i32,
                spec.lod_level as i32,
                0,
                0,
                0,
            ] {
                push_i32(&mut ranges, value);
            }
            index_start += spec.index_count as i32;
        }
        tables.push((n, ranges, 0));

        let mut metadata = Vec::new();
        for (spec, record) in self.submeshes.iter().zip(&records) {
            let mut name = [0u8; METADATA_NAME_SIZE];
            let bytes = spec.name.as_bytes();
            name[..bytes.len()].copy_from_slice(bytes);
            metadata.extend_from_slice(&name);
            metadata.extend_from_slice(&spec.hash.to_le_bytes());
            for value in [record.0, record.1, record.2, record.3] {
                metadata.extend_from_slice(&value.to_le_bytes());
            }
        }
        tables.push((n, metadata, 0));

        // 头部：前导区、计数、目录，然后是各表
        let mut header = vec![0u8; COUNTS_OFFSET];
        push_i32(&mut header, vertex_count as i32);
        push_i32(&mut header, index_count as i32);
        push_i32(&mut header, self.index_width);
        push_i32(&mut header, 0);
        header.resize(DIRECTORY_OFFSET + Table::ALL.len() * DIRECTORY_ENTRY_SIZE, 0);

        for (i, (count, bytes, aux)) in tables.into_iter().enumerate() {
            let entry = DIRECTORY_OFFSET + i * DIRECTORY_ENTRY_SIZE;
            let field = entry + 4;
            let mut rel = 0i32;
            if count > 0 {
                header.extend(std::iter::repeat(0u8).take(self.gap));
                rel = (header.len() - field) as i32;
                header.extend_from_slice(&bytes);
            }
            header[entry..entry + 4].copy_from_slice(&count.to_le_bytes());
            header[field..field + 4].copy_from_slice(&rel.to_le_bytes());
            header[field + 4..field + 8].copy_from_slice(&aux.to_le_bytes());
        }

        (header, data)
    }
}

impl Default for HeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
