//! 绘制调用协作者
//!
//! 实例管理器不直接调用图形 API，而是把绘制调用发给 `RenderPass`。
//! 后端（或测试）实现这个 trait。

/// 图元拓扑
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
    Points,
}

/// 定位器：三条坐标轴线段
pub const LOCATOR_VERTEX_COUNT: u32 = 6;

/// 关节：一条线段
pub const JOINT_VERTEX_COUNT: u32 = 2;

/// 灯光：一个点
pub const LIGHT_VERTEX_COUNT: u32 = 1;

/// 渲染通道
pub trait RenderPass {
    /// 三角形列表实例化绘制
    fn draw_indexed_instanced(
        &mut self,
        topology: Topology,
        index_start: u32,
        index_count: u32,
        instance_count: u32,
    );

    /// 带基顶点偏移的实例化绘制（索引相对于 `base_vertex`）
    fn draw_indexed_base_vertex_instanced(
        &mut self,
        topology: Topology,
        index_start: u32,
        index_count: u32,
        base_vertex: u32,
        instance_count: u32,
    );

    /// 无索引实例化绘制
    fn draw_instanced(&mut self, topology: Topology, vertex_count: u32, instance_count: u32);
}

/// 一次记录下来的绘制调用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    Indexed {
        topology: Topology,
        index_start: u32,
        index_count: u32,
        instance_count: u32,
    },
    IndexedBaseVertex {
        topology: Topology,
        index_start: u32,
        index_count: u32,
        base_vertex: u32,
        instance_count: u32,
    },
    NonIndexed {
        topology: Topology,
        vertex_count: u32,
        instance_count: u32,
    },
}

impl DrawCall {
    pub fn instance_count(&self) -> u32 {
        match self {
            DrawCall::Indexed { instance_count, .. }
            | DrawCall::IndexedBaseVertex { instance_count, .. }
            | DrawCall::NonIndexed { instance_count, .. } => *instance_count,
        }
    }
}

/// 只记录调用、不提交 GPU 的渲染通道
#[derive(Debug, Default)]
pub struct RecordingPass {
    pub calls: Vec<DrawCall>,
}

impl RecordingPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部调用的实例总数
    pub fn instance_total(&self) -> u32 {
        self.calls.iter().map(DrawCall::instance_count).sum()
    }
}

impl RenderPass for RecordingPass {
    fn draw_indexed_instanced(
        &mut self,
        topology: Topology,
        index_start: u32,
        index_count: u32,
        instance_count: u32,
    ) {
        self.calls.push(DrawCall::Indexed {
            topology,
            index_start,
            index_count,
            instance_count,
        });
    }

    fn draw_indexed_base_vertex_instanced(
        &mut self,
        topology: Topology,
        index_start: u32,
        index_count: u32,
        base_vertex: u32,
        instance_count: u32,
    ) {
        self.calls.push(DrawCall::IndexedBaseVertex {
            topology,
            index_start,
            index_count,
            base_vertex,
            instance_count,
        });
    }

    fn draw_instanced(&mut self, topology: Topology, vertex_count: u32, instance_count: u32) {
        self.calls.push(DrawCall::NonIndexed {
            topology,
            vertex_count,
            instance_count,
        });
    }
}
