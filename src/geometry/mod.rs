/// 几何体解码和处理模块
///
/// 把二进制几何文件解码为共享的 `GeomObject`，并按内容哈希去重子网格数据。
///
/// # 模块结构
///
/// - `vertex`: 顶点布局描述符、类型码查表、属性解码
/// - `mesh`: 子网格元数据与顶点/索引字节
/// - `joint`: 关节绑定数据
/// - `geom_object`: 解码结果
/// - `registry`: 子网格数据注册表
/// - `loaders`: 解码器、数据流、后台解码
///
/// # 数据流向
///
/// ```text
/// 头部 (*.geom) + 数据流 (*.geomdata)
///     ↓
/// GeomDecoder
///     ↓
/// GeomObject (Arc 共享)
///     ↓
/// MeshDataRegistry (按哈希去重) → MeshInstanceManager
/// ```

pub mod vertex;
pub mod mesh;
pub mod joint;
pub mod geom_object;
pub mod registry;
pub mod loaders;

// 重新导出常用类型
pub use geom_object::GeomObject;
pub use joint::JointBindingData;
pub use mesh::{ElementRange, IndexWidth, MeshData, MeshMetaData};
pub use registry::MeshDataRegistry;
pub use vertex::{BufferLayoutDescriptor, VertexElementType, VertexSemantic};
