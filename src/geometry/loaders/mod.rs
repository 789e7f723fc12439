/// 几何加载器模块
///
/// 提供统一的加载接口和二进制几何格式的实现。
///
/// # 文件组织
///
/// 一个几何资源由两个文件组成：
///
/// - **头部** `*.geom`：计数、表目录和各张表
/// - **数据流** `*.geomdata`（扩展名可配置）：子网格的顶点/索引字节
///
/// # 使用示例
///
/// ```rust,no_run
/// use dist_geom::geometry::loaders::{GeomLoader, MeshLoader};
/// use std::path::Path;
///
/// let geom = GeomLoader::load_from_file(Path::new("assets/crate.geom"))?;
/// println!("子网格数: {}", geom.submesh_count());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::core::config::Config;
use crate::core::error::{ConfigError, Result};
use crate::geometry::geom_object::GeomObject;

pub mod cursor;
pub mod geom_decoder;
pub mod stream;
pub mod task;

#[cfg(test)]
pub(crate) mod test_support;

pub use geom_decoder::GeomDecoder;
pub use stream::DataStream;
pub use task::{spawn_decode, DecodeTask};

/// 默认的数据流扩展名
pub const DATA_EXTENSION: &str = "geomdata";

/// 几何加载器 trait
///
/// 所有格式的加载器都实现此 trait，返回 CPU 侧的 `GeomObject`，
/// 不涉及 GPU 资源。
pub trait MeshLoader {
    /// 从头部文件加载，数据流取同名的兄弟文件
    fn load_from_file(path: &Path) -> Result<GeomObject>;

    /// 从内存中的头部和数据流加载
    fn load_from_memory(header: &[u8], data: &[u8]) -> Result<GeomObject>;

    /// 支持的文件扩展名（小写，不含点号）
    fn supported_extensions() -> &'static [&'static str];
}

/// 二进制几何格式加载器
pub struct GeomLoader;

impl GeomLoader {
    /// 头部文件对应的数据流路径
    pub fn data_path(path: &Path, data_extension: &str) -> PathBuf {
        path.with_extension(data_extension)
    }

    /// 用给定解码器加载头部与数据流文件
    pub fn load_with(path: &Path, data_path: &Path, decoder: &GeomDecoder) -> Result<GeomObject> {
        let header = std::fs::read(path)?;
        let data = std::fs::read(data_path)?;
        Ok(decoder.decode(&header, &mut Cursor::new(data))?)
    }
}

impl MeshLoader for GeomLoader {
    fn load_from_file(path: &Path) -> Result<GeomObject> {
        Self::load_with(path, &Self::data_path(path, DATA_EXTENSION), &GeomDecoder::new())
    }

    fn load_from_memory(header: &[u8], data: &[u8]) -> Result<GeomObject> {
        Ok(GeomDecoder::new().decode(header, &mut Cursor::new(data))?)
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["geom"]
    }
}

/// 按配置加载几何文件
///
/// 数据流扩展名取 `import.data_extension`，蒙皮上限取 `skinning`。
/// 不支持的扩展名返回配置错误。
pub fn load_geometry(path: &Path, config: &Config) -> Result<GeomObject> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !GeomLoader::supported_extensions().contains(&extension.as_str()) {
        return Err(ConfigError::InvalidValue {
            field: "geometry".to_string(),
            reason: format!("unsupported geometry file: {}", path.display()),
        }
        .into());
    }

    let decoder = GeomDecoder::with_limits(
        config.skinning.max_bones_per_mesh,
        config.skinning.max_joints,
    );
    let data_path = GeomLoader::data_path(path, &config.import.data_extension);
    GeomLoader::load_with(path, &data_path, &decoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{DecodeError, DistGeomError};
    use test_support::{HeaderBuilder, SubmeshSpec};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dist_geom_loader_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_supported_extensions() {
        assert!(GeomLoader::supported_extensions().contains(&"geom"));
    }

    #[test]
    fn test_data_path_uses_sibling_file() {
        let path = Path::new("assets/crate.geom");
        assert_eq!(
            GeomLoader::data_path(path, "geomdata"),
            PathBuf::from("assets/crate.geomdata")
        );
    }

    #[test]
    fn test_load_from_memory() {
        let (header, data) = HeaderBuilder::new()
            .submesh(SubmeshSpec::new("Box", 9, 4))
            .build();
        let geom = GeomLoader::load_from_memory(&header, &data).unwrap();
        assert_eq!(geom.submesh_count(), 1);
    }

    #[test]
    fn test_load_geometry_from_files() {
        let dir = temp_dir("files");
        let (header, data) = HeaderBuilder::new()
            .submesh(SubmeshSpec::new("Box", 9, 4))
            .build();
        let path = dir.join("box.geom");
        std::fs::write(&path, header).unwrap();
        std::fs::write(dir.join("box.geomdata"), data).unwrap();

        let geom = load_geometry(&path, &Config::default()).unwrap();
        assert_eq!(geom.meta(9).unwrap().name, "Box");
    }

    #[test]
    fn test_load_geometry_rejects_extension() {
        let result = load_geometry(Path::new("model.obj"), &Config::default());
        assert!(matches!(result, Err(DistGeomError::Config(_))));
    }

    #[test]
    fn test_load_geometry_surfaces_decode_error() {
        let dir = temp_dir("bad");
        let (header, data) = HeaderBuilder::new()
            .submesh(SubmeshSpec::new("Box", 9, 4))
            .layout(vec![[0, 3, 11, 0]], 16)
            .build();
        let path = dir.join("bad.geom");
        std::fs::write(&path, header).unwrap();
        std::fs::write(dir.join("bad.geomdata"), data).unwrap();

        match load_geometry(&path, &Config::default()) {
            Err(DistGeomError::Decode(err)) => assert_eq!(err, DecodeError::UnknownTypeCode(11)),
            other => panic!("unexpected result: {:?}", other.map(|g| g.submesh_count())),
        }
    }
}
