//! 场景导入
//!
//! 把场景描述构建成 `Scene`：
//!
//! - 几何文件按路径缓存，先在后台线程并行解码，全部完成后才挂到场景图上
//! - 缺失的几何文件用内置立方体代替并警告
//! - 解码失败（格式错误、未知类型码）中止整个导入
//! - 缺失或循环引用的子场景生成 `Missing` 节点并警告，兄弟节点继续导入
//! - 子网格数据按材质登记到资源上下文的注册表

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::error;

use crate::component::{Color, Light, LightType, LocalTransform};
use crate::core::context::ResourceContext;
use crate::core::error::{Result, SceneError};
use crate::geometry::geom_object::{GeomObject, PLACEHOLDER_HASH};
use crate::geometry::loaders::{self, spawn_decode, GeomDecoder, GeomLoader, MeshLoader};
use crate::instancing::CollisionShape;
use crate::skinning::SkinBinding;
use crate::{import_info, import_warn};

use super::description::{NodeDescription, NodeKindDescription, SceneDescription};
use super::graph::{MeshNode, NodeId, NodeKind, SceneNode};
use super::world::Scene;

/// 导入统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub nodes: usize,
    pub instances: usize,
    /// 实际解码的几何文件数（缓存命中不计）
    pub geometries: usize,
    pub placeholders: usize,
    pub missing_references: usize,
}

enum ResolvedReference {
    Loaded {
        identity: PathBuf,
        base_dir: PathBuf,
        description: SceneDescription,
    },
    Missing(PathBuf),
}

pub struct SceneImporter<'a> {
    context: &'a mut ResourceContext,
    geometry: HashMap<PathBuf, Arc<GeomObject>>,
    placeholder: Option<Arc<GeomObject>>,
    /// 正在导入的场景文件，用于发现循环引用
    references: Vec<PathBuf>,
    stats: ImportStats,
}

impl<'a> SceneImporter<'a> {
    pub fn new(context: &'a mut ResourceContext) -> Self {
        Self {
            context,
            geometry: HashMap::new(),
            placeholder: None,
            references: Vec::new(),
            stats: ImportStats::default(),
        }
    }

    pub fn stats(&self) -> ImportStats {
        self.stats
    }

    /// 导入场景文件；几何与子场景路径相对于该文件所在目录
    pub fn import_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Scene> {
        let path = path.as_ref();
        let description = SceneDescription::from_file(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        self.references.push(identity_of(path));
        let scene = self.import(&description, &base_dir);
        self.references.pop();

        let scene = scene?;
        import_info!(
            path = %path.display(),
            nodes = self.stats.nodes,
            instances = self.stats.instances,
            geometries = self.stats.geometries,
            placeholders = self.stats.placeholders,
            missing = self.stats.missing_references,
            "Scene imported"
        );
        Ok(scene)
    }

    /// 从内存中的描述导入
    pub fn import(&mut self, description: &SceneDescription, base_dir: &Path) -> Result<Scene> {
        let mut scene = Scene::new(&*self.context);
        scene.camera = description.camera.to_camera();

        self.prefetch(&description.nodes, base_dir)?;
        self.import_nodes(&mut scene, None, &description.nodes, base_dir)?;
        Ok(scene)
    }

    fn import_nodes(
        &mut self,
        scene: &mut Scene,
        parent: Option<NodeId>,
        nodes: &[NodeDescription],
        base_dir: &Path,
    ) -> Result<()> {
        for desc in nodes {
            self.import_node(scene, parent, desc, base_dir)?;
        }
        Ok(())
    }

    fn import_node(
        &mut self,
        scene: &mut Scene,
        parent: Option<NodeId>,
        desc: &NodeDescription,
        base_dir: &Path,
    ) -> Result<NodeId> {
        desc.validate_lod_distances()?;
        let transform = desc.local_transform()?;

        // 未指定子网格时，节点本身是组，几何中的每个子网格各成一个子节点
        let mut expand = None;
        let mut sub_scene = None;

        let kind = match desc.kind {
            NodeKindDescription::Group => NodeKind::Group,
            NodeKindDescription::Locator => NodeKind::Locator,
            NodeKindDescription::Joint => {
                let index = desc.joint.ok_or_else(|| invalid(desc, "joint node needs a joint index"))?;
                let skeleton = match desc.geometry {
                    Some(_) => Some(self.load_geometry(desc, base_dir)?),
                    None => None,
                };
                NodeKind::Joint { skeleton, index }
            }
            NodeKindDescription::Light => NodeKind::Light(light_of(desc)?),
            NodeKindDescription::Mesh | NodeKindDescription::Collision => {
                let geometry = self.load_geometry(desc, base_dir)?;
                match desc.submesh {
                    Some(hash) => self.mesh_kind(scene, desc, &geometry, hash)?,
                    None => {
                        expand = Some(geometry);
                        NodeKind::Group
                    }
                }
            }
            NodeKindDescription::Reference => match self.resolve_reference(desc, base_dir)? {
                ResolvedReference::Loaded {
                    identity,
                    base_dir,
                    description,
                } => {
                    sub_scene = Some((identity, base_dir, description));
                    NodeKind::Group
                }
                ResolvedReference::Missing(path) => NodeKind::Missing { path },
            },
        };

        let id = self.add_node(scene, parent, desc, desc.name.clone(), transform, kind)?;

        if let Some(geometry) = expand {
            let submeshes: Vec<(String, u64)> = geometry
                .submeshes()
                .map(|meta| (meta.name.clone(), meta.hash))
                .collect();
            for (name, hash) in submeshes {
                let kind = self.mesh_kind(scene, desc, &geometry, hash)?;
                self.add_node(scene, Some(id), desc, name, LocalTransform::new(), kind)?;
            }
        }

        if let Some((identity, sub_base, description)) = sub_scene {
            self.references.push(identity);
            let result = self
                .prefetch(&description.nodes, &sub_base)
                .and_then(|_| self.import_nodes(scene, Some(id), &description.nodes, &sub_base));
            self.references.pop();
            result?;
        }

        self.import_nodes(scene, Some(id), &desc.children, base_dir)?;
        Ok(id)
    }

    fn add_node(
        &mut self,
        scene: &mut Scene,
        parent: Option<NodeId>,
        desc: &NodeDescription,
        name: String,
        transform: LocalTransform,
        kind: NodeKind,
    ) -> Result<NodeId> {
        let mut node = SceneNode::new(name, transform, kind);
        node.selected = desc.selected;
        node.color = desc.color;

        let id = scene.add_node(&*self.context, parent, node)?;
        self.stats.nodes += 1;
        if scene.graph.node(id).is_some_and(|n| n.instance.is_some()) {
            self.stats.instances += 1;
        }
        Ok(id)
    }

    /// 构建网格节点，登记子网格数据，蒙皮子网格同时建立骨骼重映射
    fn mesh_kind(
        &mut self,
        scene: &mut Scene,
        desc: &NodeDescription,
        geometry: &Arc<GeomObject>,
        hash: u64,
    ) -> Result<NodeKind> {
        // 占位立方体只有一个子网格
        let hash = if self.is_placeholder(geometry) { PLACEHOLDER_HASH } else { hash };
        let meta = geometry
            .meta(hash)
            .ok_or_else(|| invalid(desc, &format!("geometry has no submesh 0x{:X}", hash)))?;

        if let Some(data) = geometry.mesh_data(hash) {
            self.context.mesh_registry.save(hash, &desc.material, data.clone());
        }

        let skin = if meta.is_skinned() {
            let limits = &self.context.config().skinning;
            Some(SkinBinding::with_limits(meta, geometry, limits.max_bones_per_mesh, limits.max_joints)?)
        } else {
            None
        };

        let mesh = MeshNode {
            geometry: geometry.clone(),
            submesh: hash,
            material: desc.material.clone(),
            skin,
            lod_distances: desc.lod_distances.clone(),
        };

        Ok(match desc.kind {
            NodeKindDescription::Collision => NodeKind::Collision {
                mesh,
                shape: collision_shape_of(desc)?,
            },
            _ => NodeKind::Mesh(mesh),
        })
    }

    fn is_placeholder(&self, geometry: &Arc<GeomObject>) -> bool {
        self.placeholder
            .as_ref()
            .is_some_and(|placeholder| Arc::ptr_eq(placeholder, geometry))
    }

    /// 按路径取几何，必要时同步解码
    fn load_geometry(&mut self, desc: &NodeDescription, base_dir: &Path) -> Result<Arc<GeomObject>> {
        let relative = desc
            .geometry
            .as_deref()
            .ok_or_else(|| invalid(desc, "mesh node needs a geometry path"))?;
        let path = base_dir.join(relative);

        if let Some(geometry) = self.geometry.get(&path) {
            return Ok(geometry.clone());
        }

        let geometry = if path.exists() {
            let geometry = Arc::new(loaders::load_geometry(&path, self.context.config())?);
            self.stats.geometries += 1;
            geometry
        } else if self.context.config().import.placeholder_on_missing {
            import_warn!(path = %path.display(), node = %desc.name, "Geometry file missing, using placeholder cube");
            self.stats.placeholders += 1;
            self.placeholder
                .get_or_insert_with(|| Arc::new(GeomObject::placeholder()))
                .clone()
        } else {
            return Err(SceneError::FileNotFound(path).into());
        };

        self.geometry.insert(path, geometry.clone());
        Ok(geometry)
    }

    /// 在后台线程并行解码这一层描述引用的所有几何文件
    ///
    /// 不展开子场景引用；子场景在导入时各自预取。
    fn prefetch(&mut self, nodes: &[NodeDescription], base_dir: &Path) -> Result<()> {
        let mut paths = Vec::new();
        collect_geometry_paths(nodes, base_dir, &mut paths);
        paths.sort();
        paths.dedup();
        paths.retain(|path| !self.geometry.contains_key(path) && path.exists() && is_geom_file(path));
        if paths.is_empty() {
            return Ok(());
        }

        let config = self.context.config();
        let decoder = GeomDecoder::with_limits(config.skinning.max_bones_per_mesh, config.skinning.max_joints);
        let mut tasks = Vec::with_capacity(paths.len());
        for path in paths {
            let header = fs::read(&path)?;
            let data = fs::read(GeomLoader::data_path(&path, &config.import.data_extension))?;
            tasks.push((path, spawn_decode(decoder, header, data)));
        }

        for (path, task) in tasks {
            let geometry = task.join().map_err(|e| {
                error!(path = %path.display(), error = %e, "Geometry decode failed, aborting import");
                e
            })?;
            self.stats.geometries += 1;
            self.geometry.insert(path, geometry);
        }
        Ok(())
    }

    fn resolve_reference(&mut self, desc: &NodeDescription, base_dir: &Path) -> Result<ResolvedReference> {
        let relative = desc
            .reference
            .as_deref()
            .ok_or_else(|| invalid(desc, "reference node needs a reference path"))?;
        let path = base_dir.join(relative);

        if !path.exists() {
            import_warn!(path = %path.display(), node = %desc.name, "Referenced scene missing");
            self.stats.missing_references += 1;
            return Ok(ResolvedReference::Missing(path));
        }

        let identity = identity_of(&path);
        if self.references.contains(&identity) {
            import_warn!(path = %path.display(), node = %desc.name, "Scene reference cycle, treated as missing");
            self.stats.missing_references += 1;
            return Ok(ResolvedReference::Missing(path));
        }

        let description = SceneDescription::from_file(&path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(ResolvedReference::Loaded {
            identity,
            base_dir,
            description,
        })
    }
}

fn identity_of(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn is_geom_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| GeomLoader::supported_extensions().contains(&e.to_lowercase().as_str()))
}

fn collect_geometry_paths(nodes: &[NodeDescription], base_dir: &Path, out: &mut Vec<PathBuf>) {
    for node in nodes {
        if matches!(
            node.kind,
            NodeKindDescription::Mesh | NodeKindDescription::Collision | NodeKindDescription::Joint
        ) {
            if let Some(geometry) = &node.geometry {
                out.push(base_dir.join(geometry));
            }
        }
        collect_geometry_paths(&node.children, base_dir, out);
    }
}

fn invalid(desc: &NodeDescription, reason: &str) -> SceneError {
    SceneError::InvalidNode {
        name: desc.name.clone(),
        reason: reason.to_string(),
    }
}

fn light_of(desc: &NodeDescription) -> Result<Light> {
    let name = desc.light.as_deref().unwrap_or("point");
    let light_type = LightType::parse(name).ok_or_else(|| invalid(desc, &format!("unknown light type '{}'", name)))?;

    let mut light = Light::new(light_type);
    if let Some(rgb) = desc.light_color {
        light = light.with_color(Color::from(rgb));
    }
    if let Some(intensity) = desc.intensity {
        light = light.with_intensity(intensity);
    }
    Ok(light)
}

fn collision_shape_of(desc: &NodeDescription) -> Result<CollisionShape> {
    match desc.collision_shape.as_deref() {
        None | Some("mesh") => Ok(CollisionShape::Mesh),
        Some("primitive") => Ok(CollisionShape::Primitive),
        Some(other) => Err(invalid(desc, &format!("unknown collision shape '{}'", other)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::error::{DecodeError, DistGeomError};
    use crate::geometry::loaders::test_support::{HeaderBuilder, SubmeshSpec};
    use crate::instancing::{MeshKey, RecordingPass};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dist_geom_import_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_geometry(dir: &Path, name: &str, builder: HeaderBuilder) {
        let (header, data) = builder.build();
        fs::write(dir.join(format!("{}.geom", name)), header).unwrap();
        fs::write(dir.join(format!("{}.geomdata", name)), data).unwrap();
    }

    fn crate_geometry() -> HeaderBuilder {
        HeaderBuilder::new()
            .submesh(SubmeshSpec::new("CrateHigh", 11, 4))
            .submesh(SubmeshSpec::new("CrateLow", 12, 4).lod(1))
    }

    const MAIN_SCENE: &str = r#"
[camera]
position = [0.0, 0.0, 10.0]

[[nodes]]
name = "Yard"

  [[nodes.children]]
  name = "Crate"
  kind = "mesh"
  geometry = "crate.geom"
  material = "wood"
  submesh = 11

  [[nodes.children]]
  name = "CrateSet"
  kind = "mesh"
  geometry = "crate.geom"
  material = "stone"
  lod_distances = [50.0]

  [[nodes.children]]
  name = "Ghost"
  kind = "mesh"
  geometry = "ghost.geom"
  submesh = 99

  [[nodes.children]]
  name = "Marker"
  kind = "locator"

  [[nodes.children]]
  name = "Lamp"
  kind = "light"
  light = "spot"
  light_color = [1.0, 0.5, 0.0]

[[nodes]]
name = "Lost"
kind = "reference"
reference = "nowhere.toml"

[[nodes]]
name = "Shed"
kind = "reference"
reference = "shed.toml"
position = [5.0, 0.0, 0.0]
"#;

    const SHED_SCENE: &str = r#"
[[nodes]]
name = "ShedCrate"
kind = "mesh"
geometry = "crate.geom"
material = "wood"
submesh = 11
"#;

    #[test]
    fn test_import_builds_graph_and_instances() {
        crate::core::log::init_test_logger();
        let dir = temp_dir("full");
        write_geometry(&dir, "crate", crate_geometry());
        fs::write(dir.join("main.toml"), MAIN_SCENE).unwrap();
        fs::write(dir.join("shed.toml"), SHED_SCENE).unwrap();

        let mut context = ResourceContext::default();
        let mut importer = SceneImporter::new(&mut context);
        let mut scene = importer.import_file(dir.join("main.toml")).unwrap();
        let stats = importer.stats();

        // crate.geom 只解码一次
        assert_eq!(stats.geometries, 1);
        assert_eq!(stats.placeholders, 1);
        assert_eq!(stats.missing_references, 1);
        // Yard, Crate, CrateSet + 2 子网格, Ghost, Marker, Lamp, Lost, Shed, ShedCrate
        assert_eq!(stats.nodes, 11);
        assert_eq!(scene.graph.len(), 11);
        // Crate, CrateHigh, CrateLow, Ghost, Marker, Lamp, ShedCrate
        assert_eq!(stats.instances, 7);
        assert_eq!(scene.instance_count(), 7);

        let crate_set = scene.graph.find("CrateSet").unwrap();
        assert_eq!(scene.graph.node(crate_set).unwrap().children.len(), 2);

        let ghost = scene.graph.find("Ghost").unwrap();
        match &scene.graph.node(ghost).unwrap().kind {
            NodeKind::Mesh(mesh) => assert_eq!(mesh.submesh, PLACEHOLDER_HASH),
            other => panic!("unexpected kind {:?}", other.label()),
        }

        let lost = scene.graph.find("Lost").unwrap();
        assert!(matches!(scene.graph.node(lost).unwrap().kind, NodeKind::Missing { .. }));

        let shed_crate = scene.graph.find("ShedCrate").unwrap();
        assert_eq!(scene.graph.node(shed_crate).unwrap().parent, scene.graph.find("Shed"));

        // wood 材质的 Crate 与 ShedCrate 共享一个管理器
        assert_eq!(scene.manager(&MeshKey::new(11, "wood")).unwrap().count(), 2);

        // 子场景节点继承引用节点的平移
        let stats = scene.propagate().unwrap();
        assert_eq!(stats.transformed, 11);
        let position = scene.graph.node(shed_crate).unwrap().world_position;
        assert!((position.x - 5.0).abs() < 1e-6);

        let mut pass = RecordingPass::new();
        assert!(scene.render(&mut pass) > 0);

        drop(scene);
        assert_eq!(context.mesh_registry.materials(11), &["wood".to_string(), "stone".to_string()]);
        assert!(context.mesh_registry.contains(12));
        assert!(context.mesh_registry.contains(PLACEHOLDER_HASH));
        assert_eq!(context.mesh_registry.get(11).vertex_count(), 4);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_geometry_aborts_import() {
        let dir = temp_dir("malformed");
        fs::write(dir.join("broken.geom"), [0u8; 16]).unwrap();
        fs::write(dir.join("broken.geomdata"), []).unwrap();
        fs::write(
            dir.join("main.toml"),
            "[[nodes]]\nname = \"Broken\"\nkind = \"mesh\"\ngeometry = \"broken.geom\"\nsubmesh = 1\n",
        )
        .unwrap();

        let mut context = ResourceContext::default();
        let result = SceneImporter::new(&mut context).import_file(dir.join("main.toml"));
        assert!(matches!(result, Err(DistGeomError::Decode(DecodeError::Truncated { .. }))));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_type_code_aborts_import() {
        let dir = temp_dir("type_code");
        write_geometry(
            &dir,
            "odd",
            HeaderBuilder::new().submesh(SubmeshSpec::new("Odd", 1, 4)).layout(vec![[0, 3, 99, 0]], 16),
        );
        fs::write(
            dir.join("main.toml"),
            "[[nodes]]\nname = \"Odd\"\nkind = \"mesh\"\ngeometry = \"odd.geom\"\nsubmesh = 1\n",
        )
        .unwrap();

        let mut context = ResourceContext::default();
        let result = SceneImporter::new(&mut context).import_file(dir.join("main.toml"));
        assert!(matches!(result, Err(DistGeomError::Decode(DecodeError::UnknownTypeCode(99)))));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reference_cycle_becomes_missing() {
        let dir = temp_dir("cycle");
        fs::write(
            dir.join("a.toml"),
            "[[nodes]]\nname = \"ToB\"\nkind = \"reference\"\nreference = \"b.toml\"\n",
        )
        .unwrap();
        fs::write(
            dir.join("b.toml"),
            "[[nodes]]\nname = \"ToA\"\nkind = \"reference\"\nreference = \"a.toml\"\n\n[[nodes]]\nname = \"Sibling\"\nkind = \"locator\"\n",
        )
        .unwrap();

        let mut context = ResourceContext::default();
        let mut importer = SceneImporter::new(&mut context);
        let scene = importer.import_file(dir.join("a.toml")).unwrap();

        assert_eq!(importer.stats().missing_references, 1);
        let to_a = scene.graph.find("ToA").unwrap();
        assert!(matches!(scene.graph.node(to_a).unwrap().kind, NodeKind::Missing { .. }));
        assert!(scene.graph.find("Sibling").is_some());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_geometry_without_placeholder_is_error() {
        let mut config = Config::default();
        config.import.placeholder_on_missing = false;
        let mut context = ResourceContext::new(config);

        let description = SceneDescription::parse(
            "[[nodes]]\nname = \"Ghost\"\nkind = \"mesh\"\ngeometry = \"ghost.geom\"\nsubmesh = 1\n",
        )
        .unwrap();
        let result = SceneImporter::new(&mut context).import(&description, Path::new("does/not/exist"));
        assert!(matches!(result, Err(DistGeomError::Scene(SceneError::FileNotFound(_)))));
    }

    #[test]
    fn test_invalid_nodes_are_rejected() {
        let mut context = ResourceContext::default();
        let cases = [
            "[[nodes]]\nname = \"J\"\nkind = \"joint\"\n",
            "[[nodes]]\nname = \"L\"\nkind = \"light\"\nlight = \"area\"\n",
            "[[nodes]]\nname = \"R\"\nkind = \"reference\"\n",
        ];
        for case in cases {
            let description = SceneDescription::parse(case).unwrap();
            let result = SceneImporter::new(&mut context).import(&description, Path::new("."));
            assert!(
                matches!(result, Err(DistGeomError::Scene(SceneError::InvalidNode { .. }))),
                "case {:?}",
                case
            );
        }
    }

    #[test]
    fn test_unknown_submesh_is_rejected() {
        let dir = temp_dir("submesh");
        write_geometry(&dir, "crate", crate_geometry());
        let description = SceneDescription::parse(
            "[[nodes]]\nname = \"Crate\"\nkind = \"mesh\"\ngeometry = \"crate.geom\"\nsubmesh = 77\n",
        )
        .unwrap();

        let mut context = ResourceContext::default();
        let result = SceneImporter::new(&mut context).import(&description, &dir);
        assert!(matches!(result, Err(DistGeomError::Scene(SceneError::InvalidNode { .. }))));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_skinned_mesh_and_joints() {
        let dir = temp_dir("skinned");
        write_geometry(
            &dir,
            "arm",
            HeaderBuilder::new()
                .submesh(SubmeshSpec::new("Arm", 21, 4).skin(0, 2))
                .joints(2)
                .bone_remap(vec![0, 1]),
        );
        fs::write(
            dir.join("main.toml"),
            r#"
[[nodes]]
name = "Shoulder"
kind = "joint"
joint = 0

  [[nodes.children]]
  name = "Elbow"
  kind = "joint"
  joint = 1
  position = [0.0, 1.0, 0.0]

[[nodes]]
name = "Arm"
kind = "mesh"
geometry = "arm.geom"
material = "skin"
submesh = 21

[[nodes]]
name = "Hull"
kind = "collision"
geometry = "arm.geom"
submesh = 21
collision_shape = "primitive"
"#,
        )
        .unwrap();

        let mut context = ResourceContext::default();
        let mut scene = SceneImporter::new(&mut context).import_file(dir.join("main.toml")).unwrap();
        let arm = scene.graph.find("Arm").unwrap();
        let geometry = scene.graph.node(arm).unwrap().kind.mesh().unwrap().geometry.clone();
        assert_eq!(scene.palette_for(&geometry).unwrap().joint_count(), 2);

        let hull = scene.graph.find("Hull").unwrap();
        assert!(matches!(
            scene.graph.node(hull).unwrap().kind,
            NodeKind::Collision { shape: CollisionShape::Primitive, .. }
        ));

        // Arm 和 Hull 都是蒙皮子网格
        let stats = scene.propagate().unwrap();
        assert_eq!(stats.skinned, 2);
        assert_eq!(scene.skinning().instance_count(), 2);

        // 关节节点正处于绑定姿态
        let skin = scene.skinning().skin_matrix(0, 1).unwrap();
        assert!(crate::math::utils::matrix_approx_eq(&skin, &crate::math::Matrix4::identity(), 1e-5));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_skinned_geometries_keep_their_own_skeletons() {
        let dir = temp_dir("two_skeletons");
        write_geometry(
            &dir,
            "arm",
            HeaderBuilder::new()
                .submesh(SubmeshSpec::new("Arm", 21, 4).skin(0, 2))
                .joints(2)
                .bone_remap(vec![0, 1]),
        );
        write_geometry(
            &dir,
            "tail",
            HeaderBuilder::new()
                .submesh(SubmeshSpec::new("Tail", 31, 4).skin(0, 1))
                .joints(5)
                .bone_remap(vec![4]),
        );
        fs::write(
            dir.join("main.toml"),
            r#"
[[nodes]]
name = "Arm"
kind = "mesh"
geometry = "arm.geom"
submesh = 21

[[nodes]]
name = "Tail"
kind = "mesh"
geometry = "tail.geom"
submesh = 31

[[nodes]]
name = "TailTip"
kind = "joint"
geometry = "tail.geom"
joint = 4
position = [3.0, 4.0, 0.0]
"#,
        )
        .unwrap();

        let mut context = ResourceContext::default();
        let mut scene = SceneImporter::new(&mut context).import_file(dir.join("main.toml")).unwrap();
        assert_eq!(scene.skeleton_count(), 2);
        assert_eq!(scene.joint_count(), 7);

        // 第二个骨架的关节 4 超出第一个骨架，但各用各的关节表
        let stats = scene.propagate().unwrap();
        assert_eq!(stats.skinned, 2);

        let arm_skin = scene.skinning().skin_matrix(0, 1).unwrap();
        assert!(crate::math::utils::matrix_approx_eq(&arm_skin, &crate::math::Matrix4::identity(), 1e-5));

        // 关节 4 绑定在 (0,4,0)，移到 (3,4,0)
        let tail_skin = scene.skinning().skin_matrix(1, 0).unwrap();
        assert!(crate::math::utils::matrix_approx_eq(
            &tail_skin,
            &crate::math::matrix::translation(&crate::math::Vector3::new(3.0, 0.0, 0.0)),
            1e-5
        ));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_skin_limits_from_config() {
        let dir = temp_dir("skin_limits");
        write_geometry(
            &dir,
            "arm",
            HeaderBuilder::new()
                .submesh(SubmeshSpec::new("Arm", 21, 4).skin(0, 3))
                .joints(3)
                .bone_remap(vec![0, 1, 2]),
        );
        let description = SceneDescription::parse(
            "[[nodes]]\nname = \"Arm\"\nkind = \"mesh\"\ngeometry = \"arm.geom\"\nsubmesh = 21\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.skinning.max_bones_per_mesh = 2;
        let mut context = ResourceContext::new(config);
        let result = SceneImporter::new(&mut context).import(&description, &dir);

        // 解码器按配置的上限拒绝
        assert!(matches!(
            result,
            Err(DistGeomError::Decode(DecodeError::SkinCapExceeded { what: "bone remap", count: 3, cap: 2 }))
        ));

        let _ = fs::remove_dir_all(&dir);
    }
}
