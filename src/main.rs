//! dist_geom - 场景导入工具
//!
//! 导入一个场景文件，执行一次变换与可见性传播，把绘制调用记录下来并输出统计。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件中的场景
//! cargo run
//!
//! # 命令行覆盖
//! cargo run -- --scene assets/scene.toml --log-level debug
//! ```
//!
//! # 流程
//!
//! ```text
//! config.toml ─▶ Config ─▶ ResourceContext
//!                                │
//! scene.toml ─▶ SceneImporter ◀──┘
//!                    │
//!                    ▼
//!                  Scene ─▶ propagate ─▶ render(RecordingPass)
//! ```

use anyhow::{Context, Result};
use dist_geom::core::{log, Config, ResourceContext};
use dist_geom::instancing::RecordingPass;
use dist_geom::scene::SceneImporter;
use tracing::{debug, info};

const DEFAULT_SCENE: &str = "assets/scene.toml";

fn main() -> Result<()> {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");

    // 2. 应用命令行参数
    config.apply_args(std::env::args());

    // 3. 验证配置
    config.validate().context("Invalid configuration")?;

    // 4. 初始化日志系统
    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "dist_geom starting");

    // 5. 导入场景
    let scene_path = config.scene.clone().unwrap_or_else(|| DEFAULT_SCENE.to_string());
    let mut context = ResourceContext::new(config);
    let mut importer = SceneImporter::new(&mut context);
    let mut scene = importer
        .import_file(&scene_path)
        .with_context(|| format!("Failed to import scene '{}'", scene_path))?;
    let import_stats = importer.stats();

    // 6. 传播变换、可见性与蒙皮
    let stats = scene.propagate().context("Scene propagation failed")?;
    info!(
        nodes = stats.transformed,
        culled = stats.visibility.culled,
        lod_rejected = stats.visibility.lod_rejected,
        skinned = stats.skinned,
        "Propagation finished"
    );

    // 7. 记录一帧的绘制调用
    let mut pass = RecordingPass::new();
    let draw_calls = scene.render(&mut pass);
    for call in &pass.calls {
        debug!(?call, "Draw call");
    }
    info!(
        draw_calls,
        instances = pass.instance_total(),
        placeholders = import_stats.placeholders,
        "Frame recorded"
    );

    scene.log_summary();
    info!(submeshes = context.mesh_registry.len(), "Mesh registry");
    Ok(())
}
