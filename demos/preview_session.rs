//! Simulated preview session
//!
//! Loads up to three models from an asset root, puts one viewer on each and
//! plays a short session against a recording surface: one project is opened,
//! orbited, then closed again. Render modes and per-viewer frame counts are
//! logged so the effect of the render-loop governor is visible.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use instant::Instant;
use log::{info, warn};
use maquette_io::{AssetCache, LoaderRegistry, WarmUpConfig};
use maquette_viewer::{
    FrameScheduler, RecordingSurface, RenderMode, ViewerConfig, ViewerInstance, ViewerOptions, Viewport,
};

const MAX_VIEWERS: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "maquette-demo")]
#[command(about = "Play a simulated open/orbit/close session over a few preview viewers")]
struct Cli {
    /// Directory that source identifiers are resolved against
    root: PathBuf,

    /// Source identifiers such as /assets/projects/agora/agora.glb
    #[arg(required = true)]
    sources: Vec<String>,

    /// Viewer configuration as JSON; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames to simulate
    #[arg(long, default_value_t = 480)]
    frames: u32,

    /// Frame interval in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Index of the viewer that gets opened
    #[arg(long, default_value_t = 0)]
    open: usize,

    /// Pre-load every source before the session starts
    #[arg(long)]
    warm_up: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<ViewerConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
        }
        None => Ok(ViewerConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let runtime = tokio::runtime::Runtime::new()?;
    let registry = LoaderRegistry::with_default_readers(&cli.root);
    let mut sources = cli.sources.clone();
    sources.retain(|source| {
        let supported = registry.supports(source);
        if !supported {
            warn!("skipping {}: unsupported format", source);
        }
        supported
    });
    if sources.len() > MAX_VIEWERS {
        warn!("showing the first {} of {} sources", MAX_VIEWERS, sources.len());
        sources.truncate(MAX_VIEWERS);
    }
    anyhow::ensure!(!sources.is_empty(), "no loadable sources given");

    let cache = AssetCache::new(Arc::new(registry), runtime.handle().clone());
    if cli.warm_up {
        if let Some(handle) = cache.warm_up(sources.clone(), WarmUpConfig::default()) {
            let report = runtime.block_on(handle)?;
            info!("warm-up: {:?}", report);
        }
    }

    let mut scheduler = FrameScheduler::new();
    let viewers: Vec<(ViewerInstance, RecordingSurface)> = sources
        .iter()
        .map(|source| {
            let surface = RecordingSurface::new();
            let viewer = ViewerInstance::new(
                &mut scheduler,
                &cache,
                ViewerOptions::new(source.as_str()).viewport(Viewport::new(480.0, 360.0)),
                &config,
                Box::new(surface.clone()),
            );
            (viewer, surface)
        })
        .collect();

    let open = cli.open.min(viewers.len() - 1);
    let open_at = cli.frames / 4;
    let close_at = cli.frames / 2;
    let frame = Duration::from_millis(cli.frame_ms);

    let mut idle_frames = 0u32;
    let mut last_modes: Vec<Option<RenderMode>> = vec![None; viewers.len()];
    for n in 0..cli.frames {
        let (active, _) = &viewers[open];
        if n == open_at {
            info!("frame {}: opening {}", n, active.source());
            active.set_interactive(true);
        }
        if (open_at..close_at).contains(&n) {
            active.orbit(2.0, 0.3);
        }
        if n == close_at {
            info!("frame {}: closing {}", n, active.source());
            active.set_interactive(false);
        }

        let report = scheduler.tick(Instant::now());
        if !report.wants_next_frame() {
            idle_frames += 1;
        }
        for (i, (viewer, _)) in viewers.iter().enumerate() {
            let mode = viewer.render_mode();
            if last_modes[i] != Some(mode) {
                info!("frame {}: {} is {:?}", n, viewer.source(), mode);
                last_modes[i] = Some(mode);
            }
        }
        std::thread::sleep(frame);
    }

    println!("Session of {} frames, {} with every viewer idle", cli.frames, idle_frames);
    for (viewer, surface) in &viewers {
        println!(
            "  {:<48} {:?}, {} frames drawn, {:?}",
            viewer.source(),
            viewer.asset_status(),
            surface.draw_count(),
            viewer.transition_state()
        );
        if let Some((scale, translation)) = viewer.normalization() {
            println!("      scale {:.4}, translation {:?}", scale, translation);
        }
    }
    Ok(())
}
