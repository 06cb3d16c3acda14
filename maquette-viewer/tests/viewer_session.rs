use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use instant::Instant;
use maquette_core::{Aabb, Material, MeshPrimitive, Point3f, SceneAsset, SceneNode, TriangleMesh, Vector3f};
use maquette_io::{AssetCache, AssetLoader, IoError, IoResult};
use maquette_viewer::{
    AssetStatus, CameraState, FrameScheduler, RecordingSurface, RenderMode, TransitionState, ViewerConfig,
    ViewerInstance, ViewerOptions, Viewport,
};
use tokio::runtime::Runtime;

const FRAME: Duration = Duration::from_millis(16);

/// Box of size (8,4,4) centered on (2,0,0) for every path except `missing*`
fn box_loader(loads: Arc<AtomicUsize>) -> Arc<dyn AssetLoader> {
    Arc::new(move |path: &str| -> IoResult<SceneAsset> {
        loads.fetch_add(1, Ordering::SeqCst);
        if path.starts_with("missing") {
            return Err(IoError::FileNotFound { path: path.to_string() });
        }
        let bounds = Aabb::from_center_size(Point3f::new(2.0, 0.0, 0.0), Vector3f::new(8.0, 4.0, 4.0));
        let mesh = TriangleMesh::from_vertices_and_faces(bounds.corners().to_vec(), vec![[0, 1, 2], [4, 5, 6]]);
        let root = SceneNode::named("box").with_primitive(MeshPrimitive::new(mesh, Material::default()));
        Ok(SceneAsset::new(path, root))
    })
}

struct Harness {
    _runtime: Runtime,
    cache: AssetCache,
    scheduler: FrameScheduler,
    loads: Arc<AtomicUsize>,
    now: Instant,
}

impl Harness {
    fn new() -> Self {
        let runtime = Runtime::new().unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = AssetCache::new(box_loader(Arc::clone(&loads)), runtime.handle().clone());
        Self {
            _runtime: runtime,
            cache,
            scheduler: FrameScheduler::new(),
            loads,
            now: Instant::now(),
        }
    }

    fn viewer(&mut self, options: ViewerOptions, surface: &RecordingSurface) -> ViewerInstance {
        ViewerInstance::new(
            &mut self.scheduler,
            &self.cache,
            options,
            &ViewerConfig::default(),
            Box::new(surface.clone()),
        )
    }

    fn tick(&mut self) -> maquette_viewer::TickReport {
        let report = self.scheduler.tick(self.now);
        self.now += FRAME;
        report
    }

    /// Tick until `viewer` has left the loading state
    fn wait_for_asset(&mut self, viewer: &ViewerInstance) {
        for _ in 0..2_000 {
            self.tick();
            if viewer.asset_status() != AssetStatus::Loading {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("asset never finished loading");
    }
}

fn preview() -> CameraState {
    CameraState::preview(&ViewerConfig::default().camera)
}

#[test]
fn test_open_orbit_close_returns_to_preview() {
    let mut h = Harness::new();
    let surface = RecordingSurface::new();
    let viewer = h.viewer(ViewerOptions::new("agora.glb").interactive(true), &surface);
    h.wait_for_asset(&viewer);

    let (scale, translation) = viewer.normalization().unwrap();
    assert_relative_eq!(scale, 0.5);
    assert_relative_eq!(translation, Vector3f::new(-2.0, 0.0, 0.0));
    assert_eq!(viewer.camera_state(), preview());
    assert_eq!(viewer.controls_enabled(), Some(true));

    assert!(viewer.orbit(120.0, 0.0));
    assert!(viewer.zoom(2.0));
    for _ in 0..60 {
        h.tick();
        assert_eq!(viewer.render_mode(), RenderMode::Continuous);
    }
    let orbited = viewer.camera_state();
    assert!(orbited.position_distance(&preview()) > 1.0);
    assert_relative_eq!(orbited.zoom, 65.0 / (0.95 * 0.95), epsilon = 1e-3);

    viewer.set_interactive_at(false, h.now);
    assert!(matches!(viewer.transition_state(), TransitionState::AnimatingToPreview { .. }));
    assert_eq!(viewer.controls_enabled(), None);
    assert!(!viewer.orbit(50.0, 0.0));

    let mut last = viewer.camera_state();
    let mut frames = 0;
    while viewer.transition_state() != TransitionState::Idle {
        h.tick();
        frames += 1;
        assert!(frames < 2_000, "transition never converged");
        let current = viewer.camera_state();
        assert!(current.position_distance(&preview()) <= last.position_distance(&preview()));
        assert!(current.zoom_distance(&preview()) <= last.zoom_distance(&preview()));
        assert_eq!(viewer.render_mode(), RenderMode::Continuous);
        last = current;
    }
    assert_eq!(viewer.camera_state(), preview());
    assert_eq!(surface.last().unwrap().camera, preview());

    // one frame for the final snap, then nothing until invalidated
    h.tick();
    h.tick();
    assert_eq!(viewer.render_mode(), RenderMode::OnDemand);
    let drawn = viewer.frames_drawn();
    let report = h.tick();
    assert_eq!(report.rendered, 0);
    assert!(!report.wants_next_frame());
    assert_eq!(viewer.frames_drawn(), drawn);

    // reopening takes over the camera without moving it
    viewer.set_interactive_at(true, h.now);
    assert_eq!(viewer.controls_enabled(), Some(true));
    assert_eq!(viewer.transition_state(), TransitionState::Idle);
    h.tick();
    assert_eq!(viewer.camera_state(), preview());
    assert_eq!(viewer.render_mode(), RenderMode::Continuous);
}

#[test]
fn test_reopening_mid_return_hands_camera_back_to_user() {
    let mut h = Harness::new();
    let surface = RecordingSurface::new();
    let viewer = h.viewer(ViewerOptions::new("agora.glb").interactive(true), &surface);
    h.wait_for_asset(&viewer);

    viewer.orbit(150.0, 0.0);
    for _ in 0..40 {
        h.tick();
    }
    viewer.set_interactive_at(false, h.now);
    for _ in 0..10 {
        h.tick();
    }
    assert!(matches!(viewer.transition_state(), TransitionState::AnimatingToPreview { .. }));
    let mid_return = viewer.camera_state();
    assert!(mid_return.position_distance(&preview()) > 0.01);

    viewer.set_interactive_at(true, h.now);
    assert_eq!(viewer.transition_state(), TransitionState::Idle);
    assert_eq!(viewer.camera_state(), mid_return);
    assert_eq!(viewer.controls_enabled(), Some(true));
    assert!(viewer.orbit(20.0, 0.0));

    h.tick();
    assert_eq!(viewer.render_mode(), RenderMode::Continuous);
    assert_eq!(viewer.transition_state(), TransitionState::Idle);
}

#[test]
fn test_preview_draws_with_preview_quality_then_goes_on_demand() {
    let mut h = Harness::new();
    let surface = RecordingSurface::new();
    let viewer = h.viewer(ViewerOptions::new("reseau.glb"), &surface);
    h.wait_for_asset(&viewer);

    for _ in 0..20 {
        h.tick();
    }
    assert_eq!(viewer.render_mode(), RenderMode::OnDemand);
    let last = surface.last().unwrap();
    assert!(!last.antialias);
    assert_eq!(last.primitives, Some(1));
    assert_eq!(viewer.controls_enabled(), None);
    assert!(!viewer.orbit(10.0, 10.0));

    let drawn = surface.draw_count();
    viewer.request_redraw();
    h.tick();
    h.tick();
    assert_eq!(surface.draw_count(), drawn + 1);

    viewer.resize(Viewport::new(0.0, 0.0));
    h.tick();
    assert_eq!(viewer.render_mode(), RenderMode::Paused);
    assert_eq!(surface.draw_count(), drawn + 1);

    viewer.resize(Viewport::new(320.0, 240.0));
    h.tick();
    assert_eq!(viewer.render_mode(), RenderMode::Continuous);
    assert_eq!(surface.draw_count(), drawn + 2);
}

#[test]
fn test_failed_load_renders_placeholder() {
    let mut h = Harness::new();
    let surface = RecordingSurface::new();
    let viewer = h.viewer(ViewerOptions::new("missing.glb"), &surface);
    h.wait_for_asset(&viewer);
    h.tick();

    assert_eq!(viewer.asset_status(), AssetStatus::Failed);
    assert!(viewer.asset().is_none());
    assert!(surface.draw_count() > 0);
    assert!(surface.draws().iter().all(|d| d.primitives.is_none()));

    // a retry through a new viewer loads again
    let retry = h.viewer(ViewerOptions::new("missing.glb"), &surface);
    h.wait_for_asset(&retry);
    assert_eq!(h.loads.load(Ordering::SeqCst), 2);
}

#[test]
fn test_viewers_share_asset_but_not_camera() {
    let mut h = Harness::new();
    let a_surface = RecordingSurface::new();
    let b_surface = RecordingSurface::new();
    let a = h.viewer(ViewerOptions::new("maison.glb"), &a_surface);
    let b = h.viewer(ViewerOptions::new("maison.glb"), &b_surface);
    h.wait_for_asset(&a);
    h.wait_for_asset(&b);

    assert_eq!(h.loads.load(Ordering::SeqCst), 1);
    assert_eq!(h.cache.loads_started(), 1);
    assert!(maquette_io::AssetHandle::ptr_eq(&a.asset().unwrap(), &b.asset().unwrap()));
    assert_ne!(a.id(), b.id());

    a.set_interactive_at(true, h.now);
    a.orbit(200.0, 0.0);
    for _ in 0..30 {
        h.tick();
    }
    assert_ne!(a.camera_state(), preview());
    assert_eq!(b.camera_state(), preview());
    assert!(a_surface.last().unwrap().antialias);
    assert!(!b_surface.last().unwrap().antialias);
}

#[test]
fn test_dropping_viewer_mid_transition_stops_frames() {
    let mut h = Harness::new();
    let surface = RecordingSurface::new();
    let viewer = h.viewer(ViewerOptions::new("agora.glb").interactive(true), &surface);
    h.wait_for_asset(&viewer);

    viewer.orbit(150.0, 0.0);
    for _ in 0..30 {
        h.tick();
    }
    viewer.set_interactive_at(false, h.now);
    h.tick();
    assert!(matches!(viewer.transition_state(), TransitionState::AnimatingToPreview { .. }));

    drop(viewer);
    assert!(surface.is_released());
    assert!(h.scheduler.is_empty());

    let drawn = surface.draw_count();
    let report = h.tick();
    assert_eq!(report, maquette_viewer::TickReport::default());
    assert_eq!(surface.draw_count(), drawn);
}
