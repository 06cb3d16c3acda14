//! Viewer instances
//!
//! A [`ViewerInstance`] shows one asset in one region of the page. Its only
//! mode input is the interactive flag; camera transitions, orbit controls and
//! the render loop all follow from edges on that flag and from frame time.
//!
//! The per-frame state lives in a [`ViewerState`] shared with the
//! [`FrameScheduler`] through a weak registration, so dropping the instance
//! stops its frames immediately, even mid-transition.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use instant::Instant;
use log::{debug, info, warn};
use maquette_core::NormalizedScene;
use maquette_io::{AssetCache, AssetHandle, AssetRequest, LoadError, RequestPoll};

use crate::camera::{CameraState, Viewport};
use crate::config::ViewerConfig;
use crate::governor::{RenderLoopGovernor, RenderMode};
use crate::orbit::OrbitControls;
use crate::scheduler::{FrameCallback, FrameContext, FrameOutcome, FrameRegistration, FrameScheduler};
use crate::surface::{Frame, RenderSurface};
use crate::transition::{CameraTransitionController, Edge, EdgeDetector, TransitionEvent, TransitionState};

static NEXT_VIEWER_ID: AtomicU64 = AtomicU64::new(1);

/// Per-instance identity; camera state is never shared between ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(u64);

impl ViewerId {
    fn next() -> Self {
        Self(NEXT_VIEWER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer#{}", self.0)
    }
}

/// Where the viewer's asset is
#[derive(Debug)]
pub enum AssetSlot {
    Loading(AssetRequest),
    Ready(AssetHandle),
    /// Drawn as an empty placeholder
    Failed(LoadError),
}

/// Coarse asset status for hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Loading,
    Ready,
    Failed,
}

/// Construction parameters of a viewer
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub source: String,
    pub interactive: bool,
    pub viewport: Viewport,
}

impl ViewerOptions {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            interactive: false,
            viewport: Viewport::default(),
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}

pub struct ViewerState {
    id: ViewerId,
    source: String,
    config: ViewerConfig,
    interactive: bool,
    /// Host-side edges; the transition controller keeps its own detector
    edges: EdgeDetector,
    asset: AssetSlot,
    controller: CameraTransitionController,
    governor: RenderLoopGovernor,
    surface: Box<dyn RenderSurface>,
    last_mode: RenderMode,
    frames_drawn: u64,
}

impl ViewerState {
    fn new(cache: &AssetCache, options: ViewerOptions, config: &ViewerConfig, surface: Box<dyn RenderSurface>) -> Self {
        let controller = CameraTransitionController::new(
            &config.camera,
            config.transition.clone(),
            options.interactive,
            options.viewport,
        );
        let mut state = Self {
            id: ViewerId::next(),
            asset: AssetSlot::Loading(cache.request(&options.source)),
            source: options.source,
            config: config.clone(),
            interactive: options.interactive,
            edges: EdgeDetector::new(options.interactive),
            controller,
            governor: RenderLoopGovernor::new(config.governor.clone()),
            surface,
            last_mode: RenderMode::Continuous,
            frames_drawn: 0,
        };
        if options.interactive {
            state.attach_controls();
        }
        state.poll_asset();
        debug!("{} created for {}", state.id, state.source);
        state
    }

    fn attach_controls(&mut self) {
        let home = CameraState::preview(&self.config.camera);
        self.controller
            .attach_controls(OrbitControls::new(self.config.orbit.clone(), home));
    }

    fn set_interactive(&mut self, interactive: bool, now: Instant) {
        let Some(edge) = self.edges.observe(interactive) else {
            return;
        };
        self.interactive = interactive;
        match edge {
            Edge::Opened => self.attach_controls(),
            Edge::Closed => {
                self.controller.detach_controls();
            }
        }
        if let Some(event) = self.controller.set_interactive(interactive) {
            debug!("{}: {:?}", self.id, event);
        }
        self.governor.on_edge(edge, now);
    }

    fn poll_asset(&mut self) {
        let AssetSlot::Loading(request) = &mut self.asset else {
            return;
        };
        match request.poll() {
            RequestPoll::Pending => {}
            RequestPoll::Ready(handle) => {
                info!("{}: {} ready", self.id, handle.path());
                self.asset = AssetSlot::Ready(handle);
                self.governor.invalidate();
            }
            RequestPoll::Failed(err) => {
                warn!("{}: {}, showing placeholder", self.id, err);
                self.asset = AssetSlot::Failed(err);
                self.governor.invalidate();
            }
        }
    }

    fn scene(&self) -> Option<&NormalizedScene> {
        match &self.asset {
            AssetSlot::Ready(handle) => Some(handle.normalized()),
            AssetSlot::Loading(_) | AssetSlot::Failed(_) => None,
        }
    }

    fn draw(&mut self, ctx: &FrameContext, mode: RenderMode) {
        let camera = self.controller.camera();
        let settings = self.config.quality.for_mode(self.interactive);
        let scene = match &self.asset {
            AssetSlot::Ready(handle) => Some(handle.normalized()),
            AssetSlot::Loading(_) | AssetSlot::Failed(_) => None,
        };
        let frame = Frame {
            viewer: self.id,
            frame: ctx.frame,
            mode,
            camera: camera.state(),
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            scene,
            lighting: &self.config.lighting,
            viewport: camera.viewport,
            settings,
        };
        self.surface.draw(&frame);
        self.frames_drawn += 1;
    }
}

impl FrameCallback for ViewerState {
    fn on_frame(&mut self, ctx: &FrameContext) -> FrameOutcome {
        self.poll_asset();

        let decision = self
            .governor
            .decide(ctx.now, self.interactive, self.controller.is_animating());
        self.last_mode = decision.mode;
        if !decision.render {
            return FrameOutcome {
                mode: decision.mode,
                rendered: false,
            };
        }

        let (moved, event) = self.controller.step();
        if let Some(TransitionEvent::Converged { frames }) = event {
            debug!("{}: back in preview after {} frames", self.id, frames);
        }

        self.draw(ctx, decision.mode);
        self.governor.frame_rendered(ctx.now);
        // orbit momentum keeps drawing until the camera comes to rest
        if moved {
            self.governor.invalidate();
        }

        FrameOutcome {
            mode: decision.mode,
            rendered: true,
        }
    }
}

impl Drop for ViewerState {
    fn drop(&mut self) {
        self.surface.release();
        debug!("{} released after {} frames", self.id, self.frames_drawn);
    }
}

/// One preview viewer on the page
pub struct ViewerInstance {
    state: Rc<RefCell<ViewerState>>,
    _registration: FrameRegistration,
}

impl ViewerInstance {
    /// Request the asset and join the frame loop
    pub fn new(
        scheduler: &mut FrameScheduler,
        cache: &AssetCache,
        options: ViewerOptions,
        config: &ViewerConfig,
        surface: Box<dyn RenderSurface>,
    ) -> Self {
        let state = Rc::new(RefCell::new(ViewerState::new(cache, options, config, surface)));
        let registration = scheduler.register(&state);
        Self {
            state,
            _registration: registration,
        }
    }

    pub fn id(&self) -> ViewerId {
        self.state.borrow().id
    }

    pub fn source(&self) -> String {
        self.state.borrow().source.clone()
    }

    /// Switch between preview and interactive mode
    pub fn set_interactive(&self, interactive: bool) {
        self.state.borrow_mut().set_interactive(interactive, Instant::now());
    }

    /// [`set_interactive`](Self::set_interactive) with an explicit clock
    pub fn set_interactive_at(&self, interactive: bool, now: Instant) {
        self.state.borrow_mut().set_interactive(interactive, now);
    }

    pub fn is_interactive(&self) -> bool {
        self.state.borrow().interactive
    }

    /// Pointer drag in pixels; dropped unless orbit controls are live
    pub fn orbit(&self, dx: f32, dy: f32) -> bool {
        let mut state = self.state.borrow_mut();
        let height = state.controller.camera().viewport.height;
        let accepted = state
            .controller
            .controls_mut()
            .map_or(false, |controls| controls.rotate_by_pixels(dx, dy, height));
        if accepted {
            state.governor.invalidate();
        }
        accepted
    }

    /// Wheel steps, positive zooms in; dropped unless orbit controls are live
    pub fn zoom(&self, steps: f32) -> bool {
        let mut state = self.state.borrow_mut();
        let accepted = state
            .controller
            .controls_mut()
            .map_or(false, |controls| controls.zoom(steps));
        if accepted {
            state.governor.invalidate();
        }
        accepted
    }

    /// New drawing region; an empty one hides the viewer
    pub fn resize(&self, viewport: Viewport) {
        let mut state = self.state.borrow_mut();
        state.controller.set_viewport(viewport);
        state.governor.set_visible(!viewport.is_empty());
        state.governor.invalidate();
    }

    /// Report whether the region is on screen
    pub fn set_visible(&self, visible: bool) {
        self.state.borrow_mut().governor.set_visible(visible);
    }

    /// Draw one more frame in on-demand mode
    pub fn request_redraw(&self) {
        self.state.borrow_mut().governor.invalidate();
    }

    pub fn camera_state(&self) -> CameraState {
        self.state.borrow().controller.camera().state()
    }

    pub fn transition_state(&self) -> TransitionState {
        self.state.borrow().controller.state()
    }

    /// Mode chosen for the most recent frame
    pub fn render_mode(&self) -> RenderMode {
        self.state.borrow().last_mode
    }

    /// `None` when no orbit controls are attached
    pub fn controls_enabled(&self) -> Option<bool> {
        self.state
            .borrow()
            .controller
            .controls()
            .map(OrbitControls::is_enabled)
    }

    pub fn asset_status(&self) -> AssetStatus {
        match self.state.borrow().asset {
            AssetSlot::Loading(_) => AssetStatus::Loading,
            AssetSlot::Ready(_) => AssetStatus::Ready,
            AssetSlot::Failed(_) => AssetStatus::Failed,
        }
    }

    /// The shared asset, once loaded
    pub fn asset(&self) -> Option<AssetHandle> {
        match &self.state.borrow().asset {
            AssetSlot::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Scale and translation applied to the asset, once loaded
    pub fn normalization(&self) -> Option<(f32, maquette_core::Vector3f)> {
        let state = self.state.borrow();
        state.scene().map(|scene| (scene.scale, scene.translation))
    }

    pub fn frames_drawn(&self) -> u64 {
        self.state.borrow().frames_drawn
    }
}

impl fmt::Debug for ViewerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ViewerInstance")
            .field("id", &state.id)
            .field("source", &state.source)
            .field("interactive", &state.interactive)
            .field("transition", &state.controller.state())
            .finish()
    }
}
