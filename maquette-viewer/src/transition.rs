//! Camera return-to-preview transitions
//!
//! A viewer leaving interactive mode animates its camera back to the preview
//! state, one smoothing step per rendered frame, while its orbit controls are
//! held disabled. Exactly one of the two writes the camera at any time: the
//! controls while idle, the animation while animating.

use log::debug;

use crate::camera::{CameraState, OrthographicCamera, Viewport};
use crate::config::{CameraConfig, TransitionConfig};
use crate::orbit::OrbitControls;

/// A change of the interactive flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Opened,
    Closed,
}

/// Turns a stream of interactive flags into edges.
///
/// The value the detector is created with counts as already observed, so a
/// viewer created in preview mode never reports a close.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    last: bool,
}

impl EdgeDetector {
    pub fn new(initial: bool) -> Self {
        Self { last: initial }
    }

    pub fn observe(&mut self, value: bool) -> Option<Edge> {
        let edge = match (self.last, value) {
            (false, true) => Some(Edge::Opened),
            (true, false) => Some(Edge::Closed),
            _ => None,
        };
        self.last = value;
        edge
    }

    pub fn current(&self) -> bool {
        self.last
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    Idle,
    AnimatingToPreview { frames: u32 },
}

/// Reported by [`CameraTransitionController`] when its state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEvent {
    /// A close edge started the return animation
    Started,
    /// The viewer was reopened mid-animation; the camera stays where it was
    Superseded,
    /// The camera reached the preview state and was snapped onto it
    Converged { frames: u32 },
}

pub struct CameraTransitionController {
    camera: OrthographicCamera,
    preview: CameraState,
    config: TransitionConfig,
    state: TransitionState,
    edges: EdgeDetector,
    controls: Option<OrbitControls>,
}

impl CameraTransitionController {
    /// A controller whose camera starts in the preview state
    pub fn new(
        camera: &CameraConfig,
        config: TransitionConfig,
        interactive: bool,
        viewport: Viewport,
    ) -> Self {
        let preview = CameraState::preview(camera);
        Self {
            camera: OrthographicCamera::new(preview, camera, viewport),
            preview,
            config,
            state: TransitionState::Idle,
            edges: EdgeDetector::new(interactive),
            controls: None,
        }
    }

    pub fn camera(&self) -> &OrthographicCamera {
        &self.camera
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.camera.viewport = viewport;
    }

    pub fn state(&self) -> TransitionState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state, TransitionState::AnimatingToPreview { .. })
    }

    pub fn preview_state(&self) -> &CameraState {
        &self.preview
    }

    /// Feed the current interactive flag
    pub fn set_interactive(&mut self, interactive: bool) -> Option<TransitionEvent> {
        match self.edges.observe(interactive)? {
            Edge::Closed => {
                self.state = TransitionState::AnimatingToPreview { frames: 0 };
                if let Some(controls) = self.controls.as_mut() {
                    controls.set_enabled(false);
                }
                debug!(
                    "returning to preview from {:?} zoom {}",
                    self.camera.position, self.camera.zoom
                );
                Some(TransitionEvent::Started)
            }
            Edge::Opened => {
                if !self.is_animating() {
                    return None;
                }
                self.state = TransitionState::Idle;
                if let Some(controls) = self.controls.as_mut() {
                    controls.set_enabled(true);
                }
                debug!("return to preview superseded at {:?}", self.camera.position);
                Some(TransitionEvent::Superseded)
            }
        }
    }

    /// Hand the camera to orbit controls. They start disabled while animating.
    pub fn attach_controls(&mut self, mut controls: OrbitControls) {
        controls.set_enabled(!self.is_animating());
        self.controls = Some(controls);
    }

    pub fn detach_controls(&mut self) -> Option<OrbitControls> {
        self.controls.take()
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.controls.as_ref()
    }

    pub fn controls_mut(&mut self) -> Option<&mut OrbitControls> {
        self.controls.as_mut()
    }

    /// Advance by one rendered frame.
    ///
    /// Returns whether the camera moved, and the event if the state changed.
    pub fn step(&mut self) -> (bool, Option<TransitionEvent>) {
        let frames = match self.state {
            TransitionState::Idle => {
                let moved = match self.controls.as_mut() {
                    Some(controls) => controls.update(&mut self.camera),
                    None => false,
                };
                return (moved, None);
            }
            TransitionState::AnimatingToPreview { frames } => frames + 1,
        };

        let mut state = self.camera.state();
        state.lerp_towards(&self.preview, self.config.smoothing);
        self.camera.set_state(&state);

        if state.is_within(&self.preview, self.config.position_epsilon, self.config.zoom_epsilon) {
            self.camera.set_state(&self.preview);
            if let Some(controls) = self.controls.as_mut() {
                controls.reset(&mut self.camera);
                controls.set_enabled(true);
            }
            self.state = TransitionState::Idle;
            debug!("camera back in preview after {} frames", frames);
            return (true, Some(TransitionEvent::Converged { frames }));
        }

        self.state = TransitionState::AnimatingToPreview { frames };
        (true, None)
    }
}
