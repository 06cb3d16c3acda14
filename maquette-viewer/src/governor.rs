//! Per-viewer render-loop policy
//!
//! Decides for every frame whether a viewer draws. Open viewers and viewers
//! still travelling back to the preview draw every frame; a settled preview
//! only draws after something invalidated it; a hidden idle preview draws
//! nothing at all.

use instant::Instant;
use log::debug;

use crate::config::GovernorConfig;
use crate::transition::Edge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Draw every frame
    Continuous,
    /// Draw only after an invalidation
    OnDemand,
    /// Draw nothing until visible again
    Paused,
}

/// What the governor decided for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecision {
    pub mode: RenderMode,
    pub render: bool,
}

#[derive(Debug, Clone)]
pub struct RenderLoopGovernor {
    config: GovernorConfig,
    first_frame_at: Option<Instant>,
    hold_until: Option<Instant>,
    visible: bool,
    invalidated: bool,
    last_mode: Option<RenderMode>,
}

impl RenderLoopGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            config,
            first_frame_at: None,
            hold_until: None,
            visible: true,
            invalidated: true,
            last_mode: None,
        }
    }

    /// React to an interactive edge observed at `now`
    pub fn on_edge(&mut self, edge: Edge, now: Instant) {
        match edge {
            Edge::Closed => {
                self.hold_until = Some(now + self.config.close_hold());
            }
            Edge::Opened => {
                self.hold_until = None;
                self.first_frame_at = None;
            }
        }
        self.invalidated = true;
    }

    /// Report whether the viewer can currently be seen
    pub fn set_visible(&mut self, visible: bool) {
        if visible && !self.visible {
            self.first_frame_at = None;
            self.invalidated = true;
        }
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Ask for one more frame in on-demand mode
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// The mode for a frame at `now`
    pub fn mode(&self, now: Instant, interactive: bool, animating: bool) -> RenderMode {
        if interactive || animating || self.is_holding(now) {
            RenderMode::Continuous
        } else if !self.visible {
            RenderMode::Paused
        } else if !self.is_settled(now) {
            RenderMode::Continuous
        } else {
            RenderMode::OnDemand
        }
    }

    /// Decide whether to draw the frame at `now`
    pub fn decide(&mut self, now: Instant, interactive: bool, animating: bool) -> FrameDecision {
        if self.hold_until.map_or(false, |until| now >= until) {
            self.hold_until = None;
        }
        let mode = self.mode(now, interactive, animating);
        if self.last_mode != Some(mode) {
            debug!("render mode {:?} -> {:?}", self.last_mode, mode);
            self.last_mode = Some(mode);
        }
        let render = match mode {
            RenderMode::Continuous => true,
            RenderMode::OnDemand => self.invalidated,
            RenderMode::Paused => false,
        };
        FrameDecision { mode, render }
    }

    /// Record a completed frame
    pub fn frame_rendered(&mut self, now: Instant) {
        if self.first_frame_at.is_none() {
            self.first_frame_at = Some(now);
        }
        self.invalidated = false;
    }

    pub fn first_frame_at(&self) -> Option<Instant> {
        self.first_frame_at
    }

    fn is_holding(&self, now: Instant) -> bool {
        self.hold_until.map_or(false, |until| now < until)
    }

    fn is_settled(&self, now: Instant) -> bool {
        self.first_frame_at
            .map_or(false, |first| now.duration_since(first) >= self.config.settle_delay())
    }
}

impl Default for RenderLoopGovernor {
    fn default() -> Self {
        Self::new(GovernorConfig::default())
    }
}
