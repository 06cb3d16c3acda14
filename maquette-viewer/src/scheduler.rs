//! Shared frame loop
//!
//! The host drives one [`FrameScheduler`] per UI thread and calls
//! [`tick`](FrameScheduler::tick) once per display frame. Viewers register a
//! callback and keep the returned [`FrameRegistration`]; dropping it takes the
//! viewer out of the loop.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use instant::Instant;
use log::trace;

use crate::governor::RenderMode;

/// Passed to every callback in one tick
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub now: Instant,
    /// Number of ticks before this one
    pub frame: u64,
}

/// What a callback did with its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub mode: RenderMode,
    pub rendered: bool,
}

pub trait FrameCallback {
    fn on_frame(&mut self, ctx: &FrameContext) -> FrameOutcome;
}

/// Summary of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub rendered: usize,
    pub skipped: usize,
    /// Viewers in continuous mode
    pub continuous: usize,
}

impl TickReport {
    /// True when some viewer wants the next frame without waiting for an event
    pub fn wants_next_frame(&self) -> bool {
        self.continuous > 0
    }
}

struct Entry {
    callback: Weak<RefCell<dyn FrameCallback>>,
    active: Rc<Cell<bool>>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.active.get() && self.callback.strong_count() > 0
    }
}

/// Keeps a callback registered; deregisters it on drop
#[derive(Debug)]
pub struct FrameRegistration {
    active: Rc<Cell<bool>>,
}

impl FrameRegistration {
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for FrameRegistration {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

#[derive(Default)]
pub struct FrameScheduler {
    entries: Vec<Entry>,
    frame: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`. The scheduler only holds it weakly.
    pub fn register<C: FrameCallback + 'static>(&mut self, callback: &Rc<RefCell<C>>) -> FrameRegistration {
        let callback: Weak<RefCell<C>> = Rc::downgrade(callback);
        let callback: Weak<RefCell<dyn FrameCallback>> = callback;
        let active = Rc::new(Cell::new(true));
        self.entries.push(Entry {
            callback,
            active: Rc::clone(&active),
        });
        FrameRegistration { active }
    }

    /// Live registrations
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Run one frame for every registered callback
    pub fn tick(&mut self, now: Instant) -> TickReport {
        self.entries.retain(Entry::is_live);

        let ctx = FrameContext {
            now,
            frame: self.frame,
        };
        let mut report = TickReport::default();
        for entry in &self.entries {
            let Some(cell) = entry.callback.upgrade() else {
                continue;
            };
            // a callback already borrowed is inside a re-entrant call and sits this frame out
            let Ok(mut callback) = cell.try_borrow_mut() else {
                report.skipped += 1;
                continue;
            };
            let outcome = callback.on_frame(&ctx);
            if outcome.rendered {
                report.rendered += 1;
            } else {
                report.skipped += 1;
            }
            if outcome.mode == RenderMode::Continuous {
                report.continuous += 1;
            }
        }
        trace!("frame {}: {:?}", self.frame, report);
        self.frame += 1;
        report
    }
}
