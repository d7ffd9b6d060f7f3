//! Dirty-flag driven frame loop.
//!
//! The host delivers display-refresh callbacks through a [`FrameSource`].
//! Each callback advances the camera one damping step and renders only when
//! something changed. A frame is pending exactly while the loop runs;
//! stopping cancels it, and a callback carrying a stale handle is ignored.

use std::collections::VecDeque;

use web_time::Instant;

use crate::error::ViewerError;
use crate::util::frame_timing::FrameTiming;

/// Identifies one requested display-refresh callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Handle with a source-assigned id.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Source-assigned id.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Host that delivers display-refresh callbacks.
pub trait FrameSource {
    /// Ask for one callback before the next repaint.
    fn request_frame(&mut self) -> FrameHandle;

    /// Revoke a requested callback. Unknown handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// What the scheduler drives on each tick.
pub trait FrameTarget {
    /// Advance time-dependent state by `dt` seconds. Returns `true` when
    /// the view changed and needs a render.
    fn advance(&mut self, dt: f32) -> bool;

    /// Render the current state.
    ///
    /// # Errors
    ///
    /// Any backend failure; the scheduler halts on it.
    fn render_frame(&mut self) -> Result<(), ViewerError>;
}

/// Result of one [`FrameScheduler::on_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The handle was not the pending one; nothing happened.
    Revoked,
    /// Nothing changed, so nothing was rendered.
    Idle,
    /// A frame was rendered.
    Rendered,
    /// A render was due but the target FPS deferred it.
    Throttled,
}

/// Frame loop state: pending handle, dirty flag, halt flag and timing.
pub struct FrameScheduler<S: FrameSource> {
    source: S,
    pending: Option<FrameHandle>,
    dirty: bool,
    halted: bool,
    timing: FrameTiming,
    renders: u64,
}

impl<S: FrameSource> FrameScheduler<S> {
    /// Idle scheduler over `source`. `target_fps == 0` renders on every
    /// dirty tick.
    #[must_use]
    pub fn new(source: S, target_fps: u32) -> Self {
        Self {
            source,
            pending: None,
            dirty: false,
            halted: false,
            timing: FrameTiming::new(target_fps),
            renders: 0,
        }
    }

    /// Begin ticking. Clears a previous halt; no-op while already running.
    pub fn start(&mut self) {
        if self.pending.is_some() {
            return;
        }
        if self.halted {
            log::info!("restarting frame loop after failure");
            self.halted = false;
        }
        self.timing.reset();
        self.pending = Some(self.source.request_frame());
    }

    /// Cancel the pending frame. Safe to call when not running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.source.cancel_frame(handle);
            log::debug!("frame loop stopped");
        }
    }

    /// Render on the next tick even if nothing moves.
    pub fn request_redraw(&mut self) {
        self.dirty = true;
    }

    /// Handle one display-refresh callback at the current time.
    ///
    /// # Errors
    ///
    /// The target's render error. The loop is halted when this happens.
    pub fn on_frame(
        &mut self,
        handle: FrameHandle,
        target: &mut impl FrameTarget,
    ) -> Result<TickOutcome, ViewerError> {
        self.on_frame_at(handle, Instant::now(), target)
    }

    /// [`on_frame`](Self::on_frame) with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// The target's render error. The loop is halted when this happens.
    pub fn on_frame_at(
        &mut self,
        handle: FrameHandle,
        now: Instant,
        target: &mut impl FrameTarget,
    ) -> Result<TickOutcome, ViewerError> {
        if self.pending != Some(handle) {
            log::trace!("ignoring revoked frame {}", handle.id());
            return Ok(TickOutcome::Revoked);
        }
        self.pending = None;

        let dt = self.timing.tick(now);
        if target.advance(dt) {
            self.dirty = true;
        }

        let outcome = if !self.dirty {
            TickOutcome::Idle
        } else if !self.timing.should_render(now) {
            TickOutcome::Throttled
        } else {
            if let Err(err) = target.render_frame() {
                self.halted = true;
                log::error!("rendering halted: {err}");
                return Err(err);
            }
            self.dirty = false;
            self.timing.end_frame(now);
            self.renders += 1;
            TickOutcome::Rendered
        };

        self.pending = Some(self.source.request_frame());
        Ok(outcome)
    }

    /// Whether a frame is pending.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the loop stopped on a render failure.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Whether the next tick will render.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The pending frame, if running.
    #[must_use]
    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Frames rendered since construction.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Smoothed frames per second over rendered frames.
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.timing.fps()
    }

    /// Change the FPS cap (0 = display refresh).
    pub fn set_target_fps(&mut self, target_fps: u32) {
        self.timing.set_target_fps(target_fps);
    }

    /// The frame source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the frame source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

/// Queue-backed frame source for headless hosts and tests.
///
/// Requested frames are queued until the host takes them with
/// [`next_frame`](Self::next_frame); cancelled frames are removed from the
/// queue.
#[derive(Debug, Default)]
pub struct ManualFrames {
    next_id: u64,
    queue: VecDeque<FrameHandle>,
}

impl ManualFrames {
    /// Empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest requested frame.
    pub fn next_frame(&mut self) -> Option<FrameHandle> {
        self.queue.pop_front()
    }

    /// Number of requested, uncancelled frames.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl FrameSource for ManualFrames {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.queue.push_back(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.queue.retain(|queued| *queued != handle);
    }
}
