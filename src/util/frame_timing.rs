//! Frame pacing: per-tick step size, render throttling and a smoothed FPS.

use web_time::{Duration, Instant};

/// Longest step fed to the simulation, so a stall does not turn into a
/// jump.
const MAX_FRAME_DT: f32 = 0.25;

/// Frame timing with FPS calculation and optional frame limiting.
///
/// Ticks (display refresh callbacks) and renders are tracked separately:
/// `dt` is measured between ticks, FPS and the frame limit between renders.
#[derive(Debug, Clone)]
pub struct FrameTiming {
    /// Target FPS (0 = unlimited)
    target_fps: u32,
    /// Minimum frame duration based on target FPS
    min_frame_duration: Duration,
    last_tick: Option<Instant>,
    last_render: Option<Instant>,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
}

impl FrameTiming {
    /// Create a new frame timer with the given FPS target (0 = unlimited).
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        Self {
            target_fps,
            min_frame_duration: min_frame_duration(target_fps),
            last_tick: None,
            last_render: None,
            smoothed_fps: 60.0,
            smoothing: 0.05,
        }
    }

    /// Change the FPS target (0 = unlimited).
    pub fn set_target_fps(&mut self, target_fps: u32) {
        self.target_fps = target_fps;
        self.min_frame_duration = min_frame_duration(target_fps);
    }

    /// FPS target (0 = unlimited).
    #[must_use]
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Forget the previous tick so time spent stopped is not stepped.
    pub fn reset(&mut self) {
        self.last_tick = None;
    }

    /// Record a tick and return the seconds since the previous one (zero for
    /// the first tick after a reset).
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = self.last_tick.map_or(0.0, |last| {
            now.saturating_duration_since(last).as_secs_f32()
        });
        self.last_tick = Some(now);
        dt.min(MAX_FRAME_DT)
    }

    /// Returns true if enough time has passed since the last render.
    #[must_use]
    pub fn should_render(&self, now: Instant) -> bool {
        if self.target_fps == 0 {
            return true;
        }
        self.last_render.is_none_or(|last| {
            now.saturating_duration_since(last) >= self.min_frame_duration
        })
    }

    /// Call after rendering to update timing.
    pub fn end_frame(&mut self, now: Instant) {
        if let Some(last) = self.last_render {
            let frame_time = now.saturating_duration_since(last).as_secs_f32();
            if frame_time > 0.0 {
                // Exponential moving average for smooth display
                self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                    + frame_time.recip() * self.smoothing;
            }
        }
        self.last_render = Some(now);
    }

    /// Get the current FPS (smoothed)
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

fn min_frame_duration(target_fps: u32) -> Duration {
    if target_fps > 0 {
        Duration::from_secs_f64(1.0 / f64::from(target_fps))
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_after_reset_has_no_dt() {
        let mut timing = FrameTiming::new(0);
        let t0 = Instant::now();
        assert_eq!(timing.tick(t0), 0.0);
        let dt = timing.tick(t0 + Duration::from_millis(20));
        assert!((dt - 0.02).abs() < 1e-4);

        timing.reset();
        assert_eq!(timing.tick(t0 + Duration::from_secs(5)), 0.0);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let mut timing = FrameTiming::new(0);
        let t0 = Instant::now();
        let _ = timing.tick(t0);
        assert_eq!(timing.tick(t0 + Duration::from_secs(3)), MAX_FRAME_DT);
    }

    #[test]
    fn target_fps_limits_renders() {
        let mut timing = FrameTiming::new(30);
        let t0 = Instant::now();
        assert!(timing.should_render(t0));
        timing.end_frame(t0);
        assert!(!timing.should_render(t0 + Duration::from_millis(16)));
        assert!(timing.should_render(t0 + Duration::from_millis(34)));

        timing.set_target_fps(0);
        assert!(timing.should_render(t0));
    }

    #[test]
    fn fps_tracks_render_interval() {
        let mut timing = FrameTiming::new(0);
        let t0 = Instant::now();
        for i in 0..200 {
            timing.end_frame(t0 + Duration::from_millis(i * 10));
        }
        assert!((timing.fps() - 100.0).abs() < 1.0);
    }
}
