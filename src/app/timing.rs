use std::time::{Duration, Instant};
use winit::window::Window;

/// Frame clock: elapsed time since start drives the light orbit; the fps
/// readout goes into the window title twice a second.
pub struct FrameTiming {
    start: Instant,
    last_frame_time: Option<Instant>,
    last_fps_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        let now = Instant::now();
        Self::starting_at(base_title, now)
    }

    fn starting_at(base_title: String, now: Instant) -> Self {
        Self {
            start: now,
            last_frame_time: None,
            last_fps_time: now,
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            base_title,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// Returns the fps measured over the last window, when one closed.
    pub fn update(&mut self, window: Option<&Window>, now: Instant) -> Option<f32> {
        let dt = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::from_millis(16),
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt.as_secs_f32();

        self.frame_count = self.frame_count.saturating_add(1);
        let window_span = now.saturating_duration_since(self.last_fps_time);
        if window_span.as_secs_f32() < 0.5 {
            return None;
        }
        let fps = self.frame_count as f32 / window_span.as_secs_f32();
        if let Some(window) = window {
            window.set_title(&format!(
                "{} - {:.1} fps ({:.2} ms)",
                self.base_title,
                fps,
                self.frame_dt * 1000.0
            ));
        }
        self.frame_count = 0;
        self.last_fps_time = now;
        Some(fps)
    }
}
