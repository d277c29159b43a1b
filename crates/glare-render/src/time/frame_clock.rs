use std::time::{Duration, Instant};

/// One tick of a [`FrameClock`].
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Scaled seconds since the previous tick, after clamping.
    pub dt: f32,
    /// Scaled seconds accumulated since the clock started.
    pub elapsed: f64,
    pub frame_index: u64,
}

/// Per-window frame timer.
///
/// The raw delta is clamped before scaling so a stall (debugger, minimized
/// window) advances animations by at most `max_dt`.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f64,
    frame_index: u64,
    min_dt: Duration,
    max_dt: Duration,
    time_scale: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(min_dt: Duration, max_dt: Duration) -> Self {
        debug_assert!(min_dt <= max_dt);
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            frame_index: 0,
            min_dt,
            max_dt,
            time_scale: 1.0,
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Multiplies every following delta. Zero freezes time.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Restarts delta measurement from now, e.g. after a surface reconfigure.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let raw = now
            .saturating_duration_since(self.last)
            .clamp(self.min_dt, self.max_dt);
        self.last = now;

        let dt = raw.as_secs_f32() * self.time_scale;
        self.elapsed += f64::from(dt);

        let time = FrameTime {
            dt,
            elapsed: self.elapsed,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
