use std::time::{Duration, Instant};

/// Frame clock. Headless runs use [`Time::fixed`] so every frame advances by the same delta.
pub struct Time {
    start: Instant,
    last: Instant,
    fixed: Option<Duration>,
    frames: u64,
    pub delta: Duration,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now, fixed: None, frames: 0, delta: Duration::from_secs_f32(0.0) }
    }

    pub fn fixed(delta_seconds: f32) -> Self {
        let step = Duration::from_secs_f32(delta_seconds.max(0.0));
        Self { fixed: Some(step), delta: step, ..Self::new() }
    }

    pub fn tick(&mut self) {
        self.frames += 1;
        match self.fixed {
            Some(step) => {
                self.delta = step;
                self.last += step;
            }
            None => {
                let now = Instant::now();
                self.delta = now - self.last;
                self.last = now;
            }
        }
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
