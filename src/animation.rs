use std::time::Instant;

use glam::Mat4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalaxySpin {
    pub radians_per_second: f32,
}

impl Default for GalaxySpin {
    fn default() -> Self {
        // One full turn every 70·2π seconds, clockwise seen from above.
        Self {
            radians_per_second: -1.0 / 70.0,
        }
    }
}

impl GalaxySpin {
    pub fn angle_at(self, elapsed_seconds: f32) -> f32 {
        elapsed_seconds.max(0.0) * self.radians_per_second
    }

    pub fn model_matrix(self, elapsed_seconds: f32) -> Mat4 {
        Mat4::from_rotation_y(self.angle_at(elapsed_seconds))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
    last_frame: Instant,
    smoothed_frame_seconds: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            smoothed_frame_seconds: 1.0 / 60.0,
        }
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Records a frame boundary and returns seconds since the previous one.
    pub fn mark_frame(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.smoothed_frame_seconds += (dt - self.smoothed_frame_seconds) * 0.1;
        dt
    }

    pub fn frames_per_second(&self) -> f32 {
        if self.smoothed_frame_seconds <= f32::EPSILON {
            0.0
        } else {
            self.smoothed_frame_seconds.recip()
        }
    }
}
