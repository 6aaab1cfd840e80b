// Frame timing for camera movement and the panel's frame counter

use std::time::{Duration, Instant};

/// Longest step handed to the camera. A stall (window drag, breakpoint)
/// must not carry it through a wall.
const MAX_STEP: Duration = Duration::from_millis(250);
/// Shortest step, keeping the frame rate finite.
const MIN_STEP: Duration = Duration::from_micros(100);
/// Weight of the newest frame in the smoothed frame rate.
const FPS_SMOOTHING: f32 = 0.1;

#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous frame.
    pub dt: f32,
    pub frame_index: u64,
    /// Smoothed frames per second, steadier than `1 / dt` for display.
    pub fps: f32,
}

#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frames: u64,
    fps: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    /// Restarts timing so the first frame does not include startup time.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        self.step(elapsed)
    }

    fn step(&mut self, elapsed: Duration) -> FrameTime {
        let dt = elapsed.clamp(MIN_STEP, MAX_STEP).as_secs_f32();
        let rate = 1.0 / dt;
        self.fps = if self.frames == 0 {
            rate
        } else {
            self.fps + (rate - self.fps) * FPS_SMOOTHING
        };

        let time = FrameTime {
            dt,
            frame_index: self.frames,
            fps: self.fps,
        };
        self.frames += 1;
        time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn steps_are_clamped_and_counted() {
        let mut clock = FrameClock::new();
        let stall = clock.step(Duration::from_secs(3));
        assert_eq!(stall.frame_index, 0);
        assert_relative_eq!(stall.dt, 0.25);

        let spin = clock.step(Duration::ZERO);
        assert_eq!(spin.frame_index, 1);
        assert_relative_eq!(spin.dt, 0.0001, epsilon = 1e-7);
        assert!(spin.fps.is_finite());
    }

    #[test]
    fn frame_rate_is_smoothed() {
        let mut clock = FrameClock::new();
        let first = clock.step(Duration::from_millis(10));
        assert_relative_eq!(first.fps, 100.0, epsilon = 1e-2);

        // a single slow frame only pulls the average part of the way
        let slow = clock.step(Duration::from_millis(20));
        assert_relative_eq!(slow.fps, 95.0, epsilon = 1e-2);
    }

    #[test]
    fn tick_measures_real_time() {
        let mut clock = FrameClock::new();
        clock.reset();
        std::thread::sleep(Duration::from_millis(5));
        let time = clock.tick();
        assert!(time.dt >= 0.005 && time.dt <= 0.25, "dt = {}", time.dt);
    }
}
