//! Frame timing.

use instant::{Duration, Instant};

/// Measures the time between consecutive frames.
#[derive(Clone, Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
    elapsed: Duration,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Default::default()
    }

    /// Seconds since the previous tick. The first tick returns zero.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let delta = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        self.elapsed += delta;
        self.frames += 1;
        delta.as_secs_f32()
    }

    /// Time accumulated over all ticks.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_has_no_delta() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(Instant::now()), 0.0);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn delta_is_time_since_last_tick() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.tick(start);
        let dt = clock.tick(start + Duration::from_millis(250));
        assert!((dt - 0.25).abs() < 1e-6);
        let dt = clock.tick(start + Duration::from_millis(300));
        assert!((dt - 0.05).abs() < 1e-6);
        assert_eq!(clock.elapsed(), Duration::from_millis(300));
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.tick(start + Duration::from_secs(1));
        assert_eq!(clock.tick(start), 0.0);
    }
}
