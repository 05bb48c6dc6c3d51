use super::easing::Easing;
use std::time::{Duration, Instant};

/// The azimuth offsets a wobble cycle passes through, in degrees.
const WOBBLE_STOPS: [f64; 5] = [0.0, 3.0, 0.0, -3.0, 0.0];

/// A slow precession of the ring around its azimuth, independent of the orbit itself.
#[derive(Clone, Debug)]
pub struct WobbleLoop {
    period: Duration,
    started_at: Instant,
}

impl WobbleLoop {
    pub fn new(period: Duration, started_at: Instant) -> Self {
        Self { period, started_at }
    }

    /// The azimuth offset at `now`, in degrees.
    pub fn azimuth_at(&self, now: Instant) -> f64 {
        if self.period.is_zero() {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        let phase = (elapsed / self.period.as_secs_f64()).fract();
        let segments = (WOBBLE_STOPS.len() - 1) as f64;
        let position = phase * segments;
        let index = (position.floor() as usize).min(WOBBLE_STOPS.len() - 2);
        // every stop is eased into and out of, like CSS per-keyframe easing
        let t = Easing::EaseInOut.apply(position - index as f64);
        let (from, to) = (WOBBLE_STOPS[index], WOBBLE_STOPS[index + 1]);
        from + (to - from) * t
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_stops() {
        let now = Instant::now();
        let wobble = WobbleLoop::new(Duration::from_secs(4), now);
        assert_eq!(wobble.azimuth_at(now), 0.0);
        assert!((wobble.azimuth_at(now + Duration::from_secs(1)) - 3.0).abs() < 1e-9);
        assert!((wobble.azimuth_at(now + Duration::from_secs(2))).abs() < 1e-9);
        assert!((wobble.azimuth_at(now + Duration::from_secs(3)) + 3.0).abs() < 1e-9);
        assert!((wobble.azimuth_at(now + Duration::from_secs(4))).abs() < 1e-9);
    }

    #[test]
    fn stays_within_amplitude() {
        let now = Instant::now();
        let wobble = WobbleLoop::new(Duration::from_secs(6), now);
        for step in 0..600 {
            let azimuth = wobble.azimuth_at(now + Duration::from_millis(step * 17));
            assert!(azimuth.abs() <= 3.0 + 1e-9);
        }
    }

    #[test]
    fn zero_period() {
        let now = Instant::now();
        let wobble = WobbleLoop::new(Duration::ZERO, now);
        assert_eq!(wobble.azimuth_at(now + Duration::from_secs(1)), 0.0);
    }
}
