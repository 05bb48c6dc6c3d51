use super::{
    easing::Easing,
    pose::{sample, Keyframe, Pose},
};
use std::time::{Duration, Instant};

/// A finite keyframe animation that holds its last pose once it ends.
#[derive(Clone, Debug)]
pub struct Timeline {
    keyframes: Vec<Keyframe>,
    duration: Duration,
    easing: Easing,
    started_at: Instant,
}

impl Timeline {
    pub fn new(keyframes: Vec<Keyframe>, duration: Duration, easing: Easing, started_at: Instant) -> Self {
        Self { keyframes, duration, easing, started_at }
    }

    /// The linear progress at `now`, clamped to `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// The pose this animation shows at `now`.
    pub fn pose_at(&self, now: Instant) -> Pose {
        let progress = self.easing.apply(self.progress(now));
        sample(&self.keyframes, progress)
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        now >= self.ends_at()
    }

    /// The instant the last keyframe is reached.
    pub fn ends_at(&self) -> Instant {
        self.started_at + self.duration
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn first_pose(&self) -> Pose {
        self.keyframes.first().map(|k| k.pose).unwrap_or(Pose::FLAT)
    }

    pub fn last_pose(&self) -> Pose {
        self.keyframes.last().map(|k| k.pose).unwrap_or(Pose::FLAT)
    }
}
