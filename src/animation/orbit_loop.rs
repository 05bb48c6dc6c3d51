use super::{
    keyframes::synthesize,
    pose::{sample, Keyframe, Pose},
};
use crate::config::{ConfigurationError, OrbitConfig};
use std::time::{Duration, Instant};

/// The keyframes and period a loop runs with.
#[derive(Clone, Debug, PartialEq)]
struct LoopSpec {
    keyframes: Vec<Keyframe>,
    period: Duration,
}

impl LoopSpec {
    fn new(config: &OrbitConfig) -> Result<Self, ConfigurationError> {
        let keyframes = synthesize(
            config.rotation_axis,
            config.tilt_x,
            config.tilt_y,
            0.0,
            360.0,
            config.accent_color,
        )?;
        Ok(Self { keyframes, period: config.normal_period_duration() })
    }
}

/// Where the loop's clock was at the last rate change.
///
/// The loop's current time is always computed from this anchor, so changing the playback rate
/// any number of times never accumulates drift.
#[derive(Clone, Copy, Debug)]
struct Playback {
    anchored_at: Instant,
    // seconds of loop time elapsed when anchored
    offset: f64,
    rate: f64,
}

impl Playback {
    fn starting(now: Instant) -> Self {
        Self { anchored_at: now, offset: 0.0, rate: 1.0 }
    }

    fn current_time(&self, now: Instant) -> f64 {
        self.offset + now.saturating_duration_since(self.anchored_at).as_secs_f64() * self.rate
    }
}

/// The infinite rotation the ring performs while idle.
#[derive(Debug)]
pub struct OrbitLoop {
    active: LoopSpec,
    staged: LoopSpec,
    playback: Option<Playback>,
}

impl OrbitLoop {
    /// Build a stopped loop for `config`.
    pub fn new(config: &OrbitConfig) -> Result<Self, ConfigurationError> {
        let spec = LoopSpec::new(config)?;
        Ok(Self { active: spec.clone(), staged: spec, playback: None })
    }

    /// Start looping with `config`.
    ///
    /// Starting an already running loop with the configuration it runs with is a no-op, anything
    /// else restarts it at phase 0.
    pub fn start(&mut self, config: &OrbitConfig, now: Instant) -> Result<(), ConfigurationError> {
        let spec = LoopSpec::new(config)?;
        if self.is_running() && spec == self.active {
            return Ok(());
        }
        self.staged = spec.clone();
        self.active = spec;
        self.playback = Some(Playback::starting(now));
        Ok(())
    }

    /// Prepare the keyframes and period the next [OrbitLoop::restart] uses.
    ///
    /// A running loop keeps turning with its current keyframes.
    pub fn stage(&mut self, config: &OrbitConfig) -> Result<(), ConfigurationError> {
        self.staged = LoopSpec::new(config)?;
        Ok(())
    }

    /// Re-enter the loop at phase 0 and normal speed, picking up any staged configuration.
    pub fn restart(&mut self, now: Instant) {
        self.active = self.staged.clone();
        self.playback = Some(Playback::starting(now));
    }

    /// Stop the loop. Safe to call when it's not running.
    pub fn cancel(&mut self) {
        self.playback = None;
    }

    pub fn is_running(&self) -> bool {
        self.playback.is_some()
    }

    /// The fraction of a turn completed at `now`, in `[0, 1)`. A stopped loop reports 0.
    pub fn current_phase(&self, now: Instant) -> f64 {
        let Some(playback) = &self.playback else {
            return 0.0;
        };
        let phase = (playback.current_time(now) / self.active.period.as_secs_f64()).rem_euclid(1.0);
        // rem_euclid can round up to exactly 1 for tiny negative inputs
        if phase >= 1.0 { 0.0 } else { phase }
    }

    /// The pose the loop shows at `now`.
    pub fn pose_at(&self, now: Instant) -> Pose {
        sample(&self.active.keyframes, self.current_phase(now))
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback.map(|p| p.rate).unwrap_or(1.0)
    }

    /// Change how fast loop time advances relative to wall-clock time.
    ///
    /// The loop's current time is preserved at `now`, so the ring never jumps.
    pub fn set_playback_rate(&mut self, rate: f64, now: Instant) {
        if !rate.is_finite() {
            log::warn!("ignoring non-finite playback rate {rate}");
            return;
        }
        if let Some(playback) = &mut self.playback {
            let offset = playback.current_time(now);
            *playback = Playback { anchored_at: now, offset, rate };
        }
    }

    pub fn period(&self) -> Duration {
        self.active.period
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.active.keyframes
    }
}
