use super::{easing::Easing, orbit_loop::OrbitLoop};
use std::time::{Duration, Instant};

/// How long a hover speed change takes.
pub const VELOCITY_RAMP_DURATION: Duration = Duration::from_millis(600);

#[derive(Clone, Copy, Debug)]
struct Ramp {
    from: f64,
    to: f64,
    started_at: Instant,
    duration: Duration,
}

/// Eases a running loop's playback rate towards a target.
#[derive(Debug, Default)]
pub struct VelocityRamp {
    active: Option<Ramp>,
}

impl VelocityRamp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start easing `orbit`'s playback rate to `to` over `duration`.
    ///
    /// The ramp always starts from the rate the loop has at `now`: if a previous ramp is still in
    /// flight it is superseded at the rate it had reached, never at its original starting rate.
    pub fn ramp(&mut self, orbit: &mut OrbitLoop, to: f64, duration: Duration, now: Instant) {
        // commit whatever the superseded ramp reached by now
        self.tick(orbit, now);
        let from = orbit.playback_rate();
        log::trace!("ramping playback rate {from:.3} -> {to:.3} over {duration:?}");
        self.active = Some(Ramp { from, to, started_at: now, duration });
        self.tick(orbit, now);
    }

    /// Apply the rate for `now`. Returns whether the ramp is still running afterwards.
    pub fn tick(&mut self, orbit: &mut OrbitLoop, now: Instant) -> bool {
        let Some(ramp) = self.active else {
            return false;
        };
        let fraction = if ramp.duration.is_zero() {
            1.0
        } else {
            now.saturating_duration_since(ramp.started_at).as_secs_f64() / ramp.duration.as_secs_f64()
        };
        if fraction >= 1.0 {
            orbit.set_playback_rate(ramp.to, now);
            self.active = None;
            return false;
        }
        let eased = Easing::EaseInOutCubic.apply(fraction);
        orbit.set_playback_rate(ramp.from + (ramp.to - ramp.from) * eased, now);
        true
    }

    /// Stop ramping, leaving the loop at whatever rate it currently has.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The rate the in-flight ramp is heading to, if any.
    pub fn target(&self) -> Option<f64> {
        self.active.map(|ramp| ramp.to)
    }

    /// The rate the in-flight ramp started from, if any.
    pub fn from_rate(&self) -> Option<f64> {
        self.active.map(|ramp| ramp.from)
    }
}
