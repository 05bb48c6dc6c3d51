use crate::{
    animation::{synthesize, Easing, Pose, Timeline, WobbleLoop},
    config::{AccentColor, ConfigurationError, HoverStrategy, OrbitConfig, OrbitConfigPatch, RotationAxis},
    engine::{EnginePhase, HoverTransitionEngine},
};
use serde::Serialize;
use std::time::{Duration, Instant};

/// How long the reduced motion nudge takes.
pub const NUDGE_DURATION: Duration = Duration::from_millis(300);

/// How far the reduced motion nudge turns the ring while hovered, in degrees.
pub const NUDGE_ANGLE: f64 = 45.0;

/// Whether the host allows continuous motion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MotionPreference {
    #[default]
    Full,
    Reduced,
}

/// Everything a host needs to draw one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Frame {
    pub pose: Pose,
    /// The wobble's rotation of the whole ring around the viewing axis, in degrees.
    pub azimuth: f64,
}

/// Reduced motion: nothing loops, hover only turns the ring a little on its Z axis.
#[derive(Debug)]
struct Nudge {
    config: OrbitConfig,
    hovered: bool,
    timeline: Option<Timeline>,
    torn_down: bool,
}

impl Nudge {
    fn set_hover(&mut self, active: bool, now: Instant) -> Result<(), ConfigurationError> {
        if self.torn_down || active == self.hovered {
            log::debug!("hover already {active}, ignoring");
            return Ok(());
        }
        self.hovered = active;
        let from = self.pose_at(now).rotate_z;
        let to = if active { NUDGE_ANGLE } else { 0.0 };
        let keyframes = synthesize(RotationAxis::Z, 0.0, 0.0, from, to, self.config.accent_color)?;
        self.timeline = Some(Timeline::new(keyframes, NUDGE_DURATION, Easing::EaseOut, now));
        Ok(())
    }

    fn pose_at(&self, now: Instant) -> Pose {
        self.timeline.as_ref().map(|timeline| timeline.pose_at(now)).unwrap_or(Pose::FLAT)
    }
}

#[derive(Debug)]
enum Driver {
    Engine(HoverTransitionEngine),
    Nudge(Nudge),
}

/// One animated orbit ring.
///
/// This is what hosts hold on to: it forwards hover changes to the hover state machine, or to
/// the reduced motion nudge when motion is reduced, and adds the optional wobble on top.
#[derive(Debug)]
pub struct OrbitRing {
    driver: Driver,
    motion: MotionPreference,
    wobble: Option<WobbleLoop>,
    destroyed: bool,
}

impl OrbitRing {
    /// Construct a ring with full motion, starting now.
    pub fn new(config: OrbitConfig) -> Result<Self, ConfigurationError> {
        Self::construct(config, MotionPreference::Full, Instant::now())
    }

    /// Construct a ring whose clock starts at `now`.
    pub fn construct(config: OrbitConfig, motion: MotionPreference, now: Instant) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let wobble = Self::make_wobble(&config, motion, now);
        let driver = match motion {
            MotionPreference::Full => Driver::Engine(HoverTransitionEngine::new(config, now)?),
            MotionPreference::Reduced => {
                Driver::Nudge(Nudge { config, hovered: false, timeline: None, torn_down: false })
            }
        };
        log::debug!("constructed ring with {motion:?} motion");
        Ok(Self { driver, motion, wobble, destroyed: false })
    }

    pub fn set_hover(&mut self, active: bool) -> Result<(), ConfigurationError> {
        self.set_hover_at(active, Instant::now())
    }

    pub fn set_hover_at(&mut self, active: bool, now: Instant) -> Result<(), ConfigurationError> {
        match &mut self.driver {
            Driver::Engine(engine) => engine.set_hover(active, now),
            Driver::Nudge(nudge) => nudge.set_hover(active, now),
        }
    }

    pub fn update_config(&mut self, patch: &OrbitConfigPatch) -> Result<(), ConfigurationError> {
        self.update_config_at(patch, Instant::now())
    }

    /// Merge `patch` into the configuration at `now`.
    ///
    /// Animations in flight keep going; the new values are used from the next one on. Turning
    /// the wobble on or changing its period restarts it at `now`.
    pub fn update_config_at(&mut self, patch: &OrbitConfigPatch, now: Instant) -> Result<(), ConfigurationError> {
        if self.destroyed {
            log::debug!("ignoring config update on a destroyed ring");
            return Ok(());
        }
        let previous = self.config().clone();
        match &mut self.driver {
            Driver::Engine(engine) => engine.update_config(patch)?,
            Driver::Nudge(nudge) => nudge.config = patch.apply(&nudge.config)?,
        }
        let config = self.config();
        if config.wobble != previous.wobble || config.wobble_period != previous.wobble_period {
            let wobble = Self::make_wobble(config, self.motion, now);
            self.wobble = wobble;
        }
        Ok(())
    }

    /// Stop every animation. Safe to call any number of times.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        match &mut self.driver {
            Driver::Engine(engine) => engine.destroy(),
            Driver::Nudge(nudge) => {
                nudge.timeline = None;
                nudge.torn_down = true;
            }
        }
        self.wobble = None;
        self.destroyed = true;
        log::debug!("ring destroyed");
    }

    pub fn current_pose(&self) -> Pose {
        self.pose_at(Instant::now())
    }

    pub fn pose_at(&self, now: Instant) -> Pose {
        match &self.driver {
            Driver::Engine(engine) => engine.current_pose(now),
            Driver::Nudge(nudge) => nudge.pose_at(now),
        }
    }

    /// Advance to `now` and return what to draw.
    pub fn tick(&mut self, now: Instant) -> Result<Frame, ConfigurationError> {
        let pose = match &mut self.driver {
            Driver::Engine(engine) => engine.tick(now)?,
            Driver::Nudge(nudge) => nudge.pose_at(now),
        };
        let azimuth = self.wobble.as_ref().map(|wobble| wobble.azimuth_at(now)).unwrap_or(0.0);
        Ok(Frame { pose, azimuth })
    }

    pub fn phase(&self) -> EnginePhase {
        match &self.driver {
            Driver::Engine(engine) => engine.phase(),
            Driver::Nudge(nudge) if nudge.torn_down => EnginePhase::Stopped,
            Driver::Nudge(_) => EnginePhase::Reduced,
        }
    }

    /// The rotation period the ring visibly runs at.
    ///
    /// Hosts of the `none` strategy that drive their own loop speed switch to the hover period
    /// with this while hovered.
    pub fn display_period(&self) -> Duration {
        let config = self.config();
        match (config.hover_strategy, self.is_hovered()) {
            (HoverStrategy::None, true) => config.hover_period_duration(),
            _ => config.normal_period_duration(),
        }
    }

    pub fn accent_color(&self) -> AccentColor {
        self.config().accent_color
    }

    pub fn config(&self) -> &OrbitConfig {
        match &self.driver {
            Driver::Engine(engine) => engine.config(),
            Driver::Nudge(nudge) => &nudge.config,
        }
    }

    pub fn motion(&self) -> MotionPreference {
        self.motion
    }

    pub fn is_hovered(&self) -> bool {
        match &self.driver {
            Driver::Engine(engine) => engine.is_hovered(),
            Driver::Nudge(nudge) => nudge.hovered,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The hover state machine, unless motion is reduced.
    pub fn engine(&self) -> Option<&HoverTransitionEngine> {
        match &self.driver {
            Driver::Engine(engine) => Some(engine),
            Driver::Nudge(_) => None,
        }
    }

    fn make_wobble(config: &OrbitConfig, motion: MotionPreference, now: Instant) -> Option<WobbleLoop> {
        match (config.wobble, motion) {
            (true, MotionPreference::Full) => Some(WobbleLoop::new(config.wobble_period_duration(), now)),
            _ => None,
        }
    }
}

impl Drop for OrbitRing {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn reduced(now: Instant) -> OrbitRing {
        OrbitRing::construct(OrbitConfig::default(), MotionPreference::Reduced, now).expect("construct failed")
    }

    #[rstest]
    #[case(HoverStrategy::None)]
    #[case(HoverStrategy::SmoothVelocity)]
    #[case(HoverStrategy::FastThenFlat)]
    #[case(HoverStrategy::ImmediateEaseFlat)]
    #[case(HoverStrategy::Reverse360ToFlat)]
    #[case(HoverStrategy::SlowReverseToFlat)]
    fn reduced_motion_nudges(#[case] strategy: HoverStrategy) {
        let now = Instant::now();
        let config = OrbitConfig { hover_strategy: strategy, rotation_axis: RotationAxis::Y, ..Default::default() };
        let mut ring = OrbitRing::construct(config, MotionPreference::Reduced, now).expect("construct failed");
        assert!(ring.engine().is_none());
        assert_eq!(ring.phase(), EnginePhase::Reduced);
        assert_eq!(ring.tick(now + ms(5000)).expect("tick failed").pose, Pose::FLAT);

        let enter = now + ms(5000);
        ring.set_hover_at(true, enter).expect("hover failed");
        let halfway = ring.tick(enter + ms(150)).expect("tick failed").pose;
        assert!(halfway.rotate_z > 22.5 && halfway.rotate_z < 45.0);
        let pose = ring.tick(enter + NUDGE_DURATION).expect("tick failed").pose;
        assert_eq!(pose.rotate_z, 45.0);
        assert_eq!((pose.rotate_x, pose.rotate_y), (0.0, 0.0));
        // holds the nudge and never starts looping
        assert_eq!(ring.tick(enter + ms(60_000)).expect("tick failed").pose.rotate_z, 45.0);
        assert_eq!(ring.phase(), EnginePhase::Reduced);

        let leave = enter + ms(61_000);
        ring.set_hover_at(false, leave).expect("hover failed");
        assert_eq!(ring.tick(leave + NUDGE_DURATION).expect("tick failed").pose, Pose::FLAT);
    }

    #[test]
    fn reduced_motion_reversal_is_continuous() {
        let now = Instant::now();
        let mut ring = reduced(now);
        ring.set_hover_at(true, now).expect("hover failed");
        let leave = now + ms(100);
        let before = ring.pose_at(leave);
        ring.set_hover_at(false, leave).expect("hover failed");
        assert!(ring.pose_at(leave).distance(&before) < 1e-9);
        assert!(ring.pose_at(leave + ms(16)).rotate_z < before.rotate_z);
    }

    #[test]
    fn reduced_motion_has_no_wobble() {
        let now = Instant::now();
        let config = OrbitConfig { wobble: true, ..Default::default() };
        let mut ring = OrbitRing::construct(config, MotionPreference::Reduced, now).expect("construct failed");
        assert_eq!(ring.tick(now + ms(1500)).expect("tick failed").azimuth, 0.0);
    }

    #[test]
    fn wobble_adds_azimuth() {
        let now = Instant::now();
        let config = OrbitConfig { wobble: true, wobble_period: 4.0, ..Default::default() };
        let mut ring = OrbitRing::construct(config, MotionPreference::Full, now).expect("construct failed");
        let frame = ring.tick(now + ms(1000)).expect("tick failed");
        assert!((frame.azimuth - 3.0).abs() < 1e-9);
        assert_eq!(frame.pose, ring.pose_at(now + ms(1000)));
    }

    #[test]
    fn wobble_toggles_with_config() {
        let now = Instant::now();
        let mut ring = OrbitRing::construct(OrbitConfig::default(), MotionPreference::Full, now).expect("construct failed");
        assert_eq!(ring.tick(now + ms(1000)).expect("tick failed").azimuth, 0.0);

        let patch = OrbitConfigPatch { wobble: Some(true), wobble_period: Some(4.0), ..Default::default() };
        ring.update_config_at(&patch, now + ms(2000)).expect("update failed");
        let frame = ring.tick(now + ms(3000)).expect("tick failed");
        assert!((frame.azimuth - 3.0).abs() < 1e-9);

        let patch = OrbitConfigPatch { wobble: Some(false), ..Default::default() };
        ring.update_config_at(&patch, now + ms(3000)).expect("update failed");
        assert_eq!(ring.tick(now + ms(4000)).expect("tick failed").azimuth, 0.0);
    }

    #[rstest]
    #[case(HoverStrategy::None, false, 12.5)]
    #[case(HoverStrategy::None, true, 5.0)]
    #[case(HoverStrategy::SmoothVelocity, true, 12.5)]
    #[case(HoverStrategy::FastThenFlat, true, 12.5)]
    fn display_period(#[case] strategy: HoverStrategy, #[case] hovered: bool, #[case] expected: f64) {
        let now = Instant::now();
        let config = OrbitConfig { hover_strategy: strategy, ..Default::default() };
        let mut ring = OrbitRing::construct(config, MotionPreference::Full, now).expect("construct failed");
        ring.set_hover_at(hovered, now).expect("hover failed");
        assert_eq!(ring.display_period(), Duration::from_secs_f64(expected));
    }

    #[test]
    fn rapid_toggle_during_slow_reverse() {
        let now = Instant::now();
        let config = OrbitConfig { hover_strategy: HoverStrategy::SlowReverseToFlat, tilt_x: 20.0, ..Default::default() };
        let mut ring = OrbitRing::construct(config, MotionPreference::Full, now).expect("construct failed");
        let enter = now + ms(6000);
        ring.set_hover_at(true, enter).expect("hover failed");
        ring.tick(enter + ms(50)).expect("tick failed");
        let leave = enter + ms(100);
        ring.set_hover_at(false, leave).expect("hover failed");

        assert_eq!(ring.phase(), EnginePhase::Looping);
        assert_eq!(ring.pose_at(leave), Pose::on_axis(RotationAxis::X, 20.0, 0.0, 0.0));
        let engine = ring.engine().expect("no engine");
        assert!(engine.loop_running());
        assert!(!engine.transition_running());
    }

    #[test]
    fn accent_color_follows_config() {
        let now = Instant::now();
        let mut ring = OrbitRing::construct(OrbitConfig::default(), MotionPreference::Full, now).expect("construct failed");
        assert_eq!(ring.accent_color(), AccentColor::GOLD);
        let patch = OrbitConfigPatch { accent_color: Some(AccentColor::new(1, 2, 3)), ..Default::default() };
        ring.update_config_at(&patch, now).expect("update failed");
        assert_eq!(ring.accent_color(), AccentColor::new(1, 2, 3));
    }

    #[test]
    fn invalid_construction() {
        let config = OrbitConfig { normal_period: -1.0, ..Default::default() };
        assert!(OrbitRing::construct(config.clone(), MotionPreference::Full, Instant::now()).is_err());
        assert!(OrbitRing::construct(config, MotionPreference::Reduced, Instant::now()).is_err());
    }

    #[rstest]
    #[case(MotionPreference::Full)]
    #[case(MotionPreference::Reduced)]
    fn destroy_is_idempotent(#[case] motion: MotionPreference) {
        let now = Instant::now();
        let config = OrbitConfig { hover_strategy: HoverStrategy::Reverse360ToFlat, wobble: true, ..Default::default() };
        let mut ring = OrbitRing::construct(config, motion, now).expect("construct failed");
        ring.set_hover_at(true, now).expect("hover failed");
        ring.destroy();
        ring.destroy();
        assert!(ring.is_destroyed());
        assert_eq!(ring.phase(), EnginePhase::Stopped);
        assert_eq!(ring.tick(now + ms(100)).expect("tick failed").azimuth, 0.0);
        ring.set_hover_at(false, now + ms(200)).expect("hover failed");
        assert_eq!(ring.phase(), EnginePhase::Stopped);
    }

    #[test]
    fn frames_serialize() {
        let now = Instant::now();
        let mut ring = OrbitRing::construct(OrbitConfig::default(), MotionPreference::Full, now).expect("construct failed");
        let frame = ring.tick(now).expect("tick failed");
        let value = serde_json::to_value(frame).expect("serialization failed");
        assert_eq!(value["pose"]["accent"], "near");
        assert_eq!(value["azimuth"], 0.0);
    }

    #[test]
    fn instances_are_independent() {
        let now = Instant::now();
        let config = OrbitConfig { hover_strategy: HoverStrategy::ImmediateEaseFlat, ..Default::default() };
        let mut first = OrbitRing::construct(config.clone(), MotionPreference::Full, now).expect("construct failed");
        let second = OrbitRing::construct(config, MotionPreference::Full, now).expect("construct failed");
        first.set_hover_at(true, now + ms(1000)).expect("hover failed");
        assert_eq!(second.phase(), EnginePhase::Looping);
        drop(first);
        assert_eq!(second.phase(), EnginePhase::Looping);
    }
}
