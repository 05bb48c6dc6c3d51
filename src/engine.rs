//! The hover state machine.
//!
//! An engine owns one orbit loop and at most one finite transition. On every hover change it
//! samples whatever currently drives the ring, builds the transition for the configured
//! [HoverStrategy] starting exactly at that pose, and on completion either parks the ring at the
//! flat pose or hands control back to the loop.

use crate::{
    animation::{sequence, synthesize, Easing, OrbitLoop, Pose, Timeline, VelocityRamp, VELOCITY_RAMP_DURATION},
    config::{ConfigurationError, HoverStrategy, OrbitConfig, OrbitConfigPatch},
};
use serde::Serialize;
use std::time::{Duration, Instant};

/// How long the final ease into the flat pose takes.
pub const SETTLE_DURATION: Duration = Duration::from_millis(800);

/// How long a full reverse turn into the flat pose takes.
pub const REVERSE_360_DURATION: Duration = Duration::from_millis(1800);

/// How long the slow step-wise unwinding into the flat pose takes.
pub const SLOW_REVERSE_DURATION: Duration = Duration::from_millis(2000);

/// How much faster than the loop the single turn before settling is.
const FAST_SPIN_SPEEDUP: u32 = 4;

/// Degrees unwound per keyframe when slowly reversing.
const SLOW_REVERSE_STEP: f64 = 90.0;

/// Where an engine stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnginePhase {
    /// The orbit loop drives the ring.
    Looping,
    /// A finite transition for the given strategy drives the ring.
    Transitioning(HoverStrategy),
    /// A settle transition finished and holds the flat pose.
    Flat,
    /// Motion is reduced: nothing loops and hover only nudges the ring.
    Reduced,
    /// The engine was torn down.
    Stopped,
}

/// A finite transition currently owning the ring.
#[derive(Debug)]
pub struct ActiveTransition {
    generation: u64,
    strategy: HoverStrategy,
    timeline: Timeline,
    irrevocable: bool,
    finished: bool,
}

impl ActiveTransition {
    /// The generation a completion for this transition must carry.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn strategy(&self) -> HoverStrategy {
        self.strategy
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn duration(&self) -> Duration {
        self.timeline.duration()
    }

    /// Whether completing this transition parks the ring instead of chaining into another one.
    pub fn is_irrevocable(&self) -> bool {
        self.irrevocable
    }

    /// Whether the transition already reached its last keyframe and is only holding it.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[derive(Debug, Default)]
pub enum TransitionState {
    #[default]
    Idle,
    Running(ActiveTransition),
}

impl TransitionState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    pub fn active(&self) -> Option<&ActiveTransition> {
        match self {
            Self::Running(transition) => Some(transition),
            Self::Idle => None,
        }
    }
}

/// What delivering a completion did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The next segment of a multi-part transition started.
    Chained,
    /// The ring now holds the flat pose.
    Parked,
    /// Hover had already ended, so the loop was restarted.
    Resumed,
    /// The completion belonged to a canceled or superseded transition.
    Ignored,
}

/// Drives an orbit loop and the transitions hover triggers on it.
#[derive(Debug)]
pub struct HoverTransitionEngine {
    config: OrbitConfig,
    orbit: OrbitLoop,
    velocity: VelocityRamp,
    transition: TransitionState,
    hovered: bool,
    generation: u64,
    torn_down: bool,
}

impl HoverTransitionEngine {
    /// Validate `config` and start looping at `now`.
    pub fn new(config: OrbitConfig, now: Instant) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let mut orbit = OrbitLoop::new(&config)?;
        orbit.start(&config, now)?;
        Ok(Self {
            config,
            orbit,
            velocity: VelocityRamp::new(),
            transition: TransitionState::Idle,
            hovered: false,
            generation: 0,
            torn_down: false,
        })
    }

    /// Apply a hover change at `now`.
    ///
    /// Repeating the current hover state is a no-op.
    pub fn set_hover(&mut self, active: bool, now: Instant) -> Result<(), ConfigurationError> {
        if self.torn_down {
            log::debug!("ignoring hover change on a torn down engine");
            return Ok(());
        }
        if active == self.hovered {
            log::debug!("hover already {active}, ignoring");
            return Ok(());
        }
        // settle anything that ended before `now` so the switch starts from the true pose
        self.poll(now)?;
        self.hovered = active;
        if active {
            self.enter(now)
        } else {
            self.leave(now);
            Ok(())
        }
    }

    /// Advance time-driven state to `now` and return the pose to render.
    pub fn tick(&mut self, now: Instant) -> Result<Pose, ConfigurationError> {
        if !self.torn_down {
            self.velocity.tick(&mut self.orbit, now);
            self.poll(now)?;
        }
        Ok(self.current_pose(now))
    }

    /// Deliver the completion of the transition identified by `generation`.
    ///
    /// Hosts that schedule their own completion callbacks call this; [HoverTransitionEngine::tick]
    /// does it automatically. Completions of canceled or superseded transitions are ignored.
    pub fn complete(&mut self, generation: u64, now: Instant) -> Result<CompletionOutcome, ConfigurationError> {
        // an early completion hands over at `now`, a late one at the instant the transition ended
        let (strategy, irrevocable, handover_pose, handover_at) = match &self.transition {
            TransitionState::Running(transition) if transition.generation == generation && !transition.finished => {
                let handover_at = transition.timeline.ends_at().min(now);
                (transition.strategy, transition.irrevocable, transition.timeline.pose_at(handover_at), handover_at)
            }
            _ => {
                log::debug!("ignoring stale completion for generation {generation}");
                return Ok(CompletionOutcome::Ignored);
            }
        };

        if !irrevocable {
            // the fast turn is over: ease from where it stopped into the flat pose
            let keyframes = sequence([handover_pose, Pose::FLAT], self.config.accent_color);
            let timeline = Timeline::new(keyframes, SETTLE_DURATION, Easing::EaseOut, handover_at);
            self.install(strategy, timeline, true);
            return Ok(CompletionOutcome::Chained);
        }
        if self.hovered {
            if let TransitionState::Running(transition) = &mut self.transition {
                transition.finished = true;
            }
            log::trace!("parked at flat after {strategy}");
            Ok(CompletionOutcome::Parked)
        } else {
            self.cancel_transition(now);
            self.orbit.restart(now);
            Ok(CompletionOutcome::Resumed)
        }
    }

    /// Merge `patch` into the configuration.
    ///
    /// The new configuration is used by future loop starts and future transitions. A running
    /// loop or transition keeps the keyframes it was built with. A rejected patch changes nothing.
    pub fn update_config(&mut self, patch: &OrbitConfigPatch) -> Result<(), ConfigurationError> {
        let merged = patch.apply(&self.config)?;
        self.orbit.stage(&merged)?;
        self.config = merged;
        Ok(())
    }

    /// Stop everything. The engine ignores hover changes afterwards.
    pub fn destroy(&mut self) {
        if self.torn_down {
            return;
        }
        self.velocity.cancel();
        self.orbit.cancel();
        if self.transition.is_running() {
            self.generation += 1;
            self.transition = TransitionState::Idle;
        }
        self.torn_down = true;
    }

    /// The pose the ring shows at `now`.
    pub fn current_pose(&self, now: Instant) -> Pose {
        match &self.transition {
            TransitionState::Running(transition) => transition.timeline.pose_at(now),
            TransitionState::Idle if self.orbit.is_running() => self.orbit.pose_at(now),
            TransitionState::Idle => Pose::FLAT,
        }
    }

    pub fn phase(&self) -> EnginePhase {
        if self.torn_down {
            return EnginePhase::Stopped;
        }
        match &self.transition {
            TransitionState::Running(transition) if transition.finished => EnginePhase::Flat,
            TransitionState::Running(transition) => EnginePhase::Transitioning(transition.strategy),
            TransitionState::Idle if self.orbit.is_running() => EnginePhase::Looping,
            TransitionState::Idle => EnginePhase::Stopped,
        }
    }

    pub fn config(&self) -> &OrbitConfig {
        &self.config
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn loop_running(&self) -> bool {
        self.orbit.is_running()
    }

    pub fn transition_running(&self) -> bool {
        self.transition.is_running()
    }

    pub fn transition(&self) -> &TransitionState {
        &self.transition
    }

    pub fn orbit(&self) -> &OrbitLoop {
        &self.orbit
    }

    pub fn velocity(&self) -> &VelocityRamp {
        &self.velocity
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn enter(&mut self, now: Instant) -> Result<(), ConfigurationError> {
        match self.config.hover_strategy {
            HoverStrategy::None => Ok(()),
            HoverStrategy::SmoothVelocity => {
                self.resume_loop(now);
                self.velocity.ramp(&mut self.orbit, self.config.hover_rate(), VELOCITY_RAMP_DURATION, now);
                Ok(())
            }
            strategy => self.begin_settle(strategy, now),
        }
    }

    fn leave(&mut self, now: Instant) {
        self.resume_loop(now);
        if self.velocity.is_active() || self.orbit.playback_rate() != 1.0 {
            self.velocity.ramp(&mut self.orbit, 1.0, VELOCITY_RAMP_DURATION, now);
        }
    }

    // hand the ring back to the loop if a transition owns it
    fn resume_loop(&mut self, now: Instant) {
        if self.transition.is_running() {
            self.cancel_transition(now);
            self.velocity.cancel();
            self.orbit.restart(now);
        }
    }

    fn begin_settle(&mut self, strategy: HoverStrategy, now: Instant) -> Result<(), ConfigurationError> {
        let from = self.current_pose(now);
        let OrbitConfig { rotation_axis: axis, tilt_x, tilt_y, accent_color, .. } = self.config;
        let angle = if self.orbit.is_running() {
            self.orbit.current_phase(now) * 360.0
        } else {
            from.angle_on_axis(axis, tilt_x, tilt_y)
        };
        let on_axis = |angle: f64| Pose::on_axis(axis, tilt_x, tilt_y, angle);

        let (mut keyframes, duration, easing, irrevocable) = match strategy {
            HoverStrategy::FastThenFlat => {
                let keyframes = synthesize(axis, tilt_x, tilt_y, angle, angle + 360.0, accent_color)?;
                let duration = self.config.normal_period_duration() / FAST_SPIN_SPEEDUP;
                (keyframes, duration, Easing::Linear, false)
            }
            HoverStrategy::ImmediateEaseFlat => {
                (sequence([from, Pose::FLAT], accent_color), SETTLE_DURATION, Easing::EaseOut, true)
            }
            HoverStrategy::Reverse360ToFlat => {
                let poses = [on_axis(angle), on_axis(angle - 180.0), Pose::FLAT];
                (sequence(poses, accent_color), REVERSE_360_DURATION, Easing::EaseOut, true)
            }
            HoverStrategy::SlowReverseToFlat => {
                let steps = (angle.abs() / SLOW_REVERSE_STEP).ceil() as usize + 1;
                let poses = (0..=steps).map(|step| {
                    if step == steps { Pose::FLAT } else { on_axis(angle - angle * step as f64 / steps as f64) }
                });
                (sequence(poses, accent_color), SLOW_REVERSE_DURATION, Easing::EaseOut, true)
            }
            HoverStrategy::None | HoverStrategy::SmoothVelocity => return Ok(()),
        };
        // start from the exact pose on screen, even if an in-flight transition had it off-axis
        if let Some(first) = keyframes.first_mut() {
            first.pose = from;
        }

        self.velocity.cancel();
        self.orbit.cancel();
        self.cancel_transition(now);
        self.install(strategy, Timeline::new(keyframes, duration, easing, now), irrevocable);
        Ok(())
    }

    fn install(&mut self, strategy: HoverStrategy, timeline: Timeline, irrevocable: bool) {
        self.generation += 1;
        log::trace!(
            "starting {strategy} transition generation {} over {:?}",
            self.generation,
            timeline.duration()
        );
        self.transition = TransitionState::Running(ActiveTransition {
            generation: self.generation,
            strategy,
            timeline,
            irrevocable,
            finished: false,
        });
    }

    fn cancel_transition(&mut self, now: Instant) {
        if let TransitionState::Running(transition) = &self.transition {
            log::trace!(
                "canceling transition generation {} at {:?}",
                transition.generation,
                transition.timeline.pose_at(now)
            );
            self.generation += 1;
            self.transition = TransitionState::Idle;
        }
    }

    // deliver every completion that is due by `now`, in order
    fn poll(&mut self, now: Instant) -> Result<(), ConfigurationError> {
        loop {
            let due = match &self.transition {
                TransitionState::Running(transition)
                    if !transition.finished && transition.timeline.is_finished(now) =>
                {
                    (transition.generation, transition.timeline.ends_at())
                }
                _ => return Ok(()),
            };
            let (generation, ends_at) = due;
            self.complete(generation, ends_at)?;
        }
    }
}
