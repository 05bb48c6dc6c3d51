//! An endlessly turning orbit ring that reacts to hover.
//!
//! [OrbitRing] is the entry point: construct one from an [OrbitConfig], feed it hover changes
//! and call [OrbitRing::tick] once per frame to get the pose to draw.

pub mod animation;
pub mod config;
pub mod engine;
pub mod ring;

pub use crate::{
    animation::{AccentEdge, Pose},
    config::{AccentColor, ConfigurationError, HoverStrategy, OrbitConfig, OrbitConfigPatch, RotationAxis},
    engine::{CompletionOutcome, EnginePhase, HoverTransitionEngine},
    ring::{Frame, MotionPreference, OrbitRing},
};
