mod easing;
mod keyframes;
mod orbit_loop;
mod pose;
mod timeline;
mod velocity;
mod wobble;

pub use easing::Easing;
pub use keyframes::{sequence, synthesize};
pub use orbit_loop::OrbitLoop;
pub use pose::{sample, AccentEdge, Keyframe, Pose};
pub use timeline::Timeline;
pub use velocity::{VelocityRamp, VELOCITY_RAMP_DURATION};
pub use wobble::WobbleLoop;
