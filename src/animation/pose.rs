use crate::config::{AccentColor, RotationAxis};
use itertools::Itertools;
use serde::Serialize;

/// Which side of the central disk the highlighted stroke currently represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentEdge {
    /// The stroke passes in front of the disk.
    #[default]
    Near,
    /// The stroke passes behind the disk.
    Far,
}

impl AccentEdge {
    /// The edge for a ring turned `angle` degrees away from its rest position.
    ///
    /// The stroke is in front for the first and last quarter turns and behind it in between, the
    /// switch happening halfway between the quarter keyframes.
    pub fn for_angle(angle: f64) -> Self {
        let angle = angle.rem_euclid(360.0);
        if (135.0..315.0).contains(&angle) { Self::Far } else { Self::Near }
    }
}

/// The rendered state of the ring at one instant.
///
/// Angles are in degrees and are applied as rotations around the X, Y and Z axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Pose {
    pub rotate_x: f64,
    pub rotate_y: f64,
    pub rotate_z: f64,
    pub accent: AccentEdge,
}

impl Pose {
    /// The canonical rest pose every settle transition ends in.
    pub const FLAT: Self = Self { rotate_x: 0.0, rotate_y: 0.0, rotate_z: 0.0, accent: AccentEdge::Near };

    /// The pose of a ring tilted by `tilt_x`/`tilt_y` and turned `angle` degrees around `axis`.
    pub fn on_axis(axis: RotationAxis, tilt_x: f64, tilt_y: f64, angle: f64) -> Self {
        match axis {
            RotationAxis::X => Self {
                rotate_x: tilt_x + angle,
                rotate_y: tilt_y,
                rotate_z: 0.0,
                accent: AccentEdge::for_angle(angle),
            },
            RotationAxis::Y => Self {
                rotate_x: tilt_x,
                rotate_y: tilt_y + angle,
                rotate_z: 0.0,
                accent: AccentEdge::for_angle(angle),
            },
            RotationAxis::Z => Self { rotate_x: tilt_x, rotate_y: tilt_y, rotate_z: angle, accent: AccentEdge::Near },
        }
    }

    /// The inverse of [Pose::on_axis]: how far this pose is turned around `axis`.
    pub fn angle_on_axis(&self, axis: RotationAxis, tilt_x: f64, tilt_y: f64) -> f64 {
        match axis {
            RotationAxis::X => self.rotate_x - tilt_x,
            RotationAxis::Y => self.rotate_y - tilt_y,
            RotationAxis::Z => self.rotate_z,
        }
    }

    pub fn is_flat(&self) -> bool {
        *self == Self::FLAT
    }

    /// Interpolate towards `other`. The accent edge is discrete and switches halfway.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let mix = |from: f64, to: f64| from + (to - from) * t;
        Self {
            rotate_x: mix(self.rotate_x, other.rotate_x),
            rotate_y: mix(self.rotate_y, other.rotate_y),
            rotate_z: mix(self.rotate_z, other.rotate_z),
            accent: if t < 0.5 { self.accent } else { other.accent },
        }
    }

    /// The largest per-axis angular difference between two poses, in degrees.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.rotate_x - other.rotate_x)
            .abs()
            .max((self.rotate_y - other.rotate_y).abs())
            .max((self.rotate_z - other.rotate_z).abs())
    }
}

/// A pose pinned to a point of an animation's timeline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Keyframe {
    /// Position within the animation, from 0 to 1.
    pub offset: f64,
    pub pose: Pose,
    pub accent_color: AccentColor,
}

/// Sample a keyframe list at `progress`, interpolating linearly between neighbouring keyframes.
pub fn sample(keyframes: &[Keyframe], progress: f64) -> Pose {
    let (Some(first), Some(last)) = (keyframes.first(), keyframes.last()) else {
        return Pose::FLAT;
    };
    if progress <= first.offset {
        return first.pose;
    }
    if progress >= last.offset {
        return last.pose;
    }
    for (from, to) in keyframes.iter().tuple_windows() {
        if progress <= to.offset {
            let span = to.offset - from.offset;
            let t = if span > 0.0 { (progress - from.offset) / span } else { 1.0 };
            return from.pose.lerp(&to.pose, t);
        }
    }
    last.pose
}
