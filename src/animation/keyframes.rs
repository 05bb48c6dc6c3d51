use super::pose::{Keyframe, Pose};
use crate::config::{AccentColor, ConfigurationError, RotationAxis};

/// Keyframes used when spinning around the X or Y axis: one per quarter of a full turn.
const SPIN_KEYFRAMES: usize = 5;

/// Build the keyframes of a rotation around `axis` from `start` to `end` degrees.
///
/// X and Y rotations get five evenly spaced keyframes so the accent edge can flip as the ring
/// passes behind the disk. Z rotations stay in the ring's own plane and only need both ends.
pub fn synthesize(
    axis: RotationAxis,
    tilt_x: f64,
    tilt_y: f64,
    start: f64,
    end: f64,
    accent_color: AccentColor,
) -> Result<Vec<Keyframe>, ConfigurationError> {
    for (field, value) in [("tilt_x", tilt_x), ("tilt_y", tilt_y), ("start angle", start), ("end angle", end)] {
        if !value.is_finite() {
            return Err(ConfigurationError::NonFinite { field, value });
        }
    }
    let count = match axis {
        RotationAxis::X | RotationAxis::Y => SPIN_KEYFRAMES,
        RotationAxis::Z => 2,
    };
    let last = (count - 1) as f64;
    let poses = (0..count).map(|index| {
        let angle = start + (end - start) * index as f64 / last;
        Pose::on_axis(axis, tilt_x, tilt_y, angle)
    });
    Ok(sequence(poses, accent_color))
}

/// Lay out `poses` as evenly spaced keyframes.
pub fn sequence<I>(poses: I, accent_color: AccentColor) -> Vec<Keyframe>
where
    I: IntoIterator<Item = Pose>,
{
    let poses: Vec<Pose> = poses.into_iter().collect();
    let last = poses.len().saturating_sub(1).max(1) as f64;
    poses
        .into_iter()
        .enumerate()
        .map(|(index, pose)| Keyframe { offset: index as f64 / last, pose, accent_color })
        .collect()
}
