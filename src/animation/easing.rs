/// Easing curves applied to the linear progress of an animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Easing {
    Linear,
    /// CSS `ease-out`, i.e. `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,
    /// CSS `ease-in-out`, i.e. `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,
    EaseInOutCubic,
    /// A CSS style cubic bezier with control points `(x1, y1)` and `(x2, y2)`.
    CubicBezier(f64, f64, f64, f64),
}

impl Easing {
    /// Map a linear progress in `[0, 1]` into an eased progress.
    ///
    /// The end points are fixed: 0 maps to 0 and 1 maps to 1 for every curve.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 || t == 1.0 {
            return t;
        }
        match self {
            Self::Linear => t,
            Self::EaseOut => bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::CubicBezier(x1, y1, x2, y2) => bezier(*x1, *y1, *x2, *y2, t),
        }
    }
}

const NEWTON_ITERATIONS: usize = 8;
const BISECTION_ITERATIONS: usize = 40;
const EPSILON: f64 = 1e-9;

/// Evaluate a unit cubic bezier at horizontal position `x`.
///
/// The curve's parameter for `x` is solved with Newton-Raphson first and falls back to bisection
/// when the slope is too flat to converge.
fn bezier(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    let x1 = x1.clamp(0.0, 1.0);
    let x2 = x2.clamp(0.0, 1.0);
    let curve_x = |t: f64| cubic(x1, x2, t);
    let slope_x = |t: f64| {
        let (b, c) = (3.0 * x1, 3.0 * (x2 - x1) - 3.0 * x1);
        let a = 1.0 - b - c;
        (3.0 * a * t + 2.0 * c) * t + b
    };

    let mut t = x;
    for _ in 0..NEWTON_ITERATIONS {
        let error = curve_x(t) - x;
        if error.abs() < EPSILON {
            return cubic(y1, y2, t);
        }
        let slope = slope_x(t);
        if slope.abs() < 1e-6 {
            break;
        }
        t -= error / slope;
    }

    let (mut low, mut high) = (0.0, 1.0);
    t = x;
    for _ in 0..BISECTION_ITERATIONS {
        let value = curve_x(t);
        if (value - x).abs() < EPSILON {
            break;
        }
        if value < x {
            low = t;
        } else {
            high = t;
        }
        t = (low + high) / 2.0;
    }
    cubic(y1, y2, t)
}

// B(t) for a curve anchored at 0 and 1 with inner control values p1, p2
fn cubic(p1: f64, p2: f64, t: f64) -> f64 {
    let c = 3.0 * p1;
    let b = 3.0 * (p2 - p1) - c;
    let a = 1.0 - c - b;
    ((a * t + b) * t + c) * t
}
