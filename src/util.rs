use uom::si::angle::radian;
use uom::si::f64::Angle;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The minimum time separation between two distinct points of a trajectory.
///
/// Points closer together than this are considered to be at the same time and
/// are merged rather than kept side by side.
pub(crate) const MIN_DT_SECONDS: f64 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub(crate) struct BoundedAngle {
    angle: Angle,
}

impl BoundedAngle {
    pub(crate) fn new(angle: impl Into<Angle>) -> Self {
        Self {
            // NOTE: even though we put the value into bounds here, uom may choose to store
            // the value differently-normalized, so we must normalize on output as well.
            angle: Angle::new::<radian>(Self::into_bounds(angle.into())),
        }
    }

    /// Returns the angle in [0°, 360°) in radians.
    pub(crate) fn get_bounded(self) -> f64 {
        Self::into_bounds(self.angle)
    }

    fn into_bounds(angle: Angle) -> f64 {
        let out_of_bounds: f64 = angle.get::<radian>();
        out_of_bounds.rem_euclid(Angle::FULL_TURN.get::<radian>())
    }

    /// Returns the angle in [-180°, 180°) in radians.
    pub(crate) fn to_signed_range(self) -> f64 {
        let angle = self.get_bounded();
        if angle < Angle::HALF_TURN.get::<radian>() {
            angle
        } else {
            angle - Angle::FULL_TURN.get::<radian>()
        }
    }
}

/// Every value that can be converted into an [`Angle`] can be converted into [`BoundedAngle`].
impl<U: Into<Angle>> From<U> for BoundedAngle {
    fn from(value: U) -> Self {
        BoundedAngle::new(value)
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for BoundedAngle {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        let bounded = self.get_bounded();
        let other_bounded = other.get_bounded();

        let min = f64::min(bounded, other_bounded);
        let max = f64::max(bounded, other_bounded);

        f64::relative_eq(&min, &max, epsilon, max_relative)
            || f64::relative_eq(
                &(min + Angle::FULL_TURN.get::<radian>()),
                &max,
                epsilon,
                max_relative,
            )
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for BoundedAngle {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        // this is very accurate in radians
        0.000_000_001
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        Self::new(self.angle - other.angle).to_signed_range().abs() <= epsilon
    }
}

/// Returns the signed difference `to - from` between two compass tracks,
/// normalized into [-180°, 180°).
///
/// Positive means a right (clockwise) turn gets from `from` to `to` the short
/// way round; negative means a left turn.
pub(crate) fn signed_track_delta(from: Angle, to: Angle) -> Angle {
    Angle::new::<radian>(BoundedAngle::new(to - from).to_signed_range())
}

/// Returns the magnitude of the smaller angle between two compass tracks.
pub(crate) fn track_delta(from: Angle, to: Angle) -> Angle {
    signed_track_delta(from, to).abs()
}

/// Returns `1.0` for a right (clockwise) turn from `from` to `to`, `-1.0` for
/// a left turn.
pub(crate) fn turn_direction(from: Angle, to: Angle) -> f64 {
    if signed_track_delta(from, to).get::<radian>() >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Solves `0.5*a*t² + v0*t - d = 0` for the smaller non-negative root.
///
/// A distance `d <= 0` is reached immediately, at `t = 0`, whatever the
/// profile. When `a` is (numerically) zero the equation degenerates to
/// `v0*t = d` and the linear solution is returned instead. Returns `None`
/// when no non-negative real root exists, i.e. the distance `d` is never
/// reached.
pub(crate) fn time_to_distance(v0: f64, a: f64, d: f64) -> Option<f64> {
    if d <= 0.0 {
        return Some(0.0);
    }
    if a.abs() < 1e-12 {
        if v0 <= 0.0 {
            return None;
        }
        return Some(d / v0);
    }
    let discriminant = v0 * v0 + 2.0 * a * d;
    if discriminant < 0.0 {
        return None;
    }
    let sq = discriminant.sqrt();
    let t1 = (-v0 + sq) / a;
    let t2 = (-v0 - sq) / a;
    let mut best: Option<f64> = None;
    for t in [t1, t2] {
        if t >= 0.0 && best.map_or(true, |b| t < b) {
            best = Some(t);
        }
    }
    best
}
