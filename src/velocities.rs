use crate::util::BoundedAngle;
use std::fmt;
use std::fmt::Display;
use uom::si::angle::{degree, radian};
use uom::si::f64::{Angle, Velocity as Speed};
use uom::si::velocity::{foot_per_minute, knot};
use uom::ConstZero;

#[cfg(any(test, feature = "approx"))]
use approx::AbsDiffEq;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An aircraft velocity expressed the way aviation does: a compass track
/// (clockwise from true north), a ground speed, and a vertical speed.
///
/// The track is normalized into [0°, 360°) on construction. Ground speed is
/// the horizontal speed over the surface; a negative ground speed is not
/// meaningful and callers are expected not to construct one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Velocity {
    track: Angle,
    ground_speed: Speed,
    vertical_speed: Speed,
}

impl Velocity {
    /// Constructs a velocity from compass track, ground speed, and vertical
    /// speed.
    #[must_use]
    pub fn new(
        track: impl Into<Angle>,
        ground_speed: impl Into<Speed>,
        vertical_speed: impl Into<Speed>,
    ) -> Self {
        Self {
            track: Angle::new::<radian>(BoundedAngle::new(track.into()).get_bounded()),
            ground_speed: ground_speed.into(),
            vertical_speed: vertical_speed.into(),
        }
    }

    /// The all-zero velocity (track north, no horizontal or vertical motion).
    #[must_use]
    pub fn zero() -> Self {
        Self {
            track: Angle::ZERO,
            ground_speed: Speed::ZERO,
            vertical_speed: Speed::ZERO,
        }
    }

    /// Returns the compass track in [0°, 360°).
    #[must_use]
    pub fn track(&self) -> Angle {
        self.track
    }

    /// Returns the ground speed.
    #[must_use]
    pub fn ground_speed(&self) -> Speed {
        self.ground_speed
    }

    /// Returns the vertical speed (positive is climbing).
    #[must_use]
    pub fn vertical_speed(&self) -> Speed {
        self.vertical_speed
    }

    /// Returns this velocity with the track replaced (and normalized).
    #[must_use]
    pub fn with_track(&self, track: impl Into<Angle>) -> Self {
        Self::new(track, self.ground_speed, self.vertical_speed)
    }

    /// Returns this velocity with the ground speed replaced.
    #[must_use]
    pub fn with_ground_speed(&self, ground_speed: impl Into<Speed>) -> Self {
        Self {
            ground_speed: ground_speed.into(),
            ..*self
        }
    }

    /// Returns this velocity with the vertical speed replaced.
    #[must_use]
    pub fn with_vertical_speed(&self, vertical_speed: impl Into<Speed>) -> Self {
        Self {
            vertical_speed: vertical_speed.into(),
            ..*self
        }
    }
}

impl Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trk {:.1}° gs {:.1} kn vs {:.0} fpm",
            self.track.get::<degree>(),
            self.ground_speed.get::<knot>(),
            self.vertical_speed.get::<foot_per_minute>()
        )
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Velocity {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    /// Compares the track in radians (cyclically) and the speeds in m/s.
    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        use uom::si::velocity::meter_per_second;
        BoundedAngle::new(self.track).abs_diff_eq(&BoundedAngle::new(other.track), epsilon)
            && f64::abs_diff_eq(
                &self.ground_speed.get::<meter_per_second>(),
                &other.ground_speed.get::<meter_per_second>(),
                epsilon,
            )
            && f64::abs_diff_eq(
                &self.vertical_speed.get::<meter_per_second>(),
                &other.vertical_speed.get::<meter_per_second>(),
                epsilon,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }
    fn kn(knots: f64) -> Speed {
        Speed::new::<knot>(knots)
    }

    #[test]
    fn track_is_normalized_on_construction() {
        let v = Velocity::new(d(-90.), kn(100.), Speed::ZERO);
        assert_relative_eq!(v.track().get::<degree>(), 270., epsilon = 1e-9);

        let v = v.with_track(d(370.));
        assert_relative_eq!(v.track().get::<degree>(), 10., epsilon = 1e-9);
    }

    #[test]
    fn component_replacement_leaves_the_rest_alone() {
        let v = Velocity::new(d(45.), kn(150.), Speed::new::<foot_per_minute>(500.));
        let w = v.with_ground_speed(kn(200.));
        assert_eq!(w.track(), v.track());
        assert_eq!(w.vertical_speed(), v.vertical_speed());
        assert_relative_eq!(w.ground_speed().get::<knot>(), 200., epsilon = 1e-9);
    }
}
