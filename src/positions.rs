use crate::geodesic;
use crate::util::BoundedAngle;
use crate::Point3;
use std::fmt;
use std::fmt::Display;
use uom::si::angle::{degree, radian};
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;
use uom::ConstZero;

#[cfg(any(test, feature = "approx"))]
use approx::AbsDiffEq;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 3D location in one of the two frames a trajectory can live in.
///
/// A trajectory is either geodesic (latitude/longitude on the navigation
/// sphere plus altitude) or Euclidean (a local flat-earth frame in meters,
/// `z` up), never a mix of the two. All pairwise operations on [`Position`]
/// therefore return `None` when handed positions from different frames;
/// [`Trajectory`](crate::Trajectory) enforces frame exclusivity on insert so
/// that within one trajectory these operations cannot fail.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Position {
    /// Latitude/longitude on the navigation sphere plus altitude above it.
    LatLon {
        latitude: Angle,
        longitude: Angle,
        altitude: Length,
    },
    /// A point in a local Euclidean frame, in meters, with `z` as altitude.
    Euclidean(Point3),
}

impl Position {
    /// Constructs a geodesic position.
    ///
    /// The latitude must be in [-90°, 90°]; otherwise this returns `None`.
    /// The longitude is normalized into [-180°, 180°).
    #[must_use]
    pub fn lat_lon(
        latitude: impl Into<Angle>,
        longitude: impl Into<Angle>,
        altitude: impl Into<Length>,
    ) -> Option<Self> {
        let latitude = latitude.into();
        if latitude.get::<degree>().abs() > 90. {
            return None;
        }
        Some(Self::LatLon {
            latitude,
            longitude: Angle::new::<radian>(BoundedAngle::new(longitude.into()).to_signed_range()),
            altitude: altitude.into(),
        })
    }

    /// Constructs a position in a local Euclidean frame with `z` as altitude.
    #[must_use]
    pub fn euclidean(x: impl Into<Length>, y: impl Into<Length>, z: impl Into<Length>) -> Self {
        Self::Euclidean(Point3::new(
            x.into().get::<meter>(),
            y.into().get::<meter>(),
            z.into().get::<meter>(),
        ))
    }

    /// Returns `true` if this position is geodesic (latitude/longitude).
    #[must_use]
    pub fn is_lat_lon(&self) -> bool {
        matches!(self, Self::LatLon { .. })
    }

    /// Returns `true` if `self` and `other` live in the same frame.
    #[must_use]
    pub fn same_frame(&self, other: &Self) -> bool {
        self.is_lat_lon() == other.is_lat_lon()
    }

    /// Returns the altitude of this position.
    #[must_use]
    pub fn altitude(&self) -> Length {
        match *self {
            Self::LatLon { altitude, .. } => altitude,
            Self::Euclidean(p) => Length::new::<meter>(p.z),
        }
    }

    /// Returns this position with its altitude replaced.
    #[must_use]
    pub fn with_altitude(&self, altitude: impl Into<Length>) -> Self {
        let altitude = altitude.into();
        match *self {
            Self::LatLon {
                latitude,
                longitude,
                ..
            } => Self::LatLon {
                latitude,
                longitude,
                altitude,
            },
            Self::Euclidean(p) => Self::Euclidean(Point3::new(p.x, p.y, altitude.get::<meter>())),
        }
    }

    /// Computes the horizontal (surface or ground-plane) distance to `other`.
    ///
    /// Returns `None` if the two positions live in different frames.
    #[must_use]
    pub fn horizontal_distance(&self, other: &Self) -> Option<Length> {
        match (*self, *other) {
            (
                Self::LatLon {
                    latitude: lat_a,
                    longitude: lon_a,
                    ..
                },
                Self::LatLon {
                    latitude: lat_b,
                    longitude: lon_b,
                    ..
                },
            ) => Some(geodesic::surface_distance(lat_a, lon_a, lat_b, lon_b)),
            (Self::Euclidean(a), Self::Euclidean(b)) => {
                Some(Length::new::<meter>((b.xy() - a.xy()).norm()))
            }
            _ => None,
        }
    }

    /// Computes the signed altitude difference `other - self`.
    ///
    /// Returns `None` if the two positions live in different frames.
    #[must_use]
    pub fn vertical_distance(&self, other: &Self) -> Option<Length> {
        if !self.same_frame(other) {
            return None;
        }
        Some(other.altitude() - self.altitude())
    }

    /// Computes the initial compass track (clockwise from north, [0°, 360°))
    /// from `self` towards `other`.
    ///
    /// Returns `None` if the two positions live in different frames.
    #[must_use]
    pub fn track_to(&self, other: &Self) -> Option<Angle> {
        match (*self, *other) {
            (
                Self::LatLon {
                    latitude: lat_a,
                    longitude: lon_a,
                    ..
                },
                Self::LatLon {
                    latitude: lat_b,
                    longitude: lon_b,
                    ..
                },
            ) => Some(geodesic::initial_course(lat_a, lon_a, lat_b, lon_b)),
            (Self::Euclidean(a), Self::Euclidean(b)) => {
                let dx = b.x - a.x;
                let dy = b.y - a.y;
                // compass convention: angle from +y (north), clockwise
                Some(Angle::new::<radian>(
                    BoundedAngle::new(Angle::new::<radian>(dx.atan2(dy))).get_bounded(),
                ))
            }
            _ => None,
        }
    }

    /// Returns the position reached by moving the horizontal distance `dist`
    /// along the compass `track`, keeping the altitude unchanged.
    #[must_use]
    pub fn project(&self, track: impl Into<Angle>, dist: impl Into<Length>) -> Self {
        let track = track.into();
        let dist = dist.into();
        match *self {
            Self::LatLon {
                latitude,
                longitude,
                altitude,
            } => {
                let (lat, lon) = geodesic::project_along_course(latitude, longitude, track, dist);
                Self::LatLon {
                    latitude: lat,
                    longitude: lon,
                    altitude,
                }
            }
            Self::Euclidean(p) => {
                let trk = track.get::<radian>();
                let d = dist.get::<meter>();
                Self::Euclidean(Point3::new(p.x + d * trk.sin(), p.y + d * trk.cos(), p.z))
            }
        }
    }

    /// Linearly interpolates between `self` (at `fraction` 0) and `other`
    /// (at `fraction` 1). The fraction may lie outside [0, 1], in which case
    /// the result is extrapolated along the same course.
    ///
    /// Returns `None` if the two positions live in different frames.
    #[must_use]
    pub fn interpolate(&self, other: &Self, fraction: f64) -> Option<Self> {
        if !self.same_frame(other) {
            return None;
        }
        let dist = self.horizontal_distance(other)?;
        let altitude = self.altitude() + (other.altitude() - self.altitude()) * fraction;
        if dist == Length::ZERO {
            return Some(self.with_altitude(altitude));
        }
        let track = self.track_to(other)?;
        Some(self.project(track, dist * fraction).with_altitude(altitude))
    }

    /// Computes the point on the segment from `a` to `b` that lies closest to
    /// `self`, measured horizontally. The result is clamped to the segment.
    ///
    /// Returns `None` if the three positions do not all share a frame.
    #[must_use]
    pub fn closest_point_on_segment(&self, a: &Self, b: &Self) -> Option<Self> {
        if !a.same_frame(b) || !a.same_frame(self) {
            return None;
        }
        let leg = a.horizontal_distance(b)?;
        if leg == Length::ZERO {
            return Some(*a);
        }
        let to_self = a.horizontal_distance(self)?;
        if to_self == Length::ZERO {
            return Some(*a);
        }
        let leg_track = a.track_to(b)?;
        let self_track = a.track_to(self)?;
        let along = to_self * (self_track - leg_track).get::<radian>().cos();
        let along = along.max(Length::ZERO).min(leg);
        a.interpolate(b, along.get::<meter>() / leg.get::<meter>())
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LatLon {
                latitude,
                longitude,
                altitude,
            } => write!(
                f,
                "({:.6}°, {:.6}°, {:.1} m)",
                latitude.get::<degree>(),
                longitude.get::<degree>(),
                altitude.get::<meter>()
            ),
            Self::Euclidean(p) => write!(f, "({:.1} m, {:.1} m, {:.1} m)", p.x, p.y, p.z),
        }
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Position {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    /// Compares raw components: radians and meters for geodesic positions,
    /// meters for Euclidean ones. Positions in different frames are never
    /// equal.
    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        match (*self, *other) {
            (
                Self::LatLon {
                    latitude: lat_a,
                    longitude: lon_a,
                    altitude: alt_a,
                },
                Self::LatLon {
                    latitude: lat_b,
                    longitude: lon_b,
                    altitude: alt_b,
                },
            ) => {
                f64::abs_diff_eq(&lat_a.get::<radian>(), &lat_b.get::<radian>(), epsilon)
                    && BoundedAngle::new(lon_a).abs_diff_eq(&BoundedAngle::new(lon_b), epsilon)
                    && f64::abs_diff_eq(&alt_a.get::<meter>(), &alt_b.get::<meter>(), epsilon)
            }
            (Self::Euclidean(a), Self::Euclidean(b)) => {
                f64::abs_diff_eq(&a.x, &b.x, epsilon)
                    && f64::abs_diff_eq(&a.y, &b.y, epsilon)
                    && f64::abs_diff_eq(&a.z, &b.z, epsilon)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;
    use uom::si::length::nautical_mile;

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }
    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    #[test]
    fn lat_lon_rejects_out_of_range_latitude() {
        assert!(Position::lat_lon(d(90.1), d(0.), m(0.)).is_none());
        assert!(Position::lat_lon(d(-90.1), d(0.), m(0.)).is_none());
        assert!(Position::lat_lon(d(90.), d(0.), m(0.)).is_some());
    }

    #[test]
    fn mixed_frames_are_rejected() {
        let geo = Position::lat_lon(d(0.), d(0.), m(0.)).unwrap();
        let euc = Position::euclidean(m(0.), m(0.), m(0.));

        assert!(geo.horizontal_distance(&euc).is_none());
        assert!(geo.track_to(&euc).is_none());
        assert!(geo.interpolate(&euc, 0.5).is_none());
        assert!(geo.vertical_distance(&euc).is_none());
    }

    #[rstest]
    #[case(m(0.), m(100.), 0.)] // due north
    #[case(m(100.), m(0.), 90.)]
    #[case(m(0.), m(-100.), 180.)]
    #[case(m(-100.), m(0.), 270.)]
    #[case(m(100.), m(100.), 45.)]
    fn euclidean_track_is_compass_style(
        #[case] dx: Length,
        #[case] dy: Length,
        #[case] expected_degrees: f64,
    ) {
        let origin = Position::euclidean(m(0.), m(0.), m(0.));
        let target = Position::euclidean(dx, dy, m(0.));
        assert_relative_eq!(
            origin.track_to(&target).unwrap().get::<degree>(),
            expected_degrees,
            epsilon = 1e-9
        );
    }

    #[test]
    fn euclidean_project_round_trips() {
        let origin = Position::euclidean(m(10.), m(-20.), m(300.));
        let moved = origin.project(d(30.), m(500.));

        assert_relative_eq!(
            origin.horizontal_distance(&moved).unwrap().get::<meter>(),
            500.,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            origin.track_to(&moved).unwrap().get::<degree>(),
            30.,
            epsilon = 1e-9
        );
        // altitude untouched
        assert_eq!(moved.altitude(), m(300.));
    }

    #[test]
    fn interpolate_halfway_splits_distance_and_altitude() {
        let a = Position::lat_lon(d(40.), d(-75.), m(1000.)).unwrap();
        let b = Position::lat_lon(d(40.5), d(-75.), m(2000.)).unwrap();

        let mid = a.interpolate(&b, 0.5).unwrap();
        assert_relative_eq!(mid.altitude().get::<meter>(), 1500., epsilon = 1e-9);
        let d_am = a.horizontal_distance(&mid).unwrap();
        let d_ab = a.horizontal_distance(&b).unwrap();
        assert_relative_eq!(
            d_am.get::<nautical_mile>(),
            d_ab.get::<nautical_mile>() / 2.,
            epsilon = 1e-9
        );
    }

    #[test]
    fn interpolate_at_zero_distance_keeps_the_point() {
        let a = Position::euclidean(m(5.), m(5.), m(100.));
        let b = Position::euclidean(m(5.), m(5.), m(200.));
        let mid = a.interpolate(&b, 0.5).unwrap();
        assert_abs_diff_eq!(mid, Position::euclidean(m(5.), m(5.), m(150.)), epsilon = 1e-9);
    }

    #[rstest]
    #[case(m(50.), m(40.), m(50.), m(0.))] // projects onto the interior
    #[case(m(-10.), m(40.), m(0.), m(0.))] // clamped to the start
    #[case(m(150.), m(40.), m(100.), m(0.))] // clamped to the end
    fn closest_point_on_segment_clamps(
        #[case] px: Length,
        #[case] py: Length,
        #[case] expected_x: Length,
        #[case] expected_y: Length,
    ) {
        let a = Position::euclidean(m(0.), m(0.), m(0.));
        let b = Position::euclidean(m(100.), m(0.), m(0.));
        let p = Position::euclidean(px, py, m(0.));

        let closest = p.closest_point_on_segment(&a, &b).unwrap();
        assert_abs_diff_eq!(
            closest,
            Position::euclidean(expected_x, expected_y, m(0.)),
            epsilon = 1e-9
        );
    }
}
