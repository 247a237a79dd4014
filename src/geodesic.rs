//! Spherical-earth great-circle primitives.
//!
//! The trajectory engine only needs a small, self-consistent set of geodesic
//! operations: surface distance, initial course, and "advance along a course
//! by a distance". They are all computed on a sphere whose radius is chosen so
//! that one nautical mile subtends exactly one minute of arc, which keeps
//! distance/angle conversions exact for aviation data.

use crate::util::BoundedAngle;
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

/// Radius of the navigation sphere, in meters.
///
/// Chosen such that 1 nmi (1852 m) of surface distance corresponds to exactly
/// 1 minute of arc, rather than any particular physical earth radius.
#[doc(alias = "R")]
// 1852 / (pi / (180 * 60))
pub(crate) const SPHERE_RADIUS: f64 = 1852.0 * 180.0 * 60.0 / core::f64::consts::PI;

/// Computes the central angle between two surface locations [using the
/// archaversine] (inverse haversine).
///
/// [using the archaversine]: https://en.wikipedia.org/wiki/Haversine_formula#Formulation
fn central_angle_by_inverse_haversine(
    latitude_a: Angle,
    latitude_b: Angle,
    longitude_a: Angle,
    longitude_b: Angle,
) -> f64 {
    let lat_a = latitude_a.get::<radian>();
    let lat_b = latitude_b.get::<radian>();

    let half_dlat = (lat_b - lat_a) / 2.;
    let half_dlon = (longitude_b - longitude_a).get::<radian>() / 2.;

    let h = half_dlat.sin().powi(2) + lat_a.cos() * lat_b.cos() * half_dlon.sin().powi(2);

    2. * h.sqrt().min(1.).asin()
}

/// Computes the great-circle surface distance between two locations.
///
/// Altitude is deliberately ignored; surface distance is the horizontal
/// distance notion used throughout the trajectory engine.
#[must_use]
pub(crate) fn surface_distance(
    latitude_a: Angle,
    longitude_a: Angle,
    latitude_b: Angle,
    longitude_b: Angle,
) -> Length {
    let central = central_angle_by_inverse_haversine(latitude_a, latitude_b, longitude_a, longitude_b);
    Length::new::<meter>(central * SPHERE_RADIUS)
}

/// Computes the initial course (compass track, clockwise from true north) of
/// the great circle from location `a` towards location `b`.
///
/// The returned angle is in [0°, 360°).
#[must_use]
pub(crate) fn initial_course(
    latitude_a: Angle,
    longitude_a: Angle,
    latitude_b: Angle,
    longitude_b: Angle,
) -> Angle {
    let lat_a = latitude_a.get::<radian>();
    let lat_b = latitude_b.get::<radian>();
    let dlon = (longitude_b - longitude_a).get::<radian>();

    let y = dlon.sin() * lat_b.cos();
    let x = lat_a.cos() * lat_b.sin() - lat_a.sin() * lat_b.cos() * dlon.cos();

    Angle::new::<radian>(BoundedAngle::new(Angle::new::<radian>(y.atan2(x))).get_bounded())
}

/// Computes the location reached by following the great circle with the given
/// initial `course` from `(latitude, longitude)` for surface distance `dist`.
///
/// Returns `(latitude, longitude)` with the latitude in [-90°, 90°] and the
/// longitude in [-180°, 180°).
#[must_use]
pub(crate) fn project_along_course(
    latitude: Angle,
    longitude: Angle,
    course: Angle,
    dist: Length,
) -> (Angle, Angle) {
    let lat = latitude.get::<radian>();
    let lon = longitude.get::<radian>();
    let trk = course.get::<radian>();
    let central = dist.get::<meter>() / SPHERE_RADIUS;

    let new_lat = (lat.sin() * central.cos() + lat.cos() * central.sin() * trk.cos()).asin();
    let new_lon = lon
        + (trk.sin() * central.sin() * lat.cos()).atan2(central.cos() - lat.sin() * new_lat.sin());

    (
        Angle::new::<radian>(new_lat),
        Angle::new::<radian>(BoundedAngle::new(Angle::new::<radian>(new_lon)).to_signed_range()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use uom::si::angle::degree;
    use uom::si::length::nautical_mile;

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    #[test]
    fn one_minute_of_arc_is_one_nautical_mile() {
        let dist = surface_distance(d(0.), d(0.), d(1. / 60.), d(0.));
        assert_relative_eq!(dist.get::<nautical_mile>(), 1., epsilon = 1e-9);
    }

    #[rstest]
    #[case(d(0.), d(0.), d(1.), d(0.), 0.)] // due north
    #[case(d(0.), d(0.), d(0.), d(1.), 90.)] // due east along the equator
    #[case(d(0.), d(0.), d(-1.), d(0.), 180.)]
    #[case(d(0.), d(0.), d(0.), d(-1.), 270.)]
    fn initial_course_cardinal_directions(
        #[case] lat_a: Angle,
        #[case] lon_a: Angle,
        #[case] lat_b: Angle,
        #[case] lon_b: Angle,
        #[case] expected_degrees: f64,
    ) {
        assert_relative_eq!(
            initial_course(lat_a, lon_a, lat_b, lon_b).get::<degree>(),
            expected_degrees,
            epsilon = 1e-9
        );
    }

    #[test]
    fn project_then_measure_round_trips() {
        let (lat, lon) = (d(42.0), d(-71.0));
        let course = d(37.0);
        let dist = Length::new::<nautical_mile>(25.0);

        let (lat2, lon2) = project_along_course(lat, lon, course, dist);

        assert_relative_eq!(
            surface_distance(lat, lon, lat2, lon2).get::<nautical_mile>(),
            25.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            initial_course(lat, lon, lat2, lon2).get::<degree>(),
            37.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn project_along_course_crossing_the_antimeridian() {
        let (_, lon) = project_along_course(d(0.), d(179.9), d(90.), Length::new::<nautical_mile>(30.));
        // came out the other side, still in signed range
        assert!(lon.get::<degree>() < -179.5);
    }
}
