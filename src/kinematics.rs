//! Closed-form constant-acceleration motion primitives.
//!
//! These are the numeric kernels underneath the query engine and the zone
//! generator: bank-limited turn geometry and the quadratic laws for
//! constant-acceleration speed and altitude changes. They work on raw SI
//! `f64` values where no frame is involved and on [`Position`] where one is.

use crate::Position;
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length, Time, Velocity as Speed};
use uom::si::length::meter;
use uom::si::time::second;
use uom::si::velocity::meter_per_second;

/// Standard gravity, m/s².
pub(crate) const GRAVITY: f64 = 9.806_65;

/// Computes the radius of a coordinated level turn flown at `speed` with the
/// given `bank` angle: `v² / (g·tan(bank))`.
///
/// Returns `None` when the bank angle is not in (0°, 90°).
#[must_use]
pub fn bank_turn_radius(speed: Speed, bank: Angle) -> Option<Length> {
    let bank = bank.get::<radian>();
    if bank <= 0. || bank >= core::f64::consts::FRAC_PI_2 {
        return None;
    }
    let v = speed.get::<meter_per_second>();
    Some(Length::new::<meter>(v * v / (GRAVITY * bank.tan())))
}

/// Computes the time spent in a turn of the given angular extent at constant
/// ground speed: `Δtrack · R / v`.
///
/// Returns `None` when the ground speed is not positive.
#[must_use]
pub fn turn_duration(track_delta: Angle, radius: Length, ground_speed: Speed) -> Option<Time> {
    let v = ground_speed.get::<meter_per_second>();
    if v <= 0. {
        return None;
    }
    Some(Time::new::<second>(
        track_delta.get::<radian>().abs() * radius.get::<meter>() / v,
    ))
}

/// Computes the turn center for an aircraft at `on_circle` flying compass
/// `track`, turning with the given signed radius (positive right).
///
/// The center sits at 90° to the track on the inside of the turn, at the
/// aircraft's altitude.
#[must_use]
pub(crate) fn center_from_radius(
    on_circle: &Position,
    track: Angle,
    signed_radius: Length,
) -> Position {
    let direction = if signed_radius.value >= 0. { 1.0 } else { -1.0 };
    on_circle.project(
        track + Angle::new::<radian>(direction * core::f64::consts::FRAC_PI_2),
        signed_radius.abs(),
    )
}

/// Advances a point along its turn circle by arc distance `dist` in the given
/// direction (`1.0` right, `-1.0` left).
///
/// Returns the new position (at `on_circle`'s altitude) and the outbound
/// compass track there. Returns `None` when the positions live in different
/// frames or coincide (no circle).
#[must_use]
pub(crate) fn turn_by_distance(
    center: &Position,
    on_circle: &Position,
    direction: f64,
    dist: Length,
) -> Option<(Position, Angle)> {
    let radius = center.horizontal_distance(on_circle)?;
    if radius.get::<meter>() <= 0. {
        return None;
    }
    let alpha = direction * dist.get::<meter>() / radius.get::<meter>();
    let radial = center.track_to(on_circle)? + Angle::new::<radian>(alpha);
    let position = center
        .project(radial, radius)
        .with_altitude(on_circle.altitude());
    let track = radial + Angle::new::<radian>(direction * core::f64::consts::FRAC_PI_2);
    Some((position, track))
}

/// Distance covered in `dt` seconds starting at speed `v0` under constant
/// acceleration `a` (all raw SI).
#[must_use]
pub(crate) fn accel_distance(v0: f64, a: f64, dt: f64) -> f64 {
    v0 * dt + 0.5 * a * dt * dt
}

/// Speed reached after `dt` seconds starting at `v0` under constant
/// acceleration `a` (all raw SI).
#[must_use]
pub(crate) fn accel_speed(v0: f64, a: f64, dt: f64) -> f64 {
    v0 + a * dt
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use uom::si::angle::degree;
    use uom::si::velocity::knot;

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }
    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    #[test]
    fn bank_turn_radius_matches_the_coordinated_turn_formula() {
        let speed = Speed::new::<knot>(180.);
        let radius = bank_turn_radius(speed, d(20.)).unwrap();

        let v = speed.get::<meter_per_second>();
        let expected = v * v / (GRAVITY * 20_f64.to_radians().tan());
        assert_relative_eq!(radius.get::<meter>(), expected, epsilon = 1e-9);
    }

    #[test]
    fn bank_turn_radius_rejects_degenerate_bank_angles() {
        let speed = Speed::new::<knot>(180.);
        assert!(bank_turn_radius(speed, d(0.)).is_none());
        assert!(bank_turn_radius(speed, d(-10.)).is_none());
        assert!(bank_turn_radius(speed, d(90.)).is_none());
    }

    #[test]
    fn turn_duration_is_arc_length_over_speed() {
        // quarter turn of a 1000 m circle at 50 m/s
        let t = turn_duration(d(90.), m(1000.), Speed::new::<meter_per_second>(50.)).unwrap();
        assert_relative_eq!(
            t.get::<second>(),
            core::f64::consts::FRAC_PI_2 * 1000. / 50.,
            epsilon = 1e-9
        );
    }

    #[test]
    fn center_sits_at_ninety_degrees_to_the_track() {
        // flying north, turning right: center due east
        let on_circle = Position::euclidean(m(0.), m(0.), m(100.));
        let center = center_from_radius(&on_circle, d(0.), m(500.));
        approx::assert_abs_diff_eq!(
            center,
            Position::euclidean(m(500.), m(0.), m(100.)),
            epsilon = 1e-9
        );

        // turning left: center due west
        let center = center_from_radius(&on_circle, d(0.), m(-500.));
        approx::assert_abs_diff_eq!(
            center,
            Position::euclidean(m(-500.), m(0.), m(100.)),
            epsilon = 1e-9
        );
    }

    #[test]
    fn quarter_circle_turn_lands_where_geometry_says() {
        // start due south of the center, flying east, turning left (counterclockwise
        // as seen from above shrinks the compass track)
        let center = Position::euclidean(m(0.), m(0.), m(0.));
        let start = Position::euclidean(m(0.), m(-1000.), m(0.));
        let quarter = m(core::f64::consts::FRAC_PI_2 * 1000.);

        let (pos, track) = turn_by_distance(&center, &start, -1.0, quarter).unwrap();
        approx::assert_abs_diff_eq!(pos, Position::euclidean(m(1000.), m(0.), m(0.)), epsilon = 1e-6);
        assert_relative_eq!(track.get::<degree>().rem_euclid(360.), 0., epsilon = 1e-6);
    }

    #[test]
    fn accel_kernels_are_the_quadratic_law() {
        assert_relative_eq!(accel_distance(10., 2., 3.), 39.);
        assert_relative_eq!(accel_speed(10., 2., 3.), 16.);
    }
}
