//! The query side of [`Trajectory`]: position, velocity, speed profiles, and
//! distance/time conversions.
//!
//! Everything here is read-only. Queries on a degraded trajectory (one whose
//! diagnostics carry errors) still answer; the only hard failures are
//! structural: an out-of-window time, an out-of-range index, or a trajectory
//! too short to have the asked-for quantity.

use crate::diagnostics::Fault;
use crate::kinematics;
use crate::trajectory::Trajectory;
use crate::util::{self, BoundedAngle};
use crate::{Position, Velocity};
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length, Time, Velocity as Speed};
use uom::si::length::meter;
use uom::si::time::second;
use uom::si::velocity::meter_per_second;

impl Trajectory {
    fn out_of_window(&self, t: Time) -> Fault {
        let (first, last) = match self.window() {
            Some(w) => w,
            None => return Fault::TooShort,
        };
        Fault::TimeOutOfWindow {
            time: t.get::<second>(),
            first: first.get::<second>(),
            last: last.get::<second>(),
        }
    }

    fn require_segment(&self, ix: usize) -> Result<(), Fault> {
        if ix + 1 >= self.len() {
            return Err(Fault::IndexOutOfRange {
                index: ix,
                len: self.len(),
            });
        }
        Ok(())
    }

    /// The acceleration (m/s²) governing ground speed on segment `seg`, zero
    /// outside gs zones or when `linear` is set.
    fn gs_accel_on_segment(&self, seg: usize, linear: bool) -> f64 {
        if linear {
            return 0.;
        }
        self.segment_in_gs_change(seg)
            .and_then(|bgs| self.gs_accel(bgs))
            .map_or(0., |a| a.value)
    }

    fn vs_accel_on_segment(&self, seg: usize, linear: bool) -> f64 {
        if linear {
            return 0.;
        }
        self.segment_in_vs_change(seg)
            .and_then(|bvs| self.vs_accel(bvs))
            .map_or(0., |a| a.value)
    }

    /// The along-path length of segment `ix`: the arc length when the
    /// segment lies inside a turn, the horizontal distance otherwise.
    pub fn path_distance_segment(&self, ix: usize) -> Result<Length, Fault> {
        self.require_segment(ix)?;
        let a = self.point(ix).ok_or(Fault::TooShort)?.position();
        let b = self.point(ix + 1).ok_or(Fault::TooShort)?.position();
        if let Some(bot) = self.segment_in_turn(ix) {
            if let Some(arc) = self.turn_arc(bot) {
                let center = arc.center;
                let (ra, rb) = (center.track_to(&a), center.track_to(&b));
                if let (Some(ra), Some(rb)) = (ra, rb) {
                    let swept = util::track_delta(ra, rb);
                    return Ok(arc.radius() * swept.get::<radian>());
                }
            }
        }
        a.horizontal_distance(&b).ok_or(Fault::FrameMismatch)
    }

    /// The along-path length from point `i` to point `j`.
    pub fn path_distance_range(&self, i: usize, j: usize) -> Result<Length, Fault> {
        let mut total = Length::new::<meter>(0.);
        for ix in i..j {
            total += self.path_distance_segment(ix)?;
        }
        Ok(total)
    }

    /// The along-path length of the whole trajectory.
    pub fn path_distance(&self) -> Result<Length, Fault> {
        if self.len() < 2 {
            return Err(Fault::TooShort);
        }
        self.path_distance_range(0, self.len() - 1)
    }

    /// The along-path distance from the start of the trajectory to the
    /// position flown at time `t`.
    pub fn path_distance_to_time(&self, t: impl Into<Time>) -> Result<Length, Fault> {
        let t = t.into();
        let seg = self.segment_of_time(t).ok_or_else(|| self.out_of_window(t))?;
        let seg = seg.min(self.len().saturating_sub(2));
        let mut total = self.path_distance_range(0, seg)?;
        let dt = (t - self.time(seg)?).get::<second>();
        let v0 = self.gs_out(seg, false)?.get::<meter_per_second>();
        let a = self.gs_accel_on_segment(seg, false);
        total += Length::new::<meter>(kinematics::accel_distance(v0, a, dt));
        Ok(total)
    }

    /// The along-path distance left between the position flown at time `t`
    /// and the next waypoint (the end of the segment containing `t`).
    ///
    /// Times outside the trajectory's window yield zero. Inside a turn the
    /// remaining distance is measured along the arc.
    pub fn partial_path_distance(&self, t: impl Into<Time>, linear: bool) -> Result<Length, Fault> {
        let t = t.into();
        let Some(seg) = self.segment_of_time(t) else {
            return Ok(Length::new::<meter>(0.));
        };
        if seg + 1 >= self.len() {
            return Ok(Length::new::<meter>(0.));
        }
        let dt = (t - self.time(seg)?).get::<second>();
        let v0 = self.gs_out(seg, linear)?.get::<meter_per_second>();
        let a = self.gs_accel_on_segment(seg, linear);
        let covered = kinematics::accel_distance(v0, a, dt);
        let full = self.path_distance_segment(seg)?.get::<meter>();
        Ok(Length::new::<meter>((full - covered).max(0.)))
    }

    /// The ground speed flown out of point `ix` (over the segment that
    /// follows it). For the last point this is the speed the trajectory ends
    /// with.
    ///
    /// Inside a ground-speed zone the instantaneous speed varies; this is the
    /// speed at the segment start such that the stored acceleration
    /// reproduces the segment length. Negative results (possible only on
    /// inconsistent input) clamp to zero.
    pub fn gs_out(&self, ix: usize, linear: bool) -> Result<Speed, Fault> {
        if self.len() < 2 {
            return Err(Fault::TooShort);
        }
        if ix + 1 >= self.len() {
            return self.gs_final(self.len() - 2, linear);
        }
        let d = self.path_distance_segment(ix)?.get::<meter>();
        let dt = (self.time_seconds(ix + 1)? - self.time_seconds(ix)?).max(f64::MIN_POSITIVE);
        let a = self.gs_accel_on_segment(ix, linear);
        let gs = d / dt - 0.5 * a * dt;
        if gs < 0. {
            tracing::warn!(ix, gs, "negative ground speed clamped to zero");
            return Ok(Speed::new::<meter_per_second>(0.));
        }
        Ok(Speed::new::<meter_per_second>(gs))
    }

    /// The ground speed at the *end* of segment `ix`, i.e. arriving at point
    /// `ix + 1`.
    pub fn gs_final(&self, ix: usize, linear: bool) -> Result<Speed, Fault> {
        self.require_segment(ix)?;
        let d = self.path_distance_segment(ix)?.get::<meter>();
        let dt = (self.time_seconds(ix + 1)? - self.time_seconds(ix)?).max(f64::MIN_POSITIVE);
        let a = self.gs_accel_on_segment(ix, linear);
        Ok(Speed::new::<meter_per_second>((d / dt + 0.5 * a * dt).max(0.)))
    }

    /// The ground speed flown into point `ix` (the final speed of the
    /// segment before it).
    pub fn gs_in(&self, ix: usize, linear: bool) -> Result<Speed, Fault> {
        if ix == 0 {
            return self.gs_out(0, linear);
        }
        self.gs_final(ix - 1, linear)
    }

    /// The instantaneous ground speed at time `t`.
    pub fn gs_at_time(&self, t: impl Into<Time>, linear: bool) -> Result<Speed, Fault> {
        let t = t.into();
        let seg = self.segment_of_time(t).ok_or_else(|| self.out_of_window(t))?;
        let seg = seg.min(self.len().saturating_sub(2));
        let v0 = self.gs_out(seg, linear)?.get::<meter_per_second>();
        let a = self.gs_accel_on_segment(seg, linear);
        let dt = (t - self.time(seg)?).get::<second>();
        Ok(Speed::new::<meter_per_second>(
            kinematics::accel_speed(v0, a, dt).max(0.),
        ))
    }

    /// The vertical speed flown out of point `ix`.
    pub fn vs_out(&self, ix: usize, linear: bool) -> Result<Speed, Fault> {
        if self.len() < 2 {
            return Err(Fault::TooShort);
        }
        if ix + 1 >= self.len() {
            return self.vs_final(self.len() - 2, linear);
        }
        let a_pos = self.point(ix).ok_or(Fault::TooShort)?.position();
        let b_pos = self.point(ix + 1).ok_or(Fault::TooShort)?.position();
        let dz = (b_pos.altitude() - a_pos.altitude()).get::<meter>();
        let dt = (self.time_seconds(ix + 1)? - self.time_seconds(ix)?).max(f64::MIN_POSITIVE);
        let a = self.vs_accel_on_segment(ix, linear);
        Ok(Speed::new::<meter_per_second>(dz / dt - 0.5 * a * dt))
    }

    /// The vertical speed at the end of segment `ix`.
    pub fn vs_final(&self, ix: usize, linear: bool) -> Result<Speed, Fault> {
        self.require_segment(ix)?;
        let a_pos = self.point(ix).ok_or(Fault::TooShort)?.position();
        let b_pos = self.point(ix + 1).ok_or(Fault::TooShort)?.position();
        let dz = (b_pos.altitude() - a_pos.altitude()).get::<meter>();
        let dt = (self.time_seconds(ix + 1)? - self.time_seconds(ix)?).max(f64::MIN_POSITIVE);
        let a = self.vs_accel_on_segment(ix, linear);
        Ok(Speed::new::<meter_per_second>(dz / dt + 0.5 * a * dt))
    }

    /// The vertical speed flown into point `ix`.
    pub fn vs_in(&self, ix: usize, linear: bool) -> Result<Speed, Fault> {
        if ix == 0 {
            return self.vs_out(0, linear);
        }
        self.vs_final(ix - 1, linear)
    }

    /// The compass track flown out of point `ix`.
    ///
    /// Inside a turn the track is tangent to the stored circle; outside it is
    /// the course towards the next point.
    pub fn track_out(&self, ix: usize, linear: bool) -> Result<Angle, Fault> {
        if self.len() < 2 {
            return Err(Fault::TooShort);
        }
        if ix + 1 >= self.len() {
            return self.track_in(self.len() - 1, linear);
        }
        if !linear {
            if let Some(bot) = self.segment_in_turn(ix) {
                if let Some(arc) = self.turn_arc(bot) {
                    let p = self.point(ix).ok_or(Fault::TooShort)?.position();
                    let radial = arc.center.track_to(&p).ok_or(Fault::FrameMismatch)?;
                    let track = radial
                        + Angle::new::<radian>(arc.direction() * core::f64::consts::FRAC_PI_2);
                    return Ok(normalized(track));
                }
            }
        }
        let a = self.point(ix).ok_or(Fault::TooShort)?.position();
        let b = self.point(ix + 1).ok_or(Fault::TooShort)?.position();
        a.track_to(&b).ok_or(Fault::FrameMismatch)
    }

    /// The compass track flown into point `ix`.
    pub fn track_in(&self, ix: usize, linear: bool) -> Result<Angle, Fault> {
        if ix == 0 {
            return self.track_out(0, linear);
        }
        if !linear {
            // arriving at the end of a turn segment: tangent at this point
            if let Some(bot) = self.segment_in_turn(ix - 1) {
                if let Some(arc) = self.turn_arc(bot) {
                    let p = self.point(ix).ok_or(Fault::IndexOutOfRange {
                        index: ix,
                        len: self.len(),
                    })?
                    .position();
                    let radial = arc.center.track_to(&p).ok_or(Fault::FrameMismatch)?;
                    let track = radial
                        + Angle::new::<radian>(arc.direction() * core::f64::consts::FRAC_PI_2);
                    return Ok(normalized(track));
                }
            }
        }
        let a = self.point(ix - 1).ok_or(Fault::TooShort)?.position();
        let b = self.point(ix).ok_or(Fault::IndexOutOfRange {
            index: ix,
            len: self.len(),
        })?
        .position();
        a.track_to(&b).ok_or(Fault::FrameMismatch)
    }

    /// The velocity leaving point `ix`.
    pub fn initial_velocity(&self, ix: usize, linear: bool) -> Result<Velocity, Fault> {
        Ok(Velocity::new(
            self.track_out(ix, linear)?,
            self.gs_out(ix, linear)?,
            self.vs_out(ix, linear)?,
        ))
    }

    /// The velocity arriving at point `ix + 1` (the final velocity of
    /// segment `ix`).
    pub fn final_velocity(&self, ix: usize, linear: bool) -> Result<Velocity, Fault> {
        self.require_segment(ix)?;
        Ok(Velocity::new(
            self.track_in(ix + 1, linear)?,
            self.gs_final(ix, linear)?,
            self.vs_final(ix, linear)?,
        ))
    }

    /// The position flown at time `t`.
    ///
    /// On a single-point trajectory every in-window query returns that point.
    pub fn position_at(&self, t: impl Into<Time>, linear: bool) -> Result<Position, Fault> {
        let t = t.into();
        if self.len() == 1 {
            let only = self.point(0).ok_or(Fault::TooShort)?;
            if (t - only.time()).get::<second>().abs() < util::MIN_DT_SECONDS {
                return Ok(only.position());
            }
            return Err(self.out_of_window(t));
        }
        Ok(self.position_velocity(t, linear)?.0)
    }

    /// The velocity flown at time `t`.
    pub fn velocity_at(&self, t: impl Into<Time>, linear: bool) -> Result<Velocity, Fault> {
        Ok(self.position_velocity(t, linear)?.1)
    }

    /// The position and velocity flown at time `t`, honouring whatever
    /// acceleration zones contain `t` (unless `linear` is set, which
    /// evaluates the underlying constant-velocity profile instead).
    ///
    /// Horizontal and vertical motion compose independently: `t` may sit
    /// inside a turn, a ground-speed change, and a vertical-speed change all
    /// at once.
    pub fn position_velocity(
        &self,
        t: impl Into<Time>,
        linear: bool,
    ) -> Result<(Position, Velocity), Fault> {
        let t = t.into();
        if self.len() < 2 {
            return Err(Fault::TooShort);
        }
        let seg = self.segment_of_time(t).ok_or_else(|| self.out_of_window(t))?;
        // a query at exactly the last time evaluates the last segment
        let seg = seg.min(self.len() - 2);
        let dt = (t - self.time(seg)?).get::<second>();
        let here = self.point(seg).ok_or(Fault::TooShort)?.position();

        // horizontal
        let v0 = self.gs_out(seg, linear)?.get::<meter_per_second>();
        let gs_a = self.gs_accel_on_segment(seg, linear);
        let dist = Length::new::<meter>(kinematics::accel_distance(v0, gs_a, dt));
        let gs = kinematics::accel_speed(v0, gs_a, dt).max(0.);

        let (pos2d, track) = match (linear, self.segment_in_turn(seg)) {
            (false, Some(bot)) => {
                let arc = self.turn_arc(bot).ok_or(Fault::InvariantViolation {
                    index: bot,
                    reason: "turn zone without stored arc".into(),
                })?;
                kinematics::turn_by_distance(&arc.center, &here, arc.direction(), dist)
                    .ok_or(Fault::FrameMismatch)?
            }
            _ => {
                let track = self.track_out(seg, linear)?;
                (here.project(track, dist), track)
            }
        };

        // vertical, independent of the horizontal zones
        let vs0 = self.vs_out(seg, linear)?.get::<meter_per_second>();
        let vs_a = self.vs_accel_on_segment(seg, linear);
        let alt = here.altitude() + Length::new::<meter>(kinematics::accel_distance(vs0, vs_a, dt));
        let vs = kinematics::accel_speed(vs0, vs_a, dt);

        Ok((
            pos2d.with_altitude(alt),
            Velocity::new(
                track,
                Speed::new::<meter_per_second>(gs),
                Speed::new::<meter_per_second>(vs),
            ),
        ))
    }

    /// The time at which the trajectory has covered along-path distance `d`
    /// from its start.
    pub fn time_from_distance(&self, d: impl Into<Length>) -> Result<Time, Fault> {
        let d = d.into();
        let mut remaining = d.get::<meter>();
        if remaining < 0. {
            return Err(Fault::DistanceOutOfRange(remaining));
        }
        for seg in 0..self.len().saturating_sub(1) {
            let len = self.path_distance_segment(seg)?.get::<meter>();
            if remaining > len {
                remaining -= len;
                continue;
            }
            let v0 = self.gs_out(seg, false)?.get::<meter_per_second>();
            let a = self.gs_accel_on_segment(seg, false);
            let dt = util::time_to_distance(v0, a, remaining)
                .ok_or(Fault::DistanceOutOfRange(d.get::<meter>()))?;
            return Ok(self.time(seg)? + Time::new::<second>(dt));
        }
        Err(Fault::DistanceOutOfRange(d.get::<meter>()))
    }

    /// The position reached after covering along-path distance `d` from the
    /// start, together with the index of the segment it falls on.
    pub fn advance_distance(
        &self,
        d: impl Into<Length>,
        linear: bool,
    ) -> Result<(Position, usize), Fault> {
        let d = d.into();
        let mut remaining = d.get::<meter>();
        if remaining < 0. {
            return Err(Fault::DistanceOutOfRange(remaining));
        }
        for seg in 0..self.len().saturating_sub(1) {
            let len = self.path_distance_segment(seg)?.get::<meter>();
            if remaining > len {
                remaining -= len;
                continue;
            }
            let here = self.point(seg).ok_or(Fault::TooShort)?.position();
            let next = self.point(seg + 1).ok_or(Fault::TooShort)?.position();
            let fraction = if len > 0. { remaining / len } else { 0. };
            let alt = here.altitude() + (next.altitude() - here.altitude()) * fraction;
            let pos = match (linear, self.segment_in_turn(seg)) {
                (false, Some(bot)) => {
                    let arc = self.turn_arc(bot).ok_or(Fault::InvariantViolation {
                        index: bot,
                        reason: "turn zone without stored arc".into(),
                    })?;
                    kinematics::turn_by_distance(
                        &arc.center,
                        &here,
                        arc.direction(),
                        Length::new::<meter>(remaining),
                    )
                    .ok_or(Fault::FrameMismatch)?
                    .0
                }
                _ => {
                    let track = self.track_out(seg, linear)?;
                    here.project(track, Length::new::<meter>(remaining))
                }
            };
            return Ok((pos.with_altitude(alt), seg));
        }
        Err(Fault::DistanceOutOfRange(d.get::<meter>()))
    }

    /// The average ground speed over points `i..=j`.
    pub fn average_ground_speed(&self, i: usize, j: usize) -> Result<Speed, Fault> {
        if j <= i {
            return Err(Fault::IndexOutOfRange {
                index: j,
                len: self.len(),
            });
        }
        let d = self.path_distance_range(i, j)?;
        let dt = self.time(j)? - self.time(i)?;
        Ok(d / dt)
    }

    /// The signed altitude change from point `i` to point `j`.
    pub fn vert_distance(&self, i: usize, j: usize) -> Result<Length, Fault> {
        let a = self.point(i).ok_or(Fault::IndexOutOfRange {
            index: i,
            len: self.len(),
        })?;
        let b = self.point(j).ok_or(Fault::IndexOutOfRange {
            index: j,
            len: self.len(),
        })?;
        a.position()
            .vertical_distance(&b.position())
            .ok_or(Fault::FrameMismatch)
    }

    /// The point of this trajectory's path closest (horizontally) to
    /// `target`, searched over all segments.
    pub fn closest_point_horizontal(&self, target: &Position) -> Result<Position, Fault> {
        if self.len() < 2 {
            return Err(Fault::TooShort);
        }
        let mut best: Option<(Length, Position)> = None;
        for seg in 0..self.len() - 1 {
            let a = self.point(seg).ok_or(Fault::TooShort)?.position();
            let b = self.point(seg + 1).ok_or(Fault::TooShort)?.position();
            let candidate = target
                .closest_point_on_segment(&a, &b)
                .ok_or(Fault::FrameMismatch)?;
            let d = target
                .horizontal_distance(&candidate)
                .ok_or(Fault::FrameMismatch)?;
            if best.as_ref().map_or(true, |(bd, _)| d < *bd) {
                best = Some((d, candidate));
            }
        }
        Ok(best.map(|(_, p)| p).ok_or(Fault::TooShort)?)
    }
}

fn normalized(track: Angle) -> Angle {
    Angle::new::<radian>(BoundedAngle::new(track).get_bounded())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::{GsRole, TurnArc, TurnRole, VsRole, ZoneTag};
    use crate::{Trajectory, Waypoint};
    use approx::assert_relative_eq;
    use uom::si::acceleration::meter_per_second_squared;
    use uom::si::angle::degree;
    use uom::si::f64::Acceleration;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }
    fn s(seconds: f64) -> Time {
        Time::new::<second>(seconds)
    }
    fn acc(a: f64) -> Acceleration {
        Acceleration::new::<meter_per_second_squared>(a)
    }
    fn wp(x: f64, y: f64, z: f64, t: f64) -> Waypoint {
        Waypoint::new(Position::euclidean(m(x), m(y), m(z)), s(t)).unwrap()
    }

    /// v0 = 10 m/s, a = 1 m/s² for 10 s: 150 m covered, 20 m/s reached.
    fn gs_zone_plan() -> Trajectory {
        let mut plan = Trajectory::new();
        plan.insert_with_tag(
            wp(0., 0., 0., 0.),
            ZoneTag::none().with_gs(GsRole::Bgs { accel: acc(1.) }),
        )
        .unwrap();
        plan.insert_with_tag(wp(0., 150., 0., 10.), ZoneTag::none().with_gs(GsRole::Egs))
            .unwrap();
        plan.insert(wp(0., 350., 0., 20.)).unwrap();
        plan
    }

    /// Quarter right turn: north to east around a 1000 m circle at 100 m/s.
    fn turn_zone_plan() -> Trajectory {
        let quarter_time = core::f64::consts::FRAC_PI_2 * 1000. / 100.;
        let mut plan = Trajectory::new();
        plan.insert_with_tag(
            wp(0., 0., 0., 0.),
            ZoneTag::none().with_turn(TurnRole::Bot(TurnArc {
                signed_radius: m(1000.),
                center: Position::euclidean(m(1000.), m(0.), m(0.)),
            })),
        )
        .unwrap();
        plan.insert_with_tag(
            wp(1000., 1000., 0., quarter_time),
            ZoneTag::none().with_turn(TurnRole::Eot),
        )
        .unwrap();
        plan
    }

    #[test]
    fn gs_profile_recovers_the_boundary_speeds() {
        let plan = gs_zone_plan();
        assert_relative_eq!(plan.gs_out(0, false).unwrap().get::<meter_per_second>(), 10., epsilon = 1e-9);
        assert_relative_eq!(plan.gs_in(1, false).unwrap().get::<meter_per_second>(), 20., epsilon = 1e-9);
        assert_relative_eq!(plan.gs_out(1, false).unwrap().get::<meter_per_second>(), 20., epsilon = 1e-9);
        // the linear profile ignores the zone
        assert_relative_eq!(plan.gs_out(0, true).unwrap().get::<meter_per_second>(), 15., epsilon = 1e-9);
    }

    #[test]
    fn gs_at_time_ramps_inside_the_zone() {
        let plan = gs_zone_plan();
        assert_relative_eq!(
            plan.gs_at_time(s(5.), false).unwrap().get::<meter_per_second>(),
            15.,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            plan.gs_at_time(s(15.), false).unwrap().get::<meter_per_second>(),
            20.,
            epsilon = 1e-9
        );
    }

    #[test]
    fn position_inside_a_gs_zone_follows_the_quadratic_law() {
        let plan = gs_zone_plan();
        let (pos, vel) = plan.position_velocity(s(5.), false).unwrap();
        // d = 10*5 + 0.5*1*25 = 62.5 m due north
        approx::assert_abs_diff_eq!(pos, Position::euclidean(m(0.), m(62.5), m(0.)), epsilon = 1e-6);
        assert_relative_eq!(vel.ground_speed().get::<meter_per_second>(), 15., epsilon = 1e-9);
    }

    #[test]
    fn partial_path_distance_counts_down_to_the_next_waypoint() {
        let plan = gs_zone_plan();
        // at t = 5 the zone has covered 10*5 + 0.5*1*25 = 62.5 of its 150 m
        assert_relative_eq!(
            plan.partial_path_distance(s(5.), false).unwrap().get::<meter>(),
            87.5,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            plan.partial_path_distance(s(0.), false).unwrap().get::<meter>(),
            150.,
            epsilon = 1e-9
        );
        // outside the window there is nothing left to fly
        assert_relative_eq!(
            plan.partial_path_distance(s(-1.), false).unwrap().get::<meter>(),
            0.
        );
        assert_relative_eq!(
            plan.partial_path_distance(s(20.), false).unwrap().get::<meter>(),
            0.
        );

        // inside a turn the remainder is measured along the arc
        let plan = turn_zone_plan();
        let arc = core::f64::consts::FRAC_PI_2 * 1000.;
        let half_time = arc / 100. / 2.;
        assert_relative_eq!(
            plan.partial_path_distance(s(half_time), false).unwrap().get::<meter>(),
            arc / 2.,
            epsilon = 1e-6
        );
    }

    #[test]
    fn turn_zone_path_distance_is_the_arc_not_the_chord() {
        let plan = turn_zone_plan();
        let arc = core::f64::consts::FRAC_PI_2 * 1000.;
        assert_relative_eq!(
            plan.path_distance_segment(0).unwrap().get::<meter>(),
            arc,
            epsilon = 1e-6
        );
    }

    #[test]
    fn adjoining_turns_are_each_queried_against_their_own_arc() {
        // right 90° around (1000, 0) then left 90° around (1000, 2000), the
        // shared point at (1000, 1000) ending one arc and beginning the next
        let qt = core::f64::consts::FRAC_PI_2 * 1000. / 100.;
        let mut plan = Trajectory::new();
        plan.insert(wp(0., -1000., 0., 0.)).unwrap();
        plan.insert_with_tag(
            wp(0., 0., 0., 10.),
            ZoneTag::none().with_turn(TurnRole::Bot(TurnArc {
                signed_radius: m(1000.),
                center: Position::euclidean(m(1000.), m(0.), m(0.)),
            })),
        )
        .unwrap();
        plan.insert_with_tag(
            wp(1000., 1000., 0., 10. + qt),
            ZoneTag::none().with_turn(TurnRole::EotBot(TurnArc {
                signed_radius: m(-1000.),
                center: Position::euclidean(m(1000.), m(2000.), m(0.)),
            })),
        )
        .unwrap();
        plan.insert_with_tag(
            wp(2000., 2000., 0., 10. + 2. * qt),
            ZoneTag::none().with_turn(TurnRole::Eot),
        )
        .unwrap();
        plan.insert(wp(2000., 3000., 0., 20. + 2. * qt)).unwrap();

        let r = 1000. / 2_f64.sqrt();
        let (pos, vel) = plan.position_velocity(s(10. + qt / 2.), false).unwrap();
        approx::assert_abs_diff_eq!(
            pos,
            Position::euclidean(m(1000. - r), m(r), m(0.)),
            epsilon = 1e-6
        );
        assert_relative_eq!(vel.track().get::<degree>(), 45., epsilon = 0.01);

        let (pos, vel) = plan.position_velocity(s(10. + 1.5 * qt), false).unwrap();
        approx::assert_abs_diff_eq!(
            pos,
            Position::euclidean(m(1000. + r), m(2000. - r), m(0.)),
            epsilon = 1e-6
        );
        assert_relative_eq!(vel.track().get::<degree>(), 45., epsilon = 0.01);
    }

    #[test]
    fn mid_turn_track_matches_the_designed_tangent() {
        let plan = turn_zone_plan();
        let half = core::f64::consts::FRAC_PI_2 * 1000. / 100. / 2.;
        let (pos, vel) = plan.position_velocity(s(half), false).unwrap();

        assert_relative_eq!(vel.track().get::<degree>(), 45., epsilon = 0.01);
        let expected = Position::euclidean(
            m(1000. - 1000. / 2_f64.sqrt()),
            m(1000. / 2_f64.sqrt()),
            m(0.),
        );
        approx::assert_abs_diff_eq!(pos, expected, epsilon = 1e-6);
    }

    #[test]
    fn track_in_at_the_eot_is_the_exit_tangent() {
        let plan = turn_zone_plan();
        assert_relative_eq!(plan.track_in(1, false).unwrap().get::<degree>(), 90., epsilon = 1e-6);
        assert_relative_eq!(plan.track_out(0, false).unwrap().get::<degree>(), 0., epsilon = 1e-6);
    }

    #[test]
    fn out_of_window_queries_fail_without_panicking() {
        let plan = gs_zone_plan();
        assert!(matches!(
            plan.position_at(s(-1.), false),
            Err(Fault::TimeOutOfWindow { .. })
        ));
        assert!(matches!(
            plan.position_at(s(21.), false),
            Err(Fault::TimeOutOfWindow { .. })
        ));
        // the window boundary itself answers
        assert!(plan.position_at(s(20.), false).is_ok());
    }

    #[test]
    fn single_point_trajectory_returns_the_point_without_velocity() {
        let mut plan = Trajectory::new();
        plan.insert(wp(5., 5., 100., 10.)).unwrap();
        let pos = plan.position_at(s(10.), false).unwrap();
        approx::assert_abs_diff_eq!(pos, Position::euclidean(m(5.), m(5.), m(100.)), epsilon = 1e-9);
        assert!(matches!(plan.velocity_at(s(10.), false), Err(Fault::TooShort)));
    }

    #[test]
    fn time_from_distance_inverts_path_distance_to_time() {
        let plan = gs_zone_plan();
        // 62.5 m is reached at t = 5 inside the accel zone
        let t = plan.time_from_distance(m(62.5)).unwrap();
        assert_relative_eq!(t.get::<second>(), 5., epsilon = 1e-9);
        // and 150 + 100 = 250 m is 5 s into the constant 20 m/s segment
        let t = plan.time_from_distance(m(250.)).unwrap();
        assert_relative_eq!(t.get::<second>(), 15., epsilon = 1e-9);

        let d = plan.path_distance_to_time(s(15.)).unwrap();
        assert_relative_eq!(d.get::<meter>(), 250., epsilon = 1e-9);
    }

    #[test]
    fn advance_distance_lands_on_the_turn_arc() {
        let plan = turn_zone_plan();
        let eighth = core::f64::consts::FRAC_PI_2 * 1000. / 2.;
        let (pos, seg) = plan.advance_distance(m(eighth), false).unwrap();
        assert_eq!(seg, 0);
        let expected = Position::euclidean(
            m(1000. - 1000. / 2_f64.sqrt()),
            m(1000. / 2_f64.sqrt()),
            m(0.),
        );
        approx::assert_abs_diff_eq!(pos, expected, epsilon = 1e-6);
    }

    #[test]
    fn vertical_zone_is_independent_of_horizontal_motion() {
        // climb from 0 at 0 m/s vs to 10 m/s over 10 s: 50 m gained
        let mut plan = Trajectory::new();
        plan.insert_with_tag(
            wp(0., 0., 0., 0.),
            ZoneTag::none().with_vs(VsRole::Bvs { accel: acc(1.) }),
        )
        .unwrap();
        plan.insert_with_tag(wp(0., 1000., 50., 10.), ZoneTag::none().with_vs(VsRole::Evs))
            .unwrap();

        assert_relative_eq!(plan.vs_out(0, false).unwrap().get::<meter_per_second>(), 0., epsilon = 1e-9);
        assert_relative_eq!(plan.vs_in(1, false).unwrap().get::<meter_per_second>(), 10., epsilon = 1e-9);

        let (pos, vel) = plan.position_velocity(s(5.), false).unwrap();
        assert_relative_eq!(pos.altitude().get::<meter>(), 12.5, epsilon = 1e-9);
        assert_relative_eq!(vel.vertical_speed().get::<meter_per_second>(), 5., epsilon = 1e-9);
        // horizontal motion stays linear
        assert_relative_eq!(vel.ground_speed().get::<meter_per_second>(), 100., epsilon = 1e-9);
    }

    #[test]
    fn closest_point_searches_every_segment() {
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 0., 0.)).unwrap();
        plan.insert(wp(100., 0., 0., 10.)).unwrap();
        plan.insert(wp(100., 100., 0., 20.)).unwrap();

        let target = Position::euclidean(m(90.), m(50.), m(0.));
        let closest = plan.closest_point_horizontal(&target).unwrap();
        approx::assert_abs_diff_eq!(
            closest,
            Position::euclidean(m(100.), m(50.), m(0.)),
            epsilon = 1e-9
        );
    }
}
