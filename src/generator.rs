//! The zone generator: turns a linear trajectory (instantaneous velocity
//! changes at every waypoint) into a kinematically flyable one with turn,
//! ground-speed, and vertical-speed acceleration zones.
//!
//! Generation never mutates its input. On infeasible input the returned
//! trajectory is a copy of the input with the fault recorded in its
//! diagnostics; with the per-stage repair flag set, the offending change is
//! skipped (left instantaneous) with a logged warning and generation
//! continues.

use crate::diagnostics::Fault;
use crate::kinematics;
use crate::trajectory::Trajectory;
use crate::util::{self, MIN_DT_SECONDS};
use crate::zone::{GsRole, TurnArc, TurnRole, VsRole, ZoneTag};
use crate::{Velocity, Waypoint};
use uom::si::acceleration::meter_per_second_squared;
use uom::si::angle::{degree, radian};
use uom::si::f64::{Acceleration, Angle, Length, Time, Velocity as Speed};
use uom::si::length::{foot, meter};
use uom::si::time::second;
use uom::si::velocity::{foot_per_minute, knot, meter_per_second};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Altitudes outside this band reject vertical-speed generation outright.
const MAX_ALTITUDE_FT: f64 = 60_000.;

/// Vertical speeds beyond this draw a warning but do not reject.
const MAX_VS_FPM: f64 = 10_000.;

/// All tunables of the zone generator, passed explicitly into every
/// generation call. There is no process-wide state.
///
/// The minimum-delta fields control which velocity discontinuities are large
/// enough to deserve an acceleration zone; smaller ones stay instantaneous.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneratorConfig {
    /// Bank angle of coordinated turns; fixes the turn radius via
    /// `v²/(g·tan(bank))`.
    pub bank_angle: Angle,
    /// Magnitude of the ground-speed acceleration applied in gs zones.
    pub gs_accel: Acceleration,
    /// Magnitude of the vertical-speed acceleration applied in vs zones.
    pub vs_accel: Acceleration,
    /// Skip infeasible turns (leaving them instantaneous) instead of failing
    /// the whole generation.
    pub repair_turn: bool,
    pub repair_gs: bool,
    pub repair_vs: bool,
    /// Track changes below this stay instantaneous.
    pub min_track_delta: Angle,
    /// Ground-speed changes below this stay instantaneous.
    pub min_gs_delta: Speed,
    /// Vertical-speed changes below this stay instantaneous.
    pub min_vs_delta: Speed,
    /// Zones shorter than this are not worth modelling.
    pub min_accel_time: Time,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            bank_angle: Angle::new::<degree>(25.),
            gs_accel: Acceleration::new::<meter_per_second_squared>(2.),
            vs_accel: Acceleration::new::<meter_per_second_squared>(1.),
            repair_turn: false,
            repair_gs: false,
            repair_vs: false,
            min_track_delta: Angle::new::<degree>(1.),
            min_gs_delta: Speed::new::<knot>(10.),
            min_vs_delta: Speed::new::<foot_per_minute>(200.),
            min_accel_time: Time::new::<second>(1.),
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub fn with_bank_angle(mut self, bank_angle: impl Into<Angle>) -> Self {
        self.bank_angle = bank_angle.into();
        self
    }

    #[must_use]
    pub fn with_gs_accel(mut self, gs_accel: impl Into<Acceleration>) -> Self {
        self.gs_accel = gs_accel.into();
        self
    }

    #[must_use]
    pub fn with_vs_accel(mut self, vs_accel: impl Into<Acceleration>) -> Self {
        self.vs_accel = vs_accel.into();
        self
    }

    #[must_use]
    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair_turn = repair;
        self.repair_gs = repair;
        self.repair_vs = repair;
        self
    }
}

/// Stamps every point with its linear pedigree so reversion can find its way
/// back: the original flag, the linear index, and an independent copy of the
/// source waypoint.
fn mark_linear_source(plan: &mut Trajectory) {
    for ix in 0..plan.len() {
        let wp = plan.points[ix].waypoint.clone();
        let tag = plan.points[ix]
            .tag
            .clone()
            .with_original(true)
            .with_source(Some(wp))
            .with_linear_index(Some(ix));
        plan.points[ix].tag = tag;
    }
}

/// Inserts turn zones at every interior vertex whose course change exceeds
/// the configured minimum.
///
/// Each qualifying vertex is replaced by a BOT/MOT/EOT triple: tangent points
/// at `R·tan(θ/2)` back along the incoming leg and forward along the outgoing
/// one, with the vertex itself relocated onto the arc as the mid-of-turn
/// point. The arc is flown at the incoming ground speed, so all points after
/// the vertex move earlier by the time the shorter arced path saves.
#[must_use]
pub fn generate_turn_tcps(source: &Trajectory, config: &GeneratorConfig) -> Trajectory {
    let mut plan = source.clone();
    mark_linear_source(&mut plan);
    if plan.len() < 3 {
        return plan;
    }
    // reverse order so that each turn can check against the (already
    // generated) turn that follows it
    for ix in (1..plan.len() - 1).rev() {
        match insert_turn(&mut plan, ix, config) {
            Ok(_) => {}
            Err(fault) => {
                if config.repair_turn {
                    plan.diagnostics_mut()
                        .warn(Some(ix), format!("skipped infeasible turn: {fault}"));
                } else {
                    let mut failed = source.clone();
                    failed.diagnostics_mut().fault(&fault);
                    return failed;
                }
            }
        }
    }
    plan
}

/// Validates and, if feasible, performs the turn insertion at vertex `ix`.
/// All validation happens before the first mutation.
fn insert_turn(plan: &mut Trajectory, ix: usize, config: &GeneratorConfig) -> Result<bool, Fault> {
    let infeasible = |reason: &str| Fault::InfeasibleTurn {
        index: ix,
        reason: reason.into(),
    };

    let p1 = plan.point(ix - 1).ok_or(Fault::TooShort)?.position();
    let p2 = plan.point(ix).ok_or(Fault::TooShort)?.position();
    let p3 = plan.point(ix + 1).ok_or(Fault::TooShort)?.position();

    // course into and out of the vertex, both measured at the vertex
    let trk_in = p2.track_to(&p1).ok_or(Fault::FrameMismatch)?
        + Angle::new::<radian>(core::f64::consts::PI);
    let trk_out = p2.track_to(&p3).ok_or(Fault::FrameMismatch)?;
    let delta = util::track_delta(trk_in, trk_out);
    if delta < config.min_track_delta {
        return Ok(false);
    }
    let direction = util::turn_direction(trk_in, trk_out);

    let gs_in = plan.gs_in(ix, true)?;
    if gs_in.get::<meter_per_second>() <= 0. {
        return Err(infeasible("no ground speed into the vertex"));
    }
    let radius =
        kinematics::bank_turn_radius(gs_in, config.bank_angle).ok_or_else(|| infeasible(
            "bank angle outside (0°, 90°)",
        ))?;
    let turn_time = kinematics::turn_duration(delta, radius, gs_in)
        .ok_or_else(|| infeasible("no ground speed into the vertex"))?;
    if turn_time < config.min_accel_time {
        return Ok(false);
    }

    let offset = radius * (delta.get::<radian>() / 2.).tan();
    let d21 = p2.horizontal_distance(&p1).ok_or(Fault::FrameMismatch)?;
    let d23 = p2.horizontal_distance(&p3).ok_or(Fault::FrameMismatch)?;
    if offset >= d21 || offset >= d23 {
        return Err(infeasible("legs too short for the turn radius"));
    }

    // the turn is flown at the incoming ground speed, so the boundary times
    // follow from path distances; everything after the vertex shifts by the
    // time the shorter arced path saves
    let t1 = plan.time_seconds(ix - 1)?;
    let t2 = plan.time_seconds(ix)?;
    let t3 = plan.time_seconds(ix + 1)?;
    let v1 = gs_in.get::<meter_per_second>();
    let v2 = plan.gs_out(ix, true)?.get::<meter_per_second>();
    if v2 <= 0. {
        return Err(infeasible("no ground speed out of the vertex"));
    }
    let arc_len = radius.get::<meter>() * delta.get::<radian>();
    let t_bot = t2 - offset.get::<meter>() / v1;
    let t_mot = t_bot + arc_len / (2. * v1);
    let t_eot = t_bot + arc_len / v1;
    if t_bot <= t1 + MIN_DT_SECONDS {
        return Err(infeasible("turn reaches back past the previous point"));
    }
    let dt_out = (d23 - offset).get::<meter>() / v2;
    if dt_out <= MIN_DT_SECONDS {
        return Err(infeasible("turn reaches past the next point"));
    }
    if t_eot + dt_out <= t2 + MIN_DT_SECONDS {
        return Err(infeasible("turn arc leaves no room before the next point"));
    }
    let shift = t_eot + dt_out - t3;

    let bot_pos = p2.project(trk_in + Angle::new::<radian>(core::f64::consts::PI), offset);
    let eot_pos = p2.project(trk_out, offset);
    let signed_radius = radius * direction;
    let center = kinematics::center_from_radius(&bot_pos, trk_in, signed_radius);
    let mot_track = center.track_to(&p2).ok_or(Fault::FrameMismatch)?;
    let mot_pos = center.project(mot_track, radius);

    // altitudes follow the linear vertical profile of the adjacent legs,
    // parameterized by distance so retiming cannot skew them
    let alt2 = p2.altitude();
    let alt_bot = alt2 - (alt2 - p1.altitude()) * (offset.get::<meter>() / d21.get::<meter>());
    let alt_eot = alt2 + (p3.altitude() - alt2) * (offset.get::<meter>() / d23.get::<meter>());

    let vertex = plan.points[ix].waypoint.clone();
    let pedigree = plan.points[ix].tag.clone();
    let arc = TurnArc {
        signed_radius,
        center,
    };

    plan.time_shift_from(ix + 1, Time::new::<second>(shift))?;
    plan.remove(ix)?;
    let bot = Waypoint::new(bot_pos.with_altitude(alt_bot), Time::new::<second>(t_bot))
        .ok_or(Fault::InvalidTime(t_bot))?;
    plan.insert_with_tag(
        bot,
        ZoneTag::none()
            .with_turn(TurnRole::Bot(arc))
            .with_source(pedigree.source().cloned())
            .with_linear_index(pedigree.linear_index()),
    )
    .ok_or_else(|| infeasible("could not insert begin-of-turn"))?;

    let mut mot = Waypoint::new(mot_pos.with_altitude(p2.altitude()), Time::new::<second>(t_mot))
        .ok_or(Fault::InvalidTime(t_mot))?;
    if let Some(name) = vertex.name() {
        mot = mot.with_name(Some(name.to_owned()));
    }
    plan.insert_with_tag(
        mot,
        ZoneTag::none()
            .with_mid_of_turn(true)
            .with_original(pedigree.is_original())
            .with_source(pedigree.source().cloned())
            .with_linear_index(pedigree.linear_index()),
    )
    .ok_or_else(|| infeasible("could not insert mid-of-turn"))?;

    let eot = Waypoint::new(eot_pos.with_altitude(alt_eot), Time::new::<second>(t_eot))
        .ok_or(Fault::InvalidTime(t_eot))?;
    plan.insert_with_tag(
        eot,
        ZoneTag::none()
            .with_turn(TurnRole::Eot)
            .with_source(pedigree.source().cloned())
            .with_linear_index(pedigree.linear_index()),
    )
    .ok_or_else(|| infeasible("could not insert end-of-turn"))?;

    tracing::debug!(
        ix,
        radius_m = radius.get::<meter>(),
        turn_time_s = turn_time.get::<second>(),
        "inserted turn zone"
    );
    Ok(true)
}

/// Inserts ground-speed change zones wherever the ground speed entering a
/// point differs from the speed of the segment leaving it by more than the
/// configured minimum.
///
/// `initial_gs` is the aircraft's actual current ground speed; when given,
/// the first point may begin an acceleration zone from it onto the plan's
/// first-leg speed. Points after each inserted zone are retimed so positions
/// are preserved.
#[must_use]
pub fn generate_gs_tcps(
    source: &Trajectory,
    initial_gs: Option<Speed>,
    config: &GeneratorConfig,
) -> Trajectory {
    let mut plan = source.clone();
    if plan.len() < 2 {
        return plan;
    }
    let mut ix = 0;
    while ix + 1 < plan.len() {
        match insert_gs_change(&mut plan, ix, initial_gs, config) {
            Ok(true) => ix += 2, // skip past the inserted EGS
            Ok(false) => ix += 1,
            Err(fault) => {
                if config.repair_gs {
                    plan.diagnostics_mut()
                        .warn(Some(ix), format!("skipped infeasible ground-speed change: {fault}"));
                    ix += 1;
                } else {
                    let mut failed = source.clone();
                    failed.diagnostics_mut().fault(&fault);
                    return failed;
                }
            }
        }
    }
    plan
}

fn insert_gs_change(
    plan: &mut Trajectory,
    ix: usize,
    initial_gs: Option<Speed>,
    config: &GeneratorConfig,
) -> Result<bool, Fault> {
    let infeasible = |reason: &str| Fault::InfeasibleGsChange {
        index: ix,
        reason: reason.into(),
    };

    // speed changes attach at zone boundaries, never inside an arc or an
    // existing gs zone
    if plan.segment_in_turn(ix).is_some() && !plan.is_eot(ix) {
        return Ok(false);
    }
    if plan.tag(ix).is_some_and(|t| t.gs() != GsRole::None) {
        return Ok(false);
    }

    let v_in = if ix == 0 {
        match initial_gs {
            Some(gs) => gs,
            None => return Ok(false),
        }
    } else {
        plan.gs_in(ix, false)?
    };
    let v_target = plan.gs_out(ix, false)?;
    let delta = (v_target - v_in).get::<meter_per_second>();
    if delta.abs() < config.min_gs_delta.get::<meter_per_second>() {
        return Ok(false);
    }
    let a = config.gs_accel.get::<meter_per_second_squared>().abs() * delta.signum();
    if a == 0. {
        return Err(infeasible("zero ground-speed acceleration configured"));
    }
    let accel_time = delta / a;
    if accel_time < config.min_accel_time.get::<second>() {
        return Ok(false);
    }

    // a zero target speed only arises from a zero-length outgoing leg:
    // mid-plan it is rejected here with a clearer message, on the terminal
    // segment it falls through to the zone-length check below
    let v_target_mps = v_target.get::<meter_per_second>();
    if v_target_mps < 1e-9 && ix + 2 < plan.len() {
        return Err(infeasible(
            "deceleration to a stop is only allowed on the terminal segment",
        ));
    }

    let d_zone = kinematics::accel_distance(v_in.get::<meter_per_second>(), a, accel_time);
    let d_seg = plan.path_distance_segment(ix)?.get::<meter>();
    if d_zone >= d_seg {
        return Err(infeasible("segment too short for the speed change"));
    }

    let t_begin = plan.time_seconds(ix)?;
    let t_egs = t_begin + accel_time;
    let here = plan.point(ix).ok_or(Fault::TooShort)?.position();
    let next = plan.point(ix + 1).ok_or(Fault::TooShort)?.position();
    let track = plan.track_out(ix, false)?;
    let fraction = d_zone / d_seg;
    let alt = here.altitude() + (next.altitude() - here.altitude()) * fraction;
    let egs_pos = here
        .project(track, Length::new::<meter>(d_zone))
        .with_altitude(alt);

    // the rest of the segment is flown at the target speed
    let t_next_new = t_egs + (d_seg - d_zone) / v_target_mps.max(1e-9);
    let shift = t_next_new - plan.time_seconds(ix + 1)?;

    plan.time_shift_from(ix + 1, Time::new::<second>(shift))?;
    plan.set_gs_role(
        ix,
        GsRole::Bgs {
            accel: Acceleration::new::<meter_per_second_squared>(a),
        },
    )?;
    let egs = Waypoint::new(egs_pos, Time::new::<second>(t_egs)).ok_or(Fault::InvalidTime(t_egs))?;
    plan.insert_with_tag(egs, ZoneTag::none().with_gs(GsRole::Egs))
        .ok_or_else(|| infeasible("could not insert end-of-gs-change"))?;

    tracing::debug!(ix, delta_mps = delta, accel_time_s = accel_time, "inserted gs zone");
    Ok(true)
}

/// Inserts vertical-speed change zones wherever the vertical speed kinks by
/// more than the configured minimum.
///
/// Each zone is centred on its vertex time; the vertex's altitude is moved
/// onto the closed-form profile (and marked altitude-preserving) so the zone
/// reproduces it exactly. `initial_vs` plays the same role as `initial_gs`
/// in [`generate_gs_tcps`].
#[must_use]
pub fn generate_vs_tcps(
    source: &Trajectory,
    initial_vs: Option<Speed>,
    config: &GeneratorConfig,
) -> Trajectory {
    let mut plan = source.clone();
    if plan.len() < 2 {
        return plan;
    }
    let mut ix = 0;
    while ix + 1 < plan.len() {
        match insert_vs_change(&mut plan, ix, initial_vs, config) {
            Ok(Some(next)) => ix = next, // past the inserted EVS
            Ok(None) => ix += 1,
            Err(fault) => {
                if config.repair_vs {
                    plan.diagnostics_mut().warn(
                        Some(ix),
                        format!("skipped infeasible vertical-speed change: {fault}"),
                    );
                    ix += 1;
                } else {
                    let mut failed = source.clone();
                    failed.diagnostics_mut().fault(&fault);
                    return failed;
                }
            }
        }
    }
    plan
}

fn insert_vs_change(
    plan: &mut Trajectory,
    ix: usize,
    initial_vs: Option<Speed>,
    config: &GeneratorConfig,
) -> Result<Option<usize>, Fault> {
    let infeasible = |reason: &str| Fault::InfeasibleVsChange {
        index: ix,
        reason: reason.into(),
    };

    if plan.tag(ix).is_some_and(|t| t.vs() != VsRole::None)
        || plan.segment_in_vs_change(ix).is_some()
    {
        return Ok(None);
    }

    let vs_in = if ix == 0 {
        match initial_vs {
            Some(vs) => vs,
            None => return Ok(None),
        }
    } else {
        plan.vs_in(ix, false)?
    };
    let vs_target = plan.vs_out(ix, false)?;
    let delta = (vs_target - vs_in).get::<meter_per_second>();
    if delta.abs() < config.min_vs_delta.get::<meter_per_second>() {
        return Ok(None);
    }
    if vs_target.get::<foot_per_minute>().abs() > MAX_VS_FPM
        || vs_in.get::<foot_per_minute>().abs() > MAX_VS_FPM
    {
        plan.diagnostics_mut()
            .warn(Some(ix), "vertical speed beyond operational limits");
    }

    let a = config.vs_accel.get::<meter_per_second_squared>().abs() * delta.signum();
    if a == 0. {
        return Err(infeasible("zero vertical acceleration configured"));
    }
    let accel_time = delta / a;
    if accel_time < config.min_accel_time.get::<second>() {
        return Ok(None);
    }

    let t_ix = plan.time_seconds(ix)?;
    let (t_begin, t_end) = if ix == 0 {
        (t_ix, t_ix + accel_time)
    } else {
        (t_ix - accel_time / 2., t_ix + accel_time / 2.)
    };
    if ix > 0 && t_begin <= plan.time_seconds(ix - 1)? + MIN_DT_SECONDS {
        return Err(infeasible("vertical zone reaches back past the previous point"));
    }
    if t_end >= plan.time_seconds(ix + 1)? - MIN_DT_SECONDS {
        return Err(infeasible("vertical zone reaches past the next point"));
    }

    let vs_in_mps = vs_in.get::<meter_per_second>();
    let bvs_pos = plan.position_at(Time::new::<second>(t_begin), false)?;
    let evs_pos = plan.position_at(Time::new::<second>(t_end), false)?;
    for alt in [bvs_pos.altitude(), evs_pos.altitude()] {
        let ft = alt.get::<foot>();
        if !(0. ..=MAX_ALTITUDE_FT).contains(&ft) {
            return Err(infeasible("altitude outside [0 ft, 60000 ft]"));
        }
    }

    let accel = Acceleration::new::<meter_per_second_squared>(a);
    let bvs = Waypoint::new(bvs_pos, Time::new::<second>(t_begin))
        .ok_or(Fault::InvalidTime(t_begin))?;
    let bvs_ix = plan
        .insert_with_tag(bvs, ZoneTag::none().with_vs(VsRole::Bvs { accel }))
        .ok_or_else(|| infeasible("could not insert begin-of-vs-change"))?;
    let evs = Waypoint::new(evs_pos, Time::new::<second>(t_end)).ok_or(Fault::InvalidTime(t_end))?;
    let evs_ix = plan
        .insert_with_tag(evs, ZoneTag::none().with_vs(VsRole::Evs))
        .ok_or_else(|| infeasible("could not insert end-of-vs-change"))?;

    // the vertex now sits inside the zone; move its altitude onto the
    // closed-form profile so the zone reproduces it exactly
    if ix > 0 {
        let vertex_ix = bvs_ix + 1;
        let vertex = plan.points[vertex_ix].waypoint.clone();
        let dz = kinematics::accel_distance(vs_in_mps, a, accel_time / 2.);
        let alt = bvs_pos.altitude() + Length::new::<meter>(dz);
        plan.points[vertex_ix].waypoint =
            vertex.with_position(vertex.position().with_altitude(alt));
        let tag = plan.points[vertex_ix].tag.clone().with_preserve_altitude(true);
        plan.points[vertex_ix].tag = tag;
    }

    tracing::debug!(ix, delta_mps = delta, accel_time_s = accel_time, "inserted vs zone");
    Ok(Some(evs_ix + 1))
}

/// Runs turn, then ground-speed, then vertical-speed generation in that
/// fixed order, then merges any points the stages left within `MIN_DT` of
/// each other.
///
/// The order matters: later stages must see the boundaries earlier stages
/// inserted so a speed change never lands inside a turn's arc.
///
/// `initial_velocity` is the aircraft's current velocity; when given, the
/// plan may open with acceleration zones from it onto the first leg.
#[must_use]
pub fn make_kinematic_plan(
    source: &Trajectory,
    initial_velocity: Option<&Velocity>,
    config: &GeneratorConfig,
) -> Trajectory {
    let plan = generate_turn_tcps(source, config);
    if plan.diagnostics().has_error() {
        return plan;
    }
    let plan = generate_gs_tcps(&plan, initial_velocity.map(Velocity::ground_speed), config);
    if plan.diagnostics().has_error() {
        return plan;
    }
    let mut plan = generate_vs_tcps(&plan, initial_velocity.map(Velocity::vertical_speed), config);
    if plan.diagnostics().has_error() {
        return plan;
    }
    plan.merge_close_points();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;
    use approx::assert_relative_eq;
    use uom::si::length::nautical_mile;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }
    fn s(seconds: f64) -> Time {
        Time::new::<second>(seconds)
    }
    fn kn(knots: f64) -> Speed {
        Speed::new::<knot>(knots)
    }
    fn wp(x: f64, y: f64, z: f64, t: f64) -> Waypoint {
        Waypoint::new(Position::euclidean(m(x), m(y), m(z)), s(t)).unwrap()
    }

    fn count_roles(plan: &Trajectory) -> (usize, usize, usize) {
        let bots = (0..plan.len()).filter(|&i| plan.is_bot(i)).count();
        let mots = (0..plan.len()).filter(|&i| plan.is_mot(i)).count();
        let eots = (0..plan.len()).filter(|&i| plan.is_eot(i)).count();
        (bots, mots, eots)
    }

    /// North 10 km, then east 10 km, flown at a constant 180 kn.
    fn right_angle_plan() -> Trajectory {
        let v = kn(180.).get::<meter_per_second>();
        let mut plan = Trajectory::named("right-angle", "");
        plan.insert(wp(0., 0., 1000., 0.)).unwrap();
        plan.insert(wp(0., 10_000., 1000., 10_000. / v)).unwrap();
        plan.insert(wp(10_000., 10_000., 1000., 20_000. / v)).unwrap();
        plan
    }

    #[test]
    fn ninety_degree_turn_gets_one_bot_mot_eot_triple() {
        let plan = right_angle_plan();
        let config = GeneratorConfig::default().with_bank_angle(Angle::new::<degree>(20.));
        let kin = generate_turn_tcps(&plan, &config);

        assert!(!kin.diagnostics().has_error());
        assert_eq!(count_roles(&kin), (1, 1, 1));
        assert_eq!(kin.len(), 5);

        let bot = (0..kin.len()).find(|&i| kin.is_bot(i)).unwrap();
        let v = kn(180.).get::<meter_per_second>();
        let expected = v * v / (kinematics::GRAVITY * 20_f64.to_radians().tan());
        assert_relative_eq!(
            kin.signed_radius(bot).unwrap().get::<meter>(),
            expected,
            max_relative = 1e-3
        );

        // the vertex became the mid-of-turn point, on the arc
        let mot = (0..kin.len()).find(|&i| kin.is_mot(i)).unwrap();
        let arc = kin.turn_arc(bot).unwrap();
        let to_center = arc
            .center
            .horizontal_distance(&kin.point(mot).unwrap().position())
            .unwrap();
        assert_relative_eq!(to_center.get::<meter>(), expected, max_relative = 1e-6);
    }

    #[test]
    fn shallow_course_changes_stay_instantaneous() {
        let v = kn(180.).get::<meter_per_second>();
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 1000., 0.)).unwrap();
        plan.insert(wp(0., 10_000., 1000., 10_000. / v)).unwrap();
        // half a degree of course change
        plan.insert(wp(87., 20_000., 1000., 20_000. / v)).unwrap();

        let kin = generate_turn_tcps(&plan, &GeneratorConfig::default());
        assert!(kin.is_linear());
        assert_eq!(kin.len(), 3);
    }

    #[test]
    fn infeasible_turn_fails_without_repair_and_skips_with_it() {
        // legs of 500 m cannot hold a 180 kn / 20° turn (radius ~2.4 km)
        let v = kn(180.).get::<meter_per_second>();
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 1000., 0.)).unwrap();
        plan.insert(wp(0., 500., 1000., 500. / v)).unwrap();
        plan.insert(wp(500., 500., 1000., 1000. / v)).unwrap();

        let config = GeneratorConfig::default().with_bank_angle(Angle::new::<degree>(20.));
        let failed = generate_turn_tcps(&plan, &config);
        assert!(failed.diagnostics().has_error());
        assert_eq!(failed.len(), plan.len());
        assert!(failed.is_linear());

        let repaired = generate_turn_tcps(&plan, &config.clone().with_repair(true));
        assert!(!repaired.diagnostics().has_error());
        assert!(repaired.is_linear());
    }

    #[test]
    fn gs_zone_reaches_the_target_speed() {
        // one 10 km leg flown at 200 kn, entered at 100 kn
        let v_target = kn(200.).get::<meter_per_second>();
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 1000., 0.)).unwrap();
        plan.insert(wp(0., 10_000., 1000., 10_000. / v_target)).unwrap();

        let kin = generate_gs_tcps(&plan, Some(kn(100.)), &GeneratorConfig::default());
        assert!(!kin.diagnostics().has_error());
        assert_eq!(kin.len(), 3);
        assert!(kin.is_bgs(0));
        assert!(kin.is_egs(1));

        assert_relative_eq!(
            kin.gs_out(1, false).unwrap().get::<knot>(),
            200.,
            epsilon = 1e-4
        );
        assert_relative_eq!(
            kin.gs_in(1, false).unwrap().get::<knot>(),
            200.,
            epsilon = 1e-4
        );
        // entering speed is preserved
        assert_relative_eq!(
            kin.gs_out(0, false).unwrap().get::<knot>(),
            100.,
            epsilon = 1e-4
        );
        // geometry is untouched, only times moved
        assert_relative_eq!(
            kin.path_distance().unwrap().get::<meter>(),
            10_000.,
            epsilon = 1e-6
        );
    }

    #[test]
    fn zero_length_leg_with_speed_demand_fails_unchanged() {
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 1000., 0.)).unwrap();
        plan.insert(wp(0., 1000., 1000., 10.)).unwrap(); // 100 m/s
        plan.insert(wp(0., 1000., 1000., 20.)).unwrap(); // zero-length leg

        let out = generate_gs_tcps(&plan, None, &GeneratorConfig::default());
        assert!(out.diagnostics().has_error());
        assert_eq!(out.len(), 3);
        assert!(out.is_linear());
        for ix in 0..plan.len() {
            assert_eq!(
                out.point(ix).unwrap().position(),
                plan.point(ix).unwrap().position()
            );
        }
    }

    #[test]
    fn vs_zone_is_centred_on_the_vertex() {
        // level leg, then a 10 m/s climb
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 0., 0.)).unwrap();
        plan.insert(wp(0., 2000., 0., 20.)).unwrap();
        plan.insert(wp(0., 4000., 200., 40.)).unwrap();

        let kin = generate_vs_tcps(&plan, None, &GeneratorConfig::default());
        assert!(!kin.diagnostics().has_error());
        assert_eq!(kin.len(), 5);
        assert!(kin.is_bvs(1));
        assert!(kin.is_evs(3));
        // accel_time = 10 s, centred on t = 20
        assert_relative_eq!(kin.time_seconds(1).unwrap(), 15., epsilon = 1e-9);
        assert_relative_eq!(kin.time_seconds(3).unwrap(), 25., epsilon = 1e-9);
        // vertex altitude moved onto the closed-form profile:
        // z = 0 + 0*5 + 0.5*1*5² = 12.5 m
        assert_relative_eq!(
            kin.point(2).unwrap().position().altitude().get::<meter>(),
            12.5,
            epsilon = 1e-9
        );
        assert!(kin.tag(2).unwrap().preserves_altitude());
        // the zone reproduces the exit vertical speed
        assert_relative_eq!(
            kin.vs_in(3, false).unwrap().get::<meter_per_second>(),
            10.,
            epsilon = 1e-6
        );
    }

    #[test]
    fn make_kinematic_plan_composes_all_three_stages() {
        let v = kn(180.).get::<meter_per_second>();
        let mut plan = Trajectory::named("composite", "");
        plan.insert(wp(0., 0., 1000., 0.)).unwrap();
        plan.insert(wp(0., 5000., 1000., 5000. / v)).unwrap(); // 90° turn
        plan.insert(wp(5000., 5000., 1000., 10_000. / v)).unwrap(); // climb starts
        plan.insert(wp(10_000., 5000., 1500., 15_000. / v)).unwrap();

        let config = GeneratorConfig::default().with_bank_angle(Angle::new::<degree>(20.));
        let kin = make_kinematic_plan(&plan, None, &config);

        assert!(!kin.diagnostics().has_error(), "{}", kin.diagnostics().message());
        assert_eq!(count_roles(&kin), (1, 1, 1));
        assert!((0..kin.len()).any(|i| kin.is_bvs(i)));
        assert!((0..kin.len()).any(|i| kin.is_evs(i)));
        assert!(!kin.is_linear());

        // times still strictly increasing
        for ix in 1..kin.len() {
            assert!(kin.time_seconds(ix).unwrap() > kin.time_seconds(ix - 1).unwrap());
        }
    }

    #[test]
    fn generation_works_on_geodesic_trajectories_too() {
        let lat = |d: f64| Angle::new::<degree>(d);
        let gs = kn(180.);
        let mut plan = Trajectory::new();
        let a = Position::lat_lon(lat(45.), lat(-93.), m(1000.)).unwrap();
        let b = Position::lat_lon(lat(45.2), lat(-93.), m(1000.)).unwrap();
        let c = Position::lat_lon(lat(45.2), lat(-92.72), m(1000.)).unwrap();
        let leg1 = a.horizontal_distance(&b).unwrap();
        let leg2 = b.horizontal_distance(&c).unwrap();
        plan.insert(Waypoint::new(a, s(0.)).unwrap()).unwrap();
        plan.insert(Waypoint::new(b, leg1 / gs).unwrap()).unwrap();
        plan.insert(Waypoint::new(c, (leg1 + leg2) / gs).unwrap())
            .unwrap();
        assert!(leg1.get::<nautical_mile>() > 5.);

        let config = GeneratorConfig::default().with_bank_angle(Angle::new::<degree>(20.));
        let kin = generate_turn_tcps(&plan, &config);
        assert!(!kin.diagnostics().has_error(), "{}", kin.diagnostics().message());
        assert_eq!(count_roles(&kin), (1, 1, 1));
    }
}
