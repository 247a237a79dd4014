//! Well-formedness and kinematic-consistency checks: does the zone metadata
//! form properly nested, balanced zones, and does the geometry between each
//! zone's boundaries actually match the accelerations the tags claim?
//!
//! All checks are pure. Violations are reported through `tracing` at debug
//! level with the offending index; the methods themselves only return `bool`
//! (or the first offending index).

use crate::kinematics;
use crate::trajectory::Trajectory;
use crate::util::{self, MIN_DT_SECONDS};
use crate::zone::{GsRole, TurnRole, VsRole};
use uom::si::acceleration::meter_per_second_squared;
use uom::si::angle::degree;
use uom::si::f64::{Acceleration, Angle, Length, Velocity as Speed};
use uom::si::length::meter;
use uom::si::velocity::meter_per_second;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The tolerances of the consistency checks.
///
/// [`strict`](Self::strict) tolerances accept plans straight out of the zone
/// generator and reject anything whose geometry has drifted;
/// [`weak`](Self::weak) tolerances accept plans that have been round-tripped
/// through serialization, unit conversion, or foreign producers and are
/// still flyable in practice.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsistencyThresholds {
    /// Tolerated drift between the stored ground-speed acceleration and the
    /// one the zone geometry implies.
    pub gs_accel: Acceleration,
    /// Tolerated mismatch between a gs zone's path length and its
    /// acceleration profile.
    pub gs_dist: Length,
    /// Vertical analogue of `gs_accel`.
    pub vs_accel: Acceleration,
    /// Tolerated mismatch between a vs zone's altitude change and its
    /// acceleration profile.
    pub vs_dist: Length,
    /// Tolerated horizontal drift of the end-of-turn from the position the
    /// arc predicts.
    pub turn_horizontal: Length,
    /// Tolerated drift of the mid-of-turn altitude from the zone's linear
    /// vertical profile.
    pub turn_vertical: Length,
    /// Tolerated drift of any turn-zone point from the turn circle itself.
    pub on_circle: Length,
    /// Tolerated speed jump (ground and vertical) at a point before the plan
    /// counts as velocity-discontinuous.
    pub velocity: Speed,
    /// Tolerated track jump at a point.
    pub track: Angle,
}

impl ConsistencyThresholds {
    /// Tight tolerances for freshly generated plans.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            gs_accel: Acceleration::new::<meter_per_second_squared>(1e-5),
            gs_dist: Length::new::<meter>(0.07),
            vs_accel: Acceleration::new::<meter_per_second_squared>(1e-5),
            vs_dist: Length::new::<meter>(1e-5),
            turn_horizontal: Length::new::<meter>(0.02),
            turn_vertical: Length::new::<meter>(0.005),
            on_circle: Length::new::<meter>(1.2),
            velocity: Speed::new::<meter_per_second>(2.6),
            track: Angle::new::<degree>(2.),
        }
    }

    /// Loose tolerances for plans that have been through serialization or
    /// foreign tooling.
    #[must_use]
    pub fn weak() -> Self {
        Self {
            gs_accel: Acceleration::new::<meter_per_second_squared>(0.2),
            gs_dist: Length::new::<meter>(0.1),
            vs_accel: Acceleration::new::<meter_per_second_squared>(0.001),
            vs_dist: Length::new::<meter>(0.005),
            turn_horizontal: Length::new::<meter>(0.1),
            turn_vertical: Length::new::<meter>(0.5),
            on_circle: Length::new::<meter>(1.2),
            velocity: Speed::new::<meter_per_second>(5.0),
            track: Angle::new::<degree>(5.),
        }
    }
}

impl Trajectory {
    /// The first index at which the zone metadata is malformed, or `None`
    /// when the plan is well formed.
    ///
    /// Well-formedness requires, per zone kind, alternating begin/end
    /// markers with no unmatched or nested zones, every mid-of-turn point
    /// strictly inside a turn, and strictly increasing times throughout.
    #[must_use]
    pub fn first_malformed_index(&self) -> Option<usize> {
        let mut open_turn: Option<usize> = None;
        let mut open_gs: Option<usize> = None;
        let mut open_vs: Option<usize> = None;

        for ix in 0..self.len() {
            if ix > 0 {
                let (Ok(t0), Ok(t1)) = (self.time_seconds(ix - 1), self.time_seconds(ix)) else {
                    return Some(ix);
                };
                if t1 < t0 + MIN_DT_SECONDS {
                    tracing::debug!(ix, "malformed: time not strictly increasing");
                    return Some(ix);
                }
            }
            let Some(tag) = self.tag(ix) else {
                return Some(ix);
            };

            match tag.turn() {
                TurnRole::None => {}
                TurnRole::Bot(_) => {
                    if open_turn.is_some() {
                        tracing::debug!(ix, "malformed: nested begin-of-turn");
                        return Some(ix);
                    }
                    open_turn = Some(ix);
                }
                TurnRole::Eot => {
                    if open_turn.take().is_none() {
                        tracing::debug!(ix, "malformed: end-of-turn without a begin");
                        return Some(ix);
                    }
                }
                TurnRole::EotBot(_) => {
                    if open_turn.take().is_none() {
                        tracing::debug!(ix, "malformed: end-of-turn without a begin");
                        return Some(ix);
                    }
                    open_turn = Some(ix);
                }
            }
            if tag.is_mid_of_turn() && (open_turn.is_none() || open_turn == Some(ix)) {
                tracing::debug!(ix, "malformed: mid-of-turn outside a turn");
                return Some(ix);
            }

            match tag.gs() {
                GsRole::None => {}
                GsRole::Bgs { .. } => {
                    if open_gs.is_some() {
                        tracing::debug!(ix, "malformed: nested begin-of-gs-change");
                        return Some(ix);
                    }
                    open_gs = Some(ix);
                }
                GsRole::Egs => {
                    if open_gs.take().is_none() {
                        tracing::debug!(ix, "malformed: end-of-gs-change without a begin");
                        return Some(ix);
                    }
                }
                GsRole::EgsBgs { .. } => {
                    if open_gs.take().is_none() {
                        tracing::debug!(ix, "malformed: end-of-gs-change without a begin");
                        return Some(ix);
                    }
                    open_gs = Some(ix);
                }
            }

            match tag.vs() {
                VsRole::None => {}
                VsRole::Bvs { .. } => {
                    if open_vs.is_some() {
                        tracing::debug!(ix, "malformed: nested begin-of-vs-change");
                        return Some(ix);
                    }
                    open_vs = Some(ix);
                }
                VsRole::Evs => {
                    if open_vs.take().is_none() {
                        tracing::debug!(ix, "malformed: end-of-vs-change without a begin");
                        return Some(ix);
                    }
                }
                VsRole::EvsBvs { .. } => {
                    if open_vs.take().is_none() {
                        tracing::debug!(ix, "malformed: end-of-vs-change without a begin");
                        return Some(ix);
                    }
                    open_vs = Some(ix);
                }
            }
        }

        [open_turn, open_gs, open_vs].into_iter().flatten().min()
    }

    /// Whether the zone metadata forms balanced, non-nested zones with
    /// strictly increasing times.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.first_malformed_index().is_none()
    }

    /// Whether every turn zone's geometry matches its arc: all zone points
    /// lie on the turn circle, the arc carried forward from the begin-of-turn
    /// by the zone's path length lands on the end-of-turn, and the
    /// mid-of-turn altitude lies on the zone's vertical profile.
    #[must_use]
    pub fn is_turn_consistent(&self, thresholds: &ConsistencyThresholds) -> bool {
        let mut ok = true;
        for bot in 0..self.len() {
            if !self.is_bot(bot) {
                continue;
            }
            // a combined end-and-begin at `bot` closes the previous zone, so
            // this zone's end lies strictly after it
            let Some(eot) = self.next_eot(bot + 1) else {
                ok = false;
                continue;
            };
            let Some(arc) = self.turn_arc(bot) else {
                ok = false;
                continue;
            };
            let radius = arc.radius();

            for ix in bot..=eot {
                let Some(pos) = self.point(ix).map(|w| w.position()) else {
                    continue;
                };
                let Some(dist) = arc.center.horizontal_distance(&pos) else {
                    ok = false;
                    continue;
                };
                if (dist - radius).abs() > thresholds.on_circle {
                    tracing::debug!(
                        ix,
                        off_m = (dist - radius).get::<meter>(),
                        "turn-zone point off the turn circle"
                    );
                    ok = false;
                }
            }

            let (Some(bot_pos), Some(eot_pos)) = (
                self.point(bot).map(|w| w.position()),
                self.point(eot).map(|w| w.position()),
            ) else {
                continue;
            };
            let (Ok(swept), Ok(t_bot), Ok(t_eot)) = (
                self.path_distance_range(bot, eot),
                self.time_seconds(bot),
                self.time_seconds(eot),
            ) else {
                ok = false;
                continue;
            };
            match kinematics::turn_by_distance(&arc.center, &bot_pos, arc.direction(), swept) {
                Some((predicted, _)) => {
                    let drift = predicted
                        .horizontal_distance(&eot_pos)
                        .unwrap_or(thresholds.turn_horizontal * 2.);
                    if drift > thresholds.turn_horizontal {
                        tracing::debug!(
                            bot,
                            drift_m = drift.get::<meter>(),
                            "end-of-turn off the predicted arc position"
                        );
                        ok = false;
                    }
                }
                None => ok = false,
            }

            // the mid-of-turn altitude must sit on the linear profile between
            // the boundaries, unless a vertical zone inside the turn owns it
            let vertical_zone_inside =
                (bot..=eot).any(|ix| self.tag(ix).is_some_and(|t| t.vs() != VsRole::None));
            if vertical_zone_inside {
                continue;
            }
            for mot in bot + 1..eot {
                if !self.is_mot(mot) || self.tag(mot).is_some_and(|t| t.preserves_altitude()) {
                    continue;
                }
                let (Some(mot_wp), Ok(t_mot)) = (self.point(mot), self.time_seconds(mot)) else {
                    continue;
                };
                let fraction = (t_mot - t_bot) / (t_eot - t_bot);
                let expected = bot_pos.altitude() + (eot_pos.altitude() - bot_pos.altitude()) * fraction;
                let drift = (mot_wp.position().altitude() - expected).abs();
                if drift > thresholds.turn_vertical {
                    tracing::debug!(
                        mot,
                        drift_m = drift.get::<meter>(),
                        "mid-of-turn altitude off the zone's vertical profile"
                    );
                    ok = false;
                }
            }
        }
        ok
    }

    /// Whether every ground-speed zone's path length matches its stored
    /// acceleration, and the acceleration matches the speeds on either side.
    #[must_use]
    pub fn is_gs_consistent(&self, thresholds: &ConsistencyThresholds) -> bool {
        let mut ok = true;
        for bgs in 0..self.len() {
            if !self.is_bgs(bgs) {
                continue;
            }
            let Some(egs) = self.next_egs(bgs + 1) else {
                ok = false;
                continue;
            };
            let Some(a) = self.gs_accel(bgs) else {
                ok = false;
                continue;
            };
            let a = a.get::<meter_per_second_squared>();
            let (Ok(t0), Ok(t1), Ok(d_zone), Ok(v_out)) = (
                self.time_seconds(bgs),
                self.time_seconds(egs),
                self.path_distance_range(bgs, egs),
                self.gs_out(egs, false),
            ) else {
                ok = false;
                continue;
            };
            let dt = t1 - t0;
            let v0 = v_out.get::<meter_per_second>() - a * dt;
            let predicted = kinematics::accel_distance(v0, a, dt);
            let drift = (d_zone.get::<meter>() - predicted).abs();
            if v0 < 0. || drift > thresholds.gs_dist.get::<meter>() {
                tracing::debug!(bgs, drift_m = drift, "gs zone off its acceleration profile");
                ok = false;
            }

            if bgs > 0 {
                if let Ok(v_in) = self.gs_in(bgs, false) {
                    let implied = (v_out - v_in).get::<meter_per_second>() / dt;
                    if (implied - a).abs() > thresholds.gs_accel.get::<meter_per_second_squared>() {
                        tracing::debug!(bgs, implied, stored = a, "gs acceleration mismatch");
                        ok = false;
                    }
                }
            }
        }
        ok
    }

    /// Vertical analogue of [`is_gs_consistent`](Self::is_gs_consistent):
    /// every vertical-speed zone's altitude change must match its stored
    /// acceleration.
    #[must_use]
    pub fn is_vs_consistent(&self, thresholds: &ConsistencyThresholds) -> bool {
        let mut ok = true;
        for bvs in 0..self.len() {
            if !self.is_bvs(bvs) {
                continue;
            }
            let Some(evs) = self.next_evs(bvs + 1) else {
                ok = false;
                continue;
            };
            let Some(a) = self.vs_accel(bvs) else {
                ok = false;
                continue;
            };
            let a = a.get::<meter_per_second_squared>();
            let (Some(z0), Some(z1)) = (
                self.point(bvs).map(|w| w.position().altitude()),
                self.point(evs).map(|w| w.position().altitude()),
            ) else {
                continue;
            };
            let (Ok(t0), Ok(t1), Ok(vs_out)) = (
                self.time_seconds(bvs),
                self.time_seconds(evs),
                self.vs_out(evs, false),
            ) else {
                ok = false;
                continue;
            };
            let dt = t1 - t0;
            let vs0 = vs_out.get::<meter_per_second>() - a * dt;
            let predicted = kinematics::accel_distance(vs0, a, dt);
            let drift = ((z1 - z0).get::<meter>() - predicted).abs();
            if drift > thresholds.vs_dist.get::<meter>() {
                tracing::debug!(bvs, drift_m = drift, "vs zone off its acceleration profile");
                ok = false;
            }

            if bvs > 0 {
                if let Ok(vs_in) = self.vs_in(bvs, false) {
                    let implied = (vs_out - vs_in).get::<meter_per_second>() / dt;
                    if (implied - a).abs() > thresholds.vs_accel.get::<meter_per_second_squared>() {
                        tracing::debug!(bvs, implied, stored = a, "vs acceleration mismatch");
                        ok = false;
                    }
                }
            }
        }
        ok
    }

    /// Whether the velocity is continuous across every interior point:
    /// the velocity arriving at each point matches the velocity leaving it
    /// within the thresholds. Acceleration zones make arriving and leaving
    /// velocities equal by construction; discontinuities appear at points
    /// where a linear kink was never given a zone.
    #[must_use]
    pub fn is_velocity_continuous(&self, thresholds: &ConsistencyThresholds) -> bool {
        let mut ok = true;
        for ix in 1..self.len().saturating_sub(1) {
            let (Ok(arriving), Ok(leaving)) =
                (self.final_velocity(ix - 1, false), self.initial_velocity(ix, false))
            else {
                continue;
            };
            let gs_jump = (leaving.ground_speed() - arriving.ground_speed()).abs();
            let vs_jump = (leaving.vertical_speed() - arriving.vertical_speed()).abs();
            let moving = arriving.ground_speed().get::<meter_per_second>() > 1e-9
                && leaving.ground_speed().get::<meter_per_second>() > 1e-9;
            let trk_jump = if moving {
                util::track_delta(arriving.track(), leaving.track())
            } else {
                Angle::new::<degree>(0.)
            };
            if gs_jump > thresholds.velocity
                || vs_jump > thresholds.velocity
                || trk_jump > thresholds.track
            {
                tracing::debug!(ix, %arriving, %leaving, "velocity discontinuity");
                ok = false;
            }
        }
        ok
    }

    /// Whether the plan is well formed and all three zone kinds are
    /// geometrically consistent.
    #[must_use]
    pub fn is_consistent(&self, thresholds: &ConsistencyThresholds) -> bool {
        self.is_well_formed()
            && self.is_turn_consistent(thresholds)
            && self.is_gs_consistent(thresholds)
            && self.is_vs_consistent(thresholds)
    }

    /// Whether the plan is consistent and velocity-continuous: the full
    /// checklist a plan must pass before an aircraft can be asked to fly it.
    #[must_use]
    pub fn is_flyable(&self, thresholds: &ConsistencyThresholds) -> bool {
        self.is_consistent(thresholds) && self.is_velocity_continuous(thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{make_kinematic_plan, GeneratorConfig};
    use crate::zone::ZoneTag;
    use crate::{Position, Waypoint};
    use uom::si::f64::Time;
    use uom::si::time::second;
    use uom::si::velocity::knot;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }
    fn wp(x: f64, y: f64, z: f64, t: f64) -> Waypoint {
        Waypoint::new(Position::euclidean(m(x), m(y), m(z)), Time::new::<second>(t)).unwrap()
    }

    fn composite_plan() -> Trajectory {
        let v = Speed::new::<knot>(180.).get::<meter_per_second>();
        let mut linear = Trajectory::new();
        linear.insert(wp(0., 0., 1000., 0.)).unwrap();
        linear.insert(wp(0., 5000., 1000., 5000. / v)).unwrap();
        linear.insert(wp(5000., 5000., 1000., 10_000. / v)).unwrap();
        linear.insert(wp(10_000., 5000., 1500., 15_000. / v)).unwrap();
        let config = GeneratorConfig::default().with_bank_angle(Angle::new::<degree>(20.));
        make_kinematic_plan(&linear, None, &config)
    }

    /// Two 90° turns whose shared boundary both ends the first arc and
    /// begins the second: right around (1000, 0), then left around
    /// (1000, 2000), flown at 100 m/s throughout.
    fn adjoining_turns_plan() -> Trajectory {
        let qt = core::f64::consts::FRAC_PI_2 * 1000. / 100.;
        let right = crate::zone::TurnArc {
            signed_radius: m(1000.),
            center: Position::euclidean(m(1000.), m(0.), m(0.)),
        };
        let left = crate::zone::TurnArc {
            signed_radius: m(-1000.),
            center: Position::euclidean(m(1000.), m(2000.), m(0.)),
        };
        let mut plan = Trajectory::new();
        plan.insert(wp(0., -1000., 0., 0.)).unwrap();
        plan.insert_with_tag(
            wp(0., 0., 0., 10.),
            ZoneTag::none().with_turn(TurnRole::Bot(right)),
        )
        .unwrap();
        plan.insert_with_tag(
            wp(1000., 1000., 0., 10. + qt),
            ZoneTag::none().with_turn(TurnRole::EotBot(left)),
        )
        .unwrap();
        plan.insert_with_tag(
            wp(2000., 2000., 0., 10. + 2. * qt),
            ZoneTag::none().with_turn(TurnRole::Eot),
        )
        .unwrap();
        plan.insert(wp(2000., 3000., 0., 20. + 2. * qt)).unwrap();
        plan
    }

    #[test]
    fn generated_plans_pass_the_strict_checks() {
        let plan = composite_plan();
        assert!(!plan.diagnostics().has_error());
        assert!(plan.is_well_formed());
        assert!(plan.is_turn_consistent(&ConsistencyThresholds::strict()));
        assert!(plan.is_gs_consistent(&ConsistencyThresholds::strict()));
        assert!(plan.is_vs_consistent(&ConsistencyThresholds::strict()));
        assert!(plan.is_consistent(&ConsistencyThresholds::strict()));
    }

    #[test]
    fn linear_plans_are_trivially_consistent() {
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 0., 0.)).unwrap();
        plan.insert(wp(0., 1000., 0., 10.)).unwrap();
        assert!(plan.is_well_formed());
        assert!(plan.is_consistent(&ConsistencyThresholds::strict()));
    }

    #[test]
    fn adjoining_turn_zones_are_each_checked_against_their_own_arc() {
        let plan = adjoining_turns_plan();
        assert!(plan.is_well_formed());
        assert!(plan.is_turn_consistent(&ConsistencyThresholds::strict()));
        assert!(plan.is_flyable(&ConsistencyThresholds::strict()));

        // drifting the second turn's end off its circle must fail the check
        let qt = core::f64::consts::FRAC_PI_2 * 1000. / 100.;
        let mut moved = plan.clone();
        moved
            .replace_waypoint(3, wp(2100., 2000., 0., 10. + 2. * qt))
            .unwrap();
        assert!(!moved.is_turn_consistent(&ConsistencyThresholds::strict()));
    }

    #[test]
    fn unmatched_zone_markers_are_malformed() {
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 0., 0.)).unwrap();
        plan.insert(wp(0., 1000., 0., 10.)).unwrap();
        plan.insert(wp(0., 2000., 0., 20.)).unwrap();
        assert!(plan.is_well_formed());

        plan.set_vs_role(1, VsRole::Evs).unwrap();
        assert_eq!(plan.first_malformed_index(), Some(1));

        plan.set_vs_role(1, VsRole::None).unwrap();
        plan.set_gs_role(
            1,
            GsRole::Bgs {
                accel: Acceleration::new::<meter_per_second_squared>(1.),
            },
        )
        .unwrap();
        assert_eq!(plan.first_malformed_index(), Some(1));
    }

    #[test]
    fn stray_mid_of_turn_is_malformed() {
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 0., 0.)).unwrap();
        plan.insert(wp(0., 1000., 0., 10.)).unwrap();
        plan.insert(wp(0., 2000., 0., 20.)).unwrap();
        plan.set_mid_of_turn(1, true).unwrap();
        assert_eq!(plan.first_malformed_index(), Some(1));
    }

    #[test]
    fn a_moved_end_of_turn_fails_the_turn_check() {
        let mut plan = composite_plan();
        assert!(plan.is_turn_consistent(&ConsistencyThresholds::weak()));

        let eot = (0..plan.len()).find(|&i| plan.is_eot(i)).unwrap();
        let wp = plan.point(eot).unwrap().clone();
        let moved = wp.with_position(
            wp.position()
                .project(Angle::new::<degree>(90.), Length::new::<meter>(25.)),
        );
        plan.replace_waypoint(eot, moved).unwrap();
        assert!(!plan.is_turn_consistent(&ConsistencyThresholds::weak()));
    }

    #[test]
    fn a_retimed_gs_zone_fails_the_gs_check() {
        let v = Speed::new::<knot>(200.).get::<meter_per_second>();
        let mut linear = Trajectory::new();
        linear.insert(wp(0., 0., 1000., 0.)).unwrap();
        linear.insert(wp(0., 10_000., 1000., 10_000. / v)).unwrap();
        let mut plan = crate::generator::generate_gs_tcps(
            &linear,
            Some(Speed::new::<knot>(100.)),
            &GeneratorConfig::default(),
        );
        assert!(plan.is_gs_consistent(&ConsistencyThresholds::strict()));

        // stretch the zone without touching its stored acceleration
        let egs = (0..plan.len()).find(|&i| plan.is_egs(i)).unwrap();
        let wp = plan.point(egs).unwrap().clone();
        let late = wp.with_time(wp.time() + Time::new::<second>(5.));
        plan.replace_waypoint(egs, late).unwrap();
        assert!(!plan.is_gs_consistent(&ConsistencyThresholds::weak()));
    }

    #[test]
    fn a_linear_kink_is_velocity_discontinuous_but_its_plan_is_not() {
        let v = Speed::new::<knot>(180.).get::<meter_per_second>();
        let mut linear = Trajectory::new();
        linear.insert(wp(0., 0., 1000., 0.)).unwrap();
        linear.insert(wp(0., 5000., 1000., 5000. / v)).unwrap();
        linear.insert(wp(5000., 5000., 1000., 10_000. / v)).unwrap();
        assert!(!linear.is_velocity_continuous(&ConsistencyThresholds::strict()));

        let config = GeneratorConfig::default().with_bank_angle(Angle::new::<degree>(20.));
        let plan = make_kinematic_plan(&linear, None, &config);
        assert!(plan.is_velocity_continuous(&ConsistencyThresholds::strict()));
        assert!(plan.is_flyable(&ConsistencyThresholds::strict()));
    }

    #[test]
    fn foreign_tags_survive_the_checks_without_panicking() {
        let mut plan = Trajectory::new();
        plan.insert(wp(0., 0., 0., 0.)).unwrap();
        plan.insert(wp(0., 1000., 0., 10.)).unwrap();
        plan.insert(wp(0., 2000., 0., 20.)).unwrap();
        // a BOT whose arc degenerates to a point
        let arc = crate::zone::TurnArc {
            signed_radius: Length::new::<meter>(0.),
            center: plan.point(0).unwrap().position(),
        };
        plan.replace_tag(0, ZoneTag::none().with_turn(TurnRole::Bot(arc)))
            .unwrap();
        plan.replace_tag(2, ZoneTag::none().with_turn(TurnRole::Eot))
            .unwrap();
        assert!(plan.is_well_formed());
        assert!(!plan.is_turn_consistent(&ConsistencyThresholds::weak()));
    }
}
