//! Reversion: stripping acceleration zones from a kinematic trajectory to
//! recover the linear one it was generated from.
//!
//! Reversion is the inverse of the zone generator. Ground-speed zones are
//! reverted first (restoring the linear timing of everything downstream),
//! then vertical-speed zones (restoring vertex altitudes), then turns
//! (restoring the vertices the arcs replaced). Points generated by this
//! crate carry their linear pedigree in the zone tag, so a generated plan
//! reverts back to its source near-exactly; plans tagged by other producers
//! fall back to the arc and profile geometry.

use crate::diagnostics::Fault;
use crate::trajectory::Trajectory;
use crate::util::{self, MIN_DT_SECONDS};
use crate::zone::ZoneTag;
use crate::Waypoint;
use uom::si::angle::degree;
use uom::si::f64::{Angle, Length, Time, Velocity as Speed};
use uom::si::length::meter;
use uom::si::time::second;
use uom::si::velocity::{foot_per_minute, knot, meter_per_second};

impl Trajectory {
    /// Merges runs of points that lie within `MIN_DT` of each other.
    ///
    /// Points with compatible zone tags merge into one (the earlier point
    /// survives and adopts the later one's name if unnamed); a point whose
    /// tag clashes with its predecessor's is dropped with a warning.
    /// Idempotent.
    pub fn merge_close_points(&mut self) {
        let mut ix = 1;
        while ix < self.points.len() {
            let dt = self.points[ix].waypoint.time().get::<second>()
                - self.points[ix - 1].waypoint.time().get::<second>();
            if dt >= MIN_DT_SECONDS {
                ix += 1;
                continue;
            }
            match self.points[ix - 1].tag.merged_with(&self.points[ix].tag) {
                Some(merged) => {
                    if self.points[ix - 1].waypoint.name().is_none() {
                        if let Some(name) = self.points[ix].waypoint.name() {
                            let name = name.to_owned();
                            self.points[ix - 1].waypoint =
                                self.points[ix - 1].waypoint.with_name(Some(name));
                        }
                    }
                    self.points[ix - 1].tag = merged;
                }
                None => {
                    let msg = format!(
                        "dropped point at duplicate time with incompatible zone tag: {}",
                        self.points[ix].waypoint
                    );
                    self.diagnostics.warn(Some(ix), msg);
                }
            }
            self.points.remove(ix);
        }
    }

    /// Reverts the turn beginning at `bot` back to its linear vertex.
    ///
    /// Every point from the begin-of-turn through the end-of-turn is removed
    /// and replaced by a single vertex; a boundary point shared with a
    /// neighbouring turn survives with the neighbour's half of its role. The
    /// vertex is the stored source waypoint when the
    /// mid-of-turn point carries one, otherwise the chord intersection
    /// reconstructed from the arc (at `R/cos(θ/2)` from the center along the
    /// bisector radial, with the mid-of-turn's altitude). Points after the
    /// turn are retimed so the ground speed that was exiting the zone is
    /// preserved over the now-longer cornered path.
    ///
    /// Returns the index of the restored vertex.
    pub fn revert_turn_tcp(&mut self, bot: usize) -> Result<usize, Fault> {
        let violation = |reason: &str| Fault::InvariantViolation {
            index: bot,
            reason: reason.into(),
        };
        if !self.is_bot(bot) {
            let fault = violation("not a begin-of-turn");
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        // a combined end-and-begin point at `bot` ends the previous turn, not
        // this one, so the matching end is searched strictly after it
        let eot = match self.next_eot(bot + 1) {
            Some(eot) => eot,
            None => {
                let fault = violation("unmatched begin-of-turn");
                self.diagnostics.fault(&fault);
                return Err(fault);
            }
        };
        let mot = (bot + 1..eot).find(|&i| self.is_mot(i));

        let vertex = match mot.and_then(|m| self.tag(m).and_then(|t| t.source().cloned())) {
            Some(source) => source,
            None => self.turn_vertex_from_arc(bot, eot, mot)?,
        };
        let pedigree = mot
            .and_then(|m| self.tag(m).cloned())
            .unwrap_or_else(ZoneTag::none);
        let tag = ZoneTag::none()
            .with_original(pedigree.is_original())
            .with_linear_index(pedigree.linear_index());
        let v_exit = if eot + 1 < self.len() {
            self.gs_out(eot, false)?.get::<meter_per_second>()
        } else {
            0.
        };

        // when a boundary point also serves the neighbouring turn, keep it
        // and strip only the half that belonged to this zone
        let keep_bot = self.is_eot(bot);
        let keep_eot = self.is_bot(eot);
        if keep_bot {
            let role = self.tag(bot).map(|t| t.turn().without_begin()).unwrap_or_default();
            self.set_turn_role(bot, role)?;
        }
        if keep_eot {
            let role = self.tag(eot).map(|t| t.turn().without_end()).unwrap_or_default();
            self.set_turn_role(eot, role)?;
        }
        let start = if keep_bot { bot + 1 } else { bot };
        let end = if keep_eot { eot } else { eot + 1 };
        self.remove_range(start..end)?;
        let ix = match self.insert_with_tag(vertex, tag) {
            Some(ix) => ix,
            None => {
                let fault = violation("could not re-insert the turn vertex");
                self.diagnostics.fault(&fault);
                return Err(fault);
            }
        };
        if ix + 1 < self.len() && v_exit > 0. {
            let here = self.point(ix).ok_or(Fault::TooShort)?.position();
            let next = self.point(ix + 1).ok_or(Fault::TooShort)?.position();
            let d = here.horizontal_distance(&next).ok_or(Fault::FrameMismatch)?;
            let target = self.time_seconds(ix)? + d.get::<meter>() / v_exit;
            let shift = target - self.time_seconds(ix + 1)?;
            self.time_shift_from(ix + 1, Time::new::<second>(shift))?;
        }
        Ok(ix)
    }

    /// Reconstructs the linear vertex of the turn `[bot, eot]` from the arc
    /// geometry alone.
    fn turn_vertex_from_arc(
        &self,
        bot: usize,
        eot: usize,
        mot: Option<usize>,
    ) -> Result<Waypoint, Fault> {
        let violation = |reason: &str| Fault::InvariantViolation {
            index: bot,
            reason: reason.into(),
        };
        let arc = self
            .turn_arc(bot)
            .ok_or_else(|| violation("begin-of-turn without an arc"))?;
        let bot_pos = self.point(bot).ok_or(Fault::TooShort)?.position();
        let eot_pos = self.point(eot).ok_or(Fault::TooShort)?.position();
        let radial_bot = arc
            .center
            .track_to(&bot_pos)
            .ok_or(Fault::FrameMismatch)?;
        let radial_eot = arc
            .center
            .track_to(&eot_pos)
            .ok_or(Fault::FrameMismatch)?;
        let theta = util::track_delta(radial_bot, radial_eot).get::<uom::si::angle::radian>();
        let half = theta / 2.;
        if theta <= 0. || half.cos() <= 0. {
            return Err(violation("turn of 180° or more has no chord vertex"));
        }
        let bisector = radial_bot
            + Angle::new::<uom::si::angle::radian>(arc.direction() * half);
        let dist = arc.radius() / half.cos();
        // at the arc's constant ground speed, the straight run to the chord
        // vertex takes tan(θ/2)/θ of the turn's duration
        let t_bot = self.time_seconds(bot)?;
        let t_eot = self.time_seconds(eot)?;
        let t = t_bot + (t_eot - t_bot) * half.tan() / theta;
        let alt = self
            .point(mot.unwrap_or(bot))
            .ok_or(Fault::TooShort)?
            .position()
            .altitude();
        let pos = arc.center.project(bisector, dist).with_altitude(alt);
        let name = mot
            .and_then(|m| self.point(m))
            .and_then(|w| w.name())
            .map(str::to_owned);
        Waypoint::new(pos, Time::new::<second>(t))
            .ok_or(Fault::InvalidTime(t))
            .map(|w| w.with_name(name))
    }

    /// Reverts the ground-speed zone beginning at `bgs`: removes the
    /// end-of-gs-change point, clears the begin role, and retimes everything
    /// downstream so the whole segment is again flown at the target speed.
    /// An end point that also begins the next zone is kept, retimed onto the
    /// linear profile.
    pub fn revert_gs_tcp(&mut self, bgs: usize) -> Result<(), Fault> {
        let violation = |reason: &str| Fault::InvariantViolation {
            index: bgs,
            reason: reason.into(),
        };
        if !self.is_bgs(bgs) {
            let fault = violation("not a begin-of-gs-change");
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        // a combined end-and-begin point at `bgs` ends the previous zone, so
        // the matching end is searched strictly after it
        let egs = match self.next_egs(bgs + 1) {
            Some(egs) => egs,
            None => {
                let fault = violation("unmatched begin-of-gs-change");
                self.diagnostics.fault(&fault);
                return Err(fault);
            }
        };
        if egs + 1 >= self.len() {
            // zone runs off the end of the plan; just strip this zone's roles
            let begin = self.tag(bgs).map(|t| t.gs().without_begin()).unwrap_or_default();
            self.set_gs_role(bgs, begin)?;
            let end = self.tag(egs).map(|t| t.gs().without_end()).unwrap_or_default();
            self.set_gs_role(egs, end)?;
            return Ok(());
        }

        let v_target = self.gs_out(egs, false)?.get::<meter_per_second>();
        if v_target <= 0. {
            let fault = violation("no speed past the end-of-gs-change");
            self.diagnostics.fault(&fault);
            return Err(fault);
        }

        let begin = self.tag(bgs).map(|t| t.gs().without_begin()).unwrap_or_default();
        self.set_gs_role(bgs, begin)?;
        if self.is_bgs(egs) {
            // the end point also begins the next zone; keep it and move it
            // onto the linear timing
            let d = self.path_distance_range(bgs, egs)?.get::<meter>();
            let t_linear = self.time_seconds(bgs)? + d / v_target;
            let end = self.tag(egs).map(|t| t.gs().without_end()).unwrap_or_default();
            self.set_gs_role(egs, end)?;
            let shift = t_linear - self.time_seconds(egs)?;
            self.time_shift_from(egs, Time::new::<second>(shift))?;
        } else {
            let d = self.path_distance_range(bgs, egs + 1)?.get::<meter>();
            let t_linear = self.time_seconds(bgs)? + d / v_target;
            self.remove(egs)?;
            // the point after the removed EGS now sits at `egs`
            let shift = t_linear - self.time_seconds(egs)?;
            self.time_shift_from(egs, Time::new::<second>(shift))?;
        }
        Ok(())
    }

    /// Reverts the vertical-speed zone beginning at `bvs`: restores the
    /// altitude of any vertex the zone holds, then removes both zone
    /// boundaries. A boundary shared with a neighbouring zone survives with
    /// the neighbour's half of its role. Horizontal positions and times are
    /// untouched.
    pub fn revert_vs_tcp(&mut self, bvs: usize) -> Result<(), Fault> {
        let violation = |reason: &str| Fault::InvariantViolation {
            index: bvs,
            reason: reason.into(),
        };
        if !self.is_bvs(bvs) {
            let fault = violation("not a begin-of-vs-change");
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        // a combined end-and-begin point at `bvs` ends the previous zone, so
        // the matching end is searched strictly after it
        let evs = match self.next_evs(bvs + 1) {
            Some(evs) => evs,
            None => {
                let fault = violation("unmatched begin-of-vs-change");
                self.diagnostics.fault(&fault);
                return Err(fault);
            }
        };

        for ix in bvs + 1..evs {
            if !self.tag(ix).is_some_and(ZoneTag::preserves_altitude) {
                continue;
            }
            let alt = match self.tag(ix).and_then(|t| t.source()) {
                Some(source) => source.position().altitude(),
                // the end-of-vs-change lies on the linear outgoing profile;
                // walk it back to the vertex time
                None => {
                    let vs = self.vs_out(evs, false)?.get::<meter_per_second>();
                    let dt = self.time_seconds(evs)? - self.time_seconds(ix)?;
                    let evs_alt = self.point(evs).ok_or(Fault::TooShort)?.position().altitude();
                    evs_alt - Length::new::<meter>(vs * dt)
                }
            };
            let wp = self.points[ix].waypoint.clone();
            self.points[ix].waypoint = wp.with_position(wp.position().with_altitude(alt));
            let tag = self.points[ix].tag.clone().with_preserve_altitude(false);
            self.points[ix].tag = tag;
        }

        // boundary points shared with a neighbouring zone survive with only
        // the other zone's half of their role
        if self.is_bvs(evs) {
            let role = self.tag(evs).map(|t| t.vs().without_end()).unwrap_or_default();
            self.set_vs_role(evs, role)?;
        } else {
            self.remove(evs)?;
        }
        if self.is_evs(bvs) {
            let role = self.tag(bvs).map(|t| t.vs().without_begin()).unwrap_or_default();
            self.set_vs_role(bvs, role)?;
        } else {
            self.remove(bvs)?;
        }
        Ok(())
    }

    /// Reverts every acceleration zone in the plan, leaving a linear
    /// trajectory.
    ///
    /// With `prune` set, points that became redundant (collinear in both the
    /// horizontal and vertical profile, at unchanged speed) are removed
    /// afterwards with the default thresholds of 1°, 5 kn, and 100 ft/min.
    ///
    /// Individual zones that fail to revert are left in place with the fault
    /// recorded in the diagnostics.
    pub fn revert_all_tcps(&mut self, prune: bool) {
        let mut ix = 0;
        while ix < self.len() {
            if self.is_bgs(ix) {
                // on failure the fault is already recorded; keep going
                let _ = self.revert_gs_tcp(ix);
            }
            ix += 1;
        }
        let mut ix = self.len();
        while ix > 0 {
            ix -= 1;
            if self.is_bvs(ix) {
                let _ = self.revert_vs_tcp(ix);
            }
        }
        let mut ix = self.len();
        while ix > 0 {
            ix -= 1;
            if self.is_bot(ix) {
                let _ = self.revert_turn_tcp(ix);
            }
        }
        if prune {
            self.remove_redundant_points(
                Angle::new::<degree>(1.),
                Speed::new::<knot>(5.),
                Speed::new::<foot_per_minute>(100.),
            );
        }
        self.merge_close_points();
    }

    /// Removes interior points at which the velocity does not change by more
    /// than the given thresholds.
    ///
    /// The first and last points are never removed, and neither are named
    /// points, zone boundaries, mid-of-turn points, altitude-preserving
    /// points, or points carrying free-form info.
    pub fn remove_redundant_points(
        &mut self,
        min_track: impl Into<Angle>,
        min_gs: impl Into<Speed>,
        min_vs: impl Into<Speed>,
    ) {
        let min_track = min_track.into();
        let min_gs = min_gs.into();
        let min_vs = min_vs.into();
        let mut ix = 1;
        while ix + 1 < self.len() {
            let protected = self.points[ix].waypoint.name().is_some()
                || self.points[ix].tag.is_tcp()
                || self.points[ix].tag.is_mid_of_turn()
                || self.points[ix].tag.preserves_altitude()
                || self.points[ix].tag.info().is_some();
            if protected {
                ix += 1;
                continue;
            }
            let (Ok(arriving), Ok(leaving)) =
                (self.final_velocity(ix - 1, true), self.initial_velocity(ix, true))
            else {
                ix += 1;
                continue;
            };
            let redundant = util::track_delta(arriving.track(), leaving.track()) < min_track
                && (leaving.ground_speed() - arriving.ground_speed()).abs() < min_gs
                && (leaving.vertical_speed() - arriving.vertical_speed()).abs() < min_vs;
            if redundant {
                self.points.remove(ix);
            } else {
                ix += 1;
            }
        }
    }
}
