use crate::diagnostics::{Diagnostics, Fault};
use crate::util::MIN_DT_SECONDS;
use crate::zone::{GsRole, TurnArc, TurnRole, VsRole, ZoneTag};
use crate::{Position, Waypoint};
use std::fmt;
use std::fmt::Display;
use std::ops::Range;
use uom::si::f64::{Acceleration, Length, Time};
use uom::si::time::second;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One slot of a trajectory: a waypoint and the zone metadata it carries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub(crate) struct Slot {
    pub(crate) waypoint: Waypoint,
    pub(crate) tag: ZoneTag,
}

/// An axis-aligned bounding box over all waypoint positions of a trajectory.
///
/// For a geodesic trajectory the components are latitude, longitude, and
/// altitude; for a Euclidean one they are x, y, and z.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    pub min: Position,
    pub max: Position,
}

/// An ordered sequence of waypoints with per-point acceleration-zone
/// metadata, strictly increasing in time.
///
/// A trajectory is either *linear* (no zone metadata anywhere; every segment
/// is flown at constant velocity with instantaneous changes at waypoints) or
/// *kinematic* (turn, ground-speed, and vertical-speed zones describe how the
/// aircraft actually accelerates between the linear states). The zone
/// generator in this crate turns the former into the latter; the reversion
/// layer goes back.
///
/// All waypoints of one trajectory live in the same frame (geodesic or
/// Euclidean); inserting a waypoint from the other frame is rejected.
///
/// Failed operations never panic and never leave the trajectory in a broken
/// state: queries return `Result`/`Option`, and mutating operations that
/// cannot proceed leave the trajectory untouched and record a diagnostic in
/// its [`Diagnostics`] log.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trajectory {
    pub(crate) name: String,
    pub(crate) note: String,
    pub(crate) points: Vec<Slot>,
    pub(crate) diagnostics: Diagnostics,
}

impl Trajectory {
    /// Constructs an empty, unnamed trajectory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs an empty trajectory with a name and a note.
    #[must_use]
    pub fn named(name: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            note: note.into(),
            ..Self::default()
        }
    }

    /// Constructs a two-point linear trajectory from a single known state:
    /// the aircraft is at `position` with `velocity` at time `start`, and the
    /// trajectory extrapolates that state until `end`.
    ///
    /// Returns `None` when the window is empty (`end <= start + MIN_DT`) or
    /// the start time is invalid.
    #[must_use]
    pub fn from_state(
        name: impl Into<String>,
        position: Position,
        velocity: &crate::Velocity,
        start: impl Into<Time>,
        end: impl Into<Time>,
    ) -> Option<Self> {
        let start = start.into();
        let end = end.into();
        if (end - start).get::<second>() <= MIN_DT_SECONDS {
            return None;
        }
        let first = Waypoint::new(position, start)?;
        let last = first.extrapolate(velocity, end - start);
        let mut plan = Self::named(name, "");
        plan.points.push(Slot {
            waypoint: first,
            tag: ZoneTag::none().with_original(true),
        });
        plan.points.push(Slot {
            waypoint: last,
            tag: ZoneTag::none().with_original(true),
        });
        Some(plan)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    /// The accumulated diagnostic log.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates over all `(waypoint, tag)` pairs in time order.
    pub fn iter(&self) -> impl Iterator<Item = (&Waypoint, &ZoneTag)> {
        self.points.iter().map(|s| (&s.waypoint, &s.tag))
    }

    #[must_use]
    pub fn point(&self, ix: usize) -> Option<&Waypoint> {
        self.points.get(ix).map(|s| &s.waypoint)
    }

    #[must_use]
    pub fn tag(&self, ix: usize) -> Option<&ZoneTag> {
        self.points.get(ix).map(|s| &s.tag)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Waypoint> {
        self.points.first().map(|s| &s.waypoint)
    }

    #[must_use]
    pub fn last(&self) -> Option<&Waypoint> {
        self.points.last().map(|s| &s.waypoint)
    }

    /// The time of point `ix`.
    pub fn time(&self, ix: usize) -> Result<Time, Fault> {
        self.point(ix)
            .map(Waypoint::time)
            .ok_or(Fault::IndexOutOfRange {
                index: ix,
                len: self.len(),
            })
    }

    pub(crate) fn time_seconds(&self, ix: usize) -> Result<f64, Fault> {
        self.time(ix).map(|t| t.get::<second>())
    }

    #[must_use]
    pub fn first_time(&self) -> Option<Time> {
        self.first().map(Waypoint::time)
    }

    #[must_use]
    pub fn last_time(&self) -> Option<Time> {
        self.last().map(Waypoint::time)
    }

    /// The time window `[first, last]` covered by this trajectory.
    #[must_use]
    pub fn window(&self) -> Option<(Time, Time)> {
        Some((self.first_time()?, self.last_time()?))
    }

    /// Whether this trajectory carries no zone metadata at all.
    #[must_use]
    pub fn is_linear(&self) -> bool {
        self.points.iter().all(|s| !s.tag.is_tcp())
    }

    /// The bounding box over all waypoint positions, or `None` when empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut it = self.points.iter().map(|s| s.waypoint.position());
        let first = it.next()?;
        match first {
            Position::LatLon {
                latitude,
                longitude,
                altitude,
            } => {
                let (mut lat_min, mut lat_max) = (latitude, latitude);
                let (mut lon_min, mut lon_max) = (longitude, longitude);
                let (mut alt_min, mut alt_max) = (altitude, altitude);
                for p in it {
                    let Position::LatLon {
                        latitude,
                        longitude,
                        altitude,
                    } = p
                    else {
                        return None;
                    };
                    lat_min = lat_min.min(latitude);
                    lat_max = lat_max.max(latitude);
                    lon_min = lon_min.min(longitude);
                    lon_max = lon_max.max(longitude);
                    alt_min = alt_min.min(altitude);
                    alt_max = alt_max.max(altitude);
                }
                Some(BoundingBox {
                    min: Position::LatLon {
                        latitude: lat_min,
                        longitude: lon_min,
                        altitude: alt_min,
                    },
                    max: Position::LatLon {
                        latitude: lat_max,
                        longitude: lon_max,
                        altitude: alt_max,
                    },
                })
            }
            Position::Euclidean(p0) => {
                let (mut min, mut max) = (p0, p0);
                for p in it {
                    let Position::Euclidean(p) = p else {
                        return None;
                    };
                    min = crate::Point3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
                    max = crate::Point3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
                }
                Some(BoundingBox {
                    min: Position::Euclidean(min),
                    max: Position::Euclidean(max),
                })
            }
        }
    }

    /// Inserts a waypoint with no zone metadata.
    ///
    /// See [`Trajectory::insert_with_tag`].
    pub fn insert(&mut self, waypoint: Waypoint) -> Option<usize> {
        self.insert_with_tag(waypoint, ZoneTag::none())
    }

    /// Inserts a waypoint with an explicit zone tag, keeping the points
    /// sorted by time.
    ///
    /// A waypoint in a different frame than the rest of the trajectory is
    /// rejected with a logged warning. A waypoint landing within `MIN_DT` of
    /// an existing point is merged with it when the tags are compatible (see
    /// well-formedness rules), otherwise the insertion is rejected with a
    /// logged warning.
    ///
    /// Returns the index the waypoint ended up at, or `None` when rejected.
    pub fn insert_with_tag(&mut self, waypoint: Waypoint, tag: ZoneTag) -> Option<usize> {
        if let Some(existing) = self.first() {
            if !existing.position().same_frame(&waypoint.position()) {
                self.diagnostics
                    .warn(None, format!("rejected waypoint in a different frame: {waypoint}"));
                return None;
            }
        }
        let t = waypoint.time().get::<second>();
        let ix = self
            .points
            .partition_point(|s| s.waypoint.time().get::<second>() < t);

        // a point within MIN_DT on either side merges instead of inserting
        for near in [ix.wrapping_sub(1), ix] {
            let Some(slot) = self.points.get(near) else {
                continue;
            };
            if (slot.waypoint.time().get::<second>() - t).abs() >= MIN_DT_SECONDS {
                continue;
            }
            let Some(merged) = slot.tag.merged_with(&tag) else {
                self.diagnostics.warn(
                    Some(near),
                    format!("rejected waypoint at duplicate time with incompatible zone tag: {waypoint}"),
                );
                return None;
            };
            let slot = &mut self.points[near];
            if slot.waypoint.name().is_none() {
                if let Some(name) = waypoint.name() {
                    slot.waypoint = slot.waypoint.with_name(Some(name.to_owned()));
                }
            }
            slot.tag = merged;
            return Some(near);
        }

        self.points.push(Slot { waypoint, tag });
        let last = self.points.len() - 1;
        self.points[ix..=last].rotate_right(1);
        Some(ix)
    }

    /// Removes the point at `ix`.
    pub fn remove(&mut self, ix: usize) -> Result<(), Fault> {
        if ix >= self.len() {
            let fault = Fault::IndexOutOfRange {
                index: ix,
                len: self.len(),
            };
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        self.points.remove(ix);
        Ok(())
    }

    /// Removes all points whose index lies in `range`.
    pub fn remove_range(&mut self, range: Range<usize>) -> Result<(), Fault> {
        if range.end > self.len() {
            let fault = Fault::IndexOutOfRange {
                index: range.end,
                len: self.len(),
            };
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        self.points.drain(range);
        Ok(())
    }

    /// Replaces the waypoint at `ix`, keeping its tag.
    ///
    /// The replacement must preserve strict time ordering with respect to the
    /// neighbouring points; otherwise the trajectory is left untouched.
    pub fn replace_waypoint(&mut self, ix: usize, waypoint: Waypoint) -> Result<(), Fault> {
        if ix >= self.len() {
            let fault = Fault::IndexOutOfRange {
                index: ix,
                len: self.len(),
            };
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        let t = waypoint.time().get::<second>();
        let lower_ok = ix == 0 || self.time_seconds(ix - 1)? + MIN_DT_SECONDS <= t;
        let upper_ok = ix + 1 >= self.len() || t + MIN_DT_SECONDS <= self.time_seconds(ix + 1)?;
        if !lower_ok || !upper_ok {
            let fault = Fault::InvariantViolation {
                index: ix,
                reason: "replacement waypoint breaks time ordering".into(),
            };
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        self.points[ix].waypoint = waypoint;
        Ok(())
    }

    /// Replaces the zone tag at `ix`, keeping its waypoint.
    pub fn replace_tag(&mut self, ix: usize, tag: ZoneTag) -> Result<(), Fault> {
        if ix >= self.len() {
            let fault = Fault::IndexOutOfRange {
                index: ix,
                len: self.len(),
            };
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        self.points[ix].tag = tag;
        Ok(())
    }

    /// Shifts the times of all points from `ix` (inclusive) to the end by
    /// `dt`, which may be negative as long as ordering against the point
    /// before `ix` survives.
    pub fn time_shift_from(&mut self, ix: usize, dt: impl Into<Time>) -> Result<(), Fault> {
        let dt = dt.into();
        if ix >= self.len() {
            let fault = Fault::IndexOutOfRange {
                index: ix,
                len: self.len(),
            };
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        let shifted_first = (self.time(ix)? + dt).get::<second>();
        if !shifted_first.is_finite() || shifted_first < 0. {
            let fault = Fault::InvalidTime(shifted_first);
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        if ix > 0 && shifted_first < self.time_seconds(ix - 1)? + MIN_DT_SECONDS {
            let fault = Fault::InvariantViolation {
                index: ix,
                reason: "time shift breaks time ordering".into(),
            };
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        for slot in &mut self.points[ix..] {
            slot.waypoint = slot.waypoint.with_time(slot.waypoint.time() + dt);
        }
        Ok(())
    }

    /// Returns a copy of this trajectory with all times shifted by `dt`.
    #[must_use]
    pub fn copy_and_time_shift(&self, dt: impl Into<Time>) -> Option<Self> {
        let dt = dt.into();
        let mut copy = self.clone();
        if copy.is_empty() {
            return Some(copy);
        }
        copy.time_shift_from(0, dt).ok()?;
        Some(copy)
    }

    /// Appends all points of `other`, which must start after this trajectory
    /// ends.
    pub fn append(&mut self, other: &Trajectory) -> Result<(), Fault> {
        if let (Some(last), Some(first)) = (self.last(), other.first()) {
            if !last.position().same_frame(&first.position()) {
                let fault = Fault::FrameMismatch;
                self.diagnostics.fault(&fault);
                return Err(fault);
            }
            let gap = (first.time() - last.time()).get::<second>();
            if gap < MIN_DT_SECONDS {
                let fault = Fault::InvariantViolation {
                    index: self.len(),
                    reason: "appended trajectory starts before this one ends".into(),
                };
                self.diagnostics.fault(&fault);
                return Err(fault);
            }
        }
        self.points.extend(other.points.iter().cloned());
        self.diagnostics.absorb(&other.diagnostics);
        Ok(())
    }

    /// Returns the sub-trajectory covering the points in `range`, with the
    /// name, note, and diagnostics of the original.
    #[must_use]
    pub fn cut(&self, range: Range<usize>) -> Self {
        let range = range.start.min(self.len())..range.end.min(self.len());
        Self {
            name: self.name.clone(),
            note: self.note.clone(),
            points: self.points[range].to_vec(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// The index of the segment whose time range contains `t`, i.e. the
    /// greatest `ix` with `time(ix) <= t`. A query at exactly the last time
    /// returns the last index.
    ///
    /// Returns `None` when `t` lies outside the trajectory window.
    #[must_use]
    pub fn segment_of_time(&self, t: impl Into<Time>) -> Option<usize> {
        let t = t.into().get::<second>();
        let (first, last) = self.window()?;
        if t < first.get::<second>() || t > last.get::<second>() {
            return None;
        }
        let after = self
            .points
            .partition_point(|s| s.waypoint.time().get::<second>() <= t);
        Some(after.saturating_sub(1).min(self.len() - 1))
    }

    /// The index of the point closest in time to `t` (clamped to the ends).
    #[must_use]
    pub fn nearest_index(&self, t: impl Into<Time>) -> Option<usize> {
        let t = t.into().get::<second>();
        if self.is_empty() {
            return None;
        }
        let after = self
            .points
            .partition_point(|s| s.waypoint.time().get::<second>() <= t);
        if after == 0 {
            return Some(0);
        }
        if after == self.len() {
            return Some(self.len() - 1);
        }
        let before_dt = t - self.points[after - 1].waypoint.time().get::<second>();
        let after_dt = self.points[after].waypoint.time().get::<second>() - t;
        Some(if before_dt <= after_dt { after - 1 } else { after })
    }

    /// The index of the first point with the given name.
    #[must_use]
    pub fn find_name(&self, name: &str) -> Option<usize> {
        self.points
            .iter()
            .position(|s| s.waypoint.name() == Some(name))
    }

    // role predicates; all false for out-of-range indices

    #[must_use]
    pub fn is_bot(&self, ix: usize) -> bool {
        self.tag(ix).is_some_and(|t| t.turn().is_bot())
    }

    #[must_use]
    pub fn is_eot(&self, ix: usize) -> bool {
        self.tag(ix).is_some_and(|t| t.turn().is_eot())
    }

    #[must_use]
    pub fn is_bgs(&self, ix: usize) -> bool {
        self.tag(ix).is_some_and(|t| t.gs().is_bgs())
    }

    #[must_use]
    pub fn is_egs(&self, ix: usize) -> bool {
        self.tag(ix).is_some_and(|t| t.gs().is_egs())
    }

    #[must_use]
    pub fn is_bvs(&self, ix: usize) -> bool {
        self.tag(ix).is_some_and(|t| t.vs().is_bvs())
    }

    #[must_use]
    pub fn is_evs(&self, ix: usize) -> bool {
        self.tag(ix).is_some_and(|t| t.vs().is_evs())
    }

    #[must_use]
    pub fn is_tcp(&self, ix: usize) -> bool {
        self.tag(ix).is_some_and(ZoneTag::is_tcp)
    }

    #[must_use]
    pub fn is_mot(&self, ix: usize) -> bool {
        self.tag(ix).is_some_and(ZoneTag::is_mid_of_turn)
    }

    // boundary scans

    /// The greatest index `j <= ix` that begins a turn.
    #[must_use]
    pub fn prev_bot(&self, ix: usize) -> Option<usize> {
        (0..=ix.min(self.len().saturating_sub(1)))
            .rev()
            .find(|&j| self.is_bot(j))
    }

    /// The greatest index `j <= ix` that ends a turn.
    #[must_use]
    pub fn prev_eot(&self, ix: usize) -> Option<usize> {
        (0..=ix.min(self.len().saturating_sub(1)))
            .rev()
            .find(|&j| self.is_eot(j))
    }

    /// The smallest index `j >= ix` that ends a turn.
    #[must_use]
    pub fn next_eot(&self, ix: usize) -> Option<usize> {
        (ix..self.len()).find(|&j| self.is_eot(j))
    }

    #[must_use]
    pub fn prev_bgs(&self, ix: usize) -> Option<usize> {
        (0..=ix.min(self.len().saturating_sub(1)))
            .rev()
            .find(|&j| self.is_bgs(j))
    }

    #[must_use]
    pub fn prev_egs(&self, ix: usize) -> Option<usize> {
        (0..=ix.min(self.len().saturating_sub(1)))
            .rev()
            .find(|&j| self.is_egs(j))
    }

    #[must_use]
    pub fn next_egs(&self, ix: usize) -> Option<usize> {
        (ix..self.len()).find(|&j| self.is_egs(j))
    }

    #[must_use]
    pub fn prev_bvs(&self, ix: usize) -> Option<usize> {
        (0..=ix.min(self.len().saturating_sub(1)))
            .rev()
            .find(|&j| self.is_bvs(j))
    }

    #[must_use]
    pub fn prev_evs(&self, ix: usize) -> Option<usize> {
        (0..=ix.min(self.len().saturating_sub(1)))
            .rev()
            .find(|&j| self.is_evs(j))
    }

    #[must_use]
    pub fn next_evs(&self, ix: usize) -> Option<usize> {
        (ix..self.len()).find(|&j| self.is_evs(j))
    }

    /// The greatest index `j <= ix` that begins or ends any zone.
    #[must_use]
    pub fn prev_tcp(&self, ix: usize) -> Option<usize> {
        (0..=ix.min(self.len().saturating_sub(1)))
            .rev()
            .find(|&j| self.is_tcp(j))
    }

    /// The smallest index `j >= ix` that begins or ends any zone.
    #[must_use]
    pub fn next_tcp(&self, ix: usize) -> Option<usize> {
        (ix..self.len()).find(|&j| self.is_tcp(j))
    }

    // zone membership, by segment index: segment `seg` spans
    // [time(seg), time(seg+1))

    /// If segment `seg` lies inside a turn zone, the index of the governing
    /// BOT.
    #[must_use]
    pub fn segment_in_turn(&self, seg: usize) -> Option<usize> {
        let bot = self.prev_bot(seg)?;
        // an EOT strictly after the BOT but at or before seg closes the zone
        let closed = (bot + 1..=seg.min(self.len().saturating_sub(1))).any(|j| self.is_eot(j));
        (!closed).then_some(bot)
    }

    /// If segment `seg` lies inside a ground-speed change zone, the index of
    /// the governing BGS.
    #[must_use]
    pub fn segment_in_gs_change(&self, seg: usize) -> Option<usize> {
        let bgs = self.prev_bgs(seg)?;
        let closed = (bgs + 1..=seg.min(self.len().saturating_sub(1))).any(|j| self.is_egs(j));
        (!closed).then_some(bgs)
    }

    /// If segment `seg` lies inside a vertical-speed change zone, the index
    /// of the governing BVS.
    #[must_use]
    pub fn segment_in_vs_change(&self, seg: usize) -> Option<usize> {
        let bvs = self.prev_bvs(seg)?;
        let closed = (bvs + 1..=seg.min(self.len().saturating_sub(1))).any(|j| self.is_evs(j));
        (!closed).then_some(bvs)
    }

    /// Whether segment `seg` lies inside any acceleration zone.
    #[must_use]
    pub fn segment_in_accel(&self, seg: usize) -> bool {
        self.segment_in_turn(seg).is_some()
            || self.segment_in_gs_change(seg).is_some()
            || self.segment_in_vs_change(seg).is_some()
    }

    // zone-field accessors

    /// The turn arc begun at `ix`, if `ix` is a BOT.
    #[must_use]
    pub fn turn_arc(&self, ix: usize) -> Option<TurnArc> {
        self.tag(ix).and_then(|t| t.turn().arc())
    }

    /// The turn center stored at `ix`, if `ix` is a BOT.
    #[must_use]
    pub fn turn_center(&self, ix: usize) -> Option<Position> {
        self.turn_arc(ix).map(|arc| arc.center)
    }

    /// The signed turn radius stored at `ix`, if `ix` is a BOT.
    #[must_use]
    pub fn signed_radius(&self, ix: usize) -> Option<Length> {
        self.turn_arc(ix).map(|arc| arc.signed_radius)
    }

    /// The ground-speed acceleration of the zone begun at `ix`, if `ix` is a
    /// BGS.
    #[must_use]
    pub fn gs_accel(&self, ix: usize) -> Option<Acceleration> {
        self.tag(ix).and_then(|t| t.gs().accel())
    }

    /// The vertical-speed acceleration of the zone begun at `ix`, if `ix` is
    /// a BVS.
    #[must_use]
    pub fn vs_accel(&self, ix: usize) -> Option<Acceleration> {
        self.tag(ix).and_then(|t| t.vs().accel())
    }

    // role mutation

    pub fn set_turn_role(&mut self, ix: usize, turn: TurnRole) -> Result<(), Fault> {
        let tag = self.require_tag(ix)?.clone().with_turn(turn);
        self.points[ix].tag = tag;
        Ok(())
    }

    pub fn set_gs_role(&mut self, ix: usize, gs: GsRole) -> Result<(), Fault> {
        let tag = self.require_tag(ix)?.clone().with_gs(gs);
        self.points[ix].tag = tag;
        Ok(())
    }

    pub fn set_vs_role(&mut self, ix: usize, vs: VsRole) -> Result<(), Fault> {
        let tag = self.require_tag(ix)?.clone().with_vs(vs);
        self.points[ix].tag = tag;
        Ok(())
    }

    pub fn set_mid_of_turn(&mut self, ix: usize, mid_of_turn: bool) -> Result<(), Fault> {
        let tag = self.require_tag(ix)?.clone().with_mid_of_turn(mid_of_turn);
        self.points[ix].tag = tag;
        Ok(())
    }

    fn require_tag(&mut self, ix: usize) -> Result<&ZoneTag, Fault> {
        if ix >= self.len() {
            let fault = Fault::IndexOutOfRange {
                index: ix,
                len: self.len(),
            };
            self.diagnostics.fault(&fault);
            return Err(fault);
        }
        Ok(&self.points[ix].tag)
    }

    /// Strips begin roles with no later matching end and end roles with no
    /// earlier matching begin, leaving a trajectory whose zones all pair up.
    ///
    /// This is the coarse repair applied to externally-sourced trajectories
    /// whose zone metadata got truncated; it does not touch balanced zones.
    pub fn repair_unbalanced_tags(&mut self) {
        // begin with no end: the next same-kind boundary after a begin must be
        // an end
        for ix in 0..self.len() {
            let turn = self.points[ix].tag.turn();
            if turn.is_bot() {
                let next = (ix + 1..self.len()).find(|&j| self.is_bot(j) || self.is_eot(j));
                if !next.is_some_and(|j| self.is_eot(j)) {
                    self.points[ix].tag.turn = turn.without_begin();
                    self.diagnostics
                        .warn(Some(ix), "stripped unmatched begin-of-turn");
                }
            }
            let gs = self.points[ix].tag.gs();
            if gs.is_bgs() {
                let next = (ix + 1..self.len()).find(|&j| self.is_bgs(j) || self.is_egs(j));
                if !next.is_some_and(|j| self.is_egs(j)) {
                    self.points[ix].tag.gs = gs.without_begin();
                    self.diagnostics
                        .warn(Some(ix), "stripped unmatched begin-of-gs-change");
                }
            }
            let vs = self.points[ix].tag.vs();
            if vs.is_bvs() {
                let next = (ix + 1..self.len()).find(|&j| self.is_bvs(j) || self.is_evs(j));
                if !next.is_some_and(|j| self.is_evs(j)) {
                    self.points[ix].tag.vs = vs.without_begin();
                    self.diagnostics
                        .warn(Some(ix), "stripped unmatched begin-of-vs-change");
                }
            }
        }
        // end with no begin, scanned the other way
        for ix in (0..self.len()).rev() {
            let turn = self.points[ix].tag.turn();
            if turn.is_eot() {
                let prev = (0..ix).rev().find(|&j| self.is_bot(j) || self.is_eot(j));
                if !prev.is_some_and(|j| self.is_bot(j)) {
                    self.points[ix].tag.turn = turn.without_end();
                    self.diagnostics
                        .warn(Some(ix), "stripped unmatched end-of-turn");
                }
            }
            let gs = self.points[ix].tag.gs();
            if gs.is_egs() {
                let prev = (0..ix).rev().find(|&j| self.is_bgs(j) || self.is_egs(j));
                if !prev.is_some_and(|j| self.is_bgs(j)) {
                    self.points[ix].tag.gs = gs.without_end();
                    self.diagnostics
                        .warn(Some(ix), "stripped unmatched end-of-gs-change");
                }
            }
            let vs = self.points[ix].tag.vs();
            if vs.is_evs() {
                let prev = (0..ix).rev().find(|&j| self.is_bvs(j) || self.is_evs(j));
                if !prev.is_some_and(|j| self.is_bvs(j)) {
                    self.points[ix].tag.vs = vs.without_end();
                    self.diagnostics
                        .warn(Some(ix), "stripped unmatched end-of-vs-change");
                }
            }
        }
    }
}


impl Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trajectory \"{}\" ({} points)", self.name, self.len())?;
        for (ix, (wp, tag)) in self.iter().enumerate() {
            let mut roles = String::new();
            if tag.turn().is_eot() {
                roles.push_str(" EOT");
            }
            if tag.turn().is_bot() {
                roles.push_str(" BOT");
            }
            if tag.gs().is_egs() {
                roles.push_str(" EGS");
            }
            if tag.gs().is_bgs() {
                roles.push_str(" BGS");
            }
            if tag.vs().is_evs() {
                roles.push_str(" EVS");
            }
            if tag.vs().is_bvs() {
                roles.push_str(" BVS");
            }
            if tag.is_mid_of_turn() {
                roles.push_str(" MOT");
            }
            writeln!(f, "  [{ix}] {wp}{roles}")?;
        }
        Ok(())
    }
}
