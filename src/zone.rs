use crate::{Position, Waypoint};
use uom::si::f64::{Acceleration, Length};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The geometry of a turn acceleration zone, carried by the point that
/// begins it.
///
/// The radius is signed: its magnitude is the turn radius, its sign the turn
/// direction (positive right/clockwise, negative left).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TurnArc {
    pub signed_radius: Length,
    pub center: Position,
}

impl TurnArc {
    /// The unsigned turn radius.
    #[must_use]
    pub fn radius(&self) -> Length {
        self.signed_radius.abs()
    }

    /// The turn direction: `1.0` for right (clockwise), `-1.0` for left.
    #[must_use]
    pub fn direction(&self) -> f64 {
        if self.signed_radius.value >= 0. {
            1.0
        } else {
            -1.0
        }
    }
}

/// The role a point plays in turn zones.
///
/// Carrying the [`TurnArc`] only on the variants that begin a turn makes
/// "radius is only valid at a BOT" structural rather than a convention.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TurnRole {
    #[default]
    None,
    /// Begin of turn.
    Bot(TurnArc),
    /// End of one turn and begin of the next at the same point.
    EotBot(TurnArc),
    /// End of turn.
    Eot,
}

impl TurnRole {
    #[must_use]
    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot(_) | Self::EotBot(_))
    }

    #[must_use]
    pub fn is_eot(&self) -> bool {
        matches!(self, Self::Eot | Self::EotBot(_))
    }

    /// The arc begun at this point, if any.
    #[must_use]
    pub fn arc(&self) -> Option<TurnArc> {
        match *self {
            Self::Bot(arc) | Self::EotBot(arc) => Some(arc),
            _ => None,
        }
    }

    /// This role with its begin half removed.
    #[must_use]
    pub(crate) fn without_begin(self) -> Self {
        match self {
            Self::Bot(_) => Self::None,
            Self::EotBot(_) => Self::Eot,
            other => other,
        }
    }

    /// This role with its end half removed.
    #[must_use]
    pub(crate) fn without_end(self) -> Self {
        match self {
            Self::Eot => Self::None,
            Self::EotBot(arc) => Self::Bot(arc),
            other => other,
        }
    }

    /// Combines the roles of two points that land at the same time, if they
    /// are compatible (at most one begin and one end between them).
    fn merged_with(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::None, r) | (r, Self::None) => Some(r),
            (Self::Bot(arc), Self::Eot) | (Self::Eot, Self::Bot(arc)) => Some(Self::EotBot(arc)),
            _ => None,
        }
    }
}

/// The role a point plays in ground-speed change zones.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GsRole {
    #[default]
    None,
    /// Begin of ground-speed change, with the constant acceleration applied
    /// until the matching end.
    Bgs { accel: Acceleration },
    /// End of one ground-speed change and begin of the next.
    EgsBgs { accel: Acceleration },
    /// End of ground-speed change.
    Egs,
}

impl GsRole {
    #[must_use]
    pub fn is_bgs(&self) -> bool {
        matches!(self, Self::Bgs { .. } | Self::EgsBgs { .. })
    }

    #[must_use]
    pub fn is_egs(&self) -> bool {
        matches!(self, Self::Egs | Self::EgsBgs { .. })
    }

    /// The acceleration of the zone begun at this point, if any.
    #[must_use]
    pub fn accel(&self) -> Option<Acceleration> {
        match *self {
            Self::Bgs { accel } | Self::EgsBgs { accel } => Some(accel),
            _ => None,
        }
    }

    #[must_use]
    pub(crate) fn without_begin(self) -> Self {
        match self {
            Self::Bgs { .. } => Self::None,
            Self::EgsBgs { .. } => Self::Egs,
            other => other,
        }
    }

    #[must_use]
    pub(crate) fn without_end(self) -> Self {
        match self {
            Self::Egs => Self::None,
            Self::EgsBgs { accel } => Self::Bgs { accel },
            other => other,
        }
    }

    fn merged_with(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::None, r) | (r, Self::None) => Some(r),
            (Self::Bgs { accel }, Self::Egs) | (Self::Egs, Self::Bgs { accel }) => {
                Some(Self::EgsBgs { accel })
            }
            _ => None,
        }
    }
}

/// The role a point plays in vertical-speed change zones.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VsRole {
    #[default]
    None,
    /// Begin of vertical-speed change.
    Bvs { accel: Acceleration },
    /// End of one vertical-speed change and begin of the next.
    EvsBvs { accel: Acceleration },
    /// End of vertical-speed change.
    Evs,
}

impl VsRole {
    #[must_use]
    pub fn is_bvs(&self) -> bool {
        matches!(self, Self::Bvs { .. } | Self::EvsBvs { .. })
    }

    #[must_use]
    pub fn is_evs(&self) -> bool {
        matches!(self, Self::Evs | Self::EvsBvs { .. })
    }

    #[must_use]
    pub fn accel(&self) -> Option<Acceleration> {
        match *self {
            Self::Bvs { accel } | Self::EvsBvs { accel } => Some(accel),
            _ => None,
        }
    }

    #[must_use]
    pub(crate) fn without_begin(self) -> Self {
        match self {
            Self::Bvs { .. } => Self::None,
            Self::EvsBvs { .. } => Self::Evs,
            other => other,
        }
    }

    #[must_use]
    pub(crate) fn without_end(self) -> Self {
        match self {
            Self::Evs => Self::None,
            Self::EvsBvs { accel } => Self::Bvs { accel },
            other => other,
        }
    }

    fn merged_with(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::None, r) | (r, Self::None) => Some(r),
            (Self::Bvs { accel }, Self::Evs) | (Self::Evs, Self::Bvs { accel }) => {
                Some(Self::EvsBvs { accel })
            }
            _ => None,
        }
    }
}

/// Per-point zone metadata, owned 1:1 by a trajectory slot.
///
/// The three role kinds are independent: a point can begin a turn, end a
/// ground-speed change, and sit in the middle of a vertical-speed change all
/// at once. The boolean markers are likewise independent of the roles.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ZoneTag {
    pub(crate) turn: TurnRole,
    pub(crate) gs: GsRole,
    pub(crate) vs: VsRole,
    /// Marks the designated mid-of-turn point inside a turn zone.
    pub(crate) mid_of_turn: bool,
    /// Marks a point synthesized by the engine rather than supplied by the
    /// caller; virtual points are fair game for cleanup passes.
    pub(crate) is_virtual: bool,
    /// Marks a point of the original linear trajectory.
    pub(crate) original: bool,
    /// Marks a point whose altitude must survive re-interpolation.
    pub(crate) preserve_altitude: bool,
    /// Independent copy of the linear waypoint this point derives from.
    pub(crate) source: Option<Waypoint>,
    /// Index of the source point in the linear trajectory.
    pub(crate) linear_index: Option<usize>,
    /// Free-text diagnostic/round-trip annotation.
    pub(crate) info: Option<String>,
}

impl ZoneTag {
    /// A tag with no roles and no markers.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn turn(&self) -> TurnRole {
        self.turn
    }

    #[must_use]
    pub fn gs(&self) -> GsRole {
        self.gs
    }

    #[must_use]
    pub fn vs(&self) -> VsRole {
        self.vs
    }

    #[must_use]
    pub fn is_mid_of_turn(&self) -> bool {
        self.mid_of_turn
    }

    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    #[must_use]
    pub fn is_original(&self) -> bool {
        self.original
    }

    #[must_use]
    pub fn preserves_altitude(&self) -> bool {
        self.preserve_altitude
    }

    #[must_use]
    pub fn source(&self) -> Option<&Waypoint> {
        self.source.as_ref()
    }

    #[must_use]
    pub fn linear_index(&self) -> Option<usize> {
        self.linear_index
    }

    #[must_use]
    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// Whether this point begins or ends any acceleration zone.
    #[must_use]
    pub fn is_tcp(&self) -> bool {
        self.turn != TurnRole::None || self.gs != GsRole::None || self.vs != VsRole::None
    }

    #[must_use]
    pub fn with_turn(mut self, turn: TurnRole) -> Self {
        self.turn = turn;
        self
    }

    #[must_use]
    pub fn with_gs(mut self, gs: GsRole) -> Self {
        self.gs = gs;
        self
    }

    #[must_use]
    pub fn with_vs(mut self, vs: VsRole) -> Self {
        self.vs = vs;
        self
    }

    #[must_use]
    pub fn with_mid_of_turn(mut self, mid_of_turn: bool) -> Self {
        self.mid_of_turn = mid_of_turn;
        self
    }

    #[must_use]
    pub fn with_virtual(mut self, is_virtual: bool) -> Self {
        self.is_virtual = is_virtual;
        self
    }

    #[must_use]
    pub fn with_original(mut self, original: bool) -> Self {
        self.original = original;
        self
    }

    #[must_use]
    pub fn with_preserve_altitude(mut self, preserve_altitude: bool) -> Self {
        self.preserve_altitude = preserve_altitude;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Option<Waypoint>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_linear_index(mut self, linear_index: Option<usize>) -> Self {
        self.linear_index = linear_index;
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        let info = info.into();
        self.info = if info.is_empty() { None } else { Some(info) };
        self
    }

    /// Appends to the free-text annotation rather than replacing it.
    pub(crate) fn append_info(&mut self, extra: &str) {
        if extra.is_empty() {
            return;
        }
        match &mut self.info {
            Some(info) => info.push_str(extra),
            None => self.info = Some(extra.to_owned()),
        }
    }

    /// Combines the tags of two points that land at the same time.
    ///
    /// Succeeds when no role kind collides (at most one begin and one end of
    /// each kind between the two tags); markers are OR-ed, annotations
    /// concatenated. Returns `None` when the tags are incompatible, in which
    /// case the insertion that triggered the merge must be rejected.
    #[must_use]
    pub(crate) fn merged_with(&self, other: &Self) -> Option<Self> {
        let mut merged = Self {
            turn: self.turn.merged_with(other.turn)?,
            gs: self.gs.merged_with(other.gs)?,
            vs: self.vs.merged_with(other.vs)?,
            mid_of_turn: self.mid_of_turn || other.mid_of_turn,
            is_virtual: self.is_virtual && other.is_virtual,
            original: self.original || other.original,
            preserve_altitude: self.preserve_altitude || other.preserve_altitude,
            source: self.source.clone().or_else(|| other.source.clone()),
            linear_index: self.linear_index.or(other.linear_index),
            info: self.info.clone(),
        };
        if let Some(extra) = other.info.as_deref() {
            merged.append_info(extra);
        }
        Some(merged)
    }
}
