use crate::{Position, Velocity};
use std::fmt;
use std::fmt::Display;
use uom::si::f64::Time;
use uom::si::time::second;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An immutable point of a trajectory: a position, the time at which the
/// aircraft is there, and an optional human-readable name.
///
/// Waypoints are values; a trajectory never mutates one in place, it replaces
/// it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Waypoint {
    position: Position,
    time: Time,
    name: Option<String>,
}

impl Waypoint {
    /// Constructs an unnamed waypoint.
    ///
    /// The time must be finite and non-negative; otherwise this returns
    /// `None`.
    #[must_use]
    pub fn new(position: Position, time: impl Into<Time>) -> Option<Self> {
        let time = time.into();
        let seconds = time.get::<second>();
        if !seconds.is_finite() || seconds < 0. {
            return None;
        }
        Some(Self {
            position,
            time,
            name: None,
        })
    }

    /// Constructs a named waypoint; same time validity rules as [`Waypoint::new`].
    #[must_use]
    pub fn named(position: Position, time: impl Into<Time>, name: impl Into<String>) -> Option<Self> {
        Some(Self {
            name: Some(name.into()),
            ..Self::new(position, time)?
        })
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn time(&self) -> Time {
        self.time
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns this waypoint with the position replaced.
    #[must_use]
    pub fn with_position(&self, position: Position) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    /// Returns this waypoint with the time replaced. The caller is
    /// responsible for keeping the containing trajectory's time order intact.
    #[must_use]
    pub fn with_time(&self, time: impl Into<Time>) -> Self {
        Self {
            time: time.into(),
            ..self.clone()
        }
    }

    /// Returns this waypoint with the name replaced (or cleared).
    #[must_use]
    pub fn with_name(&self, name: Option<String>) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    /// Extrapolates this waypoint along `velocity` for the (possibly
    /// negative) duration `dt`, producing the waypoint a constant-velocity
    /// aircraft would reach.
    #[must_use]
    pub fn extrapolate(&self, velocity: &Velocity, dt: impl Into<Time>) -> Self {
        let dt = dt.into();
        let position = self
            .position
            .project(velocity.track(), velocity.ground_speed() * dt)
            .with_altitude(self.position.altitude() + velocity.vertical_speed() * dt);
        Self {
            position,
            time: self.time + dt,
            name: None,
        }
    }

    /// Computes the constant velocity that carries an aircraft from this
    /// waypoint to `other` in the time between them.
    ///
    /// Returns `None` if the positions live in different frames or `other`
    /// is not strictly later than `self`.
    #[must_use]
    pub fn initial_velocity_to(&self, other: &Self) -> Option<Velocity> {
        let dt = other.time - self.time;
        if dt.get::<second>() <= 0. {
            return None;
        }
        let track = self.position.track_to(&other.position)?;
        let gs = self.position.horizontal_distance(&other.position)? / dt;
        let vs = self.position.vertical_distance(&other.position)? / dt;
        Some(Velocity::new(track, gs, vs))
    }
}

impl Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} {} @ {:.3} s", name, self.position, self.time.get::<second>()),
            None => write!(f, "{} @ {:.3} s", self.position, self.time.get::<second>()),
        }
    }
}
