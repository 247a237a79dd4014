//! A kinematic flight-trajectory engine.
//!
//! The central type is a [`Trajectory`]: an ordered sequence of [`Waypoint`]s
//! (position + time + optional name), each carrying a [`ZoneTag`] of
//! acceleration-zone metadata. A trajectory without any zone metadata is
//! *linear*: every segment is flown at constant velocity, and the velocity
//! changes instantaneously at each waypoint. Real aircraft cannot do that,
//! so the crate provides three things on top of the linear model:
//!
//! 1. a **zone generator** ([`make_kinematic_plan`] and the per-kind
//!    [`generate_turn_tcps`], [`generate_gs_tcps`], [`generate_vs_tcps`])
//!    that replaces each instantaneous velocity change with a bounded
//!    acceleration zone: a turn arc of radius `v²/(g·tan(bank))` between a
//!    begin-of-turn and end-of-turn point, and constant-acceleration
//!    ground-speed and vertical-speed change zones between their own
//!    begin/end boundary points;
//! 2. a **query algebra** ([`Trajectory::position_at`],
//!    [`Trajectory::velocity_at`], [`Trajectory::time_from_distance`], and
//!    friends) that evaluates the correct circular or quadratic motion model
//!    inside each zone and plain linear interpolation outside;
//! 3. the **inverse operation** ([`Trajectory::revert_all_tcps`]) that strips
//!    the zones again and recovers the linear source trajectory, plus
//!    consistency and well-formedness checks
//!    ([`Trajectory::is_flyable`] with [`ConsistencyThresholds`]) that decide
//!    whether the zone metadata actually matches the geometry it annotates.
//!
//! Positions are either geodesic (latitude/longitude/altitude on a spherical
//! earth) or Euclidean (local flat-earth meters); one trajectory uses exactly
//! one of the two frames. All physical quantities use [`uom`] units, so a
//! caller thinking in knots and feet per minute never has to agree with the
//! engine about raw floats.
//!
//! Nothing here panics on bad input. Queries return `Result`, mutations that
//! cannot proceed leave the trajectory untouched, and every failure is also
//! recorded in the trajectory's own [`Diagnostics`] log so that a partially
//! infeasible plan remains a valid, inspectable value.
//!
//! # Example
//!
//! Fly two 10 km legs joined by a 90° corner at 180 kn, make the corner
//! flyable at a 20° bank, and look at what the aircraft is doing mid-turn:
//!
//! ```
//! use kinplan::{ConsistencyThresholds, GeneratorConfig, Position, Trajectory, Waypoint};
//! use uom::si::f64::{Angle, Length, Time};
//! use uom::si::{angle::degree, length::meter, time::second};
//!
//! let wp = |x: f64, y: f64, t: f64| {
//!     let position = Position::euclidean(
//!         Length::new::<meter>(x),
//!         Length::new::<meter>(y),
//!         Length::new::<meter>(1000.),
//!     );
//!     Waypoint::new(position, Time::new::<second>(t)).expect("time is non-negative")
//! };
//!
//! let mut linear = Trajectory::named("demo", "two legs at 180 kn");
//! linear.insert(wp(0., 0., 0.)).expect("frame matches");
//! linear.insert(wp(0., 10_000., 108.)).expect("frame matches");
//! linear.insert(wp(10_000., 10_000., 216.)).expect("frame matches");
//!
//! let config = GeneratorConfig::default().with_bank_angle(Angle::new::<degree>(20.));
//! let plan = kinplan::make_kinematic_plan(&linear, None, &config);
//! assert!(!plan.diagnostics().has_error());
//! assert!(plan.is_flyable(&ConsistencyThresholds::strict()));
//!
//! // half-way through the turn the aircraft is tracking roughly north-east
//! let mid_turn = plan
//!     .velocity_at(Time::new::<second>(102.), false)
//!     .expect("inside the plan's window");
//! println!("{mid_turn}");
//!
//! // and the whole thing undoes cleanly
//! let mut reverted = plan.clone();
//! reverted.revert_all_tcps(false);
//! assert!(reverted.is_linear());
//! ```

mod consistency;
mod diagnostics;
mod generator;
mod geodesic;
mod kinematics;
mod positions;
mod query;
mod revert;
mod trajectory;
mod util;
mod velocities;
mod waypoint;
mod zone;

/// The Euclidean point type used by [`Position::Euclidean`].
pub type Point3 = nalgebra::Point3<f64>;

pub use consistency::ConsistencyThresholds;
pub use diagnostics::{Diagnostic, Diagnostics, Fault, Severity};
pub use generator::{
    generate_gs_tcps, generate_turn_tcps, generate_vs_tcps, make_kinematic_plan, GeneratorConfig,
};
pub use kinematics::{bank_turn_radius, turn_duration};
pub use positions::Position;
pub use trajectory::{BoundingBox, Trajectory};
pub use velocities::Velocity;
pub use waypoint::Waypoint;
pub use zone::{GsRole, TurnArc, TurnRole, VsRole, ZoneTag};
