use std::fmt;
use std::fmt::Display;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything that can go wrong inside the trajectory engine.
///
/// Faults never abort work on a trajectory: operations that hit one either
/// return it as a `Result` error (queries) or record it in the trajectory's
/// [`Diagnostics`] and leave the trajectory unmodified (generation).
#[derive(Debug, Error, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Fault {
    #[error("index {index} out of range for trajectory of {len} points")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("time {time:.3} s outside the trajectory window [{first:.3} s, {last:.3} s]")]
    TimeOutOfWindow { time: f64, first: f64, last: f64 },

    #[error("time {0} s is negative or not finite")]
    InvalidTime(f64),

    #[error("distance {0:.1} m is not reachable along the trajectory")]
    DistanceOutOfRange(f64),

    #[error("positions live in different frames (geodesic vs Euclidean)")]
    FrameMismatch,

    #[error("trajectory has fewer than two points")]
    TooShort,

    #[error("turn at index {index} infeasible: {reason}")]
    InfeasibleTurn { index: usize, reason: String },

    #[error("ground-speed change at index {index} infeasible: {reason}")]
    InfeasibleGsChange { index: usize, reason: String },

    #[error("vertical-speed change at index {index} infeasible: {reason}")]
    InfeasibleVsChange { index: usize, reason: String },

    #[error("invariant violation at index {index}: {reason}")]
    InvariantViolation { index: usize, reason: String },
}

/// How serious a recorded diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    Warning,
    Error,
}

/// One recorded diagnostic: a severity, a message, and optionally the index
/// of the offending point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    index: Option<usize>,
}

impl Diagnostic {
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match self.index {
            Some(ix) => write!(f, "{tag} [{ix}]: {}", self.message),
            None => write!(f, "{tag}: {}", self.message),
        }
    }
}

/// An accumulated, clearable diagnostic log attached to each trajectory.
///
/// Any operation may append to it without aborting; a trajectory with errors
/// in its log is still a valid, queryable value. Callers check
/// [`Diagnostics::has_error`] before committing to flying a plan.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn warn(&mut self, index: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(index, "{message}");
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message,
            index,
        });
    }

    pub(crate) fn error(&mut self, index: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(index, "{message}");
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            message,
            index,
        });
    }

    /// Records a [`Fault`] as an error entry.
    pub(crate) fn fault(&mut self, fault: &Fault) {
        let index = match *fault {
            Fault::IndexOutOfRange { index, .. }
            | Fault::InfeasibleTurn { index, .. }
            | Fault::InfeasibleGsChange { index, .. }
            | Fault::InfeasibleVsChange { index, .. }
            | Fault::InvariantViolation { index, .. } => Some(index),
            _ => None,
        };
        self.error(index, fault.to_string());
    }

    /// Whether any entry (of either severity) has been recorded.
    #[must_use]
    pub fn has_message(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Whether any error-severity entry has been recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.severity == Severity::Error)
    }

    /// All recorded entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// All recorded messages joined into one string, without clearing the
    /// log. Empty when nothing has been recorded.
    #[must_use]
    pub fn message(&self) -> String {
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Like [`Diagnostics::message`], but clears the log.
    #[must_use]
    pub fn take_message(&mut self) -> String {
        let message = self.message();
        self.entries.clear();
        message
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copies all entries of `other` onto the end of this log.
    pub(crate) fn absorb(&mut self, other: &Self) {
        self.entries.extend(other.entries.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut diag = Diagnostics::new();
        diag.warn(Some(3), "point close to its neighbour");
        assert!(diag.has_message());
        assert!(!diag.has_error());

        diag.error(None, "turn infeasible");
        assert!(diag.has_error());
    }

    #[test]
    fn take_message_clears_the_log() {
        let mut diag = Diagnostics::new();
        diag.warn(None, "first");
        diag.error(Some(1), "second");

        let message = diag.take_message();
        assert!(message.contains("first"));
        assert!(message.contains("second"));
        assert!(!diag.has_message());
        assert_eq!(diag.take_message(), "");
    }

    #[test]
    fn message_does_not_clear() {
        let mut diag = Diagnostics::new();
        diag.warn(None, "kept");
        assert!(diag.message().contains("kept"));
        assert!(diag.has_message());
    }

    #[test]
    fn fault_entries_carry_the_offending_index() {
        let mut diag = Diagnostics::new();
        diag.fault(&Fault::InfeasibleTurn {
            index: 2,
            reason: "legs too short".into(),
        });
        let entry = diag.iter().next().unwrap();
        assert_eq!(entry.index(), Some(2));
        assert_eq!(entry.severity(), Severity::Error);
    }
}
