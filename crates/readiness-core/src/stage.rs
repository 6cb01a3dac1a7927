//! Per-invocation stage machine
//!
//! `Idle → Detecting → {DoneEmpty | Requesting → Validating → Done}`.
//! There are no retries: a failed service call still passes through
//! `Validating`, which produces a fully defaulted `Done` result.

use crate::error::StageError;
use serde::Serialize;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Not started
    Idle,
    /// Scanning the text for candidates
    Detecting,
    /// Awaiting the generative service
    Requesting,
    /// Validating and repairing records
    Validating,
    /// Terminal: no candidates, service not called
    DoneEmpty,
    /// Terminal: one record per candidate
    Done,
}

impl Stage {
    /// Check whether the stage is terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::DoneEmpty | Self::Done)
    }
}

/// Stages reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: Stage) -> Vec<Stage> {
    use Stage::*;
    match from {
        Idle => vec![Detecting],
        Detecting => vec![DoneEmpty, Requesting],
        Requesting => vec![Validating],
        Validating => vec![Done],
        DoneEmpty | Done => vec![],
    }
}

/// Validate a single transition
///
/// # Errors
/// Returns [`StageError::IllegalTransition`] when `to` is not reachable from `from`.
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), StageError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StageError::IllegalTransition { from, to })
    }
}

/// Records the path an invocation takes through the stage machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTracker {
    path: Vec<Stage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    /// Start in `Idle`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: vec![Stage::Idle],
        }
    }

    /// Current stage
    #[must_use]
    pub fn current(&self) -> Stage {
        self.path.last().copied().unwrap_or(Stage::Idle)
    }

    /// Move to the next stage
    ///
    /// # Errors
    /// Returns [`StageError::IllegalTransition`] and stays put when the move is
    /// not allowed.
    pub fn advance(&mut self, to: Stage) -> Result<(), StageError> {
        validate_transition(self.current(), to)?;
        tracing::trace!(from = ?self.current(), ?to, "stage transition");
        self.path.push(to);
        Ok(())
    }

    /// Stages visited, starting with `Idle`
    #[inline]
    #[must_use]
    pub fn path(&self) -> &[Stage] {
        &self.path
    }

    /// Consume into the visited path
    #[inline]
    #[must_use]
    pub fn into_path(self) -> Vec<Stage> {
        self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut tracker = StageTracker::new();
        for stage in [Stage::Detecting, Stage::Requesting, Stage::Validating, Stage::Done] {
            tracker.advance(stage).unwrap();
        }
        assert!(tracker.current().is_terminal());
        assert_eq!(tracker.path().len(), 5);
    }

    #[test]
    fn empty_path_transitions() {
        let mut tracker = StageTracker::new();
        tracker.advance(Stage::Detecting).unwrap();
        tracker.advance(Stage::DoneEmpty).unwrap();
        assert_eq!(tracker.into_path(), vec![Stage::Idle, Stage::Detecting, Stage::DoneEmpty]);
    }

    #[test]
    fn illegal_transitions_rejected() {
        assert!(validate_transition(Stage::Idle, Stage::Requesting).is_err());
        assert!(validate_transition(Stage::Requesting, Stage::Done).is_err());
        assert!(validate_transition(Stage::Done, Stage::Idle).is_err());

        let mut tracker = StageTracker::new();
        assert!(tracker.advance(Stage::Validating).is_err());
        assert_eq!(tracker.current(), Stage::Idle);
    }

    #[test]
    fn terminal_stages_have_no_exits() {
        assert!(allowed_transitions(Stage::Done).is_empty());
        assert!(allowed_transitions(Stage::DoneEmpty).is_empty());
    }
}
