//! Pure match lifecycle machine shared by every match session.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle states a match moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Accepting joins and leaves until the scheduled start.
    Waiting,
    /// The single game of this match is running and accepts submissions.
    InProgress,
    /// Results are frozen for display; moderators may still correct them.
    Completed,
    /// Terminal; ratings have been applied exactly once.
    Finalized,
    /// Terminal; reached from waiting or in-progress, no rating effects.
    Cancelled,
}

/// Events that can be applied to the lifecycle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Scheduled start reached with enough players; the game begins.
    Start,
    /// Every submission is in (or a moderator ended the match early).
    Complete,
    /// Scores are locked in and handed to the rating engine.
    Finalize,
    /// The match is abandoned before completion.
    Cancel,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The status the match was in when the invalid event was received.
    pub from: MatchStatus,
    /// The event that cannot be applied from this status.
    pub event: LifecycleEvent,
}

/// Lifecycle machine owned by a match session.
///
/// Services validate an event first, perform the dependent writes while the
/// per-match lock is held, then commit the already-validated status, so a
/// failing write never leaves a half-applied transition behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLifecycle {
    status: MatchStatus,
}

impl Default for MatchLifecycle {
    fn default() -> Self {
        Self {
            status: MatchStatus::Waiting,
        }
    }
}

impl MatchLifecycle {
    /// Create a new lifecycle machine in the waiting state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current status.
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Whether the match rejects all further mutating calls.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            MatchStatus::Finalized | MatchStatus::Cancelled
        )
    }

    /// Validate that `event` can be applied, returning the status it leads to.
    pub fn validate(&self, event: LifecycleEvent) -> Result<MatchStatus, InvalidTransition> {
        let next = match (self.status, event) {
            (MatchStatus::Waiting, LifecycleEvent::Start) => MatchStatus::InProgress,
            (MatchStatus::InProgress, LifecycleEvent::Complete) => MatchStatus::Completed,
            (MatchStatus::Completed, LifecycleEvent::Finalize) => MatchStatus::Finalized,
            (MatchStatus::Waiting | MatchStatus::InProgress, LifecycleEvent::Cancel) => {
                MatchStatus::Cancelled
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }

    /// Commit a status previously returned by [`MatchLifecycle::validate`].
    pub fn commit(&mut self, next: MatchStatus) {
        self.status = next;
    }

    /// Validate and commit in one step, for transitions with no dependent writes.
    pub fn advance(&mut self, event: LifecycleEvent) -> Result<MatchStatus, InvalidTransition> {
        let next = self.validate(event)?;
        self.commit(next);
        Ok(next)
    }
}
