//! Server-sent event payloads broadcast on per-match channels.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::views::{RosterEntryView, VoteOutcome},
    state::lifecycle::MatchStatus,
};

/// Event name for roster membership changes.
pub const EVENT_ROSTER_CHANGED: &str = "roster.changed";
/// Event name for lifecycle transitions.
pub const EVENT_STATUS_CHANGED: &str = "status.changed";
/// Event name for submitted or corrected scores.
pub const EVENT_SCORE_UPDATED: &str = "score.updated";
/// Event name for split-vote progress below the threshold.
pub const EVENT_SPLIT_VOTE_UPDATED: &str = "split_vote.updated";
/// Event name for a passcode rotation.
pub const EVENT_PASSCODE_REGENERATED: &str = "passcode.regenerated";

/// Envelope carried on the broadcast channel and serialized into SSE frames.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServerEvent {
    /// Event name, used as the SSE `event:` field.
    pub event: String,
    /// JSON payload, used as the SSE `data:` field.
    pub data: serde_json::Value,
}

impl ServerEvent {
    /// Wrap a payload under an event name.
    ///
    /// Serialization of the payloads in this module cannot fail; the error
    /// branch exists for the signature and is reported by the caller.
    pub fn new<T: Serialize>(event: &str, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: event.to_string(),
            data: serde_json::to_value(payload)?,
        })
    }
}

/// Roster changed: someone joined or withdrew.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterChangedEvent {
    /// Match whose roster changed.
    pub match_id: Uuid,
    /// Active roster count after the change.
    pub active_count: usize,
    /// Minimum roster size for the match to start.
    pub min_players: u8,
    /// Maximum roster size.
    pub max_players: u8,
    /// Full roster after the change, withdrawn rows included.
    pub roster: Vec<RosterEntryView>,
}

/// Lifecycle transition committed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusChangedEvent {
    /// Match that transitioned.
    pub match_id: Uuid,
    /// Status before the transition.
    pub from: MatchStatus,
    /// Status after the transition.
    pub to: MatchStatus,
}

/// A participant's scores were submitted or corrected.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreUpdatedEvent {
    /// Match the scores belong to.
    pub match_id: Uuid,
    /// Participant whose scores changed.
    pub user_id: Uuid,
    /// Number of unresolved position conflicts after the change.
    pub open_conflicts: usize,
}

/// Split-vote progress at the current passcode version.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SplitVoteUpdatedEvent {
    /// Match the vote belongs to.
    pub match_id: Uuid,
    /// Current tally and threshold.
    pub tally: VoteOutcome,
}

/// The passcode rotated; clients must rejoin the lobby with the new code.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PasscodeRegeneratedEvent {
    /// Match whose lobby rotated.
    pub match_id: Uuid,
    /// New lobby passcode.
    pub passcode: String,
    /// Version after the rotation.
    pub passcode_version: u32,
    /// Votes needed to rotate again at the new version.
    pub required_votes: usize,
}
