//! Helpers translating committed state changes into broadcast events.
//!
//! All helpers are called while the caller still holds the match lock, so
//! per-channel event order always matches commit order.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        events::{
            EVENT_PASSCODE_REGENERATED, EVENT_ROSTER_CHANGED, EVENT_SCORE_UPDATED,
            EVENT_SPLIT_VOTE_UPDATED, EVENT_STATUS_CHANGED, PasscodeRegeneratedEvent,
            RosterChangedEvent, ScoreUpdatedEvent, ServerEvent, SplitVoteUpdatedEvent,
            StatusChangedEvent,
        },
        views::{RosterEntryView, VoteOutcome},
    },
    state::{SharedState, lifecycle::MatchStatus, session::MatchSession},
};

fn send<T: Serialize>(state: &SharedState, match_id: Uuid, name: &str, payload: &T) {
    match ServerEvent::new(name, payload) {
        Ok(event) => state.channels().broadcast(match_id, event),
        Err(err) => warn!(%match_id, event = name, error = %err, "failed to serialize event"),
    }
}

/// Announce a join or withdrawal with the full roster after the change.
pub fn broadcast_roster_changed(state: &SharedState, session: &MatchSession) {
    let payload = RosterChangedEvent {
        match_id: session.id,
        active_count: session.active_count(),
        min_players: session.min_players,
        max_players: session.max_players,
        roster: session
            .participants
            .values()
            .map(RosterEntryView::from)
            .collect(),
    };
    send(state, session.id, EVENT_ROSTER_CHANGED, &payload);
}

/// Announce a committed lifecycle transition.
pub fn broadcast_status_changed(
    state: &SharedState,
    match_id: Uuid,
    from: MatchStatus,
    to: MatchStatus,
) {
    let payload = StatusChangedEvent { match_id, from, to };
    send(state, match_id, EVENT_STATUS_CHANGED, &payload);
}

/// Announce a submitted or corrected score sheet.
pub fn broadcast_score_updated(
    state: &SharedState,
    match_id: Uuid,
    user_id: Uuid,
    open_conflicts: usize,
) {
    let payload = ScoreUpdatedEvent {
        match_id,
        user_id,
        open_conflicts,
    };
    send(state, match_id, EVENT_SCORE_UPDATED, &payload);
}

/// Announce split-vote progress below the rotation threshold.
pub fn broadcast_split_vote(state: &SharedState, match_id: Uuid, tally: VoteOutcome) {
    let payload = SplitVoteUpdatedEvent { match_id, tally };
    send(state, match_id, EVENT_SPLIT_VOTE_UPDATED, &payload);
}

/// Announce a passcode rotation with the fresh code.
pub fn broadcast_passcode_regenerated(
    state: &SharedState,
    match_id: Uuid,
    passcode: &str,
    passcode_version: u32,
    required_votes: usize,
) {
    let payload = PasscodeRegeneratedEvent {
        match_id,
        passcode: passcode.to_string(),
        passcode_version,
        required_votes,
    };
    send(state, match_id, EVENT_PASSCODE_REGENERATED, &payload);
}
