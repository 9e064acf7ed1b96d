//! Split-vote passcode rotation.
//!
//! When a lobby splits (some players stuck in a stale room), survivors vote
//! to rotate the passcode. Votes are keyed to the current passcode version;
//! crossing the configured threshold claims a fresh code, bumps the version
//! and clears the tally, so a stale vote can never count twice.

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::views::VoteOutcome,
    error::ServiceError,
    services::{events, match_service},
    state::{SharedState, lifecycle::MatchStatus},
};

/// Cast one vote toward rotating the current game's passcode.
pub async fn cast_split_vote(
    state: &SharedState,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<VoteOutcome, ServiceError> {
    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let mut session = handle.lock().await;

    if session.status() != MatchStatus::InProgress {
        return Err(ServiceError::WrongStatus);
    }
    let game = session
        .current_game_mut()
        .ok_or(ServiceError::WrongStatus)?;

    let participant = game
        .participants
        .get(&user_id)
        .ok_or_else(|| ServiceError::NotEligible("not a participant of this game".into()))?;
    if participant.elimination_race().is_some() {
        return Err(ServiceError::NotEligible(
            "eliminated participants cannot vote".into(),
        ));
    }

    if !game.votes.insert(user_id) {
        return Err(ServiceError::AlreadyVoted);
    }

    let eligible = game.vote_eligible_count();
    let required = state.config().required_votes(eligible);

    if game.votes.len() >= required {
        let old_code = game.passcode.clone();
        let new_code = match_service::claim_fresh_passcode(state, match_id, Some(&old_code))?;
        state.release_passcode(&old_code);

        game.passcode = new_code.clone();
        game.passcode_version += 1;
        game.votes.clear();
        let version = game.passcode_version;

        events::broadcast_passcode_regenerated(state, match_id, &new_code, version, required);
        info!(%match_id, version, "split vote passed, passcode rotated");
        return Ok(VoteOutcome {
            votes: 0,
            required,
            rotated: true,
            passcode_version: version,
        });
    }

    let outcome = VoteOutcome {
        votes: game.votes.len(),
        required,
        rotated: false,
        passcode_version: game.passcode_version,
    };
    events::broadcast_split_vote(state, match_id, outcome.clone());
    Ok(outcome)
}
