//! Roster membership: joining and withdrawing while a match waits.

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::views::MatchSummary,
    error::ServiceError,
    services::events,
    state::{
        SharedState,
        lifecycle::MatchStatus,
        session::{MatchParticipant, ParticipantState},
    },
};

/// Claim a roster slot in a waiting match.
///
/// A withdrawn row is reactivated in place, keeping its original join order.
pub async fn join_match(
    state: &SharedState,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<MatchSummary, ServiceError> {
    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let mut session = handle.lock().await;

    if session.status() != MatchStatus::Waiting {
        return Err(ServiceError::WrongStatus);
    }

    if session
        .participants
        .get(&user_id)
        .is_some_and(|row| row.is_active())
    {
        return Err(ServiceError::AlreadyJoined);
    }
    if session.active_count() >= session.max_players as usize {
        return Err(ServiceError::CapacityExceeded {
            max: session.max_players,
        });
    }

    match session.participants.get_mut(&user_id) {
        Some(row) => row.state = ParticipantState::Active,
        None => {
            let row = MatchParticipant {
                user_id,
                joined_at: state.clock().now(),
                state: ParticipantState::Active,
            };
            session.participants.insert(user_id, row);
        }
    }

    events::broadcast_roster_changed(state, &session);
    info!(match_id = %session.id, %user_id, "user joined match");
    Ok(MatchSummary::from(&*session))
}

/// Withdraw from a waiting match; the row is kept, not deleted.
pub async fn leave_match(
    state: &SharedState,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<MatchSummary, ServiceError> {
    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let mut session = handle.lock().await;

    if session.status() != MatchStatus::Waiting {
        return Err(ServiceError::WrongStatus);
    }

    let row = session
        .participants
        .get_mut(&user_id)
        .filter(|row| row.is_active())
        .ok_or(ServiceError::NotJoined)?;
    row.state = ParticipantState::Withdrawn;

    events::broadcast_roster_changed(state, &session);
    info!(match_id = %session.id, %user_id, "user withdrew from match");
    Ok(MatchSummary::from(&*session))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::{
        clock::ManualClock,
        config::AppConfig,
        dao::{memory::MemoryStore, models::SeasonEntity},
        dto::events::EVENT_ROSTER_CHANGED,
        passcode::RandomPasscodes,
        services::match_service,
        state::{
            AppState,
            session::{EventCategory, InGameMode, LeagueType},
        },
    };

    async fn state_with_match(
        max_players: u8,
    ) -> (crate::state::SharedState, Arc<ManualClock>, Uuid) {
        let clock = Arc::new(ManualClock::new(datetime!(2026-03-02 12:00 +9)));
        let state = AppState::with_parts(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            clock.clone(),
            Arc::new(RandomPasscodes),
        );
        state
            .store()
            .save_season(SeasonEntity {
                id: Uuid::new_v4(),
                category: EventCategory::Classic,
                season_number: 1,
                is_active: true,
                started_at: datetime!(2026-03-01 00:00 +9),
                ends_at: None,
            })
            .await
            .unwrap();

        let match_id = match_service::spawn_session(
            &state,
            EventCategory::Classic,
            InGameMode::Classic,
            LeagueType::Knight,
            2,
            max_players,
            datetime!(2026-03-02 20:00 +9),
            None,
        )
        .await
        .unwrap();
        (state, clock, match_id)
    }

    #[tokio::test]
    async fn join_then_leave_keeps_the_row() {
        let (state, _clock, match_id) = state_with_match(4).await;
        let user = Uuid::new_v4();

        let view = join_match(&state, match_id, user).await.unwrap();
        assert_eq!(view.roster.len(), 1);

        let view = leave_match(&state, match_id, user).await.unwrap();
        assert_eq!(view.roster.len(), 1);
        assert_eq!(view.roster[0].state, ParticipantState::Withdrawn);
    }

    #[tokio::test]
    async fn duplicate_join_is_rejected() {
        let (state, _clock, match_id) = state_with_match(4).await;
        let user = Uuid::new_v4();

        join_match(&state, match_id, user).await.unwrap();
        let err = join_match(&state, match_id, user).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyJoined));
    }

    #[tokio::test]
    async fn capacity_counts_only_active_rows() {
        let (state, _clock, match_id) = state_with_match(2).await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();

        join_match(&state, match_id, first).await.unwrap();
        join_match(&state, match_id, second).await.unwrap();

        let err = join_match(&state, match_id, third).await.unwrap_err();
        assert!(matches!(err, ServiceError::CapacityExceeded { max: 2 }));

        // A withdrawal frees the slot.
        leave_match(&state, match_id, first).await.unwrap();
        join_match(&state, match_id, third).await.unwrap();
    }

    #[tokio::test]
    async fn leaving_without_joining_is_rejected() {
        let (state, _clock, match_id) = state_with_match(4).await;
        let err = leave_match(&state, match_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotJoined));
    }

    #[tokio::test]
    async fn roster_events_carry_the_counts_and_bounds() {
        let (state, _clock, match_id) = state_with_match(4).await;
        let mut receiver = state.channels().subscribe(match_id);

        join_match(&state, match_id, Uuid::new_v4()).await.unwrap();

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event, EVENT_ROSTER_CHANGED);
        assert_eq!(event.data["active_count"], 1);
        assert_eq!(event.data["min_players"], 2);
        assert_eq!(event.data["max_players"], 4);
        assert_eq!(event.data["roster"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn roster_is_frozen_once_started() {
        let (state, clock, match_id) = state_with_match(4).await;
        join_match(&state, match_id, Uuid::new_v4()).await.unwrap();
        join_match(&state, match_id, Uuid::new_v4()).await.unwrap();

        // Scheduled time arrives and the readiness pass starts the match.
        clock.set(datetime!(2026-03-02 20:00 +9));
        match_service::readiness_pass(&state).await;
        let view = match_service::get_match(&state, match_id).await.unwrap();
        assert_eq!(view.status, MatchStatus::InProgress);

        let err = join_match(&state, match_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::WrongStatus));
    }
}
