//! Match lifecycle operations: creation, start, submissions, corrections,
//! completion, cancellation and finalization.
//!
//! Every mutation takes the per-match lock first and validates the lifecycle
//! transition before touching any state, so a failed write never leaves a
//! half-applied transition behind. Finalization additionally takes the rating
//! gate (always after the match lock) so archive numbering and rating order
//! agree with what a bulk replay would produce.

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::Permission,
    dao::models::{MatchOutcomeEntity, MatchRecordEntity},
    dto::{
        commands::{CreateMatchRequest, EditResultRequest, RaceEntryInput, SubmitResultRequest},
        views::{ConflictView, MatchSummary, SubmissionOutcome},
    },
    error::ServiceError,
    services::{
        conflict::{PositionConflict, RaceEntry, detect_conflicts},
        events, rating_service, season_service,
    },
    state::{
        SharedState,
        lifecycle::{LifecycleEvent, MatchLifecycle, MatchStatus},
        session::{
            EventCategory, Game, GameParticipant, InGameMode, LeagueType, MatchSession,
            ParticipantOutcome, SubmissionStatus, final_placements,
        },
    },
};

/// Attempts at claiming a unique passcode before giving up.
const PASSCODE_ATTEMPTS: usize = 64;

/// Create a one-off match on behalf of a moderator.
pub async fn create_match(
    state: &SharedState,
    request: CreateMatchRequest,
) -> Result<MatchSummary, ServiceError> {
    state
        .capabilities()
        .require(request.moderator_id, Permission::ManageSchedule)?;

    if request.min_players > request.max_players {
        return Err(ServiceError::InvalidInput(
            "min_players exceeds max_players".into(),
        ));
    }

    let id = spawn_session(
        state,
        request.category,
        request.mode,
        request.league,
        request.min_players,
        request.max_players,
        request.scheduled_start,
        None,
    )
    .await?;

    get_match(state, id).await
}

/// Register a new waiting match against the category's active season.
///
/// Shared by moderator creation and the recurring scheduler.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn spawn_session(
    state: &SharedState,
    category: EventCategory,
    mode: InGameMode,
    league: LeagueType,
    min_players: u8,
    max_players: u8,
    scheduled_start: OffsetDateTime,
    recurring_match_id: Option<Uuid>,
) -> Result<Uuid, ServiceError> {
    let season = season_service::require_active_season(state, category).await?;

    let session = MatchSession {
        id: Uuid::new_v4(),
        season_id: season.id,
        category,
        mode,
        league,
        match_number: None,
        lifecycle: MatchLifecycle::new(),
        min_players,
        max_players,
        scheduled_start,
        actual_start: None,
        deadline: None,
        recurring_match_id,
        participants: IndexMap::new(),
        games: Vec::new(),
    };
    let id = session.id;
    state.insert_match(session);

    info!(match_id = %id, ?category, ?mode, ?league, "created match");
    Ok(id)
}

/// Snapshot one match.
pub async fn get_match(state: &SharedState, match_id: Uuid) -> Result<MatchSummary, ServiceError> {
    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let session = handle.lock().await;
    Ok(MatchSummary::from(&*session))
}

/// Snapshot every registered match, soonest scheduled first.
pub async fn list_matches(state: &SharedState) -> Vec<MatchSummary> {
    let mut summaries = Vec::new();
    for id in state.match_ids() {
        if let Some(handle) = state.match_handle(id) {
            let session = handle.lock().await;
            summaries.push(MatchSummary::from(&*session));
        }
    }
    summaries.sort_by(|a, b| a.scheduled_start.cmp(&b.scheduled_start).then(a.id.cmp(&b.id)));
    summaries
}

/// Start every waiting match whose scheduled time has arrived, cancelling the
/// ones that never reached their minimum roster.
pub async fn readiness_pass(state: &SharedState) {
    let now = state.clock().now();
    for id in state.match_ids() {
        let Some(handle) = state.match_handle(id) else {
            continue;
        };
        let mut session = handle.lock().await;
        if session.status() != MatchStatus::Waiting || session.scheduled_start > now {
            continue;
        }

        let result = if session.active_count() >= session.min_players as usize {
            start_locked(state, &mut session, now)
        } else {
            cancel_locked(state, &mut session)
        };
        if let Err(err) = result {
            warn!(match_id = %id, error = %err, "readiness pass failed for match");
        }
    }
}

/// Complete every in-progress match whose submission deadline has passed.
pub async fn deadline_pass(state: &SharedState) {
    let now = state.clock().now();
    for id in state.match_ids() {
        let Some(handle) = state.match_handle(id) else {
            continue;
        };
        let mut session = handle.lock().await;
        if session.status() != MatchStatus::InProgress {
            continue;
        }
        let Some(deadline) = session.deadline else {
            continue;
        };
        if deadline > now {
            continue;
        }

        if let Err(err) = complete_locked(state, &mut session) {
            warn!(match_id = %id, error = %err, "deadline pass failed for match");
        } else {
            info!(match_id = %id, "completed match at submission deadline");
        }
    }
}

/// Transition a waiting match to in-progress and open its game lobby.
fn start_locked(
    state: &SharedState,
    session: &mut MatchSession,
    now: OffsetDateTime,
) -> Result<(), ServiceError> {
    let from = session.status();
    let next = session.lifecycle.validate(LifecycleEvent::Start)?;

    let passcode = claim_fresh_passcode(state, session.id, None)?;

    let race_count = session.mode.race_count();
    let mut pool: Vec<u32> = (1..=state.config().track_pool_size()).collect();
    pool.shuffle(&mut rand::rng());
    pool.truncate(race_count as usize);

    let participants: IndexMap<Uuid, GameParticipant> = session
        .participants
        .values()
        .filter(|row| row.is_active())
        .map(|row| (row.user_id, GameParticipant::new(row.user_id, race_count)))
        .collect();

    session.games.push(Game {
        id: Uuid::new_v4(),
        mode: session.mode,
        league: session.league,
        passcode,
        passcode_version: 1,
        votes: Default::default(),
        tracks: pool,
        started_at: now,
        participants,
    });
    session.actual_start = Some(now);
    session.deadline = Some(now + state.config().submission_window());

    session.lifecycle.commit(next);
    events::broadcast_status_changed(state, session.id, from, next);
    info!(match_id = %session.id, "match started");
    Ok(())
}

/// Generate and claim a passcode no other active lobby holds.
///
/// `avoid` excludes the code being rotated away from so a rotation always
/// produces a visibly different code.
pub(crate) fn claim_fresh_passcode(
    state: &SharedState,
    match_id: Uuid,
    avoid: Option<&str>,
) -> Result<String, ServiceError> {
    for _ in 0..PASSCODE_ATTEMPTS {
        let code = state.passcodes().generate();
        if avoid.is_some_and(|previous| previous == code) {
            continue;
        }
        if state.claim_passcode(&code, match_id) {
            return Ok(code);
        }
    }
    Err(ServiceError::PasscodeUnavailable)
}

fn complete_locked(state: &SharedState, session: &mut MatchSession) -> Result<(), ServiceError> {
    let from = session.status();
    let next = session.lifecycle.validate(LifecycleEvent::Complete)?;

    release_passcodes(state, session);
    session.lifecycle.commit(next);
    events::broadcast_status_changed(state, session.id, from, next);
    Ok(())
}

fn cancel_locked(state: &SharedState, session: &mut MatchSession) -> Result<(), ServiceError> {
    let from = session.status();
    let next = session.lifecycle.validate(LifecycleEvent::Cancel)?;

    release_passcodes(state, session);
    session.lifecycle.commit(next);
    events::broadcast_status_changed(state, session.id, from, next);
    state.channels().remove(session.id);
    info!(match_id = %session.id, "match cancelled");
    Ok(())
}

fn release_passcodes(state: &SharedState, session: &MatchSession) {
    for game in &session.games {
        state.release_passcode(&game.passcode);
    }
}

/// Moderator command: end the in-progress match now.
pub async fn end_match(
    state: &SharedState,
    match_id: Uuid,
    moderator_id: Uuid,
) -> Result<MatchSummary, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ModerateMatches)?;

    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let mut session = handle.lock().await;
    complete_locked(state, &mut session)?;
    Ok(MatchSummary::from(&*session))
}

/// Moderator command: cancel a match that has not completed.
pub async fn cancel_match(
    state: &SharedState,
    match_id: Uuid,
    moderator_id: Uuid,
) -> Result<MatchSummary, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ModerateMatches)?;

    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let mut session = handle.lock().await;
    cancel_locked(state, &mut session)?;
    Ok(MatchSummary::from(&*session))
}

/// Submit or update one's own race results for the current game.
pub async fn submit_result(
    state: &SharedState,
    match_id: Uuid,
    request: SubmitResultRequest,
) -> Result<SubmissionOutcome, ServiceError> {
    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let mut session = handle.lock().await;

    if session.status() != MatchStatus::InProgress {
        return Err(ServiceError::WrongStatus);
    }

    apply_entries(
        &mut session,
        state,
        request.user_id,
        &request.races,
        Some((request.machine, request.assist_enabled)),
        SubmissionStatus::Pending,
    )?;

    let conflicts = open_conflicts(&session);
    restate_conflict_flags(&mut session, &conflicts);
    let auto_completed = maybe_autocomplete(state, &mut session, &conflicts)?;

    events::broadcast_score_updated(state, session.id, request.user_id, conflicts.len());
    Ok(SubmissionOutcome {
        conflicts: conflicts.iter().map(ConflictView::from).collect(),
        auto_completed,
        current: MatchSummary::from(&*session),
    })
}

/// Moderator correction of a participant's results.
///
/// Allowed while the match is in progress or completed but not yet finalized;
/// the corrected sheet is marked verified.
pub async fn edit_result(
    state: &SharedState,
    match_id: Uuid,
    target_user: Uuid,
    request: EditResultRequest,
) -> Result<SubmissionOutcome, ServiceError> {
    state
        .capabilities()
        .require(request.moderator_id, Permission::ModerateMatches)?;

    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let mut session = handle.lock().await;

    if !matches!(
        session.status(),
        MatchStatus::InProgress | MatchStatus::Completed
    ) {
        return Err(ServiceError::WrongStatus);
    }

    apply_entries(
        &mut session,
        state,
        target_user,
        &request.races,
        None,
        SubmissionStatus::Verified,
    )?;

    let conflicts = open_conflicts(&session);
    restate_conflict_flags(&mut session, &conflicts);
    let auto_completed = maybe_autocomplete(state, &mut session, &conflicts)?;

    events::broadcast_score_updated(state, session.id, target_user, conflicts.len());
    Ok(SubmissionOutcome {
        conflicts: conflicts.iter().map(ConflictView::from).collect(),
        auto_completed,
        current: MatchSummary::from(&*session),
    })
}

/// Moderator verdict on a participant's sheet: verify, reject or invalidate.
///
/// Striking a sheet (reject/invalidate) removes it from conflict detection
/// and from scoring at finalization; invalidating the last missing sheet can
/// therefore auto-complete the match.
pub async fn review_result(
    state: &SharedState,
    match_id: Uuid,
    target_user: Uuid,
    moderator_id: Uuid,
    verdict: SubmissionStatus,
) -> Result<SubmissionOutcome, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ModerateMatches)?;

    if !matches!(
        verdict,
        SubmissionStatus::Verified | SubmissionStatus::Rejected | SubmissionStatus::Invalidated
    ) {
        return Err(ServiceError::InvalidInput(format!(
            "{verdict:?} is not a review verdict"
        )));
    }

    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let mut session = handle.lock().await;

    if !matches!(
        session.status(),
        MatchStatus::InProgress | MatchStatus::Completed
    ) {
        return Err(ServiceError::WrongStatus);
    }

    let game = session.current_game_mut().ok_or(ServiceError::WrongStatus)?;
    let participant = game
        .participants
        .get_mut(&target_user)
        .ok_or(ServiceError::NotJoined)?;
    participant.status = verdict;

    let conflicts = open_conflicts(&session);
    restate_conflict_flags(&mut session, &conflicts);
    let auto_completed = maybe_autocomplete(state, &mut session, &conflicts)?;

    events::broadcast_score_updated(state, session.id, target_user, conflicts.len());
    Ok(SubmissionOutcome {
        conflicts: conflicts.iter().map(ConflictView::from).collect(),
        auto_completed,
        current: MatchSummary::from(&*session),
    })
}

/// Complete the match if every sheet is in and no conflict stands.
fn maybe_autocomplete(
    state: &SharedState,
    session: &mut MatchSession,
    conflicts: &[PositionConflict],
) -> Result<bool, ServiceError> {
    if session.status() != MatchStatus::InProgress
        || !conflicts.is_empty()
        || !session
            .current_game()
            .is_some_and(|game| game.all_submitted())
    {
        return Ok(false);
    }
    complete_locked(state, session)?;
    info!(match_id = %session.id, "all results in, match auto-completed");
    Ok(true)
}

/// Write race entries into a participant's sheet and recompute its points.
fn apply_entries(
    session: &mut MatchSession,
    state: &SharedState,
    user_id: Uuid,
    entries: &[RaceEntryInput],
    identity: Option<(Option<String>, bool)>,
    status_after: SubmissionStatus,
) -> Result<(), ServiceError> {
    let config = state.config().clone();
    let game = session.current_game_mut().ok_or(ServiceError::WrongStatus)?;
    let race_count = game.race_count();
    let field_size = game.participants.len();

    for entry in entries {
        if entry.race_number == 0 || entry.race_number > race_count {
            return Err(ServiceError::InvalidInput(format!(
                "race {} does not exist in this game",
                entry.race_number
            )));
        }
        if let Some(position) = entry.position {
            if position as usize > field_size {
                return Err(ServiceError::InvalidInput(format!(
                    "position {position} exceeds the field of {field_size}"
                )));
            }
        }
    }

    let participant = game
        .participants
        .get_mut(&user_id)
        .ok_or(ServiceError::NotJoined)?;

    if let Some((machine, assist_enabled)) = identity {
        participant.machine = machine;
        participant.assist_enabled = assist_enabled;
    }

    for entry in entries {
        let Some(slot) = participant
            .results
            .iter_mut()
            .find(|slot| slot.race_number == entry.race_number)
        else {
            continue;
        };
        slot.position = entry.position;
        slot.is_eliminated = entry.eliminated;
        slot.points = if entry.eliminated {
            0
        } else {
            entry.position.map(|p| config.race_points(p)).unwrap_or(0)
        };
    }
    participant.cascade_elimination();
    participant.status = status_after;
    Ok(())
}

/// All standing position conflicts across the current game's races.
///
/// Rejected and invalidated sheets are struck from scoring, so they do not
/// participate in detection either.
pub(crate) fn open_conflicts(session: &MatchSession) -> Vec<PositionConflict> {
    let Some(game) = session.current_game() else {
        return Vec::new();
    };

    let counted: Vec<&GameParticipant> = game
        .participants
        .values()
        .filter(|participant| {
            !matches!(
                participant.status,
                SubmissionStatus::Rejected | SubmissionStatus::Invalidated
            )
        })
        .collect();

    let mut conflicts = Vec::new();
    for race_number in 1..=game.race_count() {
        let entries: Vec<RaceEntry> = counted
            .iter()
            .filter_map(|participant| {
                participant
                    .results
                    .iter()
                    .find(|slot| slot.race_number == race_number)
                    .map(|slot| RaceEntry {
                        user_id: participant.user_id,
                        position: slot.position,
                        eliminated: slot.is_eliminated,
                    })
            })
            .collect();
        conflicts.extend(detect_conflicts(race_number, &entries, counted.len()));
    }
    conflicts
}

/// Toggle pending/disputed flags to mirror current conflict involvement.
///
/// Moderator-set statuses (verified, rejected, invalidated) are left alone.
fn restate_conflict_flags(session: &mut MatchSession, conflicts: &[PositionConflict]) {
    let involved: Vec<Uuid> = conflicts
        .iter()
        .flat_map(|conflict| conflict.involved.iter().map(|claim| claim.user_id))
        .collect();

    let Some(game) = session.current_game_mut() else {
        return;
    };
    for participant in game.participants.values_mut() {
        match participant.status {
            SubmissionStatus::Pending if involved.contains(&participant.user_id) => {
                participant.status = SubmissionStatus::Disputed;
            }
            SubmissionStatus::Disputed if !involved.contains(&participant.user_id) => {
                participant.status = SubmissionStatus::Pending;
            }
            _ => {}
        }
    }
}

/// Moderator command: freeze a completed match, archive it and apply ratings.
///
/// Idempotent at the lifecycle level: a second finalize fails with
/// [`ServiceError::AlreadyFinalized`] before any write happens.
pub async fn finalize_match(
    state: &SharedState,
    match_id: Uuid,
    moderator_id: Uuid,
) -> Result<MatchSummary, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ModerateMatches)?;

    let handle = state
        .match_handle(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))?;
    let mut session = handle.lock().await;

    if session.status() == MatchStatus::Finalized {
        return Err(ServiceError::AlreadyFinalized);
    }
    let from = session.status();
    let next = session.lifecycle.validate(LifecycleEvent::Finalize)?;

    let conflicts = open_conflicts(&session);
    if !conflicts.is_empty() {
        return Err(ServiceError::InvalidInput(format!(
            "{} unresolved position conflicts",
            conflicts.len()
        )));
    }

    let record = build_record(&session, state.clock().now())?;

    // Lock order: match lock, then rating gate. The gate keeps the archive
    // number and the rating application of this match adjacent, so a replay
    // folds records in exactly the order they were applied.
    let gate = state.rating_gate().lock().await;
    let match_number = state.store().archive_match(record.clone()).await?;
    let mut record = record;
    record.match_number = match_number;
    if let Err(err) = rating_service::apply_record(state, &record).await {
        // Take the record back out, or a retried finalize would archive a
        // second copy and apply the deltas twice.
        if let Err(discard) = state
            .store()
            .discard_match_record(record.season_id, match_number)
            .await
        {
            warn!(
                match_id = %session.id,
                match_number,
                error = %discard,
                "failed to discard archived record after rating failure"
            );
        }
        return Err(err);
    }
    drop(gate);

    session.match_number = Some(match_number);
    release_passcodes(state, &session);
    session.lifecycle.commit(next);
    events::broadcast_status_changed(state, session.id, from, next);
    state.channels().remove(session.id);

    info!(match_id = %session.id, match_number, "match finalized");
    Ok(MatchSummary::from(&*session))
}

/// Freeze placements into an archive record; struck sheets are excluded.
fn build_record(
    session: &MatchSession,
    finalized_at: OffsetDateTime,
) -> Result<MatchRecordEntity, ServiceError> {
    let game = session.current_game().ok_or(ServiceError::WrongStatus)?;

    let mut counted = game.clone();
    counted.participants.retain(|_, participant| {
        !matches!(
            participant.status,
            SubmissionStatus::Rejected | SubmissionStatus::Invalidated
        )
    });

    if counted.participants.is_empty() {
        return Err(ServiceError::InvalidInput(
            "no scorable participants to finalize".into(),
        ));
    }

    let outcomes = final_placements(&counted)
        .into_iter()
        .map(|placement| {
            let assist_used = counted
                .participants
                .get(&placement.user_id)
                .is_some_and(|participant| participant.assist_enabled);
            let (total_points, eliminated_race) = match placement.outcome {
                ParticipantOutcome::Scored { total } => (Some(total), None),
                ParticipantOutcome::Eliminated { race } => (None, Some(race)),
            };
            MatchOutcomeEntity {
                user_id: placement.user_id,
                final_rank: placement.rank,
                total_points,
                eliminated_race,
                assist_used,
            }
        })
        .collect();

    Ok(MatchRecordEntity {
        match_id: session.id,
        season_id: session.season_id,
        category: session.category,
        match_number: 0,
        field_size: counted.participants.len() as u32,
        finalized_at,
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use futures::future::BoxFuture;
    use time::macros::datetime;

    use super::*;
    use crate::{
        clock::ManualClock,
        config::AppConfig,
        dao::{
            memory::MemoryStore,
            models::{RecurringMatchEntity, SeasonEntity, UserSeasonStatsEntity},
            storage::{StorageError, StorageResult},
            store::LeagueStore,
        },
        passcode::RandomPasscodes,
        services::roster_service,
        state::AppState,
    };

    /// Store double whose stats writes can be switched off mid-test.
    struct FlakyStatsStore {
        inner: MemoryStore,
        fail_upserts: AtomicBool,
    }

    impl FlakyStatsStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_upserts: AtomicBool::new(false),
            }
        }
    }

    impl LeagueStore for FlakyStatsStore {
        fn save_season(&self, season: SeasonEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.save_season(season)
        }
        fn find_season(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
            self.inner.find_season(id)
        }
        fn find_season_by_number(
            &self,
            category: EventCategory,
            season_number: u32,
        ) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
            self.inner.find_season_by_number(category, season_number)
        }
        fn active_season(
            &self,
            category: EventCategory,
        ) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
            self.inner.active_season(category)
        }
        fn list_seasons(&self) -> BoxFuture<'static, StorageResult<Vec<SeasonEntity>>> {
            self.inner.list_seasons()
        }
        fn delete_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.delete_season(id)
        }
        fn save_recurring(
            &self,
            template: RecurringMatchEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.save_recurring(template)
        }
        fn find_recurring(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<RecurringMatchEntity>>> {
            self.inner.find_recurring(id)
        }
        fn list_recurring(
            &self,
        ) -> BoxFuture<'static, StorageResult<Vec<RecurringMatchEntity>>> {
            self.inner.list_recurring()
        }
        fn delete_recurring(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.delete_recurring(id)
        }
        fn mark_rule_scheduled(
            &self,
            template_id: Uuid,
            rule_id: Uuid,
            occurrence: OffsetDateTime,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.mark_rule_scheduled(template_id, rule_id, occurrence)
        }
        fn upsert_stats(
            &self,
            stats: UserSeasonStatsEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            if self.fail_upserts.load(Ordering::SeqCst) {
                return Box::pin(async {
                    Err(StorageError::unavailable(
                        "stats backend offline".into(),
                        std::io::Error::other("connection reset"),
                    ))
                });
            }
            self.inner.upsert_stats(stats)
        }
        fn find_stats(
            &self,
            user_id: Uuid,
            season_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<UserSeasonStatsEntity>>> {
            self.inner.find_stats(user_id, season_id)
        }
        fn season_stats(
            &self,
            season_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Vec<UserSeasonStatsEntity>>> {
            self.inner.season_stats(season_id)
        }
        fn replace_season_stats(
            &self,
            season_id: Uuid,
            stats: Vec<UserSeasonStatsEntity>,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.replace_season_stats(season_id, stats)
        }
        fn archive_match(
            &self,
            record: MatchRecordEntity,
        ) -> BoxFuture<'static, StorageResult<u32>> {
            self.inner.archive_match(record)
        }
        fn season_records(
            &self,
            season_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
            self.inner.season_records(season_id)
        }
        fn discard_match_record(
            &self,
            season_id: Uuid,
            match_number: u32,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.discard_match_record(season_id, match_number)
        }
    }

    async fn started_match(players: usize) -> (SharedState, Uuid, Uuid, Vec<Uuid>) {
        started_match_on(Arc::new(MemoryStore::new()), players).await
    }

    async fn started_match_on(
        store: Arc<dyn LeagueStore>,
        players: usize,
    ) -> (SharedState, Uuid, Uuid, Vec<Uuid>) {
        let clock = Arc::new(ManualClock::new(datetime!(2026-03-02 12:00 +9)));
        let state = AppState::with_parts(
            AppConfig::default(),
            store,
            clock.clone(),
            Arc::new(RandomPasscodes),
        );
        let moderator = Uuid::new_v4();
        state
            .capabilities()
            .grant(moderator, Permission::ModerateMatches);
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

        let match_id = spawn_session(
            &state,
            EventCategory::Classic,
            InGameMode::Classic,
            LeagueType::Knight,
            2,
            8,
            datetime!(2026-03-02 20:00 +9),
            None,
        )
        .await
        .unwrap();

        let users: Vec<Uuid> = (0..players).map(|_| Uuid::new_v4()).collect();
        for &user in &users {
            roster_service::join_match(&state, match_id, user).await.unwrap();
        }
        clock.set(datetime!(2026-03-02 20:00 +9));
        readiness_pass(&state).await;

        (state, moderator, match_id, users)
    }

    fn sheet(user_id: Uuid, positions: &[u8]) -> SubmitResultRequest {
        SubmitResultRequest {
            user_id,
            machine: None,
            assist_enabled: false,
            races: positions
                .iter()
                .enumerate()
                .map(|(index, &position)| RaceEntryInput {
                    race_number: (index + 1) as u8,
                    position: Some(position),
                    eliminated: false,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn verdict_must_be_a_review_status() {
        let (state, moderator, match_id, users) = started_match(2).await;

        let err = review_result(
            &state,
            match_id,
            users[0],
            moderator,
            SubmissionStatus::Pending,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn review_requires_the_moderate_capability() {
        let (state, _moderator, match_id, users) = started_match(2).await;

        let err = review_result(
            &state,
            match_id,
            users[0],
            Uuid::new_v4(),
            SubmissionStatus::Rejected,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn striking_a_sheet_clears_its_conflicts() {
        let (state, moderator, match_id, users) = started_match(3).await;
        let (a, b, c) = (users[0], users[1], users[2]);

        // A and B both claim the win in race one, which shadows second place;
        // C's claim on it raises the conflict.
        submit_result(&state, match_id, sheet(a, &[1, 1, 1])).await.unwrap();
        submit_result(&state, match_id, sheet(b, &[1, 2, 2])).await.unwrap();
        let outcome = submit_result(&state, match_id, sheet(c, &[2, 3, 3]))
            .await
            .unwrap();
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(!outcome.auto_completed);

        // Rejecting B's sheet removes it from detection; with every sheet in
        // and nothing disputed, the match completes on the spot.
        let outcome = review_result(&state, match_id, b, moderator, SubmissionStatus::Rejected)
            .await
            .unwrap();
        assert!(outcome.conflicts.is_empty());
        assert!(outcome.auto_completed);
        assert_eq!(outcome.current.status, MatchStatus::Completed);
    }

    #[tokio::test]
    async fn finalize_is_blocked_while_conflicts_stand() {
        let (state, moderator, match_id, users) = started_match(3).await;
        let (a, b, c) = (users[0], users[1], users[2]);

        submit_result(&state, match_id, sheet(a, &[1, 1, 1])).await.unwrap();
        submit_result(&state, match_id, sheet(b, &[1, 2, 2])).await.unwrap();
        submit_result(&state, match_id, sheet(c, &[2, 3, 3])).await.unwrap();

        end_match(&state, match_id, moderator).await.unwrap();
        let err = finalize_match(&state, match_id, moderator).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn struck_sheets_are_excluded_from_the_archived_record() {
        let (state, moderator, match_id, users) = started_match(3).await;
        let (a, b, c) = (users[0], users[1], users[2]);

        submit_result(&state, match_id, sheet(a, &[1, 1, 1])).await.unwrap();
        submit_result(&state, match_id, sheet(b, &[2, 2, 2])).await.unwrap();
        let outcome = submit_result(&state, match_id, sheet(c, &[3, 3, 3]))
            .await
            .unwrap();
        assert!(outcome.auto_completed);

        // C's run is ruled out after completion; only two sheets score.
        review_result(&state, match_id, c, moderator, SubmissionStatus::Invalidated)
            .await
            .unwrap();
        finalize_match(&state, match_id, moderator).await.unwrap();

        let season = state
            .store()
            .active_season(EventCategory::Classic)
            .await
            .unwrap()
            .unwrap();
        let records = state.store().season_records(season.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field_size, 2);
        assert!(records[0].outcomes.iter().all(|row| row.user_id != c));
    }

    #[tokio::test]
    async fn failed_rating_application_rolls_the_archive_back() {
        let store = Arc::new(FlakyStatsStore::new());
        let (state, moderator, match_id, users) = started_match_on(store.clone(), 2).await;

        submit_result(&state, match_id, sheet(users[0], &[1, 1, 1])).await.unwrap();
        let outcome = submit_result(&state, match_id, sheet(users[1], &[2, 2, 2]))
            .await
            .unwrap();
        assert!(outcome.auto_completed);

        store.fail_upserts.store(true, Ordering::SeqCst);
        let err = finalize_match(&state, match_id, moderator).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));

        // The record was taken back out and the match did not advance.
        let season = state
            .store()
            .active_season(EventCategory::Classic)
            .await
            .unwrap()
            .unwrap();
        assert!(state.store().season_records(season.id).await.unwrap().is_empty());
        let view = get_match(&state, match_id).await.unwrap();
        assert_eq!(view.status, MatchStatus::Completed);

        // A retry archives exactly one record and applies ratings once.
        store.fail_upserts.store(false, Ordering::SeqCst);
        let finalized = finalize_match(&state, match_id, moderator).await.unwrap();
        assert_eq!(finalized.status, MatchStatus::Finalized);
        assert_eq!(finalized.match_number, Some(1));
        assert_eq!(state.store().season_records(season.id).await.unwrap().len(), 1);
        let winner = state
            .store()
            .find_stats(users[0], season.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.total_matches, 1);
    }
}
