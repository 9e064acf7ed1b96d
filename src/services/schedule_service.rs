//! Recurring match templates and the scheduling pass that materializes them.
//!
//! Rules name weekdays and a time of day in the league's reference timezone.
//! Each rule carries its own `last_scheduled_at` marker: the pass generates
//! exactly the occurrences after the marker and advances it per occurrence,
//! so re-running a pass (or racing two passes behind the store) never
//! duplicates a match.

use time::{Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, Weekday};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::Permission,
    dao::models::{RecurringMatchEntity, RecurringRuleEntity},
    dto::{
        commands::{CreateRecurringRequest, RuleInput},
        views::SchedulePassReport,
    },
    error::ServiceError,
    services::match_service,
    state::SharedState,
};

/// How far ahead of the scheduled start a lobby is opened for joining.
const OPEN_LEAD: Duration = Duration::days(2);

/// Weekday number with 1 = Monday .. 7 = Sunday.
fn weekday_number(weekday: Weekday) -> u8 {
    weekday.number_from_monday()
}

/// First occurrence of a rule strictly after `after`, in the reference
/// timezone. A weekly rule always has one within the next seven days.
pub fn next_occurrence(
    weekdays: &[u8],
    hour: u8,
    minute: u8,
    after: OffsetDateTime,
    offset: UtcOffset,
) -> Option<OffsetDateTime> {
    let time = Time::from_hms(hour, minute, 0).ok()?;
    let local_after = after.to_offset(offset);

    for day_offset in 0..=7i64 {
        let date = local_after.date().saturating_add(Duration::days(day_offset));
        if !weekdays.contains(&weekday_number(date.weekday())) {
            continue;
        }
        let candidate = PrimitiveDateTime::new(date, time).assume_offset(offset);
        if candidate > after {
            return Some(candidate);
        }
    }
    None
}

/// Create a recurring template from a validated request.
pub async fn create_recurring(
    state: &SharedState,
    request: CreateRecurringRequest,
) -> Result<RecurringMatchEntity, ServiceError> {
    state
        .capabilities()
        .require(request.moderator_id, Permission::ManageSchedule)?;

    if request.min_players > request.max_players {
        return Err(ServiceError::InvalidInput(
            "min_players exceeds max_players".into(),
        ));
    }

    let rules = request
        .rules
        .iter()
        .map(|rule: &RuleInput| RecurringRuleEntity {
            id: Uuid::new_v4(),
            weekdays: rule.weekdays.clone(),
            hour: rule.hour,
            minute: rule.minute,
            last_scheduled_at: None,
        })
        .collect();

    let template = RecurringMatchEntity {
        id: Uuid::new_v4(),
        name: request.name,
        category: request.category,
        mode: request.mode,
        league: request.league,
        min_players: request.min_players,
        max_players: request.max_players,
        enabled: true,
        created_at: state.clock().now(),
        rules,
    };
    state.store().save_recurring(template.clone()).await?;

    info!(template_id = %template.id, name = %template.name, "created recurring template");
    Ok(template)
}

/// Enable or disable a template; disabled templates are skipped by the pass.
pub async fn toggle_recurring(
    state: &SharedState,
    moderator_id: Uuid,
    template_id: Uuid,
    enabled: bool,
) -> Result<RecurringMatchEntity, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ManageSchedule)?;

    let mut template = state
        .store()
        .find_recurring(template_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("recurring template {template_id}")))?;
    template.enabled = enabled;
    state.store().save_recurring(template.clone()).await?;

    info!(template_id = %template.id, enabled, "toggled recurring template");
    Ok(template)
}

/// Delete a template; matches it already generated are unaffected.
pub async fn delete_recurring(
    state: &SharedState,
    moderator_id: Uuid,
    template_id: Uuid,
) -> Result<RecurringMatchEntity, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ManageSchedule)?;

    let template = state
        .store()
        .find_recurring(template_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("recurring template {template_id}")))?;
    state.store().delete_recurring(template.id).await?;

    info!(template_id = %template.id, "deleted recurring template");
    Ok(template)
}

/// All recurring templates.
pub async fn list_recurring(
    state: &SharedState,
) -> Result<Vec<RecurringMatchEntity>, ServiceError> {
    Ok(state.store().list_recurring().await?)
}

/// One scheduling pass: materialize every due occurrence as a waiting match.
///
/// An occurrence is due once it lies within [`OPEN_LEAD`] of now. A rule that
/// fell far behind (downtime) catches up one occurrence per pass; stale
/// occurrences surface as matches the readiness pass immediately resolves.
pub async fn run_pass(state: &SharedState) -> Result<SchedulePassReport, ServiceError> {
    let now = state.clock().now();
    let offset = state.config().reference_offset();

    let mut created = Vec::new();
    let mut skipped = 0usize;

    for template in state.store().list_recurring().await? {
        if !template.enabled {
            continue;
        }
        for rule in &template.rules {
            let anchor = rule.last_scheduled_at.unwrap_or(template.created_at);
            let Some(occurrence) =
                next_occurrence(&rule.weekdays, rule.hour, rule.minute, anchor, offset)
            else {
                continue;
            };
            if occurrence > now + OPEN_LEAD {
                skipped += 1;
                continue;
            }

            let spawned = match_service::spawn_session(
                state,
                template.category,
                template.mode,
                template.league,
                template.min_players,
                template.max_players,
                occurrence,
                Some(template.id),
            )
            .await;

            match spawned {
                Ok(match_id) => {
                    state
                        .store()
                        .mark_rule_scheduled(template.id, rule.id, occurrence)
                        .await?;
                    created.push(match_id);
                }
                Err(err) => {
                    // Typically no active season yet; the rule stays due.
                    warn!(
                        template_id = %template.id,
                        rule_id = %rule.id,
                        error = %err,
                        "skipping recurring rule"
                    );
                }
            }
        }
    }

    if !created.is_empty() {
        info!(created = created.len(), "scheduling pass generated matches");
    }
    Ok(SchedulePassReport {
        created,
        skipped,
    })
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
        passcode::RandomPasscodes,
        state::{
            AppState, SharedState,
            session::{EventCategory, InGameMode, LeagueType},
        },
    };

    fn plus_nine() -> UtcOffset {
        UtcOffset::from_hms(9, 0, 0).unwrap()
    }

    #[test]
    fn next_occurrence_finds_the_coming_weekday() {
        // 2026-03-02 is a Monday.
        let after = datetime!(2026-03-02 10:00 +9);
        let occurrence = next_occurrence(&[3], 20, 0, after, plus_nine()).unwrap();
        assert_eq!(occurrence, datetime!(2026-03-04 20:00 +9));
    }

    #[test]
    fn same_day_later_time_counts() {
        let after = datetime!(2026-03-02 10:00 +9);
        let occurrence = next_occurrence(&[1], 20, 0, after, plus_nine()).unwrap();
        assert_eq!(occurrence, datetime!(2026-03-02 20:00 +9));
    }

    #[test]
    fn same_day_passed_time_rolls_a_week() {
        let after = datetime!(2026-03-02 21:00 +9);
        let occurrence = next_occurrence(&[1], 20, 0, after, plus_nine()).unwrap();
        assert_eq!(occurrence, datetime!(2026-03-09 20:00 +9));
    }

    #[test]
    fn occurrence_is_computed_in_the_reference_timezone() {
        // Sunday 23:00 UTC is already Monday 08:00 in +09:00.
        let after = datetime!(2026-03-01 23:00 UTC);
        let occurrence = next_occurrence(&[1], 20, 0, after, plus_nine()).unwrap();
        assert_eq!(occurrence, datetime!(2026-03-02 20:00 +9));
    }

    async fn scheduling_state() -> (SharedState, Arc<ManualClock>, Uuid) {
        let clock = Arc::new(ManualClock::new(datetime!(2026-03-02 10:00 +9)));
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

        let moderator = Uuid::new_v4();
        state
            .capabilities()
            .grant(moderator, Permission::ManageSchedule);
        (state, clock, moderator)
    }

    #[tokio::test]
    async fn pass_is_idempotent_per_occurrence() {
        let (state, _clock, moderator) = scheduling_state().await;

        create_recurring(
            &state,
            CreateRecurringRequest {
                moderator_id: moderator,
                name: "Monday Knights".into(),
                category: EventCategory::Classic,
                mode: InGameMode::Classic,
                league: LeagueType::Knight,
                min_players: 2,
                max_players: 8,
                rules: vec![RuleInput {
                    weekdays: vec![1],
                    hour: 20,
                    minute: 0,
                }],
            },
        )
        .await
        .unwrap();

        let first = run_pass(&state).await.unwrap();
        assert_eq!(first.created.len(), 1);

        // The occurrence is marked; nothing new until next week comes in range.
        let second = run_pass(&state).await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.skipped, 1);

        let view = crate::services::match_service::get_match(&state, first.created[0])
            .await
            .unwrap();
        assert_eq!(view.scheduled_start, "2026-03-02T20:00:00+09:00");
        assert!(view.recurring_match_id.is_some());
    }

    #[tokio::test]
    async fn disabled_templates_are_skipped() {
        let (state, _clock, moderator) = scheduling_state().await;

        let template = create_recurring(
            &state,
            CreateRecurringRequest {
                moderator_id: moderator,
                name: "Paused".into(),
                category: EventCategory::Classic,
                mode: InGameMode::GrandPrix,
                league: LeagueType::Queen,
                min_players: 2,
                max_players: 8,
                rules: vec![RuleInput {
                    weekdays: vec![1],
                    hour: 20,
                    minute: 0,
                }],
            },
        )
        .await
        .unwrap();
        toggle_recurring(&state, moderator, template.id, false)
            .await
            .unwrap();

        let report = run_pass(&state).await.unwrap();
        assert!(report.created.is_empty());
    }

    #[tokio::test]
    async fn deleted_templates_stop_generating() {
        let (state, _clock, moderator) = scheduling_state().await;

        let template = create_recurring(
            &state,
            CreateRecurringRequest {
                moderator_id: moderator,
                name: "Short-lived".into(),
                category: EventCategory::Classic,
                mode: InGameMode::Classic,
                league: LeagueType::Knight,
                min_players: 2,
                max_players: 8,
                rules: vec![RuleInput {
                    weekdays: vec![1],
                    hour: 20,
                    minute: 0,
                }],
            },
        )
        .await
        .unwrap();

        delete_recurring(&state, moderator, template.id).await.unwrap();
        assert!(list_recurring(&state).await.unwrap().is_empty());

        let report = run_pass(&state).await.unwrap();
        assert!(report.created.is_empty());

        let err = delete_recurring(&state, moderator, template.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn catches_up_one_occurrence_per_pass() {
        let (state, clock, moderator) = scheduling_state().await;

        create_recurring(
            &state,
            CreateRecurringRequest {
                moderator_id: moderator,
                name: "Weekly".into(),
                category: EventCategory::Classic,
                mode: InGameMode::Classic,
                league: LeagueType::Knight,
                min_players: 2,
                max_players: 8,
                rules: vec![RuleInput {
                    weekdays: vec![1],
                    hour: 20,
                    minute: 0,
                }],
            },
        )
        .await
        .unwrap();

        // Two Mondays go by without a pass.
        clock.set(datetime!(2026-03-16 10:00 +9));

        let first = run_pass(&state).await.unwrap();
        assert_eq!(first.created.len(), 1);
        let second = run_pass(&state).await.unwrap();
        assert_eq!(second.created.len(), 1);
        let third = run_pass(&state).await.unwrap();
        assert_eq!(third.created.len(), 1);
        // Caught up; the next Monday is beyond the open lead.
        let fourth = run_pass(&state).await.unwrap();
        assert!(fourth.created.is_empty());
    }
}
