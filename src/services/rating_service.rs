//! Rating engine: incremental application at finalization and bulk replay.
//!
//! The formula is pure integer arithmetic over archived match records, so
//! replaying a season always reproduces the exact same aggregates. Both the
//! incremental path and the bulk replay fold records through the same
//! function; the replay rebuilds the whole season from scratch and swaps the
//! aggregates in atomically, which makes it idempotent and safe to re-run.

use std::collections::BTreeMap;

use tracing::info;
use uuid::Uuid;

use crate::{
    auth::Permission,
    config::RatingConfig,
    dao::models::{MatchRecordEntity, UserSeasonStatsEntity},
    dto::views::RecalculationReport,
    error::ServiceError,
    state::{SharedState, session::EventCategory},
};

/// Percentage weight a category applies to rating deltas.
fn category_weight(category: EventCategory) -> i32 {
    match category {
        EventCategory::Gp | EventCategory::Classic => 100,
        EventCategory::TeamClassic | EventCategory::TeamGp => 80,
        EventCategory::Tournament => 120,
    }
}

/// Performance score of a rank within a field, on a 0..=1000 scale.
///
/// First place scores 1000, last place 0, linear in between. A field of one
/// has no opponents to lose to.
fn placement_score(rank: u32, field: u32) -> i32 {
    if field <= 1 {
        return 1000;
    }
    let rank = rank.min(field);
    ((field - rank) as i64 * 1000 / (field - 1) as i64) as i32
}

/// Expected performance from the rating gap to the field average.
fn expected_score(pre_rating: i32, field_average: i32) -> i32 {
    (500 + (pre_rating - field_average) / 4).clamp(0, 1000)
}

/// K factor tapering from `k_max` to `k_min` as matches accumulate.
fn k_factor(convergence_points: u32, config: &RatingConfig) -> i32 {
    if config.convergence_cap == 0 {
        return config.k_min;
    }
    let capped = convergence_points.min(config.convergence_cap) as i32;
    config.k_max - (config.k_max - config.k_min) * capped / config.convergence_cap as i32
}

/// Fold one archived match into the season aggregates.
///
/// Missing participants are seeded at the initial rating first, so the
/// incremental path and the bulk replay see identical pre-ratings.
pub fn fold_record(
    aggregates: &mut BTreeMap<Uuid, UserSeasonStatsEntity>,
    record: &MatchRecordEntity,
    config: &RatingConfig,
) {
    let mut pre_ratings: BTreeMap<Uuid, i32> = BTreeMap::new();
    for outcome in &record.outcomes {
        let row = aggregates.entry(outcome.user_id).or_insert_with(|| {
            UserSeasonStatsEntity::new(outcome.user_id, record.season_id, config.initial_rating)
        });
        pre_ratings.insert(outcome.user_id, row.internal_rating);
    }

    let field = record.outcomes.len() as u32;
    if field == 0 {
        return;
    }
    let field_average = pre_ratings.values().sum::<i32>() / field as i32;
    let weight = category_weight(record.category);

    for outcome in &record.outcomes {
        let Some(row) = aggregates.get_mut(&outcome.user_id) else {
            continue;
        };
        let Some(&pre_rating) = pre_ratings.get(&outcome.user_id) else {
            continue;
        };

        let survived = outcome.eliminated_race.is_none();
        let mut actual = placement_score(outcome.final_rank, field);
        if survived {
            actual = (actual + config.survival_bonus).min(1000);
        }

        let expected = expected_score(pre_rating, field_average);
        let k = k_factor(row.convergence_points, config);
        let delta = k * (actual - expected) / 1000 * weight / 100;

        row.internal_rating += delta;
        row.display_rating = row.internal_rating.max(config.rating_floor);
        row.season_high_rating = row.season_high_rating.max(row.display_rating);
        row.convergence_points += 1;

        row.total_matches += 1;
        match outcome.final_rank {
            1 => row.first_places += 1,
            2 => row.second_places += 1,
            3 => row.third_places += 1,
            _ => {}
        }
        if survived {
            row.survived_count += 1;
        }
        if outcome.assist_used {
            row.assist_used_count += 1;
        }
    }
}

/// Apply one freshly archived record incrementally.
///
/// The caller holds the rating gate, which keeps archive order and rating
/// order aligned with the replay.
pub(crate) async fn apply_record(
    state: &SharedState,
    record: &MatchRecordEntity,
) -> Result<(), ServiceError> {
    let config = state.config().rating().clone();

    let mut aggregates = BTreeMap::new();
    for outcome in &record.outcomes {
        if let Some(row) = state
            .store()
            .find_stats(outcome.user_id, record.season_id)
            .await?
        {
            aggregates.insert(outcome.user_id, row);
        }
    }

    fold_record(&mut aggregates, record, &config);

    for row in aggregates.into_values() {
        state.store().upsert_stats(row).await?;
    }
    Ok(())
}

/// Replay a season's archive from scratch and swap the aggregates in.
///
/// `from_match_number` scopes the report; the rebuild always starts at match
/// one so earlier corrections are picked up too.
pub async fn recalculate(
    state: &SharedState,
    moderator_id: Uuid,
    category: EventCategory,
    season_number: u32,
    from_match_number: u32,
) -> Result<RecalculationReport, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::RecalculateRatings)?;

    let season = state
        .store()
        .find_season_by_number(category, season_number)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("season {season_number} in {category:?}"))
        })?;

    let _gate = state.rating_gate().lock().await;

    let config = state.config().rating().clone();
    let records = state.store().season_records(season.id).await?;

    let mut aggregates = BTreeMap::new();
    let mut matches_replayed = 0u32;
    for record in &records {
        fold_record(&mut aggregates, record, &config);
        if record.match_number >= from_match_number {
            matches_replayed += 1;
        }
    }

    let users_updated = aggregates.len() as u32;
    state
        .store()
        .replace_season_stats(season.id, aggregates.into_values().collect())
        .await?;

    info!(
        season_id = %season.id,
        matches_replayed,
        users_updated,
        "rating recalculation completed"
    );

    Ok(RecalculationReport {
        season_id: season.id,
        from_match_number,
        matches_replayed,
        users_updated,
    })
}

/// Season standings ordered by display rating, best first.
pub async fn standings(
    state: &SharedState,
    category: EventCategory,
    season_number: u32,
) -> Result<Vec<UserSeasonStatsEntity>, ServiceError> {
    let season = state
        .store()
        .find_season_by_number(category, season_number)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("season {season_number} in {category:?}"))
        })?;

    let mut rows = state.store().season_stats(season.id).await?;
    rows.sort_by(|a, b| {
        b.display_rating
            .cmp(&a.display_rating)
            .then(a.user_id.cmp(&b.user_id))
    });
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::MatchOutcomeEntity;
    use time::macros::datetime;

    fn outcome(user_id: Uuid, final_rank: u32) -> MatchOutcomeEntity {
        MatchOutcomeEntity {
            user_id,
            final_rank,
            total_points: Some(30),
            eliminated_race: None,
            assist_used: false,
        }
    }

    fn record(season_id: Uuid, match_number: u32, outcomes: Vec<MatchOutcomeEntity>) -> MatchRecordEntity {
        MatchRecordEntity {
            match_id: Uuid::new_v4(),
            season_id,
            category: EventCategory::Classic,
            match_number,
            field_size: outcomes.len() as u32,
            finalized_at: datetime!(2026-03-02 21:00 +9),
            outcomes,
        }
    }

    #[test]
    fn placement_score_is_linear_over_the_field() {
        assert_eq!(placement_score(1, 4), 1000);
        assert_eq!(placement_score(4, 4), 0);
        assert_eq!(placement_score(2, 4), 666);
        assert_eq!(placement_score(1, 1), 1000);
    }

    #[test]
    fn k_tapers_with_convergence() {
        let config = RatingConfig::default();
        assert_eq!(k_factor(0, &config), 64);
        assert_eq!(k_factor(10, &config), 40);
        assert_eq!(k_factor(20, &config), 16);
        assert_eq!(k_factor(99, &config), 16);
    }

    #[test]
    fn winner_gains_and_loser_drops_at_equal_ratings() {
        let config = RatingConfig::default();
        let season_id = Uuid::new_v4();
        let winner = Uuid::new_v4();
        let loser = Uuid::new_v4();

        let mut aggregates = BTreeMap::new();
        fold_record(
            &mut aggregates,
            &record(season_id, 1, vec![outcome(winner, 1), outcome(loser, 2)]),
            &config,
        );

        let winner_row = &aggregates[&winner];
        let loser_row = &aggregates[&loser];
        assert!(winner_row.internal_rating > config.initial_rating);
        assert!(loser_row.internal_rating < config.initial_rating);
        assert_eq!(winner_row.first_places, 1);
        assert_eq!(loser_row.second_places, 1);
        assert_eq!(winner_row.total_matches, 1);
    }

    #[test]
    fn elimination_forfeits_the_survival_bonus() {
        let config = RatingConfig::default();
        let season_id = Uuid::new_v4();
        let survivor = Uuid::new_v4();
        let crashed = Uuid::new_v4();

        let mut eliminated = outcome(crashed, 2);
        eliminated.eliminated_race = Some(2);
        eliminated.total_points = None;

        let mut aggregates = BTreeMap::new();
        fold_record(
            &mut aggregates,
            &record(season_id, 1, vec![outcome(survivor, 1), eliminated]),
            &config,
        );

        assert_eq!(aggregates[&survivor].survived_count, 1);
        assert_eq!(aggregates[&crashed].survived_count, 0);
        // Same rank-2 score minus the bonus means a strictly worse delta.
        assert!(aggregates[&crashed].internal_rating < config.initial_rating);
    }

    #[test]
    fn display_rating_never_drops_below_the_floor() {
        let config = RatingConfig {
            initial_rating: 10,
            rating_floor: 0,
            ..RatingConfig::default()
        };
        let season_id = Uuid::new_v4();
        let loser = Uuid::new_v4();
        let winner = Uuid::new_v4();

        let mut aggregates = BTreeMap::new();
        for match_number in 1..=5 {
            let mut eliminated = outcome(loser, 2);
            eliminated.eliminated_race = Some(1);
            eliminated.total_points = None;
            fold_record(
                &mut aggregates,
                &record(season_id, match_number, vec![outcome(winner, 1), eliminated]),
                &config,
            );
        }

        let row = &aggregates[&loser];
        assert!(row.internal_rating < 0);
        assert_eq!(row.display_rating, 0);
    }

    #[test]
    fn replay_is_deterministic() {
        let config = RatingConfig::default();
        let season_id = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let records = vec![
            record(season_id, 1, vec![outcome(a, 1), outcome(b, 2), outcome(c, 3)]),
            record(season_id, 2, vec![outcome(b, 1), outcome(c, 2), outcome(a, 3)]),
            record(season_id, 3, vec![outcome(c, 1), outcome(a, 2), outcome(b, 3)]),
        ];

        let mut first = BTreeMap::new();
        let mut second = BTreeMap::new();
        for rec in &records {
            fold_record(&mut first, rec, &config);
            fold_record(&mut second, rec, &config);
        }

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn recalculate_is_idempotent() {
        use std::sync::Arc;

        use crate::{
            clock::ManualClock, config::AppConfig, dao::memory::MemoryStore,
            dao::models::SeasonEntity, passcode::RandomPasscodes, state::AppState,
        };

        let moderator = Uuid::new_v4();
        let state = AppState::with_parts(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(datetime!(2026-03-02 12:00 +9))),
            Arc::new(RandomPasscodes),
        );
        state
            .capabilities()
            .grant(moderator, Permission::RecalculateRatings);

        let season = SeasonEntity {
            id: Uuid::new_v4(),
            category: EventCategory::Classic,
            season_number: 1,
            is_active: true,
            started_at: datetime!(2026-03-01 00:00 +9),
            ends_at: None,
        };
        state.store().save_season(season.clone()).await.unwrap();

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for outcomes in [
            vec![outcome(a, 1), outcome(b, 2)],
            vec![outcome(b, 1), outcome(a, 2)],
        ] {
            let rec = record(season.id, 0, outcomes);
            let number = state.store().archive_match(rec.clone()).await.unwrap();
            let mut rec = rec;
            rec.match_number = number;
            apply_record(&state, &rec).await.unwrap();
        }

        let before = state.store().season_stats(season.id).await.unwrap();

        let report = recalculate(&state, moderator, EventCategory::Classic, 1, 1)
            .await
            .unwrap();
        assert_eq!(report.matches_replayed, 2);
        assert_eq!(report.users_updated, 2);

        // Replay reproduces exactly what the incremental path wrote.
        let after = state.store().season_stats(season.id).await.unwrap();
        assert_eq!(before, after);

        recalculate(&state, moderator, EventCategory::Classic, 1, 1)
            .await
            .unwrap();
        let again = state.store().season_stats(season.id).await.unwrap();
        assert_eq!(after, again);
    }
}
