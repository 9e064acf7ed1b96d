//! Persistence abstraction for league data.

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{
    MatchRecordEntity, RecurringMatchEntity, SeasonEntity, UserSeasonStatsEntity,
};
use crate::dao::storage::StorageResult;
use crate::state::session::EventCategory;

/// Abstraction over the persistence layer for seasons, templates, rating
/// aggregates and the finalized-match archive.
pub trait LeagueStore: Send + Sync {
    /// Insert or replace a season row.
    fn save_season(&self, season: SeasonEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a season by id.
    fn find_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>>;
    /// Fetch a season by category and sequential number.
    fn find_season_by_number(
        &self,
        category: EventCategory,
        season_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>>;
    /// The category's active season, if one exists.
    fn active_season(
        &self,
        category: EventCategory,
    ) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>>;
    /// All seasons, newest numbers last.
    fn list_seasons(&self) -> BoxFuture<'static, StorageResult<Vec<SeasonEntity>>>;
    /// Delete a season row.
    fn delete_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert or replace a recurring template with its rules.
    fn save_recurring(
        &self,
        template: RecurringMatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a recurring template by id.
    fn find_recurring(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RecurringMatchEntity>>>;
    /// All recurring templates.
    fn list_recurring(&self) -> BoxFuture<'static, StorageResult<Vec<RecurringMatchEntity>>>;
    /// Delete a recurring template with its rules.
    fn delete_recurring(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Advance one rule's idempotency marker to the generated occurrence.
    fn mark_rule_scheduled(
        &self,
        template_id: Uuid,
        rule_id: Uuid,
        occurrence: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert or replace one rating aggregate.
    fn upsert_stats(
        &self,
        stats: UserSeasonStatsEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch one user's aggregate for a season.
    fn find_stats(
        &self,
        user_id: Uuid,
        season_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<UserSeasonStatsEntity>>>;
    /// Every aggregate of a season.
    fn season_stats(
        &self,
        season_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<UserSeasonStatsEntity>>>;
    /// Atomically replace every aggregate of a season (bulk replay commit).
    fn replace_season_stats(
        &self,
        season_id: Uuid,
        stats: Vec<UserSeasonStatsEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Archive a finalized match, assigning and returning its sequential
    /// match number within the season.
    fn archive_match(
        &self,
        record: MatchRecordEntity,
    ) -> BoxFuture<'static, StorageResult<u32>>;
    /// Archived records of a season in ascending match-number order.
    fn season_records(
        &self,
        season_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>>;
    /// Remove a season's newest archived record, identified by its match
    /// number. Match numbers stay dense, so only the newest record may go.
    fn discard_match_record(
        &self,
        season_id: Uuid,
        match_number: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;
}
