//! In-memory [`LeagueStore`] backend.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{
    MatchRecordEntity, RecurringMatchEntity, SeasonEntity, UserSeasonStatsEntity,
};
use crate::dao::storage::{StorageError, StorageResult};
use crate::dao::store::LeagueStore;
use crate::state::session::EventCategory;

#[derive(Default)]
struct MemoryInner {
    seasons: DashMap<Uuid, SeasonEntity>,
    recurring: DashMap<Uuid, RecurringMatchEntity>,
    stats: DashMap<(Uuid, Uuid), UserSeasonStatsEntity>,
    // Records per season; appended under the entry lock so match numbers
    // are assigned atomically and stay dense.
    records: DashMap<Uuid, Vec<MatchRecordEntity>>,
}

/// DashMap-backed store; the default backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeagueStore for MemoryStore {
    fn save_season(&self, season: SeasonEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.seasons.insert(season.id, season);
            Ok(())
        })
    }

    fn find_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.seasons.get(&id).map(|entry| entry.clone())) })
    }

    fn find_season_by_number(
        &self,
        category: EventCategory,
        season_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .seasons
                .iter()
                .find(|entry| {
                    entry.category == category && entry.season_number == season_number
                })
                .map(|entry| entry.clone()))
        })
    }

    fn active_season(
        &self,
        category: EventCategory,
    ) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .seasons
                .iter()
                .find(|entry| entry.category == category && entry.is_active)
                .map(|entry| entry.clone()))
        })
    }

    fn list_seasons(&self) -> BoxFuture<'static, StorageResult<Vec<SeasonEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut seasons: Vec<SeasonEntity> =
                inner.seasons.iter().map(|entry| entry.clone()).collect();
            seasons.sort_by_key(|season| (season.category as u8, season.season_number));
            Ok(seasons)
        })
    }

    fn delete_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .seasons
                .remove(&id)
                .ok_or_else(|| StorageError::missing(format!("season {id}")))?;
            Ok(())
        })
    }

    fn save_recurring(
        &self,
        template: RecurringMatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.recurring.insert(template.id, template);
            Ok(())
        })
    }

    fn find_recurring(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RecurringMatchEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.recurring.get(&id).map(|entry| entry.clone())) })
    }

    fn list_recurring(&self) -> BoxFuture<'static, StorageResult<Vec<RecurringMatchEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut templates: Vec<RecurringMatchEntity> =
                inner.recurring.iter().map(|entry| entry.clone()).collect();
            templates.sort_by_key(|template| template.created_at);
            Ok(templates)
        })
    }

    fn delete_recurring(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .recurring
                .remove(&id)
                .ok_or_else(|| StorageError::missing(format!("template {id}")))?;
            Ok(())
        })
    }

    fn mark_rule_scheduled(
        &self,
        template_id: Uuid,
        rule_id: Uuid,
        occurrence: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut template = inner
                .recurring
                .get_mut(&template_id)
                .ok_or_else(|| StorageError::missing(format!("template {template_id}")))?;
            let rule = template
                .rules
                .iter_mut()
                .find(|rule| rule.id == rule_id)
                .ok_or_else(|| StorageError::missing(format!("rule {rule_id}")))?;
            rule.last_scheduled_at = Some(occurrence);
            Ok(())
        })
    }

    fn upsert_stats(
        &self,
        stats: UserSeasonStatsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.stats.insert((stats.user_id, stats.season_id), stats);
            Ok(())
        })
    }

    fn find_stats(
        &self,
        user_id: Uuid,
        season_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<UserSeasonStatsEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .stats
                .get(&(user_id, season_id))
                .map(|entry| entry.clone()))
        })
    }

    fn season_stats(
        &self,
        season_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<UserSeasonStatsEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut stats: Vec<UserSeasonStatsEntity> = inner
                .stats
                .iter()
                .filter(|entry| entry.season_id == season_id)
                .map(|entry| entry.clone())
                .collect();
            stats.sort_by_key(|row| row.user_id);
            Ok(stats)
        })
    }

    fn replace_season_stats(
        &self,
        season_id: Uuid,
        stats: Vec<UserSeasonStatsEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            // The rating engine is the single writer for these rows, so the
            // retain + insert pair cannot interleave with another writer.
            inner.stats.retain(|key, _| key.1 != season_id);
            for row in stats {
                inner.stats.insert((row.user_id, row.season_id), row);
            }
            Ok(())
        })
    }

    fn archive_match(
        &self,
        mut record: MatchRecordEntity,
    ) -> BoxFuture<'static, StorageResult<u32>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut records = inner.records.entry(record.season_id).or_default();
            let match_number = records.len() as u32 + 1;
            record.match_number = match_number;
            records.push(record);
            Ok(match_number)
        })
    }

    fn season_records(
        &self,
        season_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .records
                .get(&season_id)
                .map(|records| records.clone())
                .unwrap_or_default())
        })
    }

    fn discard_match_record(
        &self,
        season_id: Uuid,
        match_number: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut records = inner
                .records
                .get_mut(&season_id)
                .ok_or_else(|| StorageError::missing(format!("season {season_id}")))?;
            match records.last() {
                Some(last) if last.match_number == match_number => {
                    records.pop();
                    Ok(())
                }
                _ => Err(StorageError::missing(format!(
                    "record {match_number} is not the newest of season {season_id}"
                ))),
            }
        })
    }
}
