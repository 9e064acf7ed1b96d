//! Season lifecycle: creation, activation, closing.
//!
//! Seasons are numbered sequentially per category and at most one season per
//! category is active at a time. Activation is a check-and-toggle across two
//! rows, so it runs under the state's season gate.

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::Permission,
    dao::models::SeasonEntity,
    error::ServiceError,
    state::{SharedState, session::EventCategory},
};

/// Create a new inactive season in a category.
///
/// The sequential number is one past the category's current maximum; the
/// first season of a category is number 1.
pub async fn create_season(
    state: &SharedState,
    moderator_id: Uuid,
    category: EventCategory,
) -> Result<SeasonEntity, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ManageSeasons)?;

    // Numbering races with concurrent creations; the gate serializes them.
    let _guard = state.season_gate().lock().await;

    let season_number = state
        .store()
        .list_seasons()
        .await?
        .iter()
        .filter(|season| season.category == category)
        .map(|season| season.season_number)
        .max()
        .unwrap_or(0)
        + 1;

    let season = SeasonEntity {
        id: Uuid::new_v4(),
        category,
        season_number,
        is_active: false,
        started_at: state.clock().now(),
        ends_at: None,
    };
    state.store().save_season(season.clone()).await?;

    info!(season_id = %season.id, ?category, season_number, "created season");
    Ok(season)
}

/// Activate a season, deactivating the category's currently active one.
pub async fn activate_season(
    state: &SharedState,
    moderator_id: Uuid,
    season_id: Uuid,
) -> Result<SeasonEntity, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ManageSeasons)?;

    let _guard = state.season_gate().lock().await;

    let mut season = state
        .store()
        .find_season(season_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("season {season_id}")))?;

    if season.is_active {
        return Ok(season);
    }

    if let Some(mut current) = state.store().active_season(season.category).await? {
        current.is_active = false;
        state.store().save_season(current).await?;
    }

    season.is_active = true;
    state.store().save_season(season.clone()).await?;

    info!(season_id = %season.id, category = ?season.category, "activated season");
    Ok(season)
}

/// Close a season: deactivate it and stamp its end date.
pub async fn close_season(
    state: &SharedState,
    moderator_id: Uuid,
    season_id: Uuid,
    now: OffsetDateTime,
) -> Result<SeasonEntity, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ManageSeasons)?;

    let _guard = state.season_gate().lock().await;

    let mut season = state
        .store()
        .find_season(season_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("season {season_id}")))?;

    season.is_active = false;
    if season.ends_at.is_none() {
        season.ends_at = Some(now);
    }
    state.store().save_season(season.clone()).await?;

    info!(season_id = %season.id, "closed season");
    Ok(season)
}

/// Delete a season outright.
///
/// Only inactive seasons with an empty archive may go; finalized matches are
/// history the rating replay depends on.
pub async fn delete_season(
    state: &SharedState,
    moderator_id: Uuid,
    season_id: Uuid,
) -> Result<SeasonEntity, ServiceError> {
    state
        .capabilities()
        .require(moderator_id, Permission::ManageSeasons)?;

    let _guard = state.season_gate().lock().await;

    let season = state
        .store()
        .find_season(season_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("season {season_id}")))?;

    if season.is_active {
        return Err(ServiceError::InvalidInput(
            "season is active; close it first".into(),
        ));
    }
    if !state.store().season_records(season.id).await?.is_empty() {
        return Err(ServiceError::InvalidInput(
            "season has archived matches".into(),
        ));
    }
    state.store().delete_season(season.id).await?;

    info!(season_id = %season.id, "deleted season");
    Ok(season)
}

/// List every season across categories.
pub async fn list_seasons(state: &SharedState) -> Result<Vec<SeasonEntity>, ServiceError> {
    Ok(state.store().list_seasons().await?)
}

/// The active season of a category, required by match creation.
pub async fn require_active_season(
    state: &SharedState,
    category: EventCategory,
) -> Result<SeasonEntity, ServiceError> {
    state
        .store()
        .active_season(category)
        .await?
        .ok_or_else(|| ServiceError::InvalidInput(format!("no active season for {category:?}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        clock::ManualClock,
        config::AppConfig,
        dao::memory::MemoryStore,
        passcode::RandomPasscodes,
        state::AppState,
    };
    use time::macros::datetime;

    fn state_with_moderator() -> (SharedState, Uuid) {
        let moderator = Uuid::new_v4();
        let state = AppState::with_parts(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(datetime!(2026-03-02 12:00 +9))),
            Arc::new(RandomPasscodes),
        );
        state.capabilities().grant(moderator, Permission::ManageSeasons);
        (state, moderator)
    }

    #[tokio::test]
    async fn seasons_number_sequentially_per_category() {
        let (state, moderator) = state_with_moderator();

        let first = create_season(&state, moderator, EventCategory::Gp).await.unwrap();
        let second = create_season(&state, moderator, EventCategory::Gp).await.unwrap();
        let other = create_season(&state, moderator, EventCategory::Classic)
            .await
            .unwrap();

        assert_eq!(first.season_number, 1);
        assert_eq!(second.season_number, 2);
        assert_eq!(other.season_number, 1);
    }

    #[tokio::test]
    async fn activation_deactivates_the_previous_season() {
        let (state, moderator) = state_with_moderator();

        let first = create_season(&state, moderator, EventCategory::Gp).await.unwrap();
        let second = create_season(&state, moderator, EventCategory::Gp).await.unwrap();

        activate_season(&state, moderator, first.id).await.unwrap();
        activate_season(&state, moderator, second.id).await.unwrap();

        let active = state
            .store()
            .active_season(EventCategory::Gp)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.id, second.id);

        let first_again = state.store().find_season(first.id).await.unwrap().unwrap();
        assert!(!first_again.is_active);
    }

    #[tokio::test]
    async fn closing_stamps_the_end_date() {
        let (state, moderator) = state_with_moderator();
        let season = create_season(&state, moderator, EventCategory::Gp).await.unwrap();
        activate_season(&state, moderator, season.id).await.unwrap();

        let closed = close_season(
            &state,
            moderator,
            season.id,
            datetime!(2026-05-31 23:59 +9),
        )
        .await
        .unwrap();

        assert!(!closed.is_active);
        assert_eq!(closed.ends_at, Some(datetime!(2026-05-31 23:59 +9)));
        assert!(
            state
                .store()
                .active_season(EventCategory::Gp)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn delete_refuses_the_active_season() {
        let (state, moderator) = state_with_moderator();
        let season = create_season(&state, moderator, EventCategory::Gp).await.unwrap();
        activate_season(&state, moderator, season.id).await.unwrap();

        let err = delete_season(&state, moderator, season.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        close_season(&state, moderator, season.id, datetime!(2026-05-31 23:59 +9))
            .await
            .unwrap();
        delete_season(&state, moderator, season.id).await.unwrap();
        assert!(state.store().find_season(season.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn capability_is_required() {
        let (state, _moderator) = state_with_moderator();
        let stranger = Uuid::new_v4();

        let err = create_season(&state, stranger, EventCategory::Gp)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));
    }
}
