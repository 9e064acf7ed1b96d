use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        commands::{CreateSeasonRequest, ModeratorRequest},
        views::SeasonView,
    },
    error::AppError,
    services::season_service,
    state::SharedState,
};

/// Routes handling season management.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/seasons", get(list_seasons).post(create_season))
        .route("/seasons/{id}", delete(delete_season))
        .route("/seasons/{id}/activate", post(activate_season))
        .route("/seasons/{id}/close", post(close_season))
}

/// List every season across categories.
#[utoipa::path(
    get,
    path = "/seasons",
    tag = "season",
    responses(
        (status = 200, description = "All seasons", body = [SeasonView])
    )
)]
pub async fn list_seasons(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SeasonView>>, AppError> {
    let seasons = season_service::list_seasons(&state).await?;
    Ok(Json(seasons.iter().map(SeasonView::from).collect()))
}

/// Create a new inactive season with the next sequential number.
#[utoipa::path(
    post,
    path = "/seasons",
    tag = "season",
    request_body = CreateSeasonRequest,
    responses(
        (status = 200, description = "Season created", body = SeasonView),
        (status = 403, description = "Missing manage-seasons capability")
    )
)]
pub async fn create_season(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateSeasonRequest>>,
) -> Result<Json<SeasonView>, AppError> {
    let season =
        season_service::create_season(&state, payload.moderator_id, payload.category).await?;
    Ok(Json(SeasonView::from(&season)))
}

/// Activate a season, deactivating the category's current one.
#[utoipa::path(
    post,
    path = "/seasons/{id}/activate",
    tag = "season",
    params(("id" = String, Path, description = "Identifier of the season")),
    request_body = ModeratorRequest,
    responses(
        (status = 200, description = "Season activated", body = SeasonView)
    )
)]
pub async fn activate_season(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ModeratorRequest>>,
) -> Result<Json<SeasonView>, AppError> {
    let season = season_service::activate_season(&state, payload.moderator_id, id).await?;
    Ok(Json(SeasonView::from(&season)))
}

/// Delete an inactive season that has no archived matches.
#[utoipa::path(
    delete,
    path = "/seasons/{id}",
    tag = "season",
    params(("id" = String, Path, description = "Identifier of the season")),
    request_body = ModeratorRequest,
    responses(
        (status = 200, description = "Season deleted", body = SeasonView),
        (status = 400, description = "Season is active or has archived matches")
    )
)]
pub async fn delete_season(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ModeratorRequest>>,
) -> Result<Json<SeasonView>, AppError> {
    let season = season_service::delete_season(&state, payload.moderator_id, id).await?;
    Ok(Json(SeasonView::from(&season)))
}

/// Close a season, stamping its end date.
#[utoipa::path(
    post,
    path = "/seasons/{id}/close",
    tag = "season",
    params(("id" = String, Path, description = "Identifier of the season")),
    request_body = ModeratorRequest,
    responses(
        (status = 200, description = "Season closed", body = SeasonView)
    )
)]
pub async fn close_season(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ModeratorRequest>>,
) -> Result<Json<SeasonView>, AppError> {
    let now = state.clock().now();
    let season = season_service::close_season(&state, payload.moderator_id, id, now).await?;
    Ok(Json(SeasonView::from(&season)))
}
