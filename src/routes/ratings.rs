use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        commands::RecalculateRequest,
        views::{RecalculationReport, StandingsEntry},
    },
    error::AppError,
    services::rating_service,
    state::{SharedState, session::EventCategory},
};

/// Routes exposing standings and the bulk rating recalculation.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/ratings/recalculate", post(recalculate))
        .route(
            "/ratings/{category}/{season_number}/standings",
            get(standings),
        )
}

/// Replay a season's archive and rebuild its rating aggregates.
#[utoipa::path(
    post,
    path = "/ratings/recalculate",
    tag = "rating",
    request_body = RecalculateRequest,
    responses(
        (status = 200, description = "Recalculation report", body = RecalculationReport),
        (status = 403, description = "Missing recalculate-ratings capability")
    )
)]
pub async fn recalculate(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RecalculateRequest>>,
) -> Result<Json<RecalculationReport>, AppError> {
    let report = rating_service::recalculate(
        &state,
        payload.moderator_id,
        payload.category,
        payload.season_number,
        payload.from_match_number,
    )
    .await?;
    Ok(Json(report))
}

/// Season standings ordered by display rating.
#[utoipa::path(
    get,
    path = "/ratings/{category}/{season_number}/standings",
    tag = "rating",
    params(
        ("category" = String, Path, description = "Event category of the season"),
        ("season_number" = u32, Path, description = "Sequential season number")
    ),
    responses(
        (status = 200, description = "Standings, best rating first", body = [StandingsEntry]),
        (status = 404, description = "Unknown season")
    )
)]
pub async fn standings(
    State(state): State<SharedState>,
    Path((category, season_number)): Path<(EventCategory, u32)>,
) -> Result<Json<Vec<StandingsEntry>>, AppError> {
    let rows = rating_service::standings(&state, category, season_number).await?;
    Ok(Json(rows.iter().map(StandingsEntry::from).collect()))
}
