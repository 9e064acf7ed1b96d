use axum::{
    Router,
    extract::{Path, State},
    response::sse::{KeepAlive, Sse},
    routing::get,
};
use uuid::Uuid;

use crate::{error::AppError, services::sse_service, state::SharedState};

/// Routes exposing the per-match event stream.
pub fn router() -> Router<SharedState> {
    Router::new().route("/matches/{id}/events", get(match_stream))
}

/// Subscribe to a match's event stream.
///
/// Emits `roster.changed`, `status.changed`, `score.updated`,
/// `split_vote.updated` and `passcode.regenerated` frames in commit order.
#[utoipa::path(
    get,
    path = "/matches/{id}/events",
    tag = "sse",
    params(("id" = String, Path, description = "Identifier of the match to follow")),
    responses(
        (status = 200, description = "SSE stream of match events"),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn match_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>>, AppError>
{
    if state.match_handle(id).is_none() {
        return Err(AppError::NotFound(format!("match {id}")));
    }
    let receiver = state.channels().subscribe(id);
    Ok(Sse::new(sse_service::to_sse_stream(receiver)).keep_alive(KeepAlive::default()))
}
