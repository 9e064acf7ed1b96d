use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        commands::{
            CreateMatchRequest, EditResultRequest, JoinRequest, LeaveRequest, ModeratorRequest,
            ReviewResultRequest, SubmitResultRequest, VoteRequest,
        },
        views::{MatchSummary, SubmissionOutcome, VoteOutcome},
    },
    error::AppError,
    services::{match_service, roster_service, vote_service},
    state::SharedState,
};

/// Routes handling match lifecycle, roster, submissions and votes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/join", post(join_match))
        .route("/matches/{id}/leave", post(leave_match))
        .route("/matches/{id}/results", post(submit_result))
        .route("/matches/{id}/results/{user_id}", put(edit_result))
        .route("/matches/{id}/results/{user_id}/review", post(review_result))
        .route("/matches/{id}/vote", post(cast_vote))
        .route("/matches/{id}/end", post(end_match))
        .route("/matches/{id}/cancel", post(cancel_match))
        .route("/matches/{id}/finalize", post(finalize_match))
}

/// List every registered match, soonest scheduled first.
#[utoipa::path(
    get,
    path = "/matches",
    tag = "match",
    responses(
        (status = 200, description = "All matches", body = [MatchSummary])
    )
)]
pub async fn list_matches(State(state): State<SharedState>) -> Json<Vec<MatchSummary>> {
    Json(match_service::list_matches(&state).await)
}

/// Create a one-off match against the category's active season.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "match",
    request_body = CreateMatchRequest,
    responses(
        (status = 200, description = "Match created", body = MatchSummary)
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateMatchRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::create_match(&state, payload).await?;
    Ok(Json(summary))
}

/// Fetch one match with its roster and current game.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "match",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Match state", body = MatchSummary),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::get_match(&state, id).await?;
    Ok(Json(summary))
}

/// Claim a roster slot in a waiting match.
#[utoipa::path(
    post,
    path = "/matches/{id}/join",
    tag = "match",
    params(("id" = String, Path, description = "Identifier of the match")),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Joined", body = MatchSummary),
        (status = 400, description = "Full, already joined, or not waiting")
    )
)]
pub async fn join_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<JoinRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = roster_service::join_match(&state, id, payload.user_id).await?;
    Ok(Json(summary))
}

/// Withdraw from a waiting match.
#[utoipa::path(
    post,
    path = "/matches/{id}/leave",
    tag = "match",
    params(("id" = String, Path, description = "Identifier of the match")),
    request_body = LeaveRequest,
    responses(
        (status = 200, description = "Withdrawn", body = MatchSummary)
    )
)]
pub async fn leave_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<LeaveRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = roster_service::leave_match(&state, id, payload.user_id).await?;
    Ok(Json(summary))
}

/// Submit or update one's own race results for the current game.
#[utoipa::path(
    post,
    path = "/matches/{id}/results",
    tag = "match",
    params(("id" = String, Path, description = "Identifier of the match")),
    request_body = SubmitResultRequest,
    responses(
        (status = 200, description = "Results recorded", body = SubmissionOutcome),
        (status = 400, description = "Not in progress or invalid entries")
    )
)]
pub async fn submit_result(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitResultRequest>>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    let outcome = match_service::submit_result(&state, id, payload).await?;
    Ok(Json(outcome))
}

/// Correct a participant's results as a moderator.
#[utoipa::path(
    put,
    path = "/matches/{id}/results/{user_id}",
    tag = "match",
    params(
        ("id" = String, Path, description = "Identifier of the match"),
        ("user_id" = String, Path, description = "Participant whose results are corrected")
    ),
    request_body = EditResultRequest,
    responses(
        (status = 200, description = "Results corrected", body = SubmissionOutcome),
        (status = 403, description = "Missing moderate-matches capability")
    )
)]
pub async fn edit_result(
    State(state): State<SharedState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<EditResultRequest>>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    let outcome = match_service::edit_result(&state, id, user_id, payload).await?;
    Ok(Json(outcome))
}

/// Record a moderator verdict on a participant's sheet.
#[utoipa::path(
    post,
    path = "/matches/{id}/results/{user_id}/review",
    tag = "match",
    params(
        ("id" = String, Path, description = "Identifier of the match"),
        ("user_id" = String, Path, description = "Participant whose sheet is reviewed")
    ),
    request_body = ReviewResultRequest,
    responses(
        (status = 200, description = "Verdict recorded", body = SubmissionOutcome),
        (status = 400, description = "Not a review verdict")
    )
)]
pub async fn review_result(
    State(state): State<SharedState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<ReviewResultRequest>>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    let outcome = match_service::review_result(
        &state,
        id,
        user_id,
        payload.moderator_id,
        payload.status,
    )
    .await?;
    Ok(Json(outcome))
}

/// Cast a split vote toward rotating the lobby passcode.
#[utoipa::path(
    post,
    path = "/matches/{id}/vote",
    tag = "match",
    params(("id" = String, Path, description = "Identifier of the match")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = VoteOutcome),
        (status = 400, description = "Not eligible or already voted")
    )
)]
pub async fn cast_vote(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<VoteRequest>>,
) -> Result<Json<VoteOutcome>, AppError> {
    let outcome = vote_service::cast_split_vote(&state, id, payload.user_id).await?;
    Ok(Json(outcome))
}

/// End an in-progress match early.
#[utoipa::path(
    post,
    path = "/matches/{id}/end",
    tag = "match",
    params(("id" = String, Path, description = "Identifier of the match")),
    request_body = ModeratorRequest,
    responses(
        (status = 200, description = "Match completed", body = MatchSummary)
    )
)]
pub async fn end_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ModeratorRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::end_match(&state, id, payload.moderator_id).await?;
    Ok(Json(summary))
}

/// Cancel a match that has not completed.
#[utoipa::path(
    post,
    path = "/matches/{id}/cancel",
    tag = "match",
    params(("id" = String, Path, description = "Identifier of the match")),
    request_body = ModeratorRequest,
    responses(
        (status = 200, description = "Match cancelled", body = MatchSummary)
    )
)]
pub async fn cancel_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ModeratorRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::cancel_match(&state, id, payload.moderator_id).await?;
    Ok(Json(summary))
}

/// Freeze a completed match, archive it and apply ratings exactly once.
#[utoipa::path(
    post,
    path = "/matches/{id}/finalize",
    tag = "match",
    params(("id" = String, Path, description = "Identifier of the match")),
    request_body = ModeratorRequest,
    responses(
        (status = 200, description = "Match finalized", body = MatchSummary),
        (status = 409, description = "Already finalized or not completed")
    )
)]
pub async fn finalize_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ModeratorRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::finalize_match(&state, id, payload.moderator_id).await?;
    Ok(Json(summary))
}
