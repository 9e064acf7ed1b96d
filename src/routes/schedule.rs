use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    auth::Permission,
    dto::{
        commands::{CreateRecurringRequest, ModeratorRequest, ToggleRecurringRequest},
        views::{RecurringMatchView, SchedulePassReport},
    },
    error::AppError,
    services::schedule_service,
    state::SharedState,
};

/// Routes handling recurring match templates and the scheduling pass.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/recurring", get(list_recurring).post(create_recurring))
        .route("/recurring/{id}", delete(delete_recurring))
        .route("/recurring/{id}/toggle", post(toggle_recurring))
        .route("/schedule/run", post(run_pass))
}

/// List every recurring template.
#[utoipa::path(
    get,
    path = "/recurring",
    tag = "schedule",
    responses(
        (status = 200, description = "All recurring templates", body = [RecurringMatchView])
    )
)]
pub async fn list_recurring(
    State(state): State<SharedState>,
) -> Result<Json<Vec<RecurringMatchView>>, AppError> {
    let templates = schedule_service::list_recurring(&state).await?;
    Ok(Json(templates.iter().map(RecurringMatchView::from).collect()))
}

/// Create a recurring template with its weekday/time rules.
#[utoipa::path(
    post,
    path = "/recurring",
    tag = "schedule",
    request_body = CreateRecurringRequest,
    responses(
        (status = 200, description = "Template created", body = RecurringMatchView),
        (status = 403, description = "Missing manage-schedule capability")
    )
)]
pub async fn create_recurring(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRecurringRequest>>,
) -> Result<Json<RecurringMatchView>, AppError> {
    let template = schedule_service::create_recurring(&state, payload).await?;
    Ok(Json(RecurringMatchView::from(&template)))
}

/// Enable or disable a recurring template.
#[utoipa::path(
    post,
    path = "/recurring/{id}/toggle",
    tag = "schedule",
    params(("id" = String, Path, description = "Identifier of the template")),
    request_body = ToggleRecurringRequest,
    responses(
        (status = 200, description = "Template toggled", body = RecurringMatchView)
    )
)]
pub async fn toggle_recurring(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ToggleRecurringRequest>>,
) -> Result<Json<RecurringMatchView>, AppError> {
    let template =
        schedule_service::toggle_recurring(&state, payload.moderator_id, id, payload.enabled)
            .await?;
    Ok(Json(RecurringMatchView::from(&template)))
}

/// Delete a recurring template; matches it generated stay.
#[utoipa::path(
    delete,
    path = "/recurring/{id}",
    tag = "schedule",
    params(("id" = String, Path, description = "Identifier of the template")),
    request_body = ModeratorRequest,
    responses(
        (status = 200, description = "Template deleted", body = RecurringMatchView),
        (status = 404, description = "Unknown template")
    )
)]
pub async fn delete_recurring(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ModeratorRequest>>,
) -> Result<Json<RecurringMatchView>, AppError> {
    let template = schedule_service::delete_recurring(&state, payload.moderator_id, id).await?;
    Ok(Json(RecurringMatchView::from(&template)))
}

/// Run one scheduling pass immediately instead of waiting for the supervisor.
#[utoipa::path(
    post,
    path = "/schedule/run",
    tag = "schedule",
    request_body = ModeratorRequest,
    responses(
        (status = 200, description = "Pass executed", body = SchedulePassReport)
    )
)]
pub async fn run_pass(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ModeratorRequest>>,
) -> Result<Json<SchedulePassReport>, AppError> {
    state
        .capabilities()
        .require(payload.moderator_id, Permission::ManageSchedule)
        .map_err(AppError::from)?;
    let report = schedule_service::run_pass(&state).await?;
    Ok(Json(report))
}
