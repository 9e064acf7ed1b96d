use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Gridline Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::match_stream,
        crate::routes::matches::list_matches,
        crate::routes::matches::create_match,
        crate::routes::matches::get_match,
        crate::routes::matches::join_match,
        crate::routes::matches::leave_match,
        crate::routes::matches::submit_result,
        crate::routes::matches::edit_result,
        crate::routes::matches::review_result,
        crate::routes::matches::cast_vote,
        crate::routes::matches::end_match,
        crate::routes::matches::cancel_match,
        crate::routes::matches::finalize_match,
        crate::routes::seasons::list_seasons,
        crate::routes::seasons::create_season,
        crate::routes::seasons::activate_season,
        crate::routes::seasons::close_season,
        crate::routes::seasons::delete_season,
        crate::routes::schedule::list_recurring,
        crate::routes::schedule::create_recurring,
        crate::routes::schedule::toggle_recurring,
        crate::routes::schedule::delete_recurring,
        crate::routes::schedule::run_pass,
        crate::routes::ratings::recalculate,
        crate::routes::ratings::standings,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::commands::CreateSeasonRequest,
            crate::dto::commands::ModeratorRequest,
            crate::dto::commands::RuleInput,
            crate::dto::commands::CreateRecurringRequest,
            crate::dto::commands::ToggleRecurringRequest,
            crate::dto::commands::CreateMatchRequest,
            crate::dto::commands::JoinRequest,
            crate::dto::commands::LeaveRequest,
            crate::dto::commands::VoteRequest,
            crate::dto::commands::RaceEntryInput,
            crate::dto::commands::SubmitResultRequest,
            crate::dto::commands::EditResultRequest,
            crate::dto::commands::ReviewResultRequest,
            crate::dto::commands::RecalculateRequest,
            crate::dto::views::MatchSummary,
            crate::dto::views::RosterEntryView,
            crate::dto::views::GameView,
            crate::dto::views::GameParticipantView,
            crate::dto::views::RaceResultView,
            crate::dto::views::ConflictView,
            crate::dto::views::ClaimView,
            crate::dto::views::SubmissionOutcome,
            crate::dto::views::VoteOutcome,
            crate::dto::views::SeasonView,
            crate::dto::views::RecurringMatchView,
            crate::dto::views::RecurringRuleView,
            crate::dto::views::SchedulePassReport,
            crate::dto::views::RecalculationReport,
            crate::dto::views::StandingsEntry,
            crate::state::lifecycle::MatchStatus,
            crate::state::session::EventCategory,
            crate::state::session::InGameMode,
            crate::state::session::LeagueType,
            crate::state::session::SubmissionStatus,
            crate::state::session::ParticipantState,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent event streams"),
        (name = "match", description = "Match lifecycle, roster, results and votes"),
        (name = "season", description = "Season management"),
        (name = "schedule", description = "Recurring match templates"),
        (name = "rating", description = "Standings and rating recalculation"),
    )
)]
pub struct ApiDoc;
