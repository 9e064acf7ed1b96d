//! Service layer: domain operations invoked by the HTTP routes and the
//! background supervisor.

/// Position conflict detection over submitted race results.
pub mod conflict;
/// OpenAPI document assembly.
pub mod documentation;
/// Broadcast helpers for per-match server events.
pub mod events;
/// Liveness probe.
pub mod health_service;
/// Match lifecycle: creation, start, submissions, finalization.
pub mod match_service;
/// Rating engine: incremental application and bulk replay.
pub mod rating_service;
/// Roster joins and withdrawals.
pub mod roster_service;
/// Recurring templates and the scheduling pass.
pub mod schedule_service;
/// Season creation, activation and closing.
pub mod season_service;
/// SSE stream adaptation of match channels.
pub mod sse_service;
/// Split-vote passcode rotation.
pub mod vote_service;
