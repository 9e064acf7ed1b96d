//! Outbound read models returned by the HTTP surface.
//!
//! Views are built from runtime sessions and stored entities; they carry
//! RFC 3339 strings for timestamps and never expose the internal rating.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{RecurringMatchEntity, RecurringRuleEntity, SeasonEntity, UserSeasonStatsEntity},
    dto::format_timestamp,
    services::conflict::PositionConflict,
    state::{
        lifecycle::MatchStatus,
        session::{
            EventCategory, Game, GameParticipant, InGameMode, LeagueType, MatchParticipant,
            MatchSession, ParticipantState, RaceResult, SubmissionStatus,
        },
    },
};

/// One roster row of a match.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterEntryView {
    /// User holding the slot.
    pub user_id: Uuid,
    /// When the slot was first claimed.
    pub joined_at: String,
    /// Active or withdrawn.
    pub state: ParticipantState,
}

impl From<&MatchParticipant> for RosterEntryView {
    fn from(participant: &MatchParticipant) -> Self {
        Self {
            user_id: participant.user_id,
            joined_at: format_timestamp(participant.joined_at),
            state: participant.state,
        }
    }
}

/// One claimed race result inside a game view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RaceResultView {
    /// Race index, 1-based.
    pub race_number: u8,
    /// Claimed finishing position, if known.
    pub position: Option<u8>,
    /// Crashed out in this race.
    pub eliminated: bool,
    /// Points scored in this race.
    pub points: i32,
}

impl From<&RaceResult> for RaceResultView {
    fn from(result: &RaceResult) -> Self {
        Self {
            race_number: result.race_number,
            position: result.position,
            eliminated: result.is_eliminated,
            points: result.points,
        }
    }
}

/// One participant of a game, with their results so far.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameParticipantView {
    /// User racing in this game.
    pub user_id: Uuid,
    /// Declared machine, if any.
    pub machine: Option<String>,
    /// Whether the steering assist was enabled.
    pub assist_enabled: bool,
    /// Verification status of the submission.
    pub status: SubmissionStatus,
    /// Per-race results.
    pub results: Vec<RaceResultView>,
    /// Summed score; absent while eliminated.
    pub total_points: Option<i32>,
}

impl From<&GameParticipant> for GameParticipantView {
    fn from(participant: &GameParticipant) -> Self {
        Self {
            user_id: participant.user_id,
            machine: participant.machine.clone(),
            assist_enabled: participant.assist_enabled,
            status: participant.status,
            results: participant.results.iter().map(RaceResultView::from).collect(),
            total_points: participant.total_points(),
        }
    }
}

/// The live game of a match.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameView {
    /// Primary key of the game.
    pub id: Uuid,
    /// Mode the lobby runs in.
    pub mode: InGameMode,
    /// League tier of the lobby.
    pub league: LeagueType,
    /// Current lobby passcode.
    pub passcode: String,
    /// Rotation counter; votes are keyed to it.
    pub passcode_version: u32,
    /// Split votes cast at the current version.
    pub votes_cast: usize,
    /// Ordered track ids, race 1..N.
    pub tracks: Vec<u32>,
    /// When the lobby went live.
    pub started_at: String,
    /// Participants in join order.
    pub participants: Vec<GameParticipantView>,
}

impl From<&Game> for GameView {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id,
            mode: game.mode,
            league: game.league,
            passcode: game.passcode.clone(),
            passcode_version: game.passcode_version,
            votes_cast: game.votes.len(),
            tracks: game.tracks.clone(),
            started_at: format_timestamp(game.started_at),
            participants: game
                .participants
                .values()
                .map(GameParticipantView::from)
                .collect(),
        }
    }
}

/// Full state of one match: lifecycle, roster, current game.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchSummary {
    /// Primary key of the match.
    pub id: Uuid,
    /// Season the match scores into.
    pub season_id: Uuid,
    /// Category inherited from the season.
    pub category: EventCategory,
    /// Mode the game runs in.
    pub mode: InGameMode,
    /// League tier of the game.
    pub league: LeagueType,
    /// Current lifecycle status.
    pub status: MatchStatus,
    /// Sequential number inside the season, once finalized.
    pub match_number: Option<u32>,
    /// Minimum roster size required to start.
    pub min_players: u8,
    /// Maximum roster size.
    pub max_players: u8,
    /// When the match is due to start.
    pub scheduled_start: String,
    /// When the match actually started, if it has.
    pub actual_start: Option<String>,
    /// Result-submission cutoff, once in progress.
    pub deadline: Option<String>,
    /// Template that generated this match, if any.
    pub recurring_match_id: Option<Uuid>,
    /// Roster rows in join order, withdrawn included.
    pub roster: Vec<RosterEntryView>,
    /// The current game, once the match has started.
    pub game: Option<GameView>,
}

impl From<&MatchSession> for MatchSummary {
    fn from(session: &MatchSession) -> Self {
        Self {
            id: session.id,
            season_id: session.season_id,
            category: session.category,
            mode: session.mode,
            league: session.league,
            status: session.status(),
            match_number: session.match_number,
            min_players: session.min_players,
            max_players: session.max_players,
            scheduled_start: format_timestamp(session.scheduled_start),
            actual_start: session.actual_start.map(format_timestamp),
            deadline: session.deadline.map(format_timestamp),
            recurring_match_id: session.recurring_match_id,
            roster: session
                .participants
                .values()
                .map(RosterEntryView::from)
                .collect(),
            game: session.current_game().map(GameView::from),
        }
    }
}

/// One user and the position they claim, inside a conflict report.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClaimView {
    /// Claiming user.
    pub user_id: Uuid,
    /// Position they claim.
    pub position: u8,
}

/// One impossible position claim detected in a race.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConflictView {
    /// Race the conflict was found in.
    pub race_number: u8,
    /// The position that cannot exist given the tie.
    pub invalid_position: u8,
    /// Users claiming the invalid position.
    pub claimants: Vec<Uuid>,
    /// The tied position that invalidates it.
    pub causing_position: u8,
    /// Size of the tie group.
    pub causing_count: usize,
    /// Everyone involved with their claimed ranks.
    pub involved: Vec<ClaimView>,
}

impl From<&PositionConflict> for ConflictView {
    fn from(conflict: &PositionConflict) -> Self {
        Self {
            race_number: conflict.race_number,
            invalid_position: conflict.invalid_position,
            claimants: conflict.claimants.clone(),
            causing_position: conflict.causing_position,
            causing_count: conflict.causing_count,
            involved: conflict
                .involved
                .iter()
                .map(|claim| ClaimView {
                    user_id: claim.user_id,
                    position: claim.position,
                })
                .collect(),
        }
    }
}

/// Result of one submission or correction.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmissionOutcome {
    /// Conflicts the new data introduced or left standing.
    pub conflicts: Vec<ConflictView>,
    /// Whether this submission completed the match.
    pub auto_completed: bool,
    /// Updated match state.
    pub current: MatchSummary,
}

/// Result of one split vote.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VoteOutcome {
    /// Votes cast at the current passcode version.
    pub votes: usize,
    /// Votes required to rotate.
    pub required: usize,
    /// Whether this vote crossed the threshold and rotated the passcode.
    pub rotated: bool,
    /// Passcode version after the vote.
    pub passcode_version: u32,
}

/// Season row as exposed over the wire.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeasonView {
    /// Primary key of the season.
    pub id: Uuid,
    /// Category the season belongs to.
    pub category: EventCategory,
    /// Sequential number within the category.
    pub season_number: u32,
    /// Whether this is the category's active season.
    pub is_active: bool,
    /// When the season was created.
    pub started_at: String,
    /// When the season ended, if closed.
    pub ends_at: Option<String>,
}

impl From<&SeasonEntity> for SeasonView {
    fn from(season: &SeasonEntity) -> Self {
        Self {
            id: season.id,
            category: season.category,
            season_number: season.season_number,
            is_active: season.is_active,
            started_at: format_timestamp(season.started_at),
            ends_at: season.ends_at.map(format_timestamp),
        }
    }
}

/// One weekday/time rule of a recurring template.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecurringRuleView {
    /// Primary key of the rule.
    pub id: Uuid,
    /// Weekday numbers, 1 = Monday .. 7 = Sunday.
    pub weekdays: Vec<u8>,
    /// Local hour in the reference timezone.
    pub hour: u8,
    /// Local minute of the hour.
    pub minute: u8,
    /// Last occurrence a match was generated for.
    pub last_scheduled_at: Option<String>,
}

impl From<&RecurringRuleEntity> for RecurringRuleView {
    fn from(rule: &RecurringRuleEntity) -> Self {
        Self {
            id: rule.id,
            weekdays: rule.weekdays.clone(),
            hour: rule.hour,
            minute: rule.minute,
            last_scheduled_at: rule.last_scheduled_at.map(format_timestamp),
        }
    }
}

/// Recurring match template as exposed over the wire.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecurringMatchView {
    /// Primary key of the template.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Category generated matches score into.
    pub category: EventCategory,
    /// Mode generated games run in.
    pub mode: InGameMode,
    /// League tier generated games run in.
    pub league: LeagueType,
    /// Minimum roster size of generated matches.
    pub min_players: u8,
    /// Maximum roster size of generated matches.
    pub max_players: u8,
    /// Disabled templates are skipped by the scheduling pass.
    pub enabled: bool,
    /// Weekday/time rules.
    pub rules: Vec<RecurringRuleView>,
}

impl From<&RecurringMatchEntity> for RecurringMatchView {
    fn from(template: &RecurringMatchEntity) -> Self {
        Self {
            id: template.id,
            name: template.name.clone(),
            category: template.category,
            mode: template.mode,
            league: template.league,
            min_players: template.min_players,
            max_players: template.max_players,
            enabled: template.enabled,
            rules: template.rules.iter().map(RecurringRuleView::from).collect(),
        }
    }
}

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchedulePassReport {
    /// Matches created by this pass.
    pub created: Vec<Uuid>,
    /// Rules skipped because their occurrence was already generated.
    pub skipped: usize,
}

/// Outcome of a bulk rating recalculation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecalculationReport {
    /// Season that was replayed.
    pub season_id: Uuid,
    /// First match number of the replayed range.
    pub from_match_number: u32,
    /// Matches replayed.
    pub matches_replayed: u32,
    /// Distinct users whose aggregates were rebuilt.
    pub users_updated: u32,
}

/// One row of a season's standings; the internal rating never leaves the
/// backend.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StandingsEntry {
    /// Ranked user.
    pub user_id: Uuid,
    /// Shown rating, floor-clamped.
    pub display_rating: i32,
    /// Highest display rating reached this season.
    pub season_high_rating: i32,
    /// Finalized matches played.
    pub total_matches: u32,
    /// First-place finishes.
    pub first_places: u32,
    /// Second-place finishes.
    pub second_places: u32,
    /// Third-place finishes.
    pub third_places: u32,
    /// Matches survived without elimination.
    pub survived_count: u32,
    /// Matches played with the steering assist enabled.
    pub assist_used_count: u32,
}

impl From<&UserSeasonStatsEntity> for StandingsEntry {
    fn from(stats: &UserSeasonStatsEntity) -> Self {
        Self {
            user_id: stats.user_id,
            display_rating: stats.display_rating,
            season_high_rating: stats.season_high_rating,
            total_matches: stats.total_matches,
            first_places: stats.first_places,
            second_places: stats.second_places,
            third_places: stats.third_places,
            survived_count: stats.survived_count,
            assist_used_count: stats.assist_used_count,
        }
    }
}
