//! Entities persisted by the storage layer.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::session::{EventCategory, InGameMode, LeagueType};

/// Season row; at most one per category is active at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonEntity {
    /// Primary key of the season.
    pub id: Uuid,
    /// Event category the season belongs to.
    pub category: EventCategory,
    /// Sequential number, unique per category.
    pub season_number: u32,
    /// Whether this is the category's active season.
    pub is_active: bool,
    /// When the season was created.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// Optional end date; the season is open-ended while absent.
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
}

/// One weekday/time rule of a recurring match template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurringRuleEntity {
    /// Primary key of the rule.
    pub id: Uuid,
    /// Weekday numbers, 1 = Monday .. 7 = Sunday.
    pub weekdays: Vec<u8>,
    /// Local hour of day in the reference timezone.
    pub hour: u8,
    /// Local minute of the hour.
    pub minute: u8,
    /// Last occurrence a match was generated for; the idempotency marker.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_scheduled_at: Option<OffsetDateTime>,
}

/// Named, enable-able template that generates matches on a weekly cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurringMatchEntity {
    /// Primary key of the template.
    pub id: Uuid,
    /// Display name of the template.
    pub name: String,
    /// Category generated matches score into.
    pub category: EventCategory,
    /// Mode generated games are created in.
    pub mode: InGameMode,
    /// League tier generated games are created in.
    pub league: LeagueType,
    /// Minimum roster size of generated matches.
    pub min_players: u8,
    /// Maximum roster size of generated matches.
    pub max_players: u8,
    /// Disabled templates are skipped by the scheduling pass.
    pub enabled: bool,
    /// Creation instant; anchors rules that never fired yet.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Weekday/time rules owned by this template.
    pub rules: Vec<RecurringRuleEntity>,
}

/// Per-user, per-season rating aggregate.
///
/// Mutated only by the rating engine so there is a single writer per row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSeasonStatsEntity {
    /// User the aggregate belongs to.
    pub user_id: Uuid,
    /// Season the aggregate belongs to.
    pub season_id: Uuid,
    /// Hidden rating used for computation.
    pub internal_rating: i32,
    /// Shown rating, clamped to the configured floor.
    pub display_rating: i32,
    /// Matches counted toward rating stabilization.
    pub convergence_points: u32,
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

impl UserSeasonStatsEntity {
    /// Fresh aggregate at the configured initial rating.
    pub fn new(user_id: Uuid, season_id: Uuid, initial_rating: i32) -> Self {
        Self {
            user_id,
            season_id,
            internal_rating: initial_rating,
            display_rating: initial_rating,
            convergence_points: 0,
            season_high_rating: initial_rating,
            total_matches: 0,
            first_places: 0,
            second_places: 0,
            third_places: 0,
            survived_count: 0,
            assist_used_count: 0,
        }
    }
}

/// Frozen outcome of one participant in a finalized match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchOutcomeEntity {
    /// Participant the outcome belongs to.
    pub user_id: Uuid,
    /// Final rank, 1-based; eliminated participants rank behind survivors.
    pub final_rank: u32,
    /// Summed race points; absent when eliminated.
    pub total_points: Option<i32>,
    /// Race the participant was eliminated in, if any.
    pub eliminated_race: Option<u8>,
    /// Whether the steering assist was enabled.
    pub assist_used: bool,
}

/// Archived record of a finalized match; the unit the rating replay consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRecordEntity {
    /// Match the record was frozen from.
    pub match_id: Uuid,
    /// Season the match scored into.
    pub season_id: Uuid,
    /// Category of the match.
    pub category: EventCategory,
    /// Sequential number inside the season, assigned at archival.
    pub match_number: u32,
    /// Number of participants that entered the game.
    pub field_size: u32,
    /// When the match was finalized.
    #[serde(with = "time::serde::rfc3339")]
    pub finalized_at: OffsetDateTime,
    /// One outcome per participant, in placement order.
    pub outcomes: Vec<MatchOutcomeEntity>,
}
