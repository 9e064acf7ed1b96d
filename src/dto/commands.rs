//! Inbound command payloads.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{validate_position, validate_time_of_day, validate_weekdays},
    state::session::{EventCategory, InGameMode, LeagueType, SubmissionStatus},
};

/// Create a season in a category; numbering is assigned by the backend.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSeasonRequest {
    /// Issuing moderator; must hold the manage-seasons capability.
    pub moderator_id: Uuid,
    /// Category the season belongs to.
    pub category: EventCategory,
}

/// Bare moderator command carrying only the issuer.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ModeratorRequest {
    /// Issuing moderator.
    pub moderator_id: Uuid,
}

/// One weekday/time rule supplied when creating a recurring template.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RuleInput {
    /// Weekday numbers, 1 = Monday .. 7 = Sunday.
    pub weekdays: Vec<u8>,
    /// Local hour of day in the reference timezone.
    pub hour: u8,
    /// Local minute of the hour.
    pub minute: u8,
}

impl Validate for RuleInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = validate_weekdays(&self.weekdays) {
            errors.add("weekdays", err);
        }
        if let Err(err) = validate_time_of_day(self.hour, self.minute) {
            errors.add("hour", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Create a recurring match template with its rules.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRecurringRequest {
    /// Issuing moderator; must hold the manage-schedule capability.
    pub moderator_id: Uuid,
    /// Display name of the template.
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    /// Category generated matches score into.
    pub category: EventCategory,
    /// Mode generated games are created in.
    pub mode: InGameMode,
    /// League tier generated games are created in.
    pub league: LeagueType,
    /// Minimum roster size of generated matches.
    #[validate(range(min = 1, max = 99))]
    pub min_players: u8,
    /// Maximum roster size of generated matches.
    #[validate(range(min = 1, max = 99))]
    pub max_players: u8,
    /// Weekday/time rules; at least one.
    #[validate(length(min = 1), nested)]
    pub rules: Vec<RuleInput>,
}

/// Enable or disable a recurring template.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ToggleRecurringRequest {
    /// Issuing moderator.
    pub moderator_id: Uuid,
    /// New enabled flag.
    pub enabled: bool,
}

/// Create a one-off match outside the recurring schedule.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateMatchRequest {
    /// Issuing moderator; must hold the manage-schedule capability.
    pub moderator_id: Uuid,
    /// Category; an active season must exist for it.
    pub category: EventCategory,
    /// Mode of the game.
    pub mode: InGameMode,
    /// League tier of the game.
    pub league: LeagueType,
    /// Minimum roster size.
    #[validate(range(min = 1, max = 99))]
    pub min_players: u8,
    /// Maximum roster size.
    #[validate(range(min = 1, max = 99))]
    pub max_players: u8,
    /// When the match is due to start.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub scheduled_start: OffsetDateTime,
}

/// Claim a roster slot.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRequest {
    /// Joining user.
    pub user_id: Uuid,
}

/// Withdraw from the roster; the row is kept, not deleted.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LeaveRequest {
    /// Withdrawing user.
    pub user_id: Uuid,
}

/// Cast a split vote toward rotating the current passcode.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct VoteRequest {
    /// Voting user.
    pub user_id: Uuid,
}

/// One claimed race result inside a submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RaceEntryInput {
    /// Race index, 1-based.
    pub race_number: u8,
    /// Claimed finishing position; omit while unknown.
    #[serde(default)]
    pub position: Option<u8>,
    /// Crashed out in this race.
    #[serde(default)]
    pub eliminated: bool,
}

impl Validate for RaceEntryInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !(1..=5).contains(&self.race_number) {
            let mut err = validator::ValidationError::new("race_number_range");
            err.message =
                Some(format!("race number {} is out of range (1..=5)", self.race_number).into());
            errors.add("race_number", err);
        }
        if let Some(position) = self.position {
            if let Err(err) = validate_position(position) {
                errors.add("position", err);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Submit or update one's own race results for the current game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitResultRequest {
    /// Submitting user.
    pub user_id: Uuid,
    /// Declared machine, if any.
    #[serde(default)]
    #[validate(length(max = 40))]
    pub machine: Option<String>,
    /// Whether the steering assist was enabled.
    #[serde(default)]
    pub assist_enabled: bool,
    /// Claimed results, one entry per race.
    #[validate(length(min = 1, max = 5), nested)]
    pub races: Vec<RaceEntryInput>,
}

/// Moderator verdict on a participant's submitted sheet.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ReviewResultRequest {
    /// Issuing moderator; must hold the moderate-matches capability.
    pub moderator_id: Uuid,
    /// New verification status; only verified, rejected or invalidated are
    /// accepted.
    pub status: SubmissionStatus,
}

/// Moderator correction of another participant's results.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct EditResultRequest {
    /// Issuing moderator; must hold the moderate-matches capability.
    pub moderator_id: Uuid,
    /// Corrected results, one entry per race.
    #[validate(length(min = 1, max = 5), nested)]
    pub races: Vec<RaceEntryInput>,
}

/// Trigger a bulk rating recalculation for part of a season.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RecalculateRequest {
    /// Issuing moderator; must hold the recalculate-ratings capability.
    pub moderator_id: Uuid,
    /// Category of the season to replay.
    pub category: EventCategory,
    /// Sequential season number within the category.
    #[validate(range(min = 1))]
    pub season_number: u32,
    /// First match number to recalculate from.
    #[validate(range(min = 1))]
    pub from_match_number: u32,
}
