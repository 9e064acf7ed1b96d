//! Runtime aggregates for a match: roster, game, race results, placements.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::lifecycle::{MatchLifecycle, MatchStatus};

/// Event category a season (and its matches) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Grand Prix ladder.
    Gp,
    /// Classic three-race ladder.
    Classic,
    /// Team variant of the classic ladder.
    TeamClassic,
    /// Team variant of the Grand Prix ladder.
    TeamGp,
    /// Bracketed tournament events.
    Tournament,
}

/// In-game mode a single game is played in; drives the race count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InGameMode {
    /// Three-race classic series.
    Classic,
    /// Five-race grand prix series.
    GrandPrix,
    /// Short three-race prix.
    MiniPrix,
}

impl InGameMode {
    /// Number of races a game in this mode runs.
    pub fn race_count(self) -> u8 {
        match self {
            InGameMode::Classic | InGameMode::MiniPrix => 3,
            InGameMode::GrandPrix => 5,
        }
    }
}

/// League tier the game lobby is created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeagueType {
    /// Entry league.
    Knight,
    /// Middle league.
    Queen,
    /// Upper league.
    King,
    /// Invitational league.
    Ace,
}

/// Verification status of a participant's submitted results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// No results submitted yet; blocks auto-completion.
    Unsubmitted,
    /// Submitted, awaiting verification.
    Pending,
    /// Verified by a moderator or screenshot check.
    Verified,
    /// Rejected by a moderator.
    Rejected,
    /// Contested by another participant.
    Disputed,
    /// Struck from scoring by a moderator.
    Invalidated,
}

/// Soft-delete tag for roster rows; withdrawn rows are kept for replay audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantState {
    /// Counted toward capacity and readiness.
    Active,
    /// Left before the match started; row preserved.
    Withdrawn,
}

/// Roster row for one user in one match.
#[derive(Debug, Clone)]
pub struct MatchParticipant {
    /// User holding the slot.
    pub user_id: Uuid,
    /// When the slot was first claimed.
    pub joined_at: OffsetDateTime,
    /// Active or withdrawn; never hard-deleted while the match lives.
    pub state: ParticipantState,
}

impl MatchParticipant {
    /// Whether this row counts toward capacity and readiness.
    pub fn is_active(&self) -> bool {
        self.state == ParticipantState::Active
    }
}

/// One position claim for one race, as submitted or corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceResult {
    /// Race index, 1-based.
    pub race_number: u8,
    /// Claimed finishing position; `None` while unknown.
    pub position: Option<u8>,
    /// Crashed out / did not finish this race.
    pub is_eliminated: bool,
    /// Points derived from the configured table; zero when eliminated.
    pub points: i32,
}

/// Per-game record for one user: machine choice, results, verification status.
#[derive(Debug, Clone)]
pub struct GameParticipant {
    /// User racing in this game.
    pub user_id: Uuid,
    /// Declared machine, if any.
    pub machine: Option<String>,
    /// Whether the steering assist was enabled.
    pub assist_enabled: bool,
    /// Verification status of the submitted results.
    pub status: SubmissionStatus,
    /// One slot per race, pre-seeded at game creation.
    pub results: Vec<RaceResult>,
}

impl GameParticipant {
    /// Seed an unsubmitted participant with empty result slots for every race.
    pub fn new(user_id: Uuid, race_count: u8) -> Self {
        let results = (1..=race_count)
            .map(|race_number| RaceResult {
                race_number,
                position: None,
                is_eliminated: false,
                points: 0,
            })
            .collect();

        Self {
            user_id,
            machine: None,
            assist_enabled: false,
            status: SubmissionStatus::Unsubmitted,
            results,
        }
    }

    /// First race this participant was eliminated in, if any.
    pub fn elimination_race(&self) -> Option<u8> {
        self.results
            .iter()
            .find(|result| result.is_eliminated)
            .map(|result| result.race_number)
    }

    /// Enforce the cascading-DNF invariant: once eliminated at race `k`,
    /// every race at or after `k` is eliminated and scores zero.
    pub fn cascade_elimination(&mut self) {
        let Some(first) = self.elimination_race() else {
            return;
        };

        for result in &mut self.results {
            if result.race_number >= first {
                result.is_eliminated = true;
                result.points = 0;
            }
        }
    }

    /// Total score across races; absent while the participant is eliminated.
    pub fn total_points(&self) -> Option<i32> {
        if self.elimination_race().is_some() {
            return None;
        }
        Some(self.results.iter().map(|result| result.points).sum())
    }
}

/// A single timed race series inside a match.
#[derive(Debug, Clone)]
pub struct Game {
    /// Primary key of the game.
    pub id: Uuid,
    /// Mode the lobby is created in.
    pub mode: InGameMode,
    /// League tier of the lobby.
    pub league: LeagueType,
    /// Current lobby passcode; rotated by the split-vote protocol.
    pub passcode: String,
    /// Incremented on every rotation; votes are keyed to it.
    pub passcode_version: u32,
    /// Users that voted to rotate at the current version.
    pub votes: HashSet<Uuid>,
    /// Ordered track ids, race 1..N.
    pub tracks: Vec<u32>,
    /// When the lobby went live.
    pub started_at: OffsetDateTime,
    /// One record per user, keyed by user id in join order.
    pub participants: IndexMap<Uuid, GameParticipant>,
}

impl Game {
    /// Number of races in this game.
    pub fn race_count(&self) -> u8 {
        self.tracks.len() as u8
    }

    /// Participants that are neither withdrawn nor eliminated, i.e. the
    /// electorate of the split vote.
    pub fn vote_eligible_count(&self) -> usize {
        self.participants
            .values()
            .filter(|participant| participant.elimination_race().is_none())
            .count()
    }

    /// Whether every participant has moved past the unsubmitted status.
    pub fn all_submitted(&self) -> bool {
        self.participants
            .values()
            .all(|participant| participant.status != SubmissionStatus::Unsubmitted)
    }
}

/// The scheduling and roster unit: one scheduled session with one game.
#[derive(Debug, Clone)]
pub struct MatchSession {
    /// Primary key of the match.
    pub id: Uuid,
    /// Season this match scores into.
    pub season_id: Uuid,
    /// Category inherited from the season.
    pub category: EventCategory,
    /// Mode the game will be created in.
    pub mode: InGameMode,
    /// League tier the game will be created in.
    pub league: LeagueType,
    /// Sequential number inside the season; assigned at finalization.
    pub match_number: Option<u32>,
    /// Lifecycle machine gating every mutation.
    pub lifecycle: MatchLifecycle,
    /// Minimum roster size required to start.
    pub min_players: u8,
    /// Maximum roster size.
    pub max_players: u8,
    /// When the match is due to start.
    pub scheduled_start: OffsetDateTime,
    /// When the match actually started.
    pub actual_start: Option<OffsetDateTime>,
    /// Result-submission cutoff once in progress.
    pub deadline: Option<OffsetDateTime>,
    /// Template that generated this match, if any.
    pub recurring_match_id: Option<Uuid>,
    /// Roster rows keyed by user id in join order.
    pub participants: IndexMap<Uuid, MatchParticipant>,
    /// Games played in this match; exactly one is created at start.
    pub games: Vec<Game>,
}

impl MatchSession {
    /// Current lifecycle status.
    pub fn status(&self) -> MatchStatus {
        self.lifecycle.status()
    }

    /// Number of active (non-withdrawn) roster rows.
    pub fn active_count(&self) -> usize {
        self.participants
            .values()
            .filter(|participant| participant.is_active())
            .count()
    }

    /// The game currently accepting submissions, if the match has started.
    pub fn current_game(&self) -> Option<&Game> {
        self.games.last()
    }

    /// Mutable access to the current game.
    pub fn current_game_mut(&mut self) -> Option<&mut Game> {
        self.games.last_mut()
    }
}

/// Outcome of one participant once a game's scores are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantOutcome {
    /// Finished every race; carries the summed score.
    Scored {
        /// Sum of per-race points.
        total: i32,
    },
    /// Crashed out; ranked strictly behind every scored participant.
    Eliminated {
        /// Race the elimination happened in.
        race: u8,
    },
}

/// Final rank of one participant in a completed game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Ranked user.
    pub user_id: Uuid,
    /// 1-based rank; equal outcomes share a rank.
    pub rank: u32,
    /// What the rank was derived from.
    pub outcome: ParticipantOutcome,
}

/// Compute final placements for a game.
///
/// Scored participants are ordered by total descending; eliminated ones come
/// strictly behind all of them, ordered by elimination race descending (a
/// later crash ranks higher). Equal totals and equal elimination races share
/// a rank; user id breaks ordering ties deterministically.
pub fn final_placements(game: &Game) -> Vec<Placement> {
    let mut scored: Vec<(Uuid, i32)> = Vec::new();
    let mut eliminated: Vec<(Uuid, u8)> = Vec::new();

    for participant in game.participants.values() {
        match participant.total_points() {
            Some(total) => scored.push((participant.user_id, total)),
            None => eliminated.push((
                participant.user_id,
                participant.elimination_race().unwrap_or(1),
            )),
        }
    }

    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    eliminated.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut placements = Vec::with_capacity(scored.len() + eliminated.len());

    let mut rank = 0u32;
    let mut previous_total: Option<i32> = None;
    for (index, (user_id, total)) in scored.iter().enumerate() {
        if previous_total != Some(*total) {
            rank = index as u32 + 1;
            previous_total = Some(*total);
        }
        placements.push(Placement {
            user_id: *user_id,
            rank,
            outcome: ParticipantOutcome::Scored { total: *total },
        });
    }

    let base = scored.len() as u32;
    let mut previous_race: Option<u8> = None;
    for (index, (user_id, race)) in eliminated.iter().enumerate() {
        if previous_race != Some(*race) {
            rank = base + index as u32 + 1;
            previous_race = Some(*race);
        }
        placements.push(Placement {
            user_id: *user_id,
            rank,
            outcome: ParticipantOutcome::Eliminated { race: *race },
        });
    }

    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn game_with(participants: Vec<GameParticipant>) -> Game {
        Game {
            id: Uuid::new_v4(),
            mode: InGameMode::Classic,
            league: LeagueType::Knight,
            passcode: "TESTCODE".into(),
            passcode_version: 0,
            votes: HashSet::new(),
            tracks: vec![1, 2, 3],
            started_at: datetime!(2026-03-02 20:00 +9),
            participants: participants
                .into_iter()
                .map(|participant| (participant.user_id, participant))
                .collect(),
        }
    }

    fn participant_with_points(points: [i32; 3]) -> GameParticipant {
        let mut participant = GameParticipant::new(Uuid::new_v4(), 3);
        for (slot, value) in participant.results.iter_mut().zip(points) {
            slot.position = Some(1);
            slot.points = value;
        }
        participant.status = SubmissionStatus::Pending;
        participant
    }

    fn eliminated_at(race: u8) -> GameParticipant {
        let mut participant = participant_with_points([10, 10, 10]);
        participant.results[race as usize - 1].is_eliminated = true;
        participant.cascade_elimination();
        participant
    }

    #[test]
    fn cascade_marks_all_later_races() {
        let participant = eliminated_at(2);
        assert!(!participant.results[0].is_eliminated);
        assert!(participant.results[1].is_eliminated);
        assert!(participant.results[2].is_eliminated);
        assert_eq!(participant.results[1].points, 0);
        assert_eq!(participant.elimination_race(), Some(2));
        assert_eq!(participant.total_points(), None);
    }

    #[test]
    fn scored_participants_rank_by_total() {
        let a = participant_with_points([10, 10, 10]);
        let b = participant_with_points([15, 15, 15]);
        let game = game_with(vec![a.clone(), b.clone()]);

        let placements = final_placements(&game);
        assert_eq!(placements[0].user_id, b.user_id);
        assert_eq!(placements[0].rank, 1);
        assert_eq!(placements[1].user_id, a.user_id);
        assert_eq!(placements[1].rank, 2);
    }

    #[test]
    fn equal_totals_share_a_rank() {
        let a = participant_with_points([10, 10, 10]);
        let b = participant_with_points([10, 10, 10]);
        let c = participant_with_points([5, 5, 5]);
        let game = game_with(vec![a, b, c.clone()]);

        let placements = final_placements(&game);
        assert_eq!(placements[0].rank, 1);
        assert_eq!(placements[1].rank, 1);
        assert_eq!(placements[2].rank, 3);
        assert_eq!(placements[2].user_id, c.user_id);
    }

    #[test]
    fn eliminated_rank_behind_survivors_later_crash_first() {
        let survivor = participant_with_points([1, 1, 1]);
        let early_crash = eliminated_at(1);
        let late_crash = eliminated_at(3);
        let game = game_with(vec![early_crash.clone(), survivor.clone(), late_crash.clone()]);

        let placements = final_placements(&game);
        assert_eq!(placements[0].user_id, survivor.user_id);
        assert_eq!(placements[1].user_id, late_crash.user_id);
        assert_eq!(placements[1].rank, 2);
        assert_eq!(placements[2].user_id, early_crash.user_id);
        assert_eq!(placements[2].rank, 3);
        assert_eq!(
            placements[2].outcome,
            ParticipantOutcome::Eliminated { race: 1 }
        );
    }

    #[test]
    fn all_submitted_requires_every_participant() {
        let mut unsubmitted = GameParticipant::new(Uuid::new_v4(), 3);
        let submitted = participant_with_points([1, 1, 1]);
        let game = game_with(vec![submitted.clone(), unsubmitted.clone()]);
        assert!(!game.all_submitted());

        unsubmitted.status = SubmissionStatus::Invalidated;
        let game = game_with(vec![submitted, unsubmitted]);
        assert!(game.all_submitted());
    }
}
