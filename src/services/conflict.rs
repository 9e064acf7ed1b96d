//! Position conflict detection for one race of a game.
//!
//! Rank ties form a run: when `s` participants tie at position `r`, the
//! positions `r+1 .. r+s-1` cannot exist, so any submission claiming one of
//! them contradicts the tie. The detector is pure and retains no state; it is
//! re-run for every race whenever a submission or correction lands.

use std::collections::BTreeMap;

use uuid::Uuid;

/// One participant's claim for a single race, as seen by the detector.
#[derive(Debug, Clone, Copy)]
pub struct RaceEntry {
    /// Claiming user.
    pub user_id: Uuid,
    /// Claimed finishing position; `None` never participates in grouping.
    pub position: Option<u8>,
    /// Eliminated entries never participate in grouping either.
    pub eliminated: bool,
}

/// A claimed position and who claims it; used in conflict reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedPosition {
    /// Claiming user.
    pub user_id: Uuid,
    /// The position they claim.
    pub position: u8,
}

/// One logically impossible position claim and the tie that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionConflict {
    /// The race the conflict was found in.
    pub race_number: u8,
    /// The position that cannot exist.
    pub invalid_position: u8,
    /// Users claiming the invalid position.
    pub claimants: Vec<Uuid>,
    /// The tied position that invalidates it.
    pub causing_position: u8,
    /// Size of the tie group at the causing position.
    pub causing_count: usize,
    /// Users forming the tie group.
    pub causing_users: Vec<Uuid>,
    /// Everyone involved (claimants and tie group) with their claimed ranks.
    pub involved: Vec<ClaimedPosition>,
}

/// Detect impossible position claims among the submitted entries of one race.
///
/// `field_size` bounds the positions that can exist at all; invalid ranks
/// beyond it are discarded. A single claimant at an untied rank never
/// produces a conflict.
pub fn detect_conflicts(
    race_number: u8,
    entries: &[RaceEntry],
    field_size: usize,
) -> Vec<PositionConflict> {
    // Group claimed positions; unknown and eliminated entries stay out.
    let mut groups: BTreeMap<u8, Vec<Uuid>> = BTreeMap::new();
    for entry in entries {
        if entry.eliminated {
            continue;
        }
        let Some(position) = entry.position else {
            continue;
        };
        groups.entry(position).or_default().push(entry.user_id);
    }

    // Every tie of size s at rank r shadows ranks r+1..r+s-1.
    let mut shadowed: BTreeMap<u8, (u8, usize, Vec<Uuid>)> = BTreeMap::new();
    for (&position, users) in &groups {
        let size = users.len();
        if size < 2 {
            continue;
        }
        for offset in 1..size {
            let invalid = position as usize + offset;
            if invalid > field_size {
                break;
            }
            shadowed
                .entry(invalid as u8)
                .or_insert_with(|| (position, size, users.clone()));
        }
    }

    let mut conflicts = Vec::new();
    for (&invalid_position, (causing_position, causing_count, causing_users)) in &shadowed {
        let Some(claimants) = groups.get(&invalid_position) else {
            continue;
        };

        let mut involved: Vec<ClaimedPosition> = causing_users
            .iter()
            .map(|&user_id| ClaimedPosition {
                user_id,
                position: *causing_position,
            })
            .chain(claimants.iter().map(|&user_id| ClaimedPosition {
                user_id,
                position: invalid_position,
            }))
            .collect();
        involved.sort_by_key(|claim| (claim.position, claim.user_id));

        conflicts.push(PositionConflict {
            race_number,
            invalid_position,
            claimants: claimants.clone(),
            causing_position: *causing_position,
            causing_count: *causing_count,
            causing_users: causing_users.clone(),
            involved,
        });
    }

    conflicts
}
