//! Application-level configuration: scoring tables, vote threshold, rating
//! constants, scheduling reference offset, and seeded moderator capabilities.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use time::UtcOffset;
use tracing::{info, warn};
use uuid::Uuid;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GRIDLINE_BACK_CONFIG_PATH";

/// Per-race points awarded by finishing position (index 0 = 1st place).
const DEFAULT_RACE_POINTS: [i32; 10] = [15, 12, 10, 8, 6, 4, 3, 2, 1, 0];

/// Rating-engine constants; all integer so replay stays bit-identical.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingConfig {
    /// Rating every user starts a season with.
    pub initial_rating: i32,
    /// K factor applied before any convergence.
    pub k_max: i32,
    /// K factor once convergence is fully accumulated.
    pub k_min: i32,
    /// Matches needed to taper from `k_max` to `k_min`.
    pub convergence_cap: u32,
    /// Flat bonus on the performance score for surviving every race.
    pub survival_bonus: i32,
    /// Displayed ratings never drop below this.
    pub rating_floor: i32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_rating: 1000,
            k_max: 64,
            k_min: 16,
            convergence_cap: 20,
            survival_bonus: 50,
            rating_floor: 0,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    race_points: Vec<i32>,
    vote_threshold_numerator: u32,
    vote_threshold_denominator: u32,
    rating: RatingConfig,
    reference_offset_hours: i8,
    submission_window_minutes: i64,
    track_pool_size: u32,
    channel_capacity: usize,
    supervisor_interval_secs: u64,
    moderators: Vec<Uuid>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded league configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Points awarded for finishing `position` (1-based) in one race.
    pub fn race_points(&self, position: u8) -> i32 {
        if position == 0 {
            return 0;
        }
        self.race_points
            .get(position as usize - 1)
            .copied()
            .unwrap_or(0)
    }

    /// Votes required to rotate a passcode for `active` eligible voters.
    ///
    /// The threshold is a configured fraction; the default 1/2 yields a
    /// strict majority (`floor(active / 2) + 1`).
    pub fn required_votes(&self, active: usize) -> usize {
        if active == 0 {
            return 1;
        }
        active * self.vote_threshold_numerator as usize
            / self.vote_threshold_denominator as usize
            + 1
    }

    /// Rating constants.
    pub fn rating(&self) -> &RatingConfig {
        &self.rating
    }

    /// Reference timezone all recurring rules are interpreted in.
    pub fn reference_offset(&self) -> UtcOffset {
        UtcOffset::from_hms(self.reference_offset_hours, 0, 0)
            .unwrap_or(UtcOffset::UTC)
    }

    /// How long after the actual start results may still be submitted.
    pub fn submission_window(&self) -> time::Duration {
        time::Duration::minutes(self.submission_window_minutes)
    }

    /// Number of distinct track ids games draw from.
    pub fn track_pool_size(&self) -> u32 {
        self.track_pool_size
    }

    /// Broadcast channel capacity for per-match event hubs.
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Interval between supervisor passes (schedule, readiness, deadline).
    pub fn supervisor_interval_secs(&self) -> u64 {
        self.supervisor_interval_secs
    }

    /// Users seeded with the full moderator capability set.
    pub fn moderators(&self) -> &[Uuid] {
        &self.moderators
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            race_points: DEFAULT_RACE_POINTS.to_vec(),
            vote_threshold_numerator: 1,
            vote_threshold_denominator: 2,
            rating: RatingConfig::default(),
            reference_offset_hours: 9,
            submission_window_minutes: 45,
            track_pool_size: 26,
            channel_capacity: 32,
            supervisor_interval_secs: 15,
            moderators: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    race_points: Option<Vec<i32>>,
    vote_threshold_numerator: Option<u32>,
    vote_threshold_denominator: Option<u32>,
    rating: Option<RatingConfig>,
    reference_offset_hours: Option<i8>,
    submission_window_minutes: Option<i64>,
    track_pool_size: Option<u32>,
    channel_capacity: Option<usize>,
    supervisor_interval_secs: Option<u64>,
    moderators: Option<Vec<Uuid>>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            race_points: raw.race_points.unwrap_or(defaults.race_points),
            vote_threshold_numerator: raw
                .vote_threshold_numerator
                .filter(|numerator| *numerator > 0)
                .unwrap_or(defaults.vote_threshold_numerator),
            vote_threshold_denominator: raw
                .vote_threshold_denominator
                .filter(|denominator| *denominator > 0)
                .unwrap_or(defaults.vote_threshold_denominator),
            rating: raw.rating.unwrap_or(defaults.rating),
            reference_offset_hours: raw
                .reference_offset_hours
                .unwrap_or(defaults.reference_offset_hours),
            submission_window_minutes: raw
                .submission_window_minutes
                .unwrap_or(defaults.submission_window_minutes),
            track_pool_size: raw.track_pool_size.unwrap_or(defaults.track_pool_size),
            channel_capacity: raw.channel_capacity.unwrap_or(defaults.channel_capacity),
            supervisor_interval_secs: raw
                .supervisor_interval_secs
                .unwrap_or(defaults.supervisor_interval_secs),
            moderators: raw.moderators.unwrap_or(defaults.moderators),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
