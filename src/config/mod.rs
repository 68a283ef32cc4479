//! Session tuning knobs, loadable from a RON file.
//!
//! Every field has a default, so a config file only lists what it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// How a failed asset fetch is retried before the entry is marked failed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Seconds of tick time between attempts.
    pub interval_secs: f32,
    /// Total attempts including the first. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            max_attempts: Some(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            interval_secs: 0.0,
            max_attempts: Some(1),
        }
    }

    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of missions kept active outside of a claim.
    pub mission_pool_size: usize,
    /// Premium currency spent to continue after dying.
    pub second_wind_cost: u32,
    pub max_lives: u32,
    /// Delay between the final death and the end-of-run decision.
    pub game_over_delay_secs: f32,
    /// Metres of best distance per rank step.
    pub rank_distance: f32,
    pub max_highscores: usize,
    pub default_character: String,
    pub default_theme: String,
    pub default_player_name: String,
    pub asset_retry: RetryPolicy,
    /// Panic on structural flow errors instead of logging them.
    pub strict_transitions: bool,
    /// Fixed seed for mission rolls; entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mission_pool_size: 2,
            second_wind_cost: 3,
            max_lives: 3,
            game_over_delay_secs: 2.0,
            rank_distance: 300.0,
            max_highscores: 10,
            default_character: String::from("Trash Cat"),
            default_theme: String::from("Day"),
            default_player_name: String::from("Trash Cat"),
            asset_retry: RetryPolicy::default(),
            strict_transitions: cfg!(debug_assertions),
            rng_seed: None,
        }
    }
}

impl SessionConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&contents)
    }
}
