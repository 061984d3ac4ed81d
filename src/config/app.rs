//! Main application configuration
//!
//! This module defines the primary configuration structures for a triscore
//! replay, including environment variable and TOML file loading and validation.

use crate::config::rating::{RatingConfig, StrategyKind};
use crate::error::RatingError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
    pub replay: ReplaySettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Replay driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// JSON file or directory of JSON files holding races
    pub races_path: Option<PathBuf>,
    /// JSON snapshot of the rating store, loaded before and saved after the replay
    pub store_path: Option<PathBuf>,
    /// Number of oldest races to skip
    pub skip: usize,
    /// Maximum number of races to process (0 = all)
    pub limit: usize,
    /// Abort the whole replay on the first failed race
    pub stop_on_error: bool,
    /// Compute independent cohorts of one race in parallel
    pub parallel_cohorts: bool,
    /// Log a progress line every N races
    pub progress_interval: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "triscore".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            races_path: None,
            store_path: None,
            skip: 0,
            limit: 0,
            stop_on_error: true,
            parallel_cohorts: true,
            progress_interval: 100,
        }
    }
}

impl ReplaySettings {
    pub fn validate(&self) -> Result<()> {
        if self.progress_interval == 0 {
            return Err(
                RatingError::configuration("Progress interval must be greater than 0").into(),
            );
        }
        Ok(())
    }

    /// Limit as an option, `None` meaning unlimited
    pub fn limit(&self) -> Option<usize> {
        if self.limit == 0 {
            None
        } else {
            Some(self.limit)
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", name, value)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, environment variables still override
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("TRISCORE_SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("TRISCORE_LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Rating settings
        if let Some(start_rating) = parse_var("TRISCORE_START_RATING")? {
            self.rating.start_rating = start_rating;
        }
        if let Some(min_group_size) = parse_var("TRISCORE_MIN_GROUP_SIZE")? {
            self.rating.min_group_size = min_group_size;
        }
        if let Ok(strategy) = env::var("TRISCORE_STRATEGY") {
            self.rating.strategy = match strategy.to_lowercase().replace('-', "_").as_str() {
                "closed_form" => StrategyKind::ClosedForm,
                "inversion" => StrategyKind::Inversion,
                _ => return Err(anyhow!("Invalid TRISCORE_STRATEGY value: {}", strategy)),
            };
        }
        if let Some(extend) = parse_var("TRISCORE_EXTEND_COHORTS")? {
            self.rating.extend_cohorts = extend;
        }
        if let Some(a) = parse_var("TRISCORE_SCORE_A")? {
            self.rating.score.a = a;
        }
        if let Some(b) = parse_var("TRISCORE_SCORE_B")? {
            self.rating.score.b = b;
        }
        if let Some(c) = parse_var("TRISCORE_SCORE_C")? {
            self.rating.score.c = c;
        }
        if let Some(max_rating) = parse_var("TRISCORE_INVERSION_MAX_RATING")? {
            self.rating.inversion.max_rating = max_rating;
        }

        // Replay settings
        if let Ok(path) = env::var("TRISCORE_RACES_PATH") {
            self.replay.races_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = env::var("TRISCORE_STORE_PATH") {
            self.replay.store_path = Some(PathBuf::from(path));
        }
        if let Some(skip) = parse_var("TRISCORE_SKIP")? {
            self.replay.skip = skip;
        }
        if let Some(limit) = parse_var("TRISCORE_LIMIT")? {
            self.replay.limit = limit;
        }
        if let Some(stop) = parse_var("TRISCORE_STOP_ON_ERROR")? {
            self.replay.stop_on_error = stop;
        }
        if let Some(parallel) = parse_var("TRISCORE_PARALLEL_COHORTS")? {
            self.replay.parallel_cohorts = parallel;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(RatingError::configuration(format!(
                "Invalid log level: {}",
                config.service.log_level
            ))
            .into()),
    }

    if config.service.name.is_empty() {
        return Err(RatingError::configuration("Service name cannot be empty").into());
    }

    config.rating.validate()?;

    config.replay.validate()?;

    Ok(())
}
