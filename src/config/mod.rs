//! Configuration management for triscore
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values for the rating engine and the
//! replay driver.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ReplaySettings, ServiceSettings};
pub use rating::{
    FinishMultipliers, InversionSettings, RaceTypeMultipliers, RatingConfig,
    ScoreMultiplierParams, StrategyKind,
};
