//! Metrics for the rating replay
//!
//! This module provides Prometheus counters and histograms for races, cohorts
//! and rating changes. There is no HTTP endpoint; the registry is rendered
//! to text on demand.

pub mod collector;

pub use collector::{
    MetricsCollector, MetricsTimer, PerformanceMetrics, RaceOutcome, ReplayMetrics,
};
