//! Metrics collection using Prometheus
//!
//! Counters and timings of a replay run, kept in a private registry and
//! exported in the Prometheus text format.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the replay
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Race and athlete counters
    replay_metrics: ReplayMetrics,

    /// Timings and delta distribution
    performance_metrics: PerformanceMetrics,
}

/// Race and athlete counters
#[derive(Clone)]
pub struct ReplayMetrics {
    /// Races by outcome (committed, skipped, failed)
    pub races_total: IntCounterVec,

    /// Cohorts rated by mode (plain, extended)
    pub cohorts_total: IntCounterVec,

    /// History entries written
    pub athletes_rated_total: IntCounter,

    /// Athletes known to the store
    pub athletes_tracked: IntGauge,
}

/// Timings and delta distribution
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Wall time of one race, from snapshot read to commit
    pub race_processing_duration: Histogram,

    /// Absolute rating change per athlete and race
    pub rating_delta: Histogram,
}

/// Outcome label of a processed race
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceOutcome {
    Committed,
    Skipped,
    Failed,
}

impl RaceOutcome {
    fn as_str(self) -> &'static str {
        match self {
            RaceOutcome::Committed => "committed",
            RaceOutcome::Skipped => "skipped",
            RaceOutcome::Failed => "failed",
        }
    }
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let replay_metrics = ReplayMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            replay_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn replay(&self) -> &ReplayMetrics {
        &self.replay_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a race leaving the pipeline
    pub fn record_race(&self, outcome: RaceOutcome, duration: Option<Duration>) {
        self.replay_metrics
            .races_total
            .with_label_values(&[outcome.as_str()])
            .inc();

        if let Some(duration) = duration {
            self.performance_metrics
                .race_processing_duration
                .observe(duration.as_secs_f64());
        }
    }

    /// Record one rated cohort
    pub fn record_cohort(&self, extended: bool) {
        let mode = if extended { "extended" } else { "plain" };
        self.replay_metrics
            .cohorts_total
            .with_label_values(&[mode])
            .inc();
    }

    /// Record one athlete's rating change
    pub fn record_rating_delta(&self, delta: i64) {
        self.replay_metrics.athletes_rated_total.inc();
        self.performance_metrics
            .rating_delta
            .observe(delta.unsigned_abs() as f64);
    }

    pub fn set_athletes_tracked(&self, count: usize) {
        self.replay_metrics.athletes_tracked.set(count as i64);
    }

    /// Render every registered metric in the text exposition format
    pub fn encode(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        TextEncoder::new()
            .encode_to_string(&metric_families)
            .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ReplayMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let races_total = IntCounterVec::new(
            Opts::new("triscore_races_total", "Races processed by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(races_total.clone()))?;

        let cohorts_total = IntCounterVec::new(
            Opts::new("triscore_cohorts_total", "Cohorts rated by mode"),
            &["mode"],
        )?;
        registry.register(Box::new(cohorts_total.clone()))?;

        let athletes_rated_total = IntCounter::new(
            "triscore_athletes_rated_total",
            "History entries written",
        )?;
        registry.register(Box::new(athletes_rated_total.clone()))?;

        let athletes_tracked =
            IntGauge::new("triscore_athletes_tracked", "Athletes known to the store")?;
        registry.register(Box::new(athletes_tracked.clone()))?;

        Ok(Self {
            races_total,
            cohorts_total,
            athletes_rated_total,
            athletes_tracked,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let race_processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "triscore_race_processing_duration_seconds",
                "Race processing time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(race_processing_duration.clone()))?;

        let rating_delta = Histogram::with_opts(
            HistogramOpts::new("triscore_rating_delta", "Absolute rating change per race")
                .buckets(vec![0.0, 5.0, 10.0, 25.0, 50.0, 100.0, 200.0, 400.0]),
        )?;
        registry.register(Box::new(rating_delta.clone()))?;

        Ok(Self {
            race_processing_duration,
            rating_delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _replay = collector.replay();
        let _performance = collector.performance();
    }

    #[test]
    fn test_race_and_athlete_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_race(RaceOutcome::Committed, Some(Duration::from_millis(3)));
        collector.record_race(RaceOutcome::Skipped, None);
        collector.record_cohort(false);
        collector.record_cohort(true);
        collector.record_rating_delta(-42);
        collector.record_rating_delta(17);
        collector.set_athletes_tracked(2);

        let replay = collector.replay();
        assert_eq!(
            replay.races_total.with_label_values(&["committed"]).get(),
            1
        );
        assert_eq!(replay.races_total.with_label_values(&["failed"]).get(), 0);
        assert_eq!(replay.cohorts_total.with_label_values(&["extended"]).get(), 1);
        assert_eq!(replay.athletes_rated_total.get(), 2);
        assert_eq!(replay.athletes_tracked.get(), 2);
        assert_eq!(
            collector.performance().rating_delta.get_sample_sum(),
            59.0
        );
    }

    #[test]
    fn test_encode_text_format() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        collector.record_race(RaceOutcome::Failed, None);

        let text = collector.encode().expect("Failed to encode metrics");
        assert!(text.contains("triscore_races_total{outcome=\"failed\"} 1"));
        assert!(text.contains("triscore_athletes_tracked"));
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}
