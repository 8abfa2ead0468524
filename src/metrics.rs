use anyhow::Result;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Metrics collection and management
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    // Query pipeline metrics
    pub queries_total: &'static str,
    pub query_duration: &'static str,
    pub handler_failures_total: &'static str,
    pub backup_hits_total: &'static str,

    // Load metrics
    pub rows_loaded: &'static str,
    pub load_duration: &'static str,
    pub load_failures_total: &'static str,

    // Service metrics
    pub jobs_submitted_total: &'static str,
    pub jobs_retained: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            queries_total: "flight_insights_queries_total",
            query_duration: "flight_insights_query_duration_seconds",
            handler_failures_total: "flight_insights_handler_failures_total",
            backup_hits_total: "flight_insights_backup_hits_total",

            rows_loaded: "flight_insights_rows_loaded",
            load_duration: "flight_insights_load_duration_seconds",
            load_failures_total: "flight_insights_load_failures_total",

            jobs_submitted_total: "flight_insights_jobs_submitted_total",
            jobs_retained: "flight_insights_jobs_retained",
        }
    }
}

impl MetricsCollector {
    /// Initialize metrics collection
    pub fn init() -> Result<()> {
        // Initialize the metrics recorder
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|e| anyhow::anyhow!("Failed to initialize metrics recorder: {}", e))?;

        Ok(())
    }

    /// Record one processed query
    pub fn record_query(&self, intent: &str, outcome: &str, duration: Duration) {
        counter!(self.queries_total, "intent" => intent.to_string(), "outcome" => outcome.to_string()).increment(1);
        histogram!(self.query_duration, "outcome" => outcome.to_string()).record(duration.as_secs_f64());
    }

    /// Record a handler that could not build its envelope
    pub fn record_handler_failure(&self, intent: &str) {
        counter!(self.handler_failures_total, "intent" => intent.to_string()).increment(1);
    }

    /// Record an answer served from the backup table
    pub fn record_backup_hit(&self) {
        counter!(self.backup_hits_total).increment(1);
    }

    /// Record a completed table load
    pub fn record_load(&self, table: &str, rows: usize, duration: Duration) {
        gauge!(self.rows_loaded, "table" => table.to_string()).set(rows as f64);
        histogram!(self.load_duration, "table" => table.to_string()).record(duration.as_secs_f64());
    }

    /// Record a table that failed to load
    pub fn record_load_failure(&self, table: &str) {
        counter!(self.load_failures_total, "table" => table.to_string()).increment(1);
    }

    /// Record a submitted job and the number of records now held
    pub fn record_job_submitted(&self, retained: usize) {
        counter!(self.jobs_submitted_total).increment(1);
        gauge!(self.jobs_retained).set(retained as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.queries_total, "flight_insights_queries_total");
    }

    #[test]
    fn test_recording_without_recorder_is_harmless() {
        let collector = MetricsCollector::default();
        collector.record_query("airline_flights", "resolved", Duration::from_millis(3));
        collector.record_backup_hit();
        collector.record_load("bookings", 5, Duration::from_millis(1));
    }
}
