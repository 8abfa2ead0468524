//! Query dispatcher: match, handle, fall back, and never fail.
//!
//! Every question moves through the same fixed chain:
//!
//! ```text
//! received -> matched   -> resolved
//!                       -> failed    -> backup -> resolved | error
//!          -> unmatched             -> backup -> resolved | error
//! ```
//!
//! Each step runs at most once. The caller always gets a well-formed
//! [`Envelope`]; problems are reported through the `error` variant.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::backup;
use crate::config::QueryConfig;
use crate::dataset::{local_now, AnalyticsSource};
use crate::envelope::Envelope;
use crate::error::HandlerError;
use crate::handlers::{handler_for, HandlerRequest};
use crate::intent::{normalize, Intent, IntentMatcher};
use crate::metrics::MetricsCollector;
use crate::validation::InputValidator;

/// Shown when neither a pattern nor the backup table recognizes the question
pub const NOT_UNDERSTOOD_MESSAGE: &str = "Sorry, I didn't understand your query. Please try rephrasing it.";

/// Shared, read-only analytics source
pub type SharedSource = Arc<dyn AnalyticsSource + Send + Sync>;

/// Knobs the dispatcher passes on to handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    /// Limit for "top N" style questions without an explicit N
    pub default_limit: usize,
    /// Trailing window for failure trends
    pub trend_window_days: i64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_limit: 5,
            trend_window_days: 30,
        }
    }
}

impl From<&QueryConfig> for QuerySettings {
    fn from(config: &QueryConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            trend_window_days: config.trend_window_days,
        }
    }
}

/// Where a question's answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A handler answered
    Handler,
    /// The backup table answered
    Backup,
    /// Nobody could answer
    Error,
}

impl Resolution {
    /// Label used for the `outcome` metric
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handler => "resolved",
            Self::Backup => "backup",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope plus how it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Intent the question matched, if any
    pub intent: Option<Intent>,
    /// How the envelope was produced
    pub resolution: Resolution,
    /// The answer
    pub envelope: Envelope,
}

/// Outcome of the match and handle steps, before any fallback
enum Attempt {
    Resolved(Intent, Envelope),
    Unmatched,
    Failed(Intent, HandlerError),
}

/// Routes questions to handlers over a shared source
pub struct QueryDispatcher {
    source: SharedSource,
    matcher: IntentMatcher,
    settings: QuerySettings,
    clock: fn() -> NaiveDateTime,
    metrics: MetricsCollector,
}

impl fmt::Debug for QueryDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDispatcher")
            .field("intents", &self.matcher.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl QueryDispatcher {
    /// Dispatcher over `source` using the built-in intent patterns
    pub fn new(source: SharedSource, settings: QuerySettings) -> Result<Self> {
        Ok(Self {
            source,
            matcher: IntentMatcher::new()?,
            settings,
            clock: local_now,
            metrics: MetricsCollector::default(),
        })
    }

    /// Replace the wall clock used for trailing windows
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Current settings
    #[must_use]
    pub const fn settings(&self) -> QuerySettings {
        self.settings
    }

    /// Answer a question. Never fails.
    #[must_use]
    pub fn process_query(&self, text: &str) -> Envelope {
        self.dispatch(text).envelope
    }

    /// Answer a question and report how the answer was found
    #[must_use]
    pub fn dispatch(&self, text: &str) -> Dispatch {
        let started = Instant::now();
        let normalized = normalize(text);

        let dispatch = match self.attempt(text) {
            Attempt::Resolved(intent, envelope) => Dispatch {
                intent: Some(intent),
                resolution: Resolution::Handler,
                envelope,
            },
            Attempt::Unmatched => {
                debug!(query = %normalized, "No intent matched");
                self.fall_back(&normalized, None, NOT_UNDERSTOOD_MESSAGE.to_string())
            },
            Attempt::Failed(intent, reason) => {
                warn!(intent = %intent, reason = %reason, "Handler failed");
                self.metrics.record_handler_failure(intent.name());
                self.fall_back(&normalized, Some(intent), format!("Error processing query: {reason}"))
            },
        };

        let elapsed = started.elapsed();
        let intent_label = dispatch.intent.map_or("none", Intent::name);
        self.metrics
            .record_query(intent_label, dispatch.resolution.as_str(), elapsed);
        info!(
            intent = intent_label,
            outcome = %dispatch.resolution,
            kind = dispatch.envelope.kind(),
            duration_ms = elapsed.as_millis(),
            "Query processed"
        );

        dispatch
    }

    fn attempt(&self, text: &str) -> Attempt {
        let Some(matched) = self.matcher.match_query(text) else {
            return Attempt::Unmatched;
        };

        if let Some(limit) = matched.limit {
            if let Err(e) = InputValidator::validate_limit(limit) {
                return Attempt::Failed(matched.intent, HandlerError::InvalidLimit {
                    limit,
                    reason: e.to_string(),
                });
            }
        }

        let request = HandlerRequest::new(
            &matched,
            self.settings.default_limit,
            self.settings.trend_window_days,
            (self.clock)(),
        );
        match handler_for(matched.intent)(self.source.as_ref(), &request) {
            Ok(envelope) => Attempt::Resolved(matched.intent, envelope),
            Err(reason) => Attempt::Failed(matched.intent, reason),
        }
    }

    fn fall_back(&self, normalized: &str, intent: Option<Intent>, message: String) -> Dispatch {
        match backup::lookup(normalized) {
            Some(envelope) => {
                self.metrics.record_backup_hit();
                debug!(query = %normalized, "Answered from backup table");
                Dispatch {
                    intent,
                    resolution: Resolution::Backup,
                    envelope,
                }
            },
            None => Dispatch {
                intent,
                resolution: Resolution::Error,
                envelope: Envelope::error(message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MockAnalyticsSource;
    use crate::models::FrequencyTable;
    use chrono::NaiveDate;

    fn dispatcher(source: MockAnalyticsSource) -> QueryDispatcher {
        QueryDispatcher::new(Arc::new(source), QuerySettings::default()).unwrap()
    }

    fn airline_counts() -> FrequencyTable<String> {
        FrequencyTable::from_entries(vec![
            ("American Airlines".to_string(), 2),
            ("Delta Air Lines".to_string(), 2),
            ("Southwest Airlines".to_string(), 1),
        ])
    }

    #[test]
    fn test_airline_query_resolves_to_text() {
        let mut source = MockAnalyticsSource::new();
        source
            .expect_airline_flight_counts()
            .times(1)
            .returning(airline_counts);

        let dispatch = dispatcher(source).dispatch("  Which airline has the most flights?  ");
        assert_eq!(dispatch.resolution, Resolution::Handler);
        assert_eq!(dispatch.intent, Some(Intent::AirlineFlights));
        let Envelope::Text { data } = dispatch.envelope else {
            panic!("expected text");
        };
        assert!(data.contains("American Airlines"));
    }

    #[test]
    fn test_top_two_departure_dates() {
        let mut source = MockAnalyticsSource::new();
        source
            .expect_top_departure_dates()
            .withf(|limit| *limit == 2)
            .returning(|_| {
                FrequencyTable::from_entries(vec![
                    (NaiveDate::from_ymd_opt(2025, 5, 25).unwrap(), 2),
                    (NaiveDate::from_ymd_opt(2025, 5, 26).unwrap(), 2),
                ])
            });

        let envelope = dispatcher(source).process_query("What are the top 2 most frequent departure dates?");
        let Envelope::BarChart { data } = envelope else {
            panic!("expected a bar chart");
        };
        assert_eq!(data.labels.len(), 2);
        assert!(data.title.starts_with("Top 2 Departure Dates"));
    }

    #[test]
    fn test_unrecognized_query_is_error() {
        let source = MockAnalyticsSource::new();
        let dispatch = dispatcher(source).dispatch("Tell me something random.");
        assert_eq!(dispatch.resolution, Resolution::Error);
        assert_eq!(dispatch.intent, None);
        let Envelope::Error { message } = dispatch.envelope else {
            panic!("expected an error");
        };
        assert!(message.contains("didn't understand"));
    }

    #[test]
    fn test_unmatched_query_uses_backup() {
        let source = MockAnalyticsSource::new();
        let dispatch = dispatcher(source).dispatch("Which month had the highest number of bookings");
        assert_eq!(dispatch.resolution, Resolution::Backup);
        assert_eq!(dispatch.envelope.kind(), "time_series");
    }

    #[test]
    fn test_handler_failure_falls_back_to_backup() {
        let mut source = MockAnalyticsSource::new();
        source
            .expect_airline_flight_counts()
            .returning(FrequencyTable::default);

        let dispatch = dispatcher(source).dispatch("which airline has the most flights");
        assert_eq!(dispatch.resolution, Resolution::Backup);
        assert_eq!(dispatch.intent, Some(Intent::AirlineFlights));
        assert_eq!(
            dispatch.envelope,
            Envelope::text("United Airlines has the most flights with 1,234 flights")
        );
    }

    #[test]
    fn test_handler_failure_without_backup_is_error() {
        let mut source = MockAnalyticsSource::new();
        source.expect_failures_by_account().returning(|| None);

        let dispatch = dispatcher(source).dispatch("Show me the failures by account");
        assert_eq!(dispatch.resolution, Resolution::Error);
        let Envelope::Error { message } = dispatch.envelope else {
            panic!("expected an error");
        };
        assert!(message.starts_with("Error processing query:"));
    }

    #[test]
    fn test_zero_limit_never_reaches_the_source() {
        let source = MockAnalyticsSource::new();
        let dispatch = dispatcher(source).dispatch("what are the top 0 most frequent departure dates");
        assert_eq!(dispatch.resolution, Resolution::Error);
        assert_eq!(dispatch.intent, Some(Intent::TopDepartureDates));
        let Envelope::Error { message } = dispatch.envelope else {
            panic!("expected an error");
        };
        assert!(message.starts_with("Error processing query: invalid limit 0"), "{message}");
    }

    #[test]
    fn test_clock_is_passed_to_trend_handler() {
        fn fixed() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2025, 6, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap()
        }

        let mut source = MockAnalyticsSource::new();
        source
            .expect_failure_trends()
            .withf(|now, window| *now == fixed() && *window == 30)
            .returning(|_, _| Some(Vec::new()));

        let dispatcher = dispatcher(source).with_clock(fixed);
        assert_eq!(dispatcher.process_query("what are the failure trends?").kind(), "time_series");
    }
}
