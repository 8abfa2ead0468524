//! Dataset Store: the immutable snapshot of bookings and failure reports.
//!
//! Built once at startup and shared read-only by every query. Aggregations
//! never fail: an unloaded table or an absent column yields an empty result,
//! and failure-report aggregations yield `None` when that table is missing.

use std::path::Path;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::airlines::airline_name;
use crate::error::Result;
use crate::loader;
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{
    AirlineAverage, Booking, BookingColumn, BookingsTable, DailyCount, FailureRecord, FareStatistics,
    FrequencyTable, RecentFailure,
};
use crate::utils::{mean, round2, sample_std_dev};

/// Display label for a booking without layover locations
pub const NO_LAYOVER_LABEL: &str = "None";

/// Read-only aggregations the response handlers rely on
#[cfg_attr(test, mockall::automock)]
pub trait AnalyticsSource {
    /// Bookings per airline display name
    fn airline_flight_counts(&self) -> FrequencyTable<String>;
    /// Most common departure calendar dates
    fn top_departure_dates(&self, limit: usize) -> FrequencyTable<NaiveDate>;
    /// Most common arrival calendar dates
    fn top_arrival_dates(&self, limit: usize) -> FrequencyTable<NaiveDate>;
    /// Bookings per cabin class
    fn flight_class_distribution(&self) -> FrequencyTable<String>;
    /// Count, mean, min, max and sample std-dev of fares
    fn fare_statistics(&self) -> Option<FareStatistics>;
    /// Most common extras strings
    fn common_extras(&self, limit: usize) -> FrequencyTable<String>;
    /// Bookings per status
    fn booking_status_counts(&self) -> FrequencyTable<String>;
    /// Most used gates
    fn frequent_gates(&self, limit: usize) -> FrequencyTable<String>;
    /// Most used terminals
    fn frequent_terminals(&self, limit: usize) -> FrequencyTable<String>;
    /// Bookings per number of layovers
    fn layover_counts(&self) -> FrequencyTable<u32>;
    /// Most common layover locations, direct flights shown as `"None"`
    fn frequent_layover_locations(&self, limit: usize) -> FrequencyTable<String>;
    /// Most common aircraft types
    fn aircraft_type_counts(&self, limit: usize) -> FrequencyTable<String>;
    /// Reward members vs non-members
    fn reward_program_distribution(&self) -> FrequencyTable<bool>;
    /// Aisle seat vs not
    fn aisle_seat_distribution(&self) -> FrequencyTable<bool>;
    /// Mean fare per airline id, ascending by id
    fn average_fare_per_airline(&self) -> Vec<AirlineAverage>;
    /// Mean duration in hours per airline id, ascending by id
    fn average_duration_per_airline(&self) -> Vec<AirlineAverage>;
    /// Failures per category
    fn failure_counts_by_category(&self) -> Option<FrequencyTable<String>>;
    /// Failures per account
    fn failures_by_account(&self) -> Option<FrequencyTable<String>>;
    /// Failures per day opened within `window_days` before `now`, ascending by date
    fn failure_trends(&self, now: NaiveDateTime, window_days: i64) -> Option<Vec<DailyCount>>;
    /// Most recently opened failures, newest first
    fn recent_failures(&self, limit: usize) -> Option<Vec<RecentFailure>>;
}

/// In-memory bookings and failure tables
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    bookings: Option<BookingsTable>,
    failures: Option<Vec<FailureRecord>>,
}

impl DatasetStore {
    /// Build a store from already loaded tables
    #[must_use]
    pub fn new(bookings: Option<BookingsTable>, failures: Option<Vec<FailureRecord>>) -> Self {
        Self { bookings, failures }
    }

    /// Load both sources from disk.
    ///
    /// A bookings failure is returned to the caller; a failure-report
    /// failure is logged and leaves that table absent.
    pub fn load(bookings_path: &Path, failures_path: Option<&Path>, failures_skip_rows: usize) -> Result<Self> {
        let metrics = MetricsCollector::default();

        let timer = OperationTimer::new("load_dataset");
        let bookings = loader::load_bookings(bookings_path).inspect_err(|_| metrics.record_load_failure("bookings"))?;
        metrics.record_load("bookings", bookings.rows.len(), timer.elapsed());

        let failures = match failures_path {
            Some(path) => {
                let started = OperationTimer::new("load_failures_table");
                match loader::load_failures(path, failures_skip_rows) {
                    Ok(records) => {
                        metrics.record_load("failures", records.len(), started.elapsed());
                        Some(records)
                    },
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failure report unavailable, failure queries will be empty");
                        metrics.record_load_failure("failures");
                        None
                    },
                }
            },
            None => {
                info!("No failure report configured");
                None
            },
        };

        timer.finish();
        Ok(Self::new(Some(bookings), failures))
    }

    /// Loaded bookings, if any
    #[must_use]
    pub fn bookings(&self) -> Option<&BookingsTable> {
        self.bookings.as_ref()
    }

    /// Loaded failure records, if any
    #[must_use]
    pub fn failures(&self) -> Option<&[FailureRecord]> {
        self.failures.as_deref()
    }

    /// Rows when the table is loaded and carries `column`
    fn rows_with(&self, column: BookingColumn) -> Option<&[Booking]> {
        self.bookings
            .as_ref()
            .filter(|table| table.has(column))
            .map(|table| table.rows.as_slice())
    }

    fn rows(&self) -> &[Booking] {
        self.bookings
            .as_ref()
            .map(|table| table.rows.as_slice())
            .unwrap_or_default()
    }

    fn count_column<K, F>(&self, column: BookingColumn, value: F) -> FrequencyTable<K>
    where
        K: Eq + std::hash::Hash + Clone,
        F: Fn(&Booking) -> Option<K>,
    {
        self.rows_with(column)
            .map(|rows| FrequencyTable::from_values(rows.iter().filter_map(value)))
            .unwrap_or_default()
    }

    fn average_per_airline<F>(&self, column: BookingColumn, value: F) -> Vec<AirlineAverage>
    where
        F: Fn(&Booking) -> Option<f64>,
    {
        let Some(rows) = self.rows_with(column) else {
            return Vec::new();
        };

        let mut groups: std::collections::BTreeMap<u32, Vec<f64>> = std::collections::BTreeMap::new();
        for booking in rows {
            if let Some(value) = value(booking) {
                groups.entry(booking.airline_id).or_default().push(value);
            }
        }

        groups
            .into_iter()
            .filter_map(|(airline_id, values)| {
                mean(&values).map(|avg| AirlineAverage {
                    airline_id,
                    value: round2(avg),
                })
            })
            .collect()
    }
}

impl AnalyticsSource for DatasetStore {
    fn airline_flight_counts(&self) -> FrequencyTable<String> {
        FrequencyTable::from_values(
            self.rows()
                .iter()
                .map(|booking| airline_name(booking.airline_id).to_string()),
        )
    }

    fn top_departure_dates(&self, limit: usize) -> FrequencyTable<NaiveDate> {
        FrequencyTable::from_values(self.rows().iter().map(|booking| booking.departure.date())).top(limit)
    }

    fn top_arrival_dates(&self, limit: usize) -> FrequencyTable<NaiveDate> {
        FrequencyTable::from_values(self.rows().iter().map(|booking| booking.arrival.date())).top(limit)
    }

    fn flight_class_distribution(&self) -> FrequencyTable<String> {
        self.count_column(BookingColumn::FlightClass, |b| b.flight_class.clone())
    }

    fn fare_statistics(&self) -> Option<FareStatistics> {
        let fares: Vec<f64> = self.rows_with(BookingColumn::Fare)?.iter().map(|b| b.fare).collect();
        let mean = mean(&fares)?;
        let min = fares.iter().copied().fold(f64::INFINITY, f64::min);
        let max = fares.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(FareStatistics {
            count: fares.len(),
            mean,
            min,
            max,
            std_dev: sample_std_dev(&fares),
        })
    }

    fn common_extras(&self, limit: usize) -> FrequencyTable<String> {
        self.count_column(BookingColumn::Extras, |b| b.extras.clone()).top(limit)
    }

    fn booking_status_counts(&self) -> FrequencyTable<String> {
        self.count_column(BookingColumn::Status, |b| b.status.clone())
    }

    fn frequent_gates(&self, limit: usize) -> FrequencyTable<String> {
        self.count_column(BookingColumn::Gate, |b| b.gate.clone()).top(limit)
    }

    fn frequent_terminals(&self, limit: usize) -> FrequencyTable<String> {
        self.count_column(BookingColumn::Terminal, |b| b.terminal.clone()).top(limit)
    }

    fn layover_counts(&self) -> FrequencyTable<u32> {
        self.count_column(BookingColumn::Layovers, |b| b.layovers)
    }

    fn frequent_layover_locations(&self, limit: usize) -> FrequencyTable<String> {
        self.count_column(BookingColumn::LayoverLocations, |b| {
            Some(
                b.layover_locations
                    .clone()
                    .unwrap_or_else(|| NO_LAYOVER_LABEL.to_string()),
            )
        })
        .top(limit)
    }

    fn aircraft_type_counts(&self, limit: usize) -> FrequencyTable<String> {
        self.count_column(BookingColumn::AircraftType, |b| b.aircraft_type.clone()).top(limit)
    }

    fn reward_program_distribution(&self) -> FrequencyTable<bool> {
        self.count_column(BookingColumn::RewardMember, |b| Some(b.is_reward_member))
    }

    fn aisle_seat_distribution(&self) -> FrequencyTable<bool> {
        self.count_column(BookingColumn::AisleSeat, |b| Some(b.has_aisle_seat))
    }

    fn average_fare_per_airline(&self) -> Vec<AirlineAverage> {
        self.average_per_airline(BookingColumn::Fare, |b| Some(b.fare))
    }

    fn average_duration_per_airline(&self) -> Vec<AirlineAverage> {
        self.average_per_airline(BookingColumn::DurationHours, |b| b.duration_hours)
    }

    fn failure_counts_by_category(&self) -> Option<FrequencyTable<String>> {
        let failures = self.failures.as_ref()?;
        Some(FrequencyTable::from_values(failures.iter().map(|f| f.category.clone())))
    }

    fn failures_by_account(&self) -> Option<FrequencyTable<String>> {
        let failures = self.failures.as_ref()?;
        Some(FrequencyTable::from_values(failures.iter().map(|f| f.account_name.clone())))
    }

    fn failure_trends(&self, now: NaiveDateTime, window_days: i64) -> Option<Vec<DailyCount>> {
        let failures = self.failures.as_ref()?;
        let cutoff = now - Duration::days(window_days);

        let mut daily: std::collections::BTreeMap<NaiveDate, usize> = std::collections::BTreeMap::new();
        for failure in failures.iter().filter(|f| f.opened_at >= cutoff) {
            *daily.entry(failure.opened_at.date()).or_default() += 1;
        }

        Some(
            daily
                .into_iter()
                .map(|(date, count)| DailyCount { date, count })
                .collect(),
        )
    }

    fn recent_failures(&self, limit: usize) -> Option<Vec<RecentFailure>> {
        let failures = self.failures.as_ref()?;
        let mut ordered: Vec<&FailureRecord> = failures.iter().collect();
        // stable: equal timestamps keep source order
        ordered.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));

        Some(
            ordered
                .into_iter()
                .take(limit)
                .map(RecentFailure::from)
                .collect(),
        )
    }
}

/// Current local wall-clock time, the reference point for trailing windows
#[must_use]
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(airline_id: u32, day: u32, fare: f64) -> Booking {
        let date = NaiveDate::from_ymd_opt(2025, 5, day)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap();
        Booking {
            airline_id,
            departure: date,
            arrival: date,
            fare,
            flight_class: Some("economy".to_string()),
            extras: Some("wifi".to_string()),
            status: Some("confirmed".to_string()),
            gate: Some("A1".to_string()),
            terminal: Some("1".to_string()),
            layovers: Some(0),
            layover_locations: None,
            aircraft_type: Some("737".to_string()),
            is_reward_member: true,
            has_aisle_seat: false,
            has_window_seat: true,
            duration_hours: Some(2.0),
        }
    }

    #[test]
    fn test_unloaded_store_returns_empty_results() {
        let store = DatasetStore::default();
        assert!(store.airline_flight_counts().is_empty());
        assert!(store.top_departure_dates(5).is_empty());
        assert!(store.fare_statistics().is_none());
        assert!(store.average_fare_per_airline().is_empty());
        assert!(store.failure_counts_by_category().is_none());
        assert!(store.recent_failures(5).is_none());
    }

    #[test]
    fn test_absent_column_returns_empty() {
        let table = BookingsTable {
            rows: vec![booking(1, 25, 100.0)],
            columns: std::collections::HashSet::new(),
        };
        let store = DatasetStore::new(Some(table), None);
        assert!(store.flight_class_distribution().is_empty());
        assert!(store.fare_statistics().is_none());
        // dates are required columns and always available
        assert_eq!(store.top_departure_dates(5).len(), 1);
    }

    #[test]
    fn test_blank_cells_are_left_out_of_aggregations() {
        let mut blank = booking(1, 26, 100.0);
        blank.duration_hours = None;
        blank.flight_class = None;
        blank.layovers = None;
        let mut long = booking(1, 27, 100.0);
        long.duration_hours = Some(4.0);
        long.layovers = Some(1);

        let rows = vec![long, blank, booking(1, 25, 100.0)];
        let store = DatasetStore::new(Some(BookingsTable::with_all_columns(rows)), None);

        let durations = store.average_duration_per_airline();
        assert_eq!(durations, vec![AirlineAverage { airline_id: 1, value: 3.0 }]);

        let classes = store.flight_class_distribution();
        assert_eq!(classes.entries(), &[("economy".to_string(), 2)]);

        let layovers = store.layover_counts();
        assert_eq!(layovers.get(&0), Some(1));
        assert_eq!(layovers.get(&1), Some(1));
        assert_eq!(layovers.len(), 2);
    }

    #[test]
    fn test_airline_with_only_blank_durations_is_omitted() {
        let mut first = booking(2, 25, 100.0);
        first.duration_hours = None;
        let rows = vec![first, booking(1, 25, 100.0)];
        let store = DatasetStore::new(Some(BookingsTable::with_all_columns(rows)), None);

        let ids: Vec<u32> = store
            .average_duration_per_airline()
            .iter()
            .map(|avg| avg.airline_id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_fare_statistics_single_row_has_no_std_dev() {
        let store = DatasetStore::new(Some(BookingsTable::with_all_columns(vec![booking(1, 25, 80.0)])), None);
        let stats = store.fare_statistics().unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.min, 80.0);
        assert_eq!(stats.std_dev, None);
    }

    #[test]
    fn test_failure_trends_respect_window() {
        let opened = |day: u32| {
            NaiveDate::from_ymd_opt(2025, 5, day)
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .unwrap()
        };
        let record = |day: u32| FailureRecord {
            case_number: format!("CASE{day}"),
            opened_at: opened(day),
            account_name: "Alpha Corp".to_string(),
            category: "System Error".to_string(),
            subcategory: "Database".to_string(),
            subject: "Login Failure".to_string(),
        };
        let store = DatasetStore::new(None, Some(vec![record(1), record(20), record(20), record(21)]));

        let trends = store.failure_trends(opened(25), 7).unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].count, 2);
        assert_eq!(trends[1].date, NaiveDate::from_ymd_opt(2025, 5, 21).unwrap());
    }
}
