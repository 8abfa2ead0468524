//! Data models for bookings, failure reports and aggregation results
//!
//! Records are built once by the loader and never mutated afterwards.
//! Aggregation results are small owned values so they can cross the
//! `AnalyticsSource` seam without borrowing the store.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One row of the bookings table
///
/// Blank optional cells stay `None` and are left out of aggregations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Airline identifier, resolved through [`crate::airlines`]
    pub airline_id: u32,
    /// Scheduled departure
    pub departure: NaiveDateTime,
    /// Scheduled arrival
    pub arrival: NaiveDateTime,
    /// Fare paid; blanks were replaced with the column median at load time
    pub fare: f64,
    /// Cabin class (economy, business, ...)
    pub flight_class: Option<String>,
    /// Extras purchased, as written in the source
    pub extras: Option<String>,
    /// Booking status (confirmed, cancelled, ...)
    pub status: Option<String>,
    /// Departure gate
    pub gate: Option<String>,
    /// Departure terminal
    pub terminal: Option<String>,
    /// Number of layovers
    pub layovers: Option<u32>,
    /// Comma-joined layover airports, `None` for direct flights
    pub layover_locations: Option<String>,
    /// Aircraft model
    pub aircraft_type: Option<String>,
    /// Member of the airline's reward program
    pub is_reward_member: bool,
    /// Booked an aisle seat
    pub has_aisle_seat: bool,
    /// Booked a window seat
    pub has_window_seat: bool,
    /// Flight duration in hours
    pub duration_hours: Option<f64>,
}

/// Optional bookings columns whose presence is tracked per load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingColumn {
    /// `fare`
    Fare,
    /// `class`
    FlightClass,
    /// `extras`
    Extras,
    /// `status`
    Status,
    /// `gate`
    Gate,
    /// `terminal`
    Terminal,
    /// `layovers`
    Layovers,
    /// `layover_locations`
    LayoverLocations,
    /// `aircraft_type`
    AircraftType,
    /// `reward_program_member`
    RewardMember,
    /// `aisle_seat`
    AisleSeat,
    /// `window_seat`
    WindowSeat,
    /// `duration_hrs`
    DurationHours,
}

/// Loaded bookings plus the set of optional columns the source carried
#[derive(Debug, Clone, Default)]
pub struct BookingsTable {
    /// Rows in source order
    pub rows: Vec<Booking>,
    /// Optional columns present in the source
    pub columns: HashSet<BookingColumn>,
}

impl BookingsTable {
    /// Build a table that claims every optional column
    #[must_use]
    pub fn with_all_columns(rows: Vec<Booking>) -> Self {
        let columns = [
            BookingColumn::Fare,
            BookingColumn::FlightClass,
            BookingColumn::Extras,
            BookingColumn::Status,
            BookingColumn::Gate,
            BookingColumn::Terminal,
            BookingColumn::Layovers,
            BookingColumn::LayoverLocations,
            BookingColumn::AircraftType,
            BookingColumn::RewardMember,
            BookingColumn::AisleSeat,
            BookingColumn::WindowSeat,
            BookingColumn::DurationHours,
        ]
        .into_iter()
        .collect();
        Self { rows, columns }
    }

    /// True when the source carried the column
    #[must_use]
    pub fn has(&self, column: BookingColumn) -> bool {
        self.columns.contains(&column)
    }
}

/// One row of the failure report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Case identifier
    pub case_number: String,
    /// When the case was opened
    pub opened_at: NaiveDateTime,
    /// Customer account
    pub account_name: String,
    /// Failure category
    pub category: String,
    /// Failure subcategory
    pub subcategory: String,
    /// Case subject line
    pub subject: String,
}

/// Counts per distinct value, ordered by descending count.
///
/// Ties keep the order in which values were first encountered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable<K> {
    entries: Vec<(K, usize)>,
}

impl<K> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: Eq + Hash + Clone> FrequencyTable<K> {
    /// Count every value yielded by the iterator
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut entries: Vec<(K, usize)> = Vec::new();

        for value in values {
            if let Some(&slot) = index.get(&value) {
                entries[slot].1 += 1;
            } else {
                index.insert(value.clone(), entries.len());
                entries.push((value, 1));
            }
        }

        // stable sort keeps first-encounter order among equal counts
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    /// Count for a value, if it occurred
    #[must_use]
    pub fn get(&self, key: &K) -> Option<usize> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| *c)
    }
}

impl<K> FrequencyTable<K> {
    /// Build from already ordered entries
    #[must_use]
    pub fn from_entries(entries: Vec<(K, usize)>) -> Self {
        Self { entries }
    }

    /// Keep only the `limit` most frequent entries
    #[must_use]
    pub fn top(mut self, limit: usize) -> Self {
        self.entries.truncate(limit);
        self
    }

    /// Entries in order
    #[must_use]
    pub fn entries(&self) -> &[(K, usize)] {
        &self.entries
    }

    /// Most frequent entry
    #[must_use]
    pub fn first(&self) -> Option<&(K, usize)> {
        self.entries.first()
    }

    /// Number of distinct values
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was counted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Descriptive statistics for the fare column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareStatistics {
    /// Number of fares
    pub count: usize,
    /// Mean fare
    pub mean: f64,
    /// Lowest fare
    pub min: f64,
    /// Highest fare
    pub max: f64,
    /// Sample standard deviation, undefined below two fares
    pub std_dev: Option<f64>,
}

/// Per-airline mean of a numeric column, rounded to two decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirlineAverage {
    /// Airline identifier
    pub airline_id: u32,
    /// Rounded mean
    pub value: f64,
}

/// Number of failures opened on a calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    /// Day
    pub date: NaiveDate,
    /// Failures opened that day
    pub count: usize,
}

/// Projection of a failure record shown in the recent-failures table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentFailure {
    /// Case identifier
    pub case_number: String,
    /// When the case was opened
    pub opened_at: NaiveDateTime,
    /// Failure category
    pub category: String,
    /// Failure subcategory
    pub subcategory: String,
    /// Case subject line
    pub subject: String,
    /// Customer account
    pub account_name: String,
}

impl From<&FailureRecord> for RecentFailure {
    fn from(record: &FailureRecord) -> Self {
        Self {
            case_number: record.case_number.clone(),
            opened_at: record.opened_at,
            category: record.category.clone(),
            subcategory: record.subcategory.clone(),
            subject: record.subject.clone(),
            account_name: record.account_name.clone(),
        }
    }
}
