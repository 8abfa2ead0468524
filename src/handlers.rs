//! Response handlers: one aggregation in, one envelope out.
//!
//! Handlers are pure over the store's contents. Empty aggregations give
//! well-formed empty envelopes; only the "most flights" handler and the
//! failure-report handlers can fail, and they say why through
//! [`HandlerError`].

use chrono::NaiveDateTime;

use crate::airlines::airline_name;
use crate::dataset::AnalyticsSource;
use crate::envelope::{Envelope, Number, TableData, TimeSeriesData};
use crate::error::HandlerError;
use crate::intent::{Intent, IntentMatch};
use crate::models::{AirlineAverage, DailyCount, FrequencyTable};

/// Outcome of a single handler
pub type HandlerResult = Result<Envelope, HandlerError>;

/// A response handler
pub type Handler = fn(&dyn AnalyticsSource, &HandlerRequest) -> HandlerResult;

/// Column headers of the recent-failures table
pub const RECENT_FAILURE_HEADERS: [&str; 6] = [
    "Case Number",
    "Opened At",
    "Category",
    "Subcategory",
    "Subject",
    "Account Name",
];

const FAILURE_REPORT: &str = "failure report";

/// Everything a handler needs besides the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerRequest {
    /// Limit captured from the question, if any
    pub limit: Option<usize>,
    /// Limit used when the question gives none
    pub default_limit: usize,
    /// Trailing window for failure trends
    pub trend_window_days: i64,
    /// Reference time for trailing windows
    pub now: NaiveDateTime,
}

impl HandlerRequest {
    /// Request for a matched intent
    #[must_use]
    pub fn new(matched: &IntentMatch, default_limit: usize, trend_window_days: i64, now: NaiveDateTime) -> Self {
        Self {
            limit: matched.limit,
            default_limit,
            trend_window_days,
            now,
        }
    }

    /// Captured limit or the default
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(self.default_limit)
    }
}

/// Handler for an intent
#[must_use]
pub fn handler_for(intent: Intent) -> Handler {
    match intent {
        Intent::AirlineFlights => airline_flights,
        Intent::TopDepartureDates => top_departure_dates,
        Intent::TopArrivalDates => top_arrival_dates,
        Intent::FlightClassDistribution => flight_class_distribution,
        Intent::FareStatistics => fare_statistics,
        Intent::CommonExtras => common_extras,
        Intent::BookingStatusCounts => booking_status_counts,
        Intent::FrequentGates => frequent_gates,
        Intent::FrequentTerminals => frequent_terminals,
        Intent::LayoverCounts => layover_counts,
        Intent::FrequentLayoverLocations => frequent_layover_locations,
        Intent::AircraftTypeCounts => aircraft_type_counts,
        Intent::RewardProgramDistribution => reward_program_distribution,
        Intent::AverageFarePerAirline => average_fare_per_airline,
        Intent::AverageDurationPerAirline => average_duration_per_airline,
        Intent::AisleSeatDistribution => aisle_seat_distribution,
        Intent::FailureCategoryCounts => failure_category_counts,
        Intent::FailureTrends => failure_trends,
        Intent::FailuresByAccount => failures_by_account,
        Intent::RecentFailures => recent_failures,
    }
}

fn points<K: ToString>(table: &FrequencyTable<K>) -> Vec<(String, Number)> {
    table
        .entries()
        .iter()
        .map(|(key, count)| (key.to_string(), Number::from(*count)))
        .collect()
}

fn airline_points(averages: &[AirlineAverage]) -> Vec<(String, Number)> {
    averages
        .iter()
        .map(|avg| (airline_name(avg.airline_id).to_string(), Number::Float(avg.value)))
        .collect()
}

fn airline_flights(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    let counts = source.airline_flight_counts();
    let (airline, flights) = counts
        .first()
        .ok_or(HandlerError::EmptySource { what: "flight bookings" })?;
    Ok(Envelope::text(format!("{airline} has the most flights with {flights} flights")))
}

fn top_departure_dates(source: &dyn AnalyticsSource, request: &HandlerRequest) -> HandlerResult {
    let limit = request.limit();
    let dates = source.top_departure_dates(limit);
    Ok(Envelope::bar_chart(format!("Top {limit} Departure Dates"), points(&dates)))
}

fn top_arrival_dates(source: &dyn AnalyticsSource, request: &HandlerRequest) -> HandlerResult {
    let limit = request.limit();
    let dates = source.top_arrival_dates(limit);
    Ok(Envelope::bar_chart(format!("Top {limit} Arrival Dates"), points(&dates)))
}

fn flight_class_distribution(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::pie_chart(
        "Flight Class Distribution",
        points(&source.flight_class_distribution()),
    ))
}

fn fare_statistics(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    let Some(stats) = source.fare_statistics() else {
        return Ok(Envelope::text("Fare statistics are not available."));
    };

    let std_dev = stats.std_dev.map_or_else(|| "n/a".to_string(), |std| format!("{std:.2}"));
    Ok(Envelope::text(format!(
        "Fare Statistics: Count={}, Mean={:.2}, Min={:.2}, Max={:.2}, Std={}",
        stats.count, stats.mean, stats.min, stats.max, std_dev
    )))
}

fn common_extras(source: &dyn AnalyticsSource, request: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::bar_chart(
        "Most Common Extras Purchased",
        points(&source.common_extras(request.default_limit)),
    ))
}

fn booking_status_counts(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::bar_chart("Booking Status Counts", points(&source.booking_status_counts())))
}

fn frequent_gates(source: &dyn AnalyticsSource, request: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::bar_chart(
        "Most Frequent Gates",
        points(&source.frequent_gates(request.default_limit)),
    ))
}

fn frequent_terminals(source: &dyn AnalyticsSource, request: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::bar_chart(
        "Most Frequent Terminals",
        points(&source.frequent_terminals(request.default_limit)),
    ))
}

fn layover_counts(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::bar_chart("Number of Layovers", points(&source.layover_counts())))
}

fn frequent_layover_locations(source: &dyn AnalyticsSource, request: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::bar_chart(
        "Most Frequent Layover Locations",
        points(&source.frequent_layover_locations(request.default_limit)),
    ))
}

fn aircraft_type_counts(source: &dyn AnalyticsSource, request: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::bar_chart(
        "Most Frequent Aircraft Types",
        points(&source.aircraft_type_counts(request.default_limit)),
    ))
}

fn reward_program_distribution(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::pie_chart(
        "Reward Program Member Distribution",
        points(&source.reward_program_distribution()),
    ))
}

fn average_fare_per_airline(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::bar_chart(
        "Average Fare by Airline",
        airline_points(&source.average_fare_per_airline()),
    ))
}

fn average_duration_per_airline(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::bar_chart(
        "Average Flight Duration by Airline (hours)",
        airline_points(&source.average_duration_per_airline()),
    ))
}

fn aisle_seat_distribution(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    Ok(Envelope::pie_chart(
        "Aisle Seat Preference Distribution",
        points(&source.aisle_seat_distribution()),
    ))
}

fn failure_category_counts(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    let counts = source
        .failure_counts_by_category()
        .ok_or(HandlerError::DataUnavailable { what: FAILURE_REPORT })?;
    Ok(Envelope::pie_chart("Failure Counts by Category", points(&counts)))
}

fn failure_trends(source: &dyn AnalyticsSource, request: &HandlerRequest) -> HandlerResult {
    let trends = source
        .failure_trends(request.now, request.trend_window_days)
        .ok_or(HandlerError::DataUnavailable { what: FAILURE_REPORT })?;

    // busiest day, earliest on ties
    let highlight = trends
        .iter()
        .fold(None, |best: Option<&DailyCount>, day| match best {
            Some(current) if current.count >= day.count => Some(current),
            _ => Some(day),
        })
        .map(|day| day.date.to_string());

    Ok(Envelope::TimeSeries {
        data: TimeSeriesData {
            labels: trends.iter().map(|day| day.date.to_string()).collect(),
            values: trends.iter().map(|day| Number::from(day.count)).collect(),
            title: "Failure Trends Over Time".to_string(),
            highlight,
        },
    })
}

fn failures_by_account(source: &dyn AnalyticsSource, _: &HandlerRequest) -> HandlerResult {
    let counts = source
        .failures_by_account()
        .ok_or(HandlerError::DataUnavailable { what: FAILURE_REPORT })?;
    Ok(Envelope::bar_chart("Failures by Account", points(&counts)))
}

fn recent_failures(source: &dyn AnalyticsSource, request: &HandlerRequest) -> HandlerResult {
    let failures = source
        .recent_failures(request.limit())
        .ok_or(HandlerError::DataUnavailable { what: FAILURE_REPORT })?;

    let rows = failures
        .into_iter()
        .map(|failure| {
            vec![
                failure.case_number,
                failure.opened_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                failure.category,
                failure.subcategory,
                failure.subject,
                failure.account_name,
            ]
        })
        .collect();

    Ok(Envelope::Table {
        data: TableData {
            headers: RECENT_FAILURE_HEADERS.iter().map(ToString::to_string).collect(),
            rows,
        },
    })
}
