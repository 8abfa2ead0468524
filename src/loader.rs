//! CSV ingestion for the bookings table and the failure report.
//!
//! Bookings are load-fatal: any missing required column or unparseable
//! timestamp aborts the load. The failure report is best-effort and is
//! handled by the caller (see [`crate::dataset::DatasetStore::load`]).

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{InsightsError, Result};
use crate::logging::OperationTimer;
use crate::models::{Booking, BookingColumn, BookingsTable, FailureRecord};
use crate::utils::median;

const BOOKINGS: &str = "bookings";
const FAILURES: &str = "failures";

/// Raw bookings row, keyed by the source's header names
#[derive(Debug, Deserialize)]
struct RawBooking {
    #[serde(rename = "airlie_id", alias = "airline_id")]
    airline_id: Option<String>,
    departure_dt: Option<String>,
    arrival_dt: Option<String>,
    #[serde(default)]
    fare: Option<String>,
    #[serde(default, rename = "class")]
    flight_class: Option<String>,
    #[serde(default)]
    extras: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    gate: Option<String>,
    #[serde(default)]
    terminal: Option<String>,
    #[serde(default)]
    layovers: Option<String>,
    #[serde(default)]
    layover_locations: Option<String>,
    #[serde(default)]
    aircraft_type: Option<String>,
    #[serde(default)]
    reward_program_member: Option<String>,
    #[serde(default)]
    aisle_seat: Option<String>,
    #[serde(default)]
    window_seat: Option<String>,
    #[serde(default)]
    duration_hrs: Option<String>,
}

/// Raw failure-report row
#[derive(Debug, Deserialize)]
struct RawFailure {
    #[serde(rename = "Date/Time Opened")]
    opened_at: Option<String>,
    #[serde(default, rename = "Account Name")]
    account_name: Option<String>,
    #[serde(default, rename = "Category")]
    category: Option<String>,
    #[serde(default, rename = "Subcategory")]
    subcategory: Option<String>,
    #[serde(default, rename = "Subject")]
    subject: Option<String>,
    #[serde(default, rename = "Case Number")]
    case_number: Option<String>,
}

/// Optional bookings columns keyed by their raw header names
const OPTIONAL_BOOKING_COLUMNS: [(&str, BookingColumn); 13] = [
    ("fare", BookingColumn::Fare),
    ("class", BookingColumn::FlightClass),
    ("extras", BookingColumn::Extras),
    ("status", BookingColumn::Status),
    ("gate", BookingColumn::Gate),
    ("terminal", BookingColumn::Terminal),
    ("layovers", BookingColumn::Layovers),
    ("layover_locations", BookingColumn::LayoverLocations),
    ("aircraft_type", BookingColumn::AircraftType),
    ("reward_program_member", BookingColumn::RewardMember),
    ("aisle_seat", BookingColumn::AisleSeat),
    ("window_seat", BookingColumn::WindowSeat),
    ("duration_hrs", BookingColumn::DurationHours),
];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Load the bookings CSV from disk
pub fn load_bookings(path: &Path) -> Result<BookingsTable> {
    let timer = OperationTimer::new("load_bookings");
    let file = File::open(path)?;
    let table = read_bookings(BufReader::new(file))?;
    info!(path = %path.display(), rows = table.rows.len(), "Loaded flight bookings");
    timer.finish();
    Ok(table)
}

/// Parse bookings from any CSV reader
pub fn read_bookings<R: Read>(reader: R) -> Result<BookingsTable> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers: HashSet<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    if !headers.contains("airlie_id") && !headers.contains("airline_id") {
        return Err(InsightsError::MissingColumn {
            table: BOOKINGS,
            column: "airlie_id",
        });
    }
    for required in ["departure_dt", "arrival_dt"] {
        if !headers.contains(required) {
            return Err(InsightsError::MissingColumn {
                table: BOOKINGS,
                column: required,
            });
        }
    }

    let columns: HashSet<BookingColumn> = OPTIONAL_BOOKING_COLUMNS
        .iter()
        .filter(|(name, _)| headers.contains(*name))
        .map(|(_, column)| *column)
        .collect();
    debug!(optional_columns = columns.len(), "Bookings header parsed");

    let mut rows = Vec::new();
    let mut fares: Vec<Option<f64>> = Vec::new();

    for (index, record) in csv_reader.deserialize::<RawBooking>().enumerate() {
        let row = index + 1;
        let raw = record?;
        fares.push(parse_f64(raw.fare.as_deref()));
        rows.push(booking_from_raw(raw, row)?);
    }

    // blank fares take the median of the parsed ones
    let parsed: Vec<f64> = fares.iter().flatten().copied().collect();
    let fill = median(&parsed).unwrap_or(0.0);
    let missing = fares.iter().filter(|fare| fare.is_none()).count();
    if missing > 0 && columns.contains(&BookingColumn::Fare) {
        debug!(missing, fill, "Filling blank fares with the median");
    }
    for (booking, fare) in rows.iter_mut().zip(fares) {
        booking.fare = fare.unwrap_or(fill);
    }

    Ok(BookingsTable { rows, columns })
}

fn booking_from_raw(raw: RawBooking, row: usize) -> Result<Booking> {
    let airline_text = raw.airline_id.unwrap_or_default();
    let airline_id = parse_airline_id(&airline_text).ok_or_else(|| InsightsError::InvalidNumber {
        column: "airlie_id",
        row,
        value: airline_text.clone(),
    })?;

    Ok(Booking {
        airline_id,
        departure: required_timestamp(raw.departure_dt.as_deref(), "departure_dt", row)?,
        arrival: required_timestamp(raw.arrival_dt.as_deref(), "arrival_dt", row)?,
        fare: 0.0,
        flight_class: non_blank(raw.flight_class),
        extras: non_blank(raw.extras),
        status: non_blank(raw.status),
        gate: non_blank(raw.gate),
        terminal: non_blank(raw.terminal),
        layovers: parse_f64(raw.layovers.as_deref()).map(|n| n.max(0.0) as u32),
        layover_locations: non_blank(raw.layover_locations),
        aircraft_type: non_blank(raw.aircraft_type),
        is_reward_member: parse_bool(raw.reward_program_member.as_deref()),
        has_aisle_seat: parse_bool(raw.aisle_seat.as_deref()),
        has_window_seat: parse_bool(raw.window_seat.as_deref()),
        duration_hours: parse_f64(raw.duration_hrs.as_deref()),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Load the failure report from disk, skipping `skip_rows` preamble lines
pub fn load_failures(path: &Path, skip_rows: usize) -> Result<Vec<FailureRecord>> {
    let timer = OperationTimer::new("load_failures");
    let file = File::open(path)?;
    let records = read_failures(BufReader::new(file), skip_rows)?;
    info!(path = %path.display(), rows = records.len(), "Loaded failure reports");
    timer.finish();
    Ok(records)
}

/// Parse failure records from any reader, skipping `skip_rows` preamble lines
pub fn read_failures<R: Read>(mut reader: R, skip_rows: usize) -> Result<Vec<FailureRecord>> {
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    let body = skip_lines(&contents, skip_rows);

    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    if !csv_reader.headers()?.iter().any(|h| h == "Date/Time Opened") {
        return Err(InsightsError::MissingColumn {
            table: FAILURES,
            column: "Date/Time Opened",
        });
    }

    let mut records = Vec::new();
    for (index, record) in csv_reader.deserialize::<RawFailure>().enumerate() {
        let row = index + 1;
        let raw = record?;

        // report footers leave rows with no timestamp behind
        if raw.opened_at.as_deref().map_or(true, str::is_empty) {
            warn!(row, "Skipping failure row without an opened-at timestamp");
            continue;
        }

        records.push(FailureRecord {
            opened_at: required_timestamp(raw.opened_at.as_deref(), "Date/Time Opened", row)?,
            case_number: raw.case_number.unwrap_or_default(),
            account_name: raw.account_name.unwrap_or_default(),
            category: raw.category.unwrap_or_default(),
            subcategory: raw.subcategory.unwrap_or_default(),
            subject: raw.subject.unwrap_or_default(),
        });
    }

    Ok(records)
}

fn skip_lines(contents: &str, count: usize) -> &str {
    let mut rest = contents;
    for _ in 0..count {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

/// Parse a timestamp in any of the accepted layouts
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn required_timestamp(value: Option<&str>, column: &'static str, row: usize) -> Result<NaiveDateTime> {
    let text = value.unwrap_or_default();
    parse_timestamp(text).ok_or_else(|| InsightsError::InvalidDate {
        column,
        row,
        value: text.to_string(),
    })
}

fn parse_airline_id(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().or_else(|| {
        // ids exported as floats, e.g. "3.0"
        value
            .parse::<f64>()
            .ok()
            .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX))
            .map(|n| n as u32)
    })
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Interpret the source's boolean spellings; blanks are false
#[must_use]
pub fn parse_bool(value: Option<&str>) -> bool {
    matches!(
        value.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "t" | "yes" | "y" | "1" | "1.0")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOKINGS_CSV: &str = "\
airlie_id,departure_dt,arrival_dt,class,fare,extras,status,gate,terminal,layovers,layover_locations,aircraft_type,reward_program_member,duration_hrs
1,2025-05-25,2025-05-25,economy,100,wifi,confirmed,A1,1,0,,737,True,2.5
2,2025-05-26,2025-05-26,business,,meal,confirmed,B2,2,1,JFK,A320,False,4.0
1,2025-05-25,2025-05-25,economy,120,none,cancelled,A1,1,0,,737,True,2.7
";

    #[test]
    fn test_read_bookings_renames_and_parses() {
        let table = read_bookings(BOOKINGS_CSV.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 3);

        let first = &table.rows[0];
        assert_eq!(first.airline_id, 1);
        assert_eq!(first.flight_class.as_deref(), Some("economy"));
        assert!(first.is_reward_member);
        assert_eq!(first.layover_locations, None);
        assert_eq!(table.rows[1].layover_locations.as_deref(), Some("JFK"));

        assert!(table.has(BookingColumn::FlightClass));
        assert!(!table.has(BookingColumn::AisleSeat));
    }

    #[test]
    fn test_blank_fare_takes_median() {
        let table = read_bookings(BOOKINGS_CSV.as_bytes()).unwrap();
        assert_eq!(table.rows[1].fare, 110.0);
    }

    #[test]
    fn test_blank_optional_cells_stay_empty() {
        let csv = "\
airlie_id,departure_dt,arrival_dt,class,gate,layovers,aircraft_type,duration_hrs
1,2025-05-25,2025-05-25,,  ,,,
";
        let table = read_bookings(csv.as_bytes()).unwrap();
        let row = &table.rows[0];
        assert_eq!(row.flight_class, None);
        assert_eq!(row.gate, None);
        assert_eq!(row.layovers, None);
        assert_eq!(row.aircraft_type, None);
        assert_eq!(row.duration_hours, None);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let csv = "airlie_id,departure_dt\n1,2025-05-25\n";
        let err = read_bookings(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, InsightsError::MissingColumn { column: "arrival_dt", .. }));
    }

    #[test]
    fn test_bad_timestamp_is_fatal() {
        let csv = "airlie_id,departure_dt,arrival_dt\n1,not-a-date,2025-05-25\n";
        let err = read_bookings(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, InsightsError::InvalidDate { row: 1, .. }));
    }

    #[test]
    fn test_read_failures_skips_preamble() {
        let csv = "\
File Failure Report
Generated 2025-03-26

Date/Time Opened,Account Name,Category,Subcategory,Subject,Case Number
2025-05-20 10:00:00,Alpha Corp,System Error,Database,Login Failure,CASE001
2025-05-19 12:00:00,Beta Inc,Network Issue,Connectivity,Intermittent Outage,CASE002
";
        let records = read_failures(csv.as_bytes(), 3).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].case_number, "CASE001");
        assert_eq!(records[1].category, "Network Issue");
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        assert!(parse_timestamp("2025-05-25").is_some());
        assert!(parse_timestamp("2025-05-25 10:30").is_some());
        assert!(parse_timestamp("2025-05-25T10:30:00").is_some());
        assert!(parse_timestamp("5/25/2025 10:30").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_bool_spellings() {
        assert!(parse_bool(Some("True")));
        assert!(parse_bool(Some("yes")));
        assert!(parse_bool(Some("1")));
        assert!(!parse_bool(Some("False")));
        assert!(!parse_bool(None));
    }
}
