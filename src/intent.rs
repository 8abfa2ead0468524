//! Intent recognition by ordered regular-expression patterns.
//!
//! Patterns are tested in declaration order against the normalized query
//! (trimmed, lowercased) with a substring search; the first hit wins.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A question the system knows how to answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Airline with the most bookings, as a sentence
    AirlineFlights,
    /// Busiest departure dates, top N
    TopDepartureDates,
    /// Busiest arrival dates, top N
    TopArrivalDates,
    /// Bookings per flight class
    FlightClassDistribution,
    /// Count, mean, min, max and spread of fares
    FareStatistics,
    /// Most purchased extras
    CommonExtras,
    /// Bookings per status
    BookingStatusCounts,
    /// Most used gates
    FrequentGates,
    /// Most used terminals
    FrequentTerminals,
    /// Bookings per number of layovers
    LayoverCounts,
    /// Most common layover airports
    FrequentLayoverLocations,
    /// Most flown aircraft types
    AircraftTypeCounts,
    /// Reward members against non-members
    RewardProgramDistribution,
    /// Mean fare of each airline
    AverageFarePerAirline,
    /// Mean flight duration of each airline
    AverageDurationPerAirline,
    /// Aisle seat bookings against the rest
    AisleSeatDistribution,
    /// Failure cases per category
    FailureCategoryCounts,
    /// Failure cases per day over the trailing window
    FailureTrends,
    /// Failure cases per account
    FailuresByAccount,
    /// Newest failure cases, top N
    RecentFailures,
}

/// Intents with their patterns, in match precedence order
static INTENT_PATTERNS: [(Intent, &str); 20] = [
    (Intent::AirlineFlights, r"(?:which|what) airline has the most flights?"),
    (
        Intent::TopDepartureDates,
        r"(?:what are|show me) the top (?:(\d+) )?most frequent departure dates",
    ),
    (
        Intent::TopArrivalDates,
        r"(?:what are|show me) the top (?:(\d+) )?most frequent arrival dates",
    ),
    (
        Intent::FlightClassDistribution,
        r"(?:what is|show me) the distribution of flight classes",
    ),
    (Intent::FareStatistics, r"(?:what are|show me) the descriptive statistics of fare"),
    (Intent::CommonExtras, r"(?:what are|show me) the most common extras purchased"),
    (
        Intent::BookingStatusCounts,
        r"(?:what are|show me) the counts of different booking statuses",
    ),
    (Intent::FrequentGates, r"(?:what are|show me) the most frequent gates"),
    (Intent::FrequentTerminals, r"(?:what are|show me) the most frequent terminals"),
    (
        Intent::LayoverCounts,
        r"(?:what are|show me) the counts of flights with different numbers of layovers",
    ),
    (
        Intent::FrequentLayoverLocations,
        r"(?:what are|show me) the most frequent layover locations",
    ),
    (
        Intent::AircraftTypeCounts,
        r"(?:what are|show me) the counts of different aircraft types",
    ),
    (
        Intent::RewardProgramDistribution,
        r"(?:what is|show me) the distribution of reward program members vs\. non-members",
    ),
    (
        Intent::AverageFarePerAirline,
        r"(?:what is|show me) the average fare for each airline",
    ),
    (
        Intent::AverageDurationPerAirline,
        r"(?:what is|show me) the average duration of flights for each airline",
    ),
    (
        Intent::AisleSeatDistribution,
        r"(?:what is|show me) the distribution of aisle seat preferences",
    ),
    (
        Intent::FailureCategoryCounts,
        r"(?:what are|show me) the failure counts by category",
    ),
    (Intent::FailureTrends, r"(?:what are|show me) the failure trends"),
    (Intent::FailuresByAccount, r"(?:what are|show me) the failures by account"),
    (
        Intent::RecentFailures,
        r"(?:what are|show me) the (?:(\d+) )?most recent failures",
    ),
];

impl Intent {
    /// Every intent in precedence order
    pub fn all() -> impl Iterator<Item = Intent> {
        INTENT_PATTERNS.iter().map(|(intent, _)| *intent)
    }

    /// Stable snake_case name used in logs and metrics
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AirlineFlights => "airline_flights",
            Self::TopDepartureDates => "top_departure_dates",
            Self::TopArrivalDates => "top_arrival_dates",
            Self::FlightClassDistribution => "flight_class_distribution",
            Self::FareStatistics => "fare_statistics",
            Self::CommonExtras => "common_extras",
            Self::BookingStatusCounts => "booking_status_counts",
            Self::FrequentGates => "frequent_gates",
            Self::FrequentTerminals => "frequent_terminals",
            Self::LayoverCounts => "layover_counts",
            Self::FrequentLayoverLocations => "frequent_layover_locations",
            Self::AircraftTypeCounts => "aircraft_type_counts",
            Self::RewardProgramDistribution => "reward_program_distribution",
            Self::AverageFarePerAirline => "average_fare_per_airline",
            Self::AverageDurationPerAirline => "average_duration_per_airline",
            Self::AisleSeatDistribution => "aisle_seat_distribution",
            Self::FailureCategoryCounts => "failure_category_counts",
            Self::FailureTrends => "failure_trends",
            Self::FailuresByAccount => "failures_by_account",
            Self::RecentFailures => "recent_failures",
        }
    }

    /// A phrasing that matches this intent
    #[must_use]
    pub const fn example(self) -> &'static str {
        match self {
            Self::AirlineFlights => "Which airline has the most flights?",
            Self::TopDepartureDates => "What are the top 5 most frequent departure dates?",
            Self::TopArrivalDates => "What are the top 5 most frequent arrival dates?",
            Self::FlightClassDistribution => "What is the distribution of flight classes?",
            Self::FareStatistics => "What are the descriptive statistics of fare?",
            Self::CommonExtras => "What are the most common extras purchased?",
            Self::BookingStatusCounts => "What are the counts of different booking statuses?",
            Self::FrequentGates => "What are the most frequent gates?",
            Self::FrequentTerminals => "What are the most frequent terminals?",
            Self::LayoverCounts => "What are the counts of flights with different numbers of layovers?",
            Self::FrequentLayoverLocations => "What are the most frequent layover locations?",
            Self::AircraftTypeCounts => "What are the counts of different aircraft types?",
            Self::RewardProgramDistribution => {
                "What is the distribution of reward program members vs. non-members?"
            },
            Self::AverageFarePerAirline => "What is the average fare for each airline?",
            Self::AverageDurationPerAirline => "What is the average duration of flights for each airline?",
            Self::AisleSeatDistribution => "What is the distribution of aisle seat preferences?",
            Self::FailureCategoryCounts => "What are the failure counts by category?",
            Self::FailureTrends => "What are the failure trends over time?",
            Self::FailuresByAccount => "What are the failures by account?",
            Self::RecentFailures => "What are the 10 most recent failures?",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a successful match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentMatch {
    /// Recognized intent
    pub intent: Intent,
    /// Integer captured by the pattern, if any
    pub limit: Option<usize>,
}

impl IntentMatch {
    /// Captured limit, or `default` when the question gave none
    #[must_use]
    pub fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default)
    }
}

/// Trim and lowercase query text
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Ordered list of compiled intent patterns
#[derive(Debug, Clone)]
pub struct IntentMatcher {
    patterns: Vec<(Intent, Regex)>,
}

impl IntentMatcher {
    /// Compile the built-in pattern table
    pub fn new() -> Result<Self> {
        let patterns = INTENT_PATTERNS
            .iter()
            .map(|(intent, pattern)| {
                Regex::new(pattern)
                    .map(|regex| (*intent, regex))
                    .map_err(|e| anyhow::anyhow!("Failed to compile pattern for {}: {e}", intent.name()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// First intent whose pattern occurs in the normalized text.
    ///
    /// `None` means nothing matched, which is a normal outcome.
    #[must_use]
    pub fn match_query(&self, text: &str) -> Option<IntentMatch> {
        let normalized = normalize(text);
        self.patterns.iter().find_map(|(intent, regex)| {
            regex.captures(&normalized).map(|captures| IntentMatch {
                intent: *intent,
                // out-of-range numbers fall back to the default like an absent group
                limit: captures.get(1).and_then(|m| m.as_str().parse::<usize>().ok()),
            })
        })
    }

    /// Number of known intents
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when no patterns are loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> IntentMatcher {
        IntentMatcher::new().expect("patterns compile")
    }

    #[test]
    fn test_every_example_matches_its_own_intent() {
        let matcher = matcher();
        for intent in Intent::all() {
            let found = matcher.match_query(intent.example()).map(|m| m.intent);
            assert_eq!(found, Some(intent), "example for {intent} matched {found:?}");
        }
    }

    #[test]
    fn test_matching_ignores_case_and_surrounding_whitespace() {
        let found = matcher().match_query("   WHICH AIRLINE HAS THE MOST FLIGHTS?  \n");
        assert_eq!(found.map(|m| m.intent), Some(Intent::AirlineFlights));
    }

    #[test]
    fn test_partial_match_inside_longer_text() {
        let found = matcher().match_query("Hey, show me the most frequent gates please");
        assert_eq!(found.map(|m| m.intent), Some(Intent::FrequentGates));
    }

    #[test]
    fn test_top_n_capture() {
        let found = matcher()
            .match_query("What are the top 2 most frequent departure dates?")
            .unwrap();
        assert_eq!(found.intent, Intent::TopDepartureDates);
        assert_eq!(found.limit, Some(2));
    }

    #[test]
    fn test_top_n_defaults_when_absent() {
        let found = matcher()
            .match_query("show me the top most frequent arrival dates")
            .unwrap();
        assert_eq!(found.intent, Intent::TopArrivalDates);
        assert_eq!(found.limit, None);
        assert_eq!(found.limit_or(5), 5);
    }

    #[test]
    fn test_no_match_is_none() {
        assert!(matcher().match_query("Tell me something random.").is_none());
        assert!(matcher().match_query("").is_none());
    }

    #[test]
    fn test_not_typo_tolerant() {
        assert!(matcher().match_query("which airlne has the most flights").is_none());
    }

    #[test]
    fn test_singular_flight_still_matches() {
        let found = matcher().match_query("what airline has the most flight");
        assert_eq!(found.map(|m| m.intent), Some(Intent::AirlineFlights));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Hello World \t"), "hello world");
    }
}
