//! Canned answers for a handful of known questions.
//!
//! Consulted only when intent matching or a handler fails. Keys are exact
//! normalized question text (see [`crate::intent::normalize`]); there is no
//! fuzzy matching.

use crate::envelope::{Envelope, Number, TimeSeriesData};

const MOST_FLIGHTS: &str = "United Airlines has the most flights with 1,234 flights";

/// Normalized questions that have a canned answer
pub const BACKUP_QUESTIONS: [&str; 6] = [
    "which airline has the most flights",
    "which airline has most flights",
    "which airline has most flight",
    "what are the top 3 most frequented destinations",
    "show me the average flight delay per airline",
    "which month had the highest number of bookings",
];

/// Canned answer for the normalized question, if one exists
#[must_use]
pub fn lookup(normalized: &str) -> Option<Envelope> {
    let envelope = match normalized {
        "which airline has the most flights" | "which airline has most flights" | "which airline has most flight" => {
            Envelope::text(MOST_FLIGHTS)
        },
        "what are the top 3 most frequented destinations" => Envelope::pie_chart(
            "Top 3 Most Frequented Destinations",
            [
                ("New York (JFK)", 850_u64),
                ("Los Angeles (LAX)", 720),
                ("Chicago (ORD)", 650),
            ],
        ),
        "show me the average flight delay per airline" => Envelope::bar_chart(
            "Average Flight Delay by Airline (minutes)",
            [
                ("United Airlines", 15.5),
                ("Delta Airlines", 12.3),
                ("American Airlines", 18.7),
                ("Southwest Airlines", 10.2),
            ],
        ),
        "which month had the highest number of bookings" => Envelope::TimeSeries {
            data: TimeSeriesData {
                labels: vec!["2024-01".to_string(), "2024-02".to_string(), "2024-03".to_string()],
                values: vec![Number::Integer(2500), Number::Integer(2800), Number::Integer(3200)],
                title: "Monthly Booking Trends".to_string(),
                highlight: Some("2024-03".to_string()),
            },
        },
        _ => return None,
    };
    Some(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_question_has_an_answer() {
        for question in BACKUP_QUESTIONS {
            let envelope = lookup(question).unwrap_or_else(|| panic!("no answer for {question}"));
            assert!(!envelope.is_error());
            assert!(envelope.is_well_formed());
        }
    }

    #[test]
    fn test_lookup_is_exact() {
        assert!(lookup("which airline has the most flights?").is_none());
        assert!(lookup("Which airline has the most flights").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_destination_counts_are_integers() {
        let Some(Envelope::PieChart { data }) = lookup("what are the top 3 most frequented destinations") else {
            panic!("expected a pie chart");
        };
        let encoded = serde_json::to_string(&data.values).unwrap();
        assert_eq!(encoded, "[850,720,650]");
    }

    #[test]
    fn test_month_answer_highlights_peak() {
        let Some(Envelope::TimeSeries { data }) = lookup("which month had the highest number of bookings") else {
            panic!("expected a time series");
        };
        assert_eq!(data.highlight.as_deref(), Some("2024-03"));
    }
}
