//! Property tests: any text yields a well-formed, repeatable envelope

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use flight_insights::dataset::DatasetStore;
use flight_insights::dispatcher::{QueryDispatcher, QuerySettings};
use flight_insights::intent::Intent;
use flight_insights::loader::read_bookings;
use proptest::prelude::*;

const BOOKINGS: &str = "\
airlie_id,departure_dt,arrival_dt,class,fare,status
1,2025-05-25,2025-05-25,economy,100,confirmed
2,2025-05-26,2025-05-26,business,,confirmed
3,2025-05-27,2025-05-27,economy,140,cancelled
";

const KINDS: [&str; 6] = ["text", "bar_chart", "pie_chart", "time_series", "table", "error"];

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

fn dispatcher() -> QueryDispatcher {
    let store = DatasetStore::new(Some(read_bookings(BOOKINGS.as_bytes()).unwrap()), None);
    QueryDispatcher::new(Arc::new(store), QuerySettings::default())
        .unwrap()
        .with_clock(fixed_now)
}

fn question() -> impl Strategy<Value = String> {
    let examples: Vec<String> = Intent::all().map(|i| i.example().to_string()).collect();
    prop_oneof![
        ".{0,80}",
        proptest::sample::select(examples.clone()),
        (proptest::sample::select(examples), "[ \t]{0,3}", any::<bool>()).prop_map(|(q, pad, upper)| {
            let q = if upper { q.to_uppercase() } else { q };
            format!("{pad}{q}{pad}")
        }),
    ]
}

proptest! {
    #[test]
    fn prop_envelope_is_always_well_formed(text in question()) {
        let envelope = dispatcher().process_query(&text);
        prop_assert!(KINDS.contains(&envelope.kind()));
        prop_assert!(envelope.is_well_formed());
    }

    #[test]
    fn prop_processing_is_idempotent(text in question()) {
        let dispatcher = dispatcher();
        prop_assert_eq!(dispatcher.process_query(&text), dispatcher.process_query(&text));
    }

    #[test]
    fn prop_top_n_returns_at_most_n_labels(n in 1usize..20) {
        let envelope = dispatcher().process_query(&format!("what are the top {n} most frequent arrival dates"));
        let json = serde_json::to_value(&envelope).unwrap();
        let labels = json["data"]["labels"].as_array().map_or(0, Vec::len);
        prop_assert!(labels <= n);
    }
}
