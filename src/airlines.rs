//! Compiled-in airline id to display-name lookup.

/// Display name used for ids outside the table.
pub const UNKNOWN_AIRLINE: &str = "Unknown";

/// Airline ids as they appear in the bookings source, with display names.
pub const AIRLINES: [(u32, &str); 19] = [
    (1, "American Airlines"),
    (2, "Delta Air Lines"),
    (3, "United Airlines"),
    (4, "Southwest Airlines"),
    (5, "JetBlue Airways"),
    (6, "Alaska Airlines"),
    (7, "Spirit Airlines"),
    (8, "Frontier Airlines"),
    (9, "Hawaiian Airlines"),
    (10, "Allegiant Air"),
    (11, "Sun Country Airlines"),
    (12, "Silver Airways"),
    (13, "Cape Air"),
    (14, "Boutique Air"),
    (15, "Southern Airways Express"),
    (16, "Advanced Air"),
    (17, "Key Lime Air"),
    (18, "Contour Airlines"),
    (19, "Other"),
];

/// Resolve an airline id to its display name, `"Unknown"` when unmapped.
#[must_use]
pub fn airline_name(id: u32) -> &'static str {
    AIRLINES
        .iter()
        .find(|(airline_id, _)| *airline_id == id)
        .map_or(UNKNOWN_AIRLINE, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids_resolve() {
        assert_eq!(airline_name(1), "American Airlines");
        assert_eq!(airline_name(4), "Southwest Airlines");
        assert_eq!(airline_name(19), "Other");
    }

    #[test]
    fn test_unmapped_ids_are_unknown() {
        assert_eq!(airline_name(0), UNKNOWN_AIRLINE);
        assert_eq!(airline_name(20), UNKNOWN_AIRLINE);
    }
}
