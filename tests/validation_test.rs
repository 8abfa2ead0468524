//! Comprehensive unit tests for validation.rs module

use std::io::Write;

use flight_insights::validation::InputValidator;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_validate_query_valid() {
    assert!(InputValidator::validate_query("Which airline has the most flights?", 500).is_ok());
}

#[test]
fn test_validate_query_empty() {
    assert!(InputValidator::validate_query("", 500).is_err());
    assert!(InputValidator::validate_query(" \t\n", 500).is_err());
}

#[test]
fn test_validate_query_length_limit() {
    let at_limit = "a".repeat(10);
    let over_limit = "a".repeat(11);
    assert!(InputValidator::validate_query(&at_limit, 10).is_ok());
    assert!(InputValidator::validate_query(&over_limit, 10).is_err());
}

#[test]
fn test_validate_query_counts_characters_not_bytes() {
    let accented = "é".repeat(10);
    assert!(InputValidator::validate_query(&accented, 10).is_ok());
}

#[test]
fn test_validate_query_null_byte() {
    assert!(InputValidator::validate_query("which\0airline", 500).is_err());
}

#[test]
fn test_validate_data_path_existing_csv() {
    let mut file = NamedTempFile::with_suffix(".csv").unwrap();
    writeln!(file, "airlie_id,departure_dt,arrival_dt").unwrap();
    assert!(InputValidator::validate_data_path(file.path()).is_ok());
}

#[test]
fn test_validate_data_path_missing() {
    let dir = TempDir::new().unwrap();
    assert!(InputValidator::validate_data_path(&dir.path().join("nope.csv")).is_err());
}

#[test]
fn test_validate_data_path_directory() {
    let dir = TempDir::new().unwrap();
    assert!(InputValidator::validate_data_path(dir.path()).is_err());
}

#[test]
fn test_validate_data_path_empty() {
    assert!(InputValidator::validate_data_path(std::path::Path::new("")).is_err());
}

#[test]
fn test_validate_limit() {
    assert!(InputValidator::validate_limit(5).is_ok());
    assert!(InputValidator::validate_limit(0).is_err());
    assert!(InputValidator::validate_limit(10_001).is_err());
}

#[test]
fn test_sanitize_text() {
    assert_eq!(InputValidator::sanitize_text("  hello world  "), "hello world");
    assert_eq!(InputValidator::sanitize_text("which\u{7}airline"), "whichairline");
    assert_eq!(InputValidator::sanitize_text("line\tone"), "line\tone");
}
