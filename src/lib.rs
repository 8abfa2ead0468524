//! Flight Insights - Natural-Language Analytics over Flight Bookings
//!
//! A Rust library that answers a fixed set of plain-English questions about
//! flight bookings and file-failure reports, returning visualization-ready
//! envelopes.
//!
//! # Features
//!
//! - Load booking and failure-report CSV exports into an immutable snapshot
//! - Recognize questions with an ordered list of regular expressions
//! - Answer with text, bar/pie charts, time series or tables
//! - Fall back to canned answers, then to an error envelope
//! - Track submitted questions through a small async job service

/// Airline id to name lookup
pub mod airlines;
/// Canned answers for known questions
pub mod backup;
/// Configuration management
pub mod config;
/// In-memory dataset and aggregations
pub mod dataset;
/// Query routing and fallback
pub mod dispatcher;
/// Response envelope types
pub mod envelope;
/// Error types
pub mod error;
/// Intent-to-envelope handlers
pub mod handlers;
/// Intent recognition
pub mod intent;
/// CSV ingestion
pub mod loader;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Submit/poll job tracking
pub mod service;
/// Numeric helpers
pub mod utils;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use dataset::{AnalyticsSource, DatasetStore};
pub use dispatcher::{Dispatch, QueryDispatcher, QuerySettings, Resolution};
pub use envelope::Envelope;
pub use error::{HandlerError, InsightsError, Result};
pub use intent::{Intent, IntentMatch, IntentMatcher};
pub use service::{BatchItem, QueryId, QueryService, QueryStatus};
