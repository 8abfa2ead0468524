use anyhow::{anyhow, Result};
use std::path::Path;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate free-text question before it is queued
    pub fn validate_query(text: &str, max_len: usize) -> Result<()> {
        if text.trim().is_empty() {
            return Err(anyhow!("Query cannot be empty"));
        }

        let length = text.chars().count();
        if length > max_len {
            return Err(anyhow!("Query too long ({length} characters, max {max_len})"));
        }

        if text.contains('\0') {
            return Err(anyhow!("Query contains invalid characters"));
        }

        Ok(())
    }

    /// Validate a CSV source path
    pub fn validate_data_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.trim().is_empty() {
            return Err(anyhow!("Data path cannot be empty"));
        }

        if path_str.len() > 4096 {
            return Err(anyhow!("Data path too long (max 4096 characters)"));
        }

        if !path.exists() {
            return Err(anyhow!("Data file does not exist: {path:?}"));
        }

        if !path.is_file() {
            return Err(anyhow!("Data path is not a file: {path:?}"));
        }

        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            tracing::warn!(path = %path.display(), "Data file does not have a .csv extension");
        }

        Ok(())
    }

    /// Validate a "top N" style limit
    pub fn validate_limit(limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(anyhow!("Limit must be greater than 0"));
        }

        if limit > 10_000 {
            return Err(anyhow!("Limit too large (max 10,000)"));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
