use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub logging: LoggingConfig,
    pub query: QueryConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub bookings_path: String,
    pub failures_path: Option<String>,
    /// Preamble lines at the top of the failure report export
    pub failures_skip_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_limit: usize,
    pub trend_window_days: i64,
    pub max_query_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Job records kept before the oldest are evicted
    pub result_retention: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                bookings_path: "data/Flight Bookings.csv".to_string(),
                failures_path: Some("data/File Failures.csv".to_string()),
                failures_skip_rows: 6,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            query: QueryConfig {
                default_limit: 5,
                trend_window_days: 30,
                max_query_length: 500,
            },
            service: ServiceConfig { result_retention: 1000 },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&AppConfig::default())?)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("flight_insights").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("FLIGHT_INSIGHTS").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.data.bookings_path.trim().is_empty() {
            return Err(anyhow::anyhow!("bookings_path must not be empty"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate query config
        if self.query.default_limit == 0 {
            return Err(anyhow::anyhow!("default_limit must be greater than 0"));
        }
        if self.query.trend_window_days <= 0 {
            return Err(anyhow::anyhow!("trend_window_days must be greater than 0"));
        }
        if self.query.max_query_length == 0 {
            return Err(anyhow::anyhow!("max_query_length must be greater than 0"));
        }

        if self.service.result_retention == 0 {
            return Err(anyhow::anyhow!("result_retention must be greater than 0"));
        }

        Ok(())
    }

    /// Get bookings CSV path from environment or config
    pub fn get_bookings_path(&self) -> String {
        std::env::var("BOOKINGS_CSV").unwrap_or_else(|_| self.data.bookings_path.clone())
    }

    /// Get failure report path from environment or config
    pub fn get_failures_path(&self) -> Option<String> {
        std::env::var("FAILURES_CSV")
            .ok()
            .or_else(|| self.data.failures_path.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// True when console logs should be JSON
    pub fn json_logs(&self) -> bool {
        self.logging.format == "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.data.failures_skip_rows, 6);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.query.default_limit, 5);
        assert_eq!(config.query.trend_window_days, 30);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.query.default_limit = 0;
        assert!(config.validate().is_err());
    }
}
