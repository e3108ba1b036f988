//! Worker configuration loaded from environment variables.

/// Configuration for the allocation worker, with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `OUT_OF_STOCK_EMAIL` — out-of-stock notification recipient
///   (default: `"stock-admin@example.com"`)
/// - `METRICS_PORT` — Prometheus exporter port (default: `9400`)
#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
    pub out_of_stock_recipient: String,
    pub metrics_port: u16,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            log_filter: std::env::var("RUST_LOG").unwrap_or(defaults.log_filter),
            out_of_stock_recipient: std::env::var("OUT_OF_STOCK_EMAIL")
                .unwrap_or(defaults.out_of_stock_recipient),
            metrics_port: std::env::var("METRICS_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.metrics_port),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            out_of_stock_recipient: "stock-admin@example.com".to_string(),
            metrics_port: 9400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.out_of_stock_recipient, "stock-admin@example.com");
        assert_eq!(config.metrics_port, 9400);
    }
}
