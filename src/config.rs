use crate::errors::{AnalysisError, AnalysisResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub yahoo_base_url: String,
    pub benchmark_symbol: String,
    pub risk_free_symbol: String,
    pub risk_free_period: String,
    pub risk_free_interval: String,
    pub default_tickers: String,
    pub default_years: i64,
    pub max_tickers: usize,
    pub http_timeout_secs: u64,
    pub dashboard_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> AnalysisResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| AnalysisError::Config(format!("SERVER_PORT: {e}")))?;

        let default_years = env_var_or("DEFAULT_YEARS", "1")
            .parse::<i64>()
            .map_err(|e| AnalysisError::Config(format!("DEFAULT_YEARS: {e}")))?;

        let max_tickers = env_var_or("MAX_TICKERS", "20")
            .parse::<usize>()
            .map_err(|e| AnalysisError::Config(format!("MAX_TICKERS: {e}")))?;

        let http_timeout_secs = env_var_or("HTTP_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| AnalysisError::Config(format!("HTTP_TIMEOUT_SECS: {e}")))?;

        if max_tickers == 0 {
            return Err(AnalysisError::Config("MAX_TICKERS must be at least 1".into()));
        }

        Ok(Self {
            server_port,
            yahoo_base_url: env_var_or("YAHOO_BASE_URL", "https://query1.finance.yahoo.com"),
            benchmark_symbol: env_var_or("BENCHMARK_SYMBOL", "^GSPC"),
            risk_free_symbol: env_var_or("RISK_FREE_SYMBOL", "^TNX"),
            risk_free_period: env_var_or("RISK_FREE_PERIOD", "1mo"),
            risk_free_interval: env_var_or("RISK_FREE_INTERVAL", "1d"),
            default_tickers: env_var_or("DEFAULT_TICKERS", "TSLA, AAPL"),
            default_years,
            max_tickers,
            http_timeout_secs,
            dashboard_dir: PathBuf::from(env_var_or("DASHBOARD_DIR", "dashboard/dist")),
        })
    }

    /// The subset of settings the analysis pipeline needs.
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            benchmark_symbol: self.benchmark_symbol.clone(),
            risk_free_symbol: self.risk_free_symbol.clone(),
            risk_free_period: self.risk_free_period.clone(),
            risk_free_interval: self.risk_free_interval.clone(),
            max_tickers: self.max_tickers,
        }
    }
}

/// Immutable per-pass settings handed to the pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub benchmark_symbol: String,
    pub risk_free_symbol: String,
    pub risk_free_period: String,
    pub risk_free_interval: String,
    pub max_tickers: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            benchmark_symbol: "^GSPC".into(),
            risk_free_symbol: "^TNX".into(),
            risk_free_period: "1mo".into(),
            risk_free_interval: "1d".into(),
            max_tickers: 20,
        }
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
