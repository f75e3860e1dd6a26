/// Domain-specific error types for the CAPM analysis service.
/// Per-symbol failures are recorded and reported; they never abort
/// the other symbols of the same request.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("missing data: {0}")]
    MissingData(String),

    #[error("alignment error: {0}")]
    Alignment(String),

    #[error("degenerate regression: {0}")]
    DegenerateRegression(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("undefined values: {count} non-finite observations for {symbol}")]
    UndefinedValues { symbol: String, count: usize },

    #[error("malformed series: {0}")]
    MalformedSeries(String),

    #[error("data source error: {status} {body}")]
    DataSource { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),
}

impl AnalysisError {
    /// Stable tag used in JSON issue lists and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingData(_) => "missing_data",
            Self::Alignment(_) => "alignment",
            Self::DegenerateRegression(_) => "degenerate_regression",
            Self::InvalidInput(_) => "invalid_input",
            Self::UndefinedValues { .. } => "undefined_values",
            Self::MalformedSeries(_) => "malformed_series",
            Self::DataSource { .. } => "data_source",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        AnalysisError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Parse(e.to_string())
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
