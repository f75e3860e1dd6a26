use crate::charts::{build_dashboard, Dashboard};
use crate::errors::AnalysisError;
use crate::pipeline::{run_analysis, AnalysisRequest, MAX_YEARS, MIN_YEARS};
use crate::state::{AppState, CountersSnapshot, PerfCounters};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct CapmQuery {
    pub tickers: Option<String>,
    /// Kept as text so a bad value gets the same error body as other input errors.
    pub years: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct Defaults {
    pub tickers: String,
    pub years: i64,
    pub min_years: i64,
    pub max_years: i64,
    pub benchmark: String,
    pub risk_free_symbol: String,
}

/// An analysis failure rendered as `{ "error", "kind" }` with a matching status.
pub struct ApiError(pub AnalysisError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            // Only the benchmark can fail a whole pass with missing data.
            AnalysisError::MissingData(_) => StatusCode::NOT_FOUND,
            AnalysisError::DataSource { .. } | AnalysisError::Network(_) | AnalysisError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        (status, Json(body)).into_response()
    }
}

/// API routes plus the static dashboard fallback.
pub fn router(state: Arc<AppState>) -> Router {
    let dist = state.config.dashboard_dir.clone();

    Router::new()
        .route("/api/capm", get(get_capm))
        .route("/api/defaults", get(get_defaults))
        .route("/api/counters", get(get_counters))
        .fallback_service(
            tower_http::services::ServeDir::new(&dist)
                .fallback(tower_http::services::ServeFile::new(dist.join("index.html"))),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}

/// GET /api/capm -- run one full analysis pass and return the dashboard
pub async fn get_capm(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CapmQuery>,
) -> Result<Json<Dashboard>, ApiError> {
    let counters = &state.counters;
    PerfCounters::bump(&counters.requests_received, 1);

    let request = match build_request(&state, &params) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "rejected capm request");
            PerfCounters::bump(&counters.requests_rejected, 1);
            return Err(e.into());
        }
    };

    let analysis = match run_analysis(state.source.as_ref(), request).await {
        Ok(a) => a,
        Err(e) => {
            PerfCounters::bump(&counters.requests_rejected, 1);
            return Err(e.into());
        }
    };

    PerfCounters::bump(&counters.analyses_completed, 1);
    PerfCounters::bump(&counters.symbols_estimated, analysis.symbols.len() as u64);
    PerfCounters::bump(&counters.symbol_issues, analysis.issues.len() as u64);

    Ok(Json(build_dashboard(&analysis)))
}

fn build_request(state: &AppState, params: &CapmQuery) -> Result<AnalysisRequest, AnalysisError> {
    let cfg = &state.config;
    let tickers = params.tickers.as_deref().unwrap_or(&cfg.default_tickers);
    let years = match params.years.as_deref().map(str::trim) {
        None | Some("") => cfg.default_years,
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| AnalysisError::InvalidInput(format!("years must be a whole number, got {raw:?}")))?,
    };
    let today = chrono::Utc::now().date_naive();

    AnalysisRequest::new(tickers, years, today, &cfg.analysis_settings())
}

/// GET /api/defaults -- initial values for the input form
pub async fn get_defaults(State(state): State<Arc<AppState>>) -> Json<Defaults> {
    let cfg = &state.config;
    Json(Defaults {
        tickers: cfg.default_tickers.clone(),
        years: cfg.default_years,
        min_years: MIN_YEARS,
        max_years: MAX_YEARS,
        benchmark: cfg.benchmark_symbol.clone(),
        risk_free_symbol: cfg.risk_free_symbol.clone(),
    })
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<CountersSnapshot> {
    Json(state.counters.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::PriceSeries;
    use crate::config::AppConfig;
    use crate::errors::AnalysisResult;
    use crate::feeds::{MarketDataSource, RatePoint};
    use crate::pipeline::tests::{series, FixtureSource};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Counts every call before delegating to the fixture.
    struct CountingSource {
        inner: FixtureSource,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MarketDataSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_prices(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> AnalysisResult<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_prices(symbol, start, end).await
        }

        async fn fetch_short_rate(
            &self,
            symbol: &str,
            period: &str,
            interval: &str,
        ) -> AnalysisResult<Vec<RatePoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_short_rate(symbol, period, interval).await
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            server_port: 0,
            yahoo_base_url: "http://localhost".into(),
            benchmark_symbol: "^GSPC".into(),
            risk_free_symbol: "^TNX".into(),
            risk_free_period: "1mo".into(),
            risk_free_interval: "1d".into(),
            default_tickers: "TSLA, AAPL".into(),
            default_years: 1,
            max_tickers: 20,
            http_timeout_secs: 1,
            dashboard_dir: "does-not-exist".into(),
        }
    }

    fn app() -> (Router, Arc<AppState>, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            inner: FixtureSource::new(vec![
                series("^GSPC", &[100.0, 101.0, 99.5, 100.5, 102.0]),
                series("AAPL", &[180.0, 183.0, 179.0, 181.5, 185.0]),
                series("TSLA", &[240.0, 250.0, 236.0, 245.0, 255.0]),
            ]),
            calls: AtomicUsize::new(0),
        });
        let state = AppState::new(test_config(), source.clone());
        (router(state.clone()), state, source)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AnalysisError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AnalysisError::MissingData("x".into()), StatusCode::NOT_FOUND),
            (AnalysisError::Network("x".into()), StatusCode::BAD_GATEWAY),
            (AnalysisError::DataSource { status: 500, body: "x".into() }, StatusCode::BAD_GATEWAY),
            (AnalysisError::Alignment("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, want) in cases {
            let kind = err.kind();
            assert_eq!(ApiError(err).status(), want, "status for {kind}");
        }
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_fetch() {
        let (app, state, source) = app();
        let (status, body) = get_json(app, "/api/capm?tickers=AAPL&years=11").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0, "no fetch may happen");
        assert_eq!(state.counters.snapshot().requests_rejected, 1);
    }

    #[tokio::test]
    async fn test_non_numeric_years() {
        let (app, _, source) = app();
        let (status, body) = get_json(app, "/api/capm?tickers=AAPL&years=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_capm_with_fixture_source() {
        let (app, state, _) = app();
        let (status, body) = get_json(app, "/api/capm?tickers=aapl,UNKNOWN&years=2").await;

        assert_eq!(status, StatusCode::OK, "body={body}");
        assert_eq!(body["tickers"], serde_json::json!(["AAPL"]));
        assert_eq!(body["beta_table"]["rows"].as_array().unwrap().len(), 1);
        assert_eq!(body["issues"][0]["symbol"], "UNKNOWN");
        assert!(body["sml"]["traces"].is_array());

        let snap = state.counters.snapshot();
        assert_eq!(snap.analyses_completed, 1);
        assert_eq!(snap.symbols_estimated, 1);
        assert_eq!(snap.symbol_issues, 1);
    }

    #[tokio::test]
    async fn test_capm_uses_default_tickers() {
        let (app, _, _) = app();
        let (status, body) = get_json(app, "/api/capm").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickers"], serde_json::json!(["TSLA", "AAPL"]));
    }

    #[tokio::test]
    async fn test_missing_benchmark_is_upstream_error() {
        let source = Arc::new(FixtureSource::new(vec![series("AAPL", &[1.0, 2.0, 3.0])]));
        let app = router(AppState::new(test_config(), source));
        let (status, body) = get_json(app, "/api/capm?tickers=AAPL").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "data_source");
    }

    #[tokio::test]
    async fn test_empty_benchmark_is_not_found() {
        let mut fixture = FixtureSource::new(vec![series("AAPL", &[1.0, 2.0, 3.0])]);
        fixture.prices.insert("^GSPC".into(), PriceSeries::empty("^GSPC"));
        let app = router(AppState::new(test_config(), Arc::new(fixture)));
        let (status, body) = get_json(app, "/api/capm?tickers=AAPL").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "missing_data");
    }

    #[tokio::test]
    async fn test_defaults() {
        let (app, _, _) = app();
        let (status, body) = get_json(app, "/api/defaults").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickers"], "TSLA, AAPL");
        assert_eq!(body["min_years"], 1);
        assert_eq!(body["max_years"], 10);
        assert_eq!(body["benchmark"], "^GSPC");
    }
}
