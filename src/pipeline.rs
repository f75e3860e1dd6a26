use crate::analytics::normalize::normalize_aligned;
use crate::analytics::returns::{aligned_returns, AlignedReturns};
use crate::analytics::{
    annualized_return, classify, estimate_capm, expected_return, AlignedPrices, CapmEstimate,
    MarketContext, Performance, PriceSeries,
};
use crate::config::AnalysisSettings;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::feeds::{MarketDataSource, RatePoint};
use chrono::{Months, NaiveDate};
use futures_util::future::join_all;
use smallvec::SmallVec;
use tracing::Instrument;
use uuid::Uuid;

pub const MIN_YEARS: i64 = 1;
pub const MAX_YEARS: i64 = 10;

/// Where the risk-free rate comes from for this pass.
#[derive(Debug, Clone)]
pub struct RiskFreeSource {
    pub symbol: String,
    pub period: String,
    pub interval: String,
}

/// Immutable context for one computation pass. Built once per request and
/// passed explicitly to every stage.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub request_id: Uuid,
    pub tickers: Vec<String>,
    pub years: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub benchmark: String,
    pub risk_free: RiskFreeSource,
}

impl AnalysisRequest {
    /// Validate user input before anything is fetched.
    pub fn new(
        raw_tickers: &str,
        years: i64,
        today: NaiveDate,
        settings: &AnalysisSettings,
    ) -> AnalysisResult<Self> {
        let tickers = parse_tickers(raw_tickers);
        if tickers.is_empty() {
            return Err(AnalysisError::InvalidInput("ticker list is empty".into()));
        }
        if tickers.len() > settings.max_tickers {
            return Err(AnalysisError::InvalidInput(format!(
                "{} tickers requested, at most {} allowed",
                tickers.len(),
                settings.max_tickers
            )));
        }
        if !(MIN_YEARS..=MAX_YEARS).contains(&years) {
            return Err(AnalysisError::InvalidInput(format!(
                "horizon of {years} years is outside [{MIN_YEARS}, {MAX_YEARS}]"
            )));
        }

        // Calendar years back from today; Feb 29 clamps to Feb 28.
        let start = today
            .checked_sub_months(Months::new(12 * years as u32))
            .ok_or_else(|| AnalysisError::InvalidInput(format!("cannot go {years} years back from {today}")))?;

        Ok(Self {
            request_id: Uuid::new_v4(),
            tickers,
            years,
            start,
            end: today,
            benchmark: settings.benchmark_symbol.clone(),
            risk_free: RiskFreeSource {
                symbol: settings.risk_free_symbol.clone(),
                period: settings.risk_free_period.clone(),
                interval: settings.risk_free_interval.clone(),
            },
        })
    }
}

/// Split a comma-separated ticker list: trimmed, uppercased, empties and
/// repeats dropped, first occurrence order kept.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in raw.split(',').map(|t| t.trim().to_uppercase()) {
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

/// A per-symbol (or session-level) failure that did not abort the pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SymbolIssue {
    pub symbol: String,
    pub kind: &'static str,
    pub message: String,
}

impl SymbolIssue {
    pub fn new(symbol: &str, error: &AnalysisError) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// CAPM results for one successfully estimated stock.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub estimate: CapmEstimate,
    /// Annualized realized return over the aligned window.
    pub actual_return: f64,
    /// Absent when the market context could not be built.
    pub expected_return: Option<f64>,
    pub performance: Option<Performance>,
}

/// Output of one computation pass. Dropped after the response is built.
#[derive(Debug)]
pub struct Analysis {
    pub request: AnalysisRequest,
    pub prices: AlignedPrices,
    pub normalized: Vec<PriceSeries>,
    pub returns: AlignedReturns,
    pub market: Option<MarketContext>,
    pub symbols: Vec<SymbolAnalysis>,
    pub issues: SmallVec<[SymbolIssue; 4]>,
}

/// Fetch everything the request needs, then run the pure analysis.
///
/// Stock and benchmark fetches run concurrently; results are re-associated
/// with their tickers, so completion order never matters. A benchmark that
/// cannot be fetched fails the whole pass since no regression is possible
/// without it.
pub async fn run_analysis(
    source: &dyn MarketDataSource,
    request: AnalysisRequest,
) -> AnalysisResult<Analysis> {
    let span = tracing::info_span!("analysis", request_id = %request.request_id);

    async move {
        tracing::info!(
            tickers = ?request.tickers,
            start = %request.start,
            end = %request.end,
            source = source.name(),
            "analysis started"
        );

        let stock_fetches = request
            .tickers
            .iter()
            .map(|t| source.fetch_prices(t, request.start, request.end));
        let rf = &request.risk_free;

        let (stocks, benchmark, rates) = tokio::join!(
            join_all(stock_fetches),
            source.fetch_prices(&request.benchmark, request.start, request.end),
            source.fetch_short_rate(&rf.symbol, &rf.period, &rf.interval),
        );

        let benchmark = benchmark.map_err(|e| {
            tracing::error!(benchmark = %request.benchmark, error = %e, "benchmark fetch failed");
            e
        })?;
        let stocks: Vec<(String, AnalysisResult<PriceSeries>)> =
            request.tickers.iter().cloned().zip(stocks).collect();

        let analysis = analyze(request, benchmark, stocks, rates)?;
        tracing::info!(
            estimated = analysis.symbols.len(),
            issues = analysis.issues.len(),
            rows = analysis.prices.len(),
            "analysis finished"
        );
        Ok(analysis)
    }
    .instrument(span)
    .await
}

/// The synchronous core of one pass: join, returns, normalization, market
/// context, then CAPM per stock. Each symbol's failure is recorded as an
/// issue and never affects the other symbols.
pub fn analyze(
    request: AnalysisRequest,
    benchmark: PriceSeries,
    stocks: Vec<(String, AnalysisResult<PriceSeries>)>,
    rates: AnalysisResult<Vec<RatePoint>>,
) -> AnalysisResult<Analysis> {
    let mut issues: SmallVec<[SymbolIssue; 4]> = SmallVec::new();

    if benchmark.is_empty() {
        return Err(AnalysisError::MissingData(format!(
            "no observations for benchmark {} between {} and {}",
            request.benchmark, request.start, request.end
        )));
    }

    let mut fetched = Vec::with_capacity(stocks.len());
    for (symbol, res) in stocks {
        match res {
            Ok(series) => fetched.push(series),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "price fetch failed");
                issues.push(SymbolIssue::new(&symbol, &e));
            }
        }
    }

    let (prices, rejected) = AlignedPrices::join(&benchmark, fetched)?;
    for r in rejected {
        tracing::warn!(symbol = %r.symbol, error = %r.error, "symbol not aligned");
        issues.push(SymbolIssue::new(&r.symbol, &r.error));
    }

    let returns = aligned_returns(&prices);
    let normalized = normalize_aligned(&prices);

    let rf_symbol = request.risk_free.symbol.as_str();
    let market = match rates
        .and_then(|r| MarketContext::from_sources(rf_symbol, &r, returns.benchmark()))
    {
        Ok(m) => {
            tracing::info!(rf = m.risk_free_rate, rm = m.market_return, "market context ready");
            Some(m)
        }
        Err(e) => {
            tracing::warn!(symbol = %rf_symbol, error = %e, "no market context, expected returns omitted");
            issues.push(SymbolIssue::new(rf_symbol, &e));
            None
        }
    };

    let mut symbols = Vec::with_capacity(returns.stocks().len());
    for stock in returns.stocks() {
        match estimate_capm(stock, returns.benchmark()) {
            Ok(estimate) => {
                let actual_return = annualized_return(stock);
                let expected = market.as_ref().map(|m| expected_return(estimate.beta, m));
                tracing::debug!(
                    symbol = %stock.symbol(),
                    beta = estimate.beta,
                    alpha = estimate.alpha,
                    "capm estimated"
                );
                symbols.push(SymbolAnalysis {
                    symbol: stock.symbol().to_string(),
                    estimate,
                    actual_return,
                    expected_return: expected,
                    performance: expected.map(|e| classify(actual_return, e)),
                });
            }
            Err(e) => {
                tracing::warn!(symbol = %stock.symbol(), error = %e, "capm estimation failed");
                issues.push(SymbolIssue::new(stock.symbol(), &e));
            }
        }
    }

    Ok(Analysis {
        request,
        prices,
        normalized,
        returns,
        market,
        symbols,
        issues,
    })
}
