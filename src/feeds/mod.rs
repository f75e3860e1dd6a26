pub mod yahoo;

use crate::analytics::PriceSeries;
use crate::errors::AnalysisResult;
use chrono::NaiveDate;

/// One close of the risk-free-rate instrument, in percent (4.5 = 4.5%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub yield_percent: f64,
}

/// Everything the analysis needs from the outside world.
/// Implementations may return empty series; the pipeline reports those
/// as missing data instead of computing on them.
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Daily closes for `symbol` in `[start, end)`, ascending by date.
    async fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AnalysisResult<PriceSeries>;

    /// Recent closes of a yield instrument over `period` (e.g. "1mo") at
    /// `interval` (e.g. "1d").
    async fn fetch_short_rate(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> AnalysisResult<Vec<RatePoint>>;
}
