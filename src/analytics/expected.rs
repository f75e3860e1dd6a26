use super::series::ReturnSeries;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::feeds::RatePoint;
use serde::Serialize;
use statrs::statistics::Statistics;

/// Trading-day convention used to annualize daily returns.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized decimal rates shared by every symbol of one computation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketContext {
    pub risk_free_rate: f64,
    pub market_return: f64,
}

impl MarketContext {
    /// rf = mean(yield_percent) / 100, rm = annualized mean benchmark return.
    pub fn from_sources(
        risk_free_symbol: &str,
        rates: &[RatePoint],
        benchmark_returns: &ReturnSeries,
    ) -> AnalysisResult<Self> {
        let closes: Vec<f64> = rates
            .iter()
            .map(|r| r.yield_percent)
            .filter(|v| v.is_finite())
            .collect();
        if closes.is_empty() {
            return Err(AnalysisError::MissingData(format!(
                "no risk-free rate observations for {risk_free_symbol}"
            )));
        }
        if benchmark_returns.is_empty() {
            return Err(AnalysisError::MissingData(format!(
                "no returns for benchmark {}",
                benchmark_returns.symbol()
            )));
        }

        let market_return = annualized_return(benchmark_returns);
        if !market_return.is_finite() {
            return Err(AnalysisError::UndefinedValues {
                symbol: benchmark_returns.symbol().to_string(),
                count: benchmark_returns.values().filter(|v| !v.is_finite()).count(),
            });
        }

        Ok(Self {
            risk_free_rate: closes.iter().mean() / 100.0,
            market_return,
        })
    }

    /// Market risk premium, rm - rf.
    #[inline]
    pub fn premium(&self) -> f64 {
        self.market_return - self.risk_free_rate
    }
}

/// CAPM expected return: rf + beta * (rm - rf).
#[inline]
pub fn expected_return(beta: f64, market: &MarketContext) -> f64 {
    market.risk_free_rate + beta * market.premium()
}

/// Realized return, annualized: mean(daily) * 252. NaN for an empty series.
pub fn annualized_return(returns: &ReturnSeries) -> f64 {
    returns.values().mean() * TRADING_DAYS_PER_YEAR
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Performance {
    Outperformed,
    Underperformed,
}

impl std::fmt::Display for Performance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outperformed => write!(f, "outperformed"),
            Self::Underperformed => write!(f, "underperformed"),
        }
    }
}

/// actual >= expected is an outperformance; the boundary is inclusive.
#[inline]
pub fn classify(actual: f64, expected: f64) -> Performance {
    if actual >= expected {
        Performance::Outperformed
    } else {
        Performance::Underperformed
    }
}
