use super::series::{AlignedPrices, PriceSeries, ReturnSeries};
use chrono::NaiveDate;

/// Simple daily returns: r[t] = p[t] / p[t-1] - 1.
///
/// The first date has no previous close and is dropped, so the result is one
/// element shorter than the input. A zero previous close, or a non-finite
/// close on either side, yields NaN for that date. Nothing is imputed.
pub fn daily_returns(prices: &PriceSeries) -> ReturnSeries {
    let points = prices
        .points()
        .windows(2)
        .map(|w| (w[1].0, simple_return(w[0].1, w[1].1)))
        .collect();
    ReturnSeries::from_ordered(prices.symbol(), points)
}

#[inline]
fn simple_return(prev: f64, curr: f64) -> f64 {
    if prev == 0.0 || !prev.is_finite() || !curr.is_finite() {
        return f64::NAN;
    }
    curr / prev - 1.0
}

/// Returns for every column of an aligned table, on one shared date axis.
#[derive(Debug, Clone)]
pub struct AlignedReturns {
    dates: Vec<NaiveDate>,
    benchmark: ReturnSeries,
    stocks: Vec<ReturnSeries>,
}

impl AlignedReturns {
    #[inline]
    pub fn benchmark(&self) -> &ReturnSeries {
        &self.benchmark
    }

    #[inline]
    pub fn stocks(&self) -> &[ReturnSeries] {
        &self.stocks
    }

    pub fn stock(&self, symbol: &str) -> Option<&ReturnSeries> {
        self.stocks.iter().find(|s| s.symbol() == symbol)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }
}

/// Apply [`daily_returns`] to every column. All columns share the price axis,
/// so exactly the first row is dropped from each.
pub fn aligned_returns(prices: &AlignedPrices) -> AlignedReturns {
    AlignedReturns {
        dates: prices.dates().iter().skip(1).copied().collect(),
        benchmark: daily_returns(prices.benchmark()),
        stocks: prices.stocks().iter().map(daily_returns).collect(),
    }
}
