use crate::errors::{AnalysisError, AnalysisResult};
use chrono::NaiveDate;

/// Fewest shared dates that still leave two return rows for a regression.
pub const MIN_ALIGNED_DATES: usize = 3;

/// Daily closes for one symbol. Dates are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    /// Build a series, rejecting out-of-order or duplicate dates.
    pub fn new(symbol: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> AnalysisResult<Self> {
        let symbol = symbol.into();
        if let Some(w) = points.windows(2).find(|w| w[0].0 >= w[1].0) {
            return Err(AnalysisError::MalformedSeries(format!(
                "{symbol}: date {} does not follow {}",
                w[1].0, w[0].0
            )));
        }
        Ok(Self { symbol, points })
    }

    #[cfg(test)]
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), points: Vec::new() }
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|(d, _)| *d)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }

    /// Value on `date`, if observed. Dates are sorted, so this is a binary search.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|i| self.points[i].1)
    }

    /// Same dates, values mapped through `f`.
    pub(crate) fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        let points = self.points.iter().map(|(d, v)| (*d, f(*v))).collect();
        Self { symbol: self.symbol.clone(), points }
    }

    /// Restrict to the given ascending dates. Every date must be present.
    fn restrict_to(&self, dates: &[NaiveDate]) -> Self {
        let points = dates
            .iter()
            .filter_map(|d| self.value_on(*d).map(|v| (*d, v)))
            .collect();
        Self { symbol: self.symbol.clone(), points }
    }
}

/// Simple period-over-period returns for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    symbol: String,
    points: Vec<(NaiveDate, f64)>,
}

impl ReturnSeries {
    /// Returns are derived from an already ordered price series, so no
    /// re-validation happens here.
    pub(crate) fn from_ordered(symbol: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
        Self { symbol: symbol.into(), points }
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[cfg(test)]
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|(d, _)| *d)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }
}

/// A stock that could not be admitted into the aligned table.
#[derive(Debug)]
pub struct Rejected {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Benchmark and stock closes on one shared, ascending date axis.
#[derive(Debug, Clone)]
pub struct AlignedPrices {
    dates: Vec<NaiveDate>,
    benchmark: PriceSeries,
    stocks: Vec<PriceSeries>,
}

impl AlignedPrices {
    /// Ordered inner join on date.
    ///
    /// Stocks are admitted greedily in request order. A stock whose admission
    /// would leave fewer than [`MIN_ALIGNED_DATES`] common dates is rejected
    /// with an alignment error, so the table always keeps at least two return
    /// rows for the stocks already admitted. An empty stock is rejected as
    /// missing data. The benchmark itself must hold at least
    /// [`MIN_ALIGNED_DATES`] observations.
    pub fn join(
        benchmark: &PriceSeries,
        stocks: Vec<PriceSeries>,
    ) -> AnalysisResult<(Self, Vec<Rejected>)> {
        if benchmark.len() < MIN_ALIGNED_DATES {
            return Err(AnalysisError::MissingData(format!(
                "benchmark {} has {} observations, need at least {MIN_ALIGNED_DATES}",
                benchmark.symbol(),
                benchmark.len()
            )));
        }

        let mut common: Vec<NaiveDate> = benchmark.dates().collect();
        let mut admitted: Vec<PriceSeries> = Vec::with_capacity(stocks.len());
        let mut rejected = Vec::new();

        for stock in stocks {
            if stock.is_empty() {
                rejected.push(Rejected {
                    error: AnalysisError::MissingData(format!(
                        "no observations for {}",
                        stock.symbol()
                    )),
                    symbol: stock.symbol,
                });
                continue;
            }

            let narrowed: Vec<NaiveDate> = common
                .iter()
                .copied()
                .filter(|d| stock.value_on(*d).is_some())
                .collect();

            if narrowed.len() < MIN_ALIGNED_DATES {
                rejected.push(Rejected {
                    error: AnalysisError::Alignment(format!(
                        "{} shares {} dates with {} and the other admitted symbols",
                        stock.symbol(),
                        narrowed.len(),
                        benchmark.symbol()
                    )),
                    symbol: stock.symbol,
                });
                continue;
            }

            common = narrowed;
            admitted.push(stock);
        }

        let table = Self {
            benchmark: benchmark.restrict_to(&common),
            stocks: admitted.iter().map(|s| s.restrict_to(&common)).collect(),
            dates: common,
        };
        Ok((table, rejected))
    }

    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[inline]
    pub fn benchmark(&self) -> &PriceSeries {
        &self.benchmark
    }

    #[inline]
    pub fn stocks(&self) -> &[PriceSeries] {
        &self.stocks
    }

    #[cfg(test)]
    pub fn stock(&self, symbol: &str) -> Option<&PriceSeries> {
        self.stocks.iter().find(|s| s.symbol() == symbol)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }
}

#[cfg(test)]
pub(crate) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
