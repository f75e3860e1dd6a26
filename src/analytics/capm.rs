use super::series::ReturnSeries;
use crate::errors::{AnalysisError, AnalysisResult};
use serde::Serialize;
use statrs::statistics::Statistics;

/// Variance at or below this (per observation) is treated as zero.
const MIN_VARIANCE: f64 = 1e-20;

/// OLS fit of `stock = alpha + beta * benchmark` for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapmEstimate {
    pub beta: f64,
    pub alpha: f64,
    pub r_squared: f64,
    pub observations: usize,
}

impl CapmEstimate {
    /// Fitted stock return for a given benchmark return.
    #[inline]
    pub fn fitted(&self, benchmark_return: f64) -> f64 {
        self.alpha + self.beta * benchmark_return
    }
}

/// Closed-form simple linear regression of stock returns on benchmark returns.
///
/// beta  = cov(x, y) / var(x)
/// alpha = mean(y) - beta * mean(x)
///
/// Both series must carry the same dates in the same order. A constant
/// benchmark has no defined slope and is reported as a degenerate regression
/// rather than a division by zero.
pub fn estimate_capm(stock: &ReturnSeries, benchmark: &ReturnSeries) -> AnalysisResult<CapmEstimate> {
    if stock.len() != benchmark.len() {
        return Err(AnalysisError::Alignment(format!(
            "{} has {} returns, {} has {}",
            stock.symbol(),
            stock.len(),
            benchmark.symbol(),
            benchmark.len()
        )));
    }
    if let Some(((d, _), _)) = stock
        .points()
        .iter()
        .zip(benchmark.points())
        .find(|((ds, _), (db, _))| ds != db)
    {
        return Err(AnalysisError::Alignment(format!(
            "{} and {} disagree at {d}",
            stock.symbol(),
            benchmark.symbol()
        )));
    }

    let n = stock.len();
    if n < 2 {
        return Err(AnalysisError::MissingData(format!(
            "{} has {n} paired returns, need at least 2",
            stock.symbol()
        )));
    }

    let undefined = stock
        .values()
        .zip(benchmark.values())
        .filter(|(y, x)| !y.is_finite() || !x.is_finite())
        .count();
    if undefined > 0 {
        return Err(AnalysisError::UndefinedValues {
            symbol: stock.symbol().to_string(),
            count: undefined,
        });
    }

    let x: Vec<f64> = benchmark.values().collect();
    let y: Vec<f64> = stock.values().collect();
    let mean_x = x.iter().mean();
    let mean_y = y.iter().mean();

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(&y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx <= MIN_VARIANCE * n as f64 {
        return Err(AnalysisError::DegenerateRegression(format!(
            "{} returns have zero variance over {n} observations; beta of {} is undefined",
            benchmark.symbol(),
            stock.symbol()
        )));
    }

    let beta = sxy / sxx;
    let alpha = mean_y - beta * mean_x;
    let r_squared = if syy > MIN_VARIANCE * n as f64 { (sxy * sxy) / (sxx * syy) } else { 0.0 };

    Ok(CapmEstimate { beta, alpha, r_squared, observations: n })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::series::day;

    fn returns(symbol: &str, values: &[f64]) -> ReturnSeries {
        ReturnSeries::from_ordered(
            symbol,
            values.iter().enumerate().map(|(i, v)| (day(2024, 1, i as u32 + 2), *v)).collect(),
        )
    }

    #[test]
    fn test_exact_line_recovered() {
        let xs = [0.01, -0.02, 0.015, 0.03, -0.005, 0.0, 0.022];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 0.5).collect();
        let est = estimate_capm(&returns("A", &ys), &returns("M", &xs)).unwrap();

        assert!((est.beta - 2.0).abs() < 1e-9, "beta={}", est.beta);
        assert!((est.alpha - 0.5).abs() < 1e-9, "alpha={}", est.alpha);
        assert!((est.r_squared - 1.0).abs() < 1e-9, "perfect fit r2={}", est.r_squared);
        assert_eq!(est.observations, xs.len());
        assert!((est.fitted(0.01) - 0.52).abs() < 1e-9);
    }

    #[test]
    fn test_constant_benchmark_is_degenerate() {
        let xs = [0.01, 0.01, 0.01, 0.01];
        let ys = [0.02, -0.01, 0.03, 0.0];
        let res = estimate_capm(&returns("A", &ys), &returns("M", &xs));
        assert!(
            matches!(res, Err(AnalysisError::DegenerateRegression(_))),
            "constant benchmark must not yield a beta: {res:?}"
        );
    }

    #[test]
    fn test_constant_stock_has_zero_beta() {
        let xs = [0.01, -0.02, 0.03];
        let ys = [0.005, 0.005, 0.005];
        let est = estimate_capm(&returns("A", &ys), &returns("M", &xs)).unwrap();
        assert!(est.beta.abs() < 1e-12);
        assert!((est.alpha - 0.005).abs() < 1e-12);
        assert_eq!(est.r_squared, 0.0);
    }

    #[test]
    fn test_misaligned_inputs_rejected() {
        let res = estimate_capm(&returns("A", &[0.1, 0.2, 0.3]), &returns("M", &[0.1, 0.2]));
        assert!(matches!(res, Err(AnalysisError::Alignment(_))));

        let shifted = ReturnSeries::from_ordered(
            "M",
            vec![(day(2024, 2, 1), 0.1), (day(2024, 2, 2), 0.2), (day(2024, 2, 3), 0.3)],
        );
        let res = estimate_capm(&returns("A", &[0.1, 0.2, 0.3]), &shifted);
        assert!(matches!(res, Err(AnalysisError::Alignment(_))), "dates must match pairwise");
    }

    #[test]
    fn test_nan_returns_surface() {
        let res = estimate_capm(&returns("A", &[0.1, f64::NAN, 0.3]), &returns("M", &[0.1, 0.2, 0.4]));
        match res {
            Err(AnalysisError::UndefinedValues { symbol, count }) => {
                assert_eq!(symbol, "A");
                assert_eq!(count, 1);
            }
            other => panic!("expected UndefinedValues, got {other:?}"),
        }
    }

    #[test]
    fn test_too_few_observations() {
        let res = estimate_capm(&returns("A", &[0.1]), &returns("M", &[0.2]));
        assert!(matches!(res, Err(AnalysisError::MissingData(_))));
    }
}
