use super::capm::CapmEstimate;
use super::expected::{expected_return, MarketContext};
use super::series::ReturnSeries;

/// Extra beta shown past the largest observed beta on the SML.
const SML_BETA_HEADROOM: f64 = 0.5;

/// Security characteristic line: the fitted return `alpha + beta * x` at every
/// observed benchmark return `x`, in input order.
pub fn security_characteristic_line(
    estimate: &CapmEstimate,
    benchmark_returns: &ReturnSeries,
) -> Vec<(f64, f64)> {
    benchmark_returns
        .values()
        .map(|x| (x, estimate.fitted(x)))
        .collect()
}

/// Security market line over the beta domain `[0, max(beta) + 0.5]`.
/// Two points are enough since the line is straight.
pub fn security_market_line(betas: &[f64], market: &MarketContext) -> [(f64, f64); 2] {
    let max_beta = betas
        .iter()
        .copied()
        .filter(|b| b.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let top = if max_beta.is_finite() { max_beta } else { 0.0 };
    let upper = top + SML_BETA_HEADROOM;

    [
        (0.0, expected_return(0.0, market)),
        (upper, expected_return(upper, market)),
    ]
}

/// Each stock's (beta, CAPM expected return) marker on the SML.
pub fn sml_points(betas: &[f64], market: &MarketContext) -> Vec<(f64, f64)> {
    betas.iter().map(|b| (*b, expected_return(*b, market))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::series::day;

    #[test]
    fn test_scl_follows_estimate() {
        let est = CapmEstimate { beta: 1.2, alpha: 0.001, r_squared: 0.5, observations: 3 };
        let bench = ReturnSeries::from_ordered(
            "M",
            vec![(day(2024, 1, 2), 0.01), (day(2024, 1, 3), -0.02), (day(2024, 1, 4), 0.005)],
        );
        let line = security_characteristic_line(&est, &bench);

        assert_eq!(line.len(), 3);
        assert_eq!(line[1].0, -0.02);
        assert!((line[1].1 - (0.001 + 1.2 * -0.02)).abs() < 1e-12);
    }

    #[test]
    fn test_sml_domain() {
        let market = MarketContext { risk_free_rate: 0.04, market_return: 0.12 };
        let [start, end] = security_market_line(&[0.8, 1.7, 1.1], &market);

        assert_eq!(start, (0.0, 0.04));
        assert!((end.0 - 2.2).abs() < 1e-12, "upper beta={}", end.0);
        assert!((end.1 - (0.04 + 2.2 * 0.08)).abs() < 1e-12);
    }

    #[test]
    fn test_sml_without_betas() {
        let market = MarketContext { risk_free_rate: 0.04, market_return: 0.12 };
        let [_, end] = security_market_line(&[], &market);
        assert!((end.0 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sml_points() {
        let market = MarketContext { risk_free_rate: 0.03, market_return: 0.10 };
        let pts = sml_points(&[1.5], &market);
        assert!((pts[0].1 - 0.135).abs() < 1e-12);
    }
}
