use super::series::{AlignedPrices, PriceSeries};

/// Rescale so the series starts at exactly 1.0.
/// A zero first close yields NaN values; they are surfaced, not corrected.
pub fn normalize(prices: &PriceSeries) -> PriceSeries {
    let Some(&(_, first)) = prices.points().first() else {
        return prices.clone();
    };

    prices.map_values(|v| if first == 0.0 { f64::NAN } else { v / first })
}

/// Normalize every stock column of an aligned table.
pub fn normalize_aligned(prices: &AlignedPrices) -> Vec<PriceSeries> {
    prices.stocks().iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::series::day;

    #[test]
    fn test_starts_at_one() {
        let p = PriceSeries::new(
            "A",
            vec![(day(2024, 1, 2), 250.0), (day(2024, 1, 3), 275.0), (day(2024, 1, 4), 200.0)],
        )
        .unwrap();
        let n = normalize(&p);
        let v: Vec<f64> = n.values().collect();

        assert_eq!(v[0], 1.0);
        assert!((v[1] - 275.0 / 250.0).abs() < 1e-12);
        assert!((v[2] - 200.0 / 250.0).abs() < 1e-12);
        assert_eq!(n.dates().collect::<Vec<_>>(), p.dates().collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_first_value_is_nan() {
        let p = PriceSeries::new("A", vec![(day(2024, 1, 2), 0.0), (day(2024, 1, 3), 5.0)]).unwrap();
        assert!(normalize(&p).values().all(f64::is_nan));
    }

    #[test]
    fn test_empty_passthrough() {
        assert!(normalize(&PriceSeries::empty("A")).is_empty());
    }
}
