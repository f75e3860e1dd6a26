pub mod series;
pub mod returns;
pub mod normalize;
pub mod capm;
pub mod expected;
pub mod lines;

pub use capm::{estimate_capm, CapmEstimate};
pub use expected::{annualized_return, classify, expected_return, MarketContext, Performance};
pub use series::{AlignedPrices, PriceSeries};
