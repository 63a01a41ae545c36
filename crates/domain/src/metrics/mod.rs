//! Statistics over a valuation series.
//!
//! All functions work on f64 and return NaN for undefined results
//! (empty input, zero duration, zero variance) instead of failing.

pub mod fees;
pub mod impermanent_loss;
pub mod risk;

pub use fees::{annualize, simple_return};
pub use impermanent_loss::impermanent_loss;
pub use risk::{annualized_volatility, max_drawdown, mean, median, pct_changes, sample_std_dev};
