pub mod balances;
pub mod market;
pub mod series;

pub use balances::TokenBalances;
pub use market::MarketParams;
pub use series::{GasPricePoint, PricePoint, QuotePoint, as_of};
