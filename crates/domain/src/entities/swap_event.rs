use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which token a swap paid into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapSide {
    Token0,
    Token1,
}

/// A historical swap, aggregated per block by the data collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapEvent {
    /// Time of the swap; assigns it to the window `(previous price, this price]`.
    pub timestamp: DateTime<Utc>,
    /// Pool tick after the swap.
    pub tick: i32,
    /// Token paid in.
    pub token_in: SwapSide,
    /// Amount paid in, in human units of `token_in`.
    pub traded_in: Decimal,
    /// Active pool liquidity at the swap.
    pub pool_liquidity: Decimal,
}
