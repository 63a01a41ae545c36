use crate::error::{Result, SimulationError};
use crate::math::concentrated_liquidity::amounts_for_liquidity;
use crate::value_objects::market::MarketParams;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tick bounds of a liquidity range, aligned to the pool's tick spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickRange {
    pub lower_tick: i32,
    pub upper_tick: i32,
}

impl TickRange {
    /// Validates and builds a range.
    ///
    /// Fails when the bounds are inverted, empty or off the spacing grid.
    pub fn new(lower_tick: i32, upper_tick: i32, tick_spacing: i32) -> Result<Self> {
        if tick_spacing <= 0 {
            return Err(SimulationError::configuration(format!(
                "tick spacing must be positive, got {tick_spacing}"
            )));
        }
        if lower_tick >= upper_tick {
            return Err(SimulationError::configuration(format!(
                "malformed range bounds [{lower_tick}, {upper_tick}]"
            )));
        }
        if lower_tick % tick_spacing != 0 || upper_tick % tick_spacing != 0 {
            return Err(SimulationError::configuration(format!(
                "range bounds [{lower_tick}, {upper_tick}] are not multiples of {tick_spacing}"
            )));
        }
        Ok(Self {
            lower_tick,
            upper_tick,
        })
    }

    /// Closed-interval containment used for fee eligibility.
    pub fn contains_tick(&self, tick: i32) -> bool {
        tick >= self.lower_tick && tick <= self.upper_tick
    }

    /// Width in ticks.
    pub fn width(&self) -> i32 {
        self.upper_tick - self.lower_tick
    }
}

/// One concentrated liquidity range owned by the simulator.
///
/// `liquidity` is authoritative; the token amounts are derived from it at the
/// last revaluation tick. A range with zero liquidity is an inactive slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangePosition {
    pub bounds: TickRange,
    pub liquidity: u128,
    pub token0: Decimal,
    pub token1: Decimal,
    pub created_at: DateTime<Utc>,
}

impl RangePosition {
    /// Creates a placeholder range that holds no liquidity.
    pub fn empty(bounds: TickRange, created_at: DateTime<Utc>) -> Self {
        Self {
            bounds,
            liquidity: 0,
            token0: Decimal::ZERO,
            token1: Decimal::ZERO,
            created_at,
        }
    }

    pub fn lower_tick(&self) -> i32 {
        self.bounds.lower_tick
    }

    pub fn upper_tick(&self) -> i32 {
        self.bounds.upper_tick
    }

    /// Whether the range currently holds liquidity.
    pub fn is_active(&self) -> bool {
        self.liquidity > 0
    }

    /// Returns a copy with token amounts recomputed at `tick`.
    pub fn revalued(&self, tick: i32, market: &MarketParams) -> Result<Self> {
        let (token0, token1) = amounts_for_liquidity(
            tick,
            self.bounds.lower_tick,
            self.bounds.upper_tick,
            self.liquidity,
            market.decimals0,
            market.decimals1,
        )?;
        Ok(Self {
            token0,
            token1,
            ..self.clone()
        })
    }

    /// Returns a copy with the liquidity removed, keeping the bounds.
    pub fn withdrawn(&self) -> Self {
        Self {
            liquidity: 0,
            token0: Decimal::ZERO,
            token1: Decimal::ZERO,
            ..self.clone()
        }
    }

    /// Value of the range in token0 units at `price` (token1 per token0).
    pub fn value_in_token0(&self, price: Decimal) -> Decimal {
        if price.is_zero() {
            return self.token0;
        }
        self.token0 + self.token1 / price
    }
}
