use crate::error::{Result, SimulationError};
use crate::math::price_tick::tick_spacing_for_fee;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pool fee rate and the tick spacing it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTier {
    /// Fraction of the traded-in amount paid to liquidity providers.
    pub rate: Decimal,
    pub tick_spacing: i32,
}

impl FeeTier {
    /// Fee tier with the conventional spacing (`rate * 2 * 10000`).
    pub fn from_rate(rate: Decimal) -> Result<Self> {
        Ok(Self {
            rate,
            tick_spacing: tick_spacing_for_fee(rate)?,
        })
    }

    /// Fee tier with an explicit spacing.
    pub fn new(rate: Decimal, tick_spacing: i32) -> Result<Self> {
        if rate <= Decimal::ZERO {
            return Err(SimulationError::configuration(format!(
                "fee tier must be positive, got {rate}"
            )));
        }
        if tick_spacing <= 0 {
            return Err(SimulationError::configuration(format!(
                "tick spacing must be positive, got {tick_spacing}"
            )));
        }
        Ok(Self { rate, tick_spacing })
    }
}
