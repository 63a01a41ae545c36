use crate::error::{Result, SimulationError};
use crate::fees::FeeTier;
use crate::math::price_tick::price_to_tick;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static parameters of the simulated pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    pub fee_tier: FeeTier,
    pub decimals0: u8,
    pub decimals1: u8,
}

impl MarketParams {
    /// Builds market params with the tick spacing implied by the fee tier.
    pub fn new(fee_rate: Decimal, decimals0: u8, decimals1: u8) -> Result<Self> {
        Self::with_fee_tier(FeeTier::from_rate(fee_rate)?, decimals0, decimals1)
    }

    /// Builds market params from an explicit fee tier.
    pub fn with_fee_tier(fee_tier: FeeTier, decimals0: u8, decimals1: u8) -> Result<Self> {
        if decimals0 == 0 || decimals1 == 0 {
            return Err(SimulationError::configuration(format!(
                "token decimals must be positive, got {decimals0}/{decimals1}"
            )));
        }
        Ok(Self {
            fee_tier,
            decimals0,
            decimals1,
        })
    }

    pub fn tick_spacing(&self) -> i32 {
        self.fee_tier.tick_spacing
    }

    pub fn fee_rate(&self) -> Decimal {
        self.fee_tier.rate
    }

    /// 10^(decimals1 - decimals0): converts a human price into a raw pool price.
    pub fn decimal_adjustment(&self) -> f64 {
        10f64.powi(i32::from(self.decimals1) - i32::from(self.decimals0))
    }

    /// Aligned tick of a human-unit price.
    pub fn tick_for_price(&self, price: Decimal) -> Result<i32> {
        price_to_tick(price, self.decimal_adjustment(), self.tick_spacing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_params() {
        let market = MarketParams::new(dec!(0.003), 6, 18).unwrap();
        assert_eq!(market.tick_spacing(), 60);
        assert_eq!(market.decimal_adjustment(), 1e12);
        assert_eq!(market.tick_for_price(dec!(0.000000000001)).unwrap(), 0);
    }

    #[test]
    fn test_rejects_zero_decimals() {
        assert!(matches!(
            MarketParams::new(dec!(0.003), 0, 18),
            Err(SimulationError::Configuration(_))
        ));
    }
}
