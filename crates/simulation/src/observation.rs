//! Per-step output of the simulator.

use chrono::{DateTime, Utc};
use clmm_backtest_domain::entities::RangePosition;
use clmm_backtest_domain::value_objects::TokenBalances;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the ranges were (re)deployed at a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    /// Nothing changed.
    #[default]
    None,
    /// Ranges opened at the first step.
    FirstInit,
    /// A secondary range was opened for the first time.
    SecondInit,
    /// The primary range was moved.
    FirstRebalance,
    /// The secondary range was moved.
    SecondRebalance,
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::FirstInit => "first_init",
            Self::SecondInit => "second_init",
            Self::FirstRebalance => "first_rebalance",
            Self::SecondRebalance => "second_rebalance",
        };
        f.write_str(label)
    }
}

/// Snapshot of the simulated portfolio after one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    /// Pool price, token1 per token0.
    pub price: Decimal,
    /// Aligned tick of `price`.
    pub tick: i32,
    /// Every range slot, active or not, in slot order.
    pub ranges: Vec<RangePosition>,
    /// Capital not deployed in any range.
    pub leftover: TokenBalances,
    /// Fees earned but not yet moved into `leftover`.
    pub uncollected_fees: TokenBalances,
    /// Fees earned during this step.
    pub period_fees: TokenBalances,
    /// Fees moved into `leftover` by a rebalance at this step.
    pub collected_fees: TokenBalances,
    /// Gas charged at this step, in token0.
    pub gas_cost: Decimal,
    /// Swap cost charged at this step, in token0.
    pub swap_cost: Decimal,
    /// Set when existing liquidity was moved or added after the first step.
    pub reset_flag: bool,
    pub reset_reason: ResetReason,
}

impl Observation {
    /// Tokens held across ranges, leftover and uncollected fees.
    pub fn token_totals(&self) -> TokenBalances {
        self.ranges
            .iter()
            .map(|range| TokenBalances::new(range.token0, range.token1))
            .fold(self.leftover + self.uncollected_fees, |acc, b| acc + b)
    }

    /// Total portfolio value in token0 units at the step price.
    pub fn value_in_token0(&self) -> Decimal {
        self.token_totals().value_in_token0(self.price)
    }

    /// Value of a single range slot in token0 units.
    pub fn range_value(&self, slot: usize) -> Option<Decimal> {
        self.ranges
            .get(slot)
            .map(|range| range.value_in_token0(self.price))
    }

    /// Value of every range plus leftover, excluding uncollected fees.
    pub fn deployed_and_idle_value(&self) -> Decimal {
        let ranges: Decimal = self
            .ranges
            .iter()
            .map(|range| range.value_in_token0(self.price))
            .sum();
        ranges + self.leftover.value_in_token0(self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_backtest_domain::entities::TickRange;
    use rust_decimal_macros::dec;

    #[test]
    fn test_totals_and_value() {
        let t = DateTime::from_timestamp(0, 0).unwrap();
        let mut range = RangePosition::empty(TickRange::new(-60, 60, 60).unwrap(), t);
        range.token0 = dec!(10);
        range.token1 = dec!(20);
        let observation = Observation {
            timestamp: t,
            price: dec!(2),
            tick: 0,
            ranges: vec![range],
            leftover: TokenBalances::new(dec!(1), dec!(2)),
            uncollected_fees: TokenBalances::new(dec!(0.5), dec!(1)),
            period_fees: TokenBalances::zero(),
            collected_fees: TokenBalances::zero(),
            gas_cost: Decimal::ZERO,
            swap_cost: Decimal::ZERO,
            reset_flag: false,
            reset_reason: ResetReason::None,
        };
        assert_eq!(
            observation.token_totals(),
            TokenBalances::new(dec!(11.5), dec!(23))
        );
        assert_eq!(observation.value_in_token0(), dec!(23));
        assert_eq!(observation.range_value(0), Some(dec!(20)));
        assert_eq!(observation.range_value(1), None);
        assert_eq!(observation.deployed_and_idle_value(), dec!(22));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(ResetReason::SecondRebalance.to_string(), "second_rebalance");
        assert_eq!(ResetReason::default(), ResetReason::None);
    }
}
