//! Swap fee accrual.
//!
//! Each swap pays `fee_tier * traded_in` in the token it paid with. An active
//! range whose bounds contain the swap tick (both bounds inclusive) takes
//! `L / (L + pool_liquidity)` of it, or all of it when the recorded pool
//! liquidity is effectively zero.

use clmm_backtest_domain::entities::{RangePosition, SwapEvent, SwapSide};
use clmm_backtest_domain::error::{Result, SimulationError};
use clmm_backtest_domain::value_objects::TokenBalances;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Pool liquidity below this is treated as absent.
const MIN_POOL_LIQUIDITY: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Credits swap fees to ranges.
#[derive(Debug, Clone, Copy)]
pub struct FeeAccrualEngine {
    fee_tier: Decimal,
}

impl FeeAccrualEngine {
    pub fn new(fee_tier: Decimal) -> Self {
        Self { fee_tier }
    }

    /// Share of a swap's fee earned by `liquidity`.
    pub fn fee_share(liquidity: u128, pool_liquidity: Decimal) -> Result<Decimal> {
        if pool_liquidity < MIN_POOL_LIQUIDITY {
            return Ok(Decimal::ONE);
        }
        let own = Decimal::from_u128(liquidity).ok_or_else(|| {
            SimulationError::numeric(format!("liquidity {liquidity} does not fit a decimal"))
        })?;
        Ok(own / (own + pool_liquidity))
    }

    /// Fees earned by `range` from one swap.
    pub fn fee_for_swap(&self, range: &RangePosition, swap: &SwapEvent) -> Result<TokenBalances> {
        if !range.is_active() || !range.bounds.contains_tick(swap.tick) {
            return Ok(TokenBalances::zero());
        }
        let fee = self.fee_tier
            * swap.traded_in
            * Self::fee_share(range.liquidity, swap.pool_liquidity)?;
        Ok(match swap.token_in {
            SwapSide::Token0 => TokenBalances::new(fee, Decimal::ZERO),
            SwapSide::Token1 => TokenBalances::new(Decimal::ZERO, fee),
        })
    }

    /// Fees earned by all `ranges` over a window of swaps.
    pub fn accrue(&self, ranges: &[RangePosition], swaps: &[SwapEvent]) -> Result<TokenBalances> {
        let mut total = TokenBalances::zero();
        for swap in swaps {
            for range in ranges {
                total += self.fee_for_swap(range, swap)?;
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use clmm_backtest_domain::entities::TickRange;
    use rust_decimal_macros::dec;

    fn t() -> DateTime<Utc> {
        DateTime::from_timestamp(0, 0).unwrap()
    }

    fn range(liquidity: u128) -> RangePosition {
        RangePosition {
            liquidity,
            ..RangePosition::empty(TickRange::new(-120, 120, 60).unwrap(), t())
        }
    }

    fn swap(tick: i32, side: SwapSide, traded_in: Decimal, pool: Decimal) -> SwapEvent {
        SwapEvent {
            timestamp: t(),
            tick,
            token_in: side,
            traded_in,
            pool_liquidity: pool,
        }
    }

    #[test]
    fn test_fee_with_equal_pool_liquidity() {
        let engine = FeeAccrualEngine::new(dec!(0.003));
        let fees = engine
            .accrue(
                &[range(1000)],
                &[swap(0, SwapSide::Token0, dec!(100), dec!(1000))],
            )
            .unwrap();
        assert_eq!(fees, TokenBalances::new(dec!(0.15), Decimal::ZERO));
    }

    #[test]
    fn test_out_of_range_earns_nothing() {
        let engine = FeeAccrualEngine::new(dec!(0.003));
        let fees = engine
            .accrue(
                &[range(1000)],
                &[swap(180, SwapSide::Token1, dec!(100), dec!(1000))],
            )
            .unwrap();
        assert!(fees.is_zero());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let engine = FeeAccrualEngine::new(dec!(0.003));
        let swaps = [
            swap(-120, SwapSide::Token1, dec!(100), dec!(1000)),
            swap(120, SwapSide::Token1, dec!(100), dec!(1000)),
        ];
        let fees = engine.accrue(&[range(1000)], &swaps).unwrap();
        assert_eq!(fees.token1, dec!(0.3));
    }

    #[test]
    fn test_zero_pool_liquidity_takes_whole_fee() {
        let engine = FeeAccrualEngine::new(dec!(0.003));
        let fees = engine
            .accrue(&[range(50)], &[swap(0, SwapSide::Token0, dec!(100), dec!(0))])
            .unwrap();
        assert_eq!(fees.token0, dec!(0.3));
    }

    #[test]
    fn test_inactive_range_earns_nothing() {
        let engine = FeeAccrualEngine::new(dec!(0.003));
        let fees = engine
            .accrue(&[range(0)], &[swap(0, SwapSide::Token0, dec!(100), dec!(0))])
            .unwrap();
        assert!(fees.is_zero());
    }

    #[test]
    fn test_fee_is_linear_in_volume_and_tier() {
        let swaps = |amount| [swap(60, SwapSide::Token1, amount, dec!(3000))];
        let base = FeeAccrualEngine::new(dec!(0.003))
            .accrue(&[range(1000)], &swaps(dec!(100)))
            .unwrap();
        let double_volume = FeeAccrualEngine::new(dec!(0.003))
            .accrue(&[range(1000)], &swaps(dec!(200)))
            .unwrap();
        let double_tier = FeeAccrualEngine::new(dec!(0.006))
            .accrue(&[range(1000)], &swaps(dec!(100)))
            .unwrap();
        assert_eq!(base.token1, dec!(0.075));
        assert_eq!(double_volume.token1, base.token1 * dec!(2));
        assert_eq!(double_tier.token1, base.token1 * dec!(2));
    }
}
