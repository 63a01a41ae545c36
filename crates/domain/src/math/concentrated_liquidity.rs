//! Token amount <-> liquidity conversions over a tick range.
//!
//! Sqrt-prices are Q64.96 integers; differences between them are taken on
//! `U256` and the remaining division steps run in f64. Amounts are in human
//! units (divided by `10^decimals`).

use crate::error::{Result, SimulationError};
use crate::math::fixed_point::{
    Q96, decimal_from_f64, decimal_to_f64, liquidity_from_f64, u256_to_f64,
};
use crate::math::price_tick::{TICK_BASE, sqrt_price_x96};
use primitive_types::U256;
use rust_decimal::Decimal;

fn ordered(a: U256, b: U256) -> (U256, U256) {
    if a > b { (b, a) } else { (a, b) }
}

fn decimals_scale(decimals: u8) -> Result<f64> {
    if decimals == 0 {
        return Err(SimulationError::configuration(
            "token decimals must be positive",
        ));
    }
    Ok(10f64.powi(i32::from(decimals)))
}

/// Amount of token0 held by `liquidity` between two sqrt-prices.
/// amount0 = L * 2^96 * (sqrt_b - sqrt_a) / sqrt_b / sqrt_a / 10^decimals
pub fn get_amount0(sqrt_a: U256, sqrt_b: U256, liquidity: u128, decimals: u8) -> Result<f64> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b);
    if lower.is_zero() {
        return Err(SimulationError::numeric("sqrt price must be positive"));
    }
    let diff = u256_to_f64(upper - lower);
    Ok(liquidity as f64 * Q96 * diff / u256_to_f64(upper) / u256_to_f64(lower)
        / decimals_scale(decimals)?)
}

/// Amount of token1 held by `liquidity` between two sqrt-prices.
/// amount1 = L * (sqrt_b - sqrt_a) / 2^96 / 10^decimals
pub fn get_amount1(sqrt_a: U256, sqrt_b: U256, liquidity: u128, decimals: u8) -> Result<f64> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b);
    let diff = u256_to_f64(upper - lower);
    Ok(liquidity as f64 * diff / Q96 / decimals_scale(decimals)?)
}

/// Liquidity bought by `amount0` of token0 between two sqrt-prices (untruncated).
pub fn get_liquidity0(sqrt_a: U256, sqrt_b: U256, amount0: f64, decimals: u8) -> Result<f64> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b);
    if lower == upper || lower.is_zero() {
        return Err(SimulationError::configuration("range too small"));
    }
    let per_unit = Q96 * u256_to_f64(upper - lower) / u256_to_f64(upper) / u256_to_f64(lower)
        / decimals_scale(decimals)?;
    Ok(amount0 / per_unit)
}

/// Liquidity bought by `amount1` of token1 between two sqrt-prices (untruncated).
pub fn get_liquidity1(sqrt_a: U256, sqrt_b: U256, amount1: f64, decimals: u8) -> Result<f64> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b);
    if lower == upper {
        return Err(SimulationError::configuration("range too small"));
    }
    let per_unit = u256_to_f64(upper - lower) / Q96 / decimals_scale(decimals)?;
    Ok(amount1 / per_unit)
}

/// Token composition of `liquidity` placed on `[tick_a, tick_b]` at `tick`.
///
/// At or below the lower bound everything is token0, at or above the upper
/// bound everything is token1; only a strictly interior price splits.
pub fn amounts_for_liquidity(
    tick: i32,
    tick_a: i32,
    tick_b: i32,
    liquidity: u128,
    decimals0: u8,
    decimals1: u8,
) -> Result<(Decimal, Decimal)> {
    if tick_a == tick_b {
        return Err(SimulationError::configuration(format!(
            "malformed range: lower and upper tick are both {tick_a}"
        )));
    }
    let sqrt = sqrt_price_x96(tick)?;
    let (sqrt_a, sqrt_b) = ordered(sqrt_price_x96(tick_a)?, sqrt_price_x96(tick_b)?);

    let (amount0, amount1) = if sqrt <= sqrt_a {
        (get_amount0(sqrt_a, sqrt_b, liquidity, decimals0)?, 0.0)
    } else if sqrt < sqrt_b {
        (
            get_amount0(sqrt, sqrt_b, liquidity, decimals0)?,
            get_amount1(sqrt_a, sqrt, liquidity, decimals1)?,
        )
    } else {
        (0.0, get_amount1(sqrt_a, sqrt_b, liquidity, decimals1)?)
    };

    Ok((decimal_from_f64(amount0)?, decimal_from_f64(amount1)?))
}

/// Maximum liquidity that `amount0`/`amount1` can place on `[tick_a, tick_b]` at `tick`.
///
/// In the interior the scarcer token binds. The result is truncated.
pub fn liquidity_for_amounts(
    tick: i32,
    tick_a: i32,
    tick_b: i32,
    amount0: Decimal,
    amount1: Decimal,
    decimals0: u8,
    decimals1: u8,
) -> Result<u128> {
    if tick_a == tick_b {
        return Err(SimulationError::configuration(format!(
            "malformed range: lower and upper tick are both {tick_a}"
        )));
    }
    let sqrt = sqrt_price_x96(tick)?;
    let (sqrt_a, sqrt_b) = ordered(sqrt_price_x96(tick_a)?, sqrt_price_x96(tick_b)?);
    let amount0 = decimal_to_f64(amount0)?;
    let amount1 = decimal_to_f64(amount1)?;

    let liquidity = if sqrt <= sqrt_a {
        get_liquidity0(sqrt_a, sqrt_b, amount0, decimals0)?
    } else if sqrt < sqrt_b {
        let liquidity0 = get_liquidity0(sqrt, sqrt_b, amount0, decimals0)?;
        let liquidity1 = get_liquidity1(sqrt_a, sqrt, amount1, decimals1)?;
        liquidity0.min(liquidity1)
    } else {
        get_liquidity1(sqrt_a, sqrt_b, amount1, decimals1)?
    };

    liquidity_from_f64(liquidity)
}

/// Result of rebalancing two idle balances into a range's deposit ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapToRatio {
    /// Token0 after the conversion.
    pub amount0: Decimal,
    /// Token1 after the conversion.
    pub amount1: Decimal,
    /// Value moved across the pool, in token0 units.
    pub swapped_notional: Decimal,
}

/// Converts `amount0`/`amount1` into the composition `[lower_tick, upper_tick]`
/// needs at `current_tick`, preserving total value at the tick price.
///
/// A range entirely below the current tick only holds token1, a range at or
/// above it only token0; otherwise the split follows
/// `amount1 / amount0 = (sqrtC - sqrtL) * sqrtU * sqrtC / (sqrtU - sqrtC)`.
pub fn swap_to_ratio(
    amount0: Decimal,
    amount1: Decimal,
    lower_tick: i32,
    upper_tick: i32,
    current_tick: i32,
    decimal_adjustment: f64,
) -> Result<SwapToRatio> {
    if lower_tick >= upper_tick {
        return Err(SimulationError::configuration(format!(
            "malformed range bounds [{lower_tick}, {upper_tick}]"
        )));
    }
    if decimal_adjustment <= 0.0 || !decimal_adjustment.is_finite() {
        return Err(SimulationError::configuration(
            "decimal adjustment must be positive",
        ));
    }
    let price = TICK_BASE.powi(current_tick) / decimal_adjustment;
    let held0 = decimal_to_f64(amount0)?;
    let held1 = decimal_to_f64(amount1)?;
    let total = held0 + held1 / price;

    let (token0, token1) = if upper_tick <= current_tick {
        (0.0, total * price)
    } else if lower_tick >= current_tick {
        (total, 0.0)
    } else {
        let sqrt_c = price.sqrt();
        let sqrt_l = (TICK_BASE.powi(lower_tick) / decimal_adjustment).sqrt();
        let sqrt_u = (TICK_BASE.powi(upper_tick) / decimal_adjustment).sqrt();
        let ratio = (sqrt_c - sqrt_l) * (sqrt_u * sqrt_c) / (sqrt_u - sqrt_c);
        let token0 = total / (1.0 + ratio / price);
        (token0, token0 * ratio)
    };

    Ok(SwapToRatio {
        amount0: decimal_from_f64(token0)?,
        amount1: decimal_from_f64(token1)?,
        swapped_notional: decimal_from_f64((token0 - held0).abs())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::*;
    use rust_decimal_macros::dec;

    const D0: u8 = 18;
    const D1: u8 = 18;

    #[test]
    fn test_amount_deltas() {
        // sqrt prices 1 and 2 (in Q96), liquidity 1000 and no decimal scaling
        // delta_y = 1000 * (2 - 1) = 1000
        // delta_x = 1000 * (1/1 - 1/2) = 500
        let one = U256::one() << 96;
        let two = U256::from(2u64) << 96;

        let dy = get_amount1(one, two, 1000, 1).unwrap() * 10.0;
        assert!((dy - 1000.0).abs() < 1e-9);

        let dx = get_amount0(one, two, 1000, 1).unwrap() * 10.0;
        assert!((dx - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_get_liquidity() {
        let one = U256::one() << 96;
        let two = U256::from(2u64) << 96;

        let l = get_liquidity0(one, two, 50.0, 1).unwrap();
        assert!((l - 1000.0).abs() < 1e-6);

        let l2 = get_liquidity1(two, one, 100.0, 1).unwrap();
        assert!((l2 - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_amounts_below_range_are_token0_only() {
        let liquidity = 1_000_000_000_000u128;
        let (a0, a1) = amounts_for_liquidity(-120, 0, 600, liquidity, D0, D1).unwrap();
        assert!(a0 > Decimal::ZERO);
        assert_eq!(a1, Decimal::ZERO);

        // at the lower bound counts as outside
        let (b0, b1) = amounts_for_liquidity(0, 0, 600, liquidity, D0, D1).unwrap();
        assert!(b0 > Decimal::ZERO);
        assert_eq!(b1, Decimal::ZERO);
    }

    #[test]
    fn test_amounts_above_range_are_token1_only() {
        let liquidity = 1_000_000_000_000u128;
        let (a0, a1) = amounts_for_liquidity(900, 0, 600, liquidity, D0, D1).unwrap();
        assert_eq!(a0, Decimal::ZERO);
        assert!(a1 > Decimal::ZERO);

        let (b0, b1) = amounts_for_liquidity(600, 0, 600, liquidity, D0, D1).unwrap();
        assert_eq!(b0, Decimal::ZERO);
        assert!(b1 > Decimal::ZERO);
    }

    #[test]
    fn test_amounts_interior_split_and_order_independent() {
        let liquidity = 1_000_000_000_000u128;
        let (a0, a1) = amounts_for_liquidity(300, 0, 600, liquidity, D0, D1).unwrap();
        assert!(a0 > Decimal::ZERO);
        assert!(a1 > Decimal::ZERO);

        let swapped = amounts_for_liquidity(300, 600, 0, liquidity, D0, D1).unwrap();
        assert_eq!(swapped, (a0, a1));
    }

    #[test]
    fn test_liquidity_round_trip_never_exceeds_input() {
        let liquidity = 1_000_000_000_000u128;
        let cases = [
            (-600, -300, 300),
            (-300, -300, 300),
            (0, -300, 300),
            (120, -300, 300),
            (300, -300, 300),
            (900, -300, 300),
            (46_080, 45_000, 47_040),
        ];
        for (tick, lower, upper) in cases {
            let (a0, a1) = amounts_for_liquidity(tick, lower, upper, liquidity, 6, 18).unwrap();
            let back = liquidity_for_amounts(tick, lower, upper, a0, a1, 6, 18).unwrap();
            assert!(back <= liquidity, "tick {tick}: {back} > {liquidity}");
            assert!(back >= liquidity - liquidity / 1_000_000_000, "tick {tick}: {back}");
        }
    }

    #[test]
    fn test_liquidity_interior_uses_binding_token() {
        let (a0, a1) = amounts_for_liquidity(300, 0, 600, 1_000_000_000_000, D0, D1).unwrap();
        let full = liquidity_for_amounts(300, 0, 600, a0, a1, D0, D1).unwrap();
        let half_token1 = liquidity_for_amounts(300, 0, 600, a0, a1 / dec!(2), D0, D1).unwrap();
        assert!(half_token1 < full);
        assert!(half_token1 >= full / 2 - 1 && half_token1 <= full / 2 + 1);
    }

    #[test]
    fn test_zero_decimals_is_configuration_error() {
        assert!(matches!(
            amounts_for_liquidity(0, -60, 60, 1000, 0, 18),
            Err(SimulationError::Configuration(_))
        ));
        assert!(matches!(
            liquidity_for_amounts(0, 60, 60, dec!(1), dec!(1), 18, 18),
            Err(SimulationError::Configuration(_))
        ));
    }

    #[test]
    fn test_negative_amount_is_invariant_violation() {
        assert!(matches!(
            liquidity_for_amounts(-120, 0, 600, dec!(-1), Decimal::ZERO, D0, D1),
            Err(SimulationError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_swap_to_ratio_outside_range() {
        // range above the current tick: all token0
        let above = swap_to_ratio(dec!(50), dec!(50), 60, 600, 0, 1.0).unwrap();
        assert!((above.amount0.to_f64().unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(above.amount1, Decimal::ZERO);
        assert!((above.swapped_notional.to_f64().unwrap() - 50.0).abs() < 1e-9);

        // range below the current tick: all token1
        let below = swap_to_ratio(dec!(100), Decimal::ZERO, -600, -60, 0, 1.0).unwrap();
        assert_eq!(below.amount0, Decimal::ZERO);
        assert!((below.amount1.to_f64().unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_swap_to_ratio_matches_range_composition() {
        let swapped = swap_to_ratio(dec!(1000), Decimal::ZERO, -600, 600, 0, 1.0).unwrap();
        let total = swapped.amount0 + swapped.amount1;
        assert!((total.to_f64().unwrap() - 1000.0).abs() < 1e-6);

        let (r0, r1) = amounts_for_liquidity(0, -600, 600, 1_000_000_000_000, D0, D1).unwrap();
        let target = r1.to_f64().unwrap() / r0.to_f64().unwrap();
        let got = swapped.amount1.to_f64().unwrap() / swapped.amount0.to_f64().unwrap();
        assert!((got - target).abs() < 1e-6);

        // symmetric range at price 1: roughly half of the value moves
        assert!((swapped.swapped_notional.to_f64().unwrap() - 500.0).abs() < 20.0);
    }

    #[test]
    fn test_swap_to_ratio_rejects_inverted_bounds() {
        assert!(swap_to_ratio(dec!(1), dec!(1), 600, 0, 0, 1.0).is_err());
    }
}
