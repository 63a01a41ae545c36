use crate::error::{Result, SimulationError};
use crate::math::fixed_point::{Q96, decimal_from_f64, decimal_to_f64, f64_to_u256};
use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// Base of the tick grid: price = 1.0001 ^ tick.
pub const TICK_BASE: f64 = 1.0001;

/// Returns the Q64.96 sqrt-price of a tick.
/// sqrtPriceX96 = int(1.0001 ^ (tick / 2) * 2^96)
pub fn sqrt_price_x96(tick: i32) -> Result<U256> {
    let ratio = TICK_BASE.powf(f64::from(tick) / 2.0) * Q96;
    f64_to_u256(ratio).ok_or_else(|| {
        SimulationError::numeric(format!("sqrt price for tick {tick} is out of range"))
    })
}

/// Returns the unaligned tick for a human-unit price.
/// tick = log_1.0001(price * decimal_adjustment)
pub fn raw_tick(price: Decimal, decimal_adjustment: f64) -> Result<f64> {
    if price <= Decimal::ZERO {
        return Err(SimulationError::numeric(format!(
            "price must be positive, got {price}"
        )));
    }
    let price_f64 = decimal_to_f64(price)?;
    let tick = (price_f64 * decimal_adjustment).ln() / TICK_BASE.ln();
    if !tick.is_finite() {
        return Err(SimulationError::numeric(format!(
            "tick for price {price} is not finite"
        )));
    }
    Ok(tick)
}

/// Returns the tick of a price, rounded to the nearest multiple of `tick_spacing`.
pub fn price_to_tick(price: Decimal, decimal_adjustment: f64, tick_spacing: i32) -> Result<i32> {
    if tick_spacing <= 0 {
        return Err(SimulationError::configuration(format!(
            "tick spacing must be positive, got {tick_spacing}"
        )));
    }
    let spacing = f64::from(tick_spacing);
    let aligned = (raw_tick(price, decimal_adjustment)? / spacing).round() * spacing;
    if aligned < f64::from(i32::MIN) || aligned > f64::from(i32::MAX) {
        return Err(SimulationError::numeric(format!(
            "tick for price {price} overflows i32"
        )));
    }
    Ok(aligned as i32)
}

/// Returns the human-unit price of a tick.
/// P = 1.0001 ^ tick / decimal_adjustment
pub fn tick_to_price(tick: i32, decimal_adjustment: f64) -> Result<Decimal> {
    decimal_from_f64(TICK_BASE.powi(tick) / decimal_adjustment)
}

/// Tick spacing implied by a fee tier, e.g. 0.003 -> 60.
pub fn tick_spacing_for_fee(fee_tier: Decimal) -> Result<i32> {
    if fee_tier <= Decimal::ZERO {
        return Err(SimulationError::configuration(format!(
            "fee tier must be positive, got {fee_tier}"
        )));
    }
    let spacing = (fee_tier * Decimal::from(20_000))
        .round()
        .to_i32()
        .unwrap_or(0);
    if spacing <= 0 {
        return Err(SimulationError::configuration(format!(
            "fee tier {fee_tier} implies a non-positive tick spacing"
        )));
    }
    Ok(spacing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::fixed_point::u256_to_f64;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sqrt_price_at_zero() {
        assert_eq!(sqrt_price_x96(0).unwrap(), U256::one() << 96);
    }

    #[test]
    fn test_sqrt_price_is_monotonic() {
        let a = sqrt_price_x96(-60).unwrap();
        let b = sqrt_price_x96(0).unwrap();
        let c = sqrt_price_x96(60).unwrap();
        assert!(a < b && b < c);

        let expected = 1.0001f64.powf(30.0) * Q96;
        let got = u256_to_f64(c);
        assert!(((got - expected) / expected).abs() < 1e-12);
    }

    #[test]
    fn test_tick_to_price() {
        let p = tick_to_price(0, 1.0).unwrap();
        assert_eq!(p, Decimal::from(1));

        // Tick 100 -> 1.0001^100 ~= 1.010049
        let p100 = tick_to_price(100, 1.0).unwrap();
        let diff = (p100.to_f64().unwrap() - 1.01004966).abs();
        assert!(diff < 0.000001);
    }

    #[test]
    fn test_price_to_tick_alignment() {
        assert_eq!(price_to_tick(dec!(1), 1.0, 60).unwrap(), 0);
        assert_eq!(price_to_tick(dec!(1.01004966), 1.0, 1).unwrap(), 100);
        // tick ~100 rounds to the nearest multiple of 60
        assert_eq!(price_to_tick(dec!(1.01004966), 1.0, 60).unwrap(), 120);
        assert_eq!(price_to_tick(dec!(0.99), 1.0, 10).unwrap(), -100);
    }

    #[test]
    fn test_price_to_tick_with_decimal_adjustment() {
        // 6/18 decimals pool: price 0.0005 token1 per token0 -> raw price 5e8
        let tick = price_to_tick(dec!(0.0005), 1e12, 60).unwrap();
        let expected = (5e8f64.ln() / TICK_BASE.ln() / 60.0).round() as i32 * 60;
        assert_eq!(tick, expected);
    }

    #[test]
    fn test_non_positive_price_is_rejected() {
        assert!(matches!(
            price_to_tick(Decimal::ZERO, 1.0, 60),
            Err(SimulationError::NumericDomain(_))
        ));
        assert!(matches!(
            price_to_tick(dec!(-2), 1.0, 60),
            Err(SimulationError::NumericDomain(_))
        ));
        assert!(matches!(
            price_to_tick(dec!(1), 1.0, 0),
            Err(SimulationError::Configuration(_))
        ));
    }

    #[test]
    fn test_tick_spacing_for_fee() {
        assert_eq!(tick_spacing_for_fee(dec!(0.0005)).unwrap(), 10);
        assert_eq!(tick_spacing_for_fee(dec!(0.003)).unwrap(), 60);
        assert_eq!(tick_spacing_for_fee(dec!(0.01)).unwrap(), 200);
        assert!(tick_spacing_for_fee(Decimal::ZERO).is_err());
    }
}
