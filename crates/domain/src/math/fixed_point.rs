//! Conversions between f64 and the Q64.96 fixed-point sqrt-price format.

use crate::error::{Result, SimulationError};
use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// 2^96 as f64.
pub const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0;

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// Truncates a non-negative f64 into a `U256`.
///
/// Returns `None` for negative, non-finite or oversized inputs.
pub fn f64_to_u256(value: f64) -> Option<U256> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let truncated = value.trunc();
    if truncated < TWO_POW_64 {
        return Some(U256::from(truncated as u64));
    }

    // value = mantissa * 2^shift with a mantissa that fits in 53 bits
    let exponent = truncated.log2().floor() as i32;
    if exponent > 192 {
        return None;
    }
    let shift = exponent - 52;
    let mantissa = truncated / 2f64.powi(shift);
    Some(U256::from(mantissa as u64) << (shift as usize))
}

/// Converts a `U256` into the nearest f64.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .0
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * TWO_POW_64 + *limb as f64)
}

/// Converts an f64 computed by the math layer into a `Decimal`.
pub fn decimal_from_f64(value: f64) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(SimulationError::numeric(format!(
            "non-finite value {value}"
        )));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| SimulationError::numeric(format!("{value} does not fit a decimal")))
}

/// Converts a `Decimal` into f64 for transcendental math.
pub fn decimal_to_f64(value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| SimulationError::numeric(format!("{value} does not fit an f64")))
}

/// Truncates a computed liquidity into `u128`.
pub fn liquidity_from_f64(value: f64) -> Result<u128> {
    if value.is_nan() || value < 0.0 {
        return Err(SimulationError::invariant(format!(
            "negative liquidity computed: {value}"
        )));
    }
    if !value.is_finite() || value >= u128::MAX as f64 {
        return Err(SimulationError::numeric(format!(
            "liquidity {value} overflows u128"
        )));
    }
    Ok(value.trunc() as u128)
}
