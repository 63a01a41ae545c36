use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// A token0/token1 pair of human-unit amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalances {
    pub token0: Decimal,
    pub token1: Decimal,
}

impl TokenBalances {
    pub fn new(token0: Decimal, token1: Decimal) -> Self {
        Self { token0, token1 }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.token0.is_zero() && self.token1.is_zero()
    }

    /// Scales both sides by `factor`.
    pub fn scaled(&self, factor: Decimal) -> Self {
        Self::new(self.token0 * factor, self.token1 * factor)
    }

    /// Value in token0 units at `price` (token1 per token0).
    pub fn value_in_token0(&self, price: Decimal) -> Decimal {
        if price.is_zero() {
            return self.token0;
        }
        self.token0 + self.token1 / price
    }
}

impl Add for TokenBalances {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.token0 + rhs.token0, self.token1 + rhs.token1)
    }
}

impl AddAssign for TokenBalances {
    fn add_assign(&mut self, rhs: Self) {
        self.token0 += rhs.token0;
        self.token1 += rhs.token1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balances_arithmetic() {
        let mut a = TokenBalances::new(dec!(10), dec!(4));
        a += TokenBalances::new(dec!(1), dec!(1));
        assert_eq!(a, TokenBalances::new(dec!(11), dec!(5)));
        assert_eq!(a.scaled(dec!(0.5)), TokenBalances::new(dec!(5.5), dec!(2.5)));
        assert_eq!(a.value_in_token0(dec!(5)), dec!(12));
        assert!(TokenBalances::zero().is_zero());
    }
}
