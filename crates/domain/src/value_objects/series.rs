use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pool price (token1 per token0, human units) at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

/// Gas price in wei at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasPricePoint {
    pub timestamp: DateTime<Utc>,
    pub gas_price_wei: Decimal,
}

/// USD price of one unit of token0 at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotePoint {
    pub timestamp: DateTime<Utc>,
    pub token0_usd: Decimal,
}

/// Latest entry at or before `at` in a timestamp-ordered slice.
pub fn as_of<T>(
    series: &[T],
    at: DateTime<Utc>,
    timestamp: impl Fn(&T) -> DateTime<Utc>,
) -> Option<&T> {
    let idx = series.partition_point(|item| timestamp(item) <= at);
    idx.checked_sub(1).map(|i| &series[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_as_of_backward_join() {
        let t = |s| DateTime::from_timestamp(s, 0).unwrap();
        let series = vec![
            GasPricePoint { timestamp: t(10), gas_price_wei: dec!(1) },
            GasPricePoint { timestamp: t(20), gas_price_wei: dec!(2) },
        ];
        let get = |s| as_of(&series, t(s), |g| g.timestamp).map(|g| g.gas_price_wei);
        assert_eq!(get(5), None);
        assert_eq!(get(10), Some(dec!(1)));
        assert_eq!(get(19), Some(dec!(1)));
        assert_eq!(get(25), Some(dec!(2)));
    }
}
