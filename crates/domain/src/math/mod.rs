pub mod concentrated_liquidity;
pub mod fixed_point;
pub mod price_tick;
