//! Domain types and math for concentrated liquidity backtesting.
//!
//! This crate is dependency-light and side-effect free:
//! - Tick, sqrt-price and liquidity math (`math`)
//! - Range positions and swap records (`entities`)
//! - Pool parameters, balances and time series points (`value_objects`)
//! - Return and risk statistics (`metrics`)

/// Error type shared across the workspace.
pub mod error;
/// Range positions and swap events.
pub mod entities;
/// Fee tier definitions.
pub mod fees;
/// Tick and liquidity math.
pub mod math;
/// Return, risk and impermanent loss statistics.
pub mod metrics;
/// Market parameters, balances and series points.
pub mod value_objects;

pub use error::{Result, SimulationError};
