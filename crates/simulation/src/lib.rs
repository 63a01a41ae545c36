//! Concentrated liquidity backtesting kernel.
//!
//! A [`driver::SimulationDriver`] folds a [`simulator::PositionSimulator`]
//! over historical prices and swaps. The simulator consults a rebalance
//! policy from [`strategies`] at every step and emits one
//! [`observation::Observation`] per price point, which
//! [`analyzer::PerformanceAnalyzer`] reduces to summary statistics.

pub mod analyzer;
pub mod config;
pub mod driver;
pub mod fees;
pub mod observation;
pub mod prelude;
pub mod simulator;
pub mod strategies;
