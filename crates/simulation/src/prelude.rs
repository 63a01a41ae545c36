//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use clmm_backtest_simulation::prelude::*;
//! ```

// Analysis
pub use crate::analyzer::{Frequency, PerformanceAnalyzer, SummaryRecord, ValuationPoint};

// Configuration
pub use crate::config::{CostModel, PolicyConfig, PolicyKind, SimulationConfig};

// Driver
pub use crate::driver::{MarketHistory, SimulationDriver, SimulationRun};

// Fees
pub use crate::fees::FeeAccrualEngine;

// Observations
pub use crate::observation::{Observation, ResetReason};

// Simulator
pub use crate::simulator::{PositionSimulator, StepInput};

// Strategies
pub use crate::strategies::{
    DurationDualPosition, DurationDualState, FixedPercentSingleRange, FixedPercentState, Funding,
    PolicyContext, PolicyDecision, PolicyState, PutHedgeState, PutStyleAsymmetricDual,
    RangeChange, RebalancePlan, RebalancePolicy, RebalanceStrategy,
};
