//! Error type shared by every stage of a backtest.

use thiserror::Error;

/// Errors raised while building or running a simulation.
///
/// Every error is fatal for the run that produced it: each step depends on
/// the state left by the previous one, so there is no way to skip a step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// Invalid configuration or malformed range bounds.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Missing, empty or unordered input data.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    /// Token accounting broke an invariant.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    /// A numeric input was outside the domain of a function.
    #[error("Numeric domain error: {0}")]
    NumericDomain(String),
}

impl SimulationError {
    /// Shorthand for [`SimulationError::Configuration`].
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Shorthand for [`SimulationError::InsufficientData`].
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    /// Shorthand for [`SimulationError::InvariantViolation`].
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Shorthand for [`SimulationError::NumericDomain`].
    pub fn numeric(msg: impl Into<String>) -> Self {
        Self::NumericDomain(msg.into())
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, SimulationError>;
