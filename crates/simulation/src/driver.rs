//! Drives a simulator over historical market data.
//!
//! The driver checks the input series once, then feeds the simulator one
//! price point at a time together with the swaps of the window
//! `(previous point, point]` and the gas price as of the point. Runs are
//! lazy: [`SimulationDriver::iter`] yields observations as they are
//! produced, so a caller can stop early by dropping the iterator.

use crate::config::SimulationConfig;
use crate::observation::Observation;
use crate::simulator::{PositionSimulator, StepInput};
use clmm_backtest_domain::entities::SwapEvent;
use clmm_backtest_domain::error::{Result, SimulationError};
use clmm_backtest_domain::value_objects::{GasPricePoint, PricePoint, as_of};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Historical inputs of one backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketHistory {
    /// Pool prices with strictly increasing timestamps.
    pub prices: Vec<PricePoint>,
    /// Swaps sorted by timestamp, all after the first price point.
    #[serde(default)]
    pub swaps: Vec<SwapEvent>,
    /// Gas prices sorted by timestamp.
    #[serde(default)]
    pub gas_prices: Option<Vec<GasPricePoint>>,
}

impl MarketHistory {
    pub fn new(prices: Vec<PricePoint>) -> Self {
        Self {
            prices,
            swaps: Vec::new(),
            gas_prices: None,
        }
    }

    #[must_use]
    pub fn with_swaps(mut self, swaps: Vec<SwapEvent>) -> Self {
        self.swaps = swaps;
        self
    }

    #[must_use]
    pub fn with_gas_prices(mut self, gas_prices: Vec<GasPricePoint>) -> Self {
        self.gas_prices = Some(gas_prices);
        self
    }

    /// Checks ordering and coverage of every series.
    pub fn validate(&self) -> Result<()> {
        let (Some(first), Some(last)) = (self.prices.first(), self.prices.last()) else {
            return Err(SimulationError::insufficient_data("price series is empty"));
        };
        if let Some(pair) = self
            .prices
            .windows(2)
            .find(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(SimulationError::insufficient_data(format!(
                "price timestamps must be strictly increasing, {} follows {}",
                pair[1].timestamp, pair[0].timestamp
            )));
        }
        if self
            .swaps
            .windows(2)
            .any(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(SimulationError::insufficient_data("swaps are not sorted by timestamp"));
        }
        if let Some(swap) = self
            .swaps
            .iter()
            .find(|swap| swap.timestamp <= first.timestamp || swap.timestamp > last.timestamp)
        {
            return Err(SimulationError::insufficient_data(format!(
                "swap at {} falls outside the price series ({}, {}]",
                swap.timestamp, first.timestamp, last.timestamp
            )));
        }
        if let Some(gas) = &self.gas_prices {
            if gas
                .windows(2)
                .any(|pair| pair[1].timestamp < pair[0].timestamp)
            {
                return Err(SimulationError::insufficient_data(
                    "gas prices are not sorted by timestamp",
                ));
            }
            match gas.first() {
                Some(point) if point.timestamp <= first.timestamp => {}
                _ => {
                    return Err(SimulationError::insufficient_data(format!(
                        "gas series does not cover the first price point at {}",
                        first.timestamp
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Validated pairing of a config and its market history.
#[derive(Debug, Clone, Copy)]
pub struct SimulationDriver<'a> {
    config: &'a SimulationConfig,
    history: &'a MarketHistory,
}

impl<'a> SimulationDriver<'a> {
    /// Validates both inputs.
    pub fn new(config: &'a SimulationConfig, history: &'a MarketHistory) -> Result<Self> {
        config.validate()?;
        history.validate()?;
        Ok(Self { config, history })
    }

    /// Starts a lazy run.
    pub fn iter(&self) -> Result<SimulationRun<'a>> {
        let simulator = PositionSimulator::new(self.config)?;
        info!(
            policy = simulator.policy().name(),
            points = self.history.prices.len(),
            swaps = self.history.swaps.len(),
            "starting simulation"
        );
        Ok(SimulationRun {
            simulator,
            history: self.history,
            next_point: 0,
            swap_cursor: 0,
            done: false,
        })
    }

    /// Runs to completion and collects every observation.
    pub fn run(&self) -> Result<Vec<Observation>> {
        let observations = self.iter()?.collect::<Result<Vec<_>>>()?;
        info!(observations = observations.len(), "simulation finished");
        Ok(observations)
    }
}

/// Iterator over the observations of a run.
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug)]
pub struct SimulationRun<'a> {
    simulator: PositionSimulator,
    history: &'a MarketHistory,
    next_point: usize,
    swap_cursor: usize,
    done: bool,
}

impl SimulationRun<'_> {
    /// The simulator, for inspecting policy state mid-run.
    pub fn simulator(&self) -> &PositionSimulator {
        &self.simulator
    }
}

impl Iterator for SimulationRun<'_> {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(point) = self.history.prices.get(self.next_point) else {
            self.done = true;
            return None;
        };
        self.next_point += 1;

        let pending = &self.history.swaps[self.swap_cursor..];
        let window_len = pending.partition_point(|swap| swap.timestamp <= point.timestamp);
        let swaps = &pending[..window_len];
        self.swap_cursor += window_len;

        let gas_price_wei = self
            .history
            .gas_prices
            .as_deref()
            .and_then(|gas| as_of(gas, point.timestamp, |g| g.timestamp))
            .map(|g| g.gas_price_wei);

        let result = self.simulator.step(StepInput {
            timestamp: point.timestamp,
            price: point.price,
            swaps,
            gas_price_wei,
        });
        if let Err(err) = &result {
            warn!(timestamp = %point.timestamp, error = %err, "simulation aborted");
            self.done = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        (0, Some(self.history.prices.len() - self.next_point))
    }
}

impl std::iter::FusedIterator for SimulationRun<'_> {}
