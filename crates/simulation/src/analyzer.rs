//! Performance statistics over an observation series.
//!
//! Valuations are converted to USD through an optional token0 quote series
//! (latest quote at or before each observation, 1 when no series is given)
//! and reduced to returns, risk figures and impermanent loss. Statistics are
//! plain `f64`; results that are undefined for the input, such as a Sharpe
//! ratio without volatility, are NaN.

use crate::observation::Observation;
use chrono::{DateTime, Utc};
use clmm_backtest_domain::error::{Result, SimulationError};
use clmm_backtest_domain::math::fixed_point::decimal_to_f64;
use clmm_backtest_domain::metrics::fees::{annualize, simple_return};
use clmm_backtest_domain::metrics::impermanent_loss::impermanent_loss;
use clmm_backtest_domain::metrics::risk::{annualized_volatility, max_drawdown, mean, median};
use clmm_backtest_domain::value_objects::{QuotePoint, as_of};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Spacing of the observation series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Minute,
    Hour,
    Day,
}

impl Frequency {
    /// Number of periods in a year.
    pub fn annualization_factor(self) -> f64 {
        match self {
            Self::Minute => 525_600.0,
            Self::Hour => 8_760.0,
            Self::Day => 365.0,
        }
    }
}

impl FromStr for Frequency {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minute" | "m" => Ok(Self::Minute),
            "hour" | "h" => Ok(Self::Hour),
            "day" | "d" => Ok(Self::Day),
            other => Err(SimulationError::configuration(format!(
                "unknown frequency `{other}`"
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        })
    }
}

/// Valuation of the strategy and of the hold benchmark at one observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub timestamp: DateTime<Utc>,
    /// Ranges, leftover and uncollected fees in USD.
    pub value_position_usd: f64,
    /// The first observation's token totals, held, in USD.
    pub value_hold_usd: f64,
    /// Fees earned up to and including this observation, in USD.
    pub cum_fees_usd: f64,
    /// Value of range slot 0 over ranges plus leftover.
    pub first_position_share: f64,
}

/// Summary statistics of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Length of the run in days.
    pub days: f64,
    pub gross_fee_apr: f64,
    pub gross_fee_return: f64,
    pub net_apr: f64,
    pub net_return: f64,
    /// Number of observations with `reset_flag` set.
    pub rebalances: usize,
    /// Largest peak-to-trough decline, as a positive fraction.
    pub max_drawdown: f64,
    /// Annualized volatility of period returns.
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub impermanent_loss: f64,
    pub mean_first_position_share: f64,
    pub median_first_position_share: f64,
    /// Final position value in USD.
    pub final_value: f64,
}

/// Reduces observation series to valuations and summary statistics.
#[derive(Debug, Clone, Default)]
pub struct PerformanceAnalyzer {
    frequency: Frequency,
    quotes: Vec<QuotePoint>,
}

impl PerformanceAnalyzer {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            quotes: Vec::new(),
        }
    }

    /// Sets the token0 -> USD quotes, sorted by timestamp.
    #[must_use]
    pub fn with_quotes(mut self, quotes: Vec<QuotePoint>) -> Self {
        self.quotes = quotes;
        self
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    fn usd_per_token0(&self, at: DateTime<Utc>) -> Result<f64> {
        if self.quotes.is_empty() {
            return Ok(1.0);
        }
        let quote = as_of(&self.quotes, at, |q| q.timestamp).ok_or_else(|| {
            SimulationError::insufficient_data(format!("no token0 quote at or before {at}"))
        })?;
        decimal_to_f64(quote.token0_usd)
    }

    /// Values every observation in USD.
    pub fn valuation_series(&self, observations: &[Observation]) -> Result<Vec<ValuationPoint>> {
        let Some(first) = observations.first() else {
            return Err(SimulationError::insufficient_data("observation series is empty"));
        };
        if self
            .quotes
            .windows(2)
            .any(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(SimulationError::insufficient_data(
                "quotes are not sorted by timestamp",
            ));
        }

        let hold = first.token_totals();
        let mut cum_fees = 0.0;
        observations
            .iter()
            .map(|obs| -> Result<ValuationPoint> {
                let usd = self.usd_per_token0(obs.timestamp)?;
                cum_fees += decimal_to_f64(obs.period_fees.value_in_token0(obs.price))? * usd;

                let deployed = decimal_to_f64(obs.deployed_and_idle_value())?;
                let first_range = match obs.range_value(0) {
                    Some(value) => decimal_to_f64(value)?,
                    None => 0.0,
                };
                let first_position_share = if deployed > 0.0 {
                    first_range / deployed
                } else {
                    f64::NAN
                };

                Ok(ValuationPoint {
                    timestamp: obs.timestamp,
                    value_position_usd: decimal_to_f64(obs.value_in_token0())? * usd,
                    value_hold_usd: decimal_to_f64(hold.value_in_token0(obs.price))? * usd,
                    cum_fees_usd: cum_fees,
                    first_position_share,
                })
            })
            .collect()
    }

    /// Computes the summary record of a run.
    pub fn summarize(&self, observations: &[Observation]) -> Result<SummaryRecord> {
        let series = self.valuation_series(observations)?;
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(SimulationError::insufficient_data("observation series is empty"));
        };

        let days = (last.timestamp - first.timestamp).num_milliseconds() as f64 / 86_400_000.0;
        let initial = first.value_position_usd;
        let gross_fee_return = if initial == 0.0 {
            f64::NAN
        } else {
            last.cum_fees_usd / initial
        };
        let net_return = simple_return(last.value_position_usd, initial);
        let net_apr = annualize(net_return, days);

        let values: Vec<f64> = series.iter().map(|p| p.value_position_usd).collect();
        let volatility = annualized_volatility(&values, self.frequency.annualization_factor());
        let sharpe_ratio = if volatility.is_finite() && volatility > 0.0 {
            net_apr / volatility
        } else {
            f64::NAN
        };

        let shares: Vec<f64> = series
            .iter()
            .map(|p| p.first_position_share)
            .filter(|s| !s.is_nan())
            .collect();

        let summary = SummaryRecord {
            days,
            gross_fee_apr: annualize(gross_fee_return, days),
            gross_fee_return,
            net_apr,
            net_return,
            rebalances: observations.iter().filter(|o| o.reset_flag).count(),
            max_drawdown: max_drawdown(&values),
            volatility,
            sharpe_ratio,
            impermanent_loss: impermanent_loss(last.value_position_usd, last.value_hold_usd),
            mean_first_position_share: mean(&shares),
            median_first_position_share: median(&shares),
            final_value: last.value_position_usd,
        };
        debug!(?summary, "summarized run");
        Ok(summary)
    }
}
