//! Policy, cost and run configuration.
//!
//! `PolicyConfig` is the deserializable shape handed over by the outer
//! driver; the `with_*` builders mirror it for programmatic use.

use clmm_backtest_domain::error::{Result, SimulationError};
use clmm_backtest_domain::fees::FeeTier;
use clmm_backtest_domain::value_objects::{MarketParams, TokenBalances};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which rebalance policy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// One range re-centred when price moves by `move_percent`.
    FixedPercent,
    /// Two staggered ranges each reset after `duration`.
    DurationDual,
    /// Primary range plus a hedge funded from idle cash on drawdowns.
    PutHedge,
}

fn default_gas_token_price() -> Decimal {
    Decimal::ONE
}

/// Full configuration of a rebalance policy and its cost model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub policy: PolicyKind,
    /// Fee rate, e.g. 0.003 for the 0.3% tier.
    pub fee_tier: Decimal,
    pub decimals0: u8,
    pub decimals1: u8,
    /// Overrides the spacing derived from the fee tier.
    #[serde(default)]
    pub tick_spacing: Option<i32>,
    /// Range width in percent.
    pub range_percent: Decimal,
    /// Price move in percent that triggers a re-centre.
    #[serde(default)]
    pub move_percent: Option<Decimal>,
    #[serde(default)]
    pub duration_secs: Option<i64>,
    #[serde(default)]
    pub buffer_duration_secs: Option<i64>,
    /// Drawdown in percent that activates the hedge range.
    #[serde(default)]
    pub range_percent2: Option<Decimal>,
    /// Share of capital kept idle for the hedge.
    #[serde(default)]
    pub idle_fraction: Option<Decimal>,
    /// Cost of swapping, as a fraction of the swapped notional.
    #[serde(default)]
    pub swap_cost_fraction: Decimal,
    /// Gas units consumed by one rebalance.
    #[serde(default)]
    pub gas_cost_units: Decimal,
    /// Token0 per unit of the gas token.
    #[serde(default = "default_gas_token_price")]
    pub gas_token_price: Decimal,
    #[serde(default)]
    pub disable_costs: bool,
}

impl PolicyConfig {
    fn base(policy: PolicyKind, fee_tier: Decimal, decimals0: u8, decimals1: u8) -> Self {
        Self {
            policy,
            fee_tier,
            decimals0,
            decimals1,
            tick_spacing: None,
            range_percent: Decimal::ZERO,
            move_percent: None,
            duration_secs: None,
            buffer_duration_secs: None,
            range_percent2: None,
            idle_fraction: None,
            swap_cost_fraction: Decimal::ZERO,
            gas_cost_units: Decimal::ZERO,
            gas_token_price: default_gas_token_price(),
            disable_costs: false,
        }
    }

    /// Single range `[price, price * (1 + range%)]`, re-centred on `move%`.
    #[must_use]
    pub fn fixed_percent(
        fee_tier: Decimal,
        decimals0: u8,
        decimals1: u8,
        range_percent: Decimal,
        move_percent: Decimal,
    ) -> Self {
        Self {
            range_percent,
            move_percent: Some(move_percent),
            ..Self::base(PolicyKind::FixedPercent, fee_tier, decimals0, decimals1)
        }
    }

    /// Two ranges each reset once older than `duration_secs`.
    #[must_use]
    pub fn duration_dual(
        fee_tier: Decimal,
        decimals0: u8,
        decimals1: u8,
        range_percent: Decimal,
        duration_secs: i64,
    ) -> Self {
        Self {
            range_percent,
            duration_secs: Some(duration_secs),
            ..Self::base(PolicyKind::DurationDual, fee_tier, decimals0, decimals1)
        }
    }

    /// Primary range re-centred on `move%` plus a hedge armed at `range_percent2`.
    #[must_use]
    pub fn put_hedge(
        fee_tier: Decimal,
        decimals0: u8,
        decimals1: u8,
        range_percent: Decimal,
        move_percent: Decimal,
        range_percent2: Decimal,
    ) -> Self {
        Self {
            range_percent,
            move_percent: Some(move_percent),
            range_percent2: Some(range_percent2),
            ..Self::base(PolicyKind::PutHedge, fee_tier, decimals0, decimals1)
        }
    }

    /// Sets an explicit tick spacing.
    #[must_use]
    pub fn with_tick_spacing(mut self, tick_spacing: i32) -> Self {
        self.tick_spacing = Some(tick_spacing);
        self
    }

    /// Sets the delay before the second range of a dual policy is opened.
    #[must_use]
    pub fn with_buffer(mut self, buffer_duration_secs: i64) -> Self {
        self.buffer_duration_secs = Some(buffer_duration_secs);
        self
    }

    /// Sets the idle cash share of the hedge policy.
    #[must_use]
    pub fn with_idle_fraction(mut self, idle_fraction: Decimal) -> Self {
        self.idle_fraction = Some(idle_fraction);
        self
    }

    /// Sets the swap and gas cost parameters.
    #[must_use]
    pub fn with_costs(mut self, swap_cost_fraction: Decimal, gas_cost_units: Decimal) -> Self {
        self.swap_cost_fraction = swap_cost_fraction;
        self.gas_cost_units = gas_cost_units;
        self
    }

    /// Sets the price of the gas token in token0.
    #[must_use]
    pub fn with_gas_token_price(mut self, gas_token_price: Decimal) -> Self {
        self.gas_token_price = gas_token_price;
        self
    }

    /// Disables every rebalance cost.
    #[must_use]
    pub fn without_costs(mut self) -> Self {
        self.disable_costs = true;
        self
    }

    /// Checks the fields shared by every policy.
    pub fn validate(&self) -> Result<()> {
        if self.fee_tier <= Decimal::ZERO {
            return Err(SimulationError::configuration(format!(
                "fee tier must be positive, got {}",
                self.fee_tier
            )));
        }
        if self.decimals0 == 0 || self.decimals1 == 0 {
            return Err(SimulationError::configuration("token decimals must be positive"));
        }
        if let Some(spacing) = self.tick_spacing
            && spacing <= 0
        {
            return Err(SimulationError::configuration(format!(
                "tick spacing must be positive, got {spacing}"
            )));
        }
        if self.range_percent <= Decimal::ZERO {
            return Err(SimulationError::configuration(format!(
                "range percent must be positive, got {}",
                self.range_percent
            )));
        }
        if let Some(move_percent) = self.move_percent
            && move_percent < Decimal::ZERO
        {
            return Err(SimulationError::configuration("move percent must not be negative"));
        }
        if let Some(idle) = self.idle_fraction
            && (idle < Decimal::ZERO || idle >= Decimal::ONE)
        {
            return Err(SimulationError::configuration(format!(
                "idle fraction must be in [0, 1), got {idle}"
            )));
        }
        if self.swap_cost_fraction < Decimal::ZERO || self.swap_cost_fraction >= Decimal::ONE {
            return Err(SimulationError::configuration(format!(
                "swap cost fraction must be in [0, 1), got {}",
                self.swap_cost_fraction
            )));
        }
        if self.gas_cost_units < Decimal::ZERO || self.gas_token_price < Decimal::ZERO {
            return Err(SimulationError::configuration("gas parameters must not be negative"));
        }
        Ok(())
    }

    /// Pool parameters implied by this config.
    pub fn market(&self) -> Result<MarketParams> {
        let fee_tier = match self.tick_spacing {
            Some(spacing) => FeeTier::new(self.fee_tier, spacing)?,
            None => FeeTier::from_rate(self.fee_tier)?,
        };
        MarketParams::with_fee_tier(fee_tier, self.decimals0, self.decimals1)
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel {
            swap_cost_fraction: self.swap_cost_fraction,
            gas_cost_units: self.gas_cost_units,
            gas_token_price: self.gas_token_price,
            disabled: self.disable_costs,
        }
    }
}

/// Costs charged when liquidity is moved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub swap_cost_fraction: Decimal,
    pub gas_cost_units: Decimal,
    pub gas_token_price: Decimal,
    pub disabled: bool,
}

impl CostModel {
    /// A model that never charges anything.
    pub fn free() -> Self {
        Self {
            swap_cost_fraction: Decimal::ZERO,
            gas_cost_units: Decimal::ZERO,
            gas_token_price: Decimal::ONE,
            disabled: true,
        }
    }

    /// Gas cost in token0 units.
    /// gas = gas_price_wei * gas_units * gas_token_price / 1e18
    pub fn gas_cost(&self, gas_price_wei: Option<Decimal>) -> Decimal {
        match gas_price_wei {
            Some(wei) if !self.disabled => {
                wei * self.gas_cost_units * self.gas_token_price
                    / Decimal::from(1_000_000_000_000_000_000u64)
            }
            _ => Decimal::ZERO,
        }
    }

    /// Swap cost in token0 units for a swapped notional.
    pub fn swap_cost(&self, notional: Decimal) -> Decimal {
        if self.disabled {
            return Decimal::ZERO;
        }
        notional * self.swap_cost_fraction
    }
}

/// Everything needed to run one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub policy: PolicyConfig,
    /// Capital available at the first step.
    pub initial: TokenBalances,
}

impl SimulationConfig {
    /// Creates a config funded with token0 only.
    #[must_use]
    pub fn new(policy: PolicyConfig, initial_token0: Decimal) -> Self {
        Self {
            policy,
            initial: TokenBalances::new(initial_token0, Decimal::ZERO),
        }
    }

    /// Sets the initial token1 balance.
    #[must_use]
    pub fn with_initial_token1(mut self, initial_token1: Decimal) -> Self {
        self.initial.token1 = initial_token1;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;
        if self.initial.token0 < Decimal::ZERO || self.initial.token1 < Decimal::ZERO {
            return Err(SimulationError::configuration(
                "initial balances must not be negative",
            ));
        }
        Ok(())
    }
}
