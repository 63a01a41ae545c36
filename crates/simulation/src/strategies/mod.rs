//! Rebalance policies.
//!
//! A policy never touches balances. It looks at a [`PolicyContext`] and
//! answers with a [`RebalancePlan`] describing which range slots to move and
//! how to fund them; the simulator executes the plan. Policy state is passed
//! in by value and handed back, so a policy is a pure function of its inputs.

pub mod duration_dual;
pub mod fixed_percent;
pub mod put_hedge;

pub use duration_dual::{DurationDualPosition, DurationDualState};
pub use fixed_percent::{FixedPercentSingleRange, FixedPercentState};
pub use put_hedge::{PutHedgeState, PutStyleAsymmetricDual};

use crate::config::{PolicyConfig, PolicyKind};
use crate::observation::ResetReason;
use chrono::{DateTime, Duration, Utc};
use clmm_backtest_domain::entities::{RangePosition, TickRange};
use clmm_backtest_domain::error::{Result, SimulationError};
use clmm_backtest_domain::value_objects::MarketParams;
use rust_decimal::Decimal;
use std::fmt;

/// How much of the leftover balance a range receives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Funding {
    /// Everything left at that point of the plan.
    All,
    /// A share in `(0, 1]` of what is left at that point of the plan.
    Share(Decimal),
    /// Nothing; the slot keeps its bounds but holds no liquidity.
    Nothing,
}

/// One slot touched by a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeChange {
    pub slot: usize,
    /// New bounds, or `None` to leave the slot withdrawn.
    pub target: Option<TickRange>,
    pub funding: Funding,
    /// Convert the funding into the range's deposit ratio before deploying.
    pub swap_to_ratio: bool,
}

impl RangeChange {
    /// Opens `slot` on `target` with the given funding.
    #[must_use]
    pub fn open(slot: usize, target: TickRange, funding: Funding) -> Self {
        Self {
            slot,
            target: Some(target),
            funding,
            swap_to_ratio: false,
        }
    }

    /// Reserves `slot` with bounds but no liquidity.
    #[must_use]
    pub fn placeholder(slot: usize, target: TickRange) -> Self {
        Self::open(slot, target, Funding::Nothing)
    }

    /// Withdraws `slot` without redeploying it.
    #[must_use]
    pub fn close(slot: usize) -> Self {
        Self {
            slot,
            target: None,
            funding: Funding::Nothing,
            swap_to_ratio: false,
        }
    }

    /// Enables swapping into the deposit ratio.
    #[must_use]
    pub fn with_swap(mut self) -> Self {
        self.swap_to_ratio = true;
        self
    }
}

/// Ordered slot changes applied in one step.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancePlan {
    pub reason: ResetReason,
    pub changes: Vec<RangeChange>,
}

impl RebalancePlan {
    pub fn new(reason: ResetReason, changes: Vec<RangeChange>) -> Self {
        Self { reason, changes }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDecision {
    Hold,
    Rebalance(RebalancePlan),
}

/// Market view handed to a policy at one step.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    /// Aligned tick of `price`.
    pub tick: i32,
    pub market: &'a MarketParams,
    /// Range slots after revaluation at `tick`.
    pub ranges: &'a [RangePosition],
}

impl PolicyContext<'_> {
    /// Aligned tick of an arbitrary price.
    pub fn aligned_tick(&self, price: Decimal) -> Result<i32> {
        self.market.tick_for_price(price)
    }

    /// Range between two prices, each aligned to the tick spacing.
    ///
    /// A range narrower than one spacing is widened upwards to one spacing.
    pub fn range_between(&self, lower_price: Decimal, upper_price: Decimal) -> Result<TickRange> {
        let spacing = self.market.tick_spacing();
        let lower = self.aligned_tick(lower_price)?;
        let upper = self.aligned_tick(upper_price)?.max(lower + spacing);
        TickRange::new(lower, upper, spacing)
    }
}

/// Percent value to a fraction, e.g. 5 -> 0.05.
pub(crate) fn percent(value: Decimal) -> Decimal {
    value / Decimal::ONE_HUNDRED
}

/// Absolute price move from `reference` in percent.
pub(crate) fn price_move_percent(reference: Decimal, price: Decimal) -> Result<Decimal> {
    if reference <= Decimal::ZERO {
        return Err(SimulationError::numeric(format!(
            "reference price must be positive, got {reference}"
        )));
    }
    Ok((price - reference).abs() / reference * Decimal::ONE_HUNDRED)
}

/// A rebalancing policy.
pub trait RebalanceStrategy {
    /// Per-run state threaded through every check.
    type State: Clone + fmt::Debug;

    /// Returns the policy name.
    fn name(&self) -> &'static str;

    /// Plans the ranges opened at the first step.
    fn initialize(&self, ctx: &PolicyContext<'_>) -> Result<(RebalancePlan, Self::State)>;

    /// Decides whether to move ranges at a later step.
    fn check_rebalance(
        &self,
        ctx: &PolicyContext<'_>,
        state: Self::State,
    ) -> Result<(PolicyDecision, Self::State)>;
}

/// One of the supported policies.
#[derive(Debug, Clone, PartialEq)]
pub enum RebalancePolicy {
    FixedPercent(FixedPercentSingleRange),
    DurationDual(DurationDualPosition),
    PutHedge(PutStyleAsymmetricDual),
}

/// State of whichever policy is running.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyState {
    FixedPercent(FixedPercentState),
    DurationDual(DurationDualState),
    PutHedge(PutHedgeState),
}

fn required<T>(value: Option<T>, field: &str, policy: PolicyKind) -> Result<T> {
    value.ok_or_else(|| {
        SimulationError::configuration(format!("{policy:?} policy requires `{field}`"))
    })
}

impl RebalancePolicy {
    /// Builds the policy selected by `config`.
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        config.validate()?;
        let kind = config.policy;
        let policy = match kind {
            PolicyKind::FixedPercent => Self::FixedPercent(FixedPercentSingleRange::new(
                config.range_percent,
                required(config.move_percent, "move_percent", kind)?,
            )),
            PolicyKind::DurationDual => {
                let duration_secs = required(config.duration_secs, "duration_secs", kind)?;
                if duration_secs <= 0 {
                    return Err(SimulationError::configuration(format!(
                        "duration must be positive, got {duration_secs}s"
                    )));
                }
                let mut policy = DurationDualPosition::new(
                    config.range_percent,
                    Duration::seconds(duration_secs),
                );
                if let Some(buffer_secs) = config.buffer_duration_secs {
                    if buffer_secs < 0 {
                        return Err(SimulationError::configuration(format!(
                            "buffer duration must not be negative, got {buffer_secs}s"
                        )));
                    }
                    policy = policy.with_buffer(Duration::seconds(buffer_secs));
                }
                Self::DurationDual(policy)
            }
            PolicyKind::PutHedge => {
                if config.range_percent >= Decimal::ONE_HUNDRED {
                    return Err(SimulationError::configuration(
                        "put hedge range percent must be below 100",
                    ));
                }
                let hedge_percent = required(config.range_percent2, "range_percent2", kind)?;
                if hedge_percent <= Decimal::ZERO || hedge_percent >= Decimal::ONE_HUNDRED {
                    return Err(SimulationError::configuration(format!(
                        "hedge percent must be in (0, 100), got {hedge_percent}"
                    )));
                }
                let mut policy = PutStyleAsymmetricDual::new(
                    config.range_percent,
                    required(config.move_percent, "move_percent", kind)?,
                    hedge_percent,
                );
                if let Some(idle) = config.idle_fraction {
                    policy = policy.with_idle_fraction(idle);
                }
                Self::PutHedge(policy)
            }
        };
        Ok(policy)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FixedPercent(p) => p.name(),
            Self::DurationDual(p) => p.name(),
            Self::PutHedge(p) => p.name(),
        }
    }

    /// Plans the first deployment.
    pub fn initialize(&self, ctx: &PolicyContext<'_>) -> Result<(RebalancePlan, PolicyState)> {
        Ok(match self {
            Self::FixedPercent(p) => {
                let (plan, state) = p.initialize(ctx)?;
                (plan, PolicyState::FixedPercent(state))
            }
            Self::DurationDual(p) => {
                let (plan, state) = p.initialize(ctx)?;
                (plan, PolicyState::DurationDual(state))
            }
            Self::PutHedge(p) => {
                let (plan, state) = p.initialize(ctx)?;
                (plan, PolicyState::PutHedge(state))
            }
        })
    }

    /// Checks the policy against its own state.
    pub fn check_rebalance(
        &self,
        ctx: &PolicyContext<'_>,
        state: PolicyState,
    ) -> Result<(PolicyDecision, PolicyState)> {
        Ok(match (self, state) {
            (Self::FixedPercent(p), PolicyState::FixedPercent(s)) => {
                let (decision, s) = p.check_rebalance(ctx, s)?;
                (decision, PolicyState::FixedPercent(s))
            }
            (Self::DurationDual(p), PolicyState::DurationDual(s)) => {
                let (decision, s) = p.check_rebalance(ctx, s)?;
                (decision, PolicyState::DurationDual(s))
            }
            (Self::PutHedge(p), PolicyState::PutHedge(s)) => {
                let (decision, s) = p.check_rebalance(ctx, s)?;
                (decision, PolicyState::PutHedge(s))
            }
            (policy, state) => {
                return Err(SimulationError::invariant(format!(
                    "{} policy cannot run with state {state:?}",
                    policy.name()
                )));
            }
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_range_between_aligns() {
        let market = market();
        let ctx = context(&market, 0, dec!(1));
        let range = ctx.range_between(dec!(1), dec!(1.05)).unwrap();
        assert_eq!(range.lower_tick, 0);
        assert_eq!(range.upper_tick, 480);

        let narrow = ctx.range_between(dec!(0.9975), dec!(1.0024875)).unwrap();
        assert_eq!(narrow, TickRange::new(0, 60, 60).unwrap());
    }

    #[test]
    fn test_price_move_percent() {
        assert_eq!(price_move_percent(dec!(100), dec!(97)).unwrap(), dec!(3));
        assert!(price_move_percent(dec!(0), dec!(1)).is_err());
    }

    #[test]
    fn test_from_config_requires_policy_fields() {
        let mut config = PolicyConfig::fixed_percent(dec!(0.003), 18, 18, dec!(5), dec!(2));
        config.move_percent = None;
        assert!(matches!(
            RebalancePolicy::from_config(&config),
            Err(SimulationError::Configuration(_))
        ));

        let dual = PolicyConfig::duration_dual(dec!(0.003), 18, 18, dec!(5), 0);
        assert!(RebalancePolicy::from_config(&dual).is_err());

        let hedge = PolicyConfig::put_hedge(dec!(0.003), 18, 18, dec!(150), dec!(2), dec!(5));
        assert!(RebalancePolicy::from_config(&hedge).is_err());
    }

    #[test]
    fn test_mismatched_state_is_rejected() {
        let market = market();
        let ctx = context(&market, 0, dec!(1));
        let policy = RebalancePolicy::FixedPercent(FixedPercentSingleRange::new(dec!(5), dec!(2)));
        let state = PolicyState::DurationDual(DurationDualState {
            first_created_at: at(0),
            second_created_at: None,
        });
        assert!(matches!(
            policy.check_rebalance(&ctx, state),
            Err(SimulationError::InvariantViolation(_))
        ));
    }
}
