//! Step-by-step position simulator.
//!
//! The simulator owns every balance: range slots, leftover capital and
//! uncollected fees. Each step it revalues the ranges, accrues fees from the
//! swaps of the window, asks the policy for a plan and executes it. Any error
//! aborts the simulator; later steps fail with an invariant violation.

use crate::config::{CostModel, SimulationConfig};
use crate::fees::FeeAccrualEngine;
use crate::observation::{Observation, ResetReason};
use crate::strategies::{
    Funding, PolicyContext, PolicyDecision, PolicyState, RebalancePlan, RebalancePolicy,
};
use chrono::{DateTime, Utc};
use clmm_backtest_domain::entities::{RangePosition, SwapEvent};
use clmm_backtest_domain::error::{Result, SimulationError};
use clmm_backtest_domain::math::concentrated_liquidity::{
    amounts_for_liquidity, liquidity_for_amounts, swap_to_ratio,
};
use clmm_backtest_domain::value_objects::{MarketParams, TokenBalances};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Relative overshoot of a deposit over its funding that is absorbed as
/// float rounding.
const DEPLOY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Market data for one step.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    pub timestamp: DateTime<Utc>,
    /// Pool price, token1 per token0.
    pub price: Decimal,
    /// Swaps with timestamps in `(previous step, timestamp]`.
    pub swaps: &'a [SwapEvent],
    /// Gas price in wei as of `timestamp`, when a gas series is available.
    pub gas_price_wei: Option<Decimal>,
}

#[derive(Debug, Clone)]
struct PositionBook {
    ranges: Vec<RangePosition>,
    leftover: TokenBalances,
    uncollected: TokenBalances,
    policy_state: PolicyState,
}

#[derive(Debug, Clone)]
enum Phase {
    Uninitialized { capital: TokenBalances },
    Active(PositionBook),
    Aborted,
}

#[derive(Debug, Clone, Copy, Default)]
struct PlanOutcome {
    collected: TokenBalances,
    gas_cost: Decimal,
    swap_cost: Decimal,
}

/// Executes a rebalance policy against a price series.
#[derive(Debug, Clone)]
pub struct PositionSimulator {
    market: MarketParams,
    policy: RebalancePolicy,
    costs: CostModel,
    fees: FeeAccrualEngine,
    phase: Phase,
}

impl PositionSimulator {
    /// Builds a simulator from a validated config.
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let market = config.policy.market()?;
        Ok(Self::with_policy(
            market,
            RebalancePolicy::from_config(&config.policy)?,
            config.policy.cost_model(),
            config.initial,
        ))
    }

    /// Builds a simulator from its parts.
    pub fn with_policy(
        market: MarketParams,
        policy: RebalancePolicy,
        costs: CostModel,
        capital: TokenBalances,
    ) -> Self {
        Self {
            fees: FeeAccrualEngine::new(market.fee_rate()),
            market,
            policy,
            costs,
            phase: Phase::Uninitialized { capital },
        }
    }

    pub fn market(&self) -> &MarketParams {
        &self.market
    }

    pub fn policy(&self) -> &RebalancePolicy {
        &self.policy
    }

    /// Policy state once the first step has run.
    pub fn policy_state(&self) -> Option<&PolicyState> {
        match &self.phase {
            Phase::Active(book) => Some(&book.policy_state),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.phase, Phase::Aborted)
    }

    /// Advances the simulation by one price point.
    pub fn step(&mut self, input: StepInput<'_>) -> Result<Observation> {
        let phase = std::mem::replace(&mut self.phase, Phase::Aborted);
        let (book, observation) = match phase {
            Phase::Uninitialized { capital } => self.first_step(input, capital)?,
            Phase::Active(book) => self.next_step(input, book)?,
            Phase::Aborted => {
                return Err(SimulationError::invariant(
                    "simulator was aborted by an earlier error",
                ));
            }
        };
        self.phase = Phase::Active(book);
        Ok(observation)
    }

    fn first_step(
        &self,
        input: StepInput<'_>,
        capital: TokenBalances,
    ) -> Result<(PositionBook, Observation)> {
        let tick = self.market.tick_for_price(input.price)?;
        let ctx = PolicyContext {
            timestamp: input.timestamp,
            price: input.price,
            tick,
            market: &self.market,
            ranges: &[],
        };
        let (plan, policy_state) = self.policy.initialize(&ctx)?;
        let mut book = PositionBook {
            ranges: Vec::with_capacity(plan.changes.len()),
            leftover: capital,
            uncollected: TokenBalances::zero(),
            policy_state,
        };
        let outcome = self.execute_plan(&mut book, &plan, &input, tick, false)?;
        info!(
            policy = self.policy.name(),
            tick,
            price = %input.price,
            ranges = book.ranges.len(),
            "opened initial ranges"
        );
        let observation = observe(
            &book,
            &input,
            tick,
            TokenBalances::zero(),
            outcome,
            plan.reason,
        );
        Ok((book, observation))
    }

    fn next_step(
        &self,
        input: StepInput<'_>,
        mut book: PositionBook,
    ) -> Result<(PositionBook, Observation)> {
        let tick = self.market.tick_for_price(input.price)?;
        book.ranges = book
            .ranges
            .iter()
            .map(|range| range.revalued(tick, &self.market))
            .collect::<Result<Vec<_>>>()?;

        let period_fees = self.fees.accrue(&book.ranges, input.swaps)?;
        book.uncollected += period_fees;

        let ctx = PolicyContext {
            timestamp: input.timestamp,
            price: input.price,
            tick,
            market: &self.market,
            ranges: &book.ranges,
        };
        let (decision, policy_state) = self.policy.check_rebalance(&ctx, book.policy_state)?;
        book.policy_state = policy_state;

        let (outcome, reason) = match decision {
            PolicyDecision::Hold => (PlanOutcome::default(), ResetReason::None),
            PolicyDecision::Rebalance(plan) => {
                let outcome = self.execute_plan(&mut book, &plan, &input, tick, true)?;
                info!(
                    reason = %plan.reason,
                    tick,
                    price = %input.price,
                    gas_cost = %outcome.gas_cost,
                    swap_cost = %outcome.swap_cost,
                    "rebalanced ranges"
                );
                (outcome, plan.reason)
            }
        };
        debug!(
            timestamp = %input.timestamp,
            tick,
            swaps = input.swaps.len(),
            fees0 = %period_fees.token0,
            fees1 = %period_fees.token1,
            "step complete"
        );
        let observation = observe(&book, &input, tick, period_fees, outcome, reason);
        Ok((book, observation))
    }

    /// Applies a plan: withdraw every touched slot, charge costs, then fund
    /// and deploy the slots in plan order.
    fn execute_plan(
        &self,
        book: &mut PositionBook,
        plan: &RebalancePlan,
        input: &StepInput<'_>,
        tick: i32,
        charge_costs: bool,
    ) -> Result<PlanOutcome> {
        let mut outcome = PlanOutcome::default();

        for change in &plan.changes {
            if let Some(range) = book.ranges.get_mut(change.slot)
                && range.is_active()
            {
                book.leftover += TokenBalances::new(range.token0, range.token1);
                *range = range.withdrawn();
            }
        }
        outcome.collected = book.uncollected;
        book.leftover += book.uncollected;
        book.uncollected = TokenBalances::zero();

        if charge_costs && !self.costs.disabled {
            let gas = self.costs.gas_cost(input.gas_price_wei);
            let (leftover, charged) = deduct(book.leftover, gas, input.price);
            book.leftover = leftover;
            outcome.gas_cost = charged;
        }

        for change in &plan.changes {
            let Some(target) = change.target else {
                continue;
            };
            if change.slot > book.ranges.len() {
                return Err(SimulationError::invariant(format!(
                    "plan skips range slots: slot {} with {} slots open",
                    change.slot,
                    book.ranges.len()
                )));
            }
            let funds = match change.funding {
                Funding::All => book.leftover,
                Funding::Share(share) => book.leftover.scaled(share),
                Funding::Nothing => TokenBalances::zero(),
            };
            let mut rest = TokenBalances::new(
                book.leftover.token0 - funds.token0,
                book.leftover.token1 - funds.token1,
            );

            let mut deposit = funds;
            if change.swap_to_ratio && !funds.is_zero() {
                let swapped = swap_to_ratio(
                    funds.token0,
                    funds.token1,
                    target.lower_tick,
                    target.upper_tick,
                    tick,
                    self.market.decimal_adjustment(),
                )?;
                deposit = repriced(
                    TokenBalances::new(swapped.amount0, swapped.amount1),
                    funds.value_in_token0(input.price),
                    input.price,
                );
                if charge_costs && !self.costs.disabled {
                    let cost = self.costs.swap_cost(swapped.swapped_notional);
                    let (after_cost, charged) = deduct(deposit, cost, input.price);
                    deposit = after_cost;
                    outcome.swap_cost += charged;
                }
            }

            let liquidity = if deposit.is_zero() {
                0
            } else {
                liquidity_for_amounts(
                    tick,
                    target.lower_tick,
                    target.upper_tick,
                    deposit.token0,
                    deposit.token1,
                    self.market.decimals0,
                    self.market.decimals1,
                )?
            };
            let (used0, used1) = if liquidity == 0 {
                (Decimal::ZERO, Decimal::ZERO)
            } else {
                amounts_for_liquidity(
                    tick,
                    target.lower_tick,
                    target.upper_tick,
                    liquidity,
                    self.market.decimals0,
                    self.market.decimals1,
                )?
            };
            let (used0, spare0) = settle(deposit.token0, used0, "token0")?;
            let (used1, spare1) = settle(deposit.token1, used1, "token1")?;
            rest += TokenBalances::new(spare0, spare1);
            book.leftover = rest;

            let range = RangePosition {
                liquidity,
                token0: used0,
                token1: used1,
                ..RangePosition::empty(target, input.timestamp)
            };
            if change.slot == book.ranges.len() {
                book.ranges.push(range);
            } else {
                book.ranges[change.slot] = range;
            }
            debug!(
                slot = change.slot,
                lower_tick = target.lower_tick,
                upper_tick = target.upper_tick,
                liquidity,
                "deployed range"
            );
        }

        Ok(outcome)
    }
}

/// Removes `cost` (token0 units) from `balances` pro rata.
///
/// Returns the reduced balances and the cost actually charged, which is
/// capped at the value of the balances.
fn deduct(balances: TokenBalances, cost: Decimal, price: Decimal) -> (TokenBalances, Decimal) {
    if cost <= Decimal::ZERO {
        return (balances, Decimal::ZERO);
    }
    let value = balances.value_in_token0(price);
    if value <= Decimal::ZERO {
        return (balances, Decimal::ZERO);
    }
    if cost >= value {
        warn!(cost = %cost, available = %value, "cost exceeds available capital, clamping");
        return (TokenBalances::zero(), value);
    }
    (balances.scaled(Decimal::ONE - cost / value), cost)
}

/// Rescales swapped balances so they are worth `value` at `price`.
///
/// The swap itself converts at the tick price; this keeps the deposit ratio
/// while settling the trade at the observed price.
fn repriced(balances: TokenBalances, value: Decimal, price: Decimal) -> TokenBalances {
    let current = balances.value_in_token0(price);
    if current <= Decimal::ZERO {
        return balances;
    }
    balances.scaled(value / current)
}

/// Splits an available amount into the part a range consumed and the spare.
fn settle(available: Decimal, used: Decimal, token: &str) -> Result<(Decimal, Decimal)> {
    if used <= available {
        return Ok((used, available - used));
    }
    if used - available <= available * DEPLOY_TOLERANCE {
        return Ok((available, Decimal::ZERO));
    }
    Err(SimulationError::invariant(format!(
        "range needs {used} {token} but only {available} is available"
    )))
}

fn observe(
    book: &PositionBook,
    input: &StepInput<'_>,
    tick: i32,
    period_fees: TokenBalances,
    outcome: PlanOutcome,
    reason: ResetReason,
) -> Observation {
    Observation {
        timestamp: input.timestamp,
        price: input.price,
        tick,
        ranges: book.ranges.clone(),
        leftover: book.leftover,
        uncollected_fees: book.uncollected,
        period_fees,
        collected_fees: outcome.collected,
        gas_cost: outcome.gas_cost,
        swap_cost: outcome.swap_cost,
        reset_flag: !matches!(reason, ResetReason::None | ResetReason::FirstInit),
        reset_reason: reason,
    }
}
