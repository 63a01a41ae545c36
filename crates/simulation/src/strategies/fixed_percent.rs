//! Single range re-centred on large price moves.
//!
//! The range spans `[price, price * (1 + range%)]`, so it starts at its lower
//! bound and holds token0 only. It is rebuilt whenever the price has moved
//! more than `move%` away from the price it was opened at.

use super::{
    Funding, PolicyContext, PolicyDecision, RangeChange, RebalancePlan, RebalanceStrategy,
    percent, price_move_percent,
};
use crate::observation::ResetReason;
use clmm_backtest_domain::entities::TickRange;
use clmm_backtest_domain::error::Result;
use rust_decimal::Decimal;
use tracing::debug;

/// Fixed-width single range strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedPercentSingleRange {
    /// Range width above the current price, in percent.
    pub range_percent: Decimal,
    /// Price move from the creation price that triggers a rebalance, in percent.
    pub move_percent: Decimal,
}

/// State of [`FixedPercentSingleRange`].
#[derive(Debug, Clone, PartialEq)]
pub struct FixedPercentState {
    /// Price at which the current range was opened.
    pub creation_price: Decimal,
}

impl FixedPercentSingleRange {
    #[must_use]
    pub fn new(range_percent: Decimal, move_percent: Decimal) -> Self {
        Self {
            range_percent,
            move_percent,
        }
    }

    fn target_range(&self, ctx: &PolicyContext<'_>) -> Result<TickRange> {
        ctx.range_between(
            ctx.price,
            ctx.price * (Decimal::ONE + percent(self.range_percent)),
        )
    }

    fn deploy(
        &self,
        ctx: &PolicyContext<'_>,
        reason: ResetReason,
    ) -> Result<(RebalancePlan, FixedPercentState)> {
        let change = RangeChange::open(0, self.target_range(ctx)?, Funding::All).with_swap();
        Ok((
            RebalancePlan::new(reason, vec![change]),
            FixedPercentState {
                creation_price: ctx.price,
            },
        ))
    }
}

impl RebalanceStrategy for FixedPercentSingleRange {
    type State = FixedPercentState;

    fn name(&self) -> &'static str {
        "Fixed Percent Single Range"
    }

    fn initialize(&self, ctx: &PolicyContext<'_>) -> Result<(RebalancePlan, Self::State)> {
        self.deploy(ctx, ResetReason::FirstInit)
    }

    fn check_rebalance(
        &self,
        ctx: &PolicyContext<'_>,
        state: Self::State,
    ) -> Result<(PolicyDecision, Self::State)> {
        let moved = price_move_percent(state.creation_price, ctx.price)?;
        if moved > self.move_percent {
            debug!(
                creation_price = %state.creation_price,
                price = %ctx.price,
                moved = %moved,
                "price moved past threshold"
            );
            let (plan, state) = self.deploy(ctx, ResetReason::FirstRebalance)?;
            return Ok((PolicyDecision::Rebalance(plan), state));
        }
        Ok((PolicyDecision::Hold, state))
    }
}
