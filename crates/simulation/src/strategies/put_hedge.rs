//! Symmetric primary range with a put-like hedge below it.
//!
//! The primary range spans `[price * (1 - range%), price * (1 + range%)]` and
//! receives `1 - idle_fraction` of the capital; the rest stays idle. When the
//! price drops more than `range_percent2` below the primary's creation price,
//! the idle balance is swapped and deployed into a range that sits right
//! under the primary. The hedge fires once per primary range and is closed
//! when the primary is rebuilt.

use super::{
    Funding, PolicyContext, PolicyDecision, RangeChange, RebalancePlan, RebalanceStrategy,
    percent, price_move_percent,
};
use crate::observation::ResetReason;
use clmm_backtest_domain::entities::TickRange;
use clmm_backtest_domain::error::Result;
use clmm_backtest_domain::math::price_tick::tick_to_price;
use rust_decimal::Decimal;
use tracing::debug;

const DEFAULT_IDLE_FRACTION: Decimal = Decimal::from_parts(25, 0, 0, false, 2);

/// Primary range plus a downside hedge range.
#[derive(Debug, Clone, PartialEq)]
pub struct PutStyleAsymmetricDual {
    /// Half-width of the primary range, in percent.
    pub range_percent: Decimal,
    /// Price move that rebuilds the primary range, in percent.
    pub move_percent: Decimal,
    /// Drawdown that arms the hedge, and the hedge width, in percent.
    pub hedge_percent: Decimal,
    /// Share of capital held back for the hedge.
    pub idle_fraction: Decimal,
}

/// State of [`PutStyleAsymmetricDual`].
#[derive(Debug, Clone, PartialEq)]
pub struct PutHedgeState {
    /// Price at which the primary range was opened.
    pub creation_price: Decimal,
    /// Bounds of the current primary range.
    pub primary: TickRange,
    /// Whether the hedge has fired for the current primary range.
    pub hedge_active: bool,
}

impl PutStyleAsymmetricDual {
    /// Creates the strategy with a quarter of the capital kept idle.
    #[must_use]
    pub fn new(range_percent: Decimal, move_percent: Decimal, hedge_percent: Decimal) -> Self {
        Self {
            range_percent,
            move_percent,
            hedge_percent,
            idle_fraction: DEFAULT_IDLE_FRACTION,
        }
    }

    #[must_use]
    pub fn with_idle_fraction(mut self, idle_fraction: Decimal) -> Self {
        self.idle_fraction = idle_fraction;
        self
    }

    fn primary_range(&self, ctx: &PolicyContext<'_>) -> Result<TickRange> {
        let half_width = percent(self.range_percent);
        ctx.range_between(
            ctx.price * (Decimal::ONE - half_width),
            ctx.price * (Decimal::ONE + half_width),
        )
    }

    /// Hedge bounds directly below `primary`, at least one tick spacing wide.
    fn hedge_range(&self, ctx: &PolicyContext<'_>, primary: &TickRange) -> Result<TickRange> {
        let spacing = ctx.market.tick_spacing();
        let upper = primary.lower_tick;
        let primary_lower_price = tick_to_price(upper, ctx.market.decimal_adjustment())?;
        let lower = ctx
            .aligned_tick(primary_lower_price * (Decimal::ONE - percent(self.hedge_percent)))?
            .min(upper - spacing);
        TickRange::new(lower, upper, spacing)
    }

    fn open_primary(
        &self,
        ctx: &PolicyContext<'_>,
        reason: ResetReason,
    ) -> Result<(RebalancePlan, PutHedgeState)> {
        let primary = self.primary_range(ctx)?;
        let hedge = self.hedge_range(ctx, &primary)?;
        let plan = RebalancePlan::new(
            reason,
            vec![
                RangeChange::open(0, primary, Funding::Share(Decimal::ONE - self.idle_fraction))
                    .with_swap(),
                RangeChange::placeholder(1, hedge),
            ],
        );
        Ok((
            plan,
            PutHedgeState {
                creation_price: ctx.price,
                primary,
                hedge_active: false,
            },
        ))
    }
}

impl RebalanceStrategy for PutStyleAsymmetricDual {
    type State = PutHedgeState;

    fn name(&self) -> &'static str {
        "Put Style Asymmetric Dual"
    }

    fn initialize(&self, ctx: &PolicyContext<'_>) -> Result<(RebalancePlan, Self::State)> {
        self.open_primary(ctx, ResetReason::FirstInit)
    }

    fn check_rebalance(
        &self,
        ctx: &PolicyContext<'_>,
        state: Self::State,
    ) -> Result<(PolicyDecision, Self::State)> {
        if price_move_percent(state.creation_price, ctx.price)? > self.move_percent {
            let (plan, state) = self.open_primary(ctx, ResetReason::FirstRebalance)?;
            return Ok((PolicyDecision::Rebalance(plan), state));
        }

        let trigger = state.creation_price * (Decimal::ONE - percent(self.hedge_percent));
        if !state.hedge_active && ctx.price < trigger {
            debug!(price = %ctx.price, trigger = %trigger, "arming hedge range");
            let hedge = self.hedge_range(ctx, &state.primary)?;
            let plan = RebalancePlan::new(
                ResetReason::SecondInit,
                vec![RangeChange::open(1, hedge, Funding::All).with_swap()],
            );
            return Ok((
                PolicyDecision::Rebalance(plan),
                PutHedgeState {
                    hedge_active: true,
                    ..state
                },
            ));
        }

        Ok((PolicyDecision::Hold, state))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rust_decimal_macros::dec;

    fn policy() -> PutStyleAsymmetricDual {
        PutStyleAsymmetricDual::new(dec!(10), dec!(10), dec!(5))
    }

    fn decide(
        policy: &PutStyleAsymmetricDual,
        price: Decimal,
        state: PutHedgeState,
    ) -> (PolicyDecision, PutHedgeState) {
        let market = market();
        let ctx = context(&market, 60, price);
        policy.check_rebalance(&ctx, state).unwrap()
    }

    #[test]
    fn test_initialize_holds_back_idle_share() {
        let market = market();
        let ctx = context(&market, 0, dec!(1));
        let (plan, state) = policy().initialize(&ctx).unwrap();

        assert_eq!(plan.reason, ResetReason::FirstInit);
        assert_eq!(plan.changes[0].funding, Funding::Share(dec!(0.75)));
        assert!(plan.changes[0].swap_to_ratio);
        assert_eq!(state.primary, TickRange::new(-1080, 960, 60).unwrap());

        let hedge = plan.changes[1].target.unwrap();
        assert_eq!(plan.changes[1].funding, Funding::Nothing);
        assert_eq!(hedge.upper_tick, -1080);
        assert_eq!(hedge.lower_tick, -1620);
        assert!(!state.hedge_active);
    }

    #[test]
    fn test_hedge_fires_once() {
        let market = market();
        let policy = policy();
        let (_, state) = policy.initialize(&context(&market, 0, dec!(1))).unwrap();

        let (decision, state) = decide(&policy, dec!(0.96), state);
        assert_eq!(decision, PolicyDecision::Hold);

        let (decision, state) = decide(&policy, dec!(0.94), state);
        match decision {
            PolicyDecision::Rebalance(plan) => {
                assert_eq!(plan.reason, ResetReason::SecondInit);
                assert_eq!(plan.changes.len(), 1);
                assert_eq!(plan.changes[0].slot, 1);
                assert_eq!(plan.changes[0].funding, Funding::All);
                assert_eq!(plan.changes[0].target.unwrap().upper_tick, -1080);
            }
            PolicyDecision::Hold => panic!("expected the hedge to fire"),
        }
        assert!(state.hedge_active);

        let (decision, state) = decide(&policy, dec!(0.93), state);
        assert_eq!(decision, PolicyDecision::Hold);
        assert!(state.hedge_active);
    }

    #[test]
    fn test_primary_rebuild_resets_hedge() {
        let market = market();
        let policy = policy();
        let (_, state) = policy.initialize(&context(&market, 0, dec!(1))).unwrap();
        let state = PutHedgeState {
            hedge_active: true,
            ..state
        };

        let (decision, state) = decide(&policy, dec!(0.85), state);
        match decision {
            PolicyDecision::Rebalance(plan) => {
                assert_eq!(plan.reason, ResetReason::FirstRebalance);
                assert_eq!(plan.changes[1].slot, 1);
                assert_eq!(plan.changes[1].funding, Funding::Nothing);
            }
            PolicyDecision::Hold => panic!("expected a primary rebuild"),
        }
        assert!(!state.hedge_active);
        assert_eq!(state.creation_price, dec!(0.85));
    }

    #[test]
    fn test_narrow_hedge_keeps_one_spacing() {
        let market = market();
        let ctx = context(&market, 0, dec!(1));
        let policy = PutStyleAsymmetricDual::new(dec!(10), dec!(10), dec!(0.1));
        let primary = TickRange::new(-1080, 960, 60).unwrap();
        let hedge = policy.hedge_range(&ctx, &primary).unwrap();
        assert_eq!(hedge.width(), 60);
    }
}
