//! Two staggered ranges reset on a timer.
//!
//! Both ranges span `[price / 1.0001, price * (1 + range%)]`. The first opens
//! with half the capital at the first step, the second with half of what is
//! left once `buffer` has passed. Each range is rebuilt with everything left
//! once it is older than `duration`. Funds are never swapped.

use super::{
    Funding, PolicyContext, PolicyDecision, RangeChange, RebalancePlan, RebalanceStrategy,
    percent,
};
use crate::observation::ResetReason;
use chrono::{DateTime, Duration, Utc};
use clmm_backtest_domain::entities::TickRange;
use clmm_backtest_domain::error::Result;
use rust_decimal::Decimal;
use tracing::debug;

const HALF: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
const ONE_TICK: Decimal = Decimal::from_parts(10001, 0, 0, false, 4);

/// Dual range strategy with time-based resets.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationDualPosition {
    /// Range width above the current price, in percent.
    pub range_percent: Decimal,
    /// Age after which a range is rebuilt.
    pub duration: Duration,
    /// Delay before the second range is opened.
    pub buffer: Duration,
}

/// State of [`DurationDualPosition`].
#[derive(Debug, Clone, PartialEq)]
pub struct DurationDualState {
    pub first_created_at: DateTime<Utc>,
    /// `None` until the second range has been opened.
    pub second_created_at: Option<DateTime<Utc>>,
}

impl DurationDualPosition {
    /// Creates the strategy with a buffer of half the duration.
    #[must_use]
    pub fn new(range_percent: Decimal, duration: Duration) -> Self {
        Self {
            range_percent,
            duration,
            buffer: duration / 2,
        }
    }

    #[must_use]
    pub fn with_buffer(mut self, buffer: Duration) -> Self {
        self.buffer = buffer;
        self
    }

    fn target_range(&self, ctx: &PolicyContext<'_>) -> Result<TickRange> {
        ctx.range_between(
            ctx.price / ONE_TICK,
            ctx.price * (Decimal::ONE + percent(self.range_percent)),
        )
    }
}

impl RebalanceStrategy for DurationDualPosition {
    type State = DurationDualState;

    fn name(&self) -> &'static str {
        "Duration Dual Position"
    }

    fn initialize(&self, ctx: &PolicyContext<'_>) -> Result<(RebalancePlan, Self::State)> {
        let target = self.target_range(ctx)?;
        let plan = RebalancePlan::new(
            ResetReason::FirstInit,
            vec![
                RangeChange::open(0, target, Funding::Share(HALF)),
                RangeChange::placeholder(1, target),
            ],
        );
        Ok((
            plan,
            DurationDualState {
                first_created_at: ctx.timestamp,
                second_created_at: None,
            },
        ))
    }

    fn check_rebalance(
        &self,
        ctx: &PolicyContext<'_>,
        state: Self::State,
    ) -> Result<(PolicyDecision, Self::State)> {
        let now = ctx.timestamp;
        let (reason, change, next) = if now - state.first_created_at > self.duration {
            (
                ResetReason::FirstRebalance,
                RangeChange::open(0, self.target_range(ctx)?, Funding::All),
                DurationDualState {
                    first_created_at: now,
                    ..state
                },
            )
        } else if let Some(second) = state.second_created_at
            && now - second > self.duration
        {
            (
                ResetReason::SecondRebalance,
                RangeChange::open(1, self.target_range(ctx)?, Funding::All),
                DurationDualState {
                    second_created_at: Some(now),
                    ..state
                },
            )
        } else if state.second_created_at.is_none() && now - state.first_created_at > self.buffer {
            (
                ResetReason::SecondInit,
                RangeChange::open(1, self.target_range(ctx)?, Funding::Share(HALF)),
                DurationDualState {
                    second_created_at: Some(now),
                    ..state
                },
            )
        } else {
            return Ok((PolicyDecision::Hold, state));
        };

        debug!(reason = %reason, slot = change.slot, "range timer expired");
        Ok((
            PolicyDecision::Rebalance(RebalancePlan::new(reason, vec![change])),
            next,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rust_decimal_macros::dec;

    fn policy() -> DurationDualPosition {
        DurationDualPosition::new(dec!(5), Duration::hours(1))
    }

    fn reason_at(
        policy: &DurationDualPosition,
        secs: i64,
        state: DurationDualState,
    ) -> (ResetReason, DurationDualState) {
        let market = market();
        let ctx = context(&market, secs, dec!(1));
        match policy.check_rebalance(&ctx, state).unwrap() {
            (PolicyDecision::Hold, state) => (ResetReason::None, state),
            (PolicyDecision::Rebalance(plan), state) => (plan.reason, state),
        }
    }

    #[test]
    fn test_default_buffer_is_half_duration() {
        assert_eq!(policy().buffer, Duration::minutes(30));
        assert_eq!(
            policy().with_buffer(Duration::minutes(5)).buffer,
            Duration::minutes(5)
        );
    }

    #[test]
    fn test_initialize_splits_capital() {
        let market = market();
        let ctx = context(&market, 0, dec!(1));
        let (plan, state) = policy().initialize(&ctx).unwrap();
        assert_eq!(plan.reason, ResetReason::FirstInit);
        assert_eq!(plan.changes[0].funding, Funding::Share(dec!(0.5)));
        assert_eq!(plan.changes[1].funding, Funding::Nothing);
        assert!(plan.changes.iter().all(|c| !c.swap_to_ratio));
        // lower bound sits one tick below the price and rounds onto it
        assert_eq!(plan.changes[0].target.unwrap().lower_tick, 0);
        assert_eq!(state.second_created_at, None);
    }

    #[test]
    fn test_timeline() {
        let policy = policy();
        let state = DurationDualState {
            first_created_at: at(0),
            second_created_at: None,
        };

        // buffer boundary is strict
        let (reason, state) = reason_at(&policy, 1800, state);
        assert_eq!(reason, ResetReason::None);
        let (reason, state) = reason_at(&policy, 1860, state);
        assert_eq!(reason, ResetReason::SecondInit);
        assert_eq!(state.second_created_at, Some(at(1860)));

        let (reason, state) = reason_at(&policy, 3600, state);
        assert_eq!(reason, ResetReason::None);
        let (reason, state) = reason_at(&policy, 3660, state);
        assert_eq!(reason, ResetReason::FirstRebalance);
        assert_eq!(state.first_created_at, at(3660));

        let (reason, state) = reason_at(&policy, 5520, state);
        assert_eq!(reason, ResetReason::SecondRebalance);
        assert_eq!(state.second_created_at, Some(at(5520)));
    }

    #[test]
    fn test_first_range_takes_precedence() {
        let policy = policy();
        let state = DurationDualState {
            first_created_at: at(0),
            second_created_at: Some(at(0)),
        };
        let (reason, state) = reason_at(&policy, 4000, state);
        assert_eq!(reason, ResetReason::FirstRebalance);
        let (reason, _) = reason_at(&policy, 4060, state);
        assert_eq!(reason, ResetReason::SecondRebalance);
    }
}
