//! Pecking-order fund raising.
//!
//! Funds are drawn from retained operating cash first, then new debt within
//! the leverage target, then external equity. Both period pools are finite and
//! are consumed by what is drawn.

use sim_core::{CashUsage, FirmState, MarketRegime};
use tracing::trace;

/// What the newly raised funds are measured against when sizing debt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FundingBasis {
    /// `new_funds` is an equity increase; debt grows with it at the target ratio.
    NewEquity,
    /// `new_funds` is a capital increase of which debt is a target share.
    NewCapital,
}

/// Breakdown of one financing round.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FundsRaised {
    pub operations: f64,
    pub debt: f64,
    pub equity: f64,
}

impl FundsRaised {
    pub fn total(&self) -> f64 {
        self.operations + self.debt + self.equity
    }

    /// Whether the round fully covered `target`.
    pub fn covers(&self, target: f64) -> bool {
        self.total() >= target
    }
}

/// Unused debt capacity implied by the target leverage, idle cash included.
///
/// Negative when the firm is already above its target.
pub fn leverage_headroom(st: &FirmState) -> f64 {
    st.target_leverage * st.capital - st.debt_gross() + st.cash()
}

/// New debt allowed when `new_funds` arrive on the given basis.
///
/// The result can be negative under [`CashUsage::Leverage`], meaning the
/// leverage target would need more equity than `new_funds`.
pub fn debt_available(
    st: &FirmState,
    basis: FundingBasis,
    new_funds: f64,
    usage: CashUsage,
    regime: MarketRegime,
) -> f64 {
    let headroom = leverage_headroom(st);
    let tl = st.target_leverage;
    let capacity = match basis {
        FundingBasis::NewEquity => (headroom + new_funds * tl) / (1.0 - tl),
        FundingBasis::NewCapital => headroom + tl * new_funds,
    };
    match regime.effective_cash_usage(usage) {
        CashUsage::Leverage => capacity,
        CashUsage::OnlyCash => st.cash(),
        CashUsage::Cash => st.cash().max(capacity),
    }
}

/// Raise up to `target` following the pecking order and book it on `st`.
///
/// Returns what was actually raised, which is below `target` when all three
/// sources are exhausted. A non-positive target raises nothing.
pub fn raise_funds(
    st: &mut FirmState,
    usage: CashUsage,
    regime: MarketRegime,
    target: f64,
) -> FundsRaised {
    if !(target > 0.0 && target.is_finite()) {
        return FundsRaised::default();
    }

    let mut operations = st.available_funds_from_operations.max(0.0);
    let mut equity = if regime.is_sudden_stop() {
        0.0
    } else {
        st.external_equity_available.max(0.0)
    };
    // Raising never repays debt.
    let mut debt = debt_available(st, FundingBasis::NewEquity, operations + equity, usage, regime)
        .max(0.0);

    if operations + debt + equity > target {
        operations = operations.min(target);
        let need = target - operations;
        debt = debt_available(st, FundingBasis::NewCapital, target, usage, regime)
            .max(0.0)
            .min(need);
        equity = equity.min(need - debt);
    }

    st.debt += debt;
    st.capital += operations + equity + debt;
    st.available_funds_from_operations -= operations;
    st.external_equity_available -= equity;

    let raised = FundsRaised {
        operations,
        debt,
        equity,
    };
    trace!(?usage, ?regime, target, ?raised, "funds raised");
    raised
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(capital: f64, debt: f64, tl: f64) -> FirmState {
        FirmState {
            capital,
            debt,
            first_unit_cost: 10.0,
            initial_first_unit_cost: 10.0,
            rd_efficiency: 1.0,
            target_leverage: tl,
            learning_rate: 0.8,
            accumulated_quantity: 0.0,
            accumulated_profit: 0.0,
            quantity_per_period: 0.0,
            profit_per_period: 0.0,
            rd_per_period: 0.0,
            available_funds_from_operations: 0.0,
            external_equity_available: 0.0,
            capital_productivity: 1.0,
            min_var_cost: 0.0,
            performance: 0.1,
            born: 0,
        }
    }

    #[test]
    fn headroom_counts_cash() {
        let st = state(1000.0, -100.0, 0.5);
        assert_eq!(leverage_headroom(&st), 600.0);
        let st = state(1000.0, 600.0, 0.5);
        assert_eq!(leverage_headroom(&st), -100.0);
    }

    #[test]
    fn cash_policy_takes_larger_of_cash_and_capacity() {
        let st = state(1000.0, 600.0, 0.5);
        let open = MarketRegime::Open;
        let lev = debt_available(&st, FundingBasis::NewCapital, 0.0, CashUsage::Leverage, open);
        assert_eq!(lev, -100.0);
        assert_eq!(
            debt_available(&st, FundingBasis::NewCapital, 0.0, CashUsage::Cash, open),
            0.0
        );
        let st = state(1000.0, -50.0, 0.0);
        assert_eq!(
            debt_available(&st, FundingBasis::NewCapital, 0.0, CashUsage::Cash, open),
            50.0
        );
    }

    #[test]
    fn equity_basis_levers_up_new_equity() {
        // 100 of new equity at 50% target supports 100 of new debt.
        let st = state(1000.0, 500.0, 0.5);
        let d = debt_available(
            &st,
            FundingBasis::NewEquity,
            100.0,
            CashUsage::Leverage,
            MarketRegime::Open,
        );
        assert!((d - 100.0).abs() < 1e-12);
    }

    #[test]
    fn pecking_order_uses_operations_first() {
        let mut st = state(1000.0, 500.0, 0.5);
        st.available_funds_from_operations = 80.0;
        st.external_equity_available = 40.0;
        let r = raise_funds(&mut st, CashUsage::Leverage, MarketRegime::Open, 100.0);
        assert_eq!(r.operations, 80.0);
        assert!((r.total() - 100.0).abs() < 1e-9);
        assert!((r.debt - 20.0).abs() < 1e-9);
        assert!(r.equity.abs() < 1e-9);
        assert_eq!(st.available_funds_from_operations, 0.0);
        assert!((st.capital - 1100.0).abs() < 1e-9);
        assert!((st.debt - 520.0).abs() < 1e-9);
    }

    #[test]
    fn shortfall_when_sources_are_exhausted() {
        // Over-levered firm with a small equity pool: can only raise the pool.
        let mut st = state(950.0, 500.0, 0.5);
        st.external_equity_available = 30.0;
        let r = raise_funds(&mut st, CashUsage::Cash, MarketRegime::Open, 50.0);
        assert_eq!(r.debt, 0.0);
        assert_eq!(r.equity, 30.0);
        assert!(!r.covers(50.0));
        assert_eq!(st.external_equity_available, 0.0);
        assert_eq!(st.capital, 980.0);
    }

    #[test]
    fn sudden_stop_closes_equity_and_limits_debt_to_cash() {
        let mut st = state(1000.0, -20.0, 0.5);
        st.external_equity_available = 500.0;
        let r = raise_funds(&mut st, CashUsage::Leverage, MarketRegime::SuddenStop, 100.0);
        assert_eq!(r.equity, 0.0);
        assert_eq!(r.debt, 20.0);
        assert_eq!(st.debt, 0.0);
        assert_eq!(st.external_equity_available, 500.0);
    }

    #[test]
    fn non_positive_target_is_a_no_op() {
        let mut st = state(1000.0, 100.0, 0.5);
        st.available_funds_from_operations = 10.0;
        let before = st;
        assert_eq!(
            raise_funds(&mut st, CashUsage::Cash, MarketRegime::Open, 0.0),
            FundsRaised::default()
        );
        assert_eq!(
            raise_funds(&mut st, CashUsage::Cash, MarketRegime::Open, f64::NAN),
            FundsRaised::default()
        );
        assert_eq!(st, before);
    }

    fn usage_strategy() -> impl Strategy<Value = CashUsage> {
        prop_oneof![
            Just(CashUsage::Cash),
            Just(CashUsage::Leverage),
            Just(CashUsage::OnlyCash)
        ]
    }

    proptest! {
        #[test]
        fn never_exceeds_target_nor_drains_pools(
            capital in 1.0f64..1e4,
            debt in -1e3f64..1e4,
            tl in 0.0f64..0.95,
            ops in 0.0f64..1e3,
            eq in 0.0f64..1e3,
            target in 0.01f64..5e3,
            usage in usage_strategy(),
            closed in any::<bool>(),
        ) {
            let regime = if closed { MarketRegime::SuddenStop } else { MarketRegime::Open };
            let mut st = state(capital, debt, tl);
            st.available_funds_from_operations = ops;
            st.external_equity_available = eq;
            let before = st;
            let r = raise_funds(&mut st, usage, regime, target);
            prop_assert!(r.total() <= target * (1.0 + 1e-12));
            prop_assert!(r.operations >= 0.0 && r.debt >= 0.0 && r.equity >= 0.0);
            prop_assert!(st.available_funds_from_operations >= -1e-9);
            prop_assert!(st.external_equity_available >= -1e-9);
            prop_assert!((st.capital - before.capital - r.total()).abs() < 1e-6);
            prop_assert!((st.debt - before.debt - r.debt).abs() < 1e-9);
        }

        #[test]
        fn only_cash_never_borrows_beyond_idle_cash(
            capital in 1.0f64..1e4,
            debt in -1e3f64..1e4,
            tl in 0.0f64..0.95,
            target in 0.01f64..5e3,
        ) {
            let mut st = state(capital, debt, tl);
            let cash = st.cash();
            let r = raise_funds(&mut st, CashUsage::OnlyCash, MarketRegime::Open, target);
            prop_assert!(r.debt <= cash);
            prop_assert!(st.debt <= 0.0_f64.max(debt));
        }
    }
}
