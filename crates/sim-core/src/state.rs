//! Per-firm financial snapshot and the formulas derived from it.
//!
//! A [`FirmState`] holds only primitives. Everything else (costs, returns,
//! leverage) is recomputed from the snapshot and the [`ScenarioConfig`] on each
//! call. Ratios whose denominator can reach zero return `Option<f64>`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ScenarioConfig;
use crate::random::InitialDraws;

/// Rejected initial attributes.
#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    #[error("target leverage {0} outside [0, 1)")]
    TargetLeverage(f64),
    #[error("learning rate {0} outside (0.5, 1]")]
    LearningRate(f64),
    #[error("R&D efficiency {0} must be > 0")]
    RdEfficiency(f64),
    #[error("first unit cost {0} must be > 0")]
    FirstUnitCost(f64),
    #[error("initial equity {0} must be finite")]
    InitialEquity(f64),
}

/// Quotient that is only defined for a strictly positive, finite denominator.
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den > 0.0 && den.is_finite() && num.is_finite() {
        Some(num / den)
    } else {
        None
    }
}

/// Snapshot of one firm at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FirmState {
    /// Total invested capital.
    pub capital: f64,
    /// Signed net debt; negative values are idle cash.
    pub debt: f64,
    pub first_unit_cost: f64,
    pub initial_first_unit_cost: f64,
    pub rd_efficiency: f64,
    pub target_leverage: f64,
    pub learning_rate: f64,
    pub accumulated_quantity: f64,
    pub accumulated_profit: f64,
    pub quantity_per_period: f64,
    pub profit_per_period: f64,
    pub rd_per_period: f64,
    /// Operating funds still available for financing this period.
    pub available_funds_from_operations: f64,
    /// External equity still available for financing this period.
    pub external_equity_available: f64,
    pub capital_productivity: f64,
    pub min_var_cost: f64,
    /// Blended performance score carried into the next survival test.
    pub performance: f64,
    /// Period index at which the firm entered.
    pub born: u64,
}

impl FirmState {
    /// Build the entry state of a firm from its random draws.
    ///
    /// Capital is sized so that the drawn equity, levered at the target,
    /// is never below `minimum_capital`.
    pub fn from_draws(
        cfg: &ScenarioConfig,
        draws: &InitialDraws,
        born: u64,
    ) -> Result<Self, StateError> {
        let tl = draws.target_leverage;
        if !(0.0..1.0).contains(&tl) {
            return Err(StateError::TargetLeverage(tl));
        }
        let lr = draws.learning_rate;
        // Below 0.5 the Wright cost integral diverges at zero output.
        if !(lr > 0.5 && lr <= 1.0) {
            return Err(StateError::LearningRate(lr));
        }
        if !(draws.rd_efficiency > 0.0 && draws.rd_efficiency.is_finite()) {
            return Err(StateError::RdEfficiency(draws.rd_efficiency));
        }
        if !(draws.first_unit_cost > 0.0 && draws.first_unit_cost.is_finite()) {
            return Err(StateError::FirstUnitCost(draws.first_unit_cost));
        }
        if !draws.initial_equity.is_finite() {
            return Err(StateError::InitialEquity(draws.initial_equity));
        }

        let min_equity = cfg.minimum_capital * (1.0 - tl);
        let equity = draws.initial_equity.max(min_equity);
        let capital = equity / (1.0 - tl);

        let mut state = Self {
            capital,
            debt: capital * tl,
            first_unit_cost: draws.first_unit_cost,
            initial_first_unit_cost: draws.first_unit_cost,
            rd_efficiency: draws.rd_efficiency,
            target_leverage: tl,
            learning_rate: lr,
            accumulated_quantity: 0.0,
            accumulated_profit: 0.0,
            quantity_per_period: 0.0,
            profit_per_period: 0.0,
            rd_per_period: 0.0,
            available_funds_from_operations: 0.0,
            external_equity_available: 0.0,
            capital_productivity: cfg.capital_productivity,
            min_var_cost: cfg.min_var_cost,
            performance: 0.0,
            born,
        };
        // Entry performance equals the hurdle, so the first test passes iff ROI does.
        state.performance = state.minimum_performance(cfg);
        Ok(state)
    }

    // ---- balance sheet -------------------------------------------------

    /// Gross debt, `max(0, debt)`.
    pub fn debt_gross(&self) -> f64 {
        self.debt.max(0.0)
    }

    /// Idle cash, `max(0, -debt)`.
    pub fn cash(&self) -> f64 {
        (-self.debt).max(0.0)
    }

    pub fn equity(&self) -> f64 {
        self.capital - self.debt
    }

    pub fn assets(&self) -> f64 {
        self.capital + self.cash()
    }

    pub fn leverage(&self) -> Option<f64> {
        ratio(self.debt_gross(), self.assets())
    }

    pub fn net_leverage(&self) -> Option<f64> {
        ratio(self.debt, self.capital)
    }

    // ---- costs ---------------------------------------------------------

    /// Wright learning-curve exponent, `log2(learning_rate)` (<= 0).
    pub fn learning_exponent(&self) -> f64 {
        self.learning_rate.ln() / 2f64.ln()
    }

    /// Cumulative learning-curve cost between two accumulated quantities.
    pub fn learning_cost_between(&self, from: f64, to: f64) -> f64 {
        let e = 1.0 + self.learning_exponent();
        to.max(0.0).powf(e) - from.max(0.0).powf(e)
    }

    pub fn total_variable_cost(&self) -> f64 {
        let q0 = self.accumulated_quantity;
        let q1 = q0 + self.quantity_per_period;
        self.first_unit_cost * self.learning_cost_between(q0, q1)
            + self.min_var_cost * self.quantity_per_period
    }

    pub fn depreciation(&self, cfg: &ScenarioConfig) -> f64 {
        cfg.depreciation_rate * self.capital / cfg.periods_f64()
    }

    pub fn total_fixed_cost(&self, cfg: &ScenarioConfig) -> f64 {
        self.depreciation(cfg) + self.rd_per_period
    }

    /// Fixed costs paid in cash (depreciation excluded).
    pub fn cash_fixed_cost(&self) -> f64 {
        self.rd_per_period
    }

    pub fn interest(&self, cfg: &ScenarioConfig) -> f64 {
        cfg.cost_of_debt / cfg.periods_f64() * self.debt_gross()
    }

    /// Average cost per unit including the expected return on capital.
    pub fn average_cost(&self, cfg: &ScenarioConfig) -> Option<f64> {
        ratio(
            self.total_variable_cost()
                + self.total_fixed_cost(cfg)
                + self.expected_capital_retribution(cfg),
            self.quantity_per_period,
        )
    }

    // ---- returns -------------------------------------------------------

    pub fn ebit(&self, cfg: &ScenarioConfig) -> f64 {
        self.profit_per_period + self.interest(cfg)
    }

    pub fn ebitda(&self, cfg: &ScenarioConfig) -> f64 {
        self.ebit(cfg) + self.depreciation(cfg)
    }

    pub fn roe(&self, cfg: &ScenarioConfig) -> Option<f64> {
        ratio(self.profit_per_period * cfg.periods_f64(), self.equity())
    }

    pub fn roi(&self, cfg: &ScenarioConfig) -> Option<f64> {
        ratio(self.ebit(cfg) * cfg.periods_f64(), self.capital)
    }

    pub fn rona(&self, cfg: &ScenarioConfig) -> Option<f64> {
        ratio(self.ebit(cfg) * cfg.periods_f64(), self.assets())
    }

    /// Cost of equity under Modigliani-Miller with constant WACC.
    ///
    /// Undefined when equity is not positive.
    pub fn cost_of_equity(&self, cfg: &ScenarioConfig) -> Option<f64> {
        let d_over_e = ratio(self.debt_gross(), self.equity())?;
        Some(cfg.wacc + (cfg.wacc - cfg.cost_of_debt) * (1.0 + d_over_e))
    }

    pub fn expected_equity_retribution(&self, cfg: &ScenarioConfig) -> Option<f64> {
        self.cost_of_equity(cfg)
            .map(|ke| ke * self.equity() / cfg.periods_f64())
    }

    pub fn expected_capital_retribution(&self, cfg: &ScenarioConfig) -> f64 {
        cfg.wacc * self.capital / cfg.periods_f64()
    }

    pub fn minimum_performance(&self, cfg: &ScenarioConfig) -> f64 {
        cfg.wacc
    }

    // ---- capacity ------------------------------------------------------

    pub fn capital_productivity_per_period(&self, cfg: &ScenarioConfig) -> f64 {
        self.capital_productivity / cfg.periods_f64()
    }

    /// Output the current capital stock can produce in one period.
    pub fn capacity(&self, cfg: &ScenarioConfig) -> f64 {
        (self.capital * self.capital_productivity_per_period(cfg)).max(0.0)
    }

    pub fn born_in_years(&self, cfg: &ScenarioConfig) -> f64 {
        self.born as f64 / cfg.periods_f64()
    }
}
