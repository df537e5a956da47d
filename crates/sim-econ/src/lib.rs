#![deny(warnings)]

//! Economic decision rules for a firm in the Sudden Stop simulation.
//!
//! This crate provides:
//! - Pecking-order fund raising under a target leverage (see [`financing`])
//! - Marginal cost on the learning curve and the perceived optimal markup
//! - The economic-profit-maximizing investment rule
//! - R&D selection against the learning-curve cost of the next step

pub mod financing;

use sim_core::{FirmState, ScenarioConfig};
use thiserror::Error;

pub use financing::{debt_available, leverage_headroom, raise_funds, FundingBasis, FundsRaised};

/// Errors produced by the pricing and investment rules.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Market price must be strictly positive and finite.
    #[error("invalid price: {0}")]
    InvalidPrice(f64),
    /// Market share must lie in [0, 1].
    #[error("invalid market share: {0}")]
    InvalidShare(f64),
    /// Perceived elasticities leave no finite markup at this share.
    #[error("markup undefined at share {0}")]
    DegenerateMarkup(f64),
    /// Intermediate computation left the finite range.
    #[error("non-finite numeric result")]
    NonFinite,
}

/// Marginal cost of the next unit, including the capital charge per unit.
///
/// `mc = fuc·(1+b)·(Q+q)^b + min_var_cost + (wacc + depreciation)/periods / productivity_per_period`
pub fn marginal_cost(st: &FirmState, cfg: &ScenarioConfig) -> Result<f64, EconError> {
    let periods = cfg.periods_f64();
    let b = st.learning_exponent();
    let learning = st.first_unit_cost
        * (1.0 + b)
        * (st.accumulated_quantity + st.quantity_per_period).powf(b);
    let capital_charge =
        (cfg.wacc / periods + cfg.depreciation_rate / periods) / st.capital_productivity_per_period(cfg);
    let mc = learning + st.min_var_cost + capital_charge;
    if mc.is_finite() {
        Ok(mc)
    } else {
        Err(EconError::NonFinite)
    }
}

/// Optimal markup over marginal cost given perceived elasticities and share.
///
/// `markup = (ε_d + (1−s)ε_s) / (ε_d + (1−s)ε_s − s)`; equals one for an
/// atomistic firm and grows with market power.
pub fn optimal_markup(cfg: &ScenarioConfig, share: f64) -> Result<f64, EconError> {
    if !(0.0..=1.0).contains(&share) {
        return Err(EconError::InvalidShare(share));
    }
    let num = cfg.demand_elasticity + (1.0 - share) * cfg.supply_elasticity;
    let den = num - share;
    if den <= 0.0 {
        return Err(EconError::DegenerateMarkup(share));
    }
    Ok(num / den)
}

/// Capital increment maximizing economic profit, never negative.
///
/// Invest when the perceived margin `1 − markup·mc/price` is positive; always
/// replace depreciation.
pub fn net_investment(
    st: &FirmState,
    cfg: &ScenarioConfig,
    price: f64,
    markup: f64,
    mc: f64,
) -> Result<f64, EconError> {
    if !(price > 0.0 && price.is_finite()) {
        return Err(EconError::InvalidPrice(price));
    }
    let optimal_increment = cfg.investment_param * (1.0 - markup * mc / price);
    let inv = (optimal_increment * st.capital + st.depreciation(cfg)).max(0.0);
    if inv.is_finite() {
        Ok(inv)
    } else {
        Err(EconError::NonFinite)
    }
}

/// Investment target for the coming period from price and market share.
pub fn investment_target(
    st: &FirmState,
    cfg: &ScenarioConfig,
    price: f64,
    share: f64,
) -> Result<f64, EconError> {
    let markup = optimal_markup(cfg, share)?;
    let mc = marginal_cost(st, cfg)?;
    net_investment(st, cfg, price, markup, mc)
}

/// Smallest R&D spend that keeps the first unit cost from rising.
///
/// Innovation divides cost by `(rd + 1)·efficiency`, so `rd >= 1/efficiency − 1`.
pub fn minimum_rd(st: &FirmState) -> f64 {
    (1.0 / st.rd_efficiency - 1.0).max(0.0)
}

/// R&D spend for the next period.
///
/// Balances R&D against the learning-curve cost of producing the next step
/// of output, floored at [`minimum_rd`].
pub fn select_rd(st: &FirmState) -> f64 {
    let q0 = st.accumulated_quantity;
    let step = st.learning_cost_between(q0, q0 + st.quantity_per_period);
    let optimal = (st.first_unit_cost / st.rd_efficiency * step).max(0.0).sqrt() - 1.0;
    let rd = minimum_rd(st).max(optimal);
    if rd.is_finite() {
        rd
    } else {
        minimum_rd(st)
    }
}
