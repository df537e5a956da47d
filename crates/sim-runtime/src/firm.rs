//! The per-firm period engine.
//!
//! A [`Firm`] keeps two snapshots: `current`, committed and visible to the
//! market, and `next`, built up while the period is processed. A period runs
//! `process_response_to_demand` → `plan_next_year` → `move_to_next_state`.
//! Any failed solvency check moves the firm to [`FirmStatus::Exited`], which
//! is terminal.

use serde::{Deserialize, Serialize};
use sim_core::{
    classify, ratio, CashUsage, FirmState, IndependentVar, MarketRegime, MetricKey,
    RandomSource, ScenarioConfig, StateError,
};
use sim_econ::{investment_target, raise_funds, select_rd, EconError, FundsRaised};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::market::MarketSnapshot;

/// Stable identity of a firm for its whole life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FirmId(pub u64);

impl fmt::Display for FirmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Firm {}", self.0)
    }
}

/// Which solvency check removed the firm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Could not fund negative operating cash flow.
    OperatingShortfall,
    /// Blended performance fell below the cost of capital.
    Underperformance,
    /// Could not restore the minimum capital after depreciation.
    MinimumCapital,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirmStatus {
    Alive,
    Exited(ExitReason),
}

/// Result of the investment and R&D decisions for the coming period.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plan {
    /// Capital increment sought.
    pub investment_target: f64,
    /// What the financing round delivered.
    pub raised: FundsRaised,
    /// R&D spend staged for the next period.
    pub rd_per_period: f64,
}

/// Blended performance `w·performance + (1−w)·roi`; undefined without capital.
pub fn blended_performance(cfg: &ScenarioConfig, st: &FirmState) -> Option<f64> {
    let w = cfg.performance_weight;
    st.roi(cfg).map(|roi| w * st.performance + (1.0 - w) * roi)
}

/// Realize profit at `price` and run the operating solvency checks on `st`.
///
/// Positive operating cash of the period is retained as the first financing
/// source for the capital restore and the next investment round.
///
/// Returns the blended performance score of a surviving firm.
fn process_profit(
    cfg: &ScenarioConfig,
    st: &mut FirmState,
    price: f64,
    regime: MarketRegime,
) -> Result<f64, ExitReason> {
    let profit = price * st.quantity_per_period
        - st.total_variable_cost()
        - st.total_fixed_cost(cfg)
        - st.interest(cfg);
    st.profit_per_period = profit;

    // Funds generated by operations: depreciation is a non-cash charge.
    let fgo = profit + st.depreciation(cfg);

    if fgo < 0.0 {
        st.available_funds_from_operations = 0.0;
        // The raise below adds to capital; the loss must not.
        st.capital -= -fgo;
        let raised = raise_funds(st, CashUsage::Cash, regime, -fgo);
        if !raised.covers(-fgo) {
            return Err(ExitReason::OperatingShortfall);
        }
        Ok(blended_performance(cfg, st).unwrap_or(st.performance))
    } else {
        st.available_funds_from_operations = fgo;
        match blended_performance(cfg, st) {
            Some(p) if p >= st.minimum_performance(cfg) => Ok(p),
            _ => Err(ExitReason::Underperformance),
        }
    }
}

/// One simulated firm.
#[derive(Clone, Debug)]
pub struct Firm {
    id: FirmId,
    cfg: Arc<ScenarioConfig>,
    current: FirmState,
    next: FirmState,
    status: FirmStatus,
}

impl Firm {
    /// Create an entrant from one draw of each attribute stream.
    pub fn new(
        id: FirmId,
        cfg: Arc<ScenarioConfig>,
        source: &mut dyn RandomSource,
        born: u64,
    ) -> Result<Self, StateError> {
        let draws = source.initial_draws();
        let mut st = FirmState::from_draws(&cfg, &draws, born)?;
        st.quantity_per_period = st.capacity(&cfg);
        debug!(%id, capital = st.capital, target_leverage = st.target_leverage, "firm entered");
        Ok(Self::from_state(id, cfg, st))
    }

    /// Wrap an existing snapshot; `next` starts as a copy of it.
    pub fn from_state(id: FirmId, cfg: Arc<ScenarioConfig>, state: FirmState) -> Self {
        Self {
            id,
            cfg,
            current: state,
            next: state,
            status: FirmStatus::Alive,
        }
    }

    pub fn id(&self) -> FirmId {
        self.id
    }

    pub fn status(&self) -> FirmStatus {
        self.status
    }

    pub fn is_alive(&self) -> bool {
        self.status == FirmStatus::Alive
    }

    pub fn is_to_be_killed(&self) -> bool {
        !self.is_alive()
    }

    pub fn current(&self) -> &FirmState {
        &self.current
    }

    pub fn next(&self) -> &FirmState {
        &self.next
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.cfg
    }

    fn exit(&mut self, reason: ExitReason) {
        debug!(id = %self.id, ?reason, capital = self.current.capital, "firm exits");
        self.status = FirmStatus::Exited(reason);
    }

    /// Settle the committed period at `price`.
    ///
    /// Works on `current` in place, then derives `next` for survivors and
    /// checks minimum capital on it.
    pub fn process_response_to_demand(&mut self, price: f64, regime: MarketRegime) -> FirmStatus {
        if !self.is_alive() {
            return self.status;
        }
        let performance = match process_profit(&self.cfg, &mut self.current, price, regime) {
            Ok(p) => p,
            Err(reason) => {
                self.exit(reason);
                return self.status;
            }
        };

        self.next = self.current;
        self.next.accumulated_quantity =
            self.current.accumulated_quantity + self.current.quantity_per_period;
        self.next.accumulated_profit =
            self.current.accumulated_profit + self.current.profit_per_period;
        self.next.performance = performance;

        if !self.check_minimum_capital(regime) {
            self.exit(ExitReason::MinimumCapital);
        }
        self.status
    }

    fn check_minimum_capital(&mut self, regime: MarketRegime) -> bool {
        self.next.capital = self.current.capital - self.current.depreciation(&self.cfg);
        let needs = self.cfg.minimum_capital - self.next.capital;
        if needs > 0.0 {
            raise_funds(&mut self.next, CashUsage::Cash, regime, needs).covers(needs)
        } else {
            true
        }
    }

    /// Would the firm survive `price`? Runs the operating checks on a copy of
    /// `next` and leaves the engine untouched.
    pub fn estimate_response_to_demand(&self, price: f64, regime: MarketRegime) -> bool {
        let mut probe = self.next;
        process_profit(&self.cfg, &mut probe, price, regime).is_ok()
    }

    /// Size and finance next period's investment, then choose R&D.
    ///
    /// A degenerate investment rule (no finite markup or marginal cost) falls
    /// back to replacing depreciation.
    pub fn plan_next_year(&mut self, market: MarketSnapshot, regime: MarketRegime) -> Option<Plan> {
        if !self.is_alive() {
            return None;
        }
        let share = self.market_share(market);
        let target = match investment_target(&self.current, &self.cfg, market.price, share) {
            Ok(v) => v,
            Err(err) => {
                warn!(id = %self.id, %err, "investment rule degenerate, replacing depreciation only");
                self.current.depreciation(&self.cfg).max(0.0)
            }
        };
        let raised = raise_funds(&mut self.next, CashUsage::Leverage, regime, target);
        self.next.rd_per_period = select_rd(&self.next);
        debug!(
            id = %self.id,
            target,
            raised = raised.total(),
            rd = self.next.rd_per_period,
            "planned next year"
        );
        Some(Plan {
            investment_target: target,
            raised,
            rd_per_period: self.next.rd_per_period,
        })
    }

    /// Apply innovation, set capacity and equity pool, and commit `next`.
    pub fn move_to_next_state(&mut self, regime: MarketRegime, source: &mut dyn RandomSource) {
        if !self.is_alive() {
            return;
        }
        let mut shock = source.next_innovation_shock();
        if !(shock > 0.0 && shock.is_finite()) {
            warn!(id = %self.id, shock, "ignoring non-positive innovation shock");
            shock = 1.0;
        }
        let cfg = &self.cfg;
        let n = &mut self.next;
        n.first_unit_cost /= (n.rd_per_period + 1.0) * n.rd_efficiency * shock;
        n.quantity_per_period = n.capacity(cfg);
        n.available_funds_from_operations = 0.0;
        n.external_equity_available = if regime.is_sudden_stop() {
            0.0
        } else {
            (cfg.max_external_equity_fraction * n.capital / cfg.periods_f64()).max(0.0)
        };
        self.current = self.next;
    }

    // ---- read surface ---------------------------------------------------

    /// Years since entry at simulation `period`.
    pub fn age(&self, period: u64) -> f64 {
        period.saturating_sub(self.current.born) as f64 / self.cfg.periods_f64()
    }

    pub fn metric(&self, key: MetricKey) -> Option<f64> {
        key.value(&self.current, &self.cfg)
    }

    pub fn independent_variable(&self, key: IndependentVar) -> f64 {
        self.current.independent_variable(key)
    }

    /// 1-based cohort of this firm under the given bucket limits.
    pub fn cohort(&self, key: IndependentVar, limits: &[f64]) -> usize {
        classify(self.independent_variable(key), limits)
    }

    pub fn market_share(&self, market: MarketSnapshot) -> f64 {
        ratio(self.current.quantity_per_period, market.total_quantity)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0)
    }

    pub fn sales(&self, market: MarketSnapshot) -> f64 {
        self.current.quantity_per_period * market.price
    }

    pub fn marginal_cost(&self) -> Result<f64, EconError> {
        sim_econ::marginal_cost(&self.current, &self.cfg)
    }

    pub fn optimal_markup(&self, market: MarketSnapshot) -> Result<f64, EconError> {
        sim_econ::optimal_markup(&self.cfg, self.market_share(market))
    }
}
