//! Population container and the per-period barrier.
//!
//! Every firm responds to the same clearing price before any firm plans, and
//! every firm plans before any commits. Exited firms are dropped between the
//! response and the planning phase.

use serde::Serialize;
use sim_core::{MarketRegime, RandomSource, ScenarioConfig, SuddenStopWindow};
use std::sync::Arc;
use tracing::{debug, info};

use crate::firm::{ExitReason, Firm, FirmId, FirmStatus};
use crate::market::{MarketClearing, MarketSnapshot};
use crate::RuntimeError;

/// Exits in one period, by the check that failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExitCounts {
    pub operating_shortfall: usize,
    pub underperformance: usize,
    pub minimum_capital: usize,
}

impl ExitCounts {
    fn record(&mut self, reason: ExitReason) {
        match reason {
            ExitReason::OperatingShortfall => self.operating_shortfall += 1,
            ExitReason::Underperformance => self.underperformance += 1,
            ExitReason::MinimumCapital => self.minimum_capital += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.operating_shortfall + self.underperformance + self.minimum_capital
    }
}

/// Outcome of one [`Industry::step`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PeriodReport {
    pub period: u64,
    pub regime: MarketRegime,
    pub price: f64,
    pub total_quantity: f64,
    /// Firms whose operating checks were predicted to fail at `price`.
    pub at_risk: usize,
    pub survivors: usize,
    pub exits: ExitCounts,
}

pub struct Industry<R, M> {
    cfg: Arc<ScenarioConfig>,
    firms: Vec<Firm>,
    source: R,
    market: M,
    sudden_stop: Option<SuddenStopWindow>,
    period: u64,
    next_id: u64,
}

impl<R: RandomSource, M: MarketClearing> Industry<R, M> {
    pub fn new(
        cfg: Arc<ScenarioConfig>,
        source: R,
        market: M,
        sudden_stop: Option<SuddenStopWindow>,
    ) -> Result<Self, RuntimeError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            firms: Vec::new(),
            source,
            market,
            sudden_stop,
            period: 0,
            next_id: 1,
        })
    }

    /// Add `n` entrants drawn from the random source, born this period.
    pub fn populate(&mut self, n: usize) -> Result<(), RuntimeError> {
        self.firms.reserve(n);
        for _ in 0..n {
            let id = FirmId(self.next_id);
            let firm = Firm::new(id, self.cfg.clone(), &mut self.source, self.period)?;
            self.next_id += 1;
            self.firms.push(firm);
        }
        debug!(entrants = n, firms = self.firms.len(), "industry populated");
        Ok(())
    }

    /// Insert an already-built firm, e.g. a hand-crafted test case.
    pub fn push(&mut self, firm: Firm) {
        self.next_id = self.next_id.max(firm.id().0 + 1);
        self.firms.push(firm);
    }

    pub fn firms(&self) -> &[Firm] {
        &self.firms
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.cfg
    }

    pub fn regime(&self) -> MarketRegime {
        self.sudden_stop
            .map_or(MarketRegime::Open, |w| w.regime_at(self.period))
    }

    pub fn total_quantity(&self) -> f64 {
        self.firms
            .iter()
            .map(|f| f.current().quantity_per_period)
            .sum()
    }

    /// Price and quantity the market clears at for the committed states.
    pub fn market_snapshot(&self) -> MarketSnapshot {
        let total_quantity = self.total_quantity();
        MarketSnapshot {
            price: self.market.clear_price(total_quantity),
            total_quantity,
        }
    }

    /// Run one period for the whole population.
    pub fn step(&mut self) -> PeriodReport {
        let regime = self.regime();
        let market = self.market_snapshot();

        let at_risk = self
            .firms
            .iter()
            .filter(|f| !f.estimate_response_to_demand(market.price, regime))
            .count();

        let mut exits = ExitCounts::default();
        for firm in &mut self.firms {
            if let FirmStatus::Exited(reason) =
                firm.process_response_to_demand(market.price, regime)
            {
                exits.record(reason);
            }
        }
        self.firms.retain(Firm::is_alive);

        for firm in &mut self.firms {
            firm.plan_next_year(market, regime);
        }
        for firm in &mut self.firms {
            firm.move_to_next_state(regime, &mut self.source);
        }

        let report = PeriodReport {
            period: self.period,
            regime,
            price: market.price,
            total_quantity: market.total_quantity,
            at_risk,
            survivors: self.firms.len(),
            exits,
        };
        if exits.total() > 0 {
            info!(
                period = self.period,
                ?regime,
                price = market.price,
                exits = exits.total(),
                survivors = report.survivors,
                "firms exited"
            );
        }
        self.period += 1;
        report
    }

    /// Run `periods` steps, stopping early once no firm is left.
    pub fn run(&mut self, periods: u64) -> Vec<PeriodReport> {
        let mut reports = Vec::new();
        for _ in 0..periods {
            if self.firms.is_empty() {
                break;
            }
            reports.push(self.step());
        }
        reports
    }
}
