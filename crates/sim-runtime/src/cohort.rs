//! Read-only reporting view over a firm.
//!
//! A [`Cohort`] pairs a committed firm snapshot with the market it faced and
//! adds the per-unit breakdowns the reports plot. Nothing here mutates the
//! engine.

use serde::Serialize;
use sim_core::{classify, ratio, IndependentVar, MetricKey};
use std::collections::BTreeMap;

use crate::firm::Firm;
use crate::market::MarketSnapshot;

#[derive(Clone, Copy, Debug)]
pub struct Cohort<'a> {
    firm: &'a Firm,
    market: MarketSnapshot,
}

impl<'a> Cohort<'a> {
    pub fn new(firm: &'a Firm, market: MarketSnapshot) -> Self {
        Self { firm, market }
    }

    pub fn firm(&self) -> &'a Firm {
        self.firm
    }

    pub fn metric(&self, key: MetricKey) -> Option<f64> {
        self.firm.metric(key)
    }

    /// 1-based bucket of the firm under `limits`.
    pub fn cohort(&self, key: IndependentVar, limits: &[f64]) -> usize {
        classify(self.firm.independent_variable(key), limits)
    }

    pub fn age(&self, period: u64) -> f64 {
        self.firm.age(period)
    }

    pub fn quantity(&self) -> f64 {
        self.firm.current().quantity_per_period
    }

    pub fn market_share(&self) -> f64 {
        self.firm.market_share(self.market)
    }

    pub fn sales(&self) -> f64 {
        self.firm.sales(self.market)
    }

    pub fn optimal_markup(&self) -> Option<f64> {
        self.firm.optimal_markup(self.market).ok()
    }

    pub fn marginal_cost(&self) -> Option<f64> {
        self.firm.marginal_cost().ok()
    }

    fn per_unit(&self, amount: f64) -> Option<f64> {
        ratio(amount, self.quantity())
    }

    // ---- per-unit views ------------------------------------------------

    pub fn variable_cost_per_unit(&self) -> Option<f64> {
        self.per_unit(self.firm.current().total_variable_cost())
    }

    pub fn depreciation_per_unit(&self) -> Option<f64> {
        self.per_unit(self.firm.current().depreciation(self.firm.config()))
    }

    pub fn interest_per_unit(&self) -> Option<f64> {
        self.per_unit(self.firm.current().interest(self.firm.config()))
    }

    pub fn cash_fixed_cost_per_unit(&self) -> Option<f64> {
        self.per_unit(self.firm.current().cash_fixed_cost())
    }

    pub fn rd_per_unit(&self) -> Option<f64> {
        self.per_unit(self.firm.current().rd_per_period)
    }

    pub fn expected_equity_retribution_per_unit(&self) -> Option<f64> {
        let ret = self
            .firm
            .current()
            .expected_equity_retribution(self.firm.config())?;
        self.per_unit(ret)
    }

    pub fn expected_capital_retribution_per_unit(&self) -> Option<f64> {
        self.per_unit(
            self.firm
                .current()
                .expected_capital_retribution(self.firm.config()),
        )
    }

    pub fn cash_per_unit(&self) -> Option<f64> {
        self.per_unit(self.firm.current().cash())
    }

    /// Average cost net of non-cash charges, with interest paid added back.
    pub fn cash_average_cost(&self) -> Option<f64> {
        let avg = self.firm.current().average_cost(self.firm.config())?;
        Some(
            avg - self.depreciation_per_unit()? - self.expected_capital_retribution_per_unit()?
                + self.interest_per_unit()?,
        )
    }

    pub fn up_to_var_cost_cash_per_unit(&self) -> Option<f64> {
        Some(self.cash_fixed_cost_per_unit()? + self.variable_cost_per_unit()?)
    }

    /// Cash cost per unit not covered by idle cash.
    pub fn cash_needs_per_unit(&self) -> Option<f64> {
        Some(self.cash_average_cost()? - self.cash_per_unit()?)
    }
}

/// Mean of one metric over the firms of a bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CohortSummary {
    pub cohort: usize,
    pub firms: usize,
    /// `None` when the metric is undefined for every firm in the bucket.
    pub mean: Option<f64>,
}

/// Bucket `firms` by `key` under `limits` and average `metric` per bucket.
///
/// Only non-empty buckets are returned, in ascending order.
pub fn summarize<'a, I>(
    firms: I,
    key: IndependentVar,
    limits: &[f64],
    metric: MetricKey,
) -> Vec<CohortSummary>
where
    I: IntoIterator<Item = &'a Firm>,
{
    let mut buckets: BTreeMap<usize, (usize, f64, usize)> = BTreeMap::new();
    for firm in firms {
        let entry = buckets
            .entry(firm.cohort(key, limits))
            .or_insert((0, 0.0, 0));
        entry.0 += 1;
        if let Some(v) = firm.metric(metric) {
            entry.1 += v;
            entry.2 += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(cohort, (firms, sum, defined))| CohortSummary {
            cohort,
            firms,
            mean: ratio(sum, defined as f64),
        })
        .collect()
}
