//! Named metric lookup for reporting and cohort bucketing.
//!
//! Reporting code asks for metrics by name. Names resolve to a closed set of
//! keys, and every key maps to a plain accessor function.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::ScenarioConfig;
use crate::state::FirmState;

/// Accessor signature shared by every metric.
pub type MetricFn = fn(&FirmState, &ScenarioConfig) -> Option<f64>;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown metric: {0}")]
pub struct UnknownMetric(pub String);

/// Every metric readable from a firm snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    Capital,
    Debt,
    NetDebt,
    Cash,
    Equity,
    Assets,
    Leverage,
    NetLeverage,
    FirstUnitCost,
    InitialFirstUnitCost,
    RdEfficiency,
    TargetLeverage,
    LearningRate,
    AccumulatedQuantity,
    AccumulatedProfit,
    QuantityPerPeriod,
    ProfitPerPeriod,
    RdPerPeriod,
    Performance,
    TotalVariableCost,
    TotalFixedCost,
    CashFixedCost,
    Depreciation,
    Interest,
    Ebit,
    Ebitda,
    Roe,
    Roi,
    Rona,
    CostOfEquity,
    ExpectedEquityRetribution,
    ExpectedCapitalRetribution,
    AverageCost,
    MinimumPerformance,
    BornInYears,
}

impl MetricKey {
    pub const ALL: [MetricKey; 35] = [
        MetricKey::Capital,
        MetricKey::Debt,
        MetricKey::NetDebt,
        MetricKey::Cash,
        MetricKey::Equity,
        MetricKey::Assets,
        MetricKey::Leverage,
        MetricKey::NetLeverage,
        MetricKey::FirstUnitCost,
        MetricKey::InitialFirstUnitCost,
        MetricKey::RdEfficiency,
        MetricKey::TargetLeverage,
        MetricKey::LearningRate,
        MetricKey::AccumulatedQuantity,
        MetricKey::AccumulatedProfit,
        MetricKey::QuantityPerPeriod,
        MetricKey::ProfitPerPeriod,
        MetricKey::RdPerPeriod,
        MetricKey::Performance,
        MetricKey::TotalVariableCost,
        MetricKey::TotalFixedCost,
        MetricKey::CashFixedCost,
        MetricKey::Depreciation,
        MetricKey::Interest,
        MetricKey::Ebit,
        MetricKey::Ebitda,
        MetricKey::Roe,
        MetricKey::Roi,
        MetricKey::Rona,
        MetricKey::CostOfEquity,
        MetricKey::ExpectedEquityRetribution,
        MetricKey::ExpectedCapitalRetribution,
        MetricKey::AverageCost,
        MetricKey::MinimumPerformance,
        MetricKey::BornInYears,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKey::Capital => "capital",
            MetricKey::Debt => "debt",
            MetricKey::NetDebt => "net_debt",
            MetricKey::Cash => "cash",
            MetricKey::Equity => "equity",
            MetricKey::Assets => "assets",
            MetricKey::Leverage => "leverage",
            MetricKey::NetLeverage => "net_leverage",
            MetricKey::FirstUnitCost => "first_unit_cost",
            MetricKey::InitialFirstUnitCost => "initial_first_unit_cost",
            MetricKey::RdEfficiency => "rd_efficiency",
            MetricKey::TargetLeverage => "target_leverage",
            MetricKey::LearningRate => "learning_rate",
            MetricKey::AccumulatedQuantity => "accumulated_quantity",
            MetricKey::AccumulatedProfit => "accumulated_profit",
            MetricKey::QuantityPerPeriod => "quantity_per_period",
            MetricKey::ProfitPerPeriod => "profit_per_period",
            MetricKey::RdPerPeriod => "rd_per_period",
            MetricKey::Performance => "performance",
            MetricKey::TotalVariableCost => "total_variable_cost",
            MetricKey::TotalFixedCost => "total_fixed_cost",
            MetricKey::CashFixedCost => "cash_fixed_cost",
            MetricKey::Depreciation => "depreciation",
            MetricKey::Interest => "interest",
            MetricKey::Ebit => "ebit",
            MetricKey::Ebitda => "ebitda",
            MetricKey::Roe => "roe",
            MetricKey::Roi => "roi",
            MetricKey::Rona => "rona",
            MetricKey::CostOfEquity => "cost_of_equity",
            MetricKey::ExpectedEquityRetribution => "expected_equity_retribution",
            MetricKey::ExpectedCapitalRetribution => "expected_capital_retribution",
            MetricKey::AverageCost => "average_cost",
            MetricKey::MinimumPerformance => "minimum_performance",
            MetricKey::BornInYears => "born_in_years",
        }
    }

    /// Accessor function for this key.
    pub fn accessor(self) -> MetricFn {
        match self {
            MetricKey::Capital => |s, _| Some(s.capital),
            MetricKey::Debt => |s, _| Some(s.debt_gross()),
            MetricKey::NetDebt => |s, _| Some(s.debt),
            MetricKey::Cash => |s, _| Some(s.cash()),
            MetricKey::Equity => |s, _| Some(s.equity()),
            MetricKey::Assets => |s, _| Some(s.assets()),
            MetricKey::Leverage => |s, _| s.leverage(),
            MetricKey::NetLeverage => |s, _| s.net_leverage(),
            MetricKey::FirstUnitCost => |s, _| Some(s.first_unit_cost),
            MetricKey::InitialFirstUnitCost => |s, _| Some(s.initial_first_unit_cost),
            MetricKey::RdEfficiency => |s, _| Some(s.rd_efficiency),
            MetricKey::TargetLeverage => |s, _| Some(s.target_leverage),
            MetricKey::LearningRate => |s, _| Some(s.learning_rate),
            MetricKey::AccumulatedQuantity => |s, _| Some(s.accumulated_quantity),
            MetricKey::AccumulatedProfit => |s, _| Some(s.accumulated_profit),
            MetricKey::QuantityPerPeriod => |s, _| Some(s.quantity_per_period),
            MetricKey::ProfitPerPeriod => |s, _| Some(s.profit_per_period),
            MetricKey::RdPerPeriod => |s, _| Some(s.rd_per_period),
            MetricKey::Performance => |s, _| Some(s.performance),
            MetricKey::TotalVariableCost => |s, _| Some(s.total_variable_cost()),
            MetricKey::TotalFixedCost => |s, c| Some(s.total_fixed_cost(c)),
            MetricKey::CashFixedCost => |s, _| Some(s.cash_fixed_cost()),
            MetricKey::Depreciation => |s, c| Some(s.depreciation(c)),
            MetricKey::Interest => |s, c| Some(s.interest(c)),
            MetricKey::Ebit => |s, c| Some(s.ebit(c)),
            MetricKey::Ebitda => |s, c| Some(s.ebitda(c)),
            MetricKey::Roe => |s, c| s.roe(c),
            MetricKey::Roi => |s, c| s.roi(c),
            MetricKey::Rona => |s, c| s.rona(c),
            MetricKey::CostOfEquity => |s, c| s.cost_of_equity(c),
            MetricKey::ExpectedEquityRetribution => |s, c| s.expected_equity_retribution(c),
            MetricKey::ExpectedCapitalRetribution => |s, c| Some(s.expected_capital_retribution(c)),
            MetricKey::AverageCost => |s, c| s.average_cost(c),
            MetricKey::MinimumPerformance => |s, c| Some(s.minimum_performance(c)),
            MetricKey::BornInYears => |s, c| Some(s.born_in_years(c)),
        }
    }

    pub fn value(self, state: &FirmState, cfg: &ScenarioConfig) -> Option<f64> {
        (self.accessor())(state, cfg)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKey {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKey::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// Firm attributes used to bucket firms into reporting cohorts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndependentVar {
    TargetLeverage,
    RdEfficiency,
    LearningRate,
    InitialFirstUnitCost,
}

impl IndependentVar {
    pub const ALL: [IndependentVar; 4] = [
        IndependentVar::TargetLeverage,
        IndependentVar::RdEfficiency,
        IndependentVar::LearningRate,
        IndependentVar::InitialFirstUnitCost,
    ];

    pub fn metric(self) -> MetricKey {
        match self {
            IndependentVar::TargetLeverage => MetricKey::TargetLeverage,
            IndependentVar::RdEfficiency => MetricKey::RdEfficiency,
            IndependentVar::LearningRate => MetricKey::LearningRate,
            IndependentVar::InitialFirstUnitCost => MetricKey::InitialFirstUnitCost,
        }
    }
}

impl FirmState {
    /// Value of an attribute used for cohort bucketing.
    pub fn independent_variable(&self, key: IndependentVar) -> f64 {
        match key {
            IndependentVar::TargetLeverage => self.target_leverage,
            IndependentVar::RdEfficiency => self.rd_efficiency,
            IndependentVar::LearningRate => self.learning_rate,
            IndependentVar::InitialFirstUnitCost => self.initial_first_unit_cost,
        }
    }
}

/// 1-based cohort of `value` given ascending upper `limits`.
///
/// Returns the first `i + 1` with `value < limits[i]`, or `limits.len() + 1`.
pub fn classify(value: f64, limits: &[f64]) -> usize {
    limits
        .iter()
        .position(|&l| value < l)
        .map_or(limits.len() + 1, |i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::sample_state;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn names_are_unique_and_parse_back() {
        let names: BTreeSet<&str> = MetricKey::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), MetricKey::ALL.len());
        for k in MetricKey::ALL {
            assert_eq!(k.name().parse::<MetricKey>(), Ok(k));
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert_eq!(
            "getROE".parse::<MetricKey>(),
            Err(UnknownMetric("getROE".to_string()))
        );
    }

    #[test]
    fn dispatch_matches_direct_accessors() {
        let cfg = ScenarioConfig::default();
        let mut st = sample_state();
        st.profit_per_period = 3.0;
        st.quantity_per_period = 12.0;
        assert_eq!(MetricKey::Capital.value(&st, &cfg), Some(st.capital));
        assert_eq!(MetricKey::Roi.value(&st, &cfg), st.roi(&cfg));
        assert_eq!(MetricKey::Ebitda.value(&st, &cfg), Some(st.ebitda(&cfg)));
        assert_eq!(MetricKey::AverageCost.value(&st, &cfg), st.average_cost(&cfg));
    }

    #[test]
    fn independent_vars_agree_with_metrics() {
        let cfg = ScenarioConfig::default();
        let st = sample_state();
        for v in IndependentVar::ALL {
            assert_eq!(Some(st.independent_variable(v)), v.metric().value(&st, &cfg));
        }
    }

    #[test]
    fn classify_terciles() {
        let limits = [0.2, 0.4];
        assert_eq!(classify(0.1, &limits), 1);
        assert_eq!(classify(0.2, &limits), 2);
        assert_eq!(classify(0.39, &limits), 2);
        assert_eq!(classify(0.9, &limits), 3);
        assert_eq!(classify(5.0, &[]), 1);
    }

    proptest! {
        #[test]
        fn classify_is_monotonic(a in -10.0f64..10.0, b in -10.0f64..10.0) {
            let limits = [-5.0, 0.0, 5.0];
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify(lo, &limits) <= classify(hi, &limits));
        }
    }
}
