#![deny(warnings)]

//! Core domain models for the Sudden Stop industry simulation.
//!
//! This crate defines the scenario configuration, the per-firm financial
//! snapshot with its derived metrics, and the random-draw contract consumed
//! by the firm engine.

pub mod config;
pub mod metrics;
pub mod random;
pub mod state;

use serde::{Deserialize, Serialize};

pub use config::{
    ConfigError, DistributionConfig, MarketConfig, NormalParams, ScenarioConfig, ScenarioFile,
    SuddenStopWindow, UniformParams,
};
pub use metrics::{classify, IndependentVar, MetricFn, MetricKey, UnknownMetric};
pub use random::{FixedSource, InitialDraws, RandomSource};
pub use state::{ratio, FirmState, StateError};

/// How much of the debt capacity a financing round may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashUsage {
    /// The larger of idle cash or leverage headroom.
    Cash,
    /// The full leverage headroom, idle cash is not a ceiling.
    Leverage,
    /// Idle cash only.
    OnlyCash,
}

/// State of external capital markets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketRegime {
    /// Credit and equity markets operate normally.
    #[default]
    Open,
    /// Markets are closed: no new external equity, debt limited to idle cash.
    SuddenStop,
}

impl MarketRegime {
    pub fn is_sudden_stop(self) -> bool {
        self == MarketRegime::SuddenStop
    }

    /// Policy actually applied once the regime is taken into account.
    pub fn effective_cash_usage(self, requested: CashUsage) -> CashUsage {
        match self {
            MarketRegime::Open => requested,
            MarketRegime::SuddenStop => CashUsage::OnlyCash,
        }
    }
}
