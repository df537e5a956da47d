#![deny(warnings)]

//! Turn-based runtime for the Sudden Stop industry simulation.
//!
//! - [`Firm`]: the per-firm period engine (respond, plan, commit)
//! - [`Cohort`]: read-only reporting view over one firm
//! - [`Industry`]: population container running the per-period barrier
//! - [`SeededSource`]: deterministic attribute and innovation draws
//! - [`MarketClearing`]: how industry supply becomes a price

pub mod cohort;
pub mod firm;
pub mod industry;
pub mod market;
pub mod random;

use sim_core::{ConfigError, StateError};
use thiserror::Error;

pub use cohort::{summarize, Cohort, CohortSummary};
pub use firm::{blended_performance, ExitReason, Firm, FirmId, FirmStatus, Plan};
pub use industry::{ExitCounts, Industry, PeriodReport};
pub use market::{ConstantElasticityDemand, FixedPrice, MarketClearing, MarketSnapshot};
pub use random::SeededSource;

/// Errors raised while assembling a simulation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid firm state: {0}")]
    State(#[from] StateError),
    #[error("distribution error: {0}")]
    Distribution(String),
}
