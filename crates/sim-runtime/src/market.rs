//! Market-clearing collaborator.
//!
//! The firm engine only needs a price and the industry quantity. How the price
//! is formed lives behind [`MarketClearing`]; the constant-elasticity curve
//! here is the one the CLI uses.

use serde::{Deserialize, Serialize};
use sim_core::MarketConfig;

/// Price and industry output observed by every firm in a period.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price: f64,
    pub total_quantity: f64,
}

/// Turns industry supply into a clearing price.
pub trait MarketClearing {
    fn clear_price(&self, total_quantity: f64) -> f64;
}

/// Inverse of `Q = Q0·(P/P0)^(−ε)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantElasticityDemand {
    pub reference_price: f64,
    pub reference_quantity: f64,
    /// Elasticity magnitude (> 0).
    pub elasticity: f64,
}

impl ConstantElasticityDemand {
    pub fn new(market: &MarketConfig, elasticity: f64) -> Self {
        Self {
            reference_price: market.reference_price,
            reference_quantity: market.reference_quantity,
            elasticity,
        }
    }
}

impl MarketClearing for ConstantElasticityDemand {
    fn clear_price(&self, total_quantity: f64) -> f64 {
        if total_quantity <= 0.0 {
            return self.reference_price;
        }
        let ratio = total_quantity / self.reference_quantity;
        self.reference_price * ratio.powf(-1.0 / self.elasticity)
    }
}

/// A market whose price never moves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedPrice(pub f64);

impl MarketClearing for FixedPrice {
    fn clear_price(&self, _total_quantity: f64) -> f64 {
        self.0
    }
}
