//! Seeded random source for firm attributes and innovation shocks.
//!
//! Draws are normal (uniform for target leverage) and truncated into the
//! ranges a [`sim_core::FirmState`] accepts. Same seed, same sequence.

use rand::distributions::Uniform;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use sim_core::{DistributionConfig, NormalParams, RandomSource};

use crate::RuntimeError;

/// Lowest first unit cost, as a fraction of the configured mean.
pub const FIRST_UNIT_COST_FLOOR: f64 = 0.1;
/// Lowest R&D efficiency handed out.
pub const RD_EFFICIENCY_FLOOR: f64 = 1e-3;
/// Learning-rate bounds; the Wright integral needs a rate above one half.
pub const LEARNING_RATE_RANGE: (f64, f64) = (0.51, 1.0);
/// Lowest innovation shock handed out.
pub const INNOVATION_FLOOR: f64 = 1e-2;

fn normal(p: NormalParams) -> Result<Normal<f64>, RuntimeError> {
    Normal::new(p.mean, p.std_dev).map_err(|e| RuntimeError::Distribution(e.to_string()))
}

/// Deterministic [`RandomSource`] backed by ChaCha8.
#[derive(Clone, Debug)]
pub struct SeededSource {
    rng: ChaCha8Rng,
    first_unit_cost: Normal<f64>,
    first_unit_cost_floor: f64,
    rd_efficiency: Normal<f64>,
    target_leverage: Uniform<f64>,
    learning_rate: Normal<f64>,
    initial_equity: Normal<f64>,
    innovation: Normal<f64>,
}

impl SeededSource {
    pub fn new(dist: &DistributionConfig, seed: u64) -> Result<Self, RuntimeError> {
        dist.validate()?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            first_unit_cost: normal(dist.first_unit_cost)?,
            first_unit_cost_floor: FIRST_UNIT_COST_FLOOR * dist.first_unit_cost.mean,
            rd_efficiency: normal(dist.rd_efficiency)?,
            target_leverage: Uniform::new_inclusive(
                dist.target_leverage.low,
                dist.target_leverage.high,
            ),
            learning_rate: normal(dist.learning_rate)?,
            initial_equity: normal(dist.initial_equity)?,
            innovation: normal(NormalParams {
                mean: 1.0,
                std_dev: dist.innovation_std_dev,
            })?,
        })
    }
}

impl RandomSource for SeededSource {
    fn next_first_unit_cost(&mut self) -> f64 {
        self.first_unit_cost
            .sample(&mut self.rng)
            .max(self.first_unit_cost_floor)
    }

    fn next_rd_efficiency(&mut self) -> f64 {
        self.rd_efficiency.sample(&mut self.rng).max(RD_EFFICIENCY_FLOOR)
    }

    fn next_target_leverage(&mut self) -> f64 {
        self.target_leverage.sample(&mut self.rng)
    }

    fn next_learning_rate(&mut self) -> f64 {
        let (lo, hi) = LEARNING_RATE_RANGE;
        self.learning_rate.sample(&mut self.rng).clamp(lo, hi)
    }

    fn next_initial_equity(&mut self) -> f64 {
        self.initial_equity.sample(&mut self.rng)
    }

    fn next_innovation_shock(&mut self) -> f64 {
        self.innovation.sample(&mut self.rng).max(INNOVATION_FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{FirmState, ScenarioConfig};

    #[test]
    fn same_seed_same_sequence() {
        let d = DistributionConfig::default();
        let mut a = SeededSource::new(&d, 42).unwrap();
        let mut b = SeededSource::new(&d, 42).unwrap();
        for _ in 0..50 {
            assert_eq!(a.initial_draws(), b.initial_draws());
            assert_eq!(a.next_innovation_shock(), b.next_innovation_shock());
        }
    }

    #[test]
    fn draws_always_build_a_valid_state() {
        let mut d = DistributionConfig::default();
        // Wide spreads push many raw draws out of range.
        d.first_unit_cost.std_dev = 50.0;
        d.rd_efficiency.std_dev = 5.0;
        d.learning_rate.std_dev = 1.0;
        d.initial_equity.std_dev = 500.0;
        d.innovation_std_dev = 3.0;
        let cfg = ScenarioConfig::default();
        let mut src = SeededSource::new(&d, 7).unwrap();
        for _ in 0..500 {
            let draws = src.initial_draws();
            FirmState::from_draws(&cfg, &draws, 0).unwrap();
            assert!(draws.first_unit_cost >= 1.0);
            assert!(src.next_innovation_shock() > 0.0);
        }
    }

    #[test]
    fn invalid_distribution_is_rejected() {
        let mut d = DistributionConfig::default();
        d.initial_equity.std_dev = -1.0;
        assert!(matches!(
            SeededSource::new(&d, 1),
            Err(RuntimeError::Config(_))
        ));
    }
}
