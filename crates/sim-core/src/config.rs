//! Scenario configuration: the immutable parameter set every firm reads.
//!
//! Configuration is validated once, before the first tick. Out-of-range values
//! are reported as [`ConfigError`] and never replaced by defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::MarketRegime;

/// Errors raised while loading or validating a scenario.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Sub-periods per year must be at least one.
    #[error("periods must be >= 1")]
    NonPositivePeriods,
    /// A numeric parameter is NaN or infinite.
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    /// A numeric parameter is outside its admissible range.
    #[error("{field} = {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    /// Sudden-stop window must satisfy start < end.
    #[error("sudden stop window [{start}, {end}) is empty")]
    EmptyWindow { start: u64, end: u64 },
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// Scenario parameters shared by all firms.
///
/// Rates are annual; per-period figures divide by `periods`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Sub-periods per year (>= 1).
    pub periods: u32,
    /// Weighted average cost of capital, also the minimum performance.
    pub wacc: f64,
    /// Annual cost of debt.
    pub cost_of_debt: f64,
    /// Annual depreciation rate of capital.
    pub depreciation_rate: f64,
    /// Capital floor a surviving firm must keep.
    pub minimum_capital: f64,
    /// External equity available per year as a fraction of capital.
    pub max_external_equity_fraction: f64,
    /// Annual output per unit of capital.
    pub capital_productivity: f64,
    /// Asymptotic unit variable cost (>= 0).
    pub min_var_cost: f64,
    /// Perceived demand elasticity (magnitude, > 0).
    pub demand_elasticity: f64,
    /// Perceived supply elasticity of rivals (magnitude, > 0).
    pub supply_elasticity: f64,
    /// Speed of capital adjustment towards the economic-profit optimum.
    pub investment_param: f64,
    /// Weight of past performance in the blended performance score, in [0, 1].
    pub performance_weight: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            periods: 4,
            wacc: 0.10,
            cost_of_debt: 0.06,
            depreciation_rate: 0.10,
            minimum_capital: 20.0,
            max_external_equity_fraction: 0.10,
            capital_productivity: 0.5,
            min_var_cost: 0.5,
            demand_elasticity: 1.5,
            supply_elasticity: 1.0,
            investment_param: 0.2,
            performance_weight: 0.8,
        }
    }
}

fn finite(field: &'static str, v: f64) -> Result<f64, ConfigError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ConfigError::NonFinite(field))
    }
}

fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if finite(field, v)? <= 0.0 {
        return Err(ConfigError::OutOfRange {
            field,
            value: v,
            expected: "> 0",
        });
    }
    Ok(())
}

fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if finite(field, v)? < 0.0 {
        return Err(ConfigError::OutOfRange {
            field,
            value: v,
            expected: ">= 0",
        });
    }
    Ok(())
}

fn unit_interval(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&finite(field, v)?) {
        return Err(ConfigError::OutOfRange {
            field,
            value: v,
            expected: "[0, 1]",
        });
    }
    Ok(())
}

impl ScenarioConfig {
    /// Parse and validate a scenario from YAML.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: ScenarioConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every parameter against its admissible range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.periods == 0 {
            return Err(ConfigError::NonPositivePeriods);
        }
        positive("wacc", self.wacc)?;
        positive("cost_of_debt", self.cost_of_debt)?;
        positive("depreciation_rate", self.depreciation_rate)?;
        positive("minimum_capital", self.minimum_capital)?;
        non_negative(
            "max_external_equity_fraction",
            self.max_external_equity_fraction,
        )?;
        positive("capital_productivity", self.capital_productivity)?;
        non_negative("min_var_cost", self.min_var_cost)?;
        positive("demand_elasticity", self.demand_elasticity)?;
        positive("supply_elasticity", self.supply_elasticity)?;
        positive("investment_param", self.investment_param)?;
        unit_interval("performance_weight", self.performance_weight)?;
        Ok(())
    }

    /// Sub-periods per year as a float divisor.
    pub fn periods_f64(&self) -> f64 {
        f64::from(self.periods)
    }
}

/// Mean and standard deviation of a normal draw.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    pub mean: f64,
    pub std_dev: f64,
}

impl NormalParams {
    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        finite(field, self.mean)?;
        non_negative(field, self.std_dev)
    }
}

/// Inclusive bounds of a uniform draw.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformParams {
    pub low: f64,
    pub high: f64,
}

/// Distributions feeding the seeded random source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub first_unit_cost: NormalParams,
    pub rd_efficiency: NormalParams,
    pub target_leverage: UniformParams,
    pub learning_rate: NormalParams,
    pub initial_equity: NormalParams,
    /// Standard deviation of the multiplicative innovation shock (mean 1).
    pub innovation_std_dev: f64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            first_unit_cost: NormalParams {
                mean: 10.0,
                std_dev: 2.0,
            },
            rd_efficiency: NormalParams {
                mean: 1.0,
                std_dev: 0.05,
            },
            target_leverage: UniformParams {
                low: 0.0,
                high: 0.6,
            },
            learning_rate: NormalParams {
                mean: 0.9,
                std_dev: 0.05,
            },
            initial_equity: NormalParams {
                mean: 100.0,
                std_dev: 20.0,
            },
            innovation_std_dev: 0.02,
        }
    }
}

impl DistributionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.first_unit_cost.validate("first_unit_cost")?;
        positive("first_unit_cost.mean", self.first_unit_cost.mean)?;
        self.rd_efficiency.validate("rd_efficiency")?;
        positive("rd_efficiency.mean", self.rd_efficiency.mean)?;
        self.learning_rate.validate("learning_rate")?;
        self.initial_equity.validate("initial_equity")?;
        non_negative("innovation_std_dev", self.innovation_std_dev)?;
        let tl = self.target_leverage;
        finite("target_leverage.low", tl.low)?;
        finite("target_leverage.high", tl.high)?;
        if tl.low < 0.0 || tl.high >= 1.0 || tl.low > tl.high {
            return Err(ConfigError::OutOfRange {
                field: "target_leverage",
                value: tl.high,
                expected: "0 <= low <= high < 1",
            });
        }
        Ok(())
    }
}

/// Periods `[start, end)` during which credit and equity markets are closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuddenStopWindow {
    pub start: u64,
    pub end: u64,
}

impl SuddenStopWindow {
    /// Regime in force at `period`.
    pub fn regime_at(&self, period: u64) -> MarketRegime {
        if (self.start..self.end).contains(&period) {
            MarketRegime::SuddenStop
        } else {
            MarketRegime::Open
        }
    }
}

/// Aggregate demand curve used by the demo market.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Price at which `reference_quantity` is demanded.
    pub reference_price: f64,
    /// Quantity demanded per period at `reference_price`.
    pub reference_quantity: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            reference_price: 12.0,
            reference_quantity: 500.0,
        }
    }
}

/// A complete scenario file as read by the CLI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub distributions: DistributionConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub sudden_stop: Option<SuddenStopWindow>,
}

impl ScenarioFile {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ScenarioFile = serde_yaml::from_str(text)?;
        file.validate()?;
        Ok(file)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loading scenario file");
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scenario.validate()?;
        self.distributions.validate()?;
        positive("market.reference_price", self.market.reference_price)?;
        positive("market.reference_quantity", self.market.reference_quantity)?;
        if let Some(w) = self.sudden_stop {
            if w.start >= w.end {
                return Err(ConfigError::EmptyWindow {
                    start: w.start,
                    end: w.end,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_scenario_is_valid() {
        ScenarioConfig::default().validate().unwrap();
        ScenarioFile::default().validate().unwrap();
    }

    #[test]
    fn zero_periods_rejected() {
        let cfg = ScenarioConfig {
            periods: 0,
            ..ScenarioConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositivePeriods));
    }

    #[test]
    fn nan_rejected() {
        let cfg = ScenarioConfig {
            wacc: f64::NAN,
            ..ScenarioConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NonFinite("wacc")));
    }

    #[test]
    fn performance_weight_above_one_rejected() {
        let cfg = ScenarioConfig {
            performance_weight: 1.5,
            ..ScenarioConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                field: "performance_weight",
                ..
            })
        ));
    }

    #[test]
    fn target_leverage_of_one_rejected() {
        let mut d = DistributionConfig::default();
        d.target_leverage.high = 1.0;
        assert!(d.validate().is_err());
    }

    #[test]
    fn yaml_partial_file_uses_defaults_for_missing_sections() {
        let text = r#"
scenario:
  periods: 12
  wacc: 0.08
  cost_of_debt: 0.04
  depreciation_rate: 0.1
  minimum_capital: 5.0
  max_external_equity_fraction: 0.2
  capital_productivity: 1.0
  min_var_cost: 0.0
  demand_elasticity: 2.0
  supply_elasticity: 1.0
  investment_param: 0.1
  performance_weight: 0.5
sudden_stop:
  start: 40
  end: 48
"#;
        let f = ScenarioFile::from_yaml_str(text).unwrap();
        assert_eq!(f.scenario.periods, 12);
        assert_eq!(f.distributions, DistributionConfig::default());
        assert_eq!(f.sudden_stop, Some(SuddenStopWindow { start: 40, end: 48 }));
    }

    #[test]
    fn yaml_missing_field_is_parse_error() {
        let err = ScenarioConfig::from_yaml_str("periods: 4\nwacc: 0.1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_window_rejected() {
        let f = ScenarioFile {
            sudden_stop: Some(SuddenStopWindow { start: 5, end: 5 }),
            ..ScenarioFile::default()
        };
        assert_eq!(
            f.validate(),
            Err(ConfigError::EmptyWindow { start: 5, end: 5 })
        );
    }

    proptest! {
        #[test]
        fn window_regime_matches_range(start in 0u64..100, len in 1u64..50, p in 0u64..200) {
            let w = SuddenStopWindow { start, end: start + len };
            let closed = p >= start && p < start + len;
            prop_assert_eq!(w.regime_at(p) == MarketRegime::SuddenStop, closed);
        }
    }
}
