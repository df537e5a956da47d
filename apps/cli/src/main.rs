#![deny(warnings)]

//! Headless CLI running a Sudden Stop industry scenario.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use sim_core::{MarketRegime, ScenarioFile};
use sim_runtime::{ConstantElasticityDemand, Industry, PeriodReport, SeededSource};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Args {
    scenario: Option<String>,
    years: u32,
    firms: usize,
    seed: u64,
    json: bool,
}

fn flag_value<T>(flag: &str, value: Option<String>) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.ok_or_else(|| anyhow!("{flag} needs a value"))?;
    value
        .parse()
        .with_context(|| format!("invalid value for {flag}: {value:?}"))
}

fn parse_args<I>(argv: I) -> Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut args = Args {
        scenario: None,
        years: 10,
        firms: 100,
        seed: 42,
        json: false,
    };
    let mut it = argv.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = Some(flag_value(&arg, it.next())?),
            "--years" => args.years = flag_value(&arg, it.next())?,
            "--firms" => args.firms = flag_value(&arg, it.next())?,
            "--seed" => args.seed = flag_value(&arg, it.next())?,
            "--json" => args.json = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

/// Year-level aggregate of the period reports.
#[derive(Debug, Serialize)]
struct YearSummary {
    year: u32,
    sudden_stop_periods: usize,
    mean_price: f64,
    end_quantity: f64,
    survivors: usize,
    exits: usize,
    operating_shortfall: usize,
    underperformance: usize,
    minimum_capital: usize,
}

fn summarize_year(year: u32, reports: &[PeriodReport]) -> Option<YearSummary> {
    let last = reports.last()?;
    let n = reports.len() as f64;
    Some(YearSummary {
        year,
        sudden_stop_periods: reports
            .iter()
            .filter(|r| r.regime == MarketRegime::SuddenStop)
            .count(),
        mean_price: reports.iter().map(|r| r.price).sum::<f64>() / n,
        end_quantity: last.total_quantity,
        survivors: last.survivors,
        exits: reports.iter().map(|r| r.exits.total()).sum(),
        operating_shortfall: reports.iter().map(|r| r.exits.operating_shortfall).sum(),
        underperformance: reports.iter().map(|r| r.exits.underperformance).sum(),
        minimum_capital: reports.iter().map(|r| r.exits.minimum_capital).sum(),
    })
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(?args, "starting CLI");

    let file = match &args.scenario {
        Some(path) => {
            ScenarioFile::load(path).with_context(|| format!("loading scenario {path}"))?
        }
        None => ScenarioFile::default(),
    };
    let cfg = Arc::new(file.scenario);
    let source = SeededSource::new(&file.distributions, args.seed)?;
    let market = ConstantElasticityDemand::new(&file.market, cfg.demand_elasticity);
    let mut industry = Industry::new(cfg.clone(), source, market, file.sudden_stop)?;
    industry.populate(args.firms)?;

    let periods = cfg.periods;
    let mut years = Vec::new();
    for year in 1..=args.years {
        let reports = industry.run(u64::from(periods));
        match summarize_year(year, &reports) {
            Some(summary) => years.push(summary),
            None => {
                info!(year, "no firms left, stopping");
                break;
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&years)?);
    } else {
        for y in &years {
            println!(
                "Year {:>3} | price: {:>8.3} | quantity: {:>10.1} | firms: {:>5} | exits: {:>4} (A {} / B {} / C {}) | sudden stop: {}/{}",
                y.year,
                y.mean_price,
                y.end_quantity,
                y.survivors,
                y.exits,
                y.operating_shortfall,
                y.underperformance,
                y.minimum_capital,
                y.sudden_stop_periods,
                periods
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_runtime::ExitCounts;

    fn report(period: u64, price: f64, regime: MarketRegime, survivors: usize) -> PeriodReport {
        PeriodReport {
            period,
            regime,
            price,
            total_quantity: 10.0 * survivors as f64,
            at_risk: 1,
            survivors,
            exits: ExitCounts {
                operating_shortfall: 1,
                underperformance: 0,
                minimum_capital: 0,
            },
        }
    }

    #[test]
    fn year_summary_aggregates_periods() {
        let reports = [
            report(0, 10.0, MarketRegime::Open, 4),
            report(1, 14.0, MarketRegime::SuddenStop, 3),
        ];
        let y = summarize_year(2, &reports).unwrap();
        assert_eq!(y.year, 2);
        assert_eq!(y.mean_price, 12.0);
        assert_eq!(y.survivors, 3);
        assert_eq!(y.end_quantity, 30.0);
        assert_eq!(y.exits, 2);
        assert_eq!(y.operating_shortfall, 2);
        assert_eq!(y.sudden_stop_periods, 1);
    }

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_override_defaults() {
        let a = parse_args(argv(&[
            "--years", "3", "--firms", "7", "--seed", "9", "--json",
        ]))
        .unwrap();
        assert_eq!((a.years, a.firms, a.seed, a.json), (3, 7, 9, true));
        assert_eq!(a.scenario, None);
        let a = parse_args(argv(&["--scenario", "s.yaml"])).unwrap();
        assert_eq!(a.scenario.as_deref(), Some("s.yaml"));
        assert_eq!(a.years, 10);
    }

    #[test]
    fn bad_flags_are_rejected() {
        assert!(parse_args(argv(&["--years", "abc"])).is_err());
        assert!(parse_args(argv(&["--firms", "-2"])).is_err());
        assert!(parse_args(argv(&["--seed"])).is_err());
        assert!(parse_args(argv(&["--verbose"])).is_err());
    }

    #[test]
    fn empty_year_has_no_summary() {
        assert!(summarize_year(1, &[]).is_none());
    }
}
