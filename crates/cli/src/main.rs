//! Command line driver for the concentrated liquidity backtester.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clmm_backtest_domain::value_objects::QuotePoint;
use clmm_backtest_simulation::prelude::*;
use dotenv::dotenv;
use prettytable::{Table, row};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clmm-backtest")]
#[command(about = "Concentrated liquidity rebalancing backtester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a policy over a recorded market scenario
    Run {
        /// Scenario JSON with prices, swaps and optional gas and quote series
        #[arg(short, long)]
        scenario: PathBuf,

        /// Policy config JSON
        #[arg(short, long)]
        policy: PathBuf,

        /// Initial token0 capital
        #[arg(long, default_value = "10000")]
        initial_token0: Decimal,

        /// Initial token1 capital
        #[arg(long, default_value = "0")]
        initial_token1: Decimal,

        /// Spacing of the price series (minute, hour or day)
        #[arg(short, long, default_value = "minute")]
        frequency: Frequency,

        /// Write observations and valuations to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this many price points
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Market data of a scenario file.
#[derive(Deserialize)]
struct Scenario {
    #[serde(flatten)]
    market: MarketHistory,
    #[serde(default)]
    quote_prices: Vec<QuotePoint>,
}

#[derive(Serialize)]
struct RunReport<'a> {
    summary: &'a SummaryRecord,
    valuations: &'a [ValuationPoint],
    observations: &'a [Observation],
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

fn fmt_pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn fmt_num(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.4}")
    } else {
        "n/a".to_string()
    }
}

fn print_summary(policy: &str, points: usize, summary: &SummaryRecord) {
    let mut table = Table::new();
    table.add_row(row!["Policy", policy]);
    table.add_row(row!["Observations", points]);
    table.add_row(row!["Days", fmt_num(summary.days)]);
    table.add_row(row!["Gross fee return", fmt_pct(summary.gross_fee_return)]);
    table.add_row(row!["Gross fee APR", fmt_pct(summary.gross_fee_apr)]);
    table.add_row(row!["Net return", fmt_pct(summary.net_return)]);
    table.add_row(row!["Net APR", fmt_pct(summary.net_apr)]);
    table.add_row(row!["Rebalances", summary.rebalances]);
    table.add_row(row!["Max drawdown", fmt_pct(summary.max_drawdown)]);
    table.add_row(row!["Volatility", fmt_pct(summary.volatility)]);
    table.add_row(row!["Sharpe ratio", fmt_num(summary.sharpe_ratio)]);
    table.add_row(row!["Impermanent loss", fmt_pct(summary.impermanent_loss)]);
    table.add_row(row![
        "Mean first range share",
        fmt_pct(summary.mean_first_position_share)
    ]);
    table.add_row(row![
        "Median first range share",
        fmt_pct(summary.median_first_position_share)
    ]);
    table.add_row(row!["Final value (USD)", fmt_num(summary.final_value)]);
    table.printstd();
}

fn run(
    scenario: &Path,
    policy: &Path,
    initial_token0: Decimal,
    initial_token1: Decimal,
    frequency: Frequency,
    output: Option<&Path>,
    limit: Option<usize>,
) -> Result<()> {
    let scenario: Scenario = read_json(scenario)?;
    let policy: PolicyConfig = read_json(policy)?;
    let config = SimulationConfig::new(policy, initial_token0).with_initial_token1(initial_token1);
    let policy_name = RebalancePolicy::from_config(&config.policy)?.name();

    let driver = SimulationDriver::new(&config, &scenario.market)?;
    let observations = match limit {
        Some(limit) => driver
            .iter()?
            .take(limit)
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => driver.run()?,
    };

    let analyzer = PerformanceAnalyzer::new(frequency).with_quotes(scenario.quote_prices);
    let valuations = analyzer.valuation_series(&observations)?;
    let summary = analyzer.summarize(&observations)?;
    print_summary(policy_name, observations.len(), &summary);

    if let Some(path) = output {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let report = RunReport {
            summary: &summary,
            valuations: &valuations,
            observations: &observations,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "wrote run report");
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            scenario,
            policy,
            initial_token0,
            initial_token1,
            frequency,
            output,
            limit,
        } => run(
            scenario,
            policy,
            *initial_token0,
            *initial_token1,
            *frequency,
            output.as_deref(),
            *limit,
        ),
    }
}
