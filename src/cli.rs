//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvPositionAdapter, CsvSeriesAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::metadata_adapter::load_metadata;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, DEFAULT_TRANSACTION_COST};
use crate::domain::bar::PriceField;
use crate::domain::baselines::{
    AlwaysFlat, AlwaysLong, ConstantPolicy, DEFAULT_SEED, ProbabilityBand, ProbabilityConfig,
    RandomPolicy, RandomPositions, RuleConfig, TrendMomentumRule,
};
use crate::domain::comparison::{self, ComparisonRow};
use crate::domain::config_validation::validate_evaluation_config;
use crate::domain::environment::{EnvironmentConfig, TradingEnvironment};
use crate::domain::error::SignalbenchError;
use crate::domain::metrics::{Metrics, MetricsConfig, PERIODS_PER_YEAR_M15};
use crate::domain::position::{Position, to_signal};
use crate::domain::series::Series;
use crate::domain::strategy::{self, BatchStrategy, Policy};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{PositionSource, SeriesSource};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "signalbench",
    about = "Backtest and compare trading signals on a bar series"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest a position signal against a bar series
    Backtest {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        positions: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Per-bar trajectory CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Metrics summary JSON
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Compare the baseline strategies on a bar series
    Baselines {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Comparison CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Drive the sequential environment with a reference policy
    Rollout {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        metadata: PathBuf,
        #[arg(long, value_enum, default_value_t = PolicyKind::Flat)]
        policy: PolicyKind,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Per-bar trajectory CSV of the episode
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate an evaluation configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyKind {
    Flat,
    Long,
    Short,
    Random,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            data,
            positions,
            config,
            output,
            summary,
        } => run_backtest(
            &data,
            &positions,
            config.as_ref(),
            output.as_ref(),
            summary.as_ref(),
        ),
        Command::Baselines {
            data,
            config,
            output,
        } => run_baselines(&data, config.as_ref(), output.as_ref()),
        Command::Rollout {
            data,
            metadata,
            policy,
            seed,
            config,
            output,
        } => run_rollout(
            &data,
            &metadata,
            policy,
            seed,
            config.as_ref(),
            output.as_ref(),
        ),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SignalbenchError> {
    FileConfigAdapter::from_file(path)
}

/// Loads and validates the config file, or falls back to an empty one so
/// every setting takes its default.
fn load_validated_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, SignalbenchError> {
    let adapter = match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            load_config(p)?
        }
        None => FileConfigAdapter::empty(),
    };
    validate_evaluation_config(&adapter)?;
    Ok(adapter)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SignalbenchError> {
    let price_field = match adapter.get_string("backtest", "price_field") {
        Some(s) => s
            .parse::<PriceField>()
            .map_err(|e| SignalbenchError::ConfigInvalid {
                section: "backtest".into(),
                key: "price_field".into(),
                reason: e.to_string(),
            })?,
        None => PriceField::Close,
    };

    let config = BacktestConfig {
        price_field,
        transaction_cost: adapter.get_double(
            "backtest",
            "transaction_cost",
            DEFAULT_TRANSACTION_COST,
        ),
        strict_positions: adapter.get_bool("backtest", "strict_positions", false),
    };
    config.validate()?;
    Ok(config)
}

pub fn build_metrics_config(adapter: &dyn ConfigPort) -> MetricsConfig {
    MetricsConfig {
        periods_per_year: adapter.get_double("metrics", "periods_per_year", PERIODS_PER_YEAR_M15),
    }
}

fn get_period(adapter: &dyn ConfigPort, key: &str, default: usize) -> usize {
    let value = adapter.get_int("rule", key, default as i64);
    usize::try_from(value).unwrap_or(default)
}

pub fn build_rule_config(adapter: &dyn ConfigPort) -> RuleConfig {
    let defaults = RuleConfig::default();
    RuleConfig {
        fast_feature: adapter
            .get_string("rule", "fast_feature")
            .unwrap_or(defaults.fast_feature),
        slow_feature: adapter
            .get_string("rule", "slow_feature")
            .unwrap_or(defaults.slow_feature),
        oscillator_feature: adapter
            .get_string("rule", "oscillator_feature")
            .unwrap_or(defaults.oscillator_feature),
        fast_period: get_period(adapter, "fast_period", defaults.fast_period),
        slow_period: get_period(adapter, "slow_period", defaults.slow_period),
        oscillator_period: get_period(adapter, "oscillator_period", defaults.oscillator_period),
        overbought: adapter.get_double("rule", "overbought", defaults.overbought),
        oversold: adapter.get_double("rule", "oversold", defaults.oversold),
    }
}

pub fn build_probability_config(adapter: &dyn ConfigPort) -> ProbabilityConfig {
    let defaults = ProbabilityConfig::default();
    ProbabilityConfig {
        feature: adapter
            .get_string("probability", "feature")
            .unwrap_or(defaults.feature),
        long_above: adapter.get_double("probability", "long_above", defaults.long_above),
        short_below: adapter.get_double("probability", "short_below", defaults.short_below),
    }
}

pub fn build_seed(adapter: &dyn ConfigPort) -> u64 {
    adapter
        .get_string("random", "seed")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_SEED)
}

/// The baseline set compared by `baselines`. The probability band joins only
/// when the series carries its probability column.
pub fn build_baselines(
    adapter: &dyn ConfigPort,
    series: &Series,
    price_field: PriceField,
) -> Vec<Box<dyn BatchStrategy>> {
    let mut strategies: Vec<Box<dyn BatchStrategy>> = vec![
        Box::new(AlwaysLong),
        Box::new(AlwaysFlat),
        Box::new(RandomPositions {
            seed: build_seed(adapter),
        }),
        Box::new(TrendMomentumRule {
            config: build_rule_config(adapter),
            price_field,
        }),
    ];

    let probability = build_probability_config(adapter);
    if series.feature_index(&probability.feature).is_some() {
        strategies.push(Box::new(ProbabilityBand {
            config: probability,
        }));
    }
    strategies
}

fn load_series(data_path: &Path) -> Result<Series, SignalbenchError> {
    eprintln!("Loading series from {}", data_path.display());
    let series = CsvSeriesAdapter::new(data_path).load_series()?;
    eprintln!(
        "  {} bars, {} feature columns",
        series.len(),
        series.feature_names().len()
    );
    Ok(series)
}

fn print_metrics(metrics: &Metrics) {
    eprintln!("Final Equity:     {:.4}", metrics.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe);
    eprintln!(
        "Max Drawdown:     {:.2}% ({} bars)",
        metrics.max_drawdown * 100.0,
        metrics.max_drawdown_duration
    );
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Trades:           {}", metrics.trade_count);
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn run_backtest(
    data_path: &Path,
    positions_path: &Path,
    config_path: Option<&PathBuf>,
    output: Option<&PathBuf>,
    summary: Option<&PathBuf>,
) -> Result<(), SignalbenchError> {
    let adapter = load_validated_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let metrics_config = build_metrics_config(&adapter);

    let series = load_series(data_path)?;
    eprintln!("Loading positions from {}", positions_path.display());
    let signal = CsvPositionAdapter::new(positions_path).load_positions()?;

    let result = backtest_engine::run(&series, signal.aligned_to(&series)?, &bt_config)?;
    if !result.clamped.is_empty() {
        eprintln!(
            "warning: {} positions clamped into [-1, 1]",
            result.clamped.len()
        );
    }

    let metrics = Metrics::compute(&result, &metrics_config);
    eprintln!("\n=== Backtest Results ===");
    print_metrics(&metrics);

    let report = CsvReportAdapter;
    if let Some(path) = output {
        report.write_trajectory(&result, &path_str(path))?;
        eprintln!("\nTrajectory written to: {}", path.display());
    }
    if let Some(path) = summary {
        report.write_summary("positions", &metrics, &path_str(path))?;
        eprintln!("Summary written to: {}", path.display());
    }
    Ok(())
}

fn print_comparison(rows: &[ComparisonRow]) {
    eprintln!(
        "{:<18} {:>12} {:>10} {:>10} {:>8}",
        "strategy", "final_equity", "sharpe", "max_dd", "trades"
    );
    for row in rows {
        let m = &row.metrics;
        eprintln!(
            "{:<18} {:>12.4} {:>10.2} {:>9.2}% {:>8}",
            row.strategy,
            m.final_equity,
            m.sharpe,
            m.max_drawdown * 100.0,
            m.trade_count
        );
    }
}

fn run_baselines(
    data_path: &Path,
    config_path: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> Result<(), SignalbenchError> {
    let adapter = load_validated_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let metrics_config = build_metrics_config(&adapter);

    let series = load_series(data_path)?;
    let strategies = build_baselines(&adapter, &series, bt_config.price_field);
    eprintln!("Comparing {} strategies...", strategies.len());

    let rows = comparison::compare(&series, &strategies, &bt_config, &metrics_config)?;
    eprintln!("\n=== Baseline Comparison ===");
    print_comparison(&rows);
    if let Some(best) = comparison::best(&rows) {
        eprintln!("\nBest strategy: {}", best.strategy);
        println!("{}", best.strategy);
    }

    if let Some(path) = output {
        CsvReportAdapter.write_comparison(&rows, &path_str(path))?;
        eprintln!("Comparison written to: {}", path.display());
    }
    Ok(())
}

fn build_policy(kind: PolicyKind, seed: u64) -> Box<dyn Policy> {
    match kind {
        PolicyKind::Flat => Box::new(ConstantPolicy {
            action: Position::Flat,
        }),
        PolicyKind::Long => Box::new(ConstantPolicy {
            action: Position::Long,
        }),
        PolicyKind::Short => Box::new(ConstantPolicy {
            action: Position::Short,
        }),
        PolicyKind::Random => Box::new(RandomPolicy::new(seed)),
    }
}

fn run_rollout(
    data_path: &Path,
    metadata_path: &Path,
    policy_kind: PolicyKind,
    seed: Option<u64>,
    config_path: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> Result<(), SignalbenchError> {
    let adapter = load_validated_config(config_path)?;
    let metrics_config = build_metrics_config(&adapter);

    eprintln!("Loading model metadata from {}", metadata_path.display());
    let metadata = load_metadata(metadata_path)?;
    let series = load_series(data_path)?;

    // The model's training cost overrides the config file.
    let bt_config = BacktestConfig {
        transaction_cost: metadata.transaction_cost,
        ..build_backtest_config(&adapter)?
    };
    let mut env = TradingEnvironment::new(
        &series,
        metadata.norm_stats()?,
        &EnvironmentConfig::from(&bt_config),
    )?;

    let seed = seed.or(metadata.seed).unwrap_or(build_seed(&adapter));
    let mut policy = build_policy(policy_kind, seed);
    let episode = strategy::rollout(&mut env, policy.as_mut());

    let result = backtest_engine::run(&series, &to_signal(&episode.positions), &bt_config)?;
    let metrics = Metrics::compute(&result, &metrics_config);

    eprintln!("\n=== Rollout: {} ===", policy.name());
    eprintln!("Steps:            {}", episode.steps());
    eprintln!("Total Reward:     {:.6}", episode.total_reward);
    print_metrics(&metrics);

    if let Some(path) = output {
        CsvReportAdapter.write_trajectory(&result, &path_str(path))?;
        eprintln!("\nTrajectory written to: {}", path.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), SignalbenchError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_evaluation_config(&adapter)?;

    let bt_config = build_backtest_config(&adapter)?;
    let metrics_config = build_metrics_config(&adapter);
    let rule = build_rule_config(&adapter);
    let probability = build_probability_config(&adapter);

    eprintln!("\nBacktest:");
    eprintln!("  price_field:      {}", bt_config.price_field);
    eprintln!("  transaction_cost: {}", bt_config.transaction_cost);
    eprintln!("  strict_positions: {}", bt_config.strict_positions);
    eprintln!("\nMetrics:");
    eprintln!("  periods_per_year: {}", metrics_config.periods_per_year);
    eprintln!("\nRule:");
    eprintln!(
        "  trend:            {} / {}",
        rule.fast_feature, rule.slow_feature
    );
    eprintln!(
        "  oscillator:       {} ({} / {})",
        rule.oscillator_feature, rule.oversold, rule.overbought
    );
    eprintln!("\nProbability band:");
    eprintln!(
        "  {} long above {}, short below {}",
        probability.feature, probability.long_above, probability.short_below
    );
    eprintln!("\nRandom seed: {}", build_seed(&adapter));

    eprintln!("\nConfig validated successfully");
    Ok(())
}
