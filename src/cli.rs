//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{hundredths, validate_config, validate_indicator_config};
use crate::domain::error::FxError;
use crate::domain::indicator_set::{IndicatorFrame, IndicatorParams};
use crate::domain::live::{next_bar_boundary, Granularity, LiveDecision, LiveSession};
use crate::domain::position::{OpenPosition, TradeRecord};
use crate::domain::report::{aggregate, AggregateResult, ReportingMode, TradeStats};
use crate::domain::signal::{RuleKind, TrendFilterRule};
use crate::domain::simulator::{run_backtest, SimulationConfig};
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "fxtrader", about = "Indicator-driven FX backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a take-profit/stop-loss backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price CSV (overrides [data] path)
        #[arg(long)]
        data: Option<PathBuf>,
        /// Entry rule (overrides [strategy] rule)
        #[arg(long)]
        rule: Option<String>,
        /// Snapshot CSV: bars, indicators and position trace
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        trades: Option<PathBuf>,
    },
    /// Write the indicator-augmented series to CSV
    Indicators {
        #[arg(long)]
        data: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Evaluate the latest bar and print an order intent
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
        /// File holding the last processed bar timestamp
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            rule,
            output,
            trades,
        } => run_backtest_command(
            &config,
            data.as_deref(),
            rule.as_deref(),
            output.as_deref(),
            trades.as_deref(),
        ),
        Command::Indicators {
            data,
            config,
            output,
        } => run_indicators(&data, config.as_deref(), &output),
        Command::Signal {
            config,
            data,
            state,
        } => run_signal(&config, data.as_deref(), state.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: FxError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FxError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Reads an indicator window, already checked positive by validation.
fn window(adapter: &dyn ConfigPort, key: &str, default: i64) -> Result<usize, FxError> {
    let value = adapter.get_int("indicators", key, default);
    usize::try_from(value)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| FxError::invalid("indicators", key, format!("{key} must be a positive window")))
}

pub fn build_indicator_params(adapter: &dyn ConfigPort) -> Result<IndicatorParams, FxError> {
    validate_indicator_config(adapter)?;
    Ok(IndicatorParams {
        short_ma: window(adapter, "short_ma", 20)?,
        long_ma: window(adapter, "long_ma", 50)?,
        ema: window(adapter, "ema", 20)?,
        rsi: window(adapter, "rsi", 14)?,
        bb_period: window(adapter, "bb_period", 20)?,
        bb_stddev_mult_x100: hundredths(adapter.get_double("indicators", "bb_stddev", 2.0)),
        atr: window(adapter, "atr", 14)?,
        volatility: window(adapter, "volatility", 20)?,
        ewma_lambda_x100: hundredths(adapter.get_double("indicators", "ewma_lambda", 0.94)),
    })
}

pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, FxError> {
    validate_config(adapter)?;
    let defaults = StrategyConfig::default();

    let rule = match adapter.get_string("strategy", "rule") {
        Some(name) => name
            .parse::<RuleKind>()
            .map_err(|reason| FxError::invalid("strategy", "rule", reason))?,
        None => defaults.rule,
    };

    let pip_factor = adapter.get_double("strategy", "pip_factor", 10_000.0);
    let reporting = match adapter
        .get_string("strategy", "reporting")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        Some("compounding") => ReportingMode::Compounding,
        _ => ReportingMode::Pips { pip_factor },
    };

    let units = u64::try_from(adapter.get_int("strategy", "units", 1000))
        .map_err(|_| FxError::invalid("strategy", "units", "units must be positive"))?;

    Ok(StrategyConfig {
        name: adapter
            .get_string("strategy", "name")
            .unwrap_or(defaults.name),
        instrument: adapter
            .get_string("data", "instrument")
            .unwrap_or(defaults.instrument),
        rule,
        params: build_indicator_params(adapter)?,
        rsi_oversold: adapter.get_double("strategy", "rsi_oversold", 30.0),
        rsi_overbought: adapter.get_double("strategy", "rsi_overbought", 70.0),
        simulation: SimulationConfig {
            take_profit: adapter.get_double("strategy", "take_profit", 0.0030),
            stop_loss: adapter.get_double("strategy", "stop_loss", 0.0020),
        },
        reporting,
        duplicate_bar_guard: adapter.get_bool("strategy", "duplicate_bar_guard", true),
        units,
        atr_stop_multiplier: adapter.get_double("strategy", "atr_stop_multiplier", 1.5),
        trend: TrendFilterRule {
            buy_rsi: adapter.get_double("strategy", "trend_rsi_buy", 55.0),
            sell_rsi: adapter.get_double("strategy", "trend_rsi_sell", 50.0),
        },
    })
}

/// Data source from `--data` or the config's `[data] path`.
pub fn build_data_adapter(
    adapter: &dyn ConfigPort,
    data_override: Option<&Path>,
) -> Result<CsvAdapter, FxError> {
    let path = match data_override {
        Some(p) => p.to_path_buf(),
        None => adapter
            .get_string("data", "path")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| FxError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?,
    };
    Ok(CsvAdapter::new(path).with_timestamp_format(adapter.get_string("data", "timestamp_format")))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub bars: usize,
    pub indicated: usize,
    pub signals: usize,
    pub trades: Vec<TradeRecord>,
    pub stats: TradeStats,
    pub aggregate: AggregateResult,
    pub open_position: Option<OpenPosition>,
    /// Mark-to-market of the open position at the last close.
    pub open_profit: Option<f64>,
}

/// Fetch, indicate, walk, aggregate and optionally write reports.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    strategy: &StrategyConfig,
    snapshot_path: Option<&Path>,
    trades_path: Option<&Path>,
) -> Result<BacktestSummary, FxError> {
    let series = data_port.fetch_series(&strategy.instrument)?;
    let frame = IndicatorFrame::compute(&series, strategy.params);
    let minimum = strategy.params.minimum_bars();
    if series.len() < minimum {
        warn!(
            bars = series.len(),
            minimum, "series shorter than the longest indicator window, no bars will be evaluated"
        );
    }

    info!(
        strategy = %strategy.name,
        rule = %strategy.rule,
        bars = series.len(),
        indicated = frame.indicated_count(),
        "running backtest"
    );
    let rule = strategy.build_rule();
    let result = run_backtest(&frame, rule.as_ref(), &strategy.simulation);
    let rows = frame.rows();
    let aggregate = aggregate(strategy.reporting, &result.trades, &rows, &strategy.trend);
    let stats = TradeStats::compute(&result.trades);
    info!(trades = stats.total_trades, result = %aggregate, "backtest complete");

    if let Some(path) = snapshot_path {
        report_port.write_snapshot(&frame, &result.trace, path)?;
        info!(path = %path.display(), "snapshot written");
    }
    if let Some(path) = trades_path {
        report_port.write_trades(&result.trades, path)?;
        info!(path = %path.display(), "trades written");
    }

    Ok(BacktestSummary {
        bars: series.len(),
        indicated: frame.indicated_count(),
        signals: result.signal_count(),
        stats,
        aggregate,
        open_profit: result
            .open_position
            .as_ref()
            .zip(series.last())
            .map(|(pos, bar)| pos.unrealized_profit(bar.close)),
        open_position: result.open_position.clone(),
        trades: result.trades,
    })
}

fn print_summary(strategy: &StrategyConfig, summary: &BacktestSummary) {
    let stats = &summary.stats;
    println!("=== {} ({}) ===", strategy.name, strategy.instrument);
    println!("Rule:             {}", strategy.rule);
    println!("Bars:             {} ({} indicated)", summary.bars, summary.indicated);
    println!("Signals:          {}", summary.signals);
    println!("Total Trades:     {}", stats.total_trades);
    println!(
        "Won/Lost/Even:    {}/{}/{}",
        stats.trades_won, stats.trades_lost, stats.trades_breakeven
    );
    println!("Win Rate:         {:.1}%", stats.win_rate * 100.0);
    println!("Profit Factor:    {:.2}", stats.profit_factor);
    println!("Avg Win/Loss:     {:.5} / {:.5}", stats.avg_win, stats.avg_loss);
    println!(
        "Largest Win/Loss: {:.5} / {:.5}",
        stats.largest_win, stats.largest_loss
    );
    println!("Result ({}):  {}", summary.aggregate.mode.name(), summary.aggregate);
    if let Some(pos) = &summary.open_position {
        println!(
            "Open position:    {} @ {:.5} since {} (unrealized {:.5})",
            pos.side,
            pos.entry_price,
            pos.entry_time,
            summary.open_profit.unwrap_or_default()
        );
    }
}

/// Backtest driven entirely by a config file, with CLI overrides applied.
pub fn backtest_from_config(
    config_path: &Path,
    data: Option<&Path>,
    rule: Option<&str>,
    output: Option<&Path>,
    trades: Option<&Path>,
) -> Result<(StrategyConfig, BacktestSummary), FxError> {
    let adapter = load_config(config_path)?;
    let mut strategy = build_strategy_config(&adapter)?;
    if let Some(name) = rule {
        strategy.rule = name
            .parse::<RuleKind>()
            .map_err(|reason| FxError::invalid("strategy", "rule", reason))?;
    }
    let data_port = build_data_adapter(&adapter, data)?;
    let summary =
        run_backtest_pipeline(&data_port, &CsvReportAdapter::new(), &strategy, output, trades)?;
    Ok((strategy, summary))
}

fn run_backtest_command(
    config_path: &Path,
    data: Option<&Path>,
    rule: Option<&str>,
    output: Option<&Path>,
    trades: Option<&Path>,
) -> ExitCode {
    match backtest_from_config(config_path, data, rule, output, trades) {
        Ok((strategy, summary)) => {
            print_summary(&strategy, &summary);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Writes the augmented series for `data_path`. Without a config file the
/// default indicator windows are used.
pub fn write_indicator_snapshot(
    data_path: &Path,
    config_path: Option<&Path>,
    output: &Path,
) -> Result<usize, FxError> {
    let (params, data_port, instrument) = match config_path {
        Some(path) => {
            let adapter = load_config(path)?;
            (
                build_indicator_params(&adapter)?,
                build_data_adapter(&adapter, Some(data_path))?,
                adapter.get_string("data", "instrument"),
            )
        }
        None => (
            IndicatorParams::default(),
            CsvAdapter::new(data_path.to_path_buf()),
            None,
        ),
    };

    let instrument = instrument.unwrap_or_else(|| StrategyConfig::default().instrument);
    let series = data_port.fetch_series(&instrument)?;
    let frame = IndicatorFrame::compute(&series, params);
    CsvReportAdapter::new().write_snapshot(&frame, &[], output)?;
    info!(
        bars = frame.len(),
        indicated = frame.indicated_count(),
        path = %output.display(),
        "indicators written"
    );
    Ok(frame.len())
}

fn run_indicators(data: &Path, config: Option<&Path>, output: &Path) -> ExitCode {
    match write_indicator_snapshot(data, config, output) {
        Ok(bars) => {
            println!("Wrote {} bars to {}", bars, output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn load_session(state_path: Option<&Path>) -> Result<LiveSession, FxError> {
    match state_path {
        Some(path) if path.exists() => LiveSession::from_state(&fs::read_to_string(path)?),
        _ => Ok(LiveSession::default()),
    }
}

/// Evaluates the latest bar, persisting the processed timestamp to
/// `state_path` when one is given.
pub fn evaluate_latest(
    adapter: &dyn ConfigPort,
    data: Option<&Path>,
    state_path: Option<&Path>,
) -> Result<LiveDecision, FxError> {
    let strategy = build_strategy_config(adapter)?;
    let series = build_data_adapter(adapter, data)?.fetch_series(&strategy.instrument)?;

    let mut session = load_session(state_path)?;
    let decision = session.evaluate(&series, &strategy)?;

    if let Some(path) = state_path {
        if !matches!(decision, LiveDecision::Skipped { .. }) {
            fs::write(path, session.to_state())?;
        }
    }
    Ok(decision)
}

fn print_decision(decision: &LiveDecision) {
    match decision {
        LiveDecision::Skipped { timestamp } => {
            println!("SKIPPED {timestamp} (already processed)")
        }
        LiveDecision::NoSignal { timestamp } => println!("NO SIGNAL {timestamp}"),
        LiveDecision::Order { timestamp, intent } => println!(
            "ORDER {timestamp} {} units={} entry={:.5} stop={:.5} target={:.5}",
            intent.side,
            intent.signed_units(),
            intent.entry,
            intent.stop_price,
            intent.target_price
        ),
    }
}

fn run_signal(config_path: &Path, data: Option<&Path>, state: Option<&Path>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    match evaluate_latest(&adapter, data, state) {
        Ok(decision) => {
            print_decision(&decision);
            if let Some(granularity) = adapter
                .get_string("data", "granularity")
                .and_then(|g| g.parse::<Granularity>().ok())
            {
                let now = chrono::Utc::now().naive_utc();
                info!(next = %next_bar_boundary(now, granularity), %granularity, "next bar");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    if let Some(granularity) = adapter.get_string("data", "granularity") {
        if let Err(reason) = granularity.parse::<Granularity>() {
            return fail(FxError::invalid("data", "granularity", reason));
        }
    }

    match build_strategy_config(&adapter) {
        Ok(strategy) => {
            println!("{strategy}");
            println!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
