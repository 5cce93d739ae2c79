//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fixed_params::FixedParams;
use crate::domain::backtest::{self, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    date_range, read_count, read_double, validate_backtest_config, validate_strategy_config,
    validate_walk_forward_config,
};
use crate::domain::error::SigtraderError;
use crate::domain::execution::{self, Action, HeldPosition, HoldReason};
use crate::domain::indicator::IndicatorParams;
use crate::domain::series::Series;
use crate::domain::signal::Thresholds;
use crate::domain::strategy::{Strategy, StrategyParams};
use crate::domain::walk_forward::{
    WalkForwardConfig, WalkForwardHarness, WalkForwardSummary, WindowResult,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "sigtrader", about = "EMA/RSI/ATR strategy backtester")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single backtest over the whole series
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV file, or a directory holding <SYMBOL>.csv
        #[arg(short, long)]
        data: PathBuf,
        /// Output stem for <stem>_equity.csv and <stem>_trades.csv
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Evaluate rolling out-of-sample windows
    WalkForward {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Evaluate windows on all cores
        #[arg(long)]
        parallel: bool,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the latest bar's signal and the resulting action
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Current holding as <quantity>@<average price>
        #[arg(long)]
        holding: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
        } => run_backtest(&config, &data, output.as_deref()),
        Command::WalkForward {
            config,
            data,
            parallel,
            output,
        } => run_walk_forward(&config, &data, parallel, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Signal {
            config,
            data,
            holding,
        } => run_signal(&config, &data, holding.as_deref()),
    }
}

fn fail(err: SigtraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        fail(SigtraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })
    })
}

pub fn build_strategy_params(adapter: &dyn ConfigPort) -> Result<StrategyParams, SigtraderError> {
    let defaults = StrategyParams::default();
    let period = |key: &str, default: usize| read_count(adapter, "strategy", key, default);
    let double = |key: &str, default: f64| read_double(adapter, "strategy", key, default);

    let params = StrategyParams {
        indicators: IndicatorParams {
            ma_fast_span: period("ma_fast", defaults.indicators.ma_fast_span)?,
            ma_slow_span: period("ma_slow", defaults.indicators.ma_slow_span)?,
            rsi_period: period("rsi_period", defaults.indicators.rsi_period)?,
            atr_period: period("atr_period", defaults.indicators.atr_period)?,
        },
        thresholds: Thresholds {
            rsi_oversold: double("rsi_oversold", defaults.thresholds.rsi_oversold)?,
            rsi_overbought: double("rsi_overbought", defaults.thresholds.rsi_overbought)?,
        },
        atr_multiplier: double("atr_multiplier", defaults.atr_multiplier)?,
        risk_per_trade: double("risk_per_trade", defaults.risk_per_trade)?,
    };
    Strategy::new(params)?;
    Ok(params)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SigtraderError> {
    let defaults = BacktestConfig::default();
    let config = BacktestConfig {
        initial_capital: read_double(
            adapter,
            "backtest",
            "initial_capital",
            defaults.initial_capital,
        )?,
        commission_rate: read_double(adapter, "backtest", "commission", defaults.commission_rate)?,
    };
    config.validate()?;
    Ok(config)
}

pub fn build_walk_forward_config(
    adapter: &dyn ConfigPort,
) -> Result<WalkForwardConfig, SigtraderError> {
    let defaults = WalkForwardConfig::default();
    let months = |key: &str, default: usize| read_count(adapter, "walkforward", key, default);
    let config = WalkForwardConfig {
        train_months: months("train_months", defaults.train_months)?,
        test_months: months("test_months", defaults.test_months)?,
        month_length_bars: months("month_length_bars", defaults.month_length_bars)?,
    };
    config.validate()?;
    Ok(config)
}

/// Fetches bars for `symbol` from any data port and validates them.
pub fn fetch_series(
    data_port: &dyn DataPort,
    symbol: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Series, SigtraderError> {
    Series::new(data_port.fetch_ohlcv(symbol, start_date, end_date)?)
}

/// Loads the series named by `--data`, honouring the optional date range.
///
/// A directory is read through `CsvAdapter` using `[backtest] symbol`.
pub fn load_series(data: &Path, config: &dyn ConfigPort) -> Result<Series, SigtraderError> {
    let (start, end) = date_range(config)?;
    let start = start.unwrap_or(NaiveDate::MIN);
    let end = end.unwrap_or(NaiveDate::MAX);

    if data.is_dir() {
        let symbol = config
            .get_string("backtest", "symbol")
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SigtraderError::ConfigMissing {
                section: "backtest".into(),
                key: "symbol".into(),
            })?;
        return fetch_series(&CsvAdapter::new(data.to_path_buf()), &symbol, start, end);
    }

    let mut bars = CsvAdapter::from_path(data)?;
    bars.retain(|b| b.date >= start && b.date <= end);
    Series::new(bars)
}

/// Validated config plus the series it points at.
struct Prepared {
    adapter: FileConfigAdapter,
    params: StrategyParams,
    backtest: BacktestConfig,
    series: Series,
}

fn prepare(config_path: &Path, data: &Path) -> Result<Prepared, ExitCode> {
    tracing::info!(config = %config_path.display(), "loading config");
    let adapter = load_config(config_path)?;

    let checked = validate_strategy_config(&adapter)
        .and_then(|_| validate_backtest_config(&adapter))
        .and_then(|_| build_strategy_params(&adapter))
        .and_then(|params| Ok((params, build_backtest_config(&adapter)?)));
    let (params, backtest) = checked.map_err(fail)?;

    let series = load_series(data, &adapter).map_err(fail)?;
    tracing::info!(data = %data.display(), bars = series.len(), "series loaded");

    Ok(Prepared {
        adapter,
        params,
        backtest,
        series,
    })
}

fn run_backtest(config_path: &Path, data: &Path, output: Option<&str>) -> ExitCode {
    let prepared = match prepare(config_path, data) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let reporter = CsvReportAdapter::new();
    run_backtest_pipeline(
        &prepared.series,
        &prepared.params,
        &prepared.backtest,
        output.map(|stem| (&reporter as &dyn ReportPort, stem)),
    )
}

/// Runs one backtest, prints the summary to stderr and optionally writes a report.
pub fn run_backtest_pipeline(
    series: &Series,
    params: &StrategyParams,
    config: &BacktestConfig,
    report: Option<(&dyn ReportPort, &str)>,
) -> ExitCode {
    let strategy = match Strategy::new(*params) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let result = match backtest::run_backtest(series, &strategy, config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    print_backtest_summary(&result, config);

    if let Some((port, stem)) = report {
        if let Err(e) = port.write(&result, stem) {
            return fail(e);
        }
        eprintln!("\nReport written with stem: {stem}");
    }
    ExitCode::SUCCESS
}

fn print_backtest_summary(result: &BacktestResult, config: &BacktestConfig) {
    let m = &result.metrics;
    let s = result.run.summary();

    eprintln!("\n=== Strategy ===");
    eprintln!("Bars:             {}", s.total_bars);
    eprintln!("Buy signals:      {}", s.buy_signals);
    eprintln!("Sell signals:     {}", s.sell_signals);
    eprintln!("Bars invested:    {}", s.bars_invested);
    eprintln!(
        "Average ATR:      {:.4} ({:.2}% of price)",
        s.average_atr,
        s.average_atr_pct * 100.0
    );

    eprintln!("\n=== Results ===");
    eprintln!("Initial Capital:  {:.2}", config.initial_capital);
    eprintln!("Final Value:      {:.2}", m.final_portfolio_value);
    eprintln!("Strategy Return:  {:.2}%", m.total_return_strategy * 100.0);
    eprintln!("Market Return:    {:.2}%", m.total_return_market * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Max Drawdown:     {:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", m.num_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!("Exposure:         {:.1}%", m.exposure * 100.0);
    eprintln!("Commission Paid:  {:.2}", m.total_commission);
    if let Some(open) = &result.open_trade {
        eprintln!(
            "Open Trade:       since {} at {:.2} (stop {:.2})",
            open.entry_date, open.entry_price, open.stop_loss_price
        );
    }
}

fn run_walk_forward(
    config_path: &Path,
    data: &Path,
    parallel: bool,
    output: Option<&str>,
) -> ExitCode {
    let prepared = match prepare(config_path, data) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let wf_config = match validate_walk_forward_config(&prepared.adapter)
        .and_then(|_| build_walk_forward_config(&prepared.adapter))
    {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let optimizer = FixedParams::new(prepared.params);
    let results = match run_walk_forward_pipeline(
        &prepared.series,
        wf_config,
        prepared.backtest,
        &optimizer,
        parallel,
    ) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    let summary = WalkForwardSummary::from_windows(&results);
    print_walk_forward_summary(&results, &summary);

    if let Some(stem) = output {
        if let Err(e) = CsvReportAdapter::new().write_walk_forward(&results, &summary, stem) {
            return fail(e);
        }
    }
    ExitCode::SUCCESS
}

/// Evaluates every window; an empty result means the series fits no window.
pub fn run_walk_forward_pipeline<O>(
    series: &Series,
    config: WalkForwardConfig,
    backtest: BacktestConfig,
    optimizer: &O,
    parallel: bool,
) -> Result<Vec<WindowResult>, SigtraderError>
where
    O: crate::ports::optimizer_port::OptimizerPort + Sync,
{
    let harness = WalkForwardHarness::new(config, backtest, optimizer)?;
    if parallel {
        harness.run_parallel(series)
    } else {
        harness.run(series).collect()
    }
}

fn print_walk_forward_summary(results: &[WindowResult], summary: &WalkForwardSummary) {
    eprintln!("\n=== Walk-Forward Windows ===");
    for w in results {
        eprintln!(
            "  #{:<3} {} to {}  return {:>7.2}%  sharpe {:>6.2}  trades {}",
            w.spec.index,
            w.test_start_date,
            w.test_end_date,
            w.metrics.total_return_strategy * 100.0,
            w.metrics.sharpe_ratio,
            w.metrics.num_trades,
        );
    }

    eprintln!("\n=== Summary ===");
    eprintln!("Windows:          {}", summary.windows);
    eprintln!("Mean OOS Sharpe:  {:.2}", summary.mean_oos_sharpe);
    eprintln!("Median Sharpe:    {:.2}", summary.median_oos_sharpe);
    eprintln!("Mean Return:      {:.2}%", summary.mean_total_return * 100.0);
    eprintln!("Compounded:       {:.2}%", summary.compounded_return * 100.0);
    eprintln!("Profitable:       {:.0}%", summary.profitable_fraction * 100.0);
    eprintln!("Total Trades:     {}", summary.total_trades);
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = validate_strategy_config(&adapter)
        .and_then(|_| validate_backtest_config(&adapter))
        .and_then(|_| validate_walk_forward_config(&adapter))
        .and_then(|_| {
            Ok((
                build_strategy_params(&adapter)?,
                build_backtest_config(&adapter)?,
                build_walk_forward_config(&adapter)?,
            ))
        });
    let (params, backtest, wf) = match checked {
        Ok(v) => v,
        Err(e) => return fail(e),
    };

    let ind = &params.indicators;
    eprintln!("\nStrategy:");
    eprintln!("  EMA({}) / EMA({})", ind.ma_fast_span, ind.ma_slow_span);
    eprintln!(
        "  RSI({}) band ({}, {})",
        ind.rsi_period, params.thresholds.rsi_oversold, params.thresholds.rsi_overbought
    );
    eprintln!("  ATR({}) x {}", ind.atr_period, params.atr_multiplier);
    eprintln!("  risk per trade {}", params.risk_per_trade);
    eprintln!("  minimum bars {}", ind.minimum_bars());
    eprintln!("\nBacktest:");
    eprintln!("  initial capital {}", backtest.initial_capital);
    eprintln!("  commission {}", backtest.commission_rate);
    eprintln!("\nWalk-forward:");
    eprintln!(
        "  train {} bars, test {} bars",
        wf.train_bars(),
        wf.test_bars()
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

/// Parses `<quantity>@<average price>`, e.g. `100@12.50`.
pub fn parse_holding(value: &str) -> Result<HeldPosition, String> {
    let (qty, price) = value
        .split_once('@')
        .ok_or_else(|| format!("expected <quantity>@<price>, got '{value}'"))?;
    let quantity: f64 = qty
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity '{qty}'"))?;
    let average_price: f64 = price
        .trim()
        .parse()
        .map_err(|_| format!("invalid price '{price}'"))?;
    if quantity < 0.0 || average_price < 0.0 {
        return Err("holding quantity and price must be non-negative".to_string());
    }
    Ok(HeldPosition {
        quantity,
        average_price,
    })
}

fn run_signal(config_path: &Path, data: &Path, holding: Option<&str>) -> ExitCode {
    let held = match holding.map(parse_holding).transpose() {
        Ok(h) => h,
        Err(reason) => {
            eprintln!("error: {reason}");
            return ExitCode::from(2);
        }
    };
    let prepared = match prepare(config_path, data) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let decision = Strategy::new(prepared.params)
        .and_then(|strategy| strategy.evaluate(&prepared.series))
        .and_then(|run| execution::decide(&run, held));
    let decision = match decision {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let action = match decision.action {
        Action::Enter(sizing) => format!(
            "ENTER fraction={:.4} stop={:.2}",
            sizing.position_fraction, sizing.stop_loss_price
        ),
        Action::Exit => "EXIT".to_string(),
        Action::Hold(HoldReason::AlreadyInvested) => "HOLD (invested)".to_string(),
        Action::Hold(HoldReason::AwaitingEntry) => "HOLD (awaiting entry)".to_string(),
    };
    println!(
        "{} close={:.2} signal={} position={:?} action={}",
        decision.date, decision.close, decision.signal, decision.position, action
    );
    ExitCode::SUCCESS
}
