//! CLI definition and dispatch.
//!
//! Every subcommand loads candles through a [`MarketDataPort`], runs one
//! domain computation and writes the result as JSON to stdout or a file.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_strategy, BacktestResult};
use crate::domain::config_validation::{
    build_portfolio_holdings, build_risk_params, build_strategy_config, PortfolioHolding,
};
use crate::domain::error::QuantError;
use crate::domain::indicator::{compute_indicators, IndicatorRequest, MacdParams, Series};
use crate::domain::ohlcv::closes;
use crate::domain::risk::{compute_risk_analytics, PortfolioPosition, RiskAnalytics, RiskParams};
use crate::domain::scan::{batch_scan, ScanReport};
use crate::domain::stats::simple_returns;
use crate::domain::strategy::StrategyConfig;
use crate::ports::data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "quantcore", about = "Indicators, strategy backtests and portfolio risk")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the scoring strategy on one symbol
    Backtest {
        /// Directory holding <SYMBOL>.csv files
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
        /// INI file with a [strategy] section
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Evaluate the latest entry signal for several symbols
    Scan {
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated; defaults to every CSV file in the data directory
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Scan as of this date instead of the last bar
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Portfolio and per-asset risk analytics
    Risk {
        #[arg(short, long)]
        data: PathBuf,
        /// INI file with [portfolio] symbols and one section per holding
        #[arg(short, long)]
        portfolio: PathBuf,
        /// Symbol whose returns serve as the beta/alpha benchmark
        #[arg(long)]
        benchmark: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute indicator series for one symbol
    Indicators {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        sma: Option<usize>,
        #[arg(long)]
        ema: Option<usize>,
        #[arg(long)]
        rsi: Option<usize>,
        #[arg(long)]
        atr: Option<usize>,
        /// MACD(12,26,9)
        #[arg(long)]
        macd: bool,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            data,
            symbol,
            config,
            start,
            end,
            output,
        } => {
            let result = load_strategy(config.as_deref()).and_then(|strategy| {
                let port = CsvAdapter::new(data);
                backtest_report(&port, &symbol, &strategy, start, end)
            });
            finish(result, output.as_deref(), Some(&symbol))
        }
        Command::Scan {
            data,
            symbols,
            config,
            date,
            output,
        } => {
            let result = load_strategy(config.as_deref()).and_then(|strategy| {
                let port = CsvAdapter::new(data);
                let symbols = if symbols.is_empty() {
                    port.list_symbols()?
                } else {
                    symbols
                };
                Ok(scan_report(&port, &symbols, &strategy, date))
            });
            finish(result, output.as_deref(), None)
        }
        Command::Risk {
            data,
            portfolio,
            benchmark,
            output,
        } => {
            let result = FileConfigAdapter::from_file(&portfolio).and_then(|ini| {
                let holdings = build_portfolio_holdings(&ini)?;
                let params = build_risk_params(&ini)?;
                let port = CsvAdapter::new(data);
                risk_report(&port, &holdings, benchmark.as_deref(), &params)
            });
            finish(result, output.as_deref(), None)
        }
        Command::Indicators {
            data,
            symbol,
            sma,
            ema,
            rsi,
            atr,
            macd,
            start,
            end,
            output,
        } => {
            let request = IndicatorRequest {
                sma,
                ema,
                rsi,
                atr,
                macd: macd.then(MacdParams::default),
            };
            let port = CsvAdapter::new(data);
            let result = indicator_report(&port, &symbol, &request, start, end);
            finish(result, output.as_deref(), Some(&symbol))
        }
    }
}

/// Strategy settings from an INI file, or the defaults without one.
pub fn load_strategy(path: Option<&Path>) -> Result<StrategyConfig, QuantError> {
    match path {
        Some(path) => {
            log::info!("loading strategy config from {}", path.display());
            build_strategy_config(&FileConfigAdapter::from_file(path)?)
        }
        None => Ok(StrategyConfig::default()),
    }
}

pub fn backtest_report(
    data_port: &dyn MarketDataPort,
    symbol: &str,
    strategy: &StrategyConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<BacktestResult, QuantError> {
    let candles = data_port.fetch_ohlcv(
        symbol,
        start.unwrap_or(NaiveDate::MIN),
        end.unwrap_or(NaiveDate::MAX),
    )?;
    log::info!("backtesting {} over {} bars", symbol, candles.len());

    let result = run_strategy(symbol, &candles, strategy)?;
    log::info!(
        "{}: {} trades, total P&L {:.2}, Sharpe {:.2}",
        symbol,
        result.summary.total_trades,
        result.summary.total_pnl,
        result.summary.sharpe_ratio
    );
    Ok(result)
}

pub fn scan_report(
    data_port: &dyn MarketDataPort,
    symbols: &[String],
    strategy: &StrategyConfig,
    date: Option<NaiveDate>,
) -> ScanReport {
    log::info!("scanning {} symbols", symbols.len());
    let report = batch_scan(data_port, symbols, strategy, date);
    log::info!(
        "scan finished: {} signals, {} failures",
        report.snapshots.len(),
        report.failures.len()
    );
    report
}

pub fn risk_report(
    data_port: &dyn MarketDataPort,
    holdings: &[PortfolioHolding],
    benchmark: Option<&str>,
    params: &RiskParams,
) -> Result<RiskAnalytics, QuantError> {
    let positions = holdings
        .iter()
        .map(|h| {
            let candles = data_port.fetch_ohlcv(&h.symbol, NaiveDate::MIN, NaiveDate::MAX)?;
            PortfolioPosition::from_candles(&h.symbol, h.quantity, h.avg_price, &candles)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let benchmark_returns = match benchmark {
        Some(symbol) => {
            let candles = data_port.fetch_ohlcv(symbol, NaiveDate::MIN, NaiveDate::MAX)?;
            Some(simple_returns(&closes(&candles)))
        }
        None => None,
    };

    log::info!("computing risk for {} positions", positions.len());
    compute_risk_analytics(&positions, benchmark_returns.as_deref(), params)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReport {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub series: BTreeMap<String, Series>,
}

pub fn indicator_report(
    data_port: &dyn MarketDataPort,
    symbol: &str,
    request: &IndicatorRequest,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<IndicatorReport, QuantError> {
    let candles = data_port.fetch_ohlcv(
        symbol,
        start.unwrap_or(NaiveDate::MIN),
        end.unwrap_or(NaiveDate::MAX),
    )?;
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();

    let set = compute_indicators(&closes(&candles), Some(&highs), Some(&lows), request)?;

    Ok(IndicatorReport {
        symbol: symbol.to_string(),
        dates: candles.iter().map(|c| c.date).collect(),
        series: set.labelled(request),
    })
}

pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), QuantError> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn finish<T: Serialize>(
    result: Result<T, QuantError>,
    output: Option<&Path>,
    symbol: Option<&str>,
) -> ExitCode {
    match result.and_then(|value| write_json(&value, output)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match symbol {
                Some(symbol) => eprintln!("could not analyze {symbol}: {e}"),
                None => eprintln!("error: {e}"),
            }
            (&e).into()
        }
    }
}
