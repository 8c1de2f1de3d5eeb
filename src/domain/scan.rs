//! Latest-bar signal snapshots across a list of symbols.
//!
//! Uses the same entry evaluation as the backtest so live signals and
//! historical validation cannot drift apart.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::QuantError;
use super::indicator::{rsi_divergence, value_at, volume_divergence, Divergence};
use super::ohlcv::{closes, validate_candles, volumes, Candle};
use super::signal::{evaluate_entry, EntryVeto, StrategyIndicators};
use super::strategy::StrategyConfig;
use crate::ports::data_port::MarketDataPort;

pub const DIVERGENCE_LOOKBACK: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSignal {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSnapshot {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: f64,
    pub rsi: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub score: u8,
    pub veto: Option<EntryVeto>,
    pub signal: ScanSignal,
    pub rsi_divergence: Divergence,
    pub volume_divergence: Divergence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScanReport {
    pub snapshots: Vec<SignalSnapshot>,
    pub failures: Vec<ScanFailure>,
}

/// Evaluates the most recent bar on or before `scan_date` (the last bar when
/// `scan_date` is `None`).
pub fn scan_symbol(
    symbol: &str,
    candles: &[Candle],
    config: &StrategyConfig,
    scan_date: Option<NaiveDate>,
) -> Result<SignalSnapshot, QuantError> {
    config.validate()?;

    let end = match scan_date {
        Some(date) => candles.partition_point(|c| c.date <= date),
        None => candles.len(),
    };
    let candles = &candles[..end];

    let minimum = config.warmup_bars();
    if candles.len() < minimum {
        return Err(QuantError::InsufficientData {
            symbol: symbol.to_string(),
            bars: candles.len(),
            minimum,
        });
    }
    validate_candles(candles)?;

    let indicators = StrategyIndicators::compute(candles, config);
    let index = candles.len() - 1;
    let entry = evaluate_entry(candles, &indicators, index, config);

    let signal = if entry.should_enter(config.score_threshold) {
        ScanSignal::Buy
    } else if indicators.trend_reversed(index) == Some(true) {
        ScanSignal::Sell
    } else {
        ScanSignal::Hold
    };

    let closes = closes(candles);
    let last = &candles[index];

    Ok(SignalSnapshot {
        symbol: symbol.to_string(),
        date: last.date,
        price: last.close,
        rsi: value_at(&indicators.rsi, index),
        ema_fast: value_at(&indicators.ema_fast, index),
        ema_slow: value_at(&indicators.ema_slow, index),
        score: entry.score,
        veto: entry.veto,
        signal,
        rsi_divergence: rsi_divergence(&closes, &indicators.rsi, DIVERGENCE_LOOKBACK),
        volume_divergence: volume_divergence(&closes, &volumes(candles), DIVERGENCE_LOOKBACK),
    })
}

/// Scans every symbol; a symbol that cannot be analysed is reported in
/// `failures` and does not abort the batch.
pub fn batch_scan(
    data_port: &dyn MarketDataPort,
    symbols: &[String],
    config: &StrategyConfig,
    scan_date: Option<NaiveDate>,
) -> ScanReport {
    let mut report = ScanReport::default();
    let end = scan_date.unwrap_or(NaiveDate::MAX);

    for symbol in symbols {
        let outcome = data_port
            .fetch_ohlcv(symbol, NaiveDate::MIN, end)
            .and_then(|candles| scan_symbol(symbol, &candles, config, scan_date));

        match outcome {
            Ok(snapshot) => report.snapshots.push(snapshot),
            Err(e) => {
                log::warn!("could not analyze {}: {}", symbol, e);
                report.failures.push(ScanFailure {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}
