//! Bar-by-bar strategy simulation.
//!
//! Each bar first checks the open position's exits (stop, take profit, trend
//! reversal), then ratchets the trailing stop, then, if flat, evaluates the
//! shared entry rules and sizes a new position by risk. Capital plus
//! unrealised P&L is recorded every simulated bar.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::QuantError;
use super::indicator::{value_at, Series};
use super::metrics::{BacktestSummary, EquityPoint};
use super::ohlcv::{validate_candles, Candle};
use super::position::{BacktestTrade, ExitReason, Position, PositionState};
use super::signal::{evaluate_entry, StrategyIndicators};
use super::strategy::{StrategyConfig, RISK_PER_TRADE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalMarker {
    pub date: NaiveDate,
    pub price: f64,
    pub side: Side,
}

/// Series kept for charting, aligned with the input candles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationSeries {
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
    pub ema_fast: Series,
    pub ema_slow: Series,
    pub rsi: Series,
    pub atr: Series,
    pub macd_histogram: Series,
    /// Entry score on bars where the strategy was flat and evaluated entry.
    pub entry_score: Vec<Option<u8>>,
    /// Trailing stop at the close of each bar while a position is open.
    pub stop_loss: Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub config: StrategyConfig,
    pub trades: Vec<BacktestTrade>,
    pub summary: BacktestSummary,
    pub equity_curve: Vec<EquityPoint>,
    pub series: PresentationSeries,
    pub signals: Vec<SignalMarker>,
}

struct Simulation<'a> {
    symbol: &'a str,
    config: &'a StrategyConfig,
    capital: f64,
    state: PositionState,
    trades: Vec<BacktestTrade>,
    signals: Vec<SignalMarker>,
}

impl Simulation<'_> {
    fn check_exit(&mut self, candle: &Candle, index: usize, indicators: &StrategyIndicators) {
        let exit = match self.state.position() {
            None => return,
            Some(position) => {
                if position.should_stop_loss(candle.low) {
                    Some((position.stop_loss, ExitReason::StopLoss))
                } else if position.should_take_profit(candle.high) {
                    Some((position.take_profit, ExitReason::TakeProfit))
                } else if indicators.trend_reversed(index) == Some(true) {
                    Some((candle.close, ExitReason::TrendReversal))
                } else {
                    None
                }
            }
        };

        match exit {
            Some((price, reason)) => self.close(price, candle.date, reason),
            None => {
                if let (PositionState::InPosition(position), Some(atr)) =
                    (&mut self.state, value_at(&indicators.atr, index))
                {
                    position.ratchet_stop(candle.close - self.config.atr_multiplier * atr);
                }
            }
        }
    }

    fn close(&mut self, price: f64, date: NaiveDate, reason: ExitReason) {
        let Some(position) = self.state.take() else {
            return;
        };
        let trade = position.close(price, date, reason);
        log::debug!(
            "{}: exit {} @ {:.2} on {} ({:?}, pnl {:.2})",
            self.symbol,
            trade.quantity,
            price,
            date,
            reason,
            trade.pnl
        );
        self.capital += trade.pnl;
        self.signals.push(SignalMarker {
            date,
            price,
            side: Side::Sell,
        });
        self.trades.push(trade);
    }

    /// Opens a position sized so that hitting the initial stop loses
    /// `RISK_PER_TRADE` of current capital. Stays flat when sizing yields
    /// no whole share.
    fn enter(&mut self, candle: &Candle, atr: f64, score: u8) {
        let stop = candle.close - self.config.atr_multiplier * atr;
        let risk_per_share = candle.close - stop;
        if risk_per_share <= 0.0 || !risk_per_share.is_finite() || self.capital <= 0.0 {
            return;
        }

        let quantity = (self.capital * RISK_PER_TRADE / risk_per_share).floor();
        if !quantity.is_finite() || quantity < 1.0 {
            return;
        }
        let quantity = quantity as u64;

        log::debug!(
            "{}: enter {} @ {:.2} on {} (score {}, stop {:.2})",
            self.symbol,
            quantity,
            candle.close,
            candle.date,
            score,
            stop
        );

        self.state = PositionState::InPosition(Position {
            entry_price: candle.close,
            entry_date: candle.date,
            quantity,
            stop_loss: stop,
            initial_stop: stop,
            take_profit: candle.close + self.config.take_profit_multiplier * atr,
            entry_atr: atr,
        });
        self.signals.push(SignalMarker {
            date: candle.date,
            price: candle.close,
            side: Side::Buy,
        });
    }

    fn equity(&self, price: f64) -> f64 {
        self.capital
            + self
                .state
                .position()
                .map_or(0.0, |p| p.unrealized_pnl(price))
    }
}

/// Runs the strategy over `candles` and reports the trade log and statistics.
///
/// Fails with `InsufficientData` before any computation when the history is
/// shorter than the configured warm-up, and with `InvalidInput` on malformed
/// candles.
pub fn run_strategy(
    symbol: &str,
    candles: &[Candle],
    config: &StrategyConfig,
) -> Result<BacktestResult, QuantError> {
    config.validate()?;

    let warmup = config.warmup_bars();
    if candles.len() < warmup {
        return Err(QuantError::InsufficientData {
            symbol: symbol.to_string(),
            bars: candles.len(),
            minimum: warmup,
        });
    }
    validate_candles(candles)?;

    let indicators = StrategyIndicators::compute(candles, config);

    let mut sim = Simulation {
        symbol,
        config,
        capital: config.initial_capital,
        state: PositionState::Flat,
        trades: Vec::new(),
        signals: Vec::new(),
    };

    let mut equity_curve = Vec::with_capacity(candles.len() - warmup);
    let mut entry_score = vec![None; candles.len()];
    let mut stop_loss = vec![None; candles.len()];

    for (index, candle) in candles.iter().enumerate().skip(warmup) {
        sim.check_exit(candle, index, &indicators);

        if sim.state.is_flat() {
            let signal = evaluate_entry(candles, &indicators, index, config);
            entry_score[index] = Some(signal.score);
            if signal.should_enter(config.score_threshold) {
                if let Some(atr) = value_at(&indicators.atr, index) {
                    sim.enter(candle, atr, signal.score);
                }
            }
        }

        stop_loss[index] = sim.state.position().map(|p| p.stop_loss);
        equity_curve.push(EquityPoint {
            date: candle.date,
            equity: sim.equity(candle.close),
        });
    }

    if let Some(last) = candles.last() {
        sim.close(last.close, last.date, ExitReason::EndOfData);
    }

    let summary = BacktestSummary::compute(&sim.trades, &equity_curve, config.initial_capital);
    log::debug!(
        "{}: {} trades, total pnl {:.2}, sharpe {:.3}",
        symbol,
        summary.total_trades,
        summary.total_pnl,
        summary.sharpe_ratio
    );

    Ok(BacktestResult {
        symbol: symbol.to_string(),
        config: config.clone(),
        trades: sim.trades,
        summary,
        equity_curve,
        series: PresentationSeries {
            dates: candles.iter().map(|c| c.date).collect(),
            closes: candles.iter().map(|c| c.close).collect(),
            ema_fast: indicators.ema_fast,
            ema_slow: indicators.ema_slow,
            rsi: indicators.rsi,
            atr: indicators.atr,
            macd_histogram: indicators.macd_histogram,
            entry_score,
            stop_loss,
        },
        signals: sim.signals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_closes(closes: &[f64], spread: f64, volume: f64) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + spread,
                low: close - spread,
                close,
                volume,
            })
            .collect()
    }

    fn permissive_config() -> StrategyConfig {
        StrategyConfig {
            rsi_lower: 0.0,
            rsi_upper: 70.0,
            score_threshold: 5,
            use_volatility_filter: false,
            ..StrategyConfig::default()
        }
    }

    #[test]
    fn insufficient_data_rejected() {
        let candles = candles_from_closes(&[100.0; 49], 1.0, 1000.0);
        let err = run_strategy("AAA", &candles, &StrategyConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            QuantError::InsufficientData {
                bars: 49,
                minimum: 50,
                ..
            }
        ));
    }

    #[test]
    fn trend_filter_needs_200_bars() {
        let candles = candles_from_closes(&[100.0; 150], 1.0, 1000.0);
        let config = StrategyConfig {
            use_trend_filter: true,
            ..StrategyConfig::default()
        };
        let err = run_strategy("AAA", &candles, &config).unwrap_err();
        assert!(matches!(err, QuantError::InsufficientData { minimum: 200, .. }));
    }

    #[test]
    fn malformed_candle_rejected() {
        let mut candles = candles_from_closes(&[100.0; 60], 1.0, 1000.0);
        candles[10].high = 90.0;
        let err = run_strategy("AAA", &candles, &StrategyConfig::default()).unwrap_err();
        assert!(matches!(err, QuantError::InvalidInput { .. }));
    }

    #[test]
    fn invalid_config_rejected() {
        let candles = candles_from_closes(&[100.0; 60], 1.0, 1000.0);
        let config = StrategyConfig {
            ema_fast: 60,
            ..StrategyConfig::default()
        };
        let err = run_strategy("AAA", &candles, &config).unwrap_err();
        assert!(matches!(err, QuantError::InvalidConfig { .. }));
    }

    #[test]
    fn exactly_warmup_bars_runs_without_trades() {
        let candles = candles_from_closes(&[100.0; 50], 1.0, 1000.0);
        let result = run_strategy("AAA", &candles, &StrategyConfig::default()).unwrap();
        assert!(result.trades.is_empty());
        assert!(result.equity_curve.is_empty());
    }

    #[test]
    fn rising_series_takes_profit() {
        let closes: Vec<f64> = (0..150).map(|i| 100.0 + 0.5 * i as f64).collect();
        let candles = candles_from_closes(&closes, 0.5, 1000.0);
        let result = run_strategy("UP", &candles, &permissive_config()).unwrap();

        assert!(!result.trades.is_empty());
        assert!(result
            .trades
            .iter()
            .any(|t| t.exit_reason == ExitReason::TakeProfit && t.pnl > 0.0));
        assert!(result.summary.winning_trades >= 1);
    }

    #[test]
    fn stop_loss_exit_on_crash() {
        // Enter during the rise, then gap down far below any stop.
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + 0.5 * i as f64).collect();
        closes.extend((0..10).map(|_| 60.0));
        let mut candles = candles_from_closes(&closes, 0.5, 1000.0);
        // Keep the take-profit out of reach before the crash.
        for candle in candles.iter_mut().take(60) {
            candle.high = candle.close + 0.1;
        }
        let config = StrategyConfig {
            take_profit_multiplier: 50.0,
            ..permissive_config()
        };
        let result = run_strategy("DROP", &candles, &config).unwrap();

        let stopped = result
            .trades
            .iter()
            .find(|t| t.exit_reason == ExitReason::StopLoss)
            .expect("a stop-loss exit");
        // The trailing stop locked in gains before the gap: close 129.5 - 2 * ATR 0.6.
        assert!(stopped.pnl > 0.0);
        assert!((stopped.exit_price - 128.3).abs() < 1e-6);
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn open_position_closed_at_end_of_data() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 0.5 * i as f64).collect();
        let candles = candles_from_closes(&closes, 0.5, 1000.0);
        let config = StrategyConfig {
            take_profit_multiplier: 100.0,
            ..permissive_config()
        };
        let result = run_strategy("OPEN", &candles, &config).unwrap();

        let last = result.trades.last().expect("closed trade");
        assert_eq!(last.exit_reason, ExitReason::EndOfData);
        assert_eq!(last.exit_date, candles.last().unwrap().date);
    }

    #[test]
    fn presentation_series_aligned() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.2).sin()).collect();
        let candles = candles_from_closes(&closes, 1.0, 1000.0);
        let result = run_strategy("SIN", &candles, &StrategyConfig::default()).unwrap();

        assert_eq!(result.series.dates.len(), 80);
        assert_eq!(result.series.ema_fast.len(), 80);
        assert_eq!(result.series.rsi.len(), 80);
        assert_eq!(result.series.entry_score.len(), 80);
        assert_eq!(result.series.stop_loss.len(), 80);
        assert_eq!(result.equity_curve.len(), 30);
        assert!(result.series.entry_score[..50].iter().all(Option::is_none));
    }
}
