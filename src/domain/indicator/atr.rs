//! Average True Range.
//!
//! TR[0] = high - low, TR[i] = max(high - low, |high - C[i-1]|, |low - C[i-1]|).
//! Seed with the mean of the first n true ranges, then Wilder smoothing:
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first (n-1) samples are unavailable.

use super::{finite, Series};
use crate::domain::ohlcv::Candle;

pub fn atr(candles: &[Candle], period: usize) -> Series {
    let true_ranges: Vec<f64> = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            if i == 0 {
                candle.high - candle.low
            } else {
                candle.true_range(candles[i - 1].close)
            }
        })
        .collect();

    wilder_average(&true_ranges, period)
}

/// ATR over parallel high/low/close arrays of equal length.
pub fn atr_hlc(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Series {
    let len = highs.len().min(lows.len()).min(closes.len());
    let true_ranges: Vec<f64> = (0..len)
        .map(|i| {
            let hl = highs[i] - lows[i];
            if i == 0 {
                hl
            } else {
                let prev_close = closes[i - 1];
                hl.max((highs[i] - prev_close).abs())
                    .max((lows[i] - prev_close).abs())
            }
        })
        .collect();

    let mut values = wilder_average(&true_ranges, period);
    values.resize(closes.len(), None);
    values
}

fn wilder_average(true_ranges: &[f64], period: usize) -> Series {
    let mut values = vec![None; true_ranges.len()];
    if period == 0 || true_ranges.len() < period {
        return values;
    }

    let mut current = true_ranges[..period].iter().sum::<f64>() / period as f64;
    values[period - 1] = finite(current);

    for i in period..true_ranges.len() {
        current = (current * (period - 1) as f64 + true_ranges[i]) / period as f64;
        values[i] = finite(current);
    }

    values
}
