//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! An average loss of exactly zero is replaced by 1, which keeps the value
//! finite and inside [0, 100]. A series with no down moves therefore scores
//! low rather than saturating at 100, so a rally without down days never
//! trips the overbought veto.
//!
//! Warmup: first n samples are unavailable (n price changes are needed).

use super::{finite, Series};

pub fn rsi(data: &[f64], period: usize) -> Series {
    let mut values = vec![None; data.len()];
    if period == 0 || data.len() <= period {
        return values;
    }

    let changes: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| if c > 0.0 { c } else { 0.0 };
    let loss = |c: f64| if c < 0.0 { -c } else { 0.0 };

    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / period as f64;
    values[period] = finite(rsi_value(avg_gain, avg_loss));

    for i in (period + 1)..data.len() {
        let change = changes[i - 1];
        avg_gain = (avg_gain * (period - 1) as f64 + gain(change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(change)) / period as f64;
        values[i] = finite(rsi_value(avg_gain, avg_loss));
    }

    values
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let avg_loss = if avg_loss == 0.0 { 1.0 } else { avg_loss };
    100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
}
