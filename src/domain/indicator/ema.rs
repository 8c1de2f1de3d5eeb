//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the first n samples, then
//! EMA[i] = X[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) samples are unavailable.

use super::{finite, Series};

pub fn ema(data: &[f64], period: usize) -> Series {
    let mut values = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return values;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut current = data[..period].iter().sum::<f64>() / period as f64;
    values[period - 1] = finite(current);

    for i in period..data.len() {
        current = data[i] * k + current * (1.0 - k);
        values[i] = finite(current);
    }

    values
}

/// EMA over a series that has its own warm-up prefix.
///
/// The recursion starts at the first available value; the result keeps the
/// input's alignment, so its warm-up is the input's plus (n-1).
pub fn ema_over(series: &[Option<f64>], period: usize) -> Series {
    let Some(start) = series.iter().position(Option::is_some) else {
        return vec![None; series.len()];
    };

    let tail: Vec<f64> = series[start..]
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    let mut values = vec![None; start];
    values.extend(ema(&tail, period));
    values
}
