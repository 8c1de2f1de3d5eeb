//! Simple Moving Average.
//!
//! SMA(n)[i] = sum(X[i-n+1..=i]) / n
//! Warmup: first (n-1) samples are unavailable.

use super::{finite, Series};

pub fn sma(data: &[f64], period: usize) -> Series {
    let mut values = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return values;
    }

    for i in (period - 1)..data.len() {
        let window = &data[i + 1 - period..=i];
        let sum: f64 = window.iter().sum();
        values[i] = finite(sum / period as f64);
    }

    values
}
