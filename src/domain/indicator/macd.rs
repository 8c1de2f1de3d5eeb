//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) over the available part of the MACD line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: line (slow - 1), signal and histogram (slow - 1 + signal - 1).

use serde::Serialize;

use super::{ema, ema_over, Series};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdSeries {
    pub line: Series,
    pub signal: Series,
    pub histogram: Series,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let ema_fast = ema(closes, fast);
    let ema_slow = ema(closes, slow);

    let line: Series = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let signal = ema_over(&line, signal_period);

    let histogram = line
        .iter()
        .zip(signal.iter())
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    MacdSeries {
        line,
        signal,
        histogram,
    }
}

pub fn macd_default(closes: &[f64]) -> MacdSeries {
    macd(closes, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
