//! Technical indicator implementations.
//!
//! Every indicator returns a [`Series`]: one `Option<f64>` per input sample,
//! index-aligned with the input. `None` marks warm-up positions and values
//! contaminated by non-finite input; callers must never treat them as zero.

pub mod atr;
pub mod divergence;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use atr::{atr, atr_hlc};
pub use divergence::{rsi_divergence, volume_divergence, Divergence};
pub use ema::{ema, ema_over};
pub use macd::{macd, MacdSeries};
pub use rsi::rsi;
pub use sma::sma;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::QuantError;

pub type Series = Vec<Option<f64>>;

pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_ATR_PERIOD: usize = 14;

/// Maps non-finite arithmetic results to the "unavailable" marker.
pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Value at `index`, or `None` when out of range or unavailable.
pub fn value_at(series: &[Option<f64>], index: usize) -> Option<f64> {
    series.get(index).copied().flatten()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        MacdParams {
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        }
    }
}

/// Which indicators to compute; `None` skips that indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorRequest {
    pub sma: Option<usize>,
    pub ema: Option<usize>,
    pub rsi: Option<usize>,
    pub atr: Option<usize>,
    pub macd: Option<MacdParams>,
}

impl IndicatorRequest {
    pub fn standard() -> Self {
        IndicatorRequest {
            sma: Some(20),
            ema: Some(20),
            rsi: Some(DEFAULT_RSI_PERIOD),
            atr: Some(DEFAULT_ATR_PERIOD),
            macd: Some(MacdParams::default()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub sma: Option<Series>,
    pub ema: Option<Series>,
    pub rsi: Option<Series>,
    pub atr: Option<Series>,
    pub macd: Option<MacdSeries>,
}

impl IndicatorSet {
    /// Flattens the set into labelled series, MACD contributing three entries.
    pub fn labelled(&self, request: &IndicatorRequest) -> BTreeMap<String, Series> {
        let mut out = BTreeMap::new();
        if let (Some(period), Some(series)) = (request.sma, &self.sma) {
            out.insert(IndicatorType::Sma(period).to_string(), series.clone());
        }
        if let (Some(period), Some(series)) = (request.ema, &self.ema) {
            out.insert(IndicatorType::Ema(period).to_string(), series.clone());
        }
        if let (Some(period), Some(series)) = (request.rsi, &self.rsi) {
            out.insert(IndicatorType::Rsi(period).to_string(), series.clone());
        }
        if let (Some(period), Some(series)) = (request.atr, &self.atr) {
            out.insert(IndicatorType::Atr(period).to_string(), series.clone());
        }
        if let (Some(p), Some(m)) = (request.macd, &self.macd) {
            let label = IndicatorType::Macd {
                fast: p.fast,
                slow: p.slow,
                signal: p.signal,
            };
            out.insert(format!("{label}.line"), m.line.clone());
            out.insert(format!("{label}.signal"), m.signal.clone());
            out.insert(format!("{label}.histogram"), m.histogram.clone());
        }
        out
    }
}

/// Computes the requested indicators over parallel price arrays.
///
/// ATR is produced only when both `highs` and `lows` are supplied.
pub fn compute_indicators(
    closes: &[f64],
    highs: Option<&[f64]>,
    lows: Option<&[f64]>,
    request: &IndicatorRequest,
) -> Result<IndicatorSet, QuantError> {
    for (name, series) in [("highs", highs), ("lows", lows)] {
        match series {
            Some(values) if values.len() != closes.len() => {
                return Err(QuantError::invalid_input(format!(
                    "{} has {} values but closes has {}",
                    name,
                    values.len(),
                    closes.len()
                )));
            }
            _ => {}
        }
    }

    let atr = match (request.atr, highs, lows) {
        (Some(period), Some(h), Some(l)) => Some(atr_hlc(h, l, closes, period)),
        _ => None,
    };

    Ok(IndicatorSet {
        sma: request.sma.map(|p| sma(closes, p)),
        ema: request.ema.map(|p| ema(closes, p)),
        rsi: request.rsi.map(|p| rsi(closes, p)),
        atr,
        macd: request.macd.map(|p| macd(closes, p.fast, p.slow, p.signal)),
    })
}
