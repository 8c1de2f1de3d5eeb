//! OHLCV candle representation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::QuantError;

/// One trading-period sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Checks `low <= {open, close} <= high` and that every field is finite.
    pub fn validate(&self) -> Result<(), QuantError> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(QuantError::invalid_input(format!(
                "candle {} has a non-finite field",
                self.date
            )));
        }
        if self.high < self.low {
            return Err(QuantError::invalid_input(format!(
                "candle {} has high {} below low {}",
                self.date, self.high, self.low
            )));
        }
        for (name, value) in [("open", self.open), ("close", self.close)] {
            if value < self.low || value > self.high {
                return Err(QuantError::invalid_input(format!(
                    "candle {} {} {} outside [{}, {}]",
                    self.date, name, value, self.low, self.high
                )));
            }
        }
        if self.volume < 0.0 {
            return Err(QuantError::invalid_input(format!(
                "candle {} has negative volume",
                self.date
            )));
        }
        Ok(())
    }
}

/// Latest traded price for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: f64,
}

/// Validates every candle and that dates are strictly increasing.
pub fn validate_candles(candles: &[Candle]) -> Result<(), QuantError> {
    for candle in candles {
        candle.validate()?;
    }
    for pair in candles.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(QuantError::invalid_input(format!(
                "candle dates not strictly increasing at {}",
                pair[1].date
            )));
        }
    }
    Ok(())
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

pub fn volumes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.volume).collect()
}
