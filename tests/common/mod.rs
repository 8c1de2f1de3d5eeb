#![allow(dead_code)]

use chrono::NaiveDate;
use quantcore::domain::error::QuantError;
pub use quantcore::domain::ohlcv::{Candle, Quote};
use quantcore::ports::data_port::MarketDataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuantError> {
        let candles = self.fetch_ohlcv(symbol, NaiveDate::MIN, NaiveDate::MAX)?;
        let last = candles.last().ok_or_else(|| QuantError::DataSource {
            reason: format!("no data for {symbol}"),
        })?;
        Ok(Quote {
            symbol: symbol.to_string(),
            date: last.date,
            price: last.close,
        })
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Candle>, QuantError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(QuantError::DataSource {
                reason: reason.clone(),
            });
        }
        let candles = self.data.get(symbol).cloned().unwrap_or_default();
        Ok(candles
            .into_iter()
            .filter(|c| c.date >= start_date && c.date <= end_date)
            .collect())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Candles at daily spacing from 2023-01-02 with `low = close - spread` and
/// `high = close + spread`.
pub fn candles_from_closes(closes: &[f64], spread: f64, volume: f64) -> Vec<Candle> {
    let start = date(2023, 1, 2);
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

pub fn flat_candles(count: usize, price: f64) -> Vec<Candle> {
    candles_from_closes(&vec![price; count], 0.0, 0.0)
}

/// Linear ramp from `from` to `to` over `count` bars.
pub fn rising_candles(count: usize, from: f64, to: f64) -> Vec<Candle> {
    let step = (to - from) / (count - 1) as f64;
    let closes: Vec<f64> = (0..count).map(|i| from + step * i as f64).collect();
    candles_from_closes(&closes, step, 1_000.0)
}

/// Prices compounding at a constant `rate` per bar, so every return is equal.
pub fn drifting_candles(count: usize, start: f64, rate: f64) -> Vec<Candle> {
    let closes: Vec<f64> = (0..count)
        .map(|i| start * (1.0 + rate).powi(i as i32))
        .collect();
    candles_from_closes(&closes, 0.0, 1_000.0)
}

/// Uptrend with a sine overlay, giving both winning and losing bars.
pub fn wavy_candles(count: usize, amplitude: f64) -> Vec<Candle> {
    let closes: Vec<f64> = (0..count)
        .map(|i| 100.0 + 0.15 * i as f64 + amplitude * (i as f64 / 6.0).sin())
        .collect();
    candles_from_closes(&closes, 1.0, 1_000.0)
}
