//! CSV file market data adapter.
//!
//! One file per symbol, `<SYMBOL>.csv`, with a `date,open,high,low,close,volume`
//! header and ISO dates.

use crate::domain::error::QuantError;
use crate::domain::ohlcv::{Candle, Quote};
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_all(&self, symbol: &str) -> Result<Vec<Candle>, QuantError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| QuantError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut candles = Vec::new();
        for result in rdr.deserialize::<Candle>() {
            let candle = result.map_err(|e| QuantError::DataSource {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            candles.push(candle);
        }

        candles.sort_by_key(|c| c.date);
        Ok(candles)
    }

    /// Symbols with a CSV file under the base path, sorted.
    pub fn list_symbols(&self) -> Result<Vec<String>, QuantError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| QuantError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| QuantError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuantError> {
        let candles = self.read_all(symbol)?;
        let last = candles.last().ok_or_else(|| QuantError::DataSource {
            reason: format!("no rows for {}", symbol),
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
        let mut candles = self.read_all(symbol)?;
        candles.retain(|c| c.date >= start_date && c.date <= end_date);
        Ok(candles)
    }
}
