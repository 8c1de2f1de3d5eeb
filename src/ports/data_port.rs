//! Market data access port.
//!
//! The collaborator behind this trait owns caching, rate limiting and retry;
//! the domain only sees a quote or a candle sequence, or an error.

use crate::domain::error::QuantError;
use crate::domain::ohlcv::{Candle, Quote};
use chrono::NaiveDate;

pub trait MarketDataPort {
    fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuantError>;

    /// Daily candles with `start_date <= date <= end_date`, oldest first.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Candle>, QuantError>;
}
