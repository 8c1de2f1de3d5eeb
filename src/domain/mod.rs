//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod stats;
pub mod strategy;
pub mod position;
pub mod signal;
pub mod backtest;
pub mod metrics;
pub mod scan;
pub mod risk;
pub mod config_validation;
pub mod error;
