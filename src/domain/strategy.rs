//! Strategy parameters for the scored trend-following strategy.

use serde::{Deserialize, Serialize};

use super::error::QuantError;

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const VOLUME_AVERAGE_PERIOD: usize = 20;
pub const TREND_EMA_PERIOD: usize = 200;
pub const MIN_WARMUP_BARS: usize = 50;

/// RSI above this vetoes any entry regardless of score.
pub const OVERBOUGHT_RSI: f64 = 70.0;
/// Current ATR below this fraction of the previous ATR counts as declining volatility.
pub const VOLATILITY_DECLINE_RATIO: f64 = 0.8;
pub const VOLUME_CONFIRMATION_RATIO: f64 = 1.2;
/// Fraction of current capital put at risk per trade.
pub const RISK_PER_TRADE: f64 = 0.02;

pub const EMA_STACK_WEIGHT: u8 = 3;
pub const VOLUME_WEIGHT: u8 = 2;
pub const RSI_PULLBACK_WEIGHT: u8 = 2;
pub const MACD_MOMENTUM_WEIGHT: u8 = 2;
pub const MAX_SCORE: u8 = EMA_STACK_WEIGHT + VOLUME_WEIGHT + RSI_PULLBACK_WEIGHT + MACD_MOMENTUM_WEIGHT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    pub score_threshold: u8,
    pub atr_multiplier: f64,
    pub take_profit_multiplier: f64,
    pub use_trend_filter: bool,
    pub use_volatility_filter: bool,
    pub initial_capital: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            ema_fast: 20,
            ema_slow: 50,
            rsi_lower: 40.0,
            rsi_upper: 65.0,
            score_threshold: 7,
            atr_multiplier: 2.0,
            take_profit_multiplier: 3.0,
            use_trend_filter: false,
            use_volatility_filter: true,
            initial_capital: 100_000.0,
        }
    }
}

impl StrategyConfig {
    /// Bars of history consumed before the first entry can be evaluated.
    /// Also the minimum history a run accepts.
    pub fn warmup_bars(&self) -> usize {
        if self.use_trend_filter {
            TREND_EMA_PERIOD.max(self.ema_slow)
        } else {
            MIN_WARMUP_BARS.max(self.ema_slow)
        }
    }

    pub fn validate(&self) -> Result<(), QuantError> {
        if self.ema_fast == 0 {
            return Err(QuantError::invalid_config("ema_fast", "must be positive"));
        }
        if self.ema_slow <= self.ema_fast {
            return Err(QuantError::invalid_config(
                "ema_slow",
                "must be greater than ema_fast",
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_lower) || !(0.0..=100.0).contains(&self.rsi_upper) {
            return Err(QuantError::invalid_config(
                "rsi_lower/rsi_upper",
                "must be within 0..=100",
            ));
        }
        if self.rsi_lower > self.rsi_upper {
            return Err(QuantError::invalid_config(
                "rsi_lower",
                "must not exceed rsi_upper",
            ));
        }
        if self.score_threshold > MAX_SCORE {
            return Err(QuantError::invalid_config(
                "score_threshold",
                format!("must not exceed {MAX_SCORE}"),
            ));
        }
        if self.atr_multiplier <= 0.0 || !self.atr_multiplier.is_finite() {
            return Err(QuantError::invalid_config("atr_multiplier", "must be positive"));
        }
        if self.take_profit_multiplier <= 0.0 || !self.take_profit_multiplier.is_finite() {
            return Err(QuantError::invalid_config(
                "take_profit_multiplier",
                "must be positive",
            ));
        }
        if self.initial_capital <= 0.0 || !self.initial_capital.is_finite() {
            return Err(QuantError::invalid_config(
                "initial_capital",
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn max_score_is_nine() {
        assert_eq!(MAX_SCORE, 9);
    }

    #[test]
    fn warmup_without_trend_filter() {
        assert_eq!(StrategyConfig::default().warmup_bars(), 50);
    }

    #[test]
    fn warmup_with_trend_filter() {
        let c = StrategyConfig {
            use_trend_filter: true,
            ..StrategyConfig::default()
        };
        assert_eq!(c.warmup_bars(), 200);
    }

    #[test]
    fn warmup_follows_long_slow_ema() {
        let c = StrategyConfig {
            ema_slow: 80,
            ..StrategyConfig::default()
        };
        assert_eq!(c.warmup_bars(), 80);
    }

    #[test]
    fn fast_not_below_slow_rejected() {
        let c = StrategyConfig {
            ema_fast: 50,
            ema_slow: 50,
            ..StrategyConfig::default()
        };
        assert!(matches!(
            c.validate(),
            Err(QuantError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn inverted_rsi_band_rejected() {
        let c = StrategyConfig {
            rsi_lower: 70.0,
            rsi_upper: 30.0,
            ..StrategyConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn threshold_above_max_rejected() {
        let c = StrategyConfig {
            score_threshold: 10,
            ..StrategyConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn non_positive_multiplier_rejected() {
        let c = StrategyConfig {
            atr_multiplier: 0.0,
            ..StrategyConfig::default()
        };
        assert!(c.validate().is_err());

        let c = StrategyConfig {
            take_profit_multiplier: f64::NAN,
            ..StrategyConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn non_positive_capital_rejected() {
        let c = StrategyConfig {
            initial_capital: 0.0,
            ..StrategyConfig::default()
        };
        assert!(c.validate().is_err());
    }
}
