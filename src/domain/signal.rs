//! Entry gating and scoring shared by the backtest and the live scan.
//!
//! Gates are evaluated in order and the first failing one becomes the veto:
//! missing data, long-term trend, overbought RSI, declining volatility. The
//! additive score is always computed so callers can present it even when
//! the bar is vetoed.

use serde::Serialize;

use super::indicator::{self, macd, value_at, Series};
use super::ohlcv::{closes, volumes, Candle};
use super::strategy::{
    StrategyConfig, ATR_PERIOD, EMA_STACK_WEIGHT, MACD_MOMENTUM_WEIGHT, OVERBOUGHT_RSI,
    RSI_PERIOD, RSI_PULLBACK_WEIGHT, TREND_EMA_PERIOD, VOLATILITY_DECLINE_RATIO,
    VOLUME_AVERAGE_PERIOD, VOLUME_CONFIRMATION_RATIO, VOLUME_WEIGHT,
};

/// Every series the strategy reads, index-aligned with the candles.
#[derive(Debug, Clone)]
pub struct StrategyIndicators {
    pub ema_fast: Series,
    pub ema_slow: Series,
    /// Present only when the trend filter is enabled.
    pub ema_trend: Option<Series>,
    pub rsi: Series,
    pub atr: Series,
    pub macd_histogram: Series,
    pub volume_average: Series,
}

impl StrategyIndicators {
    pub fn compute(candles: &[Candle], config: &StrategyConfig) -> Self {
        let closes = closes(candles);
        let volumes = volumes(candles);

        StrategyIndicators {
            ema_fast: indicator::ema(&closes, config.ema_fast),
            ema_slow: indicator::ema(&closes, config.ema_slow),
            ema_trend: config
                .use_trend_filter
                .then(|| indicator::ema(&closes, TREND_EMA_PERIOD)),
            rsi: indicator::rsi(&closes, RSI_PERIOD),
            atr: indicator::atr(candles, ATR_PERIOD),
            macd_histogram: macd::macd_default(&closes).histogram,
            volume_average: indicator::sma(&volumes, VOLUME_AVERAGE_PERIOD),
        }
    }

    /// `Some(true)` when the fast EMA has crossed below the slow EMA.
    pub fn trend_reversed(&self, index: usize) -> Option<bool> {
        let fast = value_at(&self.ema_fast, index)?;
        let slow = value_at(&self.ema_slow, index)?;
        Some(fast < slow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryVeto {
    MissingData,
    BelowTrend,
    Overbought,
    DecliningVolatility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub ema_stack: bool,
    pub volume_confirmed: bool,
    pub rsi_pullback: bool,
    pub macd_momentum: bool,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        let mut score = 0;
        if self.ema_stack {
            score += EMA_STACK_WEIGHT;
        }
        if self.volume_confirmed {
            score += VOLUME_WEIGHT;
        }
        if self.rsi_pullback {
            score += RSI_PULLBACK_WEIGHT;
        }
        if self.macd_momentum {
            score += MACD_MOMENTUM_WEIGHT;
        }
        score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntrySignal {
    pub veto: Option<EntryVeto>,
    pub breakdown: ScoreBreakdown,
    pub score: u8,
}

impl EntrySignal {
    pub fn should_enter(&self, threshold: u8) -> bool {
        self.veto.is_none() && self.score >= threshold
    }
}

/// Evaluates the entry rules at bar `index`.
pub fn evaluate_entry(
    candles: &[Candle],
    indicators: &StrategyIndicators,
    index: usize,
    config: &StrategyConfig,
) -> EntrySignal {
    let Some(candle) = candles.get(index) else {
        return missing_data();
    };

    let (Some(ema_fast), Some(ema_slow), Some(rsi), Some(atr)) = (
        value_at(&indicators.ema_fast, index),
        value_at(&indicators.ema_slow, index),
        value_at(&indicators.rsi, index),
        value_at(&indicators.atr, index),
    ) else {
        return missing_data();
    };

    let close = candle.close;
    let breakdown = ScoreBreakdown {
        ema_stack: close > ema_fast && ema_fast > ema_slow,
        volume_confirmed: index
            .checked_sub(1)
            .and_then(|prev| value_at(&indicators.volume_average, prev))
            .is_some_and(|avg| candle.volume > VOLUME_CONFIRMATION_RATIO * avg),
        rsi_pullback: rsi >= config.rsi_lower && rsi <= config.rsi_upper,
        macd_momentum: macd_rising(&indicators.macd_histogram, index),
    };

    let veto = first_veto(indicators, index, close, rsi, atr, config);

    EntrySignal {
        veto,
        breakdown,
        score: breakdown.total(),
    }
}

fn missing_data() -> EntrySignal {
    EntrySignal {
        veto: Some(EntryVeto::MissingData),
        breakdown: ScoreBreakdown::default(),
        score: 0,
    }
}

fn first_veto(
    indicators: &StrategyIndicators,
    index: usize,
    close: f64,
    rsi: f64,
    atr: f64,
    config: &StrategyConfig,
) -> Option<EntryVeto> {
    if config.use_trend_filter {
        let trend = indicators
            .ema_trend
            .as_ref()
            .and_then(|series| value_at(series, index));
        match trend {
            None => return Some(EntryVeto::MissingData),
            Some(ema200) if close < ema200 => return Some(EntryVeto::BelowTrend),
            Some(_) => {}
        }
    }

    if rsi > OVERBOUGHT_RSI {
        return Some(EntryVeto::Overbought);
    }

    if config.use_volatility_filter {
        let previous = index
            .checked_sub(1)
            .and_then(|prev| value_at(&indicators.atr, prev));
        match previous {
            None => return Some(EntryVeto::MissingData),
            Some(prev_atr) if atr < VOLATILITY_DECLINE_RATIO * prev_atr => {
                return Some(EntryVeto::DecliningVolatility);
            }
            Some(_) => {}
        }
    }

    None
}

fn macd_rising(histogram: &[Option<f64>], index: usize) -> bool {
    let Some(prev_index) = index.checked_sub(1) else {
        return false;
    };
    match (value_at(histogram, index), value_at(histogram, prev_index)) {
        (Some(current), Some(previous)) => current > 0.0 && current > previous,
        _ => false,
    }
}
