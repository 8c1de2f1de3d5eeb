//! Builds validated domain configuration from a [`ConfigPort`].
//!
//! Missing keys fall back to defaults; present but malformed keys are
//! rejected rather than silently replaced.

use std::str::FromStr;

use crate::domain::error::QuantError;
use crate::domain::risk::RiskParams;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;

/// One `[SYMBOL]` section of a portfolio file.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioHolding {
    pub symbol: String,
    pub quantity: f64,
    pub avg_price: f64,
}

pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, QuantError> {
    let defaults = StrategyConfig::default();
    let strategy = StrategyConfig {
        ema_fast: parse_key(config, "strategy", "ema_fast", defaults.ema_fast)?,
        ema_slow: parse_key(config, "strategy", "ema_slow", defaults.ema_slow)?,
        rsi_lower: parse_key(config, "strategy", "rsi_lower", defaults.rsi_lower)?,
        rsi_upper: parse_key(config, "strategy", "rsi_upper", defaults.rsi_upper)?,
        score_threshold: parse_key(
            config,
            "strategy",
            "score_threshold",
            defaults.score_threshold,
        )?,
        atr_multiplier: parse_key(config, "strategy", "atr_multiplier", defaults.atr_multiplier)?,
        take_profit_multiplier: parse_key(
            config,
            "strategy",
            "take_profit_multiplier",
            defaults.take_profit_multiplier,
        )?,
        use_trend_filter: config.get_bool("strategy", "use_trend_filter", defaults.use_trend_filter),
        use_volatility_filter: config.get_bool(
            "strategy",
            "use_volatility_filter",
            defaults.use_volatility_filter,
        ),
        initial_capital: parse_key(
            config,
            "strategy",
            "initial_capital",
            defaults.initial_capital,
        )?,
    };
    strategy.validate()?;
    Ok(strategy)
}

pub fn build_risk_params(config: &dyn ConfigPort) -> Result<RiskParams, QuantError> {
    let risk_free_rate: f64 = parse_key(config, "risk", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(QuantError::invalid_config(
            "risk_free_rate",
            "must be between 0 and 1",
        ));
    }
    Ok(RiskParams { risk_free_rate })
}

/// Reads `[portfolio] symbols = A,B` and a `quantity`/`avg_price` section per symbol.
pub fn build_portfolio_holdings(
    config: &dyn ConfigPort,
) -> Result<Vec<PortfolioHolding>, QuantError> {
    let symbols = config
        .get_string("portfolio", "symbols")
        .map(|s| split_symbols(&s))
        .unwrap_or_default();
    if symbols.is_empty() {
        return Err(QuantError::invalid_config(
            "symbols",
            "portfolio must list at least one symbol",
        ));
    }

    symbols
        .into_iter()
        .map(|symbol| {
            let quantity: f64 = require_key(config, &symbol, "quantity")?;
            let avg_price: f64 = require_key(config, &symbol, "avg_price")?;
            if !quantity.is_finite() || quantity < 0.0 {
                return Err(QuantError::invalid_config(
                    &format!("{symbol}.quantity"),
                    "must be non-negative",
                ));
            }
            if !avg_price.is_finite() || avg_price < 0.0 {
                return Err(QuantError::invalid_config(
                    &format!("{symbol}.avg_price"),
                    "must be non-negative",
                ));
            }
            Ok(PortfolioHolding {
                symbol,
                quantity,
                avg_price,
            })
        })
        .collect()
}

/// Splits a comma-separated symbol list, dropping blanks.
pub fn split_symbols(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_key<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, QuantError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => parse_value(key, &raw),
    }
}

fn require_key<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<T, QuantError> {
    match config.get_string(section, key) {
        None => Err(QuantError::invalid_config(
            &format!("{section}.{key}"),
            "missing",
        )),
        Some(raw) => parse_value(&format!("{section}.{key}"), &raw),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, QuantError> {
    raw.trim()
        .parse()
        .map_err(|_| QuantError::invalid_config(key, format!("cannot parse {raw:?}")))
}
