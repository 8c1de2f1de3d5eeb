//! Portfolio and per-asset risk analytics.
//!
//! Everything here is a pure function of the position set, an optional
//! benchmark return series and [`RiskParams`]. Degenerate inputs resolve to
//! defined values (ratios to 0, beta to 1.0) rather than NaN or infinity.

pub mod correlation;
pub mod var;

use serde::Serialize;

use self::correlation::common_tail;
pub use self::correlation::CorrelationMatrix;
pub use self::var::{historical_cvar, historical_var};
use super::error::QuantError;
use super::ohlcv::{closes, Candle};
use super::stats::{
    covariance, cumulative_path, downside_deviation, drawdown, mean, safe_ratio, simple_returns,
    std_dev, variance, MIN_STD_DEV, TRADING_DAYS_PER_YEAR,
};

pub const VAR_95: f64 = 0.95;
pub const VAR_99: f64 = 0.99;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioPosition {
    pub symbol: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub current_price: f64,
    /// Daily simple returns derived from `historical_prices`.
    pub returns: Vec<f64>,
    pub historical_prices: Vec<f64>,
}

impl PortfolioPosition {
    /// Builds a position from a candle history; the last close is the
    /// current price.
    pub fn from_candles(
        symbol: &str,
        quantity: f64,
        avg_price: f64,
        candles: &[Candle],
    ) -> Result<Self, QuantError> {
        let Some(last) = candles.last() else {
            return Err(QuantError::InsufficientData {
                symbol: symbol.to_string(),
                bars: 0,
                minimum: 1,
            });
        };
        let historical_prices = closes(candles);

        Ok(PortfolioPosition {
            symbol: symbol.to_string(),
            quantity,
            avg_price,
            current_price: last.close,
            returns: simple_returns(&historical_prices),
            historical_prices,
        })
    }

    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.avg_price
    }

    fn validate(&self) -> Result<(), QuantError> {
        let scalars = [
            ("quantity", self.quantity),
            ("avg_price", self.avg_price),
            ("current_price", self.current_price),
        ];
        for (name, value) in scalars {
            if !value.is_finite() || value < 0.0 {
                return Err(QuantError::invalid_input(format!(
                    "{}: {} must be finite and non-negative, got {}",
                    self.symbol, name, value
                )));
            }
        }
        if self.historical_prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(QuantError::invalid_input(format!(
                "{}: historical prices must be finite and non-negative",
                self.symbol
            )));
        }
        if self.returns.iter().any(|r| !r.is_finite()) {
            return Err(QuantError::invalid_input(format!(
                "{}: returns must be finite",
                self.symbol
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RiskParams {
    /// Annual rate, as a fraction.
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRiskMetrics {
    pub total_value: f64,
    pub total_cost: f64,
    pub unrealized_pnl: f64,
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    pub cvar_99: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub downside_deviation: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    pub current_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub beta: f64,
    pub alpha: f64,
    pub herfindahl_index: f64,
    pub diversification_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetRiskMetrics {
    pub symbol: String,
    pub weight: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_pct: f64,
    pub annualized_volatility: f64,
    pub beta: f64,
    pub marginal_contribution: f64,
    pub component_var: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAnalytics {
    pub portfolio: PortfolioRiskMetrics,
    pub assets: Vec<AssetRiskMetrics>,
    pub correlations: CorrelationMatrix,
}

pub fn compute_risk_analytics(
    positions: &[PortfolioPosition],
    benchmark_returns: Option<&[f64]>,
    params: &RiskParams,
) -> Result<RiskAnalytics, QuantError> {
    if positions.is_empty() {
        return Err(QuantError::NoPositions);
    }
    for position in positions {
        position.validate()?;
    }
    if let Some(benchmark) = benchmark_returns {
        if benchmark.iter().any(|r| !r.is_finite()) {
            return Err(QuantError::invalid_input("benchmark returns must be finite"));
        }
    }
    if !params.risk_free_rate.is_finite() {
        return Err(QuantError::invalid_input("risk-free rate must be finite"));
    }

    let rf = params.risk_free_rate;
    let total_value: f64 = positions.iter().map(PortfolioPosition::market_value).sum();
    let total_cost: f64 = positions.iter().map(PortfolioPosition::cost_basis).sum();
    let weights: Vec<f64> = positions
        .iter()
        .map(|p| safe_ratio(p.market_value(), total_value))
        .collect();

    let returns = portfolio_returns(positions, &weights);
    let annualized_return = annualize(&returns);
    let annualized_volatility = annualized_vol(&returns);
    let downside = downside_deviation(&returns) * TRADING_DAYS_PER_YEAR.sqrt();
    let dd = drawdown(&cumulative_path(&returns));
    let var_95 = historical_var(&returns, VAR_95) * total_value;

    let (beta, alpha) = match benchmark_returns {
        Some(benchmark) => {
            let beta = beta(&returns, benchmark);
            let (_, bench) = common_tail(&returns, benchmark);
            let alpha = annualized_return - (rf + beta * (annualize(bench) - rf));
            (beta, alpha)
        }
        None => (1.0, 0.0),
    };

    let assets: Vec<AssetRiskMetrics> = positions
        .iter()
        .zip(&weights)
        .map(|(position, &weight)| asset_metrics(position, weight, benchmark_returns, var_95, rf))
        .collect();

    let weighted_vol: f64 = assets
        .iter()
        .map(|a| a.weight * a.annualized_volatility)
        .sum();
    let diversification_ratio = if weighted_vol < MIN_STD_DEV {
        1.0
    } else {
        safe_ratio(annualized_volatility, weighted_vol)
    };

    let portfolio = PortfolioRiskMetrics {
        total_value,
        total_cost,
        unrealized_pnl: total_value - total_cost,
        var_95,
        var_99: historical_var(&returns, VAR_99) * total_value,
        cvar_95: historical_cvar(&returns, VAR_95) * total_value,
        cvar_99: historical_cvar(&returns, VAR_99) * total_value,
        annualized_return,
        annualized_volatility,
        downside_deviation: downside,
        sharpe_ratio: risk_ratio(annualized_return - rf, annualized_volatility),
        sortino_ratio: risk_ratio(annualized_return - rf, downside),
        calmar_ratio: risk_ratio(annualized_return, dd.max_drawdown),
        max_drawdown: dd.max_drawdown,
        current_drawdown: dd.current_drawdown,
        max_drawdown_duration: dd.max_drawdown_duration,
        beta,
        alpha,
        herfindahl_index: weights.iter().map(|w| w * w).sum(),
        diversification_ratio,
    };

    let symbols = positions.iter().map(|p| p.symbol.clone()).collect();
    let series: Vec<&[f64]> = positions.iter().map(|p| p.returns.as_slice()).collect();
    let correlations = CorrelationMatrix::compute(symbols, &series);

    log::debug!(
        "risk analytics over {} positions, {} aligned returns",
        positions.len(),
        returns.len()
    );

    Ok(RiskAnalytics {
        portfolio,
        assets,
        correlations,
    })
}

/// Weighted sum of each position's returns over their most recent common tail.
fn portfolio_returns(positions: &[PortfolioPosition], weights: &[f64]) -> Vec<f64> {
    let len = positions.iter().map(|p| p.returns.len()).min().unwrap_or(0);
    (0..len)
        .map(|t| {
            positions
                .iter()
                .zip(weights)
                .map(|(p, w)| w * p.returns[p.returns.len() - len + t])
                .sum()
        })
        .collect()
}

fn asset_metrics(
    position: &PortfolioPosition,
    weight: f64,
    benchmark_returns: Option<&[f64]>,
    portfolio_var_95: f64,
    rf: f64,
) -> AssetRiskMetrics {
    let market_value = position.market_value();
    let cost = position.cost_basis();
    let unrealized_pnl = market_value - cost;
    let vol = annualized_vol(&position.returns);
    let beta = benchmark_returns.map_or(1.0, |b| beta(&position.returns, b));
    let marginal_contribution = weight * beta;

    AssetRiskMetrics {
        symbol: position.symbol.clone(),
        weight,
        market_value,
        unrealized_pnl,
        unrealized_pnl_pct: safe_ratio(unrealized_pnl, cost) * 100.0,
        annualized_volatility: vol,
        beta,
        marginal_contribution,
        component_var: portfolio_var_95 * marginal_contribution,
        sharpe_ratio: risk_ratio(annualize(&position.returns) - rf, vol),
        max_drawdown: drawdown(&position.historical_prices).max_drawdown,
    }
}

fn annualize(returns: &[f64]) -> f64 {
    mean(returns) * TRADING_DAYS_PER_YEAR
}

fn annualized_vol(returns: &[f64]) -> f64 {
    let sd = std_dev(returns);
    if sd < MIN_STD_DEV {
        0.0
    } else {
        sd * TRADING_DAYS_PER_YEAR.sqrt()
    }
}

/// `cov(r, benchmark) / var(benchmark)` over the common tail; 1.0 when the
/// benchmark has no variance.
fn beta(returns: &[f64], benchmark: &[f64]) -> f64 {
    let (r, b) = common_tail(returns, benchmark);
    if r.len() < 2 {
        return 1.0;
    }
    let var_b = variance(b);
    if var_b.sqrt() < MIN_STD_DEV {
        return 1.0;
    }
    safe_ratio(covariance(r, b), var_b)
}

fn risk_ratio(excess: f64, denominator: f64) -> f64 {
    if denominator.abs() < MIN_STD_DEV {
        0.0
    } else {
        safe_ratio(excess, denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn position(symbol: &str, quantity: f64, avg_price: f64, prices: &[f64]) -> PortfolioPosition {
        PortfolioPosition {
            symbol: symbol.to_string(),
            quantity,
            avg_price,
            current_price: *prices.last().unwrap(),
            returns: simple_returns(prices),
            historical_prices: prices.to_vec(),
        }
    }

    fn wavy_prices(n: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + amplitude * (i as f64 * 0.7).sin() + 0.1 * i as f64)
            .collect()
    }

    #[test]
    fn empty_portfolio_rejected() {
        let err = compute_risk_analytics(&[], None, &RiskParams::default()).unwrap_err();
        assert!(matches!(err, QuantError::NoPositions));
    }

    #[test]
    fn negative_quantity_rejected() {
        let p = position("A", -5.0, 100.0, &[100.0, 101.0]);
        let err = compute_risk_analytics(&[p], None, &RiskParams::default()).unwrap_err();
        assert!(matches!(err, QuantError::InvalidInput { .. }));
    }

    #[test]
    fn non_finite_price_rejected() {
        let mut p = position("A", 5.0, 100.0, &[100.0, 101.0]);
        p.current_price = f64::NAN;
        assert!(compute_risk_analytics(&[p], None, &RiskParams::default()).is_err());
    }

    #[test]
    fn zero_variance_resolves_to_zero() {
        let p = position("FLAT", 10.0, 100.0, &[100.0; 30]);
        let analytics = compute_risk_analytics(&[p], None, &RiskParams::default()).unwrap();
        let m = &analytics.portfolio;

        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
        assert_eq!(m.calmar_ratio, 0.0);
        assert_eq!(m.var_95, 0.0);
        assert_eq!(m.cvar_99, 0.0);
        assert_eq!(m.beta, 1.0);
        assert_eq!(m.alpha, 0.0);
        assert_eq!(m.diversification_ratio, 1.0);
        assert_relative_eq!(m.herfindahl_index, 1.0);
        assert_relative_eq!(m.total_value, 1000.0);
        assert_eq!(analytics.correlations.matrix, vec![vec![1.0]]);
    }

    #[test]
    fn single_price_point_is_defined() {
        let p = position("ONE", 3.0, 50.0, &[55.0]);
        let analytics = compute_risk_analytics(&[p], None, &RiskParams::default()).unwrap();
        let m = &analytics.portfolio;

        assert_eq!(m.var_95, 0.0);
        assert_eq!(m.annualized_volatility, 0.0);
        assert_relative_eq!(m.unrealized_pnl, 15.0);
        assert_relative_eq!(analytics.assets[0].unrealized_pnl_pct, 10.0);
    }

    #[test]
    fn weights_and_concentration() {
        let a = position("A", 10.0, 90.0, &[100.0, 101.0, 99.0, 102.0]);
        let b = position("B", 30.0, 100.0, &[100.0, 100.5, 100.2, 100.0]);
        let analytics = compute_risk_analytics(&[a, b], None, &RiskParams::default()).unwrap();

        // market values 1020 and 3000
        let total = 4020.0;
        assert_relative_eq!(analytics.assets[0].weight, 1020.0 / total);
        assert_relative_eq!(analytics.assets[1].weight, 3000.0 / total);
        let hhi = (1020.0_f64 / total).powi(2) + (3000.0_f64 / total).powi(2);
        assert_relative_eq!(analytics.portfolio.herfindahl_index, hhi, epsilon = 1e-12);
        assert_relative_eq!(analytics.assets[0].unrealized_pnl, 120.0);
    }

    #[test]
    fn identical_assets_fully_correlated() {
        let prices = wavy_prices(60, 2.0);
        let a = position("A", 10.0, 100.0, &prices);
        let b = position("B", 20.0, 100.0, &prices);
        let analytics = compute_risk_analytics(&[a, b], None, &RiskParams::default()).unwrap();

        assert_relative_eq!(analytics.correlations.matrix[0][1], 1.0, epsilon = 1e-9);
        // no diversification between identical assets
        assert_relative_eq!(analytics.portfolio.diversification_ratio, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn benchmark_equal_to_portfolio_has_unit_beta_and_zero_alpha() {
        let prices = wavy_prices(60, 2.0);
        let p = position("A", 10.0, 100.0, &prices);
        let benchmark = p.returns.clone();
        let params = RiskParams {
            risk_free_rate: 0.03,
        };
        let analytics = compute_risk_analytics(&[p], Some(&benchmark), &params).unwrap();

        assert_relative_eq!(analytics.portfolio.beta, 1.0, epsilon = 1e-9);
        assert_relative_eq!(analytics.portfolio.alpha, 0.0, epsilon = 1e-9);
        assert_relative_eq!(analytics.assets[0].marginal_contribution, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn flat_benchmark_defaults_beta() {
        let p = position("A", 10.0, 100.0, &wavy_prices(30, 1.0));
        let benchmark = vec![0.0; 29];
        let analytics = compute_risk_analytics(&[p], Some(&benchmark), &RiskParams::default())
            .unwrap();
        assert_eq!(analytics.portfolio.beta, 1.0);
    }

    #[test]
    fn component_var_sums_to_portfolio_var_without_benchmark() {
        let a = position("A", 10.0, 100.0, &wavy_prices(60, 2.0));
        let b = position("B", 5.0, 100.0, &wavy_prices(60, 4.0));
        let analytics = compute_risk_analytics(&[a, b], None, &RiskParams::default()).unwrap();

        let sum: f64 = analytics.assets.iter().map(|a| a.component_var).sum();
        assert_relative_eq!(sum, analytics.portfolio.var_95, epsilon = 1e-9);
        assert!(analytics.portfolio.var_95 > 0.0);
        assert!(analytics.portfolio.cvar_95 >= analytics.portfolio.var_95);
    }

    #[test]
    fn drawdown_ordering_holds() {
        let p = position("A", 10.0, 100.0, &[100.0, 110.0, 90.0, 95.0, 120.0, 100.0]);
        let analytics = compute_risk_analytics(&[p], None, &RiskParams::default()).unwrap();
        let m = &analytics.portfolio;

        assert!(m.max_drawdown >= m.current_drawdown);
        assert!(m.current_drawdown >= 0.0);
        // 110 → 90
        assert_relative_eq!(m.max_drawdown, 20.0 / 110.0, epsilon = 1e-12);
        assert_relative_eq!(analytics.assets[0].max_drawdown, 20.0 / 110.0, epsilon = 1e-12);
    }

    #[test]
    fn from_candles_derives_returns() {
        use chrono::NaiveDate;
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let candles: Vec<Candle> = [100.0, 110.0, 99.0]
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0.0,
            })
            .collect();

        let p = PortfolioPosition::from_candles("X", 2.0, 95.0, &candles).unwrap();
        assert_eq!(p.current_price, 99.0);
        assert_relative_eq!(p.returns[0], 0.1);
        assert_relative_eq!(p.returns[1], -0.1, epsilon = 1e-12);

        let err = PortfolioPosition::from_candles("X", 2.0, 95.0, &[]).unwrap_err();
        assert!(matches!(err, QuantError::InsufficientData { .. }));
    }
}
