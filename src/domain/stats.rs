//! Return and drawdown primitives shared by the backtest metrics and the
//! risk module. Population statistics throughout.

use serde::Serialize;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Standard deviations below this are treated as zero variance.
pub const MIN_STD_DEV: f64 = 1e-12;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Root mean square of the negative returns; 0 when there are none.
pub fn downside_deviation(returns: &[f64]) -> f64 {
    let negatives: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if negatives.is_empty() {
        return 0.0;
    }
    (negatives.iter().map(|r| r * r).sum::<f64>() / negatives.len() as f64).sqrt()
}

/// Population covariance over equal-length slices.
pub fn covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (ma, mb) = (mean(a), mean(b));
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / n as f64
}

/// Pearson correlation; 0 with fewer than two samples or zero variance.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (sa, sb) = (std_dev(a), std_dev(b));
    if sa < MIN_STD_DEV || sb < MIN_STD_DEV {
        return 0.0;
    }
    safe_ratio(covariance(a, b), sa * sb).clamp(-1.0, 1.0)
}

/// Simple returns: (P[i] - P[i-1]) / P[i-1]. A non-positive prior price yields 0.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

/// Compounds a return series into a value path starting at 1.0.
pub fn cumulative_path(returns: &[f64]) -> Vec<f64> {
    let mut path = Vec::with_capacity(returns.len() + 1);
    let mut value = 1.0;
    path.push(value);
    for r in returns {
        value *= 1.0 + r;
        path.push(value);
    }
    path
}

/// Annualised (mean / stdev) of a daily return series; 0 when stdev is 0.
pub fn annualized_sharpe(daily_returns: &[f64]) -> f64 {
    if daily_returns.len() < 2 {
        return 0.0;
    }
    let sd = std_dev(daily_returns);
    if sd < MIN_STD_DEV {
        return 0.0;
    }
    safe_ratio(
        mean(daily_returns) * TRADING_DAYS_PER_YEAR,
        sd * TRADING_DAYS_PER_YEAR.sqrt(),
    )
}

/// `numerator / denominator`, or 0 when the result would not be finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() { ratio } else { 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DrawdownStats {
    pub max_drawdown: f64,
    pub current_drawdown: f64,
    /// Longest run of consecutive bars spent below a prior peak.
    pub max_drawdown_duration: usize,
}

/// Drawdown over a price or value path, as fractions of the running peak.
pub fn drawdown(path: &[f64]) -> DrawdownStats {
    let Some(&first) = path.first() else {
        return DrawdownStats::default();
    };

    let mut peak = first;
    let mut stats = DrawdownStats::default();
    let mut run = 0usize;

    for &value in path {
        if !value.is_finite() {
            continue;
        }
        if value >= peak {
            peak = value;
            run = 0;
            stats.current_drawdown = 0.0;
            continue;
        }
        let dd = if peak > 0.0 { (peak - value) / peak } else { 0.0 };
        stats.current_drawdown = dd;
        stats.max_drawdown = stats.max_drawdown.max(dd);
        run += 1;
        stats.max_drawdown_duration = stats.max_drawdown_duration.max(run);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0);
        assert_relative_eq!(variance(&values), 4.0);
        assert_relative_eq!(std_dev(&values), 2.0);
    }

    #[test]
    fn empty_inputs_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(covariance(&[], &[]), 0.0);
        assert_eq!(correlation(&[], &[]), 0.0);
        assert_eq!(annualized_sharpe(&[]), 0.0);
    }

    #[test]
    fn downside_uses_negatives_only() {
        let returns = [0.05, -0.03, 0.02, -0.04];
        // sqrt((0.0009 + 0.0016) / 2)
        assert_relative_eq!(downside_deviation(&returns), (0.00125f64).sqrt(), epsilon = 1e-12);
        assert_eq!(downside_deviation(&[0.01, 0.02]), 0.0);
    }

    #[test]
    fn correlation_identical_is_one() {
        let a = [0.01, -0.02, 0.03, 0.005];
        assert_relative_eq!(correlation(&a, &a), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn correlation_inverse_is_minus_one() {
        let a = [0.01, -0.02, 0.03, 0.005];
        let b: Vec<f64> = a.iter().map(|x| -x).collect();
        assert_relative_eq!(correlation(&a, &b), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn correlation_zero_variance_is_zero() {
        assert_eq!(correlation(&[0.01, 0.01, 0.01], &[0.02, -0.01, 0.0]), 0.0);
    }

    #[test]
    fn simple_returns_from_prices() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], 0.10);
        assert_relative_eq!(r[1], -0.10, epsilon = 1e-12);
    }

    #[test]
    fn cumulative_path_compounds() {
        let path = cumulative_path(&[0.10, -0.10]);
        assert_eq!(path.len(), 3);
        assert_relative_eq!(path[2], 0.99, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_zero_for_constant_returns() {
        assert_eq!(annualized_sharpe(&[0.01, 0.01, 0.01]), 0.0);
    }

    #[test]
    fn sharpe_positive_for_rising_noisy_returns() {
        assert!(annualized_sharpe(&[0.01, 0.02, 0.005, 0.015]) > 0.0);
    }

    #[test]
    fn drawdown_max_current_and_duration() {
        let stats = drawdown(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert_relative_eq!(stats.max_drawdown, (110.0 - 80.0) / 110.0);
        assert_relative_eq!(stats.current_drawdown, (110.0 - 100.0) / 110.0);
        assert_eq!(stats.max_drawdown_duration, 4);
    }

    #[test]
    fn drawdown_recovers_to_zero() {
        let stats = drawdown(&[100.0, 90.0, 120.0]);
        assert_eq!(stats.current_drawdown, 0.0);
        assert_relative_eq!(stats.max_drawdown, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn drawdown_empty() {
        assert_eq!(drawdown(&[]), DrawdownStats::default());
    }

    #[test]
    fn safe_ratio_guards() {
        assert_eq!(safe_ratio(1.0, 0.0), 0.0);
        assert_eq!(safe_ratio(f64::NAN, 1.0), 0.0);
        assert_relative_eq!(safe_ratio(3.0, 2.0), 1.5);
    }
}
