//! Historical-simulation value at risk.
//!
//! Both functions return the loss as a non-negative fraction of portfolio
//! value; callers scale by the current market value. A tail made only of
//! gains is no loss and reports 0.

/// Position of the `(1 - confidence)` percentile in an ascending sample of `n`.
fn tail_index(n: usize, confidence: f64) -> usize {
    let idx = ((1.0 - confidence) * n as f64).floor();
    if idx <= 0.0 {
        0
    } else {
        (idx as usize).min(n - 1)
    }
}

fn sorted(returns: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn historical_var(returns: &[f64], confidence: f64) -> f64 {
    let sorted = sorted(returns);
    if sorted.is_empty() {
        return 0.0;
    }
    (-sorted[tail_index(sorted.len(), confidence)]).max(0.0)
}

/// Mean of every return at or below the VaR percentile.
pub fn historical_cvar(returns: &[f64], confidence: f64) -> f64 {
    let sorted = sorted(returns);
    if sorted.is_empty() {
        return 0.0;
    }
    let tail = &sorted[..=tail_index(sorted.len(), confidence)];
    (-(tail.iter().sum::<f64>() / tail.len() as f64)).max(0.0)
}
