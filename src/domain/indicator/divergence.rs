//! Price/indicator divergence over a trailing window.
//!
//! The last `lookback` samples are split into two halves. A lower price low in
//! the second half paired with a higher indicator low is bullish; a higher
//! price high paired with a lower indicator high is bearish.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Divergence {
    Bullish,
    Bearish,
    None,
}

pub const MIN_LOOKBACK: usize = 4;

pub fn rsi_divergence(closes: &[f64], rsi: &[Option<f64>], lookback: usize) -> Divergence {
    detect(closes, rsi, lookback)
}

pub fn volume_divergence(closes: &[f64], volumes: &[f64], lookback: usize) -> Divergence {
    let volumes: Vec<Option<f64>> = volumes.iter().map(|&v| super::finite(v)).collect();
    detect(closes, &volumes, lookback)
}

struct Extremes {
    low: f64,
    high: f64,
}

fn extremes(values: impl Iterator<Item = Option<f64>>) -> Option<Extremes> {
    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for value in values {
        let v = super::finite(value?)?;
        low = low.min(v);
        high = high.max(v);
    }
    Some(Extremes { low, high })
}

fn detect(prices: &[f64], indicator: &[Option<f64>], lookback: usize) -> Divergence {
    let n = prices.len();
    if lookback < MIN_LOOKBACK || n < lookback || indicator.len() != n {
        return Divergence::None;
    }

    let start = n - lookback;
    let mid = start + lookback / 2;

    let halves = (
        extremes(prices[start..mid].iter().map(|&p| Some(p))),
        extremes(prices[mid..].iter().map(|&p| Some(p))),
        extremes(indicator[start..mid].iter().copied()),
        extremes(indicator[mid..].iter().copied()),
    );

    let (Some(price_a), Some(price_b), Some(ind_a), Some(ind_b)) = halves else {
        return Divergence::None;
    };

    if price_b.low < price_a.low && ind_b.low > ind_a.low {
        Divergence::Bullish
    } else if price_b.high > price_a.high && ind_b.high < ind_a.high {
        Divergence::Bearish
    } else {
        Divergence::None
    }
}
