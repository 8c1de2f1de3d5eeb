//! Pairwise Pearson correlation across a set of return series.

use serde::Serialize;

use crate::domain::stats::correlation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    /// Row-major, `matrix[i][j]` pairs `symbols[i]` with `symbols[j]`.
    pub matrix: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Series of unequal length are compared over their most recent common tail.
    pub fn compute(symbols: Vec<String>, series: &[&[f64]]) -> Self {
        let n = series.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            matrix[i][i] = 1.0;
            for j in (i + 1)..n {
                let (a, b) = common_tail(series[i], series[j]);
                let rho = correlation(a, b);
                matrix[i][j] = rho;
                matrix[j][i] = rho;
            }
        }

        CorrelationMatrix { symbols, matrix }
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        self.matrix.get(i)?.get(j).copied()
    }
}

pub(crate) fn common_tail<'a>(a: &'a [f64], b: &'a [f64]) -> (&'a [f64], &'a [f64]) {
    let n = a.len().min(b.len());
    (&a[a.len() - n..], &b[b.len() - n..])
}
