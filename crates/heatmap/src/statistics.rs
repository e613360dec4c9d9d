//! Descriptive statistics and optimal 1-D clustering.

use crate::error::{HeatmapError, HeatmapResult};

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; NaN for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn standard_deviation(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Prefix sums of values shifted by the median for numeric stability.
struct SquaredSums {
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl SquaredSums {
    fn new(sorted: &[f64]) -> Self {
        let shift = sorted[sorted.len() / 2];
        let mut sum = Vec::with_capacity(sorted.len());
        let mut sum_sq = Vec::with_capacity(sorted.len());
        let (mut acc, mut acc_sq) = (0.0, 0.0);
        for value in sorted {
            let shifted = value - shift;
            acc += shifted;
            acc_sq += shifted * shifted;
            sum.push(acc);
            sum_sq.push(acc_sq);
        }
        Self { sum, sum_sq }
    }

    /// Within-cluster sum of squares of `sorted[j..=i]`.
    fn ssq(&self, j: usize, i: usize) -> f64 {
        let n = (i - j + 1) as f64;
        let sji = if j > 0 {
            let mu = (self.sum[i] - self.sum[j - 1]) / n;
            self.sum_sq[i] - self.sum_sq[j - 1] - n * mu * mu
        } else {
            self.sum_sq[i] - self.sum[i] * self.sum[i] / n
        };
        sji.max(0.0)
    }
}

/// Optimal partition of `values` into `clusters` groups minimizing the total
/// within-group sum of squares (Ckmeans.1d.dp).
///
/// Groups are returned sorted and in ascending order. When every value is
/// identical a single group is returned.
pub fn ckmeans(values: &[f64], clusters: usize) -> HeatmapResult<Vec<Vec<f64>>> {
    if clusters == 0 || clusters > values.len() {
        return Err(HeatmapError::InvalidClusterCount {
            clusters,
            values: values.len(),
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    if sorted.first() == sorted.last() {
        return Ok(vec![sorted]);
    }

    let n = sorted.len();
    let sums = SquaredSums::new(&sorted);
    // cost[c][i]: best cost of splitting sorted[..=i] into c + 1 groups
    let mut cost = vec![vec![0.0; n]; clusters];
    let mut backtrack = vec![vec![0usize; n]; clusters];

    for i in 0..n {
        cost[0][i] = sums.ssq(0, i);
    }
    for c in 1..clusters {
        let (done, rest) = cost.split_at_mut(c);
        let mut column = ColumnFill {
            prev: &done[c - 1],
            cost: &mut rest[0],
            backtrack: &mut backtrack[c],
            sums: &sums,
            cluster: c,
        };
        column.fill(c, n - 1, c, n - 1);
    }

    let mut groups = vec![Vec::new(); clusters];
    let mut right = n - 1;
    for c in (0..clusters).rev() {
        let left = backtrack[c][right];
        groups[c] = sorted[left..=right].to_vec();
        if c > 0 {
            right = left - 1;
        }
    }
    Ok(groups)
}

/// One DP column filled by divide and conquer over monotone split points.
struct ColumnFill<'a> {
    prev: &'a [f64],
    cost: &'a mut [f64],
    backtrack: &'a mut [usize],
    sums: &'a SquaredSums,
    cluster: usize,
}

impl ColumnFill<'_> {
    fn fill(&mut self, i_min: usize, i_max: usize, j_min: usize, j_max: usize) {
        if i_min > i_max {
            return;
        }
        let i = (i_min + i_max) / 2;
        let low = j_min.max(self.cluster);
        let high = j_max.min(i);

        let mut best = f64::INFINITY;
        let mut best_j = low;
        for j in low..=high {
            let candidate = self.prev[j - 1] + self.sums.ssq(j, i);
            if candidate < best {
                best = candidate;
                best_j = j;
            }
        }
        self.cost[i] = best;
        self.backtrack[i] = best_j;

        if i > i_min {
            self.fill(i_min, i - 1, j_min, best_j);
        }
        self.fill(i + 1, i_max, best_j, j_max);
    }
}
