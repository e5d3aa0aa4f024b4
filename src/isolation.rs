//! Isolation forest outlier scoring and feature standardization.
//!
//! Each tree is grown on a random subsample by picking a random feature and
//! a uniform split point between that feature's min and max, until a point is
//! alone, the node is constant, or the depth limit `ceil(log2(psi))` is hit.
//! A point's score is `-2^(-E[h(x)] / c(psi))`, so lower is more anomalous,
//! and the decision threshold is the `contamination` percentile of the
//! training scores.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

use crate::util::{average, percentile, population_std};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
const DEFAULT_MAX_SAMPLES: usize = 256;

/// Column-wise zero-mean / unit-variance scaling. Constant columns are
/// centred but left unscaled.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);
        for j in 0..width {
            let col: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            means.push(average(&col));
            let std = population_std(&col);
            scales.push(if std > 0.0 && std.is_finite() { std } else { 1.0 });
        }
        Self { means, scales }
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|r| {
                r.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(x, (m, s))| (x - m) / s)
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        Self::fit(rows).transform(rows)
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    /// Subsample size per tree; `None` means `min(256, n)`.
    pub max_samples: Option<usize>,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: None,
            contamination: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// Grow the forest on `data` and set the decision offset from the
    /// training scores. `data` must be non-empty and rectangular.
    ///
    /// Tree seeds are drawn from one `StdRng` seeded with `params.seed`, so
    /// a given seed and input always produce the same forest.
    pub fn fit(data: &[Vec<f64>], params: &IsolationForestParams) -> Self {
        let n = data.len();
        let sample_size = params
            .max_samples
            .unwrap_or(DEFAULT_MAX_SAMPLES)
            .clamp(1, n.max(1));
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_estimators.max(1))
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let idx = sample(&mut tree_rng, n, sample_size).into_vec();
                grow(data, idx, 0, max_depth, &mut tree_rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: -0.5,
        };
        let scores = forest.score_samples(data);
        forest.offset = percentile(&scores, 100.0 * params.contamination);
        forest
    }

    /// Raw scores in `[-1, 0]`; lower means easier to isolate.
    pub fn score_samples(&self, data: &[Vec<f64>]) -> Vec<f64> {
        let norm = average_path_length(self.sample_size);
        data.iter()
            .map(|x| {
                let mean_depth = self
                    .trees
                    .iter()
                    .map(|t| path_length(t, x, 0))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                if norm > 0.0 {
                    -(2f64).powf(-mean_depth / norm)
                } else {
                    -0.5
                }
            })
            .collect()
    }

    /// Score shifted by the fitted offset: negative values are outliers.
    pub fn decision_function(&self, data: &[Vec<f64>]) -> Vec<f64> {
        self.score_samples(data)
            .into_iter()
            .map(|s| s - self.offset)
            .collect()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }
}

fn grow(data: &[Vec<f64>], idx: Vec<usize>, depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
    if idx.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: idx.len() };
    }

    let width = data[idx[0]].len();
    let ranges: Vec<(usize, f64, f64)> = (0..width)
        .filter_map(|j| {
            let (lo, hi) = idx.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(data[i][j]), hi.max(data[i][j]))
            });
            (hi > lo).then_some((j, lo, hi))
        })
        .collect();
    if ranges.is_empty() {
        return Node::Leaf { size: idx.len() };
    }

    let (feature, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) =
        idx.into_iter().partition(|&i| data[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(data, left, depth + 1, max_depth, rng)),
        right: Box::new(grow(data, right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, x: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if x[*feature] < *threshold {
                path_length(left, x, depth + 1)
            } else {
                path_length(right, x, depth + 1)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut data: Vec<Vec<f64>> = (0..300)
            .map(|i| vec![(i % 7) as f64 * 0.1, (i % 5) as f64 * 0.1])
            .collect();
        data.push(vec![50.0, -40.0]);
        data
    }

    #[test]
    fn scaler_centres_and_scales() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaled = StandardScaler::fit_transform(&rows);
        assert_eq!(scaled[0], vec![-1.0, 0.0]);
        assert_eq!(scaled[1], vec![1.0, 0.0]);
    }

    #[test]
    fn outlier_has_lowest_score_and_negative_decision() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default());
        let decision = forest.decision_function(&data);
        let outlier = decision.len() - 1;
        let min_idx = decision
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(min_idx, outlier);
        assert!(decision[outlier] < 0.0);
    }

    #[test]
    fn same_seed_same_scores() {
        let data = cluster_with_outlier();
        let params = IsolationForestParams {
            seed: 7,
            ..Default::default()
        };
        let a = IsolationForest::fit(&data, &params).score_samples(&data);
        let b = IsolationForest::fit(&data, &params).score_samples(&data);
        assert_eq!(a, b);
    }

    #[test]
    fn contamination_bounds_flag_count() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default());
        let flagged = forest
            .decision_function(&data)
            .iter()
            .filter(|d| **d < 0.0)
            .count();
        assert!(flagged >= 1 && flagged <= 4, "flagged {flagged}");
    }

    #[test]
    fn path_length_constants() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!((average_path_length(256) - 10.244_770_920_116_851).abs() < 1e-9);
    }
}
