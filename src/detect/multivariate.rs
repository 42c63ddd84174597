//! Tier 3: isolation forest over a contextual feature vector
//!
//! Catches contextual anomalies invisible to the univariate tiers: a value
//! that is ordinary in absolute terms but isolated in feature space (level
//! vs recent mean, local variance, change rates, position in the seasonal
//! cycle). The forest is built with a seeded RNG so identical inputs give
//! identical scores.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::IsolationConfig;
use crate::stats;
use crate::types::{AnomalyDirection, DetectionMethod, TierScore};

/// Rolling window for the local-context features.
const FEATURE_WINDOW: usize = 7;

/// Minimum history to train a forest worth trusting.
const MIN_TRAIN_POINTS: usize = 20;

// ============================================================================
// Feature extraction
// ============================================================================

/// Feature vector for one series index: [level ratio, local CV, 1-step
/// change, window change, season position sin, season position cos].
pub fn feature_vector(values: &[f64], i: usize, season_len: usize) -> Option<Vec<f64>> {
    if i < FEATURE_WINDOW {
        return None;
    }
    let window = &values[i - FEATURE_WINDOW..i];
    let w_mean = stats::mean(window);
    let w_std = stats::std_dev(window);
    let denom = w_mean.abs().max(1e-9);

    let level_ratio = values[i] / denom - w_mean.signum().max(0.0);
    let local_cv = w_std / denom;
    let change_1 = (values[i] - values[i - 1]) / denom;
    let change_w = (values[i] - window[0]) / denom;
    let phase = 2.0 * std::f64::consts::PI * (i % season_len) as f64 / season_len as f64;

    Some(vec![
        level_ratio,
        local_cv,
        change_1,
        change_w,
        phase.sin(),
        phase.cos(),
    ])
}

// ============================================================================
// Isolation forest
// ============================================================================

#[derive(Debug)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

/// Average unsuccessful-search path length in a BST of n nodes — the
/// normalization constant c(n) from the isolation forest paper.
fn c_factor(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n_f = n as f64;
    2.0 * ((n_f - 1.0).ln() + 0.577_215_664_9) - 2.0 * (n_f - 1.0) / n_f
}

/// A deterministic isolation forest over fixed-width feature vectors.
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
}

impl IsolationForest {
    /// Build `cfg.trees` trees on random subsamples of `data`.
    pub fn fit(data: &[Vec<f64>], cfg: &IsolationConfig) -> Option<Self> {
        if data.len() < 4 || data[0].is_empty() {
            return None;
        }
        let sample_size = cfg.sample_size.min(data.len());
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        let trees = (0..cfg.trees)
            .map(|_| {
                let mut sample: Vec<&Vec<f64>> = Vec::with_capacity(sample_size);
                for _ in 0..sample_size {
                    sample.push(&data[rng.gen_range(0..data.len())]);
                }
                build_tree(&sample, 0, max_depth, &mut rng)
            })
            .collect();

        Some(Self { trees, sample_size })
    }

    /// Anomaly score in (0, 1]; ~0.5 is average, > 0.6 is isolated.
    pub fn score(&self, point: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let avg_path: f64 = self
            .trees
            .iter()
            .map(|t| path_length(t, point, 0))
            .sum::<f64>()
            / self.trees.len() as f64;
        let c = c_factor(self.sample_size).max(1e-9);
        2.0_f64.powf(-avg_path / c)
    }
}

fn build_tree(sample: &[&Vec<f64>], depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
    if sample.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: sample.len() };
    }

    let dims = sample[0].len();
    let feature = rng.gen_range(0..dims);
    let (mut lo, mut hi) = (f64::MAX, f64::MIN);
    for row in sample {
        lo = lo.min(row[feature]);
        hi = hi.max(row[feature]);
    }
    if (hi - lo).abs() < 1e-12 {
        return Node::Leaf { size: sample.len() };
    }

    let threshold = rng.gen_range(lo..hi);
    let (left_rows, right_rows): (Vec<&Vec<f64>>, Vec<&Vec<f64>>) =
        sample.iter().copied().partition(|row| row[feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(&left_rows, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(&right_rows, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, point: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + c_factor(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if point[*feature] < *threshold {
                path_length(left, point, depth + 1)
            } else {
                path_length(right, point, depth + 1)
            }
        }
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Contextual anomaly detector over the series' own feature history.
#[derive(Debug, Clone)]
pub struct MultivariateDetector<'a> {
    cfg: &'a IsolationConfig,
}

impl<'a> MultivariateDetector<'a> {
    pub fn new(cfg: &'a IsolationConfig) -> Self {
        Self { cfg }
    }

    /// Score the last point of `values`. Returns `None` when history is
    /// too short to train a forest.
    pub fn score(&self, values: &[f64], season_len: usize) -> Option<TierScore> {
        let n = values.len();
        if n < MIN_TRAIN_POINTS + FEATURE_WINDOW {
            return None;
        }

        // Train on historical feature vectors, excluding the point under test
        let train: Vec<Vec<f64>> = (FEATURE_WINDOW..n - 1)
            .filter_map(|i| feature_vector(values, i, season_len))
            .collect();
        let last_features = feature_vector(values, n - 1, season_len)?;

        let forest = IsolationForest::fit(&train, self.cfg)?;
        let raw = forest.score(&last_features);

        // Map the conventional scale (0.5 average, 0.6+ isolated) onto [0, 1]
        let score = ((raw - 0.5) / 0.3).clamp(0.0, 1.0);

        let change = values[n - 1] - values[n - 2];
        Some(TierScore {
            method: DetectionMethod::IsolationForest,
            score,
            direction: if change >= 0.0 {
                AnomalyDirection::Up
            } else {
                AnomalyDirection::Down
            },
            detail: format!("isolation score {raw:.2}"),
        })
    }
}
