//! Random forest regression
//!
//! Each tree is a CART regression tree grown on a bootstrap resample of the
//! training set, choosing at every node the split that minimizes the summed
//! squared error of the two children. The forest prediction is the mean of
//! the tree predictions.

use crate::error::InputShapeError;
use crate::models::{FeatureArray, FEATURE_COUNT};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for the forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples a node needs before it may be split
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
    /// Grow each tree on a bootstrap resample
    pub bootstrap: bool,
    /// Base random seed; tree `i` uses `seed + i`
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    cost: f64,
}

/// A single regression tree, stored as a flat node array rooted at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct TreeBuilder<'a> {
    x: &'a [FeatureArray],
    y: &'a [f64],
    config: &'a ForestConfig,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn fit(
        x: &[FeatureArray],
        y: &[f64],
        indices: &mut [usize],
        config: &ForestConfig,
        rng: StdRng,
    ) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            config,
            rng,
            nodes: Vec::new(),
        };
        builder.build(indices, 0);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn predict(&self, features: &FeatureArray) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Structural check for trees decoded from storage: every child index
    /// must point forward and in range, so traversal always terminates.
    fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    *feature < FEATURE_COUNT
                        && *left > i
                        && *right > i
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let node_index = self.nodes.len();
        let mean = indices.iter().map(|&i| self.y[i]).sum::<f64>() / indices.len() as f64;
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split.max(2)
        {
            return node_index;
        }

        let split = match self.best_split(indices) {
            Some(split) => split,
            None => return node_index,
        };

        let mid = partition(indices, |i| self.x[i][split.feature] <= split.threshold);
        if mid == 0 || mid == indices.len() {
            return node_index;
        }

        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = self.build(left_indices, depth + 1);
        let right = self.build(right_indices, depth + 1);
        self.nodes[node_index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_index
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        match self.config.max_features {
            Some(k) if k > 0 && k < FEATURE_COUNT => {
                index::sample(&mut self.rng, FEATURE_COUNT, k).into_vec()
            }
            _ => (0..FEATURE_COUNT).collect(),
        }
    }

    /// Exhaustive search for the split with the lowest child squared error
    fn best_split(&mut self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        if n < 2 * min_leaf {
            return None;
        }

        let total_sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let parent_cost = total_sq - total_sum * total_sum / n as f64;
        if parent_cost <= f64::EPSILON * total_sq.max(1.0) {
            // Node is pure
            return None;
        }

        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for feature in self.candidate_features() {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 1..n {
                let prev = order[k - 1];
                left_sum += self.y[prev];
                left_sq += self.y[prev] * self.y[prev];

                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let lo = self.x[prev][feature];
                let hi = self.x[order[k]][feature];
                if lo >= hi {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let cost = (left_sq - left_sum * left_sum / k as f64)
                    + (right_sq - right_sum * right_sum / (n - k) as f64);

                if best.map_or(true, |b| cost < b.cost) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: midpoint(lo, hi),
                        cost,
                    });
                }
            }
        }

        best
    }
}

/// Midpoint threshold that still separates `lo` from `hi`
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi {
        lo
    } else {
        mid
    }
}

/// Move every index satisfying `pred` to the front; returns the split point
fn partition(indices: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..indices.len() {
        if pred(indices[i]) {
            indices.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

/// Ensemble of regression trees averaged at prediction time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit the forest on scaled features `x` against labels `y`
    pub fn fit(
        x: &[FeatureArray],
        y: &[f64],
        config: &ForestConfig,
    ) -> Result<Self, InputShapeError> {
        if x.is_empty() || y.is_empty() {
            return Err(InputShapeError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(InputShapeError::FeatureCount {
                expected: x.len(),
                actual: y.len(),
            });
        }

        let n = x.len();
        let n_trees = config.n_estimators.max(1);
        let mut trees = Vec::with_capacity(n_trees);

        for t in 0..n_trees {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
            let mut indices: Vec<usize> = if config.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            trees.push(RegressionTree::fit(x, y, &mut indices, config, rng));
        }

        Ok(Self { trees })
    }

    pub fn predict(&self, features: &FeatureArray) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        sum / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(|t| t.is_well_formed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(a: f64, b: f64) -> FeatureArray {
        let mut r = [0.0; FEATURE_COUNT];
        r[0] = a;
        r[1] = b;
        r
    }

    fn step_data() -> (Vec<FeatureArray>, Vec<f64>) {
        let x: Vec<FeatureArray> = (0..40).map(|i| row(i as f64, (i % 3) as f64)).collect();
        let y: Vec<f64> = (0..40).map(|i| if i < 20 { 10.0 } else { 90.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_single_tree_learns_step_function() {
        let (x, y) = step_data();
        let config = ForestConfig {
            n_estimators: 1,
            bootstrap: false,
            ..Default::default()
        };
        let forest = RandomForestRegressor::fit(&x, &y, &config).unwrap();
        assert_eq!(forest.predict(&row(5.0, 0.0)), 10.0);
        assert_eq!(forest.predict(&row(35.0, 0.0)), 90.0);
        // One split separates the two plateaus perfectly
        assert_eq!(forest.trees()[0].node_count(), 3);
        assert_eq!(forest.trees()[0].depth(), 1);
    }

    #[test]
    fn test_max_depth_is_respected() {
        let x: Vec<FeatureArray> = (0..64).map(|i| row(i as f64, 0.0)).collect();
        let y: Vec<f64> = (0..64).map(|i| (i * i) as f64).collect();
        let config = ForestConfig {
            n_estimators: 3,
            max_depth: 2,
            ..Default::default()
        };
        let forest = RandomForestRegressor::fit(&x, &y, &config).unwrap();
        assert!(forest.trees().iter().all(|t| t.depth() <= 2));
    }

    #[test]
    fn test_pure_node_becomes_leaf() {
        let x: Vec<FeatureArray> = (0..10).map(|i| row(i as f64, 1.0)).collect();
        let y = vec![7.0; 10];
        let forest = RandomForestRegressor::fit(&x, &y, &ForestConfig::default()).unwrap();
        assert!(forest.trees().iter().all(|t| t.node_count() == 1));
        assert_eq!(forest.predict(&row(100.0, -3.0)), 7.0);
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let (x, y) = step_data();
        let config = ForestConfig {
            n_estimators: 5,
            max_features: Some(1),
            ..Default::default()
        };
        let a = RandomForestRegressor::fit(&x, &y, &config).unwrap();
        let b = RandomForestRegressor::fit(&x, &y, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_predictions_stay_within_label_range() {
        let (x, y) = step_data();
        let config = ForestConfig {
            n_estimators: 8,
            ..Default::default()
        };
        let forest = RandomForestRegressor::fit(&x, &y, &config).unwrap();
        for probe in [-1e9, -1.0, 0.0, 19.5, 20.5, 1e9] {
            let p = forest.predict(&row(probe, 0.0));
            assert!((10.0..=90.0).contains(&p), "prediction {} out of range", p);
        }
    }

    #[test]
    fn test_empty_and_mismatched_inputs_rejected() {
        let config = ForestConfig::default();
        assert_eq!(
            RandomForestRegressor::fit(&[], &[], &config).unwrap_err(),
            InputShapeError::EmptyTrainingSet
        );
        assert!(RandomForestRegressor::fit(&[row(1.0, 1.0)], &[1.0, 2.0], &config).is_err());
    }

    #[test]
    fn test_midpoint_separates_adjacent_values() {
        let lo = 1.0_f64;
        let hi = f64::from_bits(lo.to_bits() + 1);
        let t = midpoint(lo, hi);
        assert!(lo <= t && t < hi);
        assert_eq!(midpoint(2.0, 4.0), 3.0);
    }

    #[test]
    fn test_well_formed_check() {
        let (x, y) = step_data();
        let forest = RandomForestRegressor::fit(&x, &y, &ForestConfig {
            n_estimators: 2,
            ..Default::default()
        })
        .unwrap();
        assert!(forest.is_well_formed());

        let cyclic = RandomForestRegressor {
            trees: vec![RegressionTree {
                nodes: vec![Node::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                }],
            }],
        };
        assert!(!cyclic.is_well_formed());
    }
}
