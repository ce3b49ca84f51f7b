//! Random forest classifier.
//!
//! Bootstrap-aggregated CART trees with Gini impurity, a random subset of
//! √features per split and optional class-balanced sample weights. Training
//! is fully deterministic for a given `random_state`.

use serde::{Deserialize, Serialize};

use crate::core::error::{MatchError, Result};
use crate::models::Label;

/// Binary classifier capability used by [`crate::core::Matcher`]
///
/// Implementations must be cheap to clone while untrained; the matcher
/// clones an untrained template for every cross-validation fold.
pub trait Classifier {
    /// Fit on `rows` (equal-width, finite) with one label per row
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[Label]) -> Result<()>;

    /// `[P(negative), P(positive)]` per row
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<[f64; 2]>>;

    /// Hard labels; positive only when it is strictly more likely
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Label>> {
        Ok(self
            .predict_proba(rows)?
            .into_iter()
            .map(|p| if p[1] > p[0] { Label::Positive } else { Label::Negative })
            .collect())
    }

    /// Normalized importance per input feature; sums to 1
    fn feature_importance(&self) -> Result<Vec<f64>>;

    /// Check a deserialized, already fitted model before it serves `n_features`-wide rows
    fn check_restored(&self, _n_features: usize) -> Result<()> {
        Ok(())
    }
}

/// Ensemble hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: u64,
    pub balanced_class_weight: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            random_state: 42,
            balanced_class_weight: true,
        }
    }
}

/// Deterministic PRNG (xorshift64) for bootstrap and feature sampling
#[derive(Debug, Clone)]
pub(crate) struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub(crate) fn new(seed: u64) -> Self {
        // Spread small seeds over the state space
        let mixed = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ 0xD1B5_4A32_D192_ED03;
        Self {
            state: if mixed == 0 { 1 } else { mixed },
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform index in `0..bound`
    pub(crate) fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }

    pub(crate) fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        proba: [f64; 2],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART tree stored as a flat node arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict_row(&self, row: &[f64]) -> [f64; 2] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { proba } => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Children must follow their parent and every split must read an
    /// existing column, so prediction always terminates in bounds.
    fn check_nodes(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(MatchError::validation("decision tree has no nodes"));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let Node::Split { feature, left, right, .. } = node {
                if *feature >= n_features {
                    return Err(MatchError::validation(format!(
                        "node {} splits on feature {} of {}",
                        index, feature, n_features
                    )));
                }
                for child in [*left, *right] {
                    if child <= index || child >= self.nodes.len() {
                        return Err(MatchError::validation(format!(
                            "node {} points to invalid child {}",
                            index, child
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Training-time state for growing one tree
struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [Label],
    class_weights: [f64; 2],
    params: &'a ForestParams,
    max_features: usize,
    nodes: Vec<Node>,
    importance: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn weighted_counts(&self, sample: &[usize]) -> [f64; 2] {
        let mut counts = [0.0; 2];
        for &i in sample {
            let class = self.labels[i].index();
            counts[class] += self.class_weights[class];
        }
        counts
    }

    fn leaf(&mut self, counts: [f64; 2]) -> usize {
        let total = counts[0] + counts[1];
        let proba = if total > 0.0 {
            [counts[0] / total, counts[1] / total]
        } else {
            [0.5, 0.5]
        };
        self.nodes.push(Node::Leaf { proba });
        self.nodes.len() - 1
    }

    fn grow(&mut self, sample: Vec<usize>, depth: usize, rng: &mut SimpleRng) -> usize {
        let counts = self.weighted_counts(&sample);
        let pure = counts[0] == 0.0 || counts[1] == 0.0;

        if pure || depth >= self.params.max_depth || sample.len() < self.params.min_samples_split {
            return self.leaf(counts);
        }

        let Some(best) = self.best_split(&sample, counts, rng) else {
            return self.leaf(counts);
        };

        self.importance[best.feature] += best.gain;

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.rows[i][best.feature] <= best.threshold);

        // Reserve the split slot so children are numbered after it
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { proba: [0.5, 0.5] });

        let left = self.grow(left, depth + 1, rng);
        let right = self.grow(right, depth + 1, rng);

        self.nodes[index] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        index
    }

    fn best_split(&self, sample: &[usize], counts: [f64; 2], rng: &mut SimpleRng) -> Option<Candidate> {
        let n_features = self.rows[0].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        rng.shuffle(&mut features);

        let parent_weight = counts[0] + counts[1];
        let parent_impurity = gini(counts);
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut best: Option<Candidate> = None;

        for &feature in features.iter().take(self.max_features) {
            let mut ordered: Vec<usize> = sample.to_vec();
            ordered.sort_by(|&a, &b| {
                self.rows[a][feature]
                    .partial_cmp(&self.rows[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left = [0.0; 2];
            for pos in 0..ordered.len() - 1 {
                let i = ordered[pos];
                let class = self.labels[i].index();
                left[class] += self.class_weights[class];

                let here = self.rows[i][feature];
                let next = self.rows[ordered[pos + 1]][feature];
                if here == next {
                    continue;
                }

                let left_n = pos + 1;
                let right_n = ordered.len() - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right = [counts[0] - left[0], counts[1] - left[1]];
                let left_weight = left[0] + left[1];
                let right_weight = right[0] + right[1];
                let gain = parent_weight * parent_impurity
                    - left_weight * gini(left)
                    - right_weight * gini(right);

                if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                    best = Some(Candidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

#[inline]
fn gini(counts: [f64; 2]) -> f64 {
    let total = counts[0] + counts[1];
    if total <= 0.0 {
        return 0.0;
    }
    let p0 = counts[0] / total;
    let p1 = counts[1] / total;
    1.0 - p0 * p0 - p1 * p1
}

/// `n / (classes_present * n_class)`, 1.0 for absent classes
fn balanced_weights(labels: &[Label]) -> [f64; 2] {
    let mut counts = [0usize; 2];
    for label in labels {
        counts[label.index()] += 1;
    }
    let present = counts.iter().filter(|c| **c > 0).count().max(1) as f64;
    let n = labels.len() as f64;

    let mut weights = [1.0; 2];
    for class in 0..2 {
        if counts[class] > 0 {
            weights[class] = n / (present * counts[class] as f64);
        }
    }
    weights
}

/// Bagged ensemble of [`DecisionTree`]s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    importance: Vec<f64>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            importance: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn check_width(&self, rows: &[Vec<f64>]) -> Result<()> {
        if let Some(row) = rows.iter().find(|r| r.len() != self.n_features) {
            return Err(MatchError::validation(format!(
                "expected {} features per row, got {}",
                self.n_features,
                row.len()
            )));
        }
        Ok(())
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[Label]) -> Result<()> {
        if rows.is_empty() {
            return Err(MatchError::validation("cannot fit a forest on zero rows"));
        }
        if rows.len() != labels.len() {
            return Err(MatchError::validation(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if self.params.n_estimators == 0 {
            return Err(MatchError::validation("n_estimators must be at least 1"));
        }

        let n_features = rows[0].len();
        if n_features == 0 || rows.iter().any(|r| r.len() != n_features) {
            return Err(MatchError::validation("rows must share a non-zero width"));
        }

        let class_weights = if self.params.balanced_class_weight {
            balanced_weights(labels)
        } else {
            [1.0, 1.0]
        };
        let max_features = ((n_features as f64).sqrt().floor() as usize).max(1);

        let mut rng = SimpleRng::new(self.params.random_state);
        let mut trees = Vec::with_capacity(self.params.n_estimators);
        let mut importance = vec![0.0; n_features];

        for _ in 0..self.params.n_estimators {
            let bootstrap: Vec<usize> = (0..rows.len()).map(|_| rng.below(rows.len())).collect();

            let mut builder = TreeBuilder {
                rows,
                labels,
                class_weights,
                params: &self.params,
                max_features,
                nodes: Vec::new(),
                importance: vec![0.0; n_features],
            };
            builder.grow(bootstrap, 0, &mut rng);

            let tree_total: f64 = builder.importance.iter().sum();
            if tree_total > 0.0 {
                for (acc, v) in importance.iter_mut().zip(&builder.importance) {
                    *acc += v / tree_total;
                }
            }

            trees.push(DecisionTree { nodes: builder.nodes });
        }

        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            importance.iter_mut().for_each(|v| *v /= total);
        } else {
            // No tree ever split: every feature is equally (un)informative
            importance = vec![1.0 / n_features as f64; n_features];
        }

        self.trees = trees;
        self.importance = importance;
        self.n_features = n_features;

        tracing::debug!(
            trees = self.trees.len(),
            features = n_features,
            samples = rows.len(),
            "random forest fitted"
        );
        Ok(())
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<[f64; 2]>> {
        if !self.is_fitted() {
            return Err(MatchError::state("forest must be fitted before predicting"));
        }
        self.check_width(rows)?;

        let n_trees = self.trees.len() as f64;
        Ok(rows
            .iter()
            .map(|row| {
                let mut sum = [0.0; 2];
                for tree in &self.trees {
                    let p = tree.predict_row(row);
                    sum[0] += p[0];
                    sum[1] += p[1];
                }
                [sum[0] / n_trees, sum[1] / n_trees]
            })
            .collect())
    }

    fn feature_importance(&self) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(MatchError::state("forest must be fitted before reading importance"));
        }
        Ok(self.importance.clone())
    }

    fn check_restored(&self, n_features: usize) -> Result<()> {
        if !self.is_fitted() {
            return Err(MatchError::validation("restored forest has no trees"));
        }
        if self.n_features != n_features || self.importance.len() != n_features {
            return Err(MatchError::validation(format!(
                "restored forest expects {} features, model declares {}",
                self.n_features, n_features
            )));
        }
        self.trees.iter().try_for_each(|tree| tree.check_nodes(n_features))
    }
}
