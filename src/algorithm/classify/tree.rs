//! Regression trees shared by gradient boosting and random forests.
//!
//! Splits minimize the squared error of a per-row target. Leaf values are
//! `sum(target) / sum(weight)`: with unit weights that is the mean (forest
//! probabilities), with hessian weights it is a Newton step (boosting).
//! Nodes live in one flat vector; children are indices into it.

use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use rand::seq::index::sample;

/// Growth limits of a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
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

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    target: &'a [f64],
    weight: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
}

impl Builder<'_> {
    fn leaf_value(&self, rows: &[usize]) -> f64 {
        let numerator: f64 = rows.iter().map(|&i| self.target[i]).sum();
        let denominator: f64 = rows.iter().map(|&i| self.weight[i]).sum();
        if denominator.abs() < 1e-150 {
            0.0
        } else {
            numerator / denominator
        }
    }

    /// Best threshold on one feature by sweeping rows in value order
    fn best_split_on(&self, feature: usize, rows: &[usize]) -> Option<SplitCandidate> {
        let column = self.x.column(feature);
        let mut ordered: Vec<usize> = rows.to_vec();
        ordered.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

        let total: f64 = ordered.iter().map(|&i| self.target[i]).sum();
        let n = ordered.len() as f64;
        let parent = total * total / n;
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut left_sum = 0.0;
        let mut best: Option<SplitCandidate> = None;
        for pos in 0..ordered.len() - 1 {
            left_sum += self.target[ordered[pos]];
            let here = column[ordered[pos]];
            let next = column[ordered[pos + 1]];
            let n_left = pos + 1;
            let n_right = ordered.len() - n_left;
            if here >= next || n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64
                - parent;
            if best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
        best
    }

    fn grow(&mut self, rows: &[usize], depth: usize, rng: &mut Option<&mut StdRng>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(rows),
        });

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || rows.len() < self.params.min_samples_split.max(2) {
            return index;
        }

        let n_features = self.x.ncols();
        let features: Vec<usize> = match (self.params.max_features, rng.as_deref_mut()) {
            (Some(k), Some(rng)) if k < n_features => sample(rng, n_features, k).into_vec(),
            _ => (0..n_features).collect(),
        };

        let best = features
            .iter()
            .filter_map(|&f| self.best_split_on(f, rows))
            .fold(None::<SplitCandidate>, |acc, c| match acc {
                Some(a) if a.gain >= c.gain => Some(a),
                _ => Some(c),
            });

        let Some(split) = best.filter(|s| s.gain > 1e-12) else {
            return index;
        };

        let column = self.x.column(split.feature);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&i| column[i] <= split.threshold);

        let left = self.grow(&left_rows, depth + 1, rng);
        let right = self.grow(&right_rows, depth + 1, rng);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }
}

impl RegressionTree {
    /// Fit a tree on the given rows of `x`
    ///
    /// # Arguments
    ///
    /// * `target` - Per-row value whose squared error the splits reduce
    /// * `weight` - Per-row denominator of the leaf values
    /// * `rows` - Rows of `x` to train on (repeats allowed, as in a bootstrap)
    /// * `rng` - Needed only when `params.max_features` subsamples features
    #[must_use]
    pub fn fit(
        x: &Array2<f64>,
        target: &[f64],
        weight: &[f64],
        rows: &[usize],
        params: TreeParams,
        mut rng: Option<&mut StdRng>,
    ) -> Self {
        let mut builder = Builder {
            x,
            target,
            weight,
            params,
            nodes: Vec::new(),
        };
        if rows.is_empty() {
            return Self {
                nodes: vec![Node::Leaf { value: 0.0 }],
            };
        }
        builder.grow(rows, 0, &mut rng);
        Self {
            nodes: builder.nodes,
        }
    }

    /// Value of the leaf `row` falls into
    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
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

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_split_recovers_step() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let target = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let weight = [1.0; 6];
        let rows: Vec<usize> = (0..6).collect();
        let tree = RegressionTree::fit(&x, &target, &weight, &rows, TreeParams::default(), None);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(array![2.5].view()), 0.0);
        assert_eq!(tree.predict_row(array![9.0].view()), 1.0);
    }

    #[test]
    fn test_depth_limit() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0]];
        let target = [0.0, 1.0, 0.0, 1.0];
        let weight = [1.0; 4];
        let rows: Vec<usize> = (0..4).collect();
        let params = TreeParams {
            max_depth: Some(0),
            ..TreeParams::default()
        };
        let stump = RegressionTree::fit(&x, &target, &weight, &rows, params, None);
        assert_eq!(stump.n_nodes(), 1);
        assert!((stump.predict_row(x.row(0)) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_newton_leaf_values() {
        let x = array![[0.0], [0.0]];
        let target = [0.5, 0.5];
        let weight = [0.25, 0.25];
        let tree = RegressionTree::fit(&x, &target, &weight, &[0, 1], TreeParams::default(), None);
        assert!((tree.predict_row(x.row(0)) - 2.0).abs() < 1e-12);
    }
}
