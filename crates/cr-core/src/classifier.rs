use std::cmp::Ordering;

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::RecommendError;

/// フォレストの学習パラメータ
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// 木の本数
    pub n_trees: usize,
    /// bootstrap 抽出の固定 seed（木ごとに seed + index を使う）
    pub seed: u64,
    /// 木の最大深さ（None = 無制限）
    pub max_depth: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: None,
        }
    }
}

/// 決定木のノード
#[derive(Debug, Clone)]
enum TreeNode {
    Node {
        feature_index: usize,
        threshold: f32,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        class_label: usize,
    },
}

/// CART 決定木（Gini 不純度、分割は feature <= threshold）
#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: TreeNode,
}

impl DecisionTree {
    pub fn fit(
        rows: &[Vec<f32>],
        labels: &[usize],
        max_depth: Option<usize>,
    ) -> Result<Self, RecommendError> {
        validate_training_data(rows, labels)?;
        let indices: Vec<usize> = (0..rows.len()).collect();
        Ok(Self {
            root: build_tree(rows, labels, &indices, 0, max_depth),
        })
    }

    /// 指定インデックスの部分標本で学習する（bootstrap 用、重複インデックス可）
    fn fit_indices(
        rows: &[Vec<f32>],
        labels: &[usize],
        indices: &[usize],
        max_depth: Option<usize>,
    ) -> Result<Self, RecommendError> {
        validate_training_data(rows, labels)?;
        Ok(Self {
            root: build_tree(rows, labels, indices, 0, max_depth),
        })
    }

    pub fn predict_one(&self, row: &[f32]) -> usize {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { class_label } => return *class_label,
                TreeNode::Node {
                    feature_index,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature_index] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// ランダムフォレスト分類器。bootstrap 標本ごとに決定木を学習し、
/// 多数決（predict）または投票割合（predict_proba）で推論する。
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    pub fn fit(
        rows: &[Vec<f32>],
        labels: &[usize],
        config: &ForestConfig,
    ) -> Result<Self, RecommendError> {
        validate_training_data(rows, labels)?;
        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;

        let mut trees = Vec::with_capacity(config.n_trees);
        for tree_index in 0..config.n_trees {
            let indices = bootstrap_sample(rows.len(), config.seed + tree_index as u64);
            trees.push(DecisionTree::fit_indices(
                rows,
                labels,
                &indices,
                config.max_depth,
            )?);
        }

        Ok(Self { trees, n_classes })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// 多数決によるクラス予測
    pub fn predict(&self, rows: &[Vec<f32>]) -> Vec<usize> {
        self.predict_proba(rows)
            .iter()
            .map(|probabilities| {
                probabilities
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
                    .map(|(class, _)| class)
                    .unwrap_or(0)
            })
            .collect()
    }

    /// クラスごとの投票割合（各行の合計は 1.0）
    pub fn predict_proba(&self, rows: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let n_trees = self.trees.len() as f32;
        rows.iter()
            .map(|row| {
                let mut votes = vec![0usize; self.n_classes];
                for tree in &self.trees {
                    let predicted = tree.predict_one(row).min(self.n_classes - 1);
                    votes[predicted] += 1;
                }
                votes.iter().map(|&count| count as f32 / n_trees).collect()
            })
            .collect()
    }
}

fn validate_training_data(rows: &[Vec<f32>], labels: &[usize]) -> Result<(), RecommendError> {
    if rows.is_empty() {
        return Err(RecommendError::InvalidTrainingData(
            "cannot fit with zero samples".into(),
        ));
    }
    if rows.len() != labels.len() {
        return Err(RecommendError::InvalidTrainingData(format!(
            "sample count {} does not match label count {}",
            rows.len(),
            labels.len()
        )));
    }
    Ok(())
}

/// 復元抽出による bootstrap 標本（決定論的: seed 固定）
fn bootstrap_sample(n_samples: usize, seed: u64) -> Vec<usize> {
    let distribution = Uniform::from(0..n_samples);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_samples)
        .map(|_| distribution.sample(&mut rng))
        .collect()
}

fn build_tree(
    rows: &[Vec<f32>],
    labels: &[usize],
    indices: &[usize],
    depth: usize,
    max_depth: Option<usize>,
) -> TreeNode {
    let first_label = labels[indices[0]];
    let is_pure = indices.iter().all(|&i| labels[i] == first_label);
    let depth_reached = max_depth.is_some_and(|limit| depth >= limit);
    if is_pure || depth_reached {
        return TreeNode::Leaf {
            class_label: majority_class(labels, indices),
        };
    }

    let Some((feature_index, threshold)) = find_best_split(rows, labels, indices) else {
        return TreeNode::Leaf {
            class_label: majority_class(labels, indices),
        };
    };

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| rows[i][feature_index] <= threshold);
    if left_indices.is_empty() || right_indices.is_empty() {
        return TreeNode::Leaf {
            class_label: majority_class(labels, indices),
        };
    }

    TreeNode::Node {
        feature_index,
        threshold,
        left: Box::new(build_tree(rows, labels, &left_indices, depth + 1, max_depth)),
        right: Box::new(build_tree(rows, labels, &right_indices, depth + 1, max_depth)),
    }
}

/// Gini 利得が正になる最良の (feature, threshold) を探す。
/// しきい値候補は各特徴のソート済みユニーク値（最大値は除く）。
fn find_best_split(
    rows: &[Vec<f32>],
    labels: &[usize],
    indices: &[usize],
) -> Option<(usize, f32)> {
    let n_features = rows[indices[0]].len();
    let parent_impurity = gini_impurity(labels, indices);
    let mut best: Option<(usize, f32, f32)> = None;

    for feature_index in 0..n_features {
        let mut values: Vec<f32> = indices.iter().map(|&i| rows[i][feature_index]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        values.dedup();
        if values.len() < 2 {
            continue;
        }

        for &threshold in &values[..values.len() - 1] {
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| rows[i][feature_index] <= threshold);
            let impurity = gini_split(labels, &left, &right);

            let improves = impurity + 1e-7 < parent_impurity;
            let beats_best = best.map_or(true, |(_, _, current)| impurity < current);
            if improves && beats_best {
                best = Some((feature_index, threshold, impurity));
            }
        }
    }

    best.map(|(feature_index, threshold, _)| (feature_index, threshold))
}

/// Gini = 1 - Σ p_i²
fn gini_impurity(labels: &[usize], indices: &[usize]) -> f32 {
    if indices.is_empty() {
        return 0.0;
    }
    let max_label = indices.iter().map(|&i| labels[i]).max().unwrap_or(0);
    let mut counts = vec![0usize; max_label + 1];
    for &i in indices {
        counts[labels[i]] += 1;
    }

    let n = indices.len() as f32;
    let mut gini = 1.0;
    for count in counts {
        let p = count as f32 / n;
        gini -= p * p;
    }
    gini
}

/// 分割後の加重 Gini 不純度
fn gini_split(labels: &[usize], left: &[usize], right: &[usize]) -> f32 {
    let n_left = left.len() as f32;
    let n_right = right.len() as f32;
    let n_total = n_left + n_right;
    if n_total == 0.0 {
        return 0.0;
    }

    (n_left / n_total) * gini_impurity(labels, left)
        + (n_right / n_total) * gini_impurity(labels, right)
}

/// 最多クラス（同数の場合は小さいクラス番号）
fn majority_class(labels: &[usize], indices: &[usize]) -> usize {
    let max_label = indices.iter().map(|&i| labels[i]).max().unwrap_or(0);
    let mut counts = vec![0usize; max_label + 1];
    for &i in indices {
        counts[labels[i]] += 1;
    }
    let mut best_class = 0;
    let mut best_count = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > best_count {
            best_count = count;
            best_class = class;
        }
    }
    best_class
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1次元のしきい値で完全に分離できるデータ
    fn separable_data() -> (Vec<Vec<f32>>, Vec<usize>) {
        let rows = vec![
            vec![0.0, 1.0],
            vec![0.2, 0.5],
            vec![0.4, 0.9],
            vec![2.0, 0.1],
            vec![2.5, 0.7],
            vec![3.0, 0.3],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        (rows, labels)
    }

    #[test]
    fn fit_rejects_empty_and_mismatched_input() {
        assert!(matches!(
            DecisionTree::fit(&[], &[], None),
            Err(RecommendError::InvalidTrainingData(_))
        ));
        assert!(matches!(
            DecisionTree::fit(&[vec![1.0]], &[0, 1], None),
            Err(RecommendError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn decision_tree_learns_a_threshold_split() {
        let (rows, labels) = separable_data();
        let tree = DecisionTree::fit(&rows, &labels, None).unwrap();

        assert_eq!(tree.predict_one(&[0.1, 0.5]), 0);
        assert_eq!(tree.predict_one(&[2.8, 0.5]), 1);
    }

    #[test]
    fn forest_predicts_separable_classes() {
        let (rows, labels) = separable_data();
        let forest = RandomForest::fit(&rows, &labels, &ForestConfig::default()).unwrap();

        assert_eq!(forest.predict(&rows), labels);
        assert_eq!(forest.n_classes(), 2);
    }

    #[test]
    fn predict_proba_rows_sum_to_one() {
        let (rows, labels) = separable_data();
        let forest = RandomForest::fit(&rows, &labels, &ForestConfig::default()).unwrap();

        for probabilities in forest.predict_proba(&rows) {
            let total: f32 = probabilities.iter().sum();
            assert!((total - 1.0).abs() < 1e-5);
            assert_eq!(probabilities.len(), 2);
        }
    }

    #[test]
    fn predict_proba_separates_classes_confidently() {
        let (rows, labels) = separable_data();
        let forest = RandomForest::fit(&rows, &labels, &ForestConfig::default()).unwrap();
        let probabilities = forest.predict_proba(&rows);

        assert!(probabilities[0][1] < 0.5);
        assert!(probabilities[5][1] > 0.5);
    }

    #[test]
    fn same_seed_produces_identical_forests() {
        let (rows, labels) = separable_data();
        let config = ForestConfig::default();

        let a = RandomForest::fit(&rows, &labels, &config).unwrap();
        let b = RandomForest::fit(&rows, &labels, &config).unwrap();

        assert_eq!(a.predict_proba(&rows), b.predict_proba(&rows));
    }

    #[test]
    fn single_class_labels_predict_that_class() {
        let rows = vec![vec![0.0], vec![1.0], vec![2.0]];
        let labels = vec![0, 0, 0];
        let forest = RandomForest::fit(&rows, &labels, &ForestConfig::default()).unwrap();

        assert_eq!(forest.predict(&rows), labels);
        assert_eq!(forest.n_classes(), 1);
    }

    #[test]
    fn max_depth_limits_tree_growth() {
        let (rows, labels) = separable_data();
        let tree = DecisionTree::fit(&rows, &labels, Some(0)).unwrap();

        // depth 0 → 根が葉になり、全行で多数クラスを返す
        let prediction = tree.predict_one(&rows[0]);
        assert!(rows.iter().all(|row| tree.predict_one(row) == prediction));
    }
}
