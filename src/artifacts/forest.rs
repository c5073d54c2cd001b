//! Random-forest classifier artifacts
//!
//! Forests are exported from the training pipeline as JSON. Each tree is a flat
//! node list in depth-first order; a split sends a sample left when
//! `feature <= threshold`, and a leaf carries per-class sample weights.
//! Class probabilities are the mean of every tree's normalized leaf distribution.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{PredictionError, Predictor};

/// A node of a decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// A single decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk the tree and return the normalized class distribution of the reached leaf
    fn leaf_distribution(&self, features: &[f32]) -> Result<Vec<f64>, PredictionError> {
        let mut index = 0;
        // Children always follow their parent, so a walk visits at most nodes.len() nodes
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).copied().ok_or_else(|| {
                        PredictionError(format!("split references missing feature {feature}"))
                    })?;
                    index = if f64::from(x) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Some(TreeNode::Leaf { value }) => {
                    let total: f64 = value.iter().sum();
                    if total <= 0.0 {
                        return Err(PredictionError("leaf has no class weight".to_string()));
                    }
                    return Ok(value.iter().map(|v| v / total).collect());
                }
                None => {
                    return Err(PredictionError(format!("node {index} does not exist")));
                }
            }
        }
        Err(PredictionError("tree walk did not reach a leaf".to_string()))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {index} splits on feature {feature} but the model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {index} has a non-finite threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("node {index} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {index} has {} class weights, expected {n_classes}",
                            value.len()
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(format!("leaf {index} has an invalid class weight"));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(format!("leaf {index} has no class weight"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Ensemble of decision trees with a shared class list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestClassifier {
    /// Model name (habit, mood, sleep)
    pub name: String,
    /// Feature vector width
    pub n_features: usize,
    /// Class display labels, indexed by class id
    pub classes: Vec<String>,
    /// Trees of the ensemble
    pub trees: Vec<DecisionTree>,
}

impl ForestClassifier {
    /// Parse and validate a forest from JSON
    pub fn from_json(json: &str) -> Result<Self, String> {
        let forest: ForestClassifier =
            serde_json::from_str(json).map_err(|e| format!("invalid forest JSON: {e}"))?;
        forest.validate()?;
        Ok(forest)
    }

    /// Read, parse and validate a forest file
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| format!("cannot read file: {e}"))?;
        Self::from_json(&content)
    }

    /// Check structural invariants so prediction cannot loop or index out of bounds
    pub fn validate(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("forest declares zero features".to_string());
        }
        if self.classes.is_empty() {
            return Err("forest declares no classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

impl Predictor for ForestClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.classes.len()
    }

    fn predict_probabilities(&self, features: &[f32]) -> Result<Vec<f64>, PredictionError> {
        if features.len() != self.n_features {
            return Err(PredictionError(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let distribution = tree.leaf_distribution(features)?;
            for (total, p) in totals.iter_mut().zip(distribution) {
                *total += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n_trees).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stump(feature: usize, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: left },
                TreeNode::Leaf { value: right },
            ],
        }
    }

    fn two_tree_forest() -> ForestClassifier {
        ForestClassifier {
            name: "habit".to_string(),
            n_features: 2,
            classes: vec!["Failure".to_string(), "Success".to_string()],
            trees: vec![
                stump(0, 0.5, vec![8.0, 2.0], vec![1.0, 9.0]),
                stump(1, 7.0, vec![3.0, 1.0], vec![0.0, 4.0]),
            ],
        }
    }

    #[test]
    fn test_probabilities_average_normalized_leaves() {
        let forest = two_tree_forest();

        // tree 1 goes left (0.8, 0.2), tree 2 goes left (0.75, 0.25)
        let probs = forest.predict_probabilities(&[0.2, 5.0]).unwrap();
        assert!((probs[0] - 0.775).abs() < 1e-9);
        assert!((probs[1] - 0.225).abs() < 1e-9);

        // tree 1 goes right (0.1, 0.9), tree 2 goes right (0.0, 1.0)
        let probs = forest.predict_probabilities(&[0.9, 8.0]).unwrap();
        assert!((probs[0] - 0.05).abs() < 1e-9);
        assert!((probs[1] - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_inclusive_on_the_left() {
        let forest = two_tree_forest();
        let probs = forest.predict_probabilities(&[0.5, 7.0]).unwrap();
        assert!((probs[0] - 0.775).abs() < 1e-9);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let forest = two_tree_forest();
        for features in [[0.0, 0.0], [1.0, 10.0], [0.3, 9.0]] {
            let probs = forest.predict_probabilities(&features).unwrap();
            assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_wrong_feature_count_is_rejected() {
        let forest = two_tree_forest();
        assert!(forest.predict_probabilities(&[0.1]).is_err());
    }

    #[test]
    fn test_from_json_parses_split_and_leaf_nodes() {
        let json = r#"{
            "name": "sleep",
            "n_features": 1,
            "classes": ["Poor", "Average", "Good"],
            "trees": [{
                "nodes": [
                    {"feature": 0, "threshold": 5000.0, "left": 1, "right": 2},
                    {"value": [6.0, 3.0, 1.0]},
                    {"value": [0.0, 2.0, 8.0]}
                ]
            }]
        }"#;

        let forest = ForestClassifier::from_json(json).unwrap();
        assert_eq!(forest.trees[0].nodes.len(), 3);
        assert_eq!(
            forest.predict_probabilities(&[2000.0]).unwrap(),
            vec![0.6, 0.3, 0.1]
        );
    }

    #[test]
    fn test_validation_rejects_backward_child() {
        let mut forest = two_tree_forest();
        forest.trees[0].nodes[0] = TreeNode::Split {
            feature: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
        };
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_feature_and_leaf_width() {
        let mut forest = two_tree_forest();
        forest.trees[1] = stump(5, 1.0, vec![1.0, 1.0], vec![1.0, 1.0]);
        assert!(forest.validate().is_err());

        let mut forest = two_tree_forest();
        forest.trees[1] = stump(0, 1.0, vec![1.0, 1.0, 1.0], vec![1.0, 1.0]);
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_forest() {
        let mut forest = two_tree_forest();
        forest.trees.clear();
        assert!(forest.validate().is_err());
    }
}
