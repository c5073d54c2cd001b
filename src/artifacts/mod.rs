//! Model artifacts
//!
//! This module defines the classifier interface the prediction chain consumes,
//! the label tables that decode class indices, and the registry that owns the
//! loaded artifacts for the lifetime of the process.

mod forest;
mod registry;

pub use forest::{DecisionTree, ForestClassifier, TreeNode};
pub use registry::{
    ArtifactRegistry, ModelSpec, HABIT_LABELS, HABIT_SPEC, MOOD_LABELS, MOOD_SPEC, SLEEP_LABELS,
    SLEEP_SPEC,
};

use std::fmt;

use thiserror::Error;

/// Failure raised by a classifier while scoring a feature vector
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PredictionError(pub String);

/// A trained classifier returning a probability distribution over its classes.
///
/// Implementations must be re-entrant: the registry shares a single instance
/// across concurrent requests.
pub trait Predictor: Send + Sync {
    /// Width of the feature vector the model was trained on
    fn n_features(&self) -> usize;

    /// Number of classes in the probability output
    fn n_classes(&self) -> usize;

    /// Probability of each class, indexed by class id
    fn predict_probabilities(&self, features: &[f32]) -> Result<Vec<f64>, PredictionError>;
}

/// A classifier paired with its class-index to display-label table
pub struct ModelArtifact {
    name: String,
    predictor: Box<dyn Predictor>,
    labels: Vec<String>,
}

impl ModelArtifact {
    /// Pair a predictor with its labels; the label count must match the class count
    pub fn new(
        name: impl Into<String>,
        predictor: Box<dyn Predictor>,
        labels: Vec<String>,
    ) -> Result<Self, String> {
        let name = name.into();
        if labels.len() != predictor.n_classes() {
            return Err(format!(
                "{} model has {} classes but {} labels",
                name,
                predictor.n_classes(),
                labels.len()
            ));
        }
        Ok(Self {
            name,
            predictor,
            labels,
        })
    }

    /// Build an artifact from a forest, using the forest's own class list as labels
    pub fn from_forest(forest: ForestClassifier) -> Result<Self, String> {
        let name = forest.name.clone();
        let labels = forest.classes.clone();
        Self::new(name, Box::new(forest), labels)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Display label for a class index
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("name", &self.name)
            .field("n_features", &self.predictor.n_features())
            .field("labels", &self.labels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPredictor {
        probabilities: Vec<f64>,
    }

    impl Predictor for FixedPredictor {
        fn n_features(&self) -> usize {
            3
        }

        fn n_classes(&self) -> usize {
            self.probabilities.len()
        }

        fn predict_probabilities(&self, _features: &[f32]) -> Result<Vec<f64>, PredictionError> {
            Ok(self.probabilities.clone())
        }
    }

    #[test]
    fn test_artifact_rejects_label_count_mismatch() {
        let predictor = Box::new(FixedPredictor {
            probabilities: vec![0.2, 0.8],
        });
        let result = ModelArtifact::new("habit", predictor, vec!["Failure".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_artifact_label_lookup() {
        let predictor = Box::new(FixedPredictor {
            probabilities: vec![0.2, 0.8],
        });
        let artifact = ModelArtifact::new(
            "habit",
            predictor,
            vec!["Failure".to_string(), "Success".to_string()],
        )
        .unwrap();

        assert_eq!(artifact.label(1), Some("Success"));
        assert_eq!(artifact.label(2), None);
        assert_eq!(artifact.predictor().n_features(), 3);
    }
}
