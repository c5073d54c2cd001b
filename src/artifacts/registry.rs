//! Artifact registry
//!
//! Loads the habit, mood and sleep classifiers once at startup and hands them
//! out read-only. A registry only exists if every artifact loaded and matched
//! the feature layout the chain assembles.

use std::path::Path;

use tracing::info;

use super::{ForestClassifier, ModelArtifact};
use crate::chain::Stage;
use crate::error::InsightError;
use crate::features::{HABIT_FEATURES, MOOD_FEATURES, SLEEP_FEATURES};

/// Expected shape of one model artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub stage: Stage,
    pub file_name: &'static str,
    pub n_features: usize,
    /// Display labels in class-index order; the insight rules match on these
    pub labels: &'static [&'static str],
}

impl ModelSpec {
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }
}

pub const HABIT_LABELS: [&str; 2] = ["Failure", "Success"];

/// Mood classes in label-encoder (alphabetical) order
pub const MOOD_LABELS: [&str; 5] = ["Angry", "Happy", "Neutral", "Relaxed", "Sad"];

pub const SLEEP_LABELS: [&str; 3] = ["Poor", "Average", "Good"];

pub const HABIT_SPEC: ModelSpec = ModelSpec {
    stage: Stage::Habit,
    file_name: "habit_model.json",
    n_features: HABIT_FEATURES.len(),
    labels: &HABIT_LABELS,
};

pub const MOOD_SPEC: ModelSpec = ModelSpec {
    stage: Stage::Mood,
    file_name: "mood_model.json",
    n_features: MOOD_FEATURES.len(),
    labels: &MOOD_LABELS,
};

pub const SLEEP_SPEC: ModelSpec = ModelSpec {
    stage: Stage::Sleep,
    file_name: "sleep_model.json",
    n_features: SLEEP_FEATURES.len(),
    labels: &SLEEP_LABELS,
};

/// Immutable set of loaded classifiers, shared across requests
#[derive(Debug)]
pub struct ArtifactRegistry {
    habit: ModelArtifact,
    mood: ModelArtifact,
    sleep: ModelArtifact,
}

impl ArtifactRegistry {
    /// Load all three forests from `dir`
    pub fn load(dir: &Path) -> Result<Self, InsightError> {
        let habit = load_forest(dir, &HABIT_SPEC)?;
        let mood = load_forest(dir, &MOOD_SPEC)?;
        let sleep = load_forest(dir, &SLEEP_SPEC)?;
        let registry = Self::from_artifacts(habit, mood, sleep)?;
        info!(dir = %dir.display(), "model artifacts loaded");
        Ok(registry)
    }

    /// Assemble a registry from already-built artifacts, checking their shapes
    pub fn from_artifacts(
        habit: ModelArtifact,
        mood: ModelArtifact,
        sleep: ModelArtifact,
    ) -> Result<Self, InsightError> {
        check_shape(&habit, &HABIT_SPEC)?;
        check_shape(&mood, &MOOD_SPEC)?;
        check_shape(&sleep, &SLEEP_SPEC)?;
        Ok(Self { habit, mood, sleep })
    }

    pub fn habit(&self) -> &ModelArtifact {
        &self.habit
    }

    pub fn mood(&self) -> &ModelArtifact {
        &self.mood
    }

    pub fn sleep(&self) -> &ModelArtifact {
        &self.sleep
    }

    /// Artifact serving the given chain stage
    pub fn for_stage(&self, stage: Stage) -> &ModelArtifact {
        match stage {
            Stage::Habit => &self.habit,
            Stage::Mood => &self.mood,
            Stage::Sleep => &self.sleep,
        }
    }
}

fn load_forest(dir: &Path, spec: &ModelSpec) -> Result<ModelArtifact, InsightError> {
    let path = dir.join(spec.file_name);
    let to_error = |reason: String| InsightError::ArtifactLoad {
        path: path.clone(),
        reason,
    };

    let forest = ForestClassifier::from_path(&path).map_err(to_error)?;
    ModelArtifact::from_forest(forest).map_err(to_error)
}

fn check_shape(artifact: &ModelArtifact, spec: &ModelSpec) -> Result<(), InsightError> {
    let predictor = artifact.predictor();
    let reason = if predictor.n_features() != spec.n_features {
        Some(format!(
            "{} model expects {} features, the {} layout has {}",
            spec.stage,
            predictor.n_features(),
            spec.stage,
            spec.n_features
        ))
    } else if predictor.n_classes() != spec.n_classes() {
        Some(format!(
            "{} model has {} classes, expected {}",
            spec.stage,
            predictor.n_classes(),
            spec.n_classes()
        ))
    } else if artifact.labels().iter().map(String::as_str).ne(spec.labels.iter().copied()) {
        Some(format!(
            "{} model has classes {:?}, expected {:?}",
            spec.stage,
            artifact.labels(),
            spec.labels
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(InsightError::ArtifactLoad {
            path: spec.file_name.into(),
            reason,
        }),
        None => Ok(()),
    }
}
