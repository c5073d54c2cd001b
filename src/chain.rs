//! Prediction chain
//!
//! Runs the habit, mood and sleep classifiers in dependency order. The mood
//! model consumes the habit confidence and the sleep model consumes both, so
//! the intermediate state is kept in an explicit [`ChainState`] and each stage
//! refuses to run until its inputs exist.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::{ArtifactRegistry, ModelArtifact};
use crate::error::InsightError;
use crate::features::{FeatureAssembler, FeatureRecord};
use crate::types::{ModelPrediction, WellnessSnapshot};

/// Classifier stage of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Habit,
    Mood,
    Sleep,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Habit => "habit",
            Stage::Mood => "mood",
            Stage::Sleep => "sleep",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a chain run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStage {
    Idle,
    HabitScored,
    MoodScored,
    SleepScored,
    Complete,
}

/// Intermediate chain state; a slot is filled once its stage has succeeded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainState {
    pub habit: Option<ModelPrediction>,
    pub mood: Option<ModelPrediction>,
    pub sleep: Option<ModelPrediction>,
}

impl ChainState {
    /// Furthest stage reached, following the dependency order.
    ///
    /// A downstream slot filled while an upstream slot is empty holds a
    /// confidence the chain never computed, and is rejected.
    pub fn stage(&self) -> Result<ChainStage, InsightError> {
        match (&self.habit, &self.mood, &self.sleep) {
            (None, None, None) => Ok(ChainStage::Idle),
            (Some(_), None, None) => Ok(ChainStage::HabitScored),
            (Some(_), Some(_), None) => Ok(ChainStage::MoodScored),
            (Some(_), Some(_), Some(_)) => Ok(ChainStage::SleepScored),
            (None, Some(_), _) => Err(InsightError::FeatureShape {
                model: "mood",
                reason: "mood prediction present without a habit prediction".to_string(),
            }),
            (_, _, Some(_)) => Err(InsightError::FeatureShape {
                model: "sleep",
                reason: "sleep prediction present without its upstream predictions".to_string(),
            }),
        }
    }

    /// Finish the run; only a fully scored state can complete
    pub fn into_outcome(self) -> Option<ChainOutcome> {
        match (self.habit, self.mood, self.sleep) {
            (Some(habit), Some(mood), Some(sleep)) => Some(ChainOutcome { habit, mood, sleep }),
            _ => None,
        }
    }
}

/// Predictions of a completed chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainOutcome {
    pub habit: ModelPrediction,
    pub mood: ModelPrediction,
    pub sleep: ModelPrediction,
}

impl ChainOutcome {
    pub fn stage(&self) -> ChainStage {
        ChainStage::Complete
    }
}

/// Executes the classifier chain against a shared artifact registry
pub struct PredictionChain<'a> {
    registry: &'a ArtifactRegistry,
}

impl<'a> PredictionChain<'a> {
    pub fn new(registry: &'a ArtifactRegistry) -> Self {
        Self { registry }
    }

    /// Score all three stages. The first failure halts the chain.
    pub fn run(&self, snapshot: &WellnessSnapshot) -> Result<ChainOutcome, InsightError> {
        let mut state = ChainState::default();
        while state.stage()? != ChainStage::SleepScored {
            self.advance(snapshot, &mut state)?;
        }

        let outcome = state.into_outcome().ok_or_else(|| InsightError::StageFailure {
            stage: Stage::Sleep,
            reason: "chain ended without a sleep prediction".to_string(),
        })?;
        debug!(stage = ?outcome.stage(), "prediction chain finished");
        Ok(outcome)
    }

    /// Run the next pending stage and record its prediction in `state`
    pub fn advance(
        &self,
        snapshot: &WellnessSnapshot,
        state: &mut ChainState,
    ) -> Result<ChainStage, InsightError> {
        match state.stage()? {
            ChainStage::Idle => {
                let features = FeatureAssembler::habit(snapshot);
                state.habit = Some(self.score(Stage::Habit, &features)?);
            }
            ChainStage::HabitScored => {
                let features = FeatureAssembler::mood(snapshot, state)?;
                state.mood = Some(self.score(Stage::Mood, &features)?);
            }
            ChainStage::MoodScored => {
                let features = FeatureAssembler::sleep(snapshot, state)?;
                state.sleep = Some(self.score(Stage::Sleep, &features)?);
            }
            ChainStage::SleepScored | ChainStage::Complete => {}
        }
        state.stage()
    }

    /// Score a single feature record with the model of `stage`
    pub fn score<R: FeatureRecord>(
        &self,
        stage: Stage,
        features: &R,
    ) -> Result<ModelPrediction, InsightError> {
        let artifact = self.registry.for_stage(stage);
        let vector = FeatureAssembler::vector(features, artifact.predictor().n_features())?;
        let prediction = classify(stage, artifact, &vector)?;
        debug!(
            stage = %stage,
            model = artifact.name(),
            label = %prediction.label,
            confidence = prediction.confidence,
            "stage scored"
        );
        Ok(prediction)
    }
}

/// Call the classifier and decode its argmax class
fn classify(
    stage: Stage,
    artifact: &ModelArtifact,
    vector: &[f32],
) -> Result<ModelPrediction, InsightError> {
    let failure = |reason: String| InsightError::StageFailure { stage, reason };

    let probabilities = artifact
        .predictor()
        .predict_probabilities(vector)
        .map_err(|e| failure(e.to_string()))?;

    if probabilities.len() != artifact.labels().len() {
        return Err(failure(format!(
            "model returned {} probabilities for {} labels",
            probabilities.len(),
            artifact.labels().len()
        )));
    }
    if let Some(p) = probabilities.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(failure(format!("model returned a probability outside [0, 1]: {p}")));
    }

    let class_index = argmax(&probabilities)
        .ok_or_else(|| failure("model returned an empty distribution".to_string()))?;
    let label = artifact
        .label(class_index)
        .ok_or_else(|| failure(format!("no label for class {class_index}")))?
        .to_string();
    let confidence = probabilities[class_index];

    Ok(ModelPrediction {
        class_index,
        label,
        confidence,
        probabilities,
    })
}

/// Index of the largest value; ties resolve to the lowest index
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
