//! Wire types for prediction requests and responses
//!
//! Categorical fields accept either a display label (`"Good"`) or the raw
//! integer id the models were trained on (`2`). Counts are read as signed
//! integers so negative values surface as validation errors, not parse errors.

use serde::{Deserialize, Serialize};

use crate::types::{round_confidence, CategoricalValue, ModelPrediction};

/// Combined request scored by the full habit, mood and sleep chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictAllRequest {
    #[serde(default)]
    pub habit: HabitContext,
    #[serde(default)]
    pub mood: MoodContext,
    #[serde(default)]
    pub sleep: SleepContext,
    pub steps: i64,
    pub water_liters: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitContext {
    #[serde(default)]
    pub previous_habit_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodContext {
    /// Current mood; absent means the default mood
    #[serde(default)]
    pub value: Option<CategoricalValue>,
    #[serde(default)]
    pub activity_type: Option<CategoricalValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepContext {
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub quality: Option<CategoricalValue>,
    #[serde(default)]
    pub steps_count: Option<i64>,
}

/// Standalone habit-success request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitRequest {
    pub previous_habit_ratio: f64,
    pub sleep_hours: f64,
    pub sleep_quality: CategoricalValue,
    pub water_liters: f64,
    pub steps_count: i64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub mood: CategoricalValue,
}

/// Standalone mood request; the caller's habit ratio stands in for the habit confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodRequest {
    pub sleep_hours: f64,
    pub sleep_quality: CategoricalValue,
    pub water_liters: f64,
    pub steps_count: i64,
    pub activity_type: CategoricalValue,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub habit_completion_ratio: f64,
}

/// Standalone sleep-quality request; the caller's habit ratio and mood id
/// stand in for the upstream confidences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRequest {
    pub steps_count: i64,
    pub activity_type: CategoricalValue,
    pub water_liters: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub habit_completion_ratio: f64,
    pub mood: CategoricalValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitResponse {
    /// Predicted class id (0 = Failure, 1 = Success)
    pub predicted_success: usize,
    pub confidence: f64,
}

impl From<&ModelPrediction> for HabitResponse {
    fn from(prediction: &ModelPrediction) -> Self {
        Self {
            predicted_success: prediction.class_index,
            confidence: round_confidence(prediction.confidence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodResponse {
    pub predicted_mood: String,
    pub confidence: f64,
}

impl From<&ModelPrediction> for MoodResponse {
    fn from(prediction: &ModelPrediction) -> Self {
        Self {
            predicted_mood: prediction.label.clone(),
            confidence: round_confidence(prediction.confidence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepResponse {
    pub predicted_sleep_quality: String,
    pub confidence: f64,
}

impl From<&ModelPrediction> for SleepResponse {
    fn from(prediction: &ModelPrediction) -> Self {
        Self {
            predicted_sleep_quality: prediction.label.clone(),
            confidence: round_confidence(prediction.confidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_combined_request_accepts_labels_and_ids() {
        let json = r#"{
            "habit": {"previous_habit_ratio": 0.6},
            "mood": {"value": "Sad", "activity_type": 1},
            "sleep": {"hours": 5.5, "quality": 0, "steps_count": 3200},
            "steps": 3200,
            "water_liters": 1.5,
            "calories": 2600,
            "protein": 50,
            "carbs": 380,
            "fat": 110
        }"#;
        let request: PredictAllRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.mood.value, Some(CategoricalValue::Label("Sad".to_string())));
        assert_eq!(request.mood.activity_type, Some(CategoricalValue::Id(1)));
        assert_eq!(request.sleep.quality, Some(CategoricalValue::Id(0)));
        assert_eq!(request.sleep.steps_count, Some(3200));
        assert_eq!(request.calories, 2600.0);
    }

    #[test]
    fn test_combined_request_contexts_may_be_sparse() {
        let json = r#"{
            "habit": {},
            "mood": {},
            "sleep": {"hours": 7},
            "steps": 8000,
            "water_liters": 2.5,
            "calories": 2000,
            "protein": 80,
            "carbs": 250,
            "fat": 60
        }"#;
        let request: PredictAllRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.habit.previous_habit_ratio, 0.0);
        assert_eq!(request.mood.value, None);
        assert_eq!(request.sleep.steps_count, None);
    }

    #[test]
    fn test_missing_top_level_field_is_rejected() {
        let json = r#"{"habit": {}, "mood": {}, "sleep": {}, "steps": 100}"#;
        assert!(serde_json::from_str::<PredictAllRequest>(json).is_err());
    }

    #[test]
    fn test_responses_round_confidence() {
        let prediction = ModelPrediction {
            class_index: 1,
            label: "Success".to_string(),
            confidence: 0.87654,
            probabilities: vec![0.12346, 0.87654],
        };
        let response = HabitResponse::from(&prediction);
        assert_eq!(response.predicted_success, 1);
        assert_eq!(response.confidence, 0.877);

        let json = serde_json::to_value(MoodResponse::from(&ModelPrediction {
            label: "Relaxed".to_string(),
            ..prediction
        }))
        .unwrap();
        assert_eq!(json["predicted_mood"], "Relaxed");
    }
}
