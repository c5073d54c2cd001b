//! Core types for the WellTrack Insight pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: the categorical encodings, the wellness snapshot, per-model
//! predictions, and the final recommendation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

/// Number of decimal places used when presenting a confidence externally
pub const CONFIDENCE_DECIMALS: i32 = 3;

/// A categorical value as sent by callers: either a display label or a raw enum id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoricalValue {
    Id(i64),
    Label(String),
}

impl From<&str> for CategoricalValue {
    fn from(label: &str) -> Self {
        CategoricalValue::Label(label.to_string())
    }
}

impl From<i64> for CategoricalValue {
    fn from(id: i64) -> Self {
        CategoricalValue::Id(id)
    }
}

/// Total encoding between display labels and the integer ids the models were trained on.
///
/// Unknown labels map to [`Categorical::DEFAULT`] instead of failing, because callers
/// may send either the canonical id or any display string. Numeric ids outside the
/// enum range are rejected since they cannot be a display variant.
pub trait Categorical: Sized + Copy + 'static {
    /// Variants in id order
    const ALL: &'static [Self];
    /// Variant used for unmapped labels
    const DEFAULT: Self;
    /// Name used in validation messages
    const FIELD: &'static str;

    fn as_str(&self) -> &'static str;

    fn id(&self) -> u8;

    fn from_id(id: i64) -> Option<Self> {
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(Self::DEFAULT)
    }

    fn resolve(value: &CategoricalValue) -> Result<Self, String> {
        match value {
            CategoricalValue::Label(label) => Ok(Self::from_label(label)),
            CategoricalValue::Id(id) => Self::from_id(*id).ok_or_else(|| {
                format!(
                    "{} id {} is out of range 0..={}",
                    Self::FIELD,
                    id,
                    Self::ALL.len() - 1
                )
            }),
        }
    }
}

/// Self-reported or predicted sleep quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepQuality {
    Poor,
    Average,
    Good,
}

impl Categorical for SleepQuality {
    const ALL: &'static [Self] = &[SleepQuality::Poor, SleepQuality::Average, SleepQuality::Good];
    const DEFAULT: Self = SleepQuality::Average;
    const FIELD: &'static str = "sleep_quality";

    fn as_str(&self) -> &'static str {
        match self {
            SleepQuality::Poor => "Poor",
            SleepQuality::Average => "Average",
            SleepQuality::Good => "Good",
        }
    }

    fn id(&self) -> u8 {
        *self as u8
    }
}

/// Mood category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Angry,
    Sad,
    Neutral,
    Relaxed,
    Happy,
}

impl Categorical for Mood {
    const ALL: &'static [Self] = &[
        Mood::Angry,
        Mood::Sad,
        Mood::Neutral,
        Mood::Relaxed,
        Mood::Happy,
    ];
    const DEFAULT: Self = Mood::Neutral;
    const FIELD: &'static str = "mood";

    fn as_str(&self) -> &'static str {
        match self {
            Mood::Angry => "Angry",
            Mood::Sad => "Sad",
            Mood::Neutral => "Neutral",
            Mood::Relaxed => "Relaxed",
            Mood::Happy => "Happy",
        }
    }

    fn id(&self) -> u8 {
        *self as u8
    }
}

/// Dominant activity of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Walking,
    Running,
    Cycling,
    Hiking,
}

impl Categorical for ActivityType {
    const ALL: &'static [Self] = &[
        ActivityType::Walking,
        ActivityType::Running,
        ActivityType::Cycling,
        ActivityType::Hiking,
    ];
    const DEFAULT: Self = ActivityType::Walking;
    const FIELD: &'static str = "activity_type";

    fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Walking => "Walking",
            ActivityType::Running => "Running",
            ActivityType::Cycling => "Cycling",
            ActivityType::Hiking => "Hiking",
        }
    }

    fn id(&self) -> u8 {
        *self as u8
    }
}

/// One day of a user's wellness telemetry, validated and typed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessSnapshot {
    /// Hours slept last night
    pub sleep_hours: f64,
    /// Self-reported sleep quality
    pub sleep_quality: SleepQuality,
    /// Water intake (liters)
    pub water_liters: f64,
    /// Step count for the day
    pub steps: u32,
    /// Dominant activity
    pub activity_type: ActivityType,
    /// Energy intake (kcal)
    pub calories: f64,
    /// Protein intake (grams)
    pub protein: f64,
    /// Carbohydrate intake (grams)
    pub carbs: f64,
    /// Fat intake (grams)
    pub fat: f64,
    /// Share of habits completed recently (0-1)
    pub previous_habit_ratio: f64,
    /// Current mood, used as a habit-model input
    pub mood: Mood,
    /// Step count reported inside the sleep context, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_steps_count: Option<u32>,
}

/// Output of a single classifier call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    /// Argmax class index
    pub class_index: usize,
    /// Display label of the argmax class
    pub label: String,
    /// Probability of the argmax class (0-1), full precision
    #[serde(serialize_with = "serialize_rounded")]
    pub confidence: f64,
    /// Full class distribution, indexed by class
    pub probabilities: Vec<f64>,
}

impl ModelPrediction {
    /// Confidence rounded for external presentation
    pub fn rounded_confidence(&self) -> f64 {
        round_confidence(self.confidence)
    }
}

/// Round a confidence to [`CONFIDENCE_DECIMALS`] places
pub fn round_confidence(value: f64) -> f64 {
    let factor = 10f64.powi(CONFIDENCE_DECIMALS);
    (value * factor).round() / factor
}

fn serialize_rounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_confidence(*value))
}

/// Final recommendation returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub summary: String,
    pub action_items: Vec<String>,
}

/// Short motivational message for a given day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMotivation {
    pub date: NaiveDate,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_labels_map_to_training_ids() {
        assert_eq!(SleepQuality::from_label("Poor").id(), 0);
        assert_eq!(SleepQuality::from_label("Average").id(), 1);
        assert_eq!(SleepQuality::from_label("Good").id(), 2);

        assert_eq!(Mood::from_label("Angry").id(), 0);
        assert_eq!(Mood::from_label("Sad").id(), 1);
        assert_eq!(Mood::from_label("Neutral").id(), 2);
        assert_eq!(Mood::from_label("Relaxed").id(), 3);
        assert_eq!(Mood::from_label("Happy").id(), 4);

        assert_eq!(ActivityType::from_label("Hiking").id(), 3);
    }

    #[test]
    fn test_unknown_labels_use_default() {
        assert_eq!(SleepQuality::from_label("Terrible"), SleepQuality::Average);
        assert_eq!(Mood::from_label("Ecstatic"), Mood::Neutral);
        assert_eq!(ActivityType::from_label("Swimming"), ActivityType::Walking);
        assert_eq!(Mood::from_label(""), Mood::Neutral);
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        assert_eq!(Mood::from_label("  sad "), Mood::Sad);
        assert_eq!(SleepQuality::from_label("GOOD"), SleepQuality::Good);
    }

    #[test]
    fn test_every_variant_round_trips_through_its_id() {
        for quality in SleepQuality::ALL {
            assert_eq!(SleepQuality::from_id(quality.id() as i64), Some(*quality));
            assert_eq!(SleepQuality::from_label(quality.as_str()), *quality);
        }
        for mood in Mood::ALL {
            assert_eq!(Mood::from_id(mood.id() as i64), Some(*mood));
            assert_eq!(Mood::from_label(mood.as_str()), *mood);
        }
    }

    #[test]
    fn test_resolve_rejects_out_of_range_ids() {
        assert_eq!(Mood::resolve(&CategoricalValue::Id(4)), Ok(Mood::Happy));
        assert!(Mood::resolve(&CategoricalValue::Id(5)).is_err());
        assert!(SleepQuality::resolve(&CategoricalValue::Id(-1)).is_err());
        assert_eq!(
            SleepQuality::resolve(&CategoricalValue::from("unknown")),
            Ok(SleepQuality::Average)
        );
    }

    #[test]
    fn test_categorical_value_accepts_int_or_string() {
        let id: CategoricalValue = serde_json::from_str("2").unwrap();
        let label: CategoricalValue = serde_json::from_str("\"Good\"").unwrap();
        assert_eq!(id, CategoricalValue::Id(2));
        assert_eq!(label, CategoricalValue::Label("Good".to_string()));
    }

    #[test]
    fn test_confidence_serializes_rounded() {
        let prediction = ModelPrediction {
            class_index: 1,
            label: "Sad".to_string(),
            confidence: 0.123456,
            probabilities: vec![0.1, 0.123456],
        };
        assert_eq!(prediction.rounded_confidence(), 0.123);

        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["confidence"], 0.123);
        assert_eq!(prediction.confidence, 0.123456);
    }
}
