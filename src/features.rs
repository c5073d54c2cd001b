//! Feature assembly
//!
//! This module turns a wellness snapshot, plus the confidences produced by
//! earlier chain stages, into the exact column layout each classifier was
//! trained on:
//! - Habit vector (10 columns)
//! - Mood vector (10 columns, habit confidence last)
//! - Sleep vector (9 columns, habit and mood confidences last)
//!
//! The models receive raw arrays with no embedded schema, so the column order
//! here is the contract. Values are cast to `f32` without any scaling.

use crate::chain::ChainState;
use crate::error::InsightError;
use crate::types::{Categorical, WellnessSnapshot};

/// Column order of the habit model
pub const HABIT_FEATURES: [&str; 10] = [
    "previous_habit_ratio",
    "sleep_hours",
    "sleep_quality",
    "water_liters",
    "steps",
    "calories",
    "protein",
    "carbs",
    "fat",
    "mood",
];

/// Column order of the mood model
pub const MOOD_FEATURES: [&str; 10] = [
    "sleep_hours",
    "sleep_quality",
    "water_liters",
    "steps",
    "activity_type",
    "calories",
    "protein",
    "carbs",
    "fat",
    "habit_confidence",
];

/// Column order of the sleep model
pub const SLEEP_FEATURES: [&str; 9] = [
    "steps",
    "activity_type",
    "water_liters",
    "calories",
    "protein",
    "carbs",
    "fat",
    "habit_confidence",
    "mood_confidence",
];

/// A typed feature record that flattens into one model's column layout
pub trait FeatureRecord {
    /// Model the record feeds
    const MODEL: &'static str;
    /// Column names in vector order
    const COLUMNS: &'static [&'static str];

    /// Values in [`FeatureRecord::COLUMNS`] order
    fn values(&self) -> Vec<f32>;
}

/// Inputs of the habit-success model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HabitFeatures {
    pub previous_habit_ratio: f32,
    pub sleep_hours: f32,
    pub sleep_quality: f32,
    pub water_liters: f32,
    pub steps: f32,
    pub calories: f32,
    pub protein: f32,
    pub carbs: f32,
    pub fat: f32,
    pub mood: f32,
}

impl FeatureRecord for HabitFeatures {
    const MODEL: &'static str = "habit";
    const COLUMNS: &'static [&'static str] = &HABIT_FEATURES;

    fn values(&self) -> Vec<f32> {
        vec![
            self.previous_habit_ratio,
            self.sleep_hours,
            self.sleep_quality,
            self.water_liters,
            self.steps,
            self.calories,
            self.protein,
            self.carbs,
            self.fat,
            self.mood,
        ]
    }
}

/// Inputs of the mood model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodFeatures {
    pub sleep_hours: f32,
    pub sleep_quality: f32,
    pub water_liters: f32,
    pub steps: f32,
    pub activity_type: f32,
    pub calories: f32,
    pub protein: f32,
    pub carbs: f32,
    pub fat: f32,
    pub habit_confidence: f32,
}

impl FeatureRecord for MoodFeatures {
    const MODEL: &'static str = "mood";
    const COLUMNS: &'static [&'static str] = &MOOD_FEATURES;

    fn values(&self) -> Vec<f32> {
        vec![
            self.sleep_hours,
            self.sleep_quality,
            self.water_liters,
            self.steps,
            self.activity_type,
            self.calories,
            self.protein,
            self.carbs,
            self.fat,
            self.habit_confidence,
        ]
    }
}

/// Inputs of the sleep-quality model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepFeatures {
    pub steps: f32,
    pub activity_type: f32,
    pub water_liters: f32,
    pub calories: f32,
    pub protein: f32,
    pub carbs: f32,
    pub fat: f32,
    pub habit_confidence: f32,
    pub mood_confidence: f32,
}

impl FeatureRecord for SleepFeatures {
    const MODEL: &'static str = "sleep";
    const COLUMNS: &'static [&'static str] = &SLEEP_FEATURES;

    fn values(&self) -> Vec<f32> {
        vec![
            self.steps,
            self.activity_type,
            self.water_liters,
            self.calories,
            self.protein,
            self.carbs,
            self.fat,
            self.habit_confidence,
            self.mood_confidence,
        ]
    }
}

/// Assembler for per-model feature records
pub struct FeatureAssembler;

impl FeatureAssembler {
    /// Habit features depend on the snapshot only
    pub fn habit(snapshot: &WellnessSnapshot) -> HabitFeatures {
        HabitFeatures {
            previous_habit_ratio: snapshot.previous_habit_ratio as f32,
            sleep_hours: snapshot.sleep_hours as f32,
            sleep_quality: f32::from(snapshot.sleep_quality.id()),
            water_liters: snapshot.water_liters as f32,
            steps: snapshot.steps as f32,
            calories: snapshot.calories as f32,
            protein: snapshot.protein as f32,
            carbs: snapshot.carbs as f32,
            fat: snapshot.fat as f32,
            mood: f32::from(snapshot.mood.id()),
        }
    }

    /// Mood features need the habit stage to have been scored
    pub fn mood(
        snapshot: &WellnessSnapshot,
        state: &ChainState,
    ) -> Result<MoodFeatures, InsightError> {
        let habit = state
            .habit
            .as_ref()
            .ok_or_else(|| missing_upstream(MoodFeatures::MODEL, "habit"))?;

        Ok(MoodFeatures {
            sleep_hours: snapshot.sleep_hours as f32,
            sleep_quality: f32::from(snapshot.sleep_quality.id()),
            water_liters: snapshot.water_liters as f32,
            steps: snapshot.steps as f32,
            activity_type: f32::from(snapshot.activity_type.id()),
            calories: snapshot.calories as f32,
            protein: snapshot.protein as f32,
            carbs: snapshot.carbs as f32,
            fat: snapshot.fat as f32,
            habit_confidence: habit.confidence as f32,
        })
    }

    /// Sleep features need both the habit and the mood stage to have been scored
    pub fn sleep(
        snapshot: &WellnessSnapshot,
        state: &ChainState,
    ) -> Result<SleepFeatures, InsightError> {
        let habit = state
            .habit
            .as_ref()
            .ok_or_else(|| missing_upstream(SleepFeatures::MODEL, "habit"))?;
        let mood = state
            .mood
            .as_ref()
            .ok_or_else(|| missing_upstream(SleepFeatures::MODEL, "mood"))?;

        Ok(SleepFeatures {
            steps: snapshot.steps as f32,
            activity_type: f32::from(snapshot.activity_type.id()),
            water_liters: snapshot.water_liters as f32,
            calories: snapshot.calories as f32,
            protein: snapshot.protein as f32,
            carbs: snapshot.carbs as f32,
            fat: snapshot.fat as f32,
            habit_confidence: habit.confidence as f32,
            mood_confidence: mood.confidence as f32,
        })
    }

    /// Flatten a record and check it against the width the model declares.
    ///
    /// A mismatch is an internal bug; the vector is never padded or truncated.
    pub fn vector<R: FeatureRecord>(
        record: &R,
        expected_width: usize,
    ) -> Result<Vec<f32>, InsightError> {
        let values = record.values();
        if values.len() != R::COLUMNS.len() || values.len() != expected_width {
            return Err(InsightError::FeatureShape {
                model: R::MODEL,
                reason: format!(
                    "assembled {} values for {} named columns, model expects {}",
                    values.len(),
                    R::COLUMNS.len(),
                    expected_width
                ),
            });
        }
        Ok(values)
    }
}

fn missing_upstream(model: &'static str, upstream: &str) -> InsightError {
    InsightError::FeatureShape {
        model,
        reason: format!("{upstream} confidence has not been computed"),
    }
}
