//! Adapter from wire requests to validated pipeline inputs
//!
//! Every numeric field is checked before any model runs: quantities must be
//! finite and non-negative, ratios must lie in [0, 1], counts must fit a u32,
//! and raw categorical ids must be in range.

use serde::de::DeserializeOwned;

use crate::error::InsightError;
use crate::features::{HabitFeatures, MoodFeatures, SleepFeatures};
use crate::schema::request::{HabitRequest, MoodRequest, PredictAllRequest, SleepRequest};
use crate::types::{
    ActivityType, Categorical, CategoricalValue, Mood, SleepQuality, WellnessSnapshot,
};

/// Adapter for converting requests into snapshots and feature records
pub struct RequestAdapter;

impl RequestAdapter {
    /// Parse a JSON request body
    pub fn parse<T: DeserializeOwned>(json: &str) -> Result<T, InsightError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate a combined request into a snapshot
    pub fn snapshot(request: &PredictAllRequest) -> Result<WellnessSnapshot, InsightError> {
        let sleep_steps_count = request
            .sleep
            .steps_count
            .map(|steps| count("sleep.steps_count", steps))
            .transpose()?;

        Ok(WellnessSnapshot {
            sleep_hours: quantity("sleep.hours", request.sleep.hours)?,
            sleep_quality: optional_category(request.sleep.quality.as_ref())?,
            water_liters: quantity("water_liters", request.water_liters)?,
            steps: count("steps", request.steps)?,
            activity_type: optional_category(request.mood.activity_type.as_ref())?,
            calories: quantity("calories", request.calories)?,
            protein: quantity("protein", request.protein)?,
            carbs: quantity("carbs", request.carbs)?,
            fat: quantity("fat", request.fat)?,
            previous_habit_ratio: ratio(
                "habit.previous_habit_ratio",
                request.habit.previous_habit_ratio,
            )?,
            mood: optional_category(request.mood.value.as_ref())?,
            sleep_steps_count,
        })
    }

    pub fn habit_features(request: &HabitRequest) -> Result<HabitFeatures, InsightError> {
        Ok(HabitFeatures {
            previous_habit_ratio: ratio("previous_habit_ratio", request.previous_habit_ratio)?
                as f32,
            sleep_hours: quantity("sleep_hours", request.sleep_hours)? as f32,
            sleep_quality: encoded::<SleepQuality>(&request.sleep_quality)?,
            water_liters: quantity("water_liters", request.water_liters)? as f32,
            steps: count("steps_count", request.steps_count)? as f32,
            calories: quantity("calories", request.calories)? as f32,
            protein: quantity("protein", request.protein)? as f32,
            carbs: quantity("carbs", request.carbs)? as f32,
            fat: quantity("fat", request.fat)? as f32,
            mood: encoded::<Mood>(&request.mood)?,
        })
    }

    pub fn mood_features(request: &MoodRequest) -> Result<MoodFeatures, InsightError> {
        Ok(MoodFeatures {
            sleep_hours: quantity("sleep_hours", request.sleep_hours)? as f32,
            sleep_quality: encoded::<SleepQuality>(&request.sleep_quality)?,
            water_liters: quantity("water_liters", request.water_liters)? as f32,
            steps: count("steps_count", request.steps_count)? as f32,
            activity_type: encoded::<ActivityType>(&request.activity_type)?,
            calories: quantity("calories", request.calories)? as f32,
            protein: quantity("protein", request.protein)? as f32,
            carbs: quantity("carbs", request.carbs)? as f32,
            fat: quantity("fat", request.fat)? as f32,
            habit_confidence: ratio("habit_completion_ratio", request.habit_completion_ratio)?
                as f32,
        })
    }

    pub fn sleep_features(request: &SleepRequest) -> Result<SleepFeatures, InsightError> {
        Ok(SleepFeatures {
            steps: count("steps_count", request.steps_count)? as f32,
            activity_type: encoded::<ActivityType>(&request.activity_type)?,
            water_liters: quantity("water_liters", request.water_liters)? as f32,
            calories: quantity("calories", request.calories)? as f32,
            protein: quantity("protein", request.protein)? as f32,
            carbs: quantity("carbs", request.carbs)? as f32,
            fat: quantity("fat", request.fat)? as f32,
            habit_confidence: ratio("habit_completion_ratio", request.habit_completion_ratio)?
                as f32,
            mood_confidence: encoded::<Mood>(&request.mood)?,
        })
    }
}

fn quantity(field: &str, value: f64) -> Result<f64, InsightError> {
    if !value.is_finite() {
        return Err(InsightError::Validation(format!("{field} must be a finite number")));
    }
    if value < 0.0 {
        return Err(InsightError::Validation(format!(
            "{field} must not be negative (got {value})"
        )));
    }
    Ok(value)
}

fn ratio(field: &str, value: f64) -> Result<f64, InsightError> {
    let value = quantity(field, value)?;
    if value > 1.0 {
        return Err(InsightError::Validation(format!(
            "{field} must be between 0 and 1 (got {value})"
        )));
    }
    Ok(value)
}

fn count(field: &str, value: i64) -> Result<u32, InsightError> {
    u32::try_from(value).map_err(|_| {
        InsightError::Validation(format!("{field} must be between 0 and {} (got {value})", u32::MAX))
    })
}

fn category<C: Categorical>(value: &CategoricalValue) -> Result<C, InsightError> {
    C::resolve(value).map_err(InsightError::Validation)
}

fn optional_category<C: Categorical>(value: Option<&CategoricalValue>) -> Result<C, InsightError> {
    value.map_or(Ok(C::DEFAULT), category::<C>)
}

fn encoded<C: Categorical>(value: &CategoricalValue) -> Result<f32, InsightError> {
    category::<C>(value).map(|c| f32::from(c.id()))
}
