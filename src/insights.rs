//! Rule-based insights
//!
//! Derives an ordered list of observations from the chain predictions and the
//! raw snapshot metrics. Rules are evaluated in a fixed order, independently
//! of each other, and the resulting order becomes the prompt context order.

use serde::{Deserialize, Serialize};

use crate::artifacts::HABIT_LABELS;
use crate::chain::ChainOutcome;
use crate::types::{Categorical, ModelPrediction, Mood, SleepQuality, WellnessSnapshot};

/// Habit success probability below which the habit insight fires
pub const HABIT_SUCCESS_FLOOR: f64 = 0.4;
/// Daily step count below which the step insights fire
pub const LOW_STEPS_THRESHOLD: u32 = 5000;
/// Water intake (liters) below which the hydration insight fires
pub const LOW_WATER_LITERS: f64 = 2.0;
/// Protein intake (grams) below which the protein insight fires
pub const LOW_PROTEIN_GRAMS: f64 = 60.0;
/// Carbohydrate intake (grams) above which the carb insight fires
pub const HIGH_CARBS_GRAMS: f64 = 350.0;
/// Fat intake (grams) above which the fat insight fires
pub const HIGH_FAT_GRAMS: f64 = 100.0;

/// Label of the positive class of the habit model
pub const HABIT_SUCCESS_LABEL: &str = HABIT_LABELS[1];
/// Moods that count as negative
pub const NEGATIVE_MOODS: [Mood; 2] = [Mood::Sad, Mood::Angry];

/// Which rule produced an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    LowHabitSuccess,
    PoorSleep,
    LowSleepContextSteps,
    NegativeMood,
    LowHydration,
    LowProtein,
    HighCarbs,
    HighFat,
    LowSteps,
}

/// A single rule-derived observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
}

/// Ordered insights of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsightSet(Vec<Insight>);

impl InsightSet {
    pub fn iter(&self) -> impl Iterator<Item = &Insight> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> Vec<InsightKind> {
        self.0.iter().map(|i| i.kind).collect()
    }

    pub fn contains(&self, kind: InsightKind) -> bool {
        self.0.iter().any(|i| i.kind == kind)
    }

    /// Insight texts in rule order
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|i| i.message.clone()).collect()
    }

    fn push(&mut self, kind: InsightKind, message: String) {
        self.0.push(Insight { kind, message });
    }
}

/// Deterministic rule engine; no I/O, no shared state
pub struct InsightRuleEngine;

impl InsightRuleEngine {
    /// Evaluate every rule in order
    pub fn evaluate(outcome: &ChainOutcome, snapshot: &WellnessSnapshot) -> InsightSet {
        let mut insights = InsightSet::default();

        if habit_success_probability(&outcome.habit) < HABIT_SUCCESS_FLOOR {
            insights.push(
                InsightKind::LowHabitSuccess,
                "Your habit success probability is low tomorrow".to_string(),
            );
        }

        if SleepQuality::from_label(&outcome.sleep.label) == SleepQuality::Poor {
            insights.push(
                InsightKind::PoorSleep,
                format!(
                    "Your predicted sleep quality is poor ({:.2} confidence)",
                    outcome.sleep.confidence
                ),
            );
        }

        // The sleep context may omit its step count; absent counts as zero
        if snapshot.sleep_steps_count.unwrap_or(0) < LOW_STEPS_THRESHOLD {
            insights.push(
                InsightKind::LowSleepContextSteps,
                "Your daily steps are low, which may affect energy levels".to_string(),
            );
        }

        let mood = Mood::from_label(&outcome.mood.label);
        if NEGATIVE_MOODS.contains(&mood) {
            insights.push(
                InsightKind::NegativeMood,
                format!("Mood is negative: {}", mood.as_str()),
            );
        }

        if snapshot.water_liters < LOW_WATER_LITERS {
            insights.push(
                InsightKind::LowHydration,
                format!("Water intake is low ({}L)", quantity(snapshot.water_liters)),
            );
        }

        if snapshot.protein < LOW_PROTEIN_GRAMS {
            insights.push(
                InsightKind::LowProtein,
                format!("Protein intake is insufficient ({}g)", quantity(snapshot.protein)),
            );
        }

        if snapshot.carbs > HIGH_CARBS_GRAMS {
            insights.push(
                InsightKind::HighCarbs,
                format!(
                    "High carbohydrate intake ({}g) — may affect energy and mood",
                    quantity(snapshot.carbs)
                ),
            );
        }

        if snapshot.fat > HIGH_FAT_GRAMS {
            insights.push(
                InsightKind::HighFat,
                format!(
                    "High fat intake ({}g) — consider lighter meals",
                    quantity(snapshot.fat)
                ),
            );
        }

        if snapshot.steps < LOW_STEPS_THRESHOLD {
            insights.push(
                InsightKind::LowSteps,
                format!("Daily steps are low ({}) — try to move more", snapshot.steps),
            );
        }

        insights
    }
}

/// Probability that tomorrow's habits succeed, derived from the binary habit prediction
pub fn habit_success_probability(habit: &ModelPrediction) -> f64 {
    if habit.label == HABIT_SUCCESS_LABEL {
        habit.confidence
    } else {
        1.0 - habit.confidence
    }
}

/// Render a quantity with at least one decimal place
fn quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
