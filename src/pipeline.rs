//! Pipeline orchestration
//!
//! This module provides the public API for WellTrack Insight. It composes the
//! stages of one request in sequence:
//! 1. RequestAdapter - Validate the request into a snapshot
//! 2. PredictionChain - Score habit, mood and sleep in dependency order
//! 3. InsightRuleEngine - Derive ordered insights
//! 4. RecommendationSynthesizer - Turn insights into a recommendation
//!
//! Validation, artifact and stage errors are returned to the caller. A
//! synthesis failure is not: the pipeline degrades to a rule-only
//! recommendation built from the insights.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::artifacts::ArtifactRegistry;
use crate::chain::{PredictionChain, Stage};
use crate::error::InsightError;
use crate::insights::{InsightRuleEngine, InsightSet};
use crate::schema::{
    HabitRequest, HabitResponse, MoodRequest, MoodResponse, PredictAllRequest, RequestAdapter,
    SleepRequest, SleepResponse,
};
use crate::synthesis::{
    fallback_recommendation, RecommendationSynthesizer, RetryConfig, TextGenerator,
};
use crate::types::{DailyMotivation, ModelPrediction, Recommendation, WellnessSnapshot};

/// Full trace of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub habit: ModelPrediction,
    pub mood: ModelPrediction,
    pub sleep: ModelPrediction,
    pub insights: InsightSet,
    pub recommendation: Recommendation,
    /// True when the recommendation is the rule-only fallback
    pub degraded: bool,
}

/// Shared, request-independent pipeline.
///
/// Holds the immutable artifact registry and the text generator; every call
/// works on fresh per-request state, so one instance can serve many threads.
pub struct WellnessPipeline {
    registry: ArtifactRegistry,
    generator: Box<dyn TextGenerator>,
    retry: RetryConfig,
}

impl WellnessPipeline {
    pub fn new(
        registry: ArtifactRegistry,
        generator: Box<dyn TextGenerator>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            registry,
            generator,
            retry,
        }
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    fn synthesizer(&self) -> RecommendationSynthesizer<'_> {
        RecommendationSynthesizer::new(self.generator.as_ref(), &self.retry)
    }

    /// Run the chain, the rules and the synthesis for one snapshot
    pub fn run(&self, snapshot: &WellnessSnapshot) -> Result<PipelineReport, InsightError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);
        let _guard = span.enter();

        let outcome = PredictionChain::new(&self.registry).run(snapshot)?;
        let insights = InsightRuleEngine::evaluate(&outcome, snapshot);

        let (recommendation, degraded) = match self.synthesizer().synthesize(&insights) {
            Ok(recommendation) => (recommendation, false),
            Err(e) => {
                warn!(error = %e, "synthesis unavailable, using rule-only recommendation");
                (fallback_recommendation(&insights), true)
            }
        };

        info!(
            habit = %outcome.habit.label,
            mood = %outcome.mood.label,
            sleep = %outcome.sleep.label,
            insights = insights.len(),
            degraded,
            "pipeline run complete"
        );

        Ok(PipelineReport {
            run_id,
            habit: outcome.habit,
            mood: outcome.mood,
            sleep: outcome.sleep,
            insights,
            recommendation,
            degraded,
        })
    }

    /// Validate a combined request and run the full pipeline
    pub fn report(&self, request: &PredictAllRequest) -> Result<PipelineReport, InsightError> {
        let snapshot = RequestAdapter::snapshot(request)?;
        self.run(&snapshot)
    }

    /// Combined prediction returning only the recommendation
    pub fn predict_all(&self, request: &PredictAllRequest) -> Result<Recommendation, InsightError> {
        Ok(self.report(request)?.recommendation)
    }

    /// Combined prediction from a JSON request body to a JSON recommendation
    pub fn predict_all_json(&self, json: &str) -> Result<String, InsightError> {
        let request: PredictAllRequest = RequestAdapter::parse(json)?;
        let recommendation = self.predict_all(&request)?;
        Ok(serde_json::to_string(&recommendation)?)
    }

    /// Score the habit model alone
    pub fn predict_habit(&self, request: &HabitRequest) -> Result<HabitResponse, InsightError> {
        let features = RequestAdapter::habit_features(request)?;
        let prediction = PredictionChain::new(&self.registry).score(Stage::Habit, &features)?;
        Ok(HabitResponse::from(&prediction))
    }

    /// Score the mood model alone
    pub fn predict_mood(&self, request: &MoodRequest) -> Result<MoodResponse, InsightError> {
        let features = RequestAdapter::mood_features(request)?;
        let prediction = PredictionChain::new(&self.registry).score(Stage::Mood, &features)?;
        Ok(MoodResponse::from(&prediction))
    }

    /// Score the sleep-quality model alone
    pub fn predict_sleep(&self, request: &SleepRequest) -> Result<SleepResponse, InsightError> {
        let features = RequestAdapter::sleep_features(request)?;
        let prediction = PredictionChain::new(&self.registry).score(Stage::Sleep, &features)?;
        Ok(SleepResponse::from(&prediction))
    }

    /// Motivational message for `date`; failures are returned, there is no fallback
    pub fn daily_motivation(&self, date: NaiveDate) -> Result<DailyMotivation, InsightError> {
        Ok(self.synthesizer().daily_motivation(date)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::tests::stub_registry;
    use crate::error::SynthesisError;
    use crate::insights::InsightKind;
    use crate::synthesis::tests::{fast_retry, ScriptedGenerator};
    use crate::insights::habit_success_probability;
    use crate::synthesis::{FALLBACK_SUMMARY, NO_SUMMARY};
    use crate::types::CategoricalValue;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    /// Habit 0.3 success, mood Sad, sleep Poor
    fn gloomy_registry() -> ArtifactRegistry {
        stub_registry(
            vec![0.7, 0.3],
            vec![0.05, 0.05, 0.1, 0.1, 0.7],
            vec![0.8, 0.1, 0.1],
        )
    }

    fn gloomy_request() -> PredictAllRequest {
        RequestAdapter::parse(
            r#"{
                "habit": {"previous_habit_ratio": 0.2},
                "mood": {"value": "Sad", "activity_type": "Walking"},
                "sleep": {"hours": 4, "quality": "Poor"},
                "steps": 2000,
                "water_liters": 1.0,
                "calories": 1800,
                "protein": 45,
                "carbs": 380,
                "fat": 110
            }"#,
        )
        .unwrap()
    }

    /// Generator shared with the test so call counts stay observable
    struct Shared(Arc<ScriptedGenerator>);

    impl TextGenerator for Shared {
        fn name(&self) -> &str {
            self.0.name()
        }

        fn generate(
            &self,
            prompt: &str,
            temperature: f32,
            max_tokens: u32,
        ) -> Result<String, SynthesisError> {
            self.0.generate(prompt, temperature, max_tokens)
        }
    }

    fn pipeline_with(generator: ScriptedGenerator) -> (WellnessPipeline, Arc<ScriptedGenerator>) {
        let generator = Arc::new(generator);
        let pipeline = WellnessPipeline::new(
            gloomy_registry(),
            Box::new(Shared(Arc::clone(&generator))),
            fast_retry(),
        );
        (pipeline, generator)
    }

    #[test]
    fn test_end_to_end_gloomy_day() {
        let reply = "Tomorrow could be tough, but small changes help.\n\
                     - Drink at least 2 liters of water\n\
                     - Add lean protein to every meal\n\
                     - Take a short walk after lunch\n\
                     - Go to bed 30 minutes earlier";
        let (pipeline, generator) = pipeline_with(ScriptedGenerator::replying(reply));

        let report = pipeline.report(&gloomy_request()).unwrap();

        assert_eq!(report.habit.label, "Failure");
        assert!(habit_success_probability(&report.habit) < 0.4);
        assert_eq!(report.mood.label, "Sad");
        assert_eq!(report.mood.class_index, 4);
        assert_eq!(report.sleep.label, "Poor");
        assert_eq!(
            report.insights.kinds(),
            vec![
                InsightKind::LowHabitSuccess,
                InsightKind::PoorSleep,
                InsightKind::LowSleepContextSteps,
                InsightKind::NegativeMood,
                InsightKind::LowHydration,
                InsightKind::LowProtein,
                InsightKind::HighCarbs,
                InsightKind::HighFat,
                InsightKind::LowSteps,
            ]
        );
        assert!(!report.degraded);
        assert_eq!(
            report.recommendation.summary,
            "Tomorrow could be tough, but small changes help."
        );
        assert_eq!(report.recommendation.action_items.len(), 4);
        assert_eq!(generator.calls(), 1);

        let (prompt, _, _) = generator.last_prompt().unwrap();
        assert!(prompt.contains("Mood is negative: Sad"));
        assert!(prompt.contains("Water intake is low (1.0L)"));
        assert!(prompt.contains("Daily steps are low (2000) — try to move more"));
    }

    #[test]
    fn test_empty_reply_is_parsed_not_degraded() {
        let (pipeline, generator) = pipeline_with(ScriptedGenerator::replying(""));

        let report = pipeline.report(&gloomy_request()).unwrap();
        assert!(!report.degraded);
        assert_eq!(
            report.recommendation,
            Recommendation {
                summary: NO_SUMMARY.to_string(),
                action_items: vec![],
            }
        );
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn test_synthesis_failure_degrades_to_rules() {
        let (pipeline, generator) = pipeline_with(ScriptedGenerator::failing(
            SynthesisError::Api {
                status: 503,
                message: "overloaded".to_string(),
            },
        ));

        let report = pipeline.report(&gloomy_request()).unwrap();
        assert!(report.degraded);
        assert_eq!(report.recommendation.summary, FALLBACK_SUMMARY);
        assert_eq!(
            report.recommendation.action_items,
            report.insights.messages()[..5].to_vec()
        );
        // one retry for a transient failure
        assert_eq!(generator.calls(), 2);
    }

    #[test]
    fn test_permanent_synthesis_failure_is_not_retried() {
        let (pipeline, generator) =
            pipeline_with(ScriptedGenerator::failing(SynthesisError::MissingApiKey(
                "GROQ_API_KEY".to_string(),
            )));

        let recommendation = pipeline.predict_all(&gloomy_request()).unwrap();
        assert_eq!(recommendation.summary, FALLBACK_SUMMARY);
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn test_invalid_request_never_reaches_synthesis() {
        let (pipeline, generator) = pipeline_with(ScriptedGenerator::replying("unused"));
        let mut request = gloomy_request();
        request.fat = -3.0;

        let err = pipeline.predict_all(&request).unwrap_err();
        assert!(matches!(err, InsightError::Validation(_)));
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn test_predict_all_json() {
        let (pipeline, _) = pipeline_with(ScriptedGenerator::replying("Summary only"));
        let json = serde_json::to_string(&gloomy_request()).unwrap();

        let output: Recommendation =
            serde_json::from_str(&pipeline.predict_all_json(&json).unwrap()).unwrap();
        assert_eq!(output.summary, "Summary only");
        assert!(output.action_items.is_empty());

        assert!(matches!(
            pipeline.predict_all_json("{not json"),
            Err(InsightError::Json(_))
        ));
    }

    #[test]
    fn test_report_serializes_rounded_confidence() {
        let registry = stub_registry(
            vec![0.12344, 0.87656],
            vec![0.1, 0.6, 0.1, 0.1, 0.1],
            vec![0.1, 0.2, 0.7],
        );
        let pipeline = WellnessPipeline::new(
            registry,
            Box::new(ScriptedGenerator::replying("Fine")),
            fast_retry(),
        );
        let report = pipeline.report(&gloomy_request()).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["habit"]["confidence"], 0.877);
        assert_eq!(json["habit"]["label"], "Success");
        assert!(json["run_id"].is_string());
    }

    #[test]
    fn test_single_model_predictions() {
        let (pipeline, _) = pipeline_with(ScriptedGenerator::replying("unused"));

        let habit = pipeline
            .predict_habit(&HabitRequest {
                previous_habit_ratio: 0.5,
                sleep_hours: 6.0,
                sleep_quality: CategoricalValue::Id(1),
                water_liters: 2.0,
                steps_count: 6000,
                calories: 2000.0,
                protein: 70.0,
                carbs: 250.0,
                fat: 60.0,
                mood: CategoricalValue::Id(2),
            })
            .unwrap();
        assert_eq!(habit.predicted_success, 0);
        assert_eq!(habit.confidence, 0.7);

        let mood = pipeline
            .predict_mood(&MoodRequest {
                sleep_hours: 6.0,
                sleep_quality: "Average".into(),
                water_liters: 2.0,
                steps_count: 6000,
                activity_type: "Cycling".into(),
                calories: 2000.0,
                protein: 70.0,
                carbs: 250.0,
                fat: 60.0,
                habit_completion_ratio: 0.5,
            })
            .unwrap();
        assert_eq!(mood.predicted_mood, "Sad");

        let sleep = pipeline
            .predict_sleep(&SleepRequest {
                steps_count: 6000,
                activity_type: CategoricalValue::Id(2),
                water_liters: 2.0,
                calories: 2000.0,
                protein: 70.0,
                carbs: 250.0,
                fat: 60.0,
                habit_completion_ratio: 0.5,
                mood: "Happy".into(),
            })
            .unwrap();
        assert_eq!(sleep.predicted_sleep_quality, "Poor");
        assert_eq!(sleep.confidence, 0.8);
    }

    #[test]
    fn test_single_model_validation() {
        let (pipeline, _) = pipeline_with(ScriptedGenerator::replying("unused"));
        let err = pipeline
            .predict_sleep(&SleepRequest {
                steps_count: 6000,
                activity_type: CategoricalValue::Id(7),
                water_liters: 2.0,
                calories: 2000.0,
                protein: 70.0,
                carbs: 250.0,
                fat: 60.0,
                habit_completion_ratio: 0.5,
                mood: "Happy".into(),
            })
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_daily_motivation_has_no_fallback() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

        let (pipeline, _) = pipeline_with(ScriptedGenerator::replying("Keep showing up."));
        let motivation = pipeline.daily_motivation(date).unwrap();
        assert_eq!(motivation.message, "Keep showing up.");

        let (pipeline, generator) = pipeline_with(ScriptedGenerator::failing(SynthesisError::Timeout(
            std::time::Duration::from_secs(20),
        )));
        let err = pipeline.daily_motivation(date).unwrap_err();
        assert!(matches!(err, InsightError::Synthesis(SynthesisError::Timeout(_))));
        assert_eq!(generator.calls(), 2);
    }

    #[test]
    fn test_pipeline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WellnessPipeline>();
    }
}
