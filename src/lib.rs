//! WellTrack Insight - wellness predictions and recommendations from daily telemetry
//!
//! One day of sleep, hydration, activity, nutrition and mood data flows through
//! a deterministic pipeline: request validation → chained habit, mood and sleep
//! classifiers → rule-based insights → recommendation synthesis.
//!
//! ## Modules
//!
//! - **Prediction**: artifact registry, feature assembly and the classifier chain
//! - **Insights**: ordered rule evaluation over predictions and raw metrics
//! - **Synthesis**: prompt building, text generation with bounded retry, reply parsing

pub mod artifacts;
pub mod chain;
pub mod config;
pub mod error;
pub mod features;
pub mod insights;
pub mod pipeline;
pub mod schema;
pub mod synthesis;
pub mod types;

pub use artifacts::ArtifactRegistry;
pub use chain::{ChainOutcome, ChainStage, ChainState, PredictionChain, Stage};
pub use config::Config;
pub use error::{InsightError, SynthesisError};
pub use insights::{InsightRuleEngine, InsightSet};
pub use pipeline::{PipelineReport, WellnessPipeline};
pub use synthesis::{RecommendationSynthesizer, RetryConfig, TextGenerator};
pub use types::{DailyMotivation, ModelPrediction, Recommendation, WellnessSnapshot};

/// Crate version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name used in diagnostics
pub const PRODUCER_NAME: &str = "welltrack-insight";
