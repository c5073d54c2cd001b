//! Recommendation synthesis
//!
//! Turns the ordered insight list into a prompt for an external text
//! generator and parses the free-text reply into a [`Recommendation`].
//! The generator sits behind the [`TextGenerator`] trait so tests and
//! alternative backends can stand in for the hosted model.

#[cfg(feature = "groq")]
pub mod groq;
pub mod retry;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::SynthesisError;
use crate::insights::InsightSet;
use crate::types::{DailyMotivation, Recommendation};

#[cfg(feature = "groq")]
pub use groq::GroqClient;
pub use retry::{with_retry, RetryConfig};

/// Sampling temperature for recommendations
pub const RECOMMENDATION_TEMPERATURE: f32 = 0.4;
/// Output token limit for recommendations
pub const RECOMMENDATION_MAX_TOKENS: u32 = 250;
/// Sampling temperature for the daily motivation message
pub const MOTIVATION_TEMPERATURE: f32 = 0.6;
/// Output token limit for the daily motivation message
pub const MOTIVATION_MAX_TOKENS: u32 = 80;
/// Upper bound on parsed action items
pub const MAX_ACTION_ITEMS: usize = 5;

/// OpenAI-compatible endpoint used when none is configured
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
/// Environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Summary used when the reply has no usable line
pub const NO_SUMMARY: &str = "No summary available";
/// Summary of the rule-only fallback recommendation
pub const FALLBACK_SUMMARY: &str =
    "Personalized recommendations are unavailable right now; here is what today's data shows.";

/// Synchronous text-generation capability
pub trait TextGenerator: Send + Sync {
    /// Short backend name for logs and diagnostics
    fn name(&self) -> &str;

    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, SynthesisError>;
}

/// Builds prompts, calls the generator with bounded retry, and parses replies
pub struct RecommendationSynthesizer<'a> {
    generator: &'a dyn TextGenerator,
    retry: &'a RetryConfig,
}

impl<'a> RecommendationSynthesizer<'a> {
    pub fn new(generator: &'a dyn TextGenerator, retry: &'a RetryConfig) -> Self {
        Self { generator, retry }
    }

    /// Generate a recommendation for the given insights
    pub fn synthesize(&self, insights: &InsightSet) -> Result<Recommendation, SynthesisError> {
        let prompt = recommendation_prompt(insights);
        let text = with_retry(self.retry, "recommendation", || {
            self.generator.generate(
                &prompt,
                RECOMMENDATION_TEMPERATURE,
                RECOMMENDATION_MAX_TOKENS,
            )
        })?;
        let recommendation = parse_recommendation(&text);
        debug!(
            generator = self.generator.name(),
            action_items = recommendation.action_items.len(),
            "recommendation synthesized"
        );
        Ok(recommendation)
    }

    /// Generate a short motivational message for `date`
    pub fn daily_motivation(&self, date: NaiveDate) -> Result<DailyMotivation, SynthesisError> {
        let prompt = motivation_prompt(date);
        let text = with_retry(self.retry, "motivation", || {
            self.generator
                .generate(&prompt, MOTIVATION_TEMPERATURE, MOTIVATION_MAX_TOKENS)
        })?;

        let message = text.trim();
        if message.is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }
        Ok(DailyMotivation {
            date,
            message: message.to_string(),
        })
    }
}

/// Prompt asking for one summary line and a few plain-text recommendations
pub fn recommendation_prompt(insights: &InsightSet) -> String {
    let context = insights.messages().join(", ");
    format!(
        "You are a health AI assistant.\n\
         \n\
         Based on the following insights:\n\
         {context}\n\
         \n\
         Generate:\n\
         - One short friendly summary sentence (1-2 lines max)\n\
         - Then 3-5 concise bullet-point actionable health recommendations\n\
         - Respond in plain text only, without Markdown symbols or extra headings\n"
    )
}

/// Prompt for a one or two sentence motivational message
pub fn motivation_prompt(date: NaiveDate) -> String {
    format!(
        "You are a friendly health and wellness coach.\n\
         \n\
         Generate ONE short daily motivational message for the date {date}.\n\
         Rules:\n\
         - 1 or 2 sentences only\n\
         - Positive, encouraging, and human-like\n\
         - No emojis overload (max 1 emoji)\n\
         - No bullet points\n\
         - No quotes\n\
         - No markdown\n\
         \n\
         Example tone:\n\
         \"Small steps today lead to big wins tomorrow. Stay consistent\"\n",
        date = date.format("%Y-%m-%d")
    )
}

/// Split a reply into a summary line and up to five action items.
///
/// Blank lines are skipped; bullet markers (`-`, `*`) and spaces are stripped
/// from both ends of every line.
pub fn parse_recommendation(text: &str) -> Recommendation {
    let mut lines = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.trim_matches(|c| c == '-' || c == '*' || c == ' ')
                .trim()
                .to_string()
        });

    let summary = lines.next().unwrap_or_else(|| NO_SUMMARY.to_string());
    let action_items = lines.take(MAX_ACTION_ITEMS).collect();

    Recommendation {
        summary,
        action_items,
    }
}

/// Rule-only recommendation used when synthesis is unavailable
pub fn fallback_recommendation(insights: &InsightSet) -> Recommendation {
    Recommendation {
        summary: FALLBACK_SUMMARY.to_string(),
        action_items: insights
            .messages()
            .into_iter()
            .take(MAX_ACTION_ITEMS)
            .collect(),
    }
}
