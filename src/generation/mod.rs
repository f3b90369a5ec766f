// Generation module
// Prompt assembly and the hosted language model that answers from it

pub mod gemini;


pub use gemini::GeminiClient;

use tracing::warn;

use crate::Result;
use crate::index::QueryMatch;

/// Reply shown when the model could not be reached
pub const APOLOGY: &str = "Sorry, I couldn't process your request at this time.";

/// Produces one completion per call
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Assemble the single prompt sent to the generation model.
///
/// The query and the JSON form of `matches` are embedded verbatim. An empty
/// match set is embedded as `[]`.
#[inline]
pub fn build_prompt(persona: &str, query: &str, matches: &[QueryMatch]) -> String {
    let context = serialize_matches(matches);
    format!(
        "{} User query: {}, Retrieved Context: {}. Now answer the user query using the context.",
        persona.trim_end(),
        query,
        context
    )
}

/// JSON rendering of the retrieved matches as embedded in prompts
#[inline]
pub fn serialize_matches(matches: &[QueryMatch]) -> String {
    serde_json::to_string(matches).unwrap_or_else(|e| {
        warn!("Failed to serialize retrieved context: {}", e);
        "[]".to_string()
    })
}
