// Embeddings module
// Turns question text into fixed-length vectors through a hosted model

pub mod openai;

pub use openai::OpenAiEmbedder;

use crate::Result;

/// Produces one embedding per call.
///
/// Implementations return a vector of exactly the configured dimension or an
/// error, never a truncated vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;
}
