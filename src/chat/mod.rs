// Chat module
// Per-turn orchestration of embed -> retrieve -> generate over a session log

pub mod session;


pub use session::{ChatSession, Role, Turn};

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::FaqError;
use crate::embeddings::Embedder;
use crate::generation::{APOLOGY, Generator, build_prompt};
use crate::index::{QueryMatch, VectorIndex};

/// Where a turn currently is. Every turn ends in `Rendered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Idle,
    Embedding,
    Retrieving,
    Generating,
    Rendered,
}

impl TurnStage {
    /// Progress text shown while the stage is in flight
    #[inline]
    pub fn status_text(self) -> Option<&'static str> {
        match self {
            Self::Embedding | Self::Retrieving => Some("Fetching Context..."),
            Self::Generating => Some("Synthesizing Context..."),
            Self::Idle | Self::Rendered => None,
        }
    }
}

/// The external call that degraded a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Embed,
    Retrieve,
    Generate,
}

/// Receives progress for one turn
pub trait TurnObserver {
    fn stage_changed(&mut self, stage: TurnStage);

    /// A step failed and its fallback value is being used instead
    fn degraded(&mut self, step: PipelineStep, error: &FaqError);
}

/// Result of one processed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Text appended as the assistant turn
    pub reply: String,
    /// Context handed to the generator
    pub context: Vec<QueryMatch>,
    /// Steps that fell back to their degraded value
    pub degraded: Vec<PipelineStep>,
}

/// Answers user messages with retrieved FAQ context.
///
/// Holds the collaborator handles for the process lifetime.
#[derive(Clone)]
pub struct Assistant {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn Generator>,
    persona: String,
    top_k: usize,
}

impl Assistant {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn Generator>,
        persona: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            persona: persona.into(),
            top_k,
        }
    }

    /// Process one user message and append the user and assistant turns.
    ///
    /// Failures never end a turn early: each failed call is reported to the
    /// observer and replaced with its fallback (empty embedding, empty
    /// context, apology text).
    #[inline]
    pub async fn process_turn(
        &self,
        session: &mut ChatSession,
        input: &str,
        observer: &mut (dyn TurnObserver + Send),
    ) -> TurnOutcome {
        session.push(Role::User, input);
        let mut degraded = Vec::new();

        observer.stage_changed(TurnStage::Embedding);
        let embedding = match self.embedder.embed(input) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Error generating embeddings: {}", e);
                observer.degraded(PipelineStep::Embed, &e);
                degraded.push(PipelineStep::Embed);
                Vec::new()
            }
        };

        observer.stage_changed(TurnStage::Retrieving);
        let context = if embedding.is_empty() {
            debug!("No query embedding, continuing without context");
            Vec::new()
        } else {
            match self.index.query(&embedding, self.top_k).await {
                Ok(matches) => matches,
                Err(e) => {
                    warn!("Error querying index {}: {}", self.index.name(), e);
                    observer.degraded(PipelineStep::Retrieve, &e);
                    degraded.push(PipelineStep::Retrieve);
                    Vec::new()
                }
            }
        };
        debug!("Retrieved {} matches", context.len());

        observer.stage_changed(TurnStage::Generating);
        let prompt = build_prompt(&self.persona, input, &context);
        let reply = match self.generator.generate(&prompt) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Error generating response: {}", e);
                observer.degraded(PipelineStep::Generate, &e);
                degraded.push(PipelineStep::Generate);
                APOLOGY.to_string()
            }
        };

        session.push(Role::Assistant, reply.clone());
        observer.stage_changed(TurnStage::Rendered);

        info!(
            "Turn complete ({} context matches, {} degraded steps)",
            context.len(),
            degraded.len()
        );

        TurnOutcome {
            reply,
            context,
            degraded,
        }
    }
}
