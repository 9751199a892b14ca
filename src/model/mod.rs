//! Reasoning model client and stage payload types.
//!
//! The pipeline talks to the external model through the capability-typed
//! [`ReasoningClient`] trait; [`HttpReasoningClient`] is the production
//! implementation over the pipes HTTP API with retry and backoff.

mod client;
mod types;

pub use client::HttpReasoningClient;
pub use types::{
    decode_stage_output, ContradictionFinding, ContradictionOutput, FusionOutput, Message,
    MessageRole, PipeRequest, PipeResponse, RawResponse, ScenarioDraft, ScenarioOutput,
    SummarizeRequest, SummaryInput, SummaryOutput, TimelineDraft, TranscribeRequest, Usage,
    WitnessStatement,
};

use async_trait::async_trait;

use crate::error::ModelResult;
use crate::storage::{Contradiction, TimelineEvent};

/// Capability-typed interface to the external reasoning model.
///
/// Prompt construction and model selection live behind this trait; the
/// pipeline only depends on the per-stage contracts.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Summarize one evidence item (or one video frame).
    async fn summarize(&self, request: SummarizeRequest) -> ModelResult<SummaryOutput>;

    /// Transcribe an audio item to text.
    async fn transcribe(&self, request: TranscribeRequest) -> ModelResult<String>;

    /// Fuse per-item summaries into a world model and draft timeline.
    async fn fuse(&self, inputs: Vec<SummaryInput>) -> ModelResult<FusionOutput>;

    /// Cross-check timeline, summaries, and witness statements.
    async fn detect_contradictions(
        &self,
        timeline: Vec<TimelineEvent>,
        summaries: Vec<SummaryInput>,
        witness_statements: Vec<WitnessStatement>,
    ) -> ModelResult<Vec<ContradictionFinding>>;

    /// Generate likelihood-ranked competing narratives.
    async fn generate_scenarios(
        &self,
        world_model: String,
        timeline: Vec<TimelineEvent>,
        contradictions: Vec<Contradiction>,
    ) -> ModelResult<Vec<ScenarioDraft>>;
}
