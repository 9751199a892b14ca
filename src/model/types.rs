use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ModelError, ModelResult};
use crate::storage::{EvidenceKind, Severity};

/// Message in a model pipe conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request to run a model pipe
#[derive(Debug, Clone, Serialize)]
pub struct PipeRequest {
    /// Pipe name (required by the API)
    pub name: String,
    pub messages: Vec<Message>,
    /// Disable streaming (default: false for non-streaming response)
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, String>>,
}

impl PipeRequest {
    /// Create a new pipe request with name and messages
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
            variables: None,
        }
    }

    /// Add a single variable
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Response from a model pipe
#[derive(Debug, Clone, Deserialize)]
pub struct PipeResponse {
    pub success: bool,
    pub completion: String,
    pub raw: Option<RawResponse>,
}

/// Raw model response details
#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Payload for a single-item summarization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    /// Filename shown to the model for context.
    pub filename: String,
    /// Media type of the item.
    pub kind: EvidenceKind,
    /// Text body for text/document evidence (already truncated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64-encoded media bytes for image/frame evidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_base64: Option<String>,
}

impl SummarizeRequest {
    /// Summarize a text body.
    pub fn text(filename: impl Into<String>, kind: EvidenceKind, body: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            kind,
            text: Some(body.into()),
            media_base64: None,
        }
    }

    /// Summarize raw media bytes.
    pub fn media(filename: impl Into<String>, kind: EvidenceKind, bytes: &[u8]) -> Self {
        use base64::Engine;
        Self {
            filename: filename.into(),
            kind,
            text: None,
            media_base64: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        }
    }
}

/// Structured output of a summarization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Payload for an audio transcription call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeRequest {
    pub filename: String,
    pub media_base64: String,
}

impl TranscribeRequest {
    /// Transcribe raw audio bytes.
    pub fn new(filename: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::Engine;
        Self {
            filename: filename.into(),
            media_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// One evidence summary handed to fusion and contradiction detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryInput {
    pub evidence_id: String,
    pub filename: String,
    pub kind: EvidenceKind,
    pub summary: String,
}

/// Timeline entry as produced by the fusion pipe, before entity mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineDraft {
    pub label: String,
    pub description: String,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    pub confidence: f64,
    #[serde(default)]
    pub supporting_evidence_ids: Vec<String>,
}

/// Structured output of the fusion stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionOutput {
    pub world_model: String,
    #[serde(default)]
    pub timeline: Vec<TimelineDraft>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// One witness statement, sourced from text-kind evidence summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessStatement {
    /// Originating evidence filename.
    pub source: String,
    /// The statement text.
    pub statement: String,
}

/// Contradiction as produced by the detection pipe, before entity mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionFinding {
    pub description: String,
    #[serde(default)]
    pub involved_evidence_ids: Vec<String>,
    #[serde(default)]
    pub involved_witnesses: Vec<String>,
    #[serde(default)]
    pub severity: Severity,
}

/// Envelope for the contradiction pipe output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionOutput {
    #[serde(default)]
    pub contradictions: Vec<ContradictionFinding>,
}

/// Scenario as produced by the generation pipe, before entity mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDraft {
    pub name: String,
    pub likelihood: f64,
    pub narrative: String,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub supporting_evidence_ids: Vec<String>,
    #[serde(default)]
    pub conflicting_evidence_ids: Vec<String>,
}

/// Envelope for the scenario pipe output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutput {
    #[serde(default)]
    pub scenarios: Vec<ScenarioDraft>,
}

/// Decode a typed stage payload from pipe completion text.
///
/// Strips a surrounding markdown code fence if present, then requires the
/// remainder to be valid JSON of the expected shape. No regex scraping of
/// partial JSON blobs; a malformed completion is an error the caller maps to
/// its stage policy.
pub fn decode_stage_output<T: serde::de::DeserializeOwned>(completion: &str) -> ModelResult<T> {
    let body = strip_code_fence(completion);

    serde_json::from_str(body).map_err(|e| ModelError::InvalidResponse {
        message: format!("Failed to decode stage output: {}", e),
    })
}

/// Strip a single surrounding ``` or ```json fence, if the completion has one.
fn strip_code_fence(completion: &str) -> &str {
    let trimmed = completion.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").map(str::trim).unwrap_or(trimmed)
}
