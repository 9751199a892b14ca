use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::EvidenceProcessor;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{ReasoningClient, SummaryInput};
use crate::storage::{EvidenceItem, EvidenceKind, TimelineEvent};

/// Output of the fusion stage, fed to every downstream stage.
#[derive(Debug, Clone)]
pub struct FusionResult {
    /// Unified free-text description of the scene.
    pub world_model: String,
    /// Timeline events, sorted by start time ascending (unknown as 0).
    pub timeline: Vec<TimelineEvent>,
    /// Model rationale, surfaced in progress events.
    pub reasoning: Option<String>,
    /// The exact summaries handed to the model, reused by contradiction
    /// detection and assembly.
    pub inputs: Vec<SummaryInput>,
}

/// Combines per-item summaries into a world model and initial timeline.
pub struct FusionStage {
    model: Arc<dyn ReasoningClient>,
}

impl FusionStage {
    /// Create a new fusion stage.
    pub fn new(model: Arc<dyn ReasoningClient>) -> Self {
        Self { model }
    }

    /// Run fusion over the case's evidence.
    ///
    /// Before calling the model this verifies each item's derived health:
    /// an absent or error-status derived record triggers a single
    /// re-processing attempt; if that still fails, a deterministic per-kind
    /// fallback summary is substituted so fusion is never starved of input.
    pub async fn run(
        &self,
        case_id: &str,
        items: &mut [EvidenceItem],
        processor: &EvidenceProcessor,
    ) -> PipelineResult<FusionResult> {
        if items.is_empty() {
            return Err(PipelineError::NoEvidence {
                case_id: case_id.to_string(),
            });
        }

        let mut inputs = Vec::with_capacity(items.len());

        for item in items.iter_mut() {
            let healthy = item
                .derived
                .as_ref()
                .map(|d| !d.is_degraded())
                .unwrap_or(false);

            if !healthy {
                info!(
                    evidence_id = %item.id,
                    "Derived content unhealthy, re-processing before fusion"
                );
                let derived = processor.process(item).await?;
                item.derived = Some(derived);
            }

            let summary = match item.derived.as_ref() {
                Some(d) if !d.is_degraded() => d.summary.clone(),
                _ => {
                    warn!(
                        evidence_id = %item.id,
                        "Re-processing failed, substituting fallback summary"
                    );
                    fallback_summary(item)
                }
            };

            inputs.push(SummaryInput {
                evidence_id: item.id.clone(),
                filename: item.original_filename.clone(),
                kind: item.kind,
                summary,
            });
        }

        let output = self
            .model
            .fuse(inputs.clone())
            .await
            .map_err(PipelineError::Fusion)?;

        let mut timeline: Vec<TimelineEvent> = output
            .timeline
            .into_iter()
            .map(|draft| TimelineEvent {
                id: Uuid::new_v4().to_string(),
                case_id: case_id.to_string(),
                label: draft.label,
                description: draft.description,
                start_time: draft.start_time,
                end_time: draft.end_time,
                confidence: draft.confidence.clamp(0.0, 1.0),
                supporting_evidence_ids: draft.supporting_evidence_ids,
            })
            .collect();

        timeline.sort_by(|a, b| {
            let ta = a.start_time.unwrap_or(0.0);
            let tb = b.start_time.unwrap_or(0.0);
            ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
        });

        info!(
            case_id = %case_id,
            events = timeline.len(),
            "Fusion completed"
        );

        Ok(FusionResult {
            world_model: output.world_model,
            timeline,
            reasoning: output.reasoning,
            inputs,
        })
    }
}

/// Deterministic per-kind boilerplate substituted when an item cannot be
/// analyzed even after the fusion-time retry.
pub fn fallback_summary(item: &EvidenceItem) -> String {
    match item.kind {
        EvidenceKind::Image => format!(
            "Image evidence '{}' could not be analyzed; treat as unexamined visual material.",
            item.original_filename
        ),
        EvidenceKind::Video => format!(
            "Video evidence '{}' could not be analyzed; treat as unexamined footage.",
            item.original_filename
        ),
        EvidenceKind::Audio => format!(
            "Audio evidence '{}' could not be transcribed; treat as an unexamined recording.",
            item.original_filename
        ),
        EvidenceKind::Text | EvidenceKind::Document => format!(
            "Text evidence '{}' could not be read; treat as an unexamined statement.",
            item.original_filename
        ),
    }
}
