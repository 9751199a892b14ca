use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::model::ReasoningClient;
use crate::storage::{Contradiction, Scenario, TimelineEvent};

/// Generates likelihood-ranked competing narratives. Scenarios are
/// enrichment: a model failure yields an empty list, which degrades the
/// reconstruction stage to a no-op but does not fail the run.
pub struct ScenarioStage {
    model: Arc<dyn ReasoningClient>,
}

impl ScenarioStage {
    /// Create a new scenario stage.
    pub fn new(model: Arc<dyn ReasoningClient>) -> Self {
        Self { model }
    }

    /// Generate scenarios for a case, sorted likelihood-descending.
    ///
    /// Likelihoods are independent advisory scores; they are clamped to
    /// [0,1] but never normalized or required to sum to 1.
    pub async fn run(
        &self,
        case_id: &str,
        world_model: &str,
        timeline: &[TimelineEvent],
        contradictions: &[Contradiction],
    ) -> Vec<Scenario> {
        let drafts = match self
            .model
            .generate_scenarios(
                world_model.to_string(),
                timeline.to_vec(),
                contradictions.to_vec(),
            )
            .await
        {
            Ok(drafts) => drafts,
            Err(e) => {
                warn!(
                    case_id = %case_id,
                    error = %e,
                    "Scenario generation failed, continuing with empty list"
                );
                return Vec::new();
            }
        };

        let mut scenarios: Vec<Scenario> = drafts
            .into_iter()
            .map(|d| Scenario {
                id: Uuid::new_v4().to_string(),
                case_id: case_id.to_string(),
                name: d.name,
                likelihood: d.likelihood.clamp(0.0, 1.0),
                narrative: d.narrative,
                reasoning: d.reasoning,
                key_findings: d.key_findings,
                supporting_evidence_ids: d.supporting_evidence_ids,
                conflicting_evidence_ids: d.conflicting_evidence_ids,
                reconstruction_image_ids: Vec::new(),
            })
            .collect();

        // Stable sort: ties keep their original emission order.
        scenarios.sort_by(|a, b| {
            b.likelihood
                .partial_cmp(&a.likelihood)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        info!(
            case_id = %case_id,
            scenarios = scenarios.len(),
            "Scenario generation completed"
        );

        scenarios
    }
}
