use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::imaging::{RenderClient, RenderRequest};
use crate::storage::{ReconstructionImage, ReconstructionKind, Scenario};

/// Requests visual reconstructions for the top-ranked scenarios.
///
/// One `most_likely` render per scenario, at the configured viewpoint. The
/// render client's contract is non-throwing (a placeholder artifact is
/// substituted internally on failure), so nothing here can fail the run.
pub struct ReconstructionStage {
    render: Arc<dyn RenderClient>,
    tuning: PipelineConfig,
}

impl ReconstructionStage {
    /// Create a new reconstruction stage.
    pub fn new(render: Arc<dyn RenderClient>, tuning: PipelineConfig) -> Self {
        Self { render, tuning }
    }

    /// Render reconstructions for the top scenarios (already sorted
    /// likelihood-descending), appending each artifact ID to its scenario.
    pub async fn run(&self, case_id: &str, scenarios: &mut [Scenario]) -> Vec<ReconstructionImage> {
        let mut images = Vec::new();

        for (i, scenario) in scenarios
            .iter_mut()
            .take(self.tuning.reconstruction_count)
            .enumerate()
        {
            if i > 0 {
                // Spacing between render requests, same reason as frame calls.
                tokio::time::sleep(Duration::from_millis(self.tuning.inter_call_delay_ms)).await;
            }

            let artifact = self
                .render
                .render_reconstruction(RenderRequest {
                    scenario_name: scenario.name.clone(),
                    narrative: scenario.narrative.clone(),
                    viewpoint: self.tuning.reconstruction_viewpoint.clone(),
                    kind: ReconstructionKind::MostLikely,
                })
                .await;

            let image = ReconstructionImage {
                id: Uuid::new_v4().to_string(),
                case_id: case_id.to_string(),
                scenario_id: Some(scenario.id.clone()),
                viewpoint: self.tuning.reconstruction_viewpoint.clone(),
                kind: ReconstructionKind::MostLikely,
                storage_url: artifact.storage_url,
                description: artifact.description,
            };

            scenario.reconstruction_image_ids.push(image.id.clone());
            images.push(image);
        }

        info!(
            case_id = %case_id,
            reconstructions = images.len(),
            "Reconstruction stage completed"
        );

        images
    }
}
