use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    AssemblyStage, ContradictionStage, EvidenceProcessor, FusionStage, Phase, ReconstructionStage,
    ScenarioStage,
};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::frames::FrameExtractor;
use crate::imaging::RenderClient;
use crate::model::ReasoningClient;
use crate::progress::{AnalysisProgress, ProgressBus};
use crate::storage::{CaseAnalysis, CaseStatus, EvidenceStore};

/// Drives a full analysis run for one case, stage by stage, publishing
/// progress events as it goes.
///
/// One orchestrator is shared by every run; per-run state lives on the
/// stack of [`Orchestrator::run`]. Concurrency control (one active run per
/// case) is the caller's job via the run registry.
pub struct Orchestrator {
    store: Arc<dyn EvidenceStore>,
    model: Arc<dyn ReasoningClient>,
    render: Arc<dyn RenderClient>,
    frames: Arc<dyn FrameExtractor>,
    tuning: PipelineConfig,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(
        store: Arc<dyn EvidenceStore>,
        model: Arc<dyn ReasoningClient>,
        render: Arc<dyn RenderClient>,
        frames: Arc<dyn FrameExtractor>,
        tuning: PipelineConfig,
    ) -> Self {
        Self {
            store,
            model,
            render,
            frames,
            tuning,
        }
    }

    /// Run the full pipeline for a case.
    ///
    /// Always terminates the stream: a terminal `completed` or `error` event
    /// is published on `bus` regardless of outcome, and on failure the case
    /// status is moved to `error` before the event goes out.
    pub async fn run(&self, case_id: &str, bus: &ProgressBus) -> PipelineResult<CaseAnalysis> {
        match self.execute(case_id, bus).await {
            Ok(analysis) => {
                info!(case_id = %case_id, "Analysis run completed");
                bus.publish(
                    AnalysisProgress::completed(Phase::Completed.label())
                        .with_stage(Phase::Completed.number(), Phase::TOTAL_STEPS),
                );
                Ok(analysis)
            }
            Err(e) => {
                error!(case_id = %case_id, error = %e, "Analysis run failed");
                if let Err(status_err) = self
                    .store
                    .set_case_status(case_id, CaseStatus::Error)
                    .await
                {
                    warn!(
                        case_id = %case_id,
                        error = %status_err,
                        "Could not record error status for failed run"
                    );
                }
                bus.publish(
                    AnalysisProgress::failed(Phase::Failed.label(), e.to_string())
                        .with_stage(Phase::Failed.number(), Phase::TOTAL_STEPS),
                );
                Err(e)
            }
        }
    }

    async fn execute(&self, case_id: &str, bus: &ProgressBus) -> PipelineResult<CaseAnalysis> {
        self.emit(bus, Phase::Preparing, 5, None);

        self.store
            .get_case(case_id)
            .await?
            .ok_or_else(|| PipelineError::CaseNotFound {
                case_id: case_id.to_string(),
            })?;
        self.store
            .set_case_status(case_id, CaseStatus::Running)
            .await?;

        let mut items = self.store.get_evidence_by_case(case_id).await?;
        if items.is_empty() {
            return Err(PipelineError::NoEvidence {
                case_id: case_id.to_string(),
            });
        }
        info!(case_id = %case_id, items = items.len(), "Starting analysis run");

        // Stage 1: per-item processing. Item failures degrade, never abort.
        let processor = EvidenceProcessor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.model),
            Arc::clone(&self.frames),
            self.tuning.clone(),
        );
        let total = items.len();
        for (i, item) in items.iter_mut().enumerate() {
            bus.publish(
                AnalysisProgress::running(
                    Phase::ProcessingEvidence.label(),
                    10 + (i * 30 / total) as u8,
                )
                .with_stage(Phase::ProcessingEvidence.number(), Phase::TOTAL_STEPS)
                .with_current_item(item.original_filename.clone()),
            );
            let derived = processor.process(item).await?;
            item.derived = Some(derived);
        }

        // Stage 2: fusion. The only model stage whose failure fails the run.
        self.emit(bus, Phase::Fusing, 45, None);
        let fusion = FusionStage::new(Arc::clone(&self.model));
        let fused = fusion.run(case_id, &mut items, &processor).await?;
        self.emit(bus, Phase::Fusing, 55, fused.reasoning.clone());

        // Stage 3: contradictions (empty on model failure).
        self.emit(bus, Phase::DetectingContradictions, 60, None);
        let contradiction = ContradictionStage::new(Arc::clone(&self.model));
        let contradictions = contradiction
            .run(case_id, &fused.timeline, &fused.inputs, &items)
            .await;

        // Stage 4: reserved, progress-only.
        self.emit(bus, Phase::AnalyzingShadows, 65, None);

        // Stage 5: scenarios (empty on model failure).
        self.emit(bus, Phase::GeneratingScenarios, 75, None);
        let scenario = ScenarioStage::new(Arc::clone(&self.model));
        let mut scenarios = scenario
            .run(case_id, &fused.world_model, &fused.timeline, &contradictions)
            .await;

        // Stage 6: reconstructions (placeholders on render failure).
        self.emit(bus, Phase::RenderingReconstructions, 85, None);
        let reconstruction =
            ReconstructionStage::new(Arc::clone(&self.render), self.tuning.clone());
        let reconstructions = reconstruction.run(case_id, &mut scenarios).await;

        // Stage 7: assemble and persist.
        self.emit(bus, Phase::Finalizing, 95, None);
        let assembly = AssemblyStage::new(Arc::clone(&self.store));
        let analysis = assembly
            .run(
                case_id,
                fused,
                contradictions,
                scenarios,
                reconstructions,
                &items,
            )
            .await?;

        Ok(analysis)
    }

    fn emit(&self, bus: &ProgressBus, phase: Phase, progress: u8, reasoning: Option<String>) {
        let mut event = AnalysisProgress::running(phase.label(), progress)
            .with_stage(phase.number(), Phase::TOTAL_STEPS);
        if let Some(reasoning) = reasoning {
            event = event.with_reasoning(reasoning);
        }
        bus.publish(event);
    }
}
