//! The case analysis pipeline.
//!
//! A run is a strictly sequential pass over the phases in [`Phase`]:
//! per-item evidence processing, fusion into a world model and timeline,
//! contradiction detection, scenario generation, visual reconstruction, and
//! final assembly. Retries happen only at sub-operation granularity; there is
//! no retry-the-whole-stage semantic.

mod assembly;
mod contradiction;
mod evidence;
mod fusion;
mod orchestrator;
mod reconstruction;
mod scenario;

pub use assembly::{build_heatmap, AssemblyStage};
pub use contradiction::ContradictionStage;
pub use evidence::EvidenceProcessor;
pub use fusion::{fallback_summary, FusionResult, FusionStage};
pub use orchestrator::Orchestrator;
pub use reconstruction::ReconstructionStage;
pub use scenario::ScenarioStage;

/// Pipeline phase. Transitions are forward-only; any unhandled error between
/// `Preparing` and `Finalizing` moves the run directly to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Preparing,
    ProcessingEvidence,
    Fusing,
    DetectingContradictions,
    /// Reserved stage; emits a progress event but performs no analysis.
    AnalyzingShadows,
    GeneratingScenarios,
    RenderingReconstructions,
    Finalizing,
    Completed,
    Failed,
}

impl Phase {
    /// Total number of counted stages (0-7).
    pub const TOTAL_STEPS: u8 = 7;

    /// Human-readable step label, shown in progress events.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Preparing => "Preparing analysis",
            Phase::ProcessingEvidence => "Processing evidence",
            Phase::Fusing => "Fusing evidence into world model",
            Phase::DetectingContradictions => "Detecting contradictions",
            Phase::AnalyzingShadows => "Analyzing shadows and reflections",
            Phase::GeneratingScenarios => "Generating scenarios",
            Phase::RenderingReconstructions => "Rendering reconstructions",
            Phase::Finalizing => "Finalizing analysis",
            Phase::Completed => "Analysis complete",
            Phase::Failed => "Analysis failed",
        }
    }

    /// Coarse stage counter for progress events (terminal states map to the
    /// last counted stage).
    pub fn number(&self) -> u8 {
        match self {
            Phase::Idle | Phase::Preparing => 0,
            Phase::ProcessingEvidence => 1,
            Phase::Fusing => 2,
            Phase::DetectingContradictions => 3,
            Phase::AnalyzingShadows => 4,
            Phase::GeneratingScenarios => 5,
            Phase::RenderingReconstructions => 6,
            Phase::Finalizing | Phase::Completed | Phase::Failed => 7,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
