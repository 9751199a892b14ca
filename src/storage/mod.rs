//! Storage layer for case and evidence persistence.
//!
//! This module provides the domain model (cases, evidence items, extracted
//! frames, the assembled case analysis) and a SQLite-backed implementation of
//! the [`EvidenceStore`] trait.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;

/// A case groups uploaded evidence and the resulting analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    /// Unique case identifier.
    pub id: String,
    /// Human-readable case name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lifecycle status, owned by the orchestrator once a run starts.
    pub status: CaseStatus,
    /// When the case was created.
    pub created_at: DateTime<Utc>,
    /// When the case was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Case lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Created, never analyzed.
    #[default]
    Pending,
    /// A pipeline run is in progress.
    Running,
    /// The last run finished and an analysis is readable.
    Completed,
    /// The last run terminated with a structural failure.
    Error,
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseStatus::Pending => write!(f, "pending"),
            CaseStatus::Running => write!(f, "running"),
            CaseStatus::Completed => write!(f, "completed"),
            CaseStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(CaseStatus::Pending),
            "running" => Ok(CaseStatus::Running),
            "completed" => Ok(CaseStatus::Completed),
            "error" => Ok(CaseStatus::Error),
            _ => Err(format!("Unknown case status: {}", s)),
        }
    }
}

/// Media type of an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Image,
    Video,
    Audio,
    Text,
    Document,
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceKind::Image => write!(f, "image"),
            EvidenceKind::Video => write!(f, "video"),
            EvidenceKind::Audio => write!(f, "audio"),
            EvidenceKind::Text => write!(f, "text"),
            EvidenceKind::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for EvidenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(EvidenceKind::Image),
            "video" => Ok(EvidenceKind::Video),
            "audio" => Ok(EvidenceKind::Audio),
            "text" => Ok(EvidenceKind::Text),
            "document" => Ok(EvidenceKind::Document),
            _ => Err(format!("Unknown evidence kind: {}", s)),
        }
    }
}

/// Outcome of evidence processing, checked structurally at fusion time
/// rather than by matching marker strings in summary text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedStatus {
    /// Processing succeeded; the summary is usable as fusion input.
    #[default]
    Ok,
    /// Processing failed; the summary is a degraded placeholder.
    Error,
}

/// Content derived from one evidence item by the evidence processor.
/// Recomputed idempotently on each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedContent {
    /// Text summary of the item (or a degraded placeholder on failure).
    pub summary: String,
    /// Content tags.
    pub tags: Vec<String>,
    /// Full transcript for audio evidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// IDs of extracted frames for video evidence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frame_ids: Vec<String>,
    /// Whether processing succeeded.
    #[serde(default)]
    pub status: DerivedStatus,
}

impl DerivedContent {
    /// Successful derived content.
    pub fn ok(summary: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            summary: summary.into(),
            tags,
            transcript: None,
            frame_ids: Vec::new(),
            status: DerivedStatus::Ok,
        }
    }

    /// Degraded derived content for a failed item.
    pub fn degraded(reason: impl std::fmt::Display) -> Self {
        Self {
            summary: format!("processing failed: {}", reason),
            tags: vec!["processing-error".to_string()],
            transcript: None,
            frame_ids: Vec::new(),
            status: DerivedStatus::Error,
        }
    }

    /// Attach a transcript.
    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    /// Attach frame IDs.
    pub fn with_frame_ids(mut self, frame_ids: Vec<String>) -> Self {
        self.frame_ids = frame_ids;
        self
    }

    /// True when the item needs a re-processing attempt before fusion.
    pub fn is_degraded(&self) -> bool {
        self.status == DerivedStatus::Error
    }
}

/// One uploaded artifact belonging to a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    /// Unique evidence identifier.
    pub id: String,
    /// Owning case ID.
    pub case_id: String,
    /// Media type.
    pub kind: EvidenceKind,
    /// Filename as uploaded.
    pub original_filename: String,
    /// Where the raw bytes live (local path or URL).
    pub storage_url: String,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
    /// Derived content, populated by the evidence processor during a run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedContent>,
}

impl EvidenceItem {
    /// Create a new evidence item for a case.
    pub fn new(
        case_id: impl Into<String>,
        kind: EvidenceKind,
        original_filename: impl Into<String>,
        storage_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            case_id: case_id.into(),
            kind,
            original_filename: original_filename.into(),
            storage_url: storage_url.into(),
            uploaded_at: Utc::now(),
            derived: None,
        }
    }

    /// Attach derived content (builder form, mostly for tests).
    pub fn with_derived(mut self, derived: DerivedContent) -> Self {
        self.derived = Some(derived);
        self
    }
}

/// A single frame extracted from a video evidence item.
///
/// Frames of one parent are ordered by `time_seconds` ascending and no two
/// frames of the same parent share a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameEvidence {
    /// Unique frame identifier.
    pub id: String,
    /// Parent video evidence ID.
    pub parent_evidence_id: String,
    /// Offset into the video.
    pub time_seconds: f64,
    /// Where the frame image lives.
    pub storage_url: String,
    /// Per-frame derived content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedContent>,
}

impl FrameEvidence {
    /// Create a new frame record.
    pub fn new(
        parent_evidence_id: impl Into<String>,
        time_seconds: f64,
        storage_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_evidence_id: parent_evidence_id.into(),
            time_seconds,
            storage_url: storage_url.into(),
            derived: None,
        }
    }
}

/// A discrete inferred occurrence on the case timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// Unique event identifier, freshly generated each run.
    pub id: String,
    /// Owning case ID.
    pub case_id: String,
    /// Short label.
    pub label: String,
    /// Longer description.
    pub description: String,
    /// Inferred start time in seconds, when the model could place it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    /// Inferred end time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    /// Confidence in [0,1].
    pub confidence: f64,
    /// Evidence items supporting this event.
    pub supporting_evidence_ids: Vec<String>,
}

/// Contradiction severity grade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// An inconsistency found across timeline, evidence, and witness statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contradiction {
    /// Unique contradiction identifier.
    pub id: String,
    /// Owning case ID.
    pub case_id: String,
    /// What contradicts what.
    pub description: String,
    /// Evidence items involved.
    pub involved_evidence_ids: Vec<String>,
    /// Witness identifiers involved (free text).
    pub involved_witnesses: Vec<String>,
    /// Severity grade.
    pub severity: Severity,
}

/// One hypothesis explaining the fused evidence.
///
/// `likelihood` is an independent advisory score; scenario likelihoods are
/// not normalized and must not be assumed to sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Unique scenario identifier.
    pub id: String,
    /// Owning case ID.
    pub case_id: String,
    /// Short scenario name.
    pub name: String,
    /// Advisory likelihood in [0,1].
    pub likelihood: f64,
    /// Narrative account of the scenario.
    pub narrative: String,
    /// Optional model rationale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Key findings supporting the narrative.
    pub key_findings: Vec<String>,
    /// Evidence items supporting this scenario.
    pub supporting_evidence_ids: Vec<String>,
    /// Evidence items conflicting with this scenario.
    pub conflicting_evidence_ids: Vec<String>,
    /// Reconstruction artifacts rendered for this scenario.
    #[serde(default)]
    pub reconstruction_image_ids: Vec<String>,
}

/// Kind of visual reconstruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionKind {
    #[default]
    MostLikely,
    Alternative,
    Before,
    After,
}

impl std::fmt::Display for ReconstructionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconstructionKind::MostLikely => write!(f, "most_likely"),
            ReconstructionKind::Alternative => write!(f, "alternative"),
            ReconstructionKind::Before => write!(f, "before"),
            ReconstructionKind::After => write!(f, "after"),
        }
    }
}

/// An externally generated image depicting a scenario from a viewpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionImage {
    /// Unique image identifier.
    pub id: String,
    /// Owning case ID.
    pub case_id: String,
    /// Scenario this image depicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,
    /// Camera viewpoint requested.
    pub viewpoint: String,
    /// Reconstruction kind.
    pub kind: ReconstructionKind,
    /// Where the rendered image lives.
    pub storage_url: String,
    /// Human-readable description of the rendering.
    pub description: String,
}

/// Per-item summary carried in the assembled analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceSummaryRecord {
    pub evidence_id: String,
    pub filename: String,
    pub kind: EvidenceKind,
    pub summary: String,
    pub tags: Vec<String>,
}

/// One of ten fixed time buckets summarizing average confidence and
/// contradiction density.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f64,
    pub contradiction_score: f64,
}

/// Timeline heatmap, always exactly ten segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heatmap {
    pub segments: Vec<HeatmapSegment>,
}

/// The immutable analysis aggregate, one per case, replaced wholesale on
/// each run. Exists only after a run reaches assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseAnalysis {
    /// Owning case ID.
    pub case_id: String,
    /// Case status at assembly time (always `completed`).
    pub status: CaseStatus,
    /// Timeline sorted by start time ascending (unknown treated as 0).
    pub timeline: Vec<TimelineEvent>,
    /// Detected contradictions.
    pub contradictions: Vec<Contradiction>,
    /// Scenarios sorted likelihood-descending for display.
    pub scenarios: Vec<Scenario>,
    /// Unified world-model narrative from fusion.
    pub global_summary: String,
    /// Confidence/contradiction heatmap over the timeline span.
    pub heatmap: Heatmap,
    /// Per-item evidence summaries.
    pub evidence_summaries: Vec<EvidenceSummaryRecord>,
    /// All reconstructions rendered this run.
    pub reconstructions: Vec<ReconstructionImage>,
}

impl Case {
    /// Create a new pending case.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            status: CaseStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Narrow persistence interface used by the pipeline.
///
/// The orchestrator only ever reads and writes through this trait; transport
/// handlers share the same instance for the thin CRUD surface.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    // Case operations

    /// Create a new case.
    async fn create_case(&self, case: &Case) -> StorageResult<()>;
    /// Get a case by ID.
    async fn get_case(&self, id: &str) -> StorageResult<Option<Case>>;
    /// Transition a case's status.
    async fn set_case_status(&self, id: &str, status: CaseStatus) -> StorageResult<()>;

    // Evidence operations

    /// Register an uploaded evidence item.
    async fn create_evidence(&self, item: &EvidenceItem) -> StorageResult<()>;
    /// Get one evidence item by ID.
    async fn get_evidence(&self, id: &str) -> StorageResult<Option<EvidenceItem>>;
    /// Get all evidence for a case, upload order.
    async fn get_evidence_by_case(&self, case_id: &str) -> StorageResult<Vec<EvidenceItem>>;
    /// Write derived content back for an item.
    async fn save_evidence_derived(
        &self,
        item_id: &str,
        derived: &DerivedContent,
    ) -> StorageResult<()>;

    // Frame operations

    /// Record an extracted frame.
    async fn create_frame(&self, frame: &FrameEvidence) -> StorageResult<()>;
    /// Get frames for a video item, ordered by time ascending.
    async fn get_frames_by_evidence(&self, evidence_id: &str)
        -> StorageResult<Vec<FrameEvidence>>;
    /// Write derived content back for a frame.
    async fn save_frame_derived(
        &self,
        frame_id: &str,
        derived: &DerivedContent,
    ) -> StorageResult<()>;
    /// Drop all frames of a video item (idempotent re-runs re-extract).
    async fn delete_frames_by_evidence(&self, evidence_id: &str) -> StorageResult<()>;

    // Analysis operations

    /// Persist the assembled analysis, replacing any prior one.
    async fn save_analysis(&self, analysis: &CaseAnalysis) -> StorageResult<()>;
    /// Read the persisted analysis, if a run has completed.
    async fn get_analysis(&self, case_id: &str) -> StorageResult<Option<CaseAnalysis>>;
}
