use std::sync::Arc;
use tracing::info;

use super::FusionResult;
use crate::error::PipelineResult;
use crate::storage::{
    CaseAnalysis, CaseStatus, Contradiction, EvidenceItem, EvidenceStore, EvidenceSummaryRecord,
    Heatmap, HeatmapSegment, ReconstructionImage, Scenario, TimelineEvent,
};

/// Number of heatmap buckets, fixed regardless of timeline span.
const HEATMAP_SEGMENTS: usize = 10;

/// Per-contradiction weight for the coarse contradiction score.
const CONTRADICTION_WEIGHT: f64 = 0.2;

/// Folds every stage output into the immutable `CaseAnalysis`, persists it,
/// and marks the case complete.
pub struct AssemblyStage {
    store: Arc<dyn EvidenceStore>,
}

impl AssemblyStage {
    /// Create a new assembly stage.
    pub fn new(store: Arc<dyn EvidenceStore>) -> Self {
        Self { store }
    }

    /// Assemble and persist the analysis, replacing any prior one.
    pub async fn run(
        &self,
        case_id: &str,
        fused: FusionResult,
        contradictions: Vec<Contradiction>,
        scenarios: Vec<Scenario>,
        reconstructions: Vec<ReconstructionImage>,
        items: &[EvidenceItem],
    ) -> PipelineResult<CaseAnalysis> {
        let heatmap = build_heatmap(&fused.timeline, &contradictions);

        let evidence_summaries = items
            .iter()
            .map(|item| {
                let (summary, tags) = item
                    .derived
                    .as_ref()
                    .map(|d| (d.summary.clone(), d.tags.clone()))
                    .unwrap_or_default();
                EvidenceSummaryRecord {
                    evidence_id: item.id.clone(),
                    filename: item.original_filename.clone(),
                    kind: item.kind,
                    summary,
                    tags,
                }
            })
            .collect();

        let analysis = CaseAnalysis {
            case_id: case_id.to_string(),
            status: CaseStatus::Completed,
            timeline: fused.timeline,
            contradictions,
            scenarios,
            global_summary: fused.world_model,
            heatmap,
            evidence_summaries,
            reconstructions,
        };

        self.store.save_analysis(&analysis).await?;
        self.store
            .set_case_status(case_id, CaseStatus::Completed)
            .await?;

        info!(
            case_id = %case_id,
            events = analysis.timeline.len(),
            scenarios = analysis.scenarios.len(),
            "Analysis assembled and persisted"
        );

        Ok(analysis)
    }
}

/// Partition `[0, max_event_time]` into ten equal segments.
///
/// Segment confidence is the mean confidence of events whose start time
/// falls inside the segment (0.5 when none; events at exactly the span end
/// land in the last segment). The contradiction score is a coarse scaled
/// count, monotonic in the number of contradictions and clamped to [0,1].
pub fn build_heatmap(timeline: &[TimelineEvent], contradictions: &[Contradiction]) -> Heatmap {
    let max_time = timeline
        .iter()
        .map(|e| e.start_time.unwrap_or(0.0))
        .fold(0.0_f64, f64::max);

    let width = max_time / HEATMAP_SEGMENTS as f64;
    let contradiction_score = (contradictions.len() as f64 * CONTRADICTION_WEIGHT).min(1.0);

    let segments = (0..HEATMAP_SEGMENTS)
        .map(|i| {
            let start = i as f64 * width;
            let end = (i + 1) as f64 * width;
            let last = i == HEATMAP_SEGMENTS - 1;

            let confidences: Vec<f64> = timeline
                .iter()
                .filter(|e| {
                    let t = e.start_time.unwrap_or(0.0);
                    if width == 0.0 {
                        // Zero-span timeline: everything lands in segment 0.
                        i == 0
                    } else {
                        t >= start && (t < end || (last && t <= end))
                    }
                })
                .map(|e| e.confidence)
                .collect();

            let confidence = if confidences.is_empty() {
                0.5
            } else {
                confidences.iter().sum::<f64>() / confidences.len() as f64
            };

            HeatmapSegment {
                start_time: start,
                end_time: end,
                confidence,
                contradiction_score,
            }
        })
        .collect();

    Heatmap { segments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Severity;
    use uuid::Uuid;

    fn event(start: Option<f64>, confidence: f64) -> TimelineEvent {
        TimelineEvent {
            id: Uuid::new_v4().to_string(),
            case_id: "case-1".to_string(),
            label: "event".to_string(),
            description: "desc".to_string(),
            start_time: start,
            end_time: None,
            confidence,
            supporting_evidence_ids: vec![],
        }
    }

    fn contradiction() -> Contradiction {
        Contradiction {
            id: Uuid::new_v4().to_string(),
            case_id: "case-1".to_string(),
            description: "conflict".to_string(),
            involved_evidence_ids: vec![],
            involved_witnesses: vec![],
            severity: Severity::Medium,
        }
    }

    #[test]
    fn test_heatmap_always_ten_segments() {
        assert_eq!(build_heatmap(&[], &[]).segments.len(), 10);
        assert_eq!(
            build_heatmap(&[event(Some(100.0), 0.9)], &[]).segments.len(),
            10
        );
        assert_eq!(
            build_heatmap(&[event(None, 0.3)], &[]).segments.len(),
            10
        );
    }

    #[test]
    fn test_heatmap_empty_segments_default_confidence() {
        let heatmap = build_heatmap(&[event(Some(100.0), 1.0)], &[]);
        // Only the last segment holds the single event; the rest default.
        for segment in &heatmap.segments[..9] {
            assert_eq!(segment.confidence, 0.5);
        }
        assert_eq!(heatmap.segments[9].confidence, 1.0);
    }

    #[test]
    fn test_heatmap_mean_confidence_in_segment() {
        let timeline = vec![
            event(Some(0.0), 0.4),
            event(Some(5.0), 0.8),
            event(Some(100.0), 1.0),
        ];
        let heatmap = build_heatmap(&timeline, &[]);
        // Span is [0,100], width 10; the first two events share segment 0.
        assert!((heatmap.segments[0].confidence - 0.6).abs() < 1e-9);
        assert_eq!(heatmap.segments[9].confidence, 1.0);
    }

    #[test]
    fn test_heatmap_event_at_span_end_included() {
        let timeline = vec![event(Some(50.0), 0.7)];
        let heatmap = build_heatmap(&timeline, &[]);
        assert_eq!(heatmap.segments[9].confidence, 0.7);
    }

    #[test]
    fn test_heatmap_zero_span_timeline() {
        let timeline = vec![event(Some(0.0), 0.9), event(None, 0.7)];
        let heatmap = build_heatmap(&timeline, &[]);
        assert_eq!(heatmap.segments.len(), 10);
        assert!((heatmap.segments[0].confidence - 0.8).abs() < 1e-9);
        for segment in &heatmap.segments[1..] {
            assert_eq!(segment.confidence, 0.5);
        }
    }

    #[test]
    fn test_contradiction_score_monotonic_and_clamped() {
        let timeline = vec![event(Some(10.0), 0.5)];
        let none = build_heatmap(&timeline, &[]);
        let two = build_heatmap(&timeline, &vec![contradiction(), contradiction()]);
        let many = build_heatmap(&timeline, &vec![contradiction(); 20]);

        assert_eq!(none.segments[0].contradiction_score, 0.0);
        assert!(two.segments[0].contradiction_score > none.segments[0].contradiction_score);
        assert!(many.segments[0].contradiction_score >= two.segments[0].contradiction_score);
        assert!(many.segments[0].contradiction_score <= 1.0);
    }
}
