use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::model::{ReasoningClient, SummaryInput, WitnessStatement};
use crate::storage::{Contradiction, EvidenceItem, EvidenceKind, TimelineEvent};

/// Cross-checks timeline, summaries, and witness statements for
/// inconsistencies. Contradictions are enrichment: a model failure yields an
/// empty list, never a run failure.
pub struct ContradictionStage {
    model: Arc<dyn ReasoningClient>,
}

impl ContradictionStage {
    /// Create a new contradiction stage.
    pub fn new(model: Arc<dyn ReasoningClient>) -> Self {
        Self { model }
    }

    /// Detect contradictions for a case.
    pub async fn run(
        &self,
        case_id: &str,
        timeline: &[TimelineEvent],
        summaries: &[SummaryInput],
        items: &[EvidenceItem],
    ) -> Vec<Contradiction> {
        let witness_statements = witness_statements(items);

        info!(
            case_id = %case_id,
            witnesses = witness_statements.len(),
            "Running contradiction detection"
        );

        match self
            .model
            .detect_contradictions(timeline.to_vec(), summaries.to_vec(), witness_statements)
            .await
        {
            Ok(findings) => findings
                .into_iter()
                .map(|f| Contradiction {
                    id: Uuid::new_v4().to_string(),
                    case_id: case_id.to_string(),
                    description: f.description,
                    involved_evidence_ids: f.involved_evidence_ids,
                    involved_witnesses: f.involved_witnesses,
                    severity: f.severity,
                })
                .collect(),
            Err(e) => {
                warn!(
                    case_id = %case_id,
                    error = %e,
                    "Contradiction detection failed, continuing with empty list"
                );
                Vec::new()
            }
        }
    }
}

/// Witness statements are the summaries of text-kind evidence with healthy
/// derived content: textual testimony only, not all evidence.
fn witness_statements(items: &[EvidenceItem]) -> Vec<WitnessStatement> {
    items
        .iter()
        .filter(|item| item.kind == EvidenceKind::Text)
        .filter_map(|item| {
            item.derived
                .as_ref()
                .filter(|d| !d.is_degraded())
                .map(|d| WitnessStatement {
                    source: item.original_filename.clone(),
                    statement: d.summary.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DerivedContent;

    #[test]
    fn test_witness_statements_text_only() {
        let items = vec![
            EvidenceItem::new("c", EvidenceKind::Image, "a.jpg", "/a")
                .with_derived(DerivedContent::ok("an image", vec![])),
            EvidenceItem::new("c", EvidenceKind::Text, "w1.txt", "/w1")
                .with_derived(DerivedContent::ok("I saw a car", vec![])),
            EvidenceItem::new("c", EvidenceKind::Text, "w2.txt", "/w2"),
        ];

        let statements = witness_statements(&items);
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].source, "w1.txt");
        assert_eq!(statements[0].statement, "I saw a car");
    }

    #[test]
    fn test_witness_statements_skip_degraded() {
        let items = vec![EvidenceItem::new("c", EvidenceKind::Text, "w.txt", "/w")
            .with_derived(DerivedContent::degraded("unreadable"))];
        assert!(witness_statements(&items).is_empty());
    }
}
