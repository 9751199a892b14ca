//! Integration tests for the SQLite store
//!
//! Runs against in-memory databases; each test gets a fresh schema via the
//! embedded migrations.

use caseline::error::StorageError;
use caseline::storage::{
    Case, CaseAnalysis, CaseStatus, DerivedContent, EvidenceItem, EvidenceKind, EvidenceStore,
    FrameEvidence, Heatmap, SqliteStore,
};

async fn create_store() -> SqliteStore {
    SqliteStore::new_in_memory()
        .await
        .expect("Failed to create in-memory store")
}

fn sample_analysis(case_id: &str, summary: &str) -> CaseAnalysis {
    CaseAnalysis {
        case_id: case_id.to_string(),
        status: CaseStatus::Completed,
        timeline: vec![],
        contradictions: vec![],
        scenarios: vec![],
        global_summary: summary.to_string(),
        heatmap: Heatmap { segments: vec![] },
        evidence_summaries: vec![],
        reconstructions: vec![],
    }
}

mod case_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_case() {
        let store = create_store().await;
        let case = Case::new("Warehouse break-in").with_description("Night of the 14th");

        store.create_case(&case).await.expect("create should succeed");

        let loaded = store
            .get_case(&case.id)
            .await
            .expect("get should succeed")
            .expect("case should exist");
        assert_eq!(loaded.name, "Warehouse break-in");
        assert_eq!(loaded.description.as_deref(), Some("Night of the 14th"));
        assert_eq!(loaded.status, CaseStatus::Pending);
    }

    #[tokio::test]
    async fn test_get_missing_case_returns_none() {
        let store = create_store().await;
        let loaded = store.get_case("no-such-id").await.expect("get should succeed");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_status_transitions_persist() {
        let store = create_store().await;
        let case = Case::new("Case");
        store.create_case(&case).await.unwrap();

        store
            .set_case_status(&case.id, CaseStatus::Running)
            .await
            .unwrap();
        let loaded = store.get_case(&case.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CaseStatus::Running);

        store
            .set_case_status(&case.id, CaseStatus::Error)
            .await
            .unwrap();
        let loaded = store.get_case(&case.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CaseStatus::Error);
    }

    #[tokio::test]
    async fn test_set_status_on_missing_case_fails() {
        let store = create_store().await;
        let err = store
            .set_case_status("ghost", CaseStatus::Running)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CaseNotFound { .. }));
    }
}

mod evidence_tests {
    use super::*;

    #[tokio::test]
    async fn test_evidence_roundtrip_with_derived() {
        let store = create_store().await;
        let case = Case::new("Case");
        store.create_case(&case).await.unwrap();

        let item = EvidenceItem::new(
            &case.id,
            EvidenceKind::Image,
            "cam01.jpg",
            "file:///evidence/cam01.jpg",
        );
        store.create_evidence(&item).await.unwrap();

        let loaded = store.get_evidence(&item.id).await.unwrap().unwrap();
        assert_eq!(loaded.kind, EvidenceKind::Image);
        assert!(loaded.derived.is_none());

        let derived =
            DerivedContent::ok("A sedan by the gate.", vec!["vehicle".to_string()]);
        store.save_evidence_derived(&item.id, &derived).await.unwrap();

        let loaded = store.get_evidence(&item.id).await.unwrap().unwrap();
        let derived = loaded.derived.expect("derived should persist");
        assert_eq!(derived.summary, "A sedan by the gate.");
        assert!(!derived.is_degraded());
    }

    #[tokio::test]
    async fn test_get_evidence_by_case_upload_order() {
        let store = create_store().await;
        let case = Case::new("Case");
        store.create_case(&case).await.unwrap();

        for name in ["a.jpg", "b.mp3", "c.txt"] {
            let kind = match name {
                "a.jpg" => EvidenceKind::Image,
                "b.mp3" => EvidenceKind::Audio,
                _ => EvidenceKind::Text,
            };
            let item = EvidenceItem::new(&case.id, kind, name, format!("file:///{name}"));
            store.create_evidence(&item).await.unwrap();
        }

        let items = store.get_evidence_by_case(&case.id).await.unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.original_filename.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.mp3", "c.txt"]);
    }

    #[tokio::test]
    async fn test_save_derived_on_missing_evidence_fails() {
        let store = create_store().await;
        let derived = DerivedContent::ok("x", vec![]);
        let err = store
            .save_evidence_derived("ghost", &derived)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::EvidenceNotFound { .. }));
    }
}

mod frame_tests {
    use super::*;

    async fn video_item(store: &SqliteStore) -> EvidenceItem {
        let case = Case::new("Case");
        store.create_case(&case).await.unwrap();
        let item = EvidenceItem::new(
            &case.id,
            EvidenceKind::Video,
            "lot.mp4",
            "file:///lot.mp4",
        );
        store.create_evidence(&item).await.unwrap();
        item
    }

    #[tokio::test]
    async fn test_frames_ordered_by_time() {
        let store = create_store().await;
        let item = video_item(&store).await;

        // Insert out of order; reads must come back time-ascending.
        for t in [4.0, 0.0, 2.0] {
            let frame = FrameEvidence::new(&item.id, t, format!("file:///frames/{t}.jpg"));
            store.create_frame(&frame).await.unwrap();
        }

        let frames = store.get_frames_by_evidence(&item.id).await.unwrap();
        let times: Vec<f64> = frames.iter().map(|f| f.time_seconds).collect();
        assert_eq!(times, vec![0.0, 2.0, 4.0]);
    }

    #[tokio::test]
    async fn test_delete_frames_clears_prior_run() {
        let store = create_store().await;
        let item = video_item(&store).await;

        let frame = FrameEvidence::new(&item.id, 1.0, "file:///frames/1.jpg");
        store.create_frame(&frame).await.unwrap();
        assert_eq!(store.get_frames_by_evidence(&item.id).await.unwrap().len(), 1);

        store.delete_frames_by_evidence(&item.id).await.unwrap();
        assert!(store.get_frames_by_evidence(&item.id).await.unwrap().is_empty());

        // Idempotent on an already-empty set.
        store.delete_frames_by_evidence(&item.id).await.unwrap();
    }
}

mod analysis_tests {
    use super::*;

    #[tokio::test]
    async fn test_analysis_roundtrip() {
        let store = create_store().await;
        let case = Case::new("Case");
        store.create_case(&case).await.unwrap();

        assert!(store.get_analysis(&case.id).await.unwrap().is_none());

        let analysis = sample_analysis(&case.id, "First pass");
        store.save_analysis(&analysis).await.unwrap();

        let loaded = store.get_analysis(&case.id).await.unwrap().unwrap();
        assert_eq!(loaded.global_summary, "First pass");
        assert_eq!(loaded.status, CaseStatus::Completed);
    }

    #[tokio::test]
    async fn test_rerun_replaces_analysis_wholesale() {
        let store = create_store().await;
        let case = Case::new("Case");
        store.create_case(&case).await.unwrap();

        store
            .save_analysis(&sample_analysis(&case.id, "First pass"))
            .await
            .unwrap();
        store
            .save_analysis(&sample_analysis(&case.id, "Second pass"))
            .await
            .unwrap();

        let loaded = store.get_analysis(&case.id).await.unwrap().unwrap();
        assert_eq!(loaded.global_summary, "Second pass");
    }

    #[tokio::test]
    async fn test_analysis_serializes_camel_case() {
        let mut analysis = sample_analysis("case-1", "Summary");
        analysis.heatmap.segments.push(caseline::storage::HeatmapSegment {
            start_time: 0.0,
            end_time: 9.0,
            confidence: 0.5,
            contradiction_score: 0.0,
        });

        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["caseId"], "case-1");
        assert_eq!(json["globalSummary"], "Summary");
        assert!(json["evidenceSummaries"].is_array());
        assert_eq!(json["heatmap"]["segments"][0]["startTime"], 0.0);
        assert_eq!(json["heatmap"]["segments"][0]["contradictionScore"], 0.0);
        assert!(json.get("case_id").is_none());
    }
}
