use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{AppError, AppResult, StorageResult};
use crate::frames::{select_frame_indices, FrameExtractor};
use crate::model::{ReasoningClient, SummarizeRequest, TranscribeRequest};
use crate::storage::{
    DerivedContent, EvidenceItem, EvidenceKind, EvidenceStore, FrameEvidence,
};

/// Marker appended when text evidence is cut at the character ceiling.
const TRUNCATION_MARKER: &str = "\n[... content truncated for analysis ...]";

/// Per-item evidence dispatcher.
///
/// Normalizes one evidence item of any media type into derived content
/// (summary, tags, transcript, frames). Item failures never cross the item
/// boundary: every internal error is converted into a degraded-but-valid
/// derived record so the pipeline can proceed. Only the derived write-back
/// itself can surface an error, and that one is structural.
pub struct EvidenceProcessor {
    store: Arc<dyn EvidenceStore>,
    model: Arc<dyn ReasoningClient>,
    frames: Arc<dyn FrameExtractor>,
    tuning: PipelineConfig,
}

impl EvidenceProcessor {
    /// Create a new processor.
    pub fn new(
        store: Arc<dyn EvidenceStore>,
        model: Arc<dyn ReasoningClient>,
        frames: Arc<dyn FrameExtractor>,
        tuning: PipelineConfig,
    ) -> Self {
        Self {
            store,
            model,
            frames,
            tuning,
        }
    }

    /// Process one item and write the derived content back to the store.
    ///
    /// Internal failures (unreadable file, model call failure, bad decode)
    /// produce a degraded derived record with `status: error`; they are
    /// re-tried once at fusion time, not here.
    pub async fn process(&self, item: &EvidenceItem) -> StorageResult<DerivedContent> {
        let derived = match self.analyze(item).await {
            Ok(derived) => derived,
            Err(e) => {
                warn!(
                    evidence_id = %item.id,
                    kind = %item.kind,
                    error = %e,
                    "Evidence processing failed, recording degraded summary"
                );
                DerivedContent::degraded(e)
            }
        };

        self.store.save_evidence_derived(&item.id, &derived).await?;

        info!(
            evidence_id = %item.id,
            kind = %item.kind,
            status = ?derived.status,
            "Evidence item processed"
        );

        Ok(derived)
    }

    /// Type dispatch. Errors here are item-local by construction.
    async fn analyze(&self, item: &EvidenceItem) -> AppResult<DerivedContent> {
        debug!(evidence_id = %item.id, kind = %item.kind, "Analyzing evidence item");

        match item.kind {
            EvidenceKind::Video => self.analyze_video(item).await,
            EvidenceKind::Audio => self.analyze_audio(item).await,
            EvidenceKind::Text | EvidenceKind::Document => self.analyze_text(item).await,
            EvidenceKind::Image => self.analyze_image(item).await,
        }
    }

    /// Video: extract frames, down-sample, analyze each selected frame
    /// sequentially, aggregate.
    async fn analyze_video(&self, item: &EvidenceItem) -> AppResult<DerivedContent> {
        let extracted = self
            .frames
            .extract_frames(
                Path::new(&item.storage_url),
                self.tuning.frame_interval_seconds,
            )
            .await
            .map_err(|e| AppError::Internal {
                message: e.to_string(),
            })?;

        if extracted.is_empty() {
            return Err(AppError::Internal {
                message: format!("no frames extracted from {}", item.original_filename),
            });
        }

        // Re-runs re-extract; drop any frames from a prior run first.
        self.store.delete_frames_by_evidence(&item.id).await?;

        let mut frame_records = Vec::with_capacity(extracted.len());
        for frame in &extracted {
            let record = FrameEvidence::new(
                &item.id,
                frame.time_seconds,
                frame.path.display().to_string(),
            );
            self.store.create_frame(&record).await?;
            frame_records.push(record);
        }

        let selected = if frame_records.len() > self.tuning.frame_downsample_threshold {
            let indices =
                select_frame_indices(frame_records.len(), self.tuning.max_frames_per_video);
            info!(
                evidence_id = %item.id,
                total = frame_records.len(),
                selected = indices.len(),
                "Down-sampling video frames"
            );
            indices
        } else {
            (0..frame_records.len()).collect()
        };

        let mut parts = Vec::with_capacity(selected.len());
        let mut tags: Vec<String> = Vec::new();

        for (i, &idx) in selected.iter().enumerate() {
            if i > 0 {
                // Fixed inter-call delay to respect provider rate limits.
                tokio::time::sleep(Duration::from_millis(self.tuning.inter_call_delay_ms)).await;
            }

            let record = &frame_records[idx];
            let bytes = tokio::fs::read(&extracted[idx].path)
                .await
                .map_err(|e| AppError::Internal {
                    message: format!("failed to read frame {}: {}", record.id, e),
                })?;

            let output = self
                .model
                .summarize(SummarizeRequest::media(
                    format!("{} @ {:.0}s", item.original_filename, record.time_seconds),
                    EvidenceKind::Image,
                    &bytes,
                ))
                .await?;

            let frame_derived = DerivedContent::ok(output.summary.clone(), output.tags.clone());
            self.store
                .save_frame_derived(&record.id, &frame_derived)
                .await?;

            parts.push(format!("[t={:.0}s] {}", record.time_seconds, output.summary));
            for tag in output.tags {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }

        let frame_ids = frame_records.iter().map(|f| f.id.clone()).collect();
        Ok(DerivedContent::ok(parts.join("\n"), tags).with_frame_ids(frame_ids))
    }

    /// Audio: transcribe, wrap the transcript as the summary.
    async fn analyze_audio(&self, item: &EvidenceItem) -> AppResult<DerivedContent> {
        let bytes = tokio::fs::read(&item.storage_url)
            .await
            .map_err(|e| AppError::Internal {
                message: format!("failed to read {}: {}", item.original_filename, e),
            })?;

        let transcript = self
            .model
            .transcribe(TranscribeRequest::new(&item.original_filename, &bytes))
            .await?;

        Ok(DerivedContent::ok(
            format!("Audio transcript: {}", transcript),
            vec!["audio".to_string(), "transcript".to_string()],
        )
        .with_transcript(transcript))
    }

    /// Text/document: read (UTF-8 with lossy fallback), truncate, summarize.
    async fn analyze_text(&self, item: &EvidenceItem) -> AppResult<DerivedContent> {
        let bytes = tokio::fs::read(&item.storage_url)
            .await
            .map_err(|e| AppError::Internal {
                message: format!("failed to read {}: {}", item.original_filename, e),
            })?;

        let content = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };

        let bounded = truncate_for_model(&content, self.tuning.text_char_ceiling);

        let output = self
            .model
            .summarize(SummarizeRequest::text(
                &item.original_filename,
                item.kind,
                bounded,
            ))
            .await?;

        Ok(DerivedContent::ok(output.summary, output.tags))
    }

    /// Image: single summarization call over the raw bytes.
    async fn analyze_image(&self, item: &EvidenceItem) -> AppResult<DerivedContent> {
        let bytes = tokio::fs::read(&item.storage_url)
            .await
            .map_err(|e| AppError::Internal {
                message: format!("failed to read {}: {}", item.original_filename, e),
            })?;

        let output = self
            .model
            .summarize(SummarizeRequest::media(
                &item.original_filename,
                EvidenceKind::Image,
                &bytes,
            ))
            .await?;

        Ok(DerivedContent::ok(output.summary, output.tags))
    }
}

/// Cut `content` at the character ceiling, appending the documented marker.
fn truncate_for_model(content: &str, ceiling: usize) -> String {
    if content.chars().count() <= ceiling {
        return content.to_string();
    }
    let mut bounded: String = content.chars().take(ceiling).collect();
    bounded.push_str(TRUNCATION_MARKER);
    bounded
}
