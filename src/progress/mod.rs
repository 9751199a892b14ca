//! Progress bus for streaming pipeline progress to transport subscribers.
//!
//! Each run owns one broadcast channel. The pipeline task is the sole
//! publisher; zero or more subscribers (an SSE connection, tests) read
//! published events. Publishing is lossy and never blocks the pipeline, and
//! dropping every subscriber has no effect on the run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

/// Run status carried on every progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Error,
}

/// One ephemeral progress event. Never persisted.
///
/// Serializes camelCase to match the stream's wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    /// Human-readable step label.
    pub step: String,
    /// Percent complete, 0-100, monotonic within a run.
    pub progress: u8,
    /// Free-text rationale for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Filename being processed (evidence stage only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_item: Option<String>,
    /// Run status.
    pub status: RunStatus,
    /// Coarse stage counter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u8>,
    /// Total stage count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u8>,
    /// Terminal error message (status `error` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisProgress {
    /// A running progress event for a stage.
    pub fn running(step: impl Into<String>, progress: u8) -> Self {
        Self {
            step: step.into(),
            progress,
            reasoning: None,
            current_item: None,
            status: RunStatus::Running,
            step_number: None,
            total_steps: None,
            error: None,
        }
    }

    /// The terminal success event.
    pub fn completed(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            progress: 100,
            reasoning: None,
            current_item: None,
            status: RunStatus::Completed,
            step_number: None,
            total_steps: None,
            error: None,
        }
    }

    /// The terminal failure event.
    pub fn failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            progress: 100,
            reasoning: None,
            current_item: None,
            status: RunStatus::Error,
            step_number: None,
            total_steps: None,
            error: Some(message.into()),
        }
    }

    /// Set the stage counter.
    pub fn with_stage(mut self, step_number: u8, total_steps: u8) -> Self {
        self.step_number = Some(step_number);
        self.total_steps = Some(total_steps);
        self
    }

    /// Set the display rationale.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Set the item filename being processed.
    pub fn with_current_item(mut self, item: impl Into<String>) -> Self {
        self.current_item = Some(item.into());
        self
    }

    /// True for `completed` and `error` events.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::Error)
    }
}

/// Single-producer/multi-consumer progress channel for one run.
///
/// `publish` enforces monotonic `progress` (a late-arriving lower value is
/// clamped up to the last published one) and drops events when nobody is
/// listening.
#[derive(Clone)]
pub struct ProgressBus {
    tx: broadcast::Sender<AnalysisProgress>,
    last_progress: Arc<Mutex<u8>>,
}

impl ProgressBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            last_progress: Arc::new(Mutex::new(0)),
        }
    }

    /// Publish an event, best-effort. Never blocks, never fails.
    pub fn publish(&self, mut event: AnalysisProgress) {
        {
            let mut last = self.last_progress.lock().expect("progress lock poisoned");
            if event.progress < *last {
                event.progress = *last;
            } else {
                *last = event.progress;
            }
        }
        debug!(step = %event.step, progress = event.progress, "Progress event");
        // No subscribers is fine; delivery is best-effort.
        let _ = self.tx.send(event);
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisProgress> {
        self.tx.subscribe()
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(128)
    }
}

/// Registry of in-flight runs, keyed by case ID.
///
/// Enforces one active pipeline per case and lets the SSE endpoint attach to
/// a run that is already underway. Dropping a subscriber never cancels the
/// run; the bus entry is removed by the spawning task when the run ends.
#[derive(Clone, Default)]
pub struct RunRegistry {
    inner: Arc<Mutex<HashMap<String, ProgressBus>>>,
}

impl RunRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a run for a case. Returns `None` when one is already active.
    pub fn begin(&self, case_id: &str) -> Option<ProgressBus> {
        let mut inner = self.inner.lock().expect("run registry lock poisoned");
        if inner.contains_key(case_id) {
            return None;
        }
        let bus = ProgressBus::default();
        inner.insert(case_id.to_string(), bus.clone());
        Some(bus)
    }

    /// Subscribe to an in-flight run, if any.
    pub fn subscribe(&self, case_id: &str) -> Option<broadcast::Receiver<AnalysisProgress>> {
        let inner = self.inner.lock().expect("run registry lock poisoned");
        inner.get(case_id).map(|bus| bus.subscribe())
    }

    /// True when a run is active for the case.
    pub fn is_running(&self, case_id: &str) -> bool {
        let inner = self.inner.lock().expect("run registry lock poisoned");
        inner.contains_key(case_id)
    }

    /// Remove a finished run.
    pub fn finish(&self, case_id: &str) {
        let mut inner = self.inner.lock().expect("run registry lock poisoned");
        inner.remove(case_id);
    }
}
