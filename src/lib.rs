//! # Caseline
//!
//! A case analysis orchestrator: ingests heterogeneous evidence (images,
//! video, audio, text, documents), derives per-item summaries through an
//! external reasoning model, fuses them into a world model and timeline,
//! detects contradictions, generates ranked scenarios with visual
//! reconstructions, and assembles everything into an immutable analysis
//! with a timeline confidence heatmap. Progress streams live over SSE.
//!
//! ## Architecture
//!
//! ```text
//! HTTP Client → axum server → Orchestrator → Reasoning pipes (HTTP)
//!                    ↓              ↓               ↓
//!               SSE stream    SQLite (state)   Image renderer (HTTP)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use caseline::config::Config;
//! use caseline::frames::FfmpegExtractor;
//! use caseline::imaging::HttpRenderClient;
//! use caseline::model::HttpReasoningClient;
//! use caseline::pipeline::Orchestrator;
//! use caseline::progress::RunRegistry;
//! use caseline::server::{run_server, AppState};
//! use caseline::storage::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(SqliteStore::new(&config.database).await?);
//!     let model = Arc::new(HttpReasoningClient::new(&config.model, config.request.clone())?);
//!     let render = Arc::new(HttpRenderClient::new(&config.imaging, &config.request)?);
//!     let orchestrator = Arc::new(Orchestrator::new(
//!         store.clone(),
//!         model,
//!         render,
//!         Arc::new(FfmpegExtractor::new("data/frames")),
//!         config.pipeline.clone(),
//!     ));
//!     let state = AppState {
//!         store,
//!         orchestrator,
//!         runs: RunRegistry::new(),
//!         heartbeat_interval_ms: config.server.heartbeat_interval_ms,
//!     };
//!     run_server(&config.server, state).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management, loaded from environment variables.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Video frame extraction and down-sampling.
pub mod frames;
/// Image generation client for scenario reconstructions.
pub mod imaging;
/// Reasoning model client and stage payload types.
pub mod model;
/// The analysis pipeline: stages and the orchestrator.
pub mod pipeline;
/// System prompts for the reasoning pipes.
pub mod prompts;
/// Progress events, the broadcast bus, and the run registry.
pub mod progress;
/// HTTP and SSE transport.
pub mod server;
/// Persistence layer and domain types.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
