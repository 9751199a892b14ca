//! Image generation client for scenario reconstructions.
//!
//! The render contract is non-throwing: the client always hands back an
//! artifact, substituting a degraded placeholder when every attempt against
//! the generation API fails. The pipeline therefore never has to treat a
//! reconstruction request as a run-level failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ImagingConfig, RequestConfig};
use crate::error::ModelResult;
use crate::storage::ReconstructionKind;

/// Request for one scenario reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Scenario name, used for logging and the placeholder description.
    pub scenario_name: String,
    /// Narrative the image should depict.
    pub narrative: String,
    /// Camera viewpoint.
    pub viewpoint: String,
    /// Reconstruction kind.
    pub kind: ReconstructionKind,
}

/// A rendered (or placeholder) reconstruction artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageArtifact {
    /// Where the rendered image lives.
    pub storage_url: String,
    /// Human-readable description of the rendering.
    pub description: String,
    /// True when generation failed and this is the degraded placeholder.
    pub placeholder: bool,
}

impl ImageArtifact {
    /// The degraded placeholder substituted when generation fails.
    pub fn placeholder(request: &RenderRequest) -> Self {
        Self {
            storage_url: "placeholder://reconstruction-unavailable".to_string(),
            description: format!(
                "Reconstruction unavailable for scenario '{}' ({} view)",
                request.scenario_name, request.viewpoint
            ),
            placeholder: true,
        }
    }
}

/// Interface to the external image generation service.
#[async_trait]
pub trait RenderClient: Send + Sync {
    /// Render a reconstruction. Never fails; a degraded placeholder artifact
    /// is returned when generation is impossible.
    async fn render_reconstruction(&self, request: RenderRequest) -> ImageArtifact;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: String,
    viewpoint: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    url: String,
    #[serde(default)]
    description: Option<String>,
}

/// HTTP client for the image generation API with an internal fallback chain.
#[derive(Clone)]
pub struct HttpRenderClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl HttpRenderClient {
    /// Create a new render client
    pub fn new(config: &ImagingConfig, request_config: &RequestConfig) -> ModelResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_retries: request_config.max_retries,
            retry_delay_ms: request_config.retry_delay_ms,
        })
    }

    async fn try_generate(&self, request: &RenderRequest) -> Result<ImageArtifact, String> {
        let url = format!("{}/v1/images/generate", self.base_url);
        let prompt = format!(
            "Forensic scene reconstruction, {} view, kind {}: {}",
            request.viewpoint, request.kind, request.narrative
        );

        debug!(scenario = %request.scenario_name, "Requesting reconstruction render");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&GenerateRequest {
                prompt,
                viewpoint: &request.viewpoint,
            })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("generation API returned {}: {}", status, body));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| e.to_string())?;

        Ok(ImageArtifact {
            storage_url: generated.url,
            description: generated.description.unwrap_or_else(|| {
                format!(
                    "Reconstruction of scenario '{}' ({} view)",
                    request.scenario_name, request.viewpoint
                )
            }),
            placeholder: false,
        })
    }
}

#[async_trait]
impl RenderClient for HttpRenderClient {
    async fn render_reconstruction(&self, request: RenderRequest) -> ImageArtifact {
        let mut attempt = 0;

        loop {
            match self.try_generate(&request).await {
                Ok(artifact) => {
                    info!(
                        scenario = %request.scenario_name,
                        url = %artifact.storage_url,
                        "Reconstruction rendered"
                    );
                    return artifact;
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        scenario = %request.scenario_name,
                        error = %e,
                        retry = attempt,
                        "Render attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(
                        self.retry_delay_ms * (2_u64.pow(attempt - 1)),
                    ))
                    .await;
                }
                Err(e) => {
                    warn!(
                        scenario = %request.scenario_name,
                        error = %e,
                        "Render failed after retries, substituting placeholder"
                    );
                    return ImageArtifact::placeholder(&request);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_artifact() {
        let request = RenderRequest {
            scenario_name: "forced entry".to_string(),
            narrative: "someone broke the window".to_string(),
            viewpoint: "wide overview".to_string(),
            kind: ReconstructionKind::MostLikely,
        };

        let artifact = ImageArtifact::placeholder(&request);
        assert!(artifact.placeholder);
        assert!(artifact.description.contains("forced entry"));
        assert!(artifact.storage_url.starts_with("placeholder://"));
    }
}
