use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{
    decode_stage_output, ContradictionFinding, ContradictionOutput, FusionOutput, Message,
    PipeRequest, PipeResponse, ScenarioDraft, ScenarioOutput, SummarizeRequest, SummaryInput,
    SummaryOutput, TranscribeRequest, WitnessStatement,
};
use super::ReasoningClient;
use crate::config::{ModelConfig, RequestConfig};
use crate::error::{ModelError, ModelResult};
use crate::prompts::{
    CONTRADICTION_PROMPT, FUSION_PROMPT, SCENARIO_PROMPT, SUMMARIZE_PROMPT, TRANSCRIBE_PROMPT,
};
use crate::storage::TimelineEvent;

/// HTTP client for the reasoning model pipes API
#[derive(Clone)]
pub struct HttpReasoningClient {
    client: Client,
    base_url: String,
    api_key: String,
    pipes: crate::config::PipeConfig,
    request_config: RequestConfig,
}

impl HttpReasoningClient {
    /// Create a new reasoning model client
    pub fn new(config: &ModelConfig, request_config: RequestConfig) -> ModelResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ModelError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            pipes: config.pipes.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call a model pipe with retry and exponential backoff
    pub async fn call_pipe(&self, request: PipeRequest) -> ModelResult<PipeResponse> {
        let url = format!("{}/v1/pipes/run", self.base_url);
        let pipe_name = request.name.clone();

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    pipe = %pipe_name,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying model request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(response) => {
                    let latency = start.elapsed();
                    info!(
                        pipe = %pipe_name,
                        latency_ms = latency.as_millis(),
                        "Model pipe call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    let latency = start.elapsed();
                    error!(
                        pipe = %pipe_name,
                        error = %e,
                        latency_ms = latency.as_millis(),
                        retry = retries,
                        "Model pipe call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(ModelError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &PipeRequest,
    ) -> ModelResult<PipeResponse> {
        debug!(
            pipe = %request.name,
            messages = request.messages.len(),
            "Calling model pipe"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    ModelError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let pipe_response: PipeResponse =
            response
                .json()
                .await
                .map_err(|e| ModelError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        Ok(pipe_response)
    }
}

#[async_trait]
impl ReasoningClient for HttpReasoningClient {
    async fn summarize(&self, request: SummarizeRequest) -> ModelResult<SummaryOutput> {
        let payload = serde_json::to_string(&request).map_err(|e| ModelError::InvalidResponse {
            message: format!("Failed to encode summarize payload: {}", e),
        })?;

        let messages = vec![Message::system(SUMMARIZE_PROMPT), Message::user(payload)];
        let response = self
            .call_pipe(PipeRequest::new(&self.pipes.summarize, messages))
            .await?;

        decode_stage_output(&response.completion)
    }

    async fn transcribe(&self, request: TranscribeRequest) -> ModelResult<String> {
        let payload = serde_json::to_string(&request).map_err(|e| ModelError::InvalidResponse {
            message: format!("Failed to encode transcribe payload: {}", e),
        })?;

        let messages = vec![Message::system(TRANSCRIBE_PROMPT), Message::user(payload)];
        let response = self
            .call_pipe(PipeRequest::new(&self.pipes.transcribe, messages))
            .await?;

        // The transcript is the completion itself, not a JSON envelope.
        Ok(response.completion.trim().to_string())
    }

    async fn fuse(&self, inputs: Vec<SummaryInput>) -> ModelResult<FusionOutput> {
        let payload = serde_json::to_string(&inputs).map_err(|e| ModelError::InvalidResponse {
            message: format!("Failed to encode fusion payload: {}", e),
        })?;

        let messages = vec![
            Message::system(FUSION_PROMPT),
            Message::user(format!("Evidence summaries:\n{}", payload)),
        ];
        let response = self
            .call_pipe(PipeRequest::new(&self.pipes.fusion, messages))
            .await?;

        decode_stage_output(&response.completion)
    }

    async fn detect_contradictions(
        &self,
        timeline: Vec<TimelineEvent>,
        summaries: Vec<SummaryInput>,
        witness_statements: Vec<WitnessStatement>,
    ) -> ModelResult<Vec<ContradictionFinding>> {
        let payload = serde_json::json!({
            "timeline": timeline,
            "summaries": summaries,
            "witness_statements": witness_statements,
        });

        let messages = vec![
            Message::system(CONTRADICTION_PROMPT),
            Message::user(payload.to_string()),
        ];
        let response = self
            .call_pipe(PipeRequest::new(&self.pipes.contradiction, messages))
            .await?;

        let output: ContradictionOutput = decode_stage_output(&response.completion)?;
        Ok(output.contradictions)
    }

    async fn generate_scenarios(
        &self,
        world_model: String,
        timeline: Vec<TimelineEvent>,
        contradictions: Vec<crate::storage::Contradiction>,
    ) -> ModelResult<Vec<ScenarioDraft>> {
        let payload = serde_json::json!({
            "world_model": world_model,
            "timeline": timeline,
            "contradictions": contradictions,
        });

        let messages = vec![
            Message::system(SCENARIO_PROMPT),
            Message::user(payload.to_string()),
        ];
        let response = self
            .call_pipe(PipeRequest::new(&self.pipes.scenario, messages))
            .await?;

        let output: ScenarioOutput = decode_stage_output(&response.completion)?;
        Ok(output.scenarios)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipeConfig;

    #[test]
    fn test_client_creation() {
        let config = ModelConfig {
            api_key: "test_key".to_string(),
            base_url: "https://api.langbase.com".to_string(),
            pipes: PipeConfig {
                summarize: "s".to_string(),
                transcribe: "t".to_string(),
                fusion: "f".to_string(),
                contradiction: "c".to_string(),
                scenario: "sc".to_string(),
            },
        };

        let request_config = RequestConfig::default();

        let client = HttpReasoningClient::new(&config, request_config);
        assert!(client.is_ok());
    }
}
