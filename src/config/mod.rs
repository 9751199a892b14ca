use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub imaging: ImagingConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
}

/// Reasoning model API configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    /// Named model pipes, one per pipeline stage.
    pub pipes: PipeConfig,
}

/// Image generation API configuration
#[derive(Debug, Clone)]
pub struct ImagingConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Model pipe name configuration, one pipe per stage contract
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub summarize: String,
    pub transcribe: String,
    pub fusion: String,
    pub contradiction: String,
    pub scenario: String,
}

/// Pipeline tuning knobs
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Frame sampling interval in seconds (1 Hz by default).
    pub frame_interval_seconds: f64,
    /// Down-sample videos with more than this many frames.
    pub frame_downsample_threshold: usize,
    /// Maximum frames analyzed per video after down-sampling.
    pub max_frames_per_video: usize,
    /// Fixed delay between consecutive external calls (frame analysis,
    /// reconstruction requests) to respect provider rate limits.
    pub inter_call_delay_ms: u64,
    /// Character ceiling for text/document evidence before summarization.
    pub text_char_ceiling: usize,
    /// Viewpoint requested for scenario reconstructions.
    pub reconstruction_viewpoint: String,
    /// How many top scenarios get a reconstruction.
    pub reconstruction_count: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub heartbeat_interval_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let pipes = PipeConfig {
            summarize: env::var("PIPE_SUMMARIZE")
                .unwrap_or_else(|_| "evidence-summarize-v1".to_string()),
            transcribe: env::var("PIPE_TRANSCRIBE")
                .unwrap_or_else(|_| "audio-transcribe-v1".to_string()),
            fusion: env::var("PIPE_FUSION").unwrap_or_else(|_| "case-fusion-v1".to_string()),
            contradiction: env::var("PIPE_CONTRADICTION")
                .unwrap_or_else(|_| "contradiction-detect-v1".to_string()),
            scenario: env::var("PIPE_SCENARIO")
                .unwrap_or_else(|_| "scenario-generate-v1".to_string()),
        };

        let model = ModelConfig {
            api_key: env::var("MODEL_API_KEY").map_err(|_| AppError::Config {
                message: "MODEL_API_KEY is required".to_string(),
            })?,
            base_url: env::var("MODEL_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
            pipes,
        };

        let imaging = ImagingConfig {
            api_key: env::var("IMAGING_API_KEY").unwrap_or_else(|_| String::new()),
            base_url: env::var("IMAGING_BASE_URL")
                .unwrap_or_else(|_| "https://api.imaging.local".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/caseline.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        let pipeline = PipelineConfig {
            frame_interval_seconds: env::var("FRAME_INTERVAL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            frame_downsample_threshold: env::var("FRAME_DOWNSAMPLE_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            max_frames_per_video: env::var("MAX_FRAMES_PER_VIDEO")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
            inter_call_delay_ms: env::var("INTER_CALL_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),
            text_char_ceiling: env::var("TEXT_CHAR_CEILING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(12000),
            reconstruction_viewpoint: env::var("RECONSTRUCTION_VIEWPOINT")
                .unwrap_or_else(|_| "wide overview".to_string()),
            reconstruction_count: env::var("RECONSTRUCTION_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        };

        let server = ServerConfig {
            bind: env::var("SERVER_BIND").unwrap_or_else(|_| "127.0.0.1:8780".to_string()),
            heartbeat_interval_ms: env::var("HEARTBEAT_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15000),
        };

        Ok(Config {
            model,
            imaging,
            database,
            logging,
            request,
            pipeline,
            server,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_interval_seconds: 1.0,
            frame_downsample_threshold: 30,
            max_frames_per_video: 15,
            inter_call_delay_ms: 500,
            text_char_ceiling: 12000,
            reconstruction_viewpoint: "wide overview".to_string(),
            reconstruction_count: 2,
        }
    }
}
