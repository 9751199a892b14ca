use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Case not found: {case_id}")]
    CaseNotFound { case_id: String },

    #[error("Evidence not found: {evidence_id}")]
    EvidenceNotFound { evidence_id: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Reasoning model API errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Video frame extraction errors
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Video file not found: {path}")]
    FileNotFound { path: String },

    #[error("Frame extraction failed: {message}")]
    Extraction { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pipeline run errors. Only structural failures reach this type; item-local
/// and enrichment failures are absorbed into degraded content before they
/// can terminate a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Case not found: {case_id}")]
    CaseNotFound { case_id: String },

    #[error("No evidence uploaded for case {case_id}")]
    NoEvidence { case_id: String },

    #[error("Fusion failed: {0}")]
    Fusion(ModelError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for reasoning model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type alias for frame extraction
pub type FrameResult<T> = Result<T, FrameError>;

/// Result type alias for pipeline runs
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "missing key".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: missing key");

        let err = AppError::Internal {
            message: "unexpected".to_string(),
        };
        assert_eq!(err.to_string(), "Internal error: unexpected");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Connection {
            message: "failed to connect".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Database connection failed: failed to connect"
        );

        let err = StorageError::CaseNotFound {
            case_id: "case-123".to_string(),
        };
        assert_eq!(err.to_string(), "Case not found: case-123");

        let err = StorageError::EvidenceNotFound {
            evidence_id: "ev-456".to_string(),
        };
        assert_eq!(err.to_string(), "Evidence not found: ev-456");
    }

    #[test]
    fn test_model_error_display() {
        let err = ModelError::Unavailable {
            message: "server down".to_string(),
            retries: 3,
        };
        assert_eq!(
            err.to_string(),
            "Model unavailable: server down (retries: 3)"
        );

        let err = ModelError::Api {
            status: 401,
            message: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 401 - unauthorized");

        let err = ModelError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.to_string(), "Request timeout after 5000ms");
    }

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::FileNotFound {
            path: "/tmp/missing.mp4".to_string(),
        };
        assert_eq!(err.to_string(), "Video file not found: /tmp/missing.mp4");
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::NoEvidence {
            case_id: "case-1".to_string(),
        };
        assert_eq!(err.to_string(), "No evidence uploaded for case case-1");

        let err = PipelineError::Fusion(ModelError::InvalidResponse {
            message: "malformed JSON".to_string(),
        });
        assert!(err.to_string().contains("Fusion failed"));
    }

    #[test]
    fn test_storage_error_conversion_to_app_error() {
        let storage_err = StorageError::CaseNotFound {
            case_id: "test-123".to_string(),
        };
        let app_err: AppError = storage_err.into();
        assert!(matches!(app_err, AppError::Storage(_)));
    }

    #[test]
    fn test_model_error_conversion_to_app_error() {
        let model_err = ModelError::Timeout { timeout_ms: 1000 };
        let app_err: AppError = model_err.into();
        assert!(matches!(app_err, AppError::Model(_)));
    }

    #[test]
    fn test_pipeline_error_conversion_to_app_error() {
        let err = PipelineError::NoEvidence {
            case_id: "c".to_string(),
        };
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Pipeline(_)));
    }
}
