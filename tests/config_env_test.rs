//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads from a
//! .env file via dotenvy, so these tests focus on override behavior.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use caseline::config::{Config, LogFormat};
use serial_test::serial;
use std::env;

/// The one required variable; set it so from_env() succeeds everywhere.
fn with_api_key() {
    env::set_var("MODEL_API_KEY", "test-key");
}

#[test]
#[serial]
fn test_config_requires_model_api_key() {
    env::remove_var("MODEL_API_KEY");
    let result = Config::from_env();
    // Can still succeed if a .env file provides the key; otherwise the
    // error must name the missing variable.
    if let Err(e) = result {
        assert!(e.to_string().contains("MODEL_API_KEY"));
    }
    with_api_key();
}

#[test]
#[serial]
fn test_config_defaults() {
    with_api_key();
    env::remove_var("MODEL_BASE_URL");
    env::remove_var("SERVER_BIND");
    env::remove_var("MAX_FRAMES_PER_VIDEO");

    let config = Config::from_env().unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:8780");
    assert_eq!(config.pipeline.max_frames_per_video, 15);
    assert_eq!(config.pipeline.frame_downsample_threshold, 30);
    assert_eq!(config.pipeline.reconstruction_count, 2);
    assert_eq!(config.request.max_retries, 3);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
#[serial]
fn test_config_custom_base_url() {
    with_api_key();
    env::set_var("MODEL_BASE_URL", "https://custom.api.com");

    let config = Config::from_env().unwrap();
    assert_eq!(config.model.base_url, "https://custom.api.com");

    env::remove_var("MODEL_BASE_URL");
}

#[test]
#[serial]
fn test_config_custom_database() {
    with_api_key();
    env::set_var("DATABASE_PATH", "/custom/path.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.path.to_str().unwrap(), "/custom/path.db");
    assert_eq!(config.database.max_connections, 10);

    env::remove_var("DATABASE_PATH");
    env::remove_var("DATABASE_MAX_CONNECTIONS");
}

#[test]
#[serial]
fn test_config_custom_pipe_names() {
    with_api_key();
    env::set_var("PIPE_FUSION", "my-fusion-pipe");
    env::set_var("PIPE_SUMMARIZE", "my-summarize-pipe");

    let config = Config::from_env().unwrap();
    assert_eq!(config.model.pipes.fusion, "my-fusion-pipe");
    assert_eq!(config.model.pipes.summarize, "my-summarize-pipe");
    // Unset pipes keep their defaults.
    assert_eq!(config.model.pipes.transcribe, "audio-transcribe-v1");

    env::remove_var("PIPE_FUSION");
    env::remove_var("PIPE_SUMMARIZE");
}

#[test]
#[serial]
fn test_config_json_log_format() {
    with_api_key();
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    env::remove_var("LOG_FORMAT");
}

#[test]
#[serial]
fn test_config_pipeline_tuning_overrides() {
    with_api_key();
    env::set_var("MAX_FRAMES_PER_VIDEO", "8");
    env::set_var("INTER_CALL_DELAY_MS", "0");
    env::set_var("TEXT_CHAR_CEILING", "500");

    let config = Config::from_env().unwrap();
    assert_eq!(config.pipeline.max_frames_per_video, 8);
    assert_eq!(config.pipeline.inter_call_delay_ms, 0);
    assert_eq!(config.pipeline.text_char_ceiling, 500);

    env::remove_var("MAX_FRAMES_PER_VIDEO");
    env::remove_var("INTER_CALL_DELAY_MS");
    env::remove_var("TEXT_CHAR_CEILING");
}

#[test]
#[serial]
fn test_config_invalid_numeric_falls_back_to_default() {
    with_api_key();
    env::set_var("REQUEST_TIMEOUT_MS", "not-a-number");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 60000);

    env::remove_var("REQUEST_TIMEOUT_MS");
}
