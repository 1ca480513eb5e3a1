use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_BASE_URL;

const DEFAULT_HISTORY_CAPACITY: usize = 100;
const SCRATCH_FILE_NAME: &str = "ats_resume_scratch.pdf";

/// Application configuration loaded from environment variables.
/// Startup aborts if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    /// Probe the completion service with the credential before serving.
    pub verify_api_key: bool,
    /// Fixed scratch location for the downloaded resume. One per process.
    pub scratch_path: PathBuf,
    pub history_capacity: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            verify_api_key: parse_flag(
                std::env::var("OPENAI_VERIFY_KEY").ok().as_deref(),
                true,
            )
            .context("OPENAI_VERIFY_KEY must be true or false")?,
            scratch_path: std::env::var("SCRATCH_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join(SCRATCH_FILE_NAME)),
            history_capacity: std::env::var("HISTORY_CAPACITY")
                .unwrap_or_else(|_| DEFAULT_HISTORY_CAPACITY.to_string())
                .parse::<usize>()
                .context("HISTORY_CAPACITY must be a non-negative integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_flag(raw: Option<&str>, default: bool) -> Result<bool> {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("unrecognised boolean '{other}'"),
        },
    }
}
