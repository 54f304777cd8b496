use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::assessment::orchestrator::AssessmentSettings;
use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Endpoint configuration loaded from environment variables.
/// Fails at startup if the API key is missing, before any input is read.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: env_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            model: env_or("OPENAI_MODEL", DEFAULT_MODEL),
            temperature: parse_env("RESPONSE_TEMPERATURE", 0.0)?,
            max_tokens: parse_env("MAX_TOKENS", 300)?,
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 120)?),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

/// Screening-feasibility assessment of an ICD taxonomy against a feature catalog.
#[derive(Debug, Parser)]
#[command(name = "assessor", version)]
pub struct Cli {
    /// Feature catalog CSV (`Variable name`, `Analyte`, `Units`)
    #[arg(long, env = "NHANES_CSV_PATH", default_value = "nhanes_variables.csv")]
    pub features_csv: PathBuf,

    /// ICD taxonomy CSV (`code`, `parent_code`, `name`)
    #[arg(long, env = "ICD_CSV_PATH", default_value = "icd_codes.csv")]
    pub icd_csv: PathBuf,

    /// Directory receiving the result tables
    #[arg(long, env = "OUTPUT_DIR", default_value = "out")]
    pub output_dir: PathBuf,

    /// Assess only the first N ICD entries
    #[arg(long, env = "DISEASE_SCOPE_LIMIT")]
    pub limit: Option<usize>,

    /// Entries assessed concurrently (1 = sequential)
    #[arg(long, env = "ASSESSMENT_CONCURRENCY", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Require a `disease_description` column and include it in prompts
    #[arg(long, env = "INCLUDE_DISEASE_DESCRIPTION")]
    pub with_description: bool,
}

impl Cli {
    pub fn settings(&self, config: &Config) -> AssessmentSettings {
        AssessmentSettings {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            scope_limit: self.limit,
            concurrency: usize::from(self.concurrency),
            include_description: self.with_description,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => Ok(default),
    }
}
