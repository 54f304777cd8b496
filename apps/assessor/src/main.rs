mod assessment;
mod config;
mod errors;
mod io;
mod llm_client;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assessment::orchestrator::Assessor;
use crate::config::{Cli, Config};
use crate::io::catalog::load_feature_catalog;
use crate::io::sink::{persist_results, CsvDirectorySink};
use crate::io::taxonomy::load_taxonomy;
use crate::llm_client::{LlmClient, OpenAiBackend, RetryPolicy};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration first: a missing API key must stop the run before any
    // input is read or any call is made.
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting NHANES-informed ICD likelihood assessor v{} (feature-availability mode)",
        env!("CARGO_PKG_VERSION")
    );

    // Fatal data errors surface here, before the loop.
    let catalog = load_feature_catalog(&cli.features_csv)?;
    let entries = load_taxonomy(&cli.icd_csv, cli.with_description)?;

    let backend = OpenAiBackend::new(
        config.openai_api_key.clone(),
        &config.openai_base_url,
        config.request_timeout,
    )?;
    let llm = LlmClient::new(Arc::new(backend), RetryPolicy::default());
    info!("LLM client initialized (model: {})", config.model);

    let assessor = Assessor::new(llm, &catalog, cli.settings(&config))?;
    let run = assessor.run(entries).await;
    if run.results.is_empty() {
        warn!("No ICD entries were assessed.");
    }

    info!("Saving results to {}", cli.output_dir.display());
    let sink = CsvDirectorySink::new(cli.output_dir.clone())?;
    for (label, rows) in persist_results(&sink, &run.results)? {
        info!("{label:?}: {rows} rows");
    }
    sink.write_summary(&run.summary)?;

    info!("Assessment completed.");
    Ok(())
}
