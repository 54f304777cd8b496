//! Assessment Orchestrator: drives every taxonomy entry through the pipeline.
//!
//! Flow per item: build prompts → call model → parse →
//!       (unparseable) repair → (still unparseable) fallback → record.
//!
//! A `ModelCallError` anywhere in an item's flow is caught here and becomes a
//! `NotPossible` result with an `API error:` rationale. One failing item never
//! aborts the batch, and every input entry yields exactly one result.
//!
//! With `concurrency > 1` up to that many items are in flight at once.
//! Results are still emitted in input order because the stream is buffered,
//! not unordered.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assessment::models::{
    Assessment, AssessmentResult, AssessmentRun, AssessmentVerdict, FeatureDescriptor,
    Resolution, ResolutionCounts, ResultSets, RunSummary, TaxonomyEntry,
};
use crate::assessment::parser::parse_response;
use crate::assessment::prompts::PromptBuilder;
use crate::assessment::repair::repair;
use crate::errors::AssessorError;
use crate::llm_client::{ChatRequest, LlmClient, ModelCallError, DEFAULT_MODEL};

/// Immutable per-run configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct AssessmentSettings {
    pub model: String,
    /// 0.0 is deterministic.
    pub temperature: f32,
    pub max_tokens: u32,
    /// Only the first N entries are assessed when set.
    pub scope_limit: Option<usize>,
    /// Items in flight at once. 1 is strictly sequential.
    pub concurrency: usize,
    pub include_description: bool,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: 300,
            scope_limit: None,
            concurrency: 1,
            include_description: false,
        }
    }
}

pub struct Assessor {
    llm: LlmClient,
    prompts: PromptBuilder,
    settings: AssessmentSettings,
}

impl Assessor {
    /// The catalog is rendered into prompt form once, here.
    pub fn new(
        llm: LlmClient,
        catalog: &[FeatureDescriptor],
        settings: AssessmentSettings,
    ) -> Result<Self, AssessorError> {
        let prompts = PromptBuilder::new(catalog, settings.include_description)?;
        Ok(Self {
            llm,
            prompts,
            settings,
        })
    }

    /// Assesses the batch (after applying the scope limit) and returns the
    /// three result collections plus a run summary. Never fails: per-item
    /// errors are folded into results.
    pub async fn run(&self, entries: impl IntoIterator<Item = TaxonomyEntry>) -> AssessmentRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let entries: Vec<TaxonomyEntry> = match self.settings.scope_limit {
            Some(limit) => {
                info!("Limiting processing to first {limit} ICD entries.");
                entries.into_iter().take(limit).collect()
            }
            None => entries.into_iter().collect(),
        };
        let total = entries.len();
        let concurrency = self.settings.concurrency.max(1);

        info!(
            %run_id,
            "Starting disease feasibility assessment of {} entries (model: {}, concurrency: {})",
            total, self.settings.model, concurrency
        );

        let outcomes: Vec<(AssessmentResult, Resolution)> =
            stream::iter(entries.iter().enumerate())
                .map(|(idx, entry)| self.assess_entry(idx + 1, total, entry))
                .buffered(concurrency)
                .collect()
                .await;

        let mut results = ResultSets::default();
        let mut resolutions = ResolutionCounts::default();
        for (result, resolution) in outcomes {
            resolutions.tally(resolution);
            results.record(result);
        }

        let summary = RunSummary {
            run_id,
            model: self.settings.model.clone(),
            started_at,
            finished_at: Utc::now(),
            total: results.len(),
            possible: results.possible.len(),
            not_possible: results.not_possible.len(),
            resolutions,
        };

        info!(
            %run_id,
            "Assessment finished: {} total, {} possible, {} not possible \
             (direct={}, repaired={}, fallback={}, api_error={})",
            summary.total,
            summary.possible,
            summary.not_possible,
            summary.resolutions.direct,
            summary.resolutions.repaired,
            summary.resolutions.fallback,
            summary.resolutions.api_error
        );

        AssessmentRun { results, summary }
    }

    async fn assess_entry(
        &self,
        index: usize,
        total: usize,
        entry: &TaxonomyEntry,
    ) -> (AssessmentResult, Resolution) {
        info!("[{index}/{total}] Assessing ICD {} — {} ...", entry.code, entry.name);

        let assessment = match self.resolve(entry).await {
            Ok(assessment) => assessment,
            Err(err) => {
                warn!("[{index}/{total}] API error for ICD {}: {err}", entry.code);
                Assessment {
                    verdict: AssessmentVerdict::NotPossible,
                    reasoning: format!("API error: {err}"),
                    resolution: Resolution::ApiError,
                }
            }
        };

        info!(
            "[{index}/{total}] ICD {} ↳ {} ({:?})",
            entry.code, assessment.verdict, assessment.resolution
        );

        (
            AssessmentResult::new(entry, assessment.verdict, assessment.reasoning),
            assessment.resolution,
        )
    }

    async fn resolve(&self, entry: &TaxonomyEntry) -> Result<Assessment, ModelCallError> {
        let user_prompt = self.prompts.user_prompt(entry);
        let raw = self
            .llm
            .call(&ChatRequest {
                model: &self.settings.model,
                system: self.prompts.system_prompt(),
                user: &user_prompt,
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
            })
            .await?;

        debug!("Model raw output for ICD {}:\n{}", entry.code, raw.trim());

        match parse_response(&raw).resolved() {
            Some((verdict, reasoning)) => Ok(Assessment {
                verdict,
                reasoning,
                resolution: Resolution::Direct,
            }),
            None => repair(&self.llm, &self.settings.model, &raw).await,
        }
    }
}
