//! Repair Coordinator: one reformatting pass for unparseable responses.
//!
//! Single-shot: the repair response is parsed once, and if it still has no
//! verdict the item gets the deterministic `NotPossible` fallback. There is
//! never a repair of a repair.

use tracing::warn;

use crate::assessment::models::{Assessment, AssessmentVerdict, Resolution};
use crate::assessment::parser::parse_response;
use crate::assessment::prompts::repair_prompt;
use crate::llm_client::prompts::STRICT_FORMATTER_SYSTEM;
use crate::llm_client::{ChatRequest, LlmClient, ModelCallError};

const REPAIR_TEMPERATURE: f32 = 0.0;
const REPAIR_MAX_TOKENS: u32 = 200;
/// Characters of the original response kept in the fallback reasoning.
const FALLBACK_RAW_CHARS: usize = 300;

/// Asks the model to restate `raw_text` canonically, then re-parses.
///
/// Only transport failure is an error; it is left to the caller's per-item
/// isolation like any other model call failure.
pub async fn repair(
    llm: &LlmClient,
    model: &str,
    raw_text: &str,
) -> Result<Assessment, ModelCallError> {
    warn!("Output not in expected format. Attempting to reformat...");

    let prompt = repair_prompt(raw_text);
    let repaired = llm
        .call(&ChatRequest {
            model,
            system: STRICT_FORMATTER_SYSTEM,
            user: &prompt,
            temperature: REPAIR_TEMPERATURE,
            max_tokens: REPAIR_MAX_TOKENS,
        })
        .await?;

    match parse_response(&repaired).resolved() {
        Some((verdict, reasoning)) => Ok(Assessment {
            verdict,
            reasoning,
            resolution: Resolution::Repaired,
        }),
        None => {
            warn!("Still unparseable after repair. Marking as 'Not Possible'.");
            Ok(fallback(raw_text))
        }
    }
}

/// Deterministic verdict for a response that survived neither parse.
pub fn fallback(raw_text: &str) -> Assessment {
    let head: String = raw_text.chars().take(FALLBACK_RAW_CHARS).collect();
    Assessment {
        verdict: AssessmentVerdict::NotPossible,
        reasoning: format!("Unparseable output. Raw: {head}"),
        resolution: Resolution::Fallback,
    }
}
