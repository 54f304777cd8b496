// All LLM prompt constants for the assessment pipeline.
// Reuses the canonical output fragments from llm_client::prompts.

use crate::assessment::models::{FeatureDescriptor, TaxonomyEntry};
use crate::errors::AssessorError;
use crate::llm_client::prompts::{canonical_explanation_line, CANONICAL_VERDICT_LINE};

/// System prompt preamble. The canonical output lines are appended by
/// `system_prompt()`.
const ASSESSMENT_SYSTEM_PREAMBLE: &str = "\
You are a board-certified hematology consultant and senior data scientist.
You will be given:
  • An ICD code and disease name.
  • A list of AVAILABLE NHANES FEATURES (measurement names only; NO patient values).

Your task: Decide whether a *screening/likelihood assessment is possible in principle* using ONLY the listed features.
Interpret 'Possible' as: The available features include the key signals typically used to screen/triage or build a probabilistic model \
that meaningfully enriches disease prevalence beyond base rate (e.g., a reasonable sensitivity/specificity profile could be achieved). \
You do NOT need pathognomonic confirmatory tests; screening suffices. If essential signals are missing (e.g., imaging, genetics, ADAMTS13), \
respond 'Not Possible'. Do not assume access to any feature not listed.

Be strict and evidence-based (hematology PhD level). Cite which features support feasibility vs. which missing features preclude it.

Output MUST follow this exact two-line format (spelling included):
";

/// Per-item prompt template.
/// Replace: {code}, {parent_code}, {name}, {description_line}, {features_json}
const ASSESSMENT_USER_TEMPLATE: &str = "\
ICD code: {code}
ICD parent code: {parent_code}
Disease name: {name}
{description_line}
AVAILABLE NHANES FEATURES (no patient values):
{features_json}

Decide feasibility strictly based on the features above (names and units only).";

/// Repair prompt template. Replace: {verdict_line}, {explanation_line}, {raw_text}
const REPAIR_PROMPT_TEMPLATE: &str = "\
Reformat the text below to exactly match:
{verdict_line}
{explanation_line}

TEXT:
{raw_text}";

/// Renders the system and per-item user instructions.
///
/// The catalog is serialized once at construction and shared by every
/// prompt of the run. Only measurement names and units ever reach the
/// model; there is no field for patient values.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
    features_json: String,
    include_description: bool,
}

impl PromptBuilder {
    pub fn new(
        catalog: &[FeatureDescriptor],
        include_description: bool,
    ) -> Result<Self, AssessorError> {
        let features_json = serde_json::to_string_pretty(catalog)?;
        let system = format!(
            "{ASSESSMENT_SYSTEM_PREAMBLE}{CANONICAL_VERDICT_LINE}\n{}\n",
            canonical_explanation_line("<concise medical reasoning>")
        );
        Ok(Self {
            system,
            features_json,
            include_description,
        })
    }

    /// Constant across all items.
    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    pub fn user_prompt(&self, entry: &TaxonomyEntry) -> String {
        let description_line = match (&entry.description, self.include_description) {
            (Some(description), true) => format!("Disease description: {description}\n"),
            _ => String::new(),
        };

        ASSESSMENT_USER_TEMPLATE
            .replace("{code}", &entry.code)
            .replace("{parent_code}", &entry.parent_code)
            .replace("{name}", &entry.name)
            .replace("{description_line}", &description_line)
            .replace("{features_json}", &self.features_json)
    }
}

/// Asks the model to restate its own unparseable output in canonical shape.
pub fn repair_prompt(raw_text: &str) -> String {
    REPAIR_PROMPT_TEMPLATE
        .replace("{verdict_line}", CANONICAL_VERDICT_LINE)
        .replace("{explanation_line}", &canonical_explanation_line("<text>"))
        .replace("{raw_text}", raw_text)
}
