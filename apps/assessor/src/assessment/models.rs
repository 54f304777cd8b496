use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One measurable signal in the available-features catalog.
/// Field order matters: it is the order rendered into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub code: String,
    pub analyte: String,
    pub units: String,
}

/// One diagnosis to assess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyEntry {
    pub code: String,
    pub parent_code: String,
    pub name: String,
    /// Only populated when description mode is enabled.
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentVerdict {
    Possible,
    #[serde(rename = "Not Possible")]
    NotPossible,
}

impl fmt::Display for AssessmentVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentVerdict::Possible => f.write_str("Possible"),
            AssessmentVerdict::NotPossible => f.write_str("Not Possible"),
        }
    }
}

/// Final, immutable per-item output. Field order is the column order of
/// the "all" output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentResult {
    pub code: String,
    pub parent_code: String,
    pub name: String,
    pub verdict: AssessmentVerdict,
    pub reasoning: String,
}

impl AssessmentResult {
    pub fn new(entry: &TaxonomyEntry, verdict: AssessmentVerdict, reasoning: String) -> Self {
        Self {
            code: entry.code.clone(),
            parent_code: entry.parent_code.clone(),
            name: entry.name.clone(),
            verdict,
            reasoning,
        }
    }
}

/// How an item's verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Primary response parsed.
    Direct,
    /// Primary response unparseable, repair response parsed.
    Repaired,
    /// Both unparseable; deterministic `NotPossible`.
    Fallback,
    /// Model call exhausted its retries.
    ApiError,
}

/// A resolved verdict for one item, before it is attached to the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub verdict: AssessmentVerdict,
    pub reasoning: String,
    pub resolution: Resolution,
}

/// The three append-only output collections.
///
/// Invariant: `all.len() == possible.len() + not_possible.len()`, with
/// both subsets in the same relative order as `all`.
#[derive(Debug, Clone, Default)]
pub struct ResultSets {
    pub all: Vec<AssessmentResult>,
    pub possible: Vec<AssessmentResult>,
    pub not_possible: Vec<AssessmentResult>,
}

impl ResultSets {
    pub fn record(&mut self, result: AssessmentResult) {
        match result.verdict {
            AssessmentVerdict::Possible => self.possible.push(result.clone()),
            AssessmentVerdict::NotPossible => self.not_possible.push(result.clone()),
        }
        self.all.push(result);
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionCounts {
    pub direct: usize,
    pub repaired: usize,
    pub fallback: usize,
    pub api_error: usize,
}

impl ResolutionCounts {
    pub fn tally(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Direct => self.direct += 1,
            Resolution::Repaired => self.repaired += 1,
            Resolution::Fallback => self.fallback += 1,
            Resolution::ApiError => self.api_error += 1,
        }
    }
}

/// End-of-run report, logged and persisted next to the result tables.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub possible: usize,
    pub not_possible: usize,
    pub resolutions: ResolutionCounts,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct AssessmentRun {
    pub results: ResultSets,
    pub summary: RunSummary,
}
