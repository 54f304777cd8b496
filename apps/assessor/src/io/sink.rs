use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::assessment::models::{AssessmentResult, ResultSets, RunSummary};
use crate::errors::AssessorError;

const ALL_COLUMNS: [&str; 5] = ["code", "parent_code", "name", "verdict", "reasoning"];
const SUBSET_COLUMNS: [&str; 4] = ["code", "parent_code", "name", "reasoning"];
const SUMMARY_FILE: &str = "run_summary.json";

/// Which of the three result tables a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLabel {
    All,
    Possible,
    NotPossible,
}

impl OutputLabel {
    pub fn file_name(self) -> &'static str {
        match self {
            OutputLabel::All => "results_all.csv",
            OutputLabel::Possible => "results_possible.csv",
            OutputLabel::NotPossible => "results_not_possible.csv",
        }
    }
}

/// Destination for labeled result batches. Returns the rows persisted.
pub trait ResultSink {
    fn write_batch(
        &self,
        label: OutputLabel,
        results: &[AssessmentResult],
    ) -> Result<usize, AssessorError>;
}

#[derive(Debug, Serialize)]
struct SubsetRow<'a> {
    code: &'a str,
    parent_code: &'a str,
    name: &'a str,
    reasoning: &'a str,
}

impl<'a> From<&'a AssessmentResult> for SubsetRow<'a> {
    fn from(result: &'a AssessmentResult) -> Self {
        Self {
            code: &result.code,
            parent_code: &result.parent_code,
            name: &result.name,
            reasoning: &result.reasoning,
        }
    }
}

/// Writes each label to its own CSV file inside one directory.
pub struct CsvDirectorySink {
    dir: PathBuf,
}

impl CsvDirectorySink {
    /// Creates the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AssessorError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, label: OutputLabel) -> PathBuf {
        self.dir.join(label.file_name())
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf, AssessorError> {
        let path = self.dir.join(SUMMARY_FILE);
        fs::write(&path, serde_json::to_string_pretty(summary)?)?;
        info!("Wrote run summary to: {}", path.display());
        Ok(path)
    }
}

impl ResultSink for CsvDirectorySink {
    fn write_batch(
        &self,
        label: OutputLabel,
        results: &[AssessmentResult],
    ) -> Result<usize, AssessorError> {
        let path = self.path_for(label);
        // Headers are written explicitly so that empty tables still have one.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;

        match label {
            OutputLabel::All => {
                writer.write_record(ALL_COLUMNS)?;
                for result in results {
                    writer.serialize(result)?;
                }
            }
            OutputLabel::Possible | OutputLabel::NotPossible => {
                writer.write_record(SUBSET_COLUMNS)?;
                for result in results {
                    writer.serialize(SubsetRow::from(result))?;
                }
            }
        }
        writer.flush()?;

        info!("Wrote {} rows to: {}", results.len(), path.display());
        Ok(results.len())
    }
}

/// Writes all three tables; returns the row count per label.
pub fn persist_results(
    sink: &dyn ResultSink,
    results: &ResultSets,
) -> Result<Vec<(OutputLabel, usize)>, AssessorError> {
    [
        (OutputLabel::All, &results.all),
        (OutputLabel::Possible, &results.possible),
        (OutputLabel::NotPossible, &results.not_possible),
    ]
    .into_iter()
    .map(|(label, rows)| sink.write_batch(label, rows).map(|count| (label, count)))
    .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::assessment::models::{AssessmentVerdict, ResolutionCounts};
    use crate::test_support::entry;

    fn sample_sets() -> ResultSets {
        let mut sets = ResultSets::default();
        sets.record(AssessmentResult::new(
            &entry("D50", "D50-D53", "Iron deficiency anemia"),
            AssessmentVerdict::Possible,
            "Hemoglobin, MCV and ferritin are listed.".to_string(),
        ));
        sets.record(AssessmentResult::new(
            &entry("D65", "D60-D77", "Disseminated intravascular coagulation"),
            AssessmentVerdict::NotPossible,
            "insufficient coagulation panel.".to_string(),
        ));
        sets
    }

    #[test]
    fn test_writes_three_tables_with_expected_columns() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvDirectorySink::new(dir.path().join("out")).unwrap();

        let counts = persist_results(&sink, &sample_sets()).unwrap();
        assert_eq!(
            counts,
            vec![
                (OutputLabel::All, 2),
                (OutputLabel::Possible, 1),
                (OutputLabel::NotPossible, 1)
            ]
        );

        let all = fs::read_to_string(sink.path_for(OutputLabel::All)).unwrap();
        assert_eq!(
            all,
            "code,parent_code,name,verdict,reasoning\n\
             D50,D50-D53,Iron deficiency anemia,Possible,\"Hemoglobin, MCV and ferritin are listed.\"\n\
             D65,D60-D77,Disseminated intravascular coagulation,Not Possible,insufficient coagulation panel.\n"
        );

        let not_possible = fs::read_to_string(sink.path_for(OutputLabel::NotPossible)).unwrap();
        assert_eq!(
            not_possible,
            "code,parent_code,name,reasoning\n\
             D65,D60-D77,Disseminated intravascular coagulation,insufficient coagulation panel.\n"
        );
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvDirectorySink::new(dir.path()).unwrap();

        let written = sink.write_batch(OutputLabel::Possible, &[]).unwrap();

        assert_eq!(written, 0);
        let contents = fs::read_to_string(sink.path_for(OutputLabel::Possible)).unwrap();
        assert_eq!(contents, "code,parent_code,name,reasoning\n");
    }

    #[test]
    fn test_summary_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvDirectorySink::new(dir.path()).unwrap();
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            model: "gpt-4o-mini".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            total: 2,
            possible: 1,
            not_possible: 1,
            resolutions: ResolutionCounts {
                direct: 1,
                repaired: 0,
                fallback: 1,
                api_error: 0,
            },
        };

        let path = sink.write_summary(&summary).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["total"], 2);
        assert_eq!(value["resolutions"]["fallback"], 1);
        assert_eq!(value["model"], "gpt-4o-mini");
    }
}
