use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::assessment::models::FeatureDescriptor;
use crate::errors::AssessorError;
use crate::io::{cell, flexible_reader, header_name, is_overlong};

const CODE_COLUMN: &str = "Variable name";
const ANALYTE_COLUMN: &str = "Analyte";
const UNITS_COLUMN: &str = "Units";

/// Loads the available-features catalog.
///
/// With a `Variable name` column each row is one feature (rows without a
/// code are skipped). Without it, every header is taken as a bare feature
/// code. Zero features is a `Catalog` error.
pub fn load_feature_catalog(path: &Path) -> Result<Vec<FeatureDescriptor>, AssessorError> {
    info!("Loading NHANES feature catalog from: {}", path.display());
    let file = File::open(path).map_err(|e| {
        AssessorError::Catalog(format!("cannot open {}: {e}", path.display()))
    })?;
    read_feature_catalog(file)
}

pub fn read_feature_catalog<R: Read>(reader: R) -> Result<Vec<FeatureDescriptor>, AssessorError> {
    let mut rdr = flexible_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| AssessorError::Catalog(format!("unreadable header row: {e}")))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| header_name(h) == name);

    let features: Vec<FeatureDescriptor> = match column(CODE_COLUMN) {
        Some(code_idx) => {
            let analyte_idx = column(ANALYTE_COLUMN);
            let units_idx = column(UNITS_COLUMN);
            let mut features = Vec::new();
            for (row, record) in rdr.records().enumerate() {
                let record = match record {
                    Ok(record) if is_overlong(&record, &headers) => {
                        warn!(
                            "Skipping malformed feature catalog row {}: {} fields, expected {}",
                            row + 2,
                            record.len(),
                            headers.len()
                        );
                        continue;
                    }
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Skipping malformed feature catalog row {}: {e}", row + 2);
                        continue;
                    }
                };
                let code = cell(&record, Some(code_idx));
                if code.is_empty() {
                    continue;
                }
                features.push(FeatureDescriptor {
                    code,
                    analyte: cell(&record, analyte_idx),
                    units: cell(&record, units_idx),
                });
            }
            features
        }
        None => headers
            .iter()
            .map(header_name)
            .filter(|h| !h.is_empty())
            .map(|code| FeatureDescriptor {
                code: code.to_string(),
                analyte: String::new(),
                units: String::new(),
            })
            .collect(),
    };

    if features.is_empty() {
        return Err(AssessorError::Catalog(
            "No NHANES features found in the provided CSV.".to_string(),
        ));
    }

    info!("Loaded {} available NHANES features.", features.len());
    Ok(features)
}
