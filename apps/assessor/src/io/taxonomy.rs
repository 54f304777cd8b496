use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::assessment::models::TaxonomyEntry;
use crate::errors::AssessorError;
use crate::io::{cell, flexible_reader, header_name, is_overlong};

pub const REQUIRED_COLUMNS: [&str; 3] = ["code", "parent_code", "name"];
/// Required only in description mode.
pub const DESCRIPTION_COLUMN: &str = "disease_description";

pub fn load_taxonomy(
    path: &Path,
    include_description: bool,
) -> Result<Vec<TaxonomyEntry>, AssessorError> {
    info!("Loading ICD codes from: {}", path.display());
    let file = File::open(path)
        .map_err(|e| AssessorError::TaxonomyRead(format!("{}: {e}", path.display())))?;
    read_taxonomy(file, include_description)
}

/// Reads the taxonomy batch in file order. Missing required columns fail
/// with `Schema`, naming every missing column.
pub fn read_taxonomy<R: Read>(
    reader: R,
    include_description: bool,
) -> Result<Vec<TaxonomyEntry>, AssessorError> {
    let mut rdr = flexible_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| AssessorError::TaxonomyRead(e.to_string()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| header_name(h) == name);

    let mut required: Vec<&str> = REQUIRED_COLUMNS.to_vec();
    if include_description {
        required.push(DESCRIPTION_COLUMN);
    }
    let mut missing: Vec<String> = required
        .iter()
        .copied()
        .filter(|&name| column(name).is_none())
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(AssessorError::Schema { missing });
    }

    let code_idx = column("code");
    let parent_idx = column("parent_code");
    let name_idx = column("name");
    let description_idx = column(DESCRIPTION_COLUMN).filter(|_| include_description);

    let mut entries = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = match record {
            Ok(record) if is_overlong(&record, &headers) => {
                warn!(
                    "Skipping malformed ICD row {}: {} fields, expected {}",
                    row + 2,
                    record.len(),
                    headers.len()
                );
                continue;
            }
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed ICD row {}: {e}", row + 2);
                continue;
            }
        };
        entries.push(TaxonomyEntry {
            code: cell(&record, code_idx),
            parent_code: cell(&record, parent_idx),
            name: cell(&record, name_idx),
            description: description_idx.map(|idx| cell(&record, Some(idx))),
        });
    }

    info!("Loaded {} ICD entries.", entries.len());
    Ok(entries)
}
