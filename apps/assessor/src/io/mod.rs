// External collaborators: CSV data sources in, labeled result tables out.

pub mod catalog;
pub mod sink;
pub mod taxonomy;

/// Reader tolerant of short rows; they surface with their trailing cells empty.
fn flexible_reader<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().flexible(true).from_reader(reader)
}

/// Rows longer than the header have no column to map the extra cells to.
fn is_overlong(record: &csv::StringRecord, headers: &csv::StringRecord) -> bool {
    record.len() > headers.len()
}

/// Header cell as written by spreadsheet exports: BOM and padding removed.
fn header_name(raw: &str) -> &str {
    raw.trim_start_matches('\u{feff}').trim()
}

/// Cell at `idx`, trimmed; absent columns and short rows read as empty.
fn cell(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .unwrap_or("")
        .trim()
        .to_string()
}
