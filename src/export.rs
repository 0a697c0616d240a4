//! CSV rendering of query results
//!
//! Every row is written, header included. Lines end with `\r\n`, fields
//! are quoted only when they contain a comma, quote, or line break, and a
//! missing value is written as an empty field.

use crate::error::{AuditError, Result};
use crate::types::ResultSet;

/// Content type used for export objects
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Render a result set as one CSV payload
pub fn render_csv(results: &ResultSet) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .flexible(true)
        .from_writer(Vec::new());

    for row in &results.rows {
        writer
            .write_record(row.iter().map(|field| field.as_deref().unwrap_or("")))
            .map_err(|e| AuditError::Export(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| AuditError::Export(e.to_string()))
}

/// Split an export key into its prefix directory and file name
///
/// `estadisticas/query_results.csv` → (`estadisticas/`, `query_results.csv`)
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind('/') {
        Some(idx) => key.split_at(idx + 1),
        None => ("", key),
    }
}

/// Per-run archive key beside the fixed export key
///
/// `estadisticas/query_results.csv` at 2024-01-01T10:00:00Z →
/// `estadisticas/runs/20240101T100000Z-query_results.csv`
pub fn archive_key(key: &str, at: chrono::DateTime<chrono::Utc>) -> String {
    let (prefix, file) = split_key(key);
    format!("{}runs/{}-{}", prefix, at.format("%Y%m%dT%H%M%SZ"), file)
}
