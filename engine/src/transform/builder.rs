//! Record builder
//!
//! Applies the field normalizers to every raw record. Parse failures never
//! stop the build: the field becomes unknown and the failure is collected.

use serde::Serialize;

use super::normalize::{
    normalize_company, normalize_date, normalize_name, normalize_percentage, normalize_tax_id,
    Parsed,
};
use crate::models::{headers, Columns, Field, NormalizedRecord, RawRecord};

/// Result of building normalized records
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildResult {
    /// One normalized record per raw record, in input order
    pub records: Vec<NormalizedRecord>,
    /// Fields that were present but could not be parsed
    pub failures: Vec<FieldFailure>,
}

/// A field that fell back to unknown because its text did not parse
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFailure {
    pub line: usize,
    pub column: &'static str,
    pub value: String,
    pub reason: String,
}

impl BuildResult {
    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "Normalized: {} records, {} unparseable fields",
            self.records.len(),
            self.failures.len()
        )
    }
}

/// Normalize every raw record.
pub fn build_records(raw_records: &[RawRecord], columns: &Columns) -> BuildResult {
    let mut result = BuildResult::default();

    for raw in raw_records {
        let (record, failures) = normalize_record(raw, columns);
        result.records.push(record);
        result.failures.extend(failures);
    }

    result
}

/// Normalize one raw record, returning the parse failures alongside it.
pub fn normalize_record(
    raw: &RawRecord,
    columns: &Columns,
) -> (NormalizedRecord, Vec<FieldFailure>) {
    let mut failures = Vec::new();

    let ownership_pct = collect(
        normalize_percentage(raw.get(columns.ownership)),
        raw.line,
        headers::OWNERSHIP,
        &mut failures,
    );
    let ownership_date = collect(
        normalize_date(raw.get(columns.ownership_date)),
        raw.line,
        headers::OWNERSHIP_DATE,
        &mut failures,
    );

    let record = NormalizedRecord {
        line: raw.line,
        owner: normalize_name(raw.get(columns.owner)),
        company: normalize_company(raw.get(columns.company)),
        tax_id: normalize_tax_id(raw.get(columns.tax_id)),
        ownership_pct,
        ownership_date,
        region: raw.get(columns.region).clone(),
        source: raw.get(columns.source).clone(),
    };

    (record, failures)
}

fn collect<T>(
    parsed: Parsed<T>,
    line: usize,
    column: &'static str,
    failures: &mut Vec<FieldFailure>,
) -> Field<T> {
    if let Parsed::Invalid { input, reason } = &parsed {
        failures.push(FieldFailure {
            line,
            column,
            value: input.clone(),
            reason: reason.clone(),
        });
    }
    parsed.into_field()
}
