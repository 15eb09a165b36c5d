//! JSON Schema validation for normalized ownership records.
//!
//! The schema embedded from `schemas/ownership-record.json` encodes the
//! record invariant: each field holds a well-formed value of its type or
//! the literal `"unknown"`, never a half-parsed string. Records are checked
//! in their serialized form, the same form the JSON report writes.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use ownership::validation::is_valid_record;
//!
//! let record = json!({
//!     "line": 2,
//!     "owner": "Иванов И.И.",
//!     "company": "Ромашка",
//!     "tax_id": "7701234567",
//!     "ownership_pct": 45.0,
//!     "ownership_date": "2023-12-31",
//!     "region": "Москва",
//!     "source": "unknown"
//! });
//! assert!(is_valid_record(&record));
//! ```

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::models::NormalizedRecord;

static RECORD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/ownership-record.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with one message per violation
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use ownership::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": {
///         "name": { "type": "string" }
///     }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Same as [`validate`], as a plain yes/no.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate one serialized record against the record schema.
pub fn validate_record(data: &Value) -> Result<(), Vec<String>> {
    validate(&RECORD_SCHEMA, data)
}

/// Quick check against the record schema.
pub fn is_valid_record(data: &Value) -> bool {
    is_valid(&RECORD_SCHEMA, data)
}

/// A record that broke the schema
#[derive(Debug, Clone, Serialize)]
pub struct RecordViolation {
    pub line: usize,
    pub errors: Vec<String>,
}

/// Check every record; returns the violations, empty when all are valid.
pub fn validate_records(
    records: &[NormalizedRecord],
) -> Result<Vec<RecordViolation>, serde_json::Error> {
    let mut violations = Vec::new();
    for record in records {
        let value = serde_json::to_value(record)?;
        if let Err(errors) = validate_record(&value) {
            violations.push(RecordViolation {
                line: record.line,
                errors,
            });
        }
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;
    use chrono::NaiveDate;
    use serde_json::json;

    fn valid_json() -> Value {
        json!({
            "line": 2,
            "owner": "Иванов И.И.",
            "company": "Ромашка",
            "tax_id": "7701234567",
            "ownership_pct": 45.0,
            "ownership_date": "2023-12-31",
            "region": "Москва",
            "source": "ЕГРЮЛ"
        })
    }

    #[test]
    fn test_valid_record() {
        assert!(is_valid_record(&valid_json()));
    }

    #[test]
    fn test_unknown_markers_are_valid() {
        let mut record = valid_json();
        record["tax_id"] = json!("unknown");
        record["ownership_pct"] = json!("unknown");
        record["ownership_date"] = json!("unknown");
        assert!(is_valid_record(&record));
    }

    #[test]
    fn test_half_parsed_values_rejected() {
        let mut record = valid_json();
        record["ownership_pct"] = json!("45%");
        record["ownership_date"] = json!("31.12.2023");
        let errors = validate_record(&record).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_blank_tax_id_rejected() {
        let mut record = valid_json();
        record["tax_id"] = json!(" ");
        assert!(!is_valid_record(&record));
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut record = valid_json();
        record.as_object_mut().unwrap().remove("source");
        assert!(!is_valid_record(&record));
    }

    #[test]
    fn test_validate_normalized_records() {
        let record = NormalizedRecord {
            line: 7,
            owner: Field::from("Петров П."),
            company: Field::Unknown,
            tax_id: Field::Unknown,
            ownership_pct: Field::Known(-5.0),
            ownership_date: Field::Known(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            region: Field::from(""),
            source: Field::Unknown,
        };
        let violations = validate_records(&[record.clone()]).unwrap();
        assert!(violations.is_empty());

        let broken = NormalizedRecord { tax_id: Field::from(""), ..record };
        let violations = validate_records(&[broken]).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 7);
    }
}
