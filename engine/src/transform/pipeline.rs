//! High-level pipeline API for cleaning an ownership register.
//!
//! This module combines all steps of a batch run: reading the packed
//! input, normalizing every record, schema validation, group-wise analysis,
//! report assembly and writing.
//!
//! # Example
//!
//! ```rust,ignore
//! use ownership::transform::pipeline::{run_batch, PipelineOptions, RunPaths};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let paths = RunPaths::from_env();
//!     let output = run_batch(&paths.input, &paths.output, &PipelineOptions::default())?;
//!
//!     println!("Cleaned {} records", output.report.records.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::builder::{build_records, FieldFailure};
use super::grouper::analyze;
use crate::error::PipelineResult;
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::parser::{parse_bytes_auto, parse_input_file, InputFormat, ParseResult};
use crate::report::{assemble_report, write_report, Report};
use crate::validation::{validate_records, RecordViolation};

/// Environment variable holding the input path
pub const ENV_INPUT: &str = "OWNERSHIP_INPUT";
/// Environment variable holding the output path
pub const ENV_OUTPUT: &str = "OWNERSHIP_OUTPUT";

pub const DEFAULT_INPUT: &str = "data.xlsx";
pub const DEFAULT_OUTPUT: &str = "result_data.xlsx";

/// Options for the cleaning pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Check cleaned records against the record schema
    pub validate_records: bool,

    /// Log fields that fell back to unknown
    pub report_parse_failures: bool,

    /// Cap on individually logged failures and violations
    pub max_logged_failures: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            validate_records: true,
            report_parse_failures: true,
            max_logged_failures: 20,
        }
    }
}

/// Input and output locations of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl RunPaths {
    /// Paths from `OWNERSHIP_INPUT` / `OWNERSHIP_OUTPUT`, falling back to
    /// `data.xlsx` / `result_data.xlsx`. Load `.env` before calling.
    pub fn from_env() -> Self {
        Self::resolve(None, None)
    }

    /// Explicit paths win over the environment, which wins over defaults.
    pub fn resolve(input: Option<PathBuf>, output: Option<PathBuf>) -> Self {
        Self {
            input: input
                .or_else(|| env_path(ENV_INPUT))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT)),
            output: output
                .or_else(|| env_path(ENV_OUTPUT))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

/// Input file information
#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    pub encoding: String,
    pub format: InputFormat,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// Cleaned table, statistics and detail tables
    pub report: Report,

    /// Fields that fell back to unknown
    pub failures: Vec<FieldFailure>,

    /// Records breaking the record schema (empty when validation is off)
    pub violations: Vec<RecordViolation>,

    pub input: InputInfo,
}

/// Clean a register file.
///
/// This is the main entry point for the pipeline. It:
/// 1. Reads the packed input (workbook or text, encoding auto-detected)
/// 2. Normalizes every record
/// 3. Validates the cleaned records
/// 4. Runs the group-wise analyses
/// 5. Assembles the report
pub fn process_file(path: &Path, options: &PipelineOptions) -> PipelineResult<PipelineOutput> {
    log_info(format!("Reading {}...", path.display()));
    let parse_result = parse_input_file(path)?;
    process_parsed(parse_result, options)
}

/// Same as [`process_file`] but for packed text bytes.
pub fn process_bytes(bytes: &[u8], options: &PipelineOptions) -> PipelineResult<PipelineOutput> {
    let parse_result = parse_bytes_auto(bytes)?;
    process_parsed(parse_result, options)
}

/// Clean already-parsed input.
pub fn process_parsed(
    parse_result: ParseResult,
    options: &PipelineOptions,
) -> PipelineResult<PipelineOutput> {
    log_success(format!("Detected encoding: {}", parse_result.encoding));
    log_success(format!("Read {} rows", parse_result.records.len()));

    let input = InputInfo {
        encoding: parse_result.encoding.clone(),
        format: parse_result.format,
        headers: parse_result.headers.clone(),
        row_count: parse_result.records.len(),
    };

    if parse_result.records.is_empty() {
        log_warning("Header line found but no data rows");
    }

    // Step 1: normalize
    log_info("Normalizing fields...");
    let built = build_records(&parse_result.records, &parse_result.columns);
    log_success(built.summary());
    if options.report_parse_failures {
        print_failures(&built.failures, options.max_logged_failures);
    }

    // Step 2: validate
    let violations = if options.validate_records {
        log_info("Validating cleaned records...");
        let violations = validate_records(&built.records)?;
        print_violations(&violations, options.max_logged_failures);
        violations
    } else {
        Vec::new()
    };

    // Step 3: analyze
    log_info("Analyzing companies and owners...");
    let analysis = analyze(&built.records);
    log_info_indent(format!("{} records without tax id", analysis.missing_tax_id.len()), 1);
    log_info_indent(format!("{} records without share", analysis.missing_percentage.len()), 1);
    log_info_indent(format!("{} companies over 100%", analysis.over_concentrated.len()), 1);
    log_info_indent(format!("{} companies with ownership changes", analysis.ownership_changes.len()), 1);
    log_info_indent(format!("{} owners in several companies", analysis.multi_company_owners.len()), 1);

    // Step 4: report
    let report = assemble_report(&built.records, &analysis);

    Ok(PipelineOutput {
        report,
        failures: built.failures,
        violations,
        input,
    })
}

/// Full batch run: clean `input` and write the report to `output`.
pub fn run_batch(
    input: &Path,
    output: &Path,
    options: &PipelineOptions,
) -> PipelineResult<PipelineOutput> {
    let result = process_file(input, options)?;

    log_info(format!("Writing {}...", output.display()));
    write_report(&result.report, output)?;
    log_success(format!("Report written: {} sheets", result.report.sheets().len()));

    Ok(result)
}

fn print_failures(failures: &[FieldFailure], limit: usize) {
    if failures.is_empty() {
        return;
    }
    log_warning(format!("{} fields could not be parsed", failures.len()));
    for failure in failures.iter().take(limit) {
        log_warning_indent(
            format!(
                "line {}, {}: '{}' ({})",
                failure.line, failure.column, failure.value, failure.reason
            ),
            1,
        );
    }
    if failures.len() > limit {
        log_warning_indent(format!("... and {} more", failures.len() - limit), 1);
    }
}

fn print_violations(violations: &[RecordViolation], limit: usize) {
    if violations.is_empty() {
        log_success("All cleaned records valid");
        return;
    }
    log_error(format!("{} records break the record schema", violations.len()));
    for violation in violations.iter().take(limit) {
        log_warning_indent(
            format!("line {}: {}", violation.line, violation.errors.join(", ")),
            1,
        );
    }
}
