//! Error types for the ownership cleaning pipeline.
//!
//! - [`InputError`] - reading the packed input (workbook or text)
//! - [`OutputError`] - writing the report workbook, CSV sheets or JSON
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Field-level parse failures are NOT errors: normalizers recover them as
//! [`crate::models::Field::Unknown`] and report them on the log channel.
//! Only structural input problems and output failures abort a run.

use thiserror::Error;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while reading the packed input file.
#[derive(Debug, Error)]
pub enum InputError {
    /// Failed to read file.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet could not be opened or a sheet could not be read.
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// Packed text lines could not be split into cells.
    #[error("Invalid packed text: {0}")]
    Csv(#[from] csv::Error),

    /// No header line and no data.
    #[error("Input file is empty")]
    EmptyFile,

    /// Workbook without worksheets.
    #[error("Workbook has no worksheets")]
    NoSheets,

    /// A required header is absent from the header line.
    #[error("Missing expected column '{0}' in header line")]
    MissingColumn(String),
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing the report.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Filesystem error.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook writer error.
    #[error("Failed to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSV sheet writer error.
    #[error("Failed to write CSV sheet: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_batch`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input could not be read or lacks the declared structure.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Report could not be written.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Records could not be converted for schema validation.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
