//! # Ownership - company ownership register cleaning and analysis
//!
//! Ownership reads a register of company owners packed into a single
//! column (one comma-separated line per row), normalizes owner names,
//! company names, tax ids, shares and dates, then reports data-quality and
//! concentration findings.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Register   │────▶│   Parser    │────▶│  Transform  │────▶│   Report    │
//! │ (xlsx/text) │     │  (auto-enc) │     │ (norm+group)│     │ (xlsx/csv)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ownership::{run_batch, PipelineOptions};
//! use std::path::Path;
//!
//! let result = run_batch(
//!     Path::new("data.xlsx"),
//!     Path::new("result_data.xlsx"),
//!     &PipelineOptions::default(),
//! ).unwrap();
//! println!("{} companies over 100%", result.report.over_concentrated.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Log entries and the diagnostic channel
//! - [`models`] - Field, raw and normalized records
//! - [`parser`] - Packed input reading with encoding detection
//! - [`transform`] - Normalizers, record builder, analyses, pipeline
//! - [`report`] - Report assembly and writers
//! - [`validation`] - Record schema validation

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod report;

// Validation
pub mod validation;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    InputError,
    OutputError,
    PipelineError,
    InputResult,
    OutputResult,
    PipelineResult,
};

// =============================================================================
// Re-exports - Logs
// =============================================================================

pub use logs::{
    LogEntry,
    LogLevel,
    LOG_BROADCASTER,
    log_info,
    log_success,
    log_warning,
    log_error,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Field,
    Columns,
    RawRecord,
    NormalizedRecord,
    UNKNOWN,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    parse_input_file,
    parse_bytes_auto,
    detect_encoding,
    decode_content,
    InputFormat,
    ParseResult,
};

// =============================================================================
// Re-exports - Normalizers and builder
// =============================================================================

pub use transform::{
    normalize_name,
    normalize_company,
    normalize_tax_id,
    normalize_percentage,
    normalize_date,
    Parsed,
    build_records,
    BuildResult,
    FieldFailure,
};

// =============================================================================
// Re-exports - Analysis
// =============================================================================

pub use transform::grouper::{
    analyze,
    AnalysisResult,
    OwnershipAnalysis,
    OverConcentrated,
    OwnershipChange,
    MultiCompanyOwner,
};

// =============================================================================
// Re-exports - Report
// =============================================================================

pub use report::{
    assemble_report,
    write_report,
    write_json,
    OutputFormat,
    Report,
    Sheet,
    Summary,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    is_valid,
    validate,
    is_valid_record,
    validate_record,
    validate_records,
    RecordViolation,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    process_file,
    process_bytes,
    process_parsed,
    run_batch,
    PipelineOptions,
    PipelineOutput,
    RunPaths,
    InputInfo,
};
