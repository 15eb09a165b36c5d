//! Transformation module.
//!
//! This module handles raw register rows to cleaned report data:
//! - Normalize: field normalizers (name, company, tax id, share, date)
//! - Builder: raw rows to normalized records
//! - Grouper: company and owner groups, the five analyses
//! - Pipeline: main cleaning pipeline

pub mod builder;
pub mod grouper;
pub mod normalize;
pub mod pipeline;

pub use builder::{build_records, normalize_record, BuildResult, FieldFailure};
pub use grouper::{analyze, AnalysisResult, OwnershipAnalysis};
pub use normalize::*;
pub use pipeline::*;
