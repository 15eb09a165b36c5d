//! Domain models for the ownership cleaning pipeline.
//!
//! - [`Field`] - a value or the explicit "unknown" marker
//! - [`RawRecord`] - one packed input line split into textual fields
//! - [`Columns`] - positions of the required headers in the header line
//! - [`NormalizedRecord`] - one record with every field in canonical form

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{InputError, InputResult};

/// Textual rendering of [`Field::Unknown`].
pub const UNKNOWN: &str = "unknown";

// =============================================================================
// Field
// =============================================================================

/// A field value, or the explicit marker for a value that is absent or
/// could not be parsed.
///
/// Ordering places every `Known` value before `Unknown`, so sorted tables
/// list unknown values last.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field<T> {
    Known(T),
    #[default]
    Unknown,
}

impl<T> Field<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Field::Known(value) => Some(value),
            Field::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Field::Unknown)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Known(value) => Field::Known(f(value)),
            Field::Unknown => Field::Unknown,
        }
    }
}

impl Field<String> {
    pub fn as_deref(&self) -> Field<&str> {
        match self {
            Field::Known(value) => Field::Known(value.as_str()),
            Field::Unknown => Field::Unknown,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Unknown, Field::Known)
    }
}

impl From<&str> for Field<String> {
    fn from(value: &str) -> Self {
        Field::Known(value.to_string())
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Known(value) => value.fmt(f),
            Field::Unknown => f.write_str(UNKNOWN),
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Known(value) => value.serialize(serializer),
            Field::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

// =============================================================================
// Input headers
// =============================================================================

/// Header names the packed input must declare.
pub mod headers {
    pub const OWNER: &str = "FIO_owner";
    pub const COMPANY: &str = "Company_name";
    pub const TAX_ID: &str = "INN_company";
    pub const OWNERSHIP: &str = "Ownership";
    pub const OWNERSHIP_DATE: &str = "Ownership_date";
    pub const REGION: &str = "Region";
    pub const SOURCE: &str = "Source";

    pub const REQUIRED: [&str; 7] = [
        OWNER,
        COMPANY,
        TAX_ID,
        OWNERSHIP,
        OWNERSHIP_DATE,
        REGION,
        SOURCE,
    ];
}

/// Positions of the required headers within a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Columns {
    pub owner: usize,
    pub company: usize,
    pub tax_id: usize,
    pub ownership: usize,
    pub ownership_date: usize,
    pub region: usize,
    pub source: usize,
}

impl Columns {
    /// Locate every required header; the first absent one is a fatal error.
    pub fn resolve(header_line: &[String]) -> InputResult<Self> {
        let find = |name: &str| {
            header_line
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| InputError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            owner: find(headers::OWNER)?,
            company: find(headers::COMPANY)?,
            tax_id: find(headers::TAX_ID)?,
            ownership: find(headers::OWNERSHIP)?,
            ownership_date: find(headers::OWNERSHIP_DATE)?,
            region: find(headers::REGION)?,
            source: find(headers::SOURCE)?,
        })
    }
}

// =============================================================================
// Records
// =============================================================================

/// One data line of the packed input, one field per declared header.
///
/// Fields beyond the end of a short line are [`Field::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    /// 1-based line (or sheet row) in the input.
    pub line: usize,
    pub fields: Vec<Field<String>>,
}

impl RawRecord {
    pub fn get(&self, index: usize) -> &Field<String> {
        static MISSING: Field<String> = Field::Unknown;
        self.fields.get(index).unwrap_or(&MISSING)
    }
}

/// A record with every field canonical or explicitly unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    /// 1-based line (or sheet row) in the input.
    pub line: usize,
    /// "Surname N.P." form.
    pub owner: Field<String>,
    pub company: Field<String>,
    pub tax_id: Field<String>,
    /// Percent ownership (45.0 means 45%).
    pub ownership_pct: Field<f64>,
    pub ownership_date: Field<NaiveDate>,
    pub region: Field<String>,
    pub source: Field<String>,
}
