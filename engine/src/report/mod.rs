//! Report assembly.
//!
//! [`assemble_report`] turns normalized records and the analysis result into
//! a [`Report`]: the sorted cleaned records, the summary statistics and the
//! detail lists. [`Report::sheets`] lays the report out as tables for the
//! writers in [`writer`].
//!
//! # Sheets
//!
//! | Sheet                  | Emitted            |
//! |------------------------|--------------------|
//! | `Cleaned data`         | always             |
//! | `Statistics`           | always             |
//! | `Shares over 100%`     | when non-empty     |
//! | `Ownership changes`    | when non-empty     |
//! | `Multi-company owners` | when non-empty     |

pub mod writer;

use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::{Field, NormalizedRecord};
use crate::transform::grouper::{
    round_to_tenth, AnalysisResult, MultiCompanyOwner, OverConcentrated, OwnershipChange,
};

pub use writer::{write_json, write_report, OutputFormat};

pub const SHEET_CLEANED: &str = "Cleaned data";
pub const SHEET_STATISTICS: &str = "Statistics";
pub const SHEET_OVER_CONCENTRATED: &str = "Shares over 100%";
pub const SHEET_CHANGES: &str = "Ownership changes";
pub const SHEET_MULTI_OWNERS: &str = "Multi-company owners";

/// Cleaned-records sheet columns, in output order.
pub const CLEANED_COLUMNS: [&str; 7] = [
    "Owner",
    "Company",
    "Tax ID",
    "Share, %",
    "Region",
    "Source",
    "Date",
];

// =============================================================================
// Table model
// =============================================================================

/// One cell of an output table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Integer(i64),
    /// An unknown value; written as an empty cell
    Blank,
}

impl Cell {
    /// Text rendering used by the CSV writer.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Number(value) => value.to_string(),
            Cell::Integer(value) => value.to_string(),
            Cell::Blank => String::new(),
        }
    }
}

impl From<&Field<String>> for Cell {
    fn from(field: &Field<String>) -> Self {
        match field {
            Field::Known(text) => Cell::Text(text.clone()),
            Field::Unknown => Cell::Blank,
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

impl From<usize> for Cell {
    fn from(count: usize) -> Self {
        Cell::Integer(count as i64)
    }
}

/// A named table with a header row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: &'static str,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

// =============================================================================
// Report
// =============================================================================

/// Summary statistics, in the order they appear on the statistics sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_records: usize,
    pub distinct_companies: usize,
    pub distinct_owners: usize,
    pub missing_tax_id: usize,
    pub missing_percentage: usize,
    /// Mean of known shares, one decimal; 0 when no share is known
    pub mean_percentage: f64,
    pub over_concentrated: usize,
    pub ownership_changes: usize,
    pub multi_company_owners: usize,
}

impl Summary {
    /// Label/value rows for the statistics sheet.
    pub fn rows(&self) -> Vec<(&'static str, Cell)> {
        vec![
            ("Total records", self.total_records.into()),
            ("Distinct companies", self.distinct_companies.into()),
            ("Distinct owners", self.distinct_owners.into()),
            ("Records without tax ID", self.missing_tax_id.into()),
            ("Records without share", self.missing_percentage.into()),
            ("Mean share, %", Cell::Number(self.mean_percentage)),
            ("Companies with shares over 100%", self.over_concentrated.into()),
            ("Companies with ownership changes", self.ownership_changes.into()),
            ("Owners in several companies", self.multi_company_owners.into()),
        ]
    }
}

/// Everything the output collaborator writes.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub summary: Summary,
    /// Sorted by company, owner, date; unknown values last
    pub records: Vec<NormalizedRecord>,
    pub over_concentrated: Vec<OverConcentrated>,
    pub ownership_changes: Vec<OwnershipChange>,
    pub multi_company_owners: Vec<MultiCompanyOwner>,
}

/// Build the report from normalized records and their analysis.
pub fn assemble_report(records: &[NormalizedRecord], analysis: &AnalysisResult) -> Report {
    Report {
        summary: summarize(records, analysis),
        records: sorted_records(records),
        over_concentrated: analysis.over_concentrated.clone(),
        ownership_changes: analysis.ownership_changes.clone(),
        multi_company_owners: analysis.multi_company_owners.clone(),
    }
}

/// Stable sort by company, then owner, then date.
pub fn sorted_records(records: &[NormalizedRecord]) -> Vec<NormalizedRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        a.company
            .cmp(&b.company)
            .then_with(|| a.owner.cmp(&b.owner))
            .then_with(|| a.ownership_date.cmp(&b.ownership_date))
    });
    sorted
}

fn summarize(records: &[NormalizedRecord], analysis: &AnalysisResult) -> Summary {
    let distinct_companies: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.company.known().map(String::as_str))
        .collect();
    let distinct_owners: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.owner.known().map(String::as_str))
        .collect();

    let shares: Vec<f64> = records
        .iter()
        .filter_map(|r| r.ownership_pct.known().copied())
        .collect();
    let mean_percentage = if shares.is_empty() {
        0.0
    } else {
        round_to_tenth(shares.iter().sum::<f64>() / shares.len() as f64)
    };

    Summary {
        total_records: records.len(),
        distinct_companies: distinct_companies.len(),
        distinct_owners: distinct_owners.len(),
        missing_tax_id: analysis.missing_tax_id.len(),
        missing_percentage: analysis.missing_percentage.len(),
        mean_percentage,
        over_concentrated: analysis.over_concentrated.len(),
        ownership_changes: analysis.ownership_changes.len(),
        multi_company_owners: analysis.multi_company_owners.len(),
    }
}

impl Report {
    /// Lay the report out as tables; detail sheets only when non-empty.
    pub fn sheets(&self) -> Vec<Sheet> {
        let mut sheets = vec![self.cleaned_sheet(), self.statistics_sheet()];

        if !self.over_concentrated.is_empty() {
            sheets.push(Sheet {
                name: SHEET_OVER_CONCENTRATED,
                columns: vec!["Company", "Tax ID", "Total share, %", "Records without share"],
                rows: self
                    .over_concentrated
                    .iter()
                    .map(|o| {
                        vec![
                            o.company.as_str().into(),
                            o.tax_id.as_str().into(),
                            Cell::Number(o.total_pct),
                            o.missing_shares.into(),
                        ]
                    })
                    .collect(),
            });
        }

        if !self.ownership_changes.is_empty() {
            sheets.push(Sheet {
                name: SHEET_CHANGES,
                columns: vec!["Company", "Tax ID", "Distinct dates", "First date", "Last date"],
                rows: self
                    .ownership_changes
                    .iter()
                    .map(|c| {
                        vec![
                            c.company.as_str().into(),
                            c.tax_id.as_str().into(),
                            c.distinct_dates.into(),
                            Cell::Text(c.first_date.format("%Y-%m-%d").to_string()),
                            Cell::Text(c.last_date.format("%Y-%m-%d").to_string()),
                        ]
                    })
                    .collect(),
            });
        }

        if !self.multi_company_owners.is_empty() {
            sheets.push(Sheet {
                name: SHEET_MULTI_OWNERS,
                columns: vec!["Owner", "Companies"],
                rows: self
                    .multi_company_owners
                    .iter()
                    .map(|m| vec![m.owner.as_str().into(), m.company_count.into()])
                    .collect(),
            });
        }

        sheets
    }

    fn cleaned_sheet(&self) -> Sheet {
        let rows = self
            .records
            .iter()
            .map(|r| {
                vec![
                    Cell::from(&r.owner),
                    Cell::from(&r.company),
                    Cell::from(&r.tax_id),
                    r.ownership_pct.known().map_or(Cell::Blank, |v| Cell::Number(*v)),
                    Cell::from(&r.region),
                    Cell::from(&r.source),
                    r.ownership_date
                        .known()
                        .map_or(Cell::Blank, |d| Cell::Text(d.format("%Y-%m-%d").to_string())),
                ]
            })
            .collect();

        Sheet {
            name: SHEET_CLEANED,
            columns: CLEANED_COLUMNS.to_vec(),
            rows,
        }
    }

    fn statistics_sheet(&self) -> Sheet {
        Sheet {
            name: SHEET_STATISTICS,
            columns: vec!["Metric", "Value"],
            rows: self
                .summary
                .rows()
                .into_iter()
                .map(|(label, value)| vec![label.into(), value])
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::grouper::analyze;
    use chrono::NaiveDate;

    fn record(owner: Field<String>, company: Field<String>, pct: Option<f64>, date: Option<(i32, u32, u32)>) -> NormalizedRecord {
        NormalizedRecord {
            line: 0,
            owner,
            company,
            tax_id: Field::from("1"),
            ownership_pct: Field::from(pct),
            ownership_date: Field::from(date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))),
            region: Field::from("R"),
            source: Field::Unknown,
        }
    }

    #[test]
    fn test_sort_order_unknown_last() {
        let records = vec![
            record(Field::from("B B."), Field::Unknown, Some(10.0), None),
            record(Field::from("B B."), Field::from("Alpha"), Some(10.0), Some((2024, 1, 1))),
            record(Field::Unknown, Field::from("Alpha"), Some(10.0), None),
            record(Field::from("A A."), Field::from("Beta"), Some(10.0), None),
            record(Field::from("B B."), Field::from("Alpha"), Some(10.0), Some((2023, 1, 1))),
            record(Field::from("B B."), Field::from("Alpha"), Some(10.0), None),
        ];
        let sorted = sorted_records(&records);
        let keys: Vec<String> = sorted
            .iter()
            .map(|r| format!("{}|{}|{}", r.company, r.owner, r.ownership_date))
            .collect();

        assert_eq!(
            keys,
            vec![
                "Alpha|B B.|2023-01-01",
                "Alpha|B B.|2024-01-01",
                "Alpha|B B.|unknown",
                "Alpha|unknown|unknown",
                "Beta|A A.|unknown",
                "unknown|B B.|unknown",
            ]
        );
    }

    #[test]
    fn test_summary_counts() {
        let mut no_tax = record(Field::from("A A."), Field::from("X"), None, None);
        no_tax.tax_id = Field::Unknown;
        let records = vec![
            no_tax,
            record(Field::from("A A."), Field::from("Y"), Some(60.0), Some((2023, 1, 1))),
            record(Field::from("B B."), Field::from("Y"), Some(55.0), Some((2024, 1, 1))),
            record(Field::Unknown, Field::Unknown, Some(10.0), None),
        ];
        let analysis = analyze(&records);
        let report = assemble_report(&records, &analysis);
        let summary = &report.summary;

        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.distinct_companies, 2);
        assert_eq!(summary.distinct_owners, 2);
        assert_eq!(summary.missing_tax_id, 1);
        assert_eq!(summary.missing_percentage, 1);
        assert_eq!(summary.mean_percentage, 41.7);
        assert_eq!(summary.over_concentrated, 1);
        assert_eq!(summary.ownership_changes, 1);
        assert_eq!(summary.multi_company_owners, 1);
    }

    #[test]
    fn test_mean_zero_without_known_shares() {
        let records = vec![record(Field::from("A A."), Field::from("X"), None, None)];
        let report = assemble_report(&records, &analyze(&records));
        assert_eq!(report.summary.mean_percentage, 0.0);
    }

    #[test]
    fn test_detail_sheets_only_when_non_empty() {
        let records = vec![record(Field::from("A A."), Field::from("X"), Some(20.0), None)];
        let report = assemble_report(&records, &analyze(&records));
        let names: Vec<&str> = report.sheets().iter().map(|s| s.name).collect();
        assert_eq!(names, vec![SHEET_CLEANED, SHEET_STATISTICS]);

        let records = vec![
            record(Field::from("A A."), Field::from("X"), Some(60.0), Some((2023, 1, 1))),
            record(Field::from("A A."), Field::from("X"), Some(60.0), Some((2024, 1, 1))),
            record(Field::from("A A."), Field::from("Z"), Some(1.0), None),
        ];
        let report = assemble_report(&records, &analyze(&records));
        let names: Vec<&str> = report.sheets().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                SHEET_CLEANED,
                SHEET_STATISTICS,
                SHEET_OVER_CONCENTRATED,
                SHEET_CHANGES,
                SHEET_MULTI_OWNERS
            ]
        );
    }

    #[test]
    fn test_cleaned_sheet_layout() {
        let records = vec![record(Field::from("A A."), Field::from("X"), None, Some((2023, 3, 9)))];
        let report = assemble_report(&records, &analyze(&records));
        let sheet = &report.sheets()[0];

        assert_eq!(sheet.columns, CLEANED_COLUMNS.to_vec());
        assert_eq!(
            sheet.rows[0],
            vec![
                Cell::Text("A A.".into()),
                Cell::Text("X".into()),
                Cell::Text("1".into()),
                Cell::Blank,
                Cell::Text("R".into()),
                Cell::Blank,
                Cell::Text("2023-03-09".into()),
            ]
        );
    }

    #[test]
    fn test_statistics_sheet_order() {
        let records = vec![record(Field::from("A A."), Field::from("X"), Some(12.34), None)];
        let report = assemble_report(&records, &analyze(&records));
        let sheet = &report.sheets()[1];

        assert_eq!(sheet.rows.len(), 9);
        assert_eq!(sheet.rows[0], vec![Cell::from("Total records"), Cell::Integer(1)]);
        assert_eq!(sheet.rows[5], vec![Cell::from("Mean share, %"), Cell::Number(12.3)]);
        assert_eq!(sheet.rows[8][0], Cell::from("Owners in several companies"));
    }
}
