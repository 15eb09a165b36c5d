//! Group normalized ownership records and derive aggregate facts.
//!
//! Two ephemeral partitions are built per run:
//!
//! ```text
//! Normalized records                    CompanyGroup (company, tax id)
//! ┌─────────────────────────────┐       ┌──────────────────────────────┐
//! │ Иванов И.И. │ Ромашка │ 77… │  →    │ (Ромашка, 77…): 60%, 55%     │
//! │ Петров П.С. │ Ромашка │ 77… │       ├──────────────────────────────┤
//! │ Иванов И.И. │ Вектор  │ 50… │       │ (Вектор, 50…): 100%          │
//! └─────────────────────────────┘       └──────────────────────────────┘
//!                                       OwnerGroup (owner)
//!                                       ┌──────────────────────────────┐
//!                                       │ Иванов И.И.: Ромашка, Вектор │
//!                                       │ Петров П.С.: Ромашка         │
//!                                       └──────────────────────────────┘
//! ```
//!
//! Only known keys form groups: a record with an unknown company or tax id
//! belongs to no CompanyGroup, and an unknown owner to no OwnerGroup. Groups
//! are kept in `BTreeMap`s so every analysis iterates in key order.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Field, NormalizedRecord};

/// Threshold above which a company's summed shares are reported.
pub const FULL_OWNERSHIP_PCT: f64 = 100.0;

/// Round half away from zero to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Key of a CompanyGroup: canonical company name and tax id.
pub type CompanyKey<'a> = (&'a str, &'a str);

/// A company whose known ownership shares add up to more than 100%.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverConcentrated {
    pub company: String,
    pub tax_id: String,
    /// Sum of known shares, rounded to one decimal
    pub total_pct: f64,
    /// Records in the group whose share is unknown
    pub missing_shares: usize,
}

/// A company whose records carry more than one distinct ownership date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnershipChange {
    pub company: String,
    pub tax_id: String,
    pub distinct_dates: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// An owner holding shares in more than one company.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiCompanyOwner {
    pub owner: String,
    pub company_count: usize,
}

/// Everything the analyzer derives from one record set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    pub missing_tax_id: Vec<NormalizedRecord>,
    pub missing_percentage: Vec<NormalizedRecord>,
    pub over_concentrated: Vec<OverConcentrated>,
    pub ownership_changes: Vec<OwnershipChange>,
    pub multi_company_owners: Vec<MultiCompanyOwner>,
}

/// Read-only analyzer over a normalized record set.
pub struct OwnershipAnalysis<'a> {
    records: &'a [NormalizedRecord],
}

impl<'a> OwnershipAnalysis<'a> {
    pub fn new(records: &'a [NormalizedRecord]) -> Self {
        Self { records }
    }

    /// Partition records by (company, tax id), skipping unknown keys.
    pub fn company_groups(&self) -> BTreeMap<CompanyKey<'a>, Vec<&'a NormalizedRecord>> {
        let mut groups: BTreeMap<CompanyKey<'a>, Vec<&'a NormalizedRecord>> = BTreeMap::new();
        for record in self.records {
            if let (Field::Known(company), Field::Known(tax_id)) = (&record.company, &record.tax_id) {
                groups
                    .entry((company.as_str(), tax_id.as_str()))
                    .or_default()
                    .push(record);
            }
        }
        groups
    }

    /// Partition records by owner, skipping unknown owners.
    pub fn owner_groups(&self) -> BTreeMap<&'a str, Vec<&'a NormalizedRecord>> {
        let mut groups: BTreeMap<&'a str, Vec<&'a NormalizedRecord>> = BTreeMap::new();
        for record in self.records {
            if let Field::Known(owner) = &record.owner {
                groups.entry(owner.as_str()).or_default().push(record);
            }
        }
        groups
    }

    /// Records without a tax id, in input order.
    pub fn missing_tax_id(&self) -> Vec<&'a NormalizedRecord> {
        self.records.iter().filter(|r| r.tax_id.is_unknown()).collect()
    }

    /// Records without an ownership share, in input order.
    pub fn missing_percentage(&self) -> Vec<&'a NormalizedRecord> {
        self.records
            .iter()
            .filter(|r| r.ownership_pct.is_unknown())
            .collect()
    }

    /// Companies whose known shares sum above 100%.
    ///
    /// Groups with no known share are skipped. Groups with some unknown
    /// shares are still summed over the known ones; `missing_shares` tells
    /// how incomplete the total is.
    pub fn over_concentrated_companies(&self) -> Vec<OverConcentrated> {
        self.company_groups()
            .into_iter()
            .filter_map(|((company, tax_id), group)| {
                let known: Vec<f64> = group
                    .iter()
                    .filter_map(|r| r.ownership_pct.known().copied())
                    .collect();
                if known.is_empty() {
                    return None;
                }
                let total: f64 = known.iter().sum();
                (total > FULL_OWNERSHIP_PCT).then(|| OverConcentrated {
                    company: company.to_string(),
                    tax_id: tax_id.to_string(),
                    total_pct: round_to_tenth(total),
                    missing_shares: group.len() - known.len(),
                })
            })
            .collect()
    }

    /// Companies with several records spread over more than one known date.
    pub fn companies_with_changes(&self) -> Vec<OwnershipChange> {
        self.company_groups()
            .into_iter()
            .filter(|(_, group)| group.len() > 1)
            .filter_map(|((company, tax_id), group)| {
                let dates: BTreeSet<NaiveDate> = group
                    .iter()
                    .filter_map(|r| r.ownership_date.known().copied())
                    .collect();
                if dates.len() <= 1 {
                    return None;
                }
                let first_date = *dates.first()?;
                let last_date = *dates.last()?;
                Some(OwnershipChange {
                    company: company.to_string(),
                    tax_id: tax_id.to_string(),
                    distinct_dates: dates.len(),
                    first_date,
                    last_date,
                })
            })
            .collect()
    }

    /// Owners that appear under more than one known company.
    pub fn multi_company_owners(&self) -> Vec<MultiCompanyOwner> {
        self.owner_groups()
            .into_iter()
            .filter_map(|(owner, group)| {
                let companies: BTreeSet<&str> = group
                    .iter()
                    .filter_map(|r| r.company.known().map(String::as_str))
                    .collect();
                (companies.len() > 1).then(|| MultiCompanyOwner {
                    owner: owner.to_string(),
                    company_count: companies.len(),
                })
            })
            .collect()
    }

    /// Run every analysis.
    pub fn run(&self) -> AnalysisResult {
        AnalysisResult {
            missing_tax_id: self.missing_tax_id().into_iter().cloned().collect(),
            missing_percentage: self.missing_percentage().into_iter().cloned().collect(),
            over_concentrated: self.over_concentrated_companies(),
            ownership_changes: self.companies_with_changes(),
            multi_company_owners: self.multi_company_owners(),
        }
    }
}

/// Analyze a record set in one call.
pub fn analyze(records: &[NormalizedRecord]) -> AnalysisResult {
    OwnershipAnalysis::new(records).run()
}
