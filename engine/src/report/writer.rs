//! Report writers.
//!
//! - `.xlsx` paths get one workbook with a worksheet per sheet
//! - `.json` paths get the serialized [`Report`]
//! - any other path is a directory receiving one CSV file per sheet
//!
//! Files are opened only for the duration of the write.

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::path::Path;

use super::{Cell, Report, Sheet};
use crate::error::OutputResult;

/// Output layout chosen from the destination path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Workbook,
    Json,
    CsvDirectory,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("xlsx") => OutputFormat::Workbook,
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::CsvDirectory,
        }
    }
}

/// Write the report in the layout implied by `path`.
pub fn write_report(report: &Report, path: &Path) -> OutputResult<()> {
    match OutputFormat::from_path(path) {
        OutputFormat::Workbook => write_workbook(&report.sheets(), path),
        OutputFormat::Json => write_json(report, path),
        OutputFormat::CsvDirectory => write_csv_directory(&report.sheets(), path),
    }
}

/// Write sheets into a single `.xlsx` workbook.
pub fn write_workbook(sheets: &[Sheet], path: &Path) -> OutputResult<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(sheet.name)?;

        for (col, title) in sheet.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
        }

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            let row_num = row_idx as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(text) => {
                        worksheet.write_string(row_num, col, text.as_str())?;
                    }
                    Cell::Number(value) => {
                        worksheet.write_number(row_num, col, *value)?;
                    }
                    Cell::Integer(value) => {
                        worksheet.write_number(row_num, col, *value as f64)?;
                    }
                    Cell::Blank => {}
                }
            }
        }

        worksheet.autofit();
        workbook.push_worksheet(worksheet);
    }

    workbook.save(path)?;
    Ok(())
}

/// Write one CSV file per sheet into `dir`, creating it if needed.
pub fn write_csv_directory(sheets: &[Sheet], dir: &Path) -> OutputResult<()> {
    fs::create_dir_all(dir)?;

    for sheet in sheets {
        let mut writer = csv::Writer::from_path(dir.join(sheet_file_name(sheet.name)))?;
        writer.write_record(&sheet.columns)?;
        for row in &sheet.rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }
        writer.flush()?;
    }

    Ok(())
}

/// Write the whole report as pretty JSON.
pub fn write_json(report: &Report, path: &Path) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

/// File name for a sheet: lowercase, non-alphanumerics collapsed to `_`.
pub fn sheet_file_name(sheet_name: &str) -> String {
    let slug = sheet_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    format!("{}.csv", slug)
}
