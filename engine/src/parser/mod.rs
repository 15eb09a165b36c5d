//! Reader for packed ownership registers.
//!
//! The register is a single-column table: the first non-blank row holds
//! the comma-separated header declaration and every later row holds one
//! comma-separated record packed into one cell.
//!
//! - Spreadsheets (`.xlsx`, `.xlsm`, `.xls`, `.xlsb`, `.ods`) are read with
//!   calamine, first worksheet, first column.
//! - Anything else is read as text with encoding auto-detection; each line
//!   is one cell, optionally quoted CSV-style.

use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::Encoding;
use serde::Serialize;
use std::path::Path;

use crate::error::{InputError, InputResult};
use crate::logs::log_warning;
use crate::models::{Columns, Field, RawRecord};

/// Separator between fields inside a packed cell.
pub const FIELD_SEPARATOR: char = ',';

/// Cell separator for the text reader. Registers are one column wide, so
/// this only has to be a byte that never occurs in the data.
const TEXT_CELL_DELIMITER: u8 = 0x1f;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Physical format of the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Workbook,
    Text,
}

impl InputFormat {
    /// Pick the reader from the file extension.
    pub fn from_path(path: &Path) -> Self {
        let is_workbook = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                WORKBOOK_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if is_workbook {
            InputFormat::Workbook
        } else {
            InputFormat::Text
        }
    }
}

/// One non-blank cell of the packed column with its 1-based row number
#[derive(Debug, Clone, PartialEq)]
pub struct PackedLine {
    pub line: usize,
    pub text: String,
}

/// Result of parsing with metadata
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    /// Data records, in input order
    pub records: Vec<RawRecord>,
    /// Declared headers, trimmed
    pub headers: Vec<String>,
    /// Positions of the required headers
    pub columns: Columns,
    /// Detected encoding (text input) or "workbook"
    pub encoding: String,
    pub format: InputFormat,
}

/// Detect the encoding of raw bytes using chardet
///
/// Valid UTF-8 is taken as UTF-8 without asking chardet, which tends to
/// misread short Cyrillic samples.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "windows-1251" | "cp1251" => "windows-1251".to_string(),
        "koi8-r" => "koi8-r".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding label.
///
/// Unknown labels fall back to lossy UTF-8. A byte order mark overrides
/// the label.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let encoding_impl = Encoding::for_label(encoding.as_bytes()).unwrap_or(encoding_rs::UTF_8);
    let (decoded, used, had_errors) = encoding_impl.decode(bytes);
    if had_errors {
        log_warning(format!(
            "Input is not valid {}; undecodable bytes were replaced",
            used.name()
        ));
    }
    decoded.into_owned()
}

/// Split decoded text into packed cells, one per non-blank line.
///
/// Every physical line is one cell. A line wrapped in double quotes is
/// unquoted CSV-style, so a register exported as a one-column CSV reads the
/// same as a plain text dump; a stray quote never spans lines.
pub fn packed_lines_from_text(content: &str) -> InputResult<Vec<PackedLine>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .delimiter(TEXT_CELL_DELIMITER)
        .from_reader(content.as_bytes());

    let mut lines = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);
        let text = record.get(0).unwrap_or("");
        if text.trim().is_empty() {
            continue;
        }
        lines.push(PackedLine {
            line,
            text: unwrap_quoted_line(text),
        });
    }

    Ok(lines)
}

/// Strip the quotes of a fully quoted line and undo `""` escapes.
fn unwrap_quoted_line(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => text.to_string(),
    }
}

/// Read the first column of the first worksheet as packed cells.
pub fn packed_lines_from_workbook(path: &Path) -> InputResult<Vec<PackedLine>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(InputError::NoSheets)??;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let first_col = range.start().map(|(_, col)| col).unwrap_or(0);

    let mut lines = Vec::new();
    for (idx, row) in range.rows().enumerate() {
        // A sheet whose used range starts right of column A has no packed column
        let cell = if first_col == 0 { row.first() } else { None };
        let text = cell.map(cell_to_string).unwrap_or_default();
        if text.trim().is_empty() {
            continue;
        }
        lines.push(PackedLine {
            line: first_row + idx + 1,
            text,
        });
    }

    Ok(lines)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split one packed cell into trimmed fields.
pub fn split_packed(text: &str) -> Vec<String> {
    text.split(FIELD_SEPARATOR)
        .map(|s| s.trim().to_string())
        .collect()
}

/// Turn packed cells into headers and raw records.
///
/// The first cell declares the headers. Short records are padded with
/// unknown fields; fields past the last header are dropped.
pub fn parse_packed_lines(
    lines: &[PackedLine],
) -> InputResult<(Vec<String>, Columns, Vec<RawRecord>)> {
    let (header_line, data_lines) = lines.split_first().ok_or(InputError::EmptyFile)?;

    let headers = split_packed(&header_line.text);
    let columns = Columns::resolve(&headers)?;

    let records = data_lines
        .iter()
        .map(|packed| {
            let mut fields: Vec<Field<String>> = split_packed(&packed.text)
                .into_iter()
                .map(Field::Known)
                .take(headers.len())
                .collect();
            fields.resize(headers.len(), Field::Unknown);
            RawRecord {
                line: packed.line,
                fields,
            }
        })
        .collect();

    Ok((headers, columns, records))
}

/// Parse packed text with an already known encoding name.
pub fn parse_string_with_metadata(content: &str, encoding: String) -> InputResult<ParseResult> {
    let lines = packed_lines_from_text(content)?;
    let (headers, columns, records) = parse_packed_lines(&lines)?;

    Ok(ParseResult {
        records,
        headers,
        columns,
        encoding,
        format: InputFormat::Text,
    })
}

/// Parse packed text bytes with encoding auto-detection.
pub fn parse_bytes_auto(bytes: &[u8]) -> InputResult<ParseResult> {
    if bytes.is_empty() {
        return Err(InputError::EmptyFile);
    }
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    parse_string_with_metadata(&content, encoding)
}

/// Parse a register file, choosing the reader from its extension.
///
/// # Example
/// ```ignore
/// let parsed = parse_input_file("data.xlsx")?;
/// println!("{} records, headers: {}", parsed.records.len(), parsed.headers.join(", "));
/// ```
pub fn parse_input_file<P: AsRef<Path>>(path: P) -> InputResult<ParseResult> {
    let path = path.as_ref();
    match InputFormat::from_path(path) {
        InputFormat::Workbook => {
            let lines = packed_lines_from_workbook(path)?;
            let (headers, columns, records) = parse_packed_lines(&lines)?;
            Ok(ParseResult {
                records,
                headers,
                columns,
                encoding: "workbook".to_string(),
                format: InputFormat::Workbook,
            })
        }
        InputFormat::Text => {
            let bytes = std::fs::read(path)?;
            parse_bytes_auto(&bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "FIO_owner,Company_name,INN_company,Ownership,Ownership_date,Region,Source";

    #[test]
    fn test_simple_register() {
        let text = format!(
            "{}\nИванов Иван Иванович, ООО Ромашка ,7701234567,45%,31.12.2023,Москва,ЕГРЮЛ\n",
            HEADER
        );
        let result = parse_string_with_metadata(&text, "utf-8".into()).unwrap();

        assert_eq!(result.headers.len(), 7);
        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.line, 2);
        assert_eq!(record.get(result.columns.company), &Field::from("ООО Ромашка"));
        assert_eq!(record.get(result.columns.ownership), &Field::from("45%"));
    }

    #[test]
    fn test_short_rows_padded_with_unknown() {
        let text = format!("{}\nПетров Петр,АО Вектор\n", HEADER);
        let result = parse_string_with_metadata(&text, "utf-8".into()).unwrap();

        let record = &result.records[0];
        assert_eq!(record.fields.len(), 7);
        assert_eq!(record.fields[1], Field::from("АО Вектор"));
        assert!(record.fields[2..].iter().all(Field::is_unknown));
    }

    #[test]
    fn test_empty_token_is_not_unknown() {
        let text = format!("{}\nA B C,,123,,,,\n", HEADER);
        let result = parse_string_with_metadata(&text, "utf-8".into()).unwrap();
        assert_eq!(result.records[0].fields[1], Field::from(""));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let text = format!("{}\na,b,c,d,e,f,g,h,i\n", HEADER);
        let result = parse_string_with_metadata(&text, "utf-8".into()).unwrap();
        assert_eq!(result.records[0].fields.len(), 7);
        assert_eq!(result.records[0].fields[6], Field::from("g"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let text = format!("{}\n\na,b,c,d,e,f,g\n   \nh,i,j,k,l,m,n\n", HEADER);
        let result = parse_string_with_metadata(&text, "utf-8".into()).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].fields[0], Field::from("h"));
    }

    #[test]
    fn test_quoted_cell_unwrapped() {
        let text = format!(
            "\"{}\"\n\"Иванов И И,ООО \"\"Ромашка\"\",1,45%,2023-01-01,Москва,ЕГРЮЛ\"\n",
            HEADER
        );
        let result = parse_string_with_metadata(&text, "utf-8".into()).unwrap();
        assert_eq!(result.records[0].fields[1], Field::from("ООО \"Ромашка\""));
    }

    #[test]
    fn test_unbalanced_quote_stays_on_its_line() {
        let text = format!(
            "{}\n\"Ромашка ООО,7701,40%\nD E F,Y,2,10%,01.01.2023,Тула,ЕГРЮЛ\nG H I,Z,3,10%,01.01.2023,Тула,ЕГРЮЛ\n",
            HEADER
        );
        let result = parse_string_with_metadata(&text, "utf-8".into()).unwrap();

        assert_eq!(result.records.len(), 3);
        assert_eq!(result.records[0].fields[0], Field::from("\"Ромашка ООО"));
        assert_eq!(result.records[0].fields[2], Field::from("40%"));
        assert!(result.records[0].fields[3].is_unknown());
        assert_eq!(result.records[1].line, 3);
        assert_eq!(result.records[2].fields[0], Field::from("G H I"));
        assert_eq!(result.records[2].line, 4);
    }

    #[test]
    fn test_parse_workbook_file() {
        use rust_xlsxwriter::Workbook;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, HEADER).unwrap();
        sheet
            .write_string(2, 0, "Иванов Иван Иванович,Ромашка,7701,60%,31.12.2023,Москва,ЕГРЮЛ")
            .unwrap();
        sheet.write_string(3, 0, "Петров Петр,Ромашка").unwrap();
        workbook.save(&path).unwrap();

        let result = parse_input_file(&path).unwrap();
        assert_eq!(result.format, InputFormat::Workbook);
        assert_eq!(result.encoding, "workbook");
        assert_eq!(result.headers.len(), 7);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].line, 3);
        assert_eq!(result.records[0].get(result.columns.ownership), &Field::from("60%"));
        assert_eq!(result.records[1].line, 4);
        assert_eq!(result.records[1].fields[1], Field::from("Ромашка"));
        assert!(result.records[1].fields[2..].iter().all(Field::is_unknown));
    }

    #[test]
    fn test_missing_header_is_fatal() {
        let text = "FIO_owner,Company_name,Ownership\na,b,c\n";
        let err = parse_string_with_metadata(text, "utf-8".into()).unwrap_err();
        assert!(matches!(err, InputError::MissingColumn(ref c) if c == "INN_company"));
    }

    #[test]
    fn test_empty_input_error() {
        assert!(matches!(parse_bytes_auto(b""), Err(InputError::EmptyFile)));
        assert!(matches!(
            parse_string_with_metadata("\n  \n", "utf-8".into()),
            Err(InputError::EmptyFile)
        ));
    }

    #[test]
    fn test_windows_1251_decoding() {
        // "Иванов" in Windows-1251
        let bytes: &[u8] = &[0xC8, 0xE2, 0xE0, 0xED, 0xEE, 0xE2];
        assert_eq!(decode_content(bytes, "windows-1251"), "Иванов");
    }

    #[test]
    fn test_detect_utf8() {
        assert_eq!(detect_encoding("Иванов,Ромашка".as_bytes()), "utf-8");
        assert_eq!(detect_encoding(b"plain ascii"), "utf-8");
    }

    #[test]
    fn test_unknown_label_falls_back_to_utf8() {
        assert_eq!(decode_content("Ромашка".as_bytes(), "no-such-charset"), "Ромашка");
    }

    #[test]
    fn test_input_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("data.xlsx")), InputFormat::Workbook);
        assert_eq!(InputFormat::from_path(Path::new("DATA.ODS")), InputFormat::Workbook);
        assert_eq!(InputFormat::from_path(Path::new("data.csv")), InputFormat::Text);
        assert_eq!(InputFormat::from_path(Path::new("data")), InputFormat::Text);
    }

    #[test]
    fn test_parse_text_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "Сидорова Анна,ЗАО Север,5001,0.3,01/02/2024,Тверь,СПАРК").unwrap();

        let result = parse_input_file(file.path()).unwrap();
        assert_eq!(result.format, InputFormat::Text);
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].fields[0], Field::from("Сидорова Анна"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = parse_input_file("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, InputError::Io(_)));
    }
}
