//! Field normalizers
//!
//! Each normalizer maps one raw textual field to its canonical value or to
//! [`Field::Unknown`]. Percentage and date parsing return a [`Parsed`]
//! outcome so the reason for a rejected value is not lost.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Field, UNKNOWN};

static NAME_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.\s]+").expect("valid name separator pattern"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Quote characters removed from company names.
const COMPANY_QUOTES: [char; 3] = ['"', '«', '»'];

/// Text values that stand for "no tax id".
const NULL_LITERALS: [&str; 3] = [UNKNOWN, "none", "nan"];

/// Accepted date layouts, in priority order.
///
/// The shape check pins the field widths (day and month 1-2 digits, year
/// exactly 4) before chrono validates the calendar date. An input is
/// resolved by the first layout that parses.
static DATE_LAYOUTS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"^[0-9]{1,2}\.[0-9]{1,2}\.[0-9]{4}$", "%d.%m.%Y"),
        (r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}$", "%Y-%m-%d"),
        (r"^[0-9]{1,2}/[0-9]{1,2}/[0-9]{4}$", "%d/%m/%Y"),
        (r"^[0-9]{1,2}-[0-9]{1,2}-[0-9]{4}$", "%d-%m-%Y"),
        (r"^[0-9]{4}/[0-9]{1,2}/[0-9]{1,2}$", "%Y/%m/%d"),
        (r"^[0-9]{4}\.[0-9]{1,2}\.[0-9]{1,2}$", "%Y.%m.%d"),
    ]
    .into_iter()
    .map(|(shape, format)| (Regex::new(shape).expect("valid date shape"), format))
    .collect()
});

/// Outcome of parsing one raw field.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// Parsed successfully.
    Value(T),
    /// Absent, blank or the unknown marker: nothing to report.
    Missing,
    /// Present but unparseable.
    Invalid { input: String, reason: String },
}

impl<T> Parsed<T> {
    fn invalid(input: &str, reason: impl Into<String>) -> Self {
        Parsed::Invalid {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn into_field(self) -> Field<T> {
        match self {
            Parsed::Value(value) => Field::Known(value),
            Parsed::Missing | Parsed::Invalid { .. } => Field::Unknown,
        }
    }
}

/// Abbreviate a full name to "Surname N.P.".
///
/// The name is split on runs of whitespace and periods. Three or more
/// tokens give surname plus two initials, two tokens give surname plus one
/// initial, anything shorter is returned trimmed and unchanged.
pub fn normalize_name(raw: &Field<String>) -> Field<String> {
    let Field::Known(text) = raw else {
        return Field::Unknown;
    };
    let trimmed = text.trim();
    let parts: Vec<&str> = NAME_SEPARATORS
        .split(trimmed)
        .filter(|part| !part.is_empty())
        .collect();

    let initial = |part: &str| part.chars().next().map(String::from).unwrap_or_default();

    let display = match parts.as_slice() {
        [surname, given, patronymic, ..] => {
            format!("{} {}.{}.", surname, initial(given), initial(patronymic))
        }
        [surname, given] => format!("{} {}.", surname, initial(given)),
        _ => trimmed.to_string(),
    };
    Field::Known(display)
}

/// Strip quotes and collapse whitespace in a company name.
pub fn normalize_company(raw: &Field<String>) -> Field<String> {
    raw.as_deref().map(|text| {
        let unquoted: String = text
            .trim()
            .chars()
            .filter(|c| !COMPANY_QUOTES.contains(c))
            .collect();
        // Removing a leading or trailing quote can expose a space
        WHITESPACE_RUN.replace_all(&unquoted, " ").trim().to_string()
    })
}

/// Trimmed tax id, or unknown for blank and null-like text.
pub fn normalize_tax_id(raw: &Field<String>) -> Field<String> {
    let Field::Known(text) = raw else {
        return Field::Unknown;
    };
    let trimmed = text.trim();
    let is_null = trimmed.is_empty()
        || NULL_LITERALS
            .iter()
            .any(|literal| trimmed.eq_ignore_ascii_case(literal));
    if is_null {
        Field::Unknown
    } else {
        Field::Known(trimmed.to_string())
    }
}

/// Parse an ownership share into percent.
///
/// `"45%"` and `"45 %"` mean 45 percent; a bare number is a fraction of
/// one, so `"0.45"` also means 45 percent. No range is enforced here.
pub fn normalize_percentage(raw: &Field<String>) -> Parsed<f64> {
    let Field::Known(text) = raw else {
        return Parsed::Missing;
    };
    let compact: String = text.trim().chars().filter(|c| *c != ' ').collect();
    if compact.is_empty() || compact.eq_ignore_ascii_case(UNKNOWN) {
        return Parsed::Missing;
    }

    let (number, scale) = if compact.contains('%') {
        (compact.replace('%', ""), 1.0)
    } else {
        (compact, 100.0)
    };

    match number.parse::<f64>().map(|value| value * scale) {
        Ok(pct) if pct.is_finite() => Parsed::Value(pct),
        Ok(_) => Parsed::invalid(text, "not a finite number"),
        Err(e) => Parsed::invalid(text, format!("not a number ({})", e)),
    }
}

/// Parse a calendar date written in one of the accepted layouts.
pub fn normalize_date(raw: &Field<String>) -> Parsed<NaiveDate> {
    let Field::Known(text) = raw else {
        return Parsed::Missing;
    };
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN) {
        return Parsed::Missing;
    }

    let mut shape_matched = false;
    for (shape, format) in DATE_LAYOUTS.iter() {
        if !shape.is_match(trimmed) {
            continue;
        }
        shape_matched = true;
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Parsed::Value(date);
        }
    }

    if shape_matched {
        Parsed::invalid(text, "no such calendar date")
    } else {
        Parsed::invalid(text, "unrecognized date layout")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> Field<String> {
        Field::from(text)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_name_three_tokens() {
        assert_eq!(normalize_name(&raw("Иванов Иван Иванович")), raw("Иванов И.И."));
        assert_eq!(normalize_name(&raw("Smith John Paul")), raw("Smith J.P."));
    }

    #[test]
    fn test_name_with_periods_and_extra_spaces() {
        assert_eq!(normalize_name(&raw("  Петров  П.С. ")), raw("Петров П.С."));
        assert_eq!(normalize_name(&raw("Петров.Петр.Сергеевич")), raw("Петров П.С."));
    }

    #[test]
    fn test_name_extra_tokens_ignored() {
        assert_eq!(normalize_name(&raw("Doe John Mark Junior")), raw("Doe J.M."));
    }

    #[test]
    fn test_name_two_tokens() {
        assert_eq!(normalize_name(&raw("Сидорова Анна")), raw("Сидорова А."));
    }

    #[test]
    fn test_name_single_token_unchanged() {
        assert_eq!(normalize_name(&raw("  Madonna ")), raw("Madonna"));
        assert_eq!(normalize_name(&raw("")), raw(""));
    }

    #[test]
    fn test_name_unknown() {
        assert_eq!(normalize_name(&Field::Unknown), Field::Unknown);
    }

    #[test]
    fn test_company_quotes_and_spaces() {
        assert_eq!(normalize_company(&raw("ООО \"Ромашка\"")), raw("ООО Ромашка"));
        assert_eq!(normalize_company(&raw("  АО  «Вектор   Плюс» ")), raw("АО Вектор Плюс"));
    }

    #[test]
    fn test_company_idempotent() {
        let once = normalize_company(&raw("ЗАО « Север »"));
        assert_eq!(once, raw("ЗАО Север"));
        assert_eq!(normalize_company(&once), once);
    }

    #[test]
    fn test_company_unknown() {
        assert_eq!(normalize_company(&Field::Unknown), Field::Unknown);
    }

    #[test]
    fn test_tax_id() {
        assert_eq!(normalize_tax_id(&raw(" 7701234567 ")), raw("7701234567"));
        assert_eq!(normalize_tax_id(&raw("None")), Field::Unknown);
        assert_eq!(normalize_tax_id(&raw("unknown")), Field::Unknown);
        assert_eq!(normalize_tax_id(&raw("nan")), Field::Unknown);
        assert_eq!(normalize_tax_id(&raw("   ")), Field::Unknown);
        assert_eq!(normalize_tax_id(&Field::Unknown), Field::Unknown);
    }

    #[test]
    fn test_percentage_with_sign() {
        assert_eq!(normalize_percentage(&raw("45%")), Parsed::Value(45.0));
        assert_eq!(normalize_percentage(&raw(" 12.5 % ")), Parsed::Value(12.5));
    }

    #[test]
    fn test_percentage_fraction() {
        assert_eq!(normalize_percentage(&raw("0.45")), Parsed::Value(45.0));
        assert_eq!(normalize_percentage(&raw("1")), Parsed::Value(100.0));
    }

    #[test]
    fn test_percentage_out_of_range_passes_through() {
        assert_eq!(normalize_percentage(&raw("150%")), Parsed::Value(150.0));
        assert_eq!(normalize_percentage(&raw("-5%")), Parsed::Value(-5.0));
    }

    #[test]
    fn test_percentage_missing() {
        assert_eq!(normalize_percentage(&raw("")), Parsed::Missing);
        assert_eq!(normalize_percentage(&raw("unknown")), Parsed::Missing);
        assert_eq!(normalize_percentage(&Field::Unknown), Parsed::Missing);
        assert_eq!(normalize_percentage(&raw("")).into_field(), Field::Unknown);
    }

    #[test]
    fn test_percentage_invalid_keeps_reason() {
        match normalize_percentage(&raw("half")) {
            Parsed::Invalid { input, reason } => {
                assert_eq!(input, "half");
                assert!(reason.contains("not a number"));
            }
            other => panic!("expected invalid, got {:?}", other),
        }
        assert!(matches!(normalize_percentage(&raw("inf%")), Parsed::Invalid { .. }));
        assert!(matches!(normalize_percentage(&raw("%")), Parsed::Invalid { .. }));
    }

    #[test]
    fn test_percentage_overflow_after_scaling() {
        match normalize_percentage(&raw("1e307")) {
            Parsed::Invalid { reason, .. } => assert_eq!(reason, "not a finite number"),
            other => panic!("expected invalid, got {:?}", other),
        }
        assert_eq!(normalize_percentage(&raw("1e307%")), Parsed::Value(1e307));
    }

    #[test]
    fn test_date_layouts() {
        assert_eq!(normalize_date(&raw("31.12.2023")), Parsed::Value(ymd(2023, 12, 31)));
        assert_eq!(normalize_date(&raw("2023-12-31")), Parsed::Value(ymd(2023, 12, 31)));
        assert_eq!(normalize_date(&raw("31/12/2023")), Parsed::Value(ymd(2023, 12, 31)));
        assert_eq!(normalize_date(&raw("31-12-2023")), Parsed::Value(ymd(2023, 12, 31)));
        assert_eq!(normalize_date(&raw("2023/12/31")), Parsed::Value(ymd(2023, 12, 31)));
        assert_eq!(normalize_date(&raw("2023.12.31")), Parsed::Value(ymd(2023, 12, 31)));
        assert_eq!(normalize_date(&raw(" 1.2.2024 ")), Parsed::Value(ymd(2024, 2, 1)));
    }

    #[test]
    fn test_date_day_first_wins() {
        // 03.04 is read as 3 April, never 4 March
        assert_eq!(normalize_date(&raw("03.04.2022")), Parsed::Value(ymd(2022, 4, 3)));
        assert_eq!(normalize_date(&raw("03/04/2022")), Parsed::Value(ymd(2022, 4, 3)));
    }

    #[test]
    fn test_date_roundtrip_canonical() {
        let Parsed::Value(date) = normalize_date(&raw("2023-12-31")) else {
            panic!("expected a date");
        };
        let rendered = date.format("%Y-%m-%d").to_string();
        assert_eq!(normalize_date(&raw(&rendered)), Parsed::Value(date));
    }

    #[test]
    fn test_date_invalid() {
        assert!(matches!(normalize_date(&raw("not a date")), Parsed::Invalid { .. }));
        assert!(matches!(normalize_date(&raw("31.02.2023")), Parsed::Invalid { .. }));
        assert!(matches!(normalize_date(&raw("31.12.23")), Parsed::Invalid { .. }));
        assert_eq!(normalize_date(&raw("")), Parsed::Missing);
        assert_eq!(normalize_date(&Field::Unknown), Parsed::Missing);
        assert_eq!(normalize_date(&raw("not a date")).into_field(), Field::Unknown);
    }
}
