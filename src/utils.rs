use crate::error::{ReconciliationError, Result};
use chrono::{Datelike, Days, NaiveDate};

pub const MONTHS_IN_YEAR: usize = 12;

const MONTH_NAMES: [&str; MONTHS_IN_YEAR] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

/// Last calendar day of the reporting period, e.g. 31/03/2024 for 2024-03.
pub fn period_end(year: i32, month: u32) -> Result<NaiveDate> {
    validate_month(month)?;
    last_day_of_month(year, month).ok_or_else(|| {
        ReconciliationError::DateError(format!("No month end for {:04}-{:02}", year, month))
    })
}

pub fn validate_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(ReconciliationError::InvalidMonth(month));
    }
    Ok(())
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[month as usize - 1],
        _ => "Unknown",
    }
}

/// Parses a ledger date. GL exports write `dd/mm/yyyy`; ISO dates are accepted too.
pub fn parse_ledger_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .ok()
}

/// Returns the month (1-12) of `date` if it falls in `year`, or any year when `year` is `None`.
pub fn month_in_year(date: NaiveDate, year: Option<i32>) -> Option<u32> {
    match year {
        Some(y) if date.year() != y => None,
        _ => Some(date.month()),
    }
}

/// Converts a zero-based column index to its spreadsheet letter (0 -> A, 26 -> AA).
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts a spreadsheet column letter to its zero-based index (A -> 0, AA -> 26).
pub fn column_index(letters: &str) -> Result<usize> {
    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return Err(ReconciliationError::InvalidColumn(letters.to_string()));
    }

    let mut index = 0usize;
    for c in trimmed.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(ReconciliationError::InvalidColumn(letters.to_string()));
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| ReconciliationError::InvalidColumn(letters.to_string()))?;
    }
    Ok(index - 1)
}

/// Parses a numeric cell text, tolerating thousands separators and accounting parentheses.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    if let Some(inner) = cleaned
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return inner.parse::<f64>().ok().map(|v| -v);
    }
    cleaned.parse::<f64>().ok()
}

pub fn amounts_match(left: f64, right: f64, tolerance: f64) -> bool {
    (left - right).abs() <= tolerance
}
