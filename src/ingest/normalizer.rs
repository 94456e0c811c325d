//! Field normalization for raw sheet cells
//!
//! Cells arrive as free text typed by humans: thousands separators, currency
//! suffixes ("500k", "1,200,000đ"), day-first dates with or without a year.
//! Every public function here is total: malformed input degrades to `0.0` or
//! `""`. The `try_*` variants expose the failure reason for callers (and
//! tests) that need to tell "zero" apart from "not a number".

/// Why a cell could not be normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Empty,
    NotANumber(String),
    NotADate(String),
    OutOfRange(String),
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldError::Empty => write!(f, "empty cell"),
            FieldError::NotANumber(raw) => write!(f, "not a number: {:?}", raw),
            FieldError::NotADate(raw) => write!(f, "not a day-first date: {:?}", raw),
            FieldError::OutOfRange(msg) => write!(f, "date component out of range: {}", msg),
        }
    }
}

impl std::error::Error for FieldError {}

/// Day, month and year of a parsed cell, already range-checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateParts {
    /// Zero-padded `YYYY-MM-DD`
    pub fn to_iso(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Parse a monetary cell, returning `0.0` for anything unusable.
///
/// Every character that is not an ASCII digit, `-` or `.` is dropped before
/// parsing, so "1,200,000 đ" reads as 1200000 and "500k" as 500.
pub fn parse_amount(raw: &str) -> f64 {
    try_parse_amount(raw).unwrap_or(0.0)
}

/// `Result` form of [`parse_amount`].
///
/// After stripping, the longest leading `-?digits(.digits)?` prefix is parsed,
/// so trailing junk such as a dangling `-` ("1.234,-") does not void the value.
pub fn try_parse_amount(raw: &str) -> Result<f64, FieldError> {
    if raw.is_empty() {
        return Err(FieldError::Empty);
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();

    let prefix = numeric_prefix(&cleaned).ok_or_else(|| FieldError::NotANumber(raw.to_string()))?;

    match prefix.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FieldError::NotANumber(raw.to_string())),
    }
}

/// Longest prefix of `s` shaped like `-?\d*(\.\d*)?` containing at least one digit
fn numeric_prefix(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut digits = 0;

    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        let mut frac_digits = 0;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
            frac_digits += 1;
        }
        // "5." parses as 5, but a lone "." contributes nothing
        if digits > 0 || frac_digits > 0 {
            end = frac_end;
            digits += frac_digits;
        }
    }

    if digits == 0 {
        return None;
    }

    // f64::from_str rejects "5." so drop a trailing dot
    let slice = &s[..end];
    Some(slice.strip_suffix('.').unwrap_or(slice))
}

/// Leading run of ASCII digits after optional whitespace ("3 (thứ 2)" -> 3)
fn leading_int(s: &str) -> Option<u32> {
    let s = s.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    s[..end].parse().ok()
}

/// Parse a day-first `D/M` or `D/M/Y` cell into `YYYY-MM-DD`, or `""`.
///
/// A two-digit year is read as `20YY`; a missing year uses `fallback_year`.
/// Day and month are range-checked independently (Feb 30 is accepted).
pub fn parse_local_date(raw: &str, fallback_year: i32) -> String {
    try_parse_local_date(raw, fallback_year)
        .map(|parts| parts.to_iso())
        .unwrap_or_default()
}

/// `Result` form of [`parse_local_date`].
pub fn try_parse_local_date(raw: &str, fallback_year: i32) -> Result<DateParts, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Empty);
    }

    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.len() < 2 {
        return Err(FieldError::NotADate(raw.to_string()));
    }

    let day = leading_int(parts[0]).ok_or_else(|| FieldError::NotADate(raw.to_string()))?;
    let month = leading_int(parts[1]).ok_or_else(|| FieldError::NotADate(raw.to_string()))?;

    if !(1..=31).contains(&day) {
        return Err(FieldError::OutOfRange(format!("day {}", day)));
    }
    if !(1..=12).contains(&month) {
        return Err(FieldError::OutOfRange(format!("month {}", month)));
    }

    let year = match parts.get(2).map(|s| s.trim()) {
        None | Some("") => fallback_year,
        Some(segment) => parse_year_segment(segment).ok_or_else(|| FieldError::NotADate(raw.to_string()))?,
    };

    Ok(DateParts { year, month, day })
}

/// Leading digit run of the segment: "25" -> 2025, "2025 10:30:00" -> 2025.
///
/// The run must be two or four digits long; anything else is rejected.
fn parse_year_segment(segment: &str) -> Option<i32> {
    let segment = segment.trim_start();
    let end = segment.find(|c: char| !c.is_ascii_digit()).unwrap_or(segment.len());
    let digits = &segment[..end];
    match digits.len() {
        2 => format!("20{}", digits).parse().ok(),
        4 => digits.parse().ok(),
        _ => None,
    }
}

/// Year implied by a sheet name: the first four consecutive digits, else `current_year`.
pub fn year_from_sheet_name(name: &str, current_year: i32) -> i32 {
    let bytes = name.as_bytes();
    bytes
        .windows(4)
        .position(|w| w.iter().all(u8::is_ascii_digit))
        .and_then(|start| name[start..start + 4].parse().ok())
        .unwrap_or(current_year)
}
