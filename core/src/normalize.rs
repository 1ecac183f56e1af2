//! Field normalizer: phone numbers, revenue amounts, dates and timestamps.
//!
//! RULE: normalization never fails. Values that cannot be parsed are
//! coerced to a documented default and reported as `ParseOutcome::Defaulted`
//! so callers can count degradation without aborting a run.

use chrono::{NaiveDate, NaiveDateTime};

/// Result of normalizing one raw field.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    /// Null or blank input.
    Missing,
    /// Input present but unusable; the caller's default applies.
    Defaulted { raw: String, reason: &'static str },
}

impl<T> ParseOutcome<T> {
    pub fn value(self) -> Option<T> {
        match self {
            ParseOutcome::Parsed(v) => Some(v),
            _ => None,
        }
    }

    pub fn value_or(self, default: T) -> T {
        self.value().unwrap_or(default)
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, ParseOutcome::Defaulted { .. })
    }
}

/// Treat empty and whitespace-only cells as null.
pub fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Strip every character that is not an ASCII decimal digit.
/// `None` passes through; no country-code or leading-zero handling.
pub fn normalize_phone_number(raw: Option<&str>) -> Option<String> {
    raw.map(|r| r.chars().filter(|c| c.is_ascii_digit()).collect())
}

/// Parse a comma-decimal amount: the first comma becomes the decimal point.
pub fn parse_decimal(raw: Option<&str>) -> ParseOutcome<f64> {
    let Some(raw) = non_blank(raw) else {
        return ParseOutcome::Missing;
    };
    let candidate = raw.replacen(',', ".", 1);
    match candidate.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => ParseOutcome::Parsed(v),
        Ok(_) => ParseOutcome::Defaulted { raw: raw.to_string(), reason: "non-finite number" },
        Err(_) => ParseOutcome::Defaulted { raw: raw.to_string(), reason: "not a number" },
    }
}

/// Revenue must be finite and non-negative.
pub fn parse_revenue(raw: Option<&str>) -> ParseOutcome<f64> {
    match parse_decimal(raw) {
        ParseOutcome::Parsed(v) if v < 0.0 => ParseOutcome::Defaulted {
            raw: raw.unwrap_or_default().trim().to_string(),
            reason: "negative revenue",
        },
        other => other,
    }
}

/// Total revenue normalization: anything unparseable becomes 0.0.
pub fn normalize_revenue(raw: Option<&str>) -> f64 {
    parse_revenue(raw).value_or(0.0)
}

/// Billing and tracking quantities use the same decimal convention.
pub fn parse_quantity(raw: Option<&str>) -> ParseOutcome<f64> {
    parse_decimal(raw)
}

/// Parse a calendar date trying each format in order. Datetime formats
/// are accepted too; only the date part is kept.
pub fn parse_date(raw: Option<&str>, date_formats: &[String], datetime_formats: &[String]) -> ParseOutcome<NaiveDate> {
    let Some(raw) = non_blank(raw) else {
        return ParseOutcome::Missing;
    };
    if let Some(d) = date_formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
    {
        return ParseOutcome::Parsed(d);
    }
    match datetime_formats
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
    {
        Some(dt) => ParseOutcome::Parsed(dt.date()),
        None => ParseOutcome::Defaulted { raw: raw.to_string(), reason: "unrecognised date format" },
    }
}

/// Timestamp parser for one usage batch.
///
/// A batch is usually written in a single format, so the parser first
/// picks the first format that parses more than `success_ratio` of the
/// non-blank values. Rows that fail the chosen format are retried
/// against every format before being defaulted.
#[derive(Debug, Clone)]
pub struct TimestampParser<'a> {
    formats:  &'a [String],
    selected: Option<&'a str>,
}

impl<'a> TimestampParser<'a> {
    pub fn detect<'r, I>(formats: &'a [String], samples: I, success_ratio: f64) -> Self
    where
        I: IntoIterator<Item = Option<&'r str>>,
    {
        let values: Vec<&str> = samples.into_iter().filter_map(non_blank).collect();
        let selected = if values.is_empty() {
            None
        } else {
            formats.iter().map(String::as_str).find(|fmt| {
                let ok = values
                    .iter()
                    .filter(|v| NaiveDateTime::parse_from_str(v, fmt).is_ok())
                    .count();
                ok as f64 / values.len() as f64 > success_ratio
            })
        };
        match selected {
            Some(fmt) => log::debug!("timestamp format selected: {fmt}"),
            None => log::debug!("no dominant timestamp format; parsing row by row"),
        }
        Self { formats, selected }
    }

    pub fn selected_format(&self) -> Option<&str> {
        self.selected
    }

    pub fn parse(&self, raw: Option<&str>) -> ParseOutcome<NaiveDateTime> {
        let Some(raw) = non_blank(raw) else {
            return ParseOutcome::Missing;
        };
        let preferred = self
            .selected
            .and_then(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok());
        let parsed = preferred.or_else(|| {
            self.formats
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        });
        match parsed {
            Some(ts) => ParseOutcome::Parsed(ts),
            None => ParseOutcome::Defaulted { raw: raw.to_string(), reason: "unrecognised timestamp format" },
        }
    }
}
