//! Field normalizer tests: phone numbers, revenue, dates, timestamps.

use chrono::{NaiveDate, NaiveDateTime};
use vmobile_core::{
    config::PipelineConfig,
    normalize::{
        normalize_phone_number, normalize_revenue, parse_date, parse_quantity, parse_revenue,
        ParseOutcome, TimestampParser,
    },
};

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Phone numbers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn phone_number_keeps_digits_only() {
    assert_eq!(
        normalize_phone_number(Some("+27 82-555 0001")).as_deref(),
        Some("27825550001")
    );
    assert_eq!(normalize_phone_number(Some("(082) 555.0001")).as_deref(), Some("0825550001"));
}

#[test]
fn phone_number_keeps_leading_zero_and_country_code_as_given() {
    assert_eq!(normalize_phone_number(Some("0825550001")).as_deref(), Some("0825550001"));
    assert_eq!(normalize_phone_number(Some("27825550001")).as_deref(), Some("27825550001"));
}

#[test]
fn null_phone_number_passes_through() {
    assert_eq!(normalize_phone_number(None), None);
    assert_eq!(normalize_phone_number(Some("n/a")).as_deref(), Some(""));
}

// ─────────────────────────────────────────────────────────────────────────────
// Revenue
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn revenue_comma_is_decimal_separator() {
    assert_eq!(normalize_revenue(Some("12,50")), 12.5);
    assert_eq!(normalize_revenue(Some("  7,25 ")), 7.25);
    assert_eq!(normalize_revenue(Some("30.00")), 30.0);
    assert_eq!(normalize_revenue(Some("45")), 45.0);
}

#[test]
fn unparseable_revenue_is_zero_and_flagged() {
    assert_eq!(normalize_revenue(Some("not a number")), 0.0);
    assert!(parse_revenue(Some("not a number")).is_defaulted());

    // Only the first comma is a decimal point.
    assert_eq!(normalize_revenue(Some("1,234,50")), 0.0);

    assert_eq!(normalize_revenue(None), 0.0);
    assert_eq!(parse_revenue(None), ParseOutcome::Missing);
    assert_eq!(parse_revenue(Some("   ")), ParseOutcome::Missing);
}

#[test]
fn revenue_is_finite_and_non_negative() {
    for raw in ["inf", "NaN", "-5,00"] {
        let outcome = parse_revenue(Some(raw));
        assert!(outcome.is_defaulted(), "{raw} should be defaulted, got {outcome:?}");
        assert_eq!(normalize_revenue(Some(raw)), 0.0);
    }
}

#[test]
fn revenue_round_trips_through_comma_format() {
    for x in [0.0, 0.5, 12.5, 30.0, 45.75, 1234.5] {
        let comma = format!("{x}").replacen('.', ",", 1);
        assert_eq!(normalize_revenue(Some(&comma)), x, "round trip of {comma}");
    }
}

#[test]
fn quantities_allow_negative_values() {
    assert_eq!(parse_quantity(Some("-2")), ParseOutcome::Parsed(-2.0));
    assert_eq!(parse_quantity(Some("1,5")), ParseOutcome::Parsed(1.5));
}

// ─────────────────────────────────────────────────────────────────────────────
// Dates and timestamps
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn dates_are_day_first() {
    let cfg = PipelineConfig::default();
    let parse = |raw| parse_date(Some(raw), &cfg.date_formats, &cfg.usage.timestamp_formats);

    let june_first = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    assert_eq!(parse("01/06/2024"), ParseOutcome::Parsed(june_first));
    assert_eq!(parse("01-06-2024"), ParseOutcome::Parsed(june_first));
    assert_eq!(parse("2024-06-01"), ParseOutcome::Parsed(june_first));
    assert_eq!(parse("01 06 2024 08:30"), ParseOutcome::Parsed(june_first));
}

#[test]
fn bad_dates_are_defaulted_not_errors() {
    let cfg = PipelineConfig::default();
    let outcome = parse_date(Some("32/13/2024"), &cfg.date_formats, &cfg.usage.timestamp_formats);
    assert!(outcome.is_defaulted());
    assert_eq!(outcome.value(), None);

    let blank = parse_date(Some(""), &cfg.date_formats, &cfg.usage.timestamp_formats);
    assert_eq!(blank, ParseOutcome::Missing);
}

#[test]
fn timestamp_parser_selects_dominant_format() {
    let cfg = PipelineConfig::default();
    let samples = ["2024/06/08 08:00", "2024/06/08 09:00", "2024/06/09 18:45"];
    let parser = TimestampParser::detect(
        &cfg.usage.timestamp_formats,
        samples.iter().map(|s| Some(*s)),
        cfg.usage.format_success_ratio,
    );

    assert_eq!(parser.selected_format(), Some("%Y/%m/%d %H:%M"));
    assert_eq!(parser.parse(Some("2024/06/09 18:45")), ParseOutcome::Parsed(ts("2024-06-09 18:45")));
}

#[test]
fn timestamp_parser_falls_back_row_by_row() {
    let cfg = PipelineConfig::default();
    let samples = ["03 06 2024 09:15", "2024/06/08 08:00", "garbage", "20240609 18:45"];
    let parser = TimestampParser::detect(
        &cfg.usage.timestamp_formats,
        samples.iter().map(|s| Some(*s)),
        cfg.usage.format_success_ratio,
    );

    assert_eq!(parser.selected_format(), None);
    assert_eq!(parser.parse(Some("03 06 2024 09:15")), ParseOutcome::Parsed(ts("2024-06-03 09:15")));
    assert_eq!(parser.parse(Some("20240609 18:45")), ParseOutcome::Parsed(ts("2024-06-09 18:45")));
    assert!(parser.parse(Some("garbage")).is_defaulted());
    assert_eq!(parser.parse(None), ParseOutcome::Missing);
}
