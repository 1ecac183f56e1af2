//! Usage events: typed records built from raw weekly batches.

use crate::{
    config::{UsageColumns, UsageConfig},
    event::Degradation,
    normalize::{non_blank, normalize_phone_number, parse_quantity, parse_revenue, ParseOutcome, TimestampParser},
    table::{Row, Table},
    types::{EventTypeId, Msisdn},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One billable event. `msisdn` and `revenue` are normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEventRecord {
    pub msisdn:            Option<Msisdn>,
    pub event_timestamp:   Option<NaiveDateTime>,
    pub event_city_id:     Option<i64>,
    pub event_type_id:     Option<EventTypeId>,
    pub tracking_quantity: Option<f64>,
    pub tracking_unit:     Option<String>,
    pub billing_quantity:  f64,
    pub billing_unit:      Option<String>,
    pub revenue:           f64,
}

impl UsageEventRecord {
    /// Usable grouping key: null and digit-less numbers are dropped.
    pub fn match_key(&self) -> Option<&str> {
        self.msisdn.as_deref().filter(|m| !m.is_empty())
    }
}

/// A parsed batch plus what had to be defaulted along the way.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub name:             String,
    pub events:           Vec<UsageEventRecord>,
    pub timestamp_format: Option<String>,
    pub degradations:     BTreeMap<&'static str, Degradation>,
}

/// Lowercase a header and strip quotes and byte-order marks.
pub fn standardize_header(header: &str) -> String {
    header
        .replace('\u{feff}', "")
        .replace("ï»¿", "")
        .replace('"', "")
        .trim()
        .to_lowercase()
}

/// Configured column names in the same form as standardized headers.
fn standardized_columns(cols: &UsageColumns) -> UsageColumns {
    UsageColumns {
        msisdn:            standardize_header(&cols.msisdn),
        event_timestamp:   standardize_header(&cols.event_timestamp),
        event_city_id:     standardize_header(&cols.event_city_id),
        event_type_id:     standardize_header(&cols.event_type_id),
        tracking_quantity: standardize_header(&cols.tracking_quantity),
        tracking_unit:     standardize_header(&cols.tracking_unit),
        billing_quantity:  standardize_header(&cols.billing_quantity),
        billing_unit:      standardize_header(&cols.billing_unit),
        revenue:           standardize_header(&cols.revenue),
    }
}

/// Build typed usage events from one raw batch.
pub fn parse_usage_batch(table: &Table, config: &UsageConfig) -> ParsedBatch {
    let rows: Vec<Row> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|(k, v)| (standardize_header(k), v.clone())).collect())
        .collect();

    let cols = &standardized_columns(&config.columns);
    if !table.columns.iter().any(|c| standardize_header(c) == cols.msisdn) {
        log::warn!("{}: column '{}' not found in {:?}", table.name, cols.msisdn, table.columns);
    }

    let parser = TimestampParser::detect(
        &config.timestamp_formats,
        rows.iter().map(|r| r.get(&cols.event_timestamp).map(String::as_str)),
        config.format_success_ratio,
    );

    let mut batch = ParsedBatch {
        name: table.name.clone(),
        timestamp_format: parser.selected_format().map(str::to_string),
        ..Default::default()
    };
    for row in &rows {
        let event = parse_event(row, cols, &parser, &mut batch.degradations);
        batch.events.push(event);
    }

    log::info!(
        "{}: {} usage events parsed (timestamp format: {})",
        batch.name,
        batch.events.len(),
        batch.timestamp_format.as_deref().unwrap_or("mixed")
    );
    batch
}

fn parse_event(
    row: &Row,
    cols: &UsageColumns,
    parser: &TimestampParser<'_>,
    degradations: &mut BTreeMap<&'static str, Degradation>,
) -> UsageEventRecord {
    let cell = |name: &str| row.get(name).map(String::as_str);
    let mut track = |field: &'static str, outcome: ParseOutcome<f64>| match outcome {
        ParseOutcome::Defaulted { raw, .. } => {
            degradations.entry(field).or_default().record(&raw);
            None
        }
        other => other.value(),
    };

    let revenue = track("revenue", parse_revenue(cell(&cols.revenue))).unwrap_or(0.0);
    let billing_quantity =
        track("billing_quantity", parse_quantity(cell(&cols.billing_quantity))).unwrap_or(0.0);
    let tracking_quantity = track("tracking_quantity", parse_quantity(cell(&cols.tracking_quantity)));

    let event_timestamp = match parser.parse(cell(&cols.event_timestamp)) {
        ParseOutcome::Defaulted { raw, .. } => {
            degradations.entry("event_timestamp").or_default().record(&raw);
            None
        }
        other => other.value(),
    };

    UsageEventRecord {
        msisdn: normalize_phone_number(non_blank(cell(&cols.msisdn))),
        event_timestamp,
        event_city_id: parse_id(cell(&cols.event_city_id)),
        event_type_id: parse_id(cell(&cols.event_type_id)),
        tracking_quantity,
        tracking_unit: non_blank(cell(&cols.tracking_unit)).map(str::to_string),
        billing_quantity,
        billing_unit: non_blank(cell(&cols.billing_unit)).map(str::to_string),
        revenue,
    }
}

/// Ids are integers, sometimes written as "6.0" by spreadsheet exports.
fn parse_id(raw: Option<&str>) -> Option<i64> {
    let raw = non_blank(raw)?;
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && v.is_finite())
            .map(|v| v as i64)
    })
}
