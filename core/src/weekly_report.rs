//! Weekly usage aggregator: trailing-window revenue, SMS and voice
//! totals per MSISDN, qualified against the revenue threshold and joined
//! to the master subscriber set.
//!
//! The window is anchored to the latest observed event, not to a
//! calendar week: `[latest - (window_days - 1) days, latest]`, inclusive.

use crate::{
    config::{PipelineConfig, ReportConfig, UsageConfig, MAX_WINDOW_DAYS},
    subscriber::SubscriberRecord,
    types::Msisdn,
    usage::UsageEventRecord,
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyQualificationRecord {
    pub first_name:             String,
    pub last_name:              String,
    pub msisdn:                 Msisdn,
    pub total_weekly_revenue:   f64,
    pub total_sms_count:        i64,
    pub total_voice_call_count: i64,
    pub region:                 String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalysisWindow {
    Trailing { start: NaiveDateTime, end: NaiveDateTime },
    /// No event timestamp could be parsed; every event was used.
    Degraded,
}

impl AnalysisWindow {
    fn contains(&self, ts: Option<NaiveDateTime>) -> bool {
        match (self, ts) {
            (AnalysisWindow::Degraded, _) => true,
            (AnalysisWindow::Trailing { start, end }, Some(ts)) => ts >= *start && ts <= *end,
            (AnalysisWindow::Trailing { .. }, None) => false,
        }
    }

    /// Window bounds as YYYYMMDD, or "Unknown" when degraded.
    pub fn label(&self) -> (String, String) {
        match self {
            AnalysisWindow::Trailing { start, end } => (
                start.format("%Y%m%d").to_string(),
                end.format("%Y%m%d").to_string(),
            ),
            AnalysisWindow::Degraded => ("Unknown".into(), "Unknown".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReport {
    pub window: AnalysisWindow,
    pub events_in_window: usize,
    /// Events inside the window that carry no usable MSISDN.
    pub events_without_msisdn: usize,
    pub subscribers_with_usage: usize,
    /// Qualifying, ordered by MSISDN.
    pub records: Vec<WeeklyQualificationRecord>,
    /// Qualifying MSISDNs with no master subscriber.
    pub missing_from_master: Vec<Msisdn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub week_start: String,
    pub week_end: String,
    pub qualifying_subscribers: usize,
    pub total_qualified_revenue: f64,
    pub subscribers_with_complete_details: usize,
    pub missing_from_master: usize,
}

impl WeeklyReport {
    pub fn summary(&self) -> ReportSummary {
        let (week_start, week_end) = self.window.label();
        ReportSummary {
            week_start,
            week_end,
            qualifying_subscribers: self.records.len(),
            total_qualified_revenue: self.records.iter().map(|r| r.total_weekly_revenue).sum(),
            subscribers_with_complete_details: self.records.len() - self.missing_from_master.len(),
            missing_from_master: self.missing_from_master.len(),
        }
    }
}

#[derive(Debug, Default)]
struct Totals {
    revenue: f64,
    sms:     f64,
    voice:   i64,
}

pub struct WeeklyAggregator<'a> {
    usage:  &'a UsageConfig,
    report: &'a ReportConfig,
}

impl<'a> WeeklyAggregator<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            usage:  &config.usage,
            report: &config.report,
        }
    }

    /// Trailing window ending at the latest parsed timestamp.
    /// `window_days` is clamped to `1..=MAX_WINDOW_DAYS`; validated configs never hit the clamp.
    pub fn window(&self, events: &[UsageEventRecord]) -> AnalysisWindow {
        let days = self.report.window_days.clamp(1, MAX_WINDOW_DAYS);
        match events.iter().filter_map(|e| e.event_timestamp).max() {
            Some(end) => AnalysisWindow::Trailing {
                start: end - Duration::days(days - 1),
                end,
            },
            None => AnalysisWindow::Degraded,
        }
    }

    pub fn aggregate(&self, events: &[UsageEventRecord], masters: &[SubscriberRecord]) -> WeeklyReport {
        let window = self.window(events);
        match window {
            AnalysisWindow::Trailing { start, end } => {
                log::info!("analysing window {} to {}", start.date(), end.date())
            }
            AnalysisWindow::Degraded if !events.is_empty() => {
                log::warn!("no usage timestamp could be parsed; using all {} events", events.len())
            }
            AnalysisWindow::Degraded => {}
        }

        let mut events_in_window = 0;
        let mut events_without_msisdn = 0;
        let mut totals: BTreeMap<&str, Totals> = BTreeMap::new();
        for event in events.iter().filter(|e| window.contains(e.event_timestamp)) {
            events_in_window += 1;
            let Some(msisdn) = event.match_key() else {
                events_without_msisdn += 1;
                continue;
            };
            let t = totals.entry(msisdn).or_default();
            t.revenue += event.revenue;
            if let Some(type_id) = event.event_type_id {
                if self.usage.sms_event_type_ids.contains(&type_id) {
                    t.sms += event.billing_quantity;
                }
                if self.usage.voice_event_type_ids.contains(&type_id) {
                    t.voice += 1;
                }
            }
        }
        if events_without_msisdn > 0 {
            log::warn!("{events_without_msisdn} usage event(s) in the window have no MSISDN");
        }

        let by_phone: HashMap<&str, &SubscriberRecord> = masters
            .iter()
            .filter_map(|m| m.match_key().map(|k| (k, m)))
            .collect();

        let subscribers_with_usage = totals.len();
        let mut records = Vec::new();
        let mut missing_from_master = Vec::new();
        for (msisdn, t) in totals {
            if t.revenue < self.report.qualification_threshold {
                continue;
            }
            let master = by_phone.get(msisdn).copied();
            if master.is_none() {
                missing_from_master.push(msisdn.to_string());
            }
            let detail = |value: Option<&String>, fallback: &str| {
                value.cloned().unwrap_or_else(|| fallback.to_string())
            };
            records.push(WeeklyQualificationRecord {
                first_name: detail(
                    master.and_then(|m| m.first_name.as_ref()),
                    self.report.unknown_first_name.as_str(),
                ),
                last_name: detail(
                    master.and_then(|m| m.last_name.as_ref()),
                    self.report.unknown_last_name.as_str(),
                ),
                msisdn:                 msisdn.to_string(),
                total_weekly_revenue:   t.revenue,
                total_sms_count:        t.sms.trunc() as i64,
                total_voice_call_count: t.voice,
                region: detail(
                    master.and_then(|m| m.region.as_ref()),
                    self.report.unknown_region.as_str(),
                ),
            });
        }

        log::info!(
            "{} of {subscribers_with_usage} subscribers qualify (revenue >= {})",
            records.len(),
            self.report.qualification_threshold
        );
        if !missing_from_master.is_empty() {
            log::warn!(
                "{} qualifying subscriber(s) missing from master, e.g. {:?}",
                missing_from_master.len(),
                &missing_from_master[..missing_from_master.len().min(5)]
            );
        }

        WeeklyReport {
            window,
            events_in_window,
            events_without_msisdn,
            subscribers_with_usage,
            records,
            missing_from_master,
        }
    }
}
