//! Pipeline events: the observable record of a run.
//!
//! RULE: every stage reports what it did through events.
//! The engine persists them to `event_log`; nothing else writes there.

use crate::types::RunId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    // ── Engine events ──────────────────────────────
    RunInitialized {
        run_id: RunId,
        version: String,
    },
    StageStarted {
        stage: String,
    },
    StageCompleted {
        stage: String,
    },

    // ── Consolidation ──────────────────────────────
    SourceReconciled {
        source: String,
        rows: usize,
    },
    SubscribersConsolidated {
        total_records: usize,
        master_records: usize,
        unmatchable_records: usize,
    },

    // ── Row-level coercion ─────────────────────────
    /// Values of `field` that could not be parsed and were defaulted.
    ParseDegraded {
        stage: String,
        field: String,
        count: usize,
        sample: Option<String>,
    },

    // ── Weekly report ──────────────────────────────
    UsageBatchParsed {
        batch: String,
        rows: usize,
        timestamp_format: Option<String>,
    },
    AnalysisWindowSelected {
        start: String,
        end: String,
        events_in_window: usize,
    },
    /// No usage timestamp parsed; the whole input was used as the window.
    AnalysisWindowDegraded {
        events: usize,
    },
    WeeklyReportBuilt {
        subscribers_with_usage: usize,
        qualifying_subscribers: usize,
        missing_from_master: usize,
        total_qualified_revenue: f64,
    },

    // ── Load and analysis ──────────────────────────
    TableLoaded {
        table: String,
        rows: usize,
    },
    AnalysisExported {
        query: String,
        output: String,
        rows: usize,
    },
    AnalysisSkipped {
        query: String,
        reason: String,
    },
}

impl PipelineEvent {
    /// Stable name stored in the `event_type` column.
    pub fn type_name(&self) -> &'static str {
        match self {
            PipelineEvent::RunInitialized { .. }          => "run_initialized",
            PipelineEvent::StageStarted { .. }            => "stage_started",
            PipelineEvent::StageCompleted { .. }          => "stage_completed",
            PipelineEvent::SourceReconciled { .. }        => "source_reconciled",
            PipelineEvent::SubscribersConsolidated { .. } => "subscribers_consolidated",
            PipelineEvent::ParseDegraded { .. }           => "parse_degraded",
            PipelineEvent::UsageBatchParsed { .. }        => "usage_batch_parsed",
            PipelineEvent::AnalysisWindowSelected { .. }  => "analysis_window_selected",
            PipelineEvent::AnalysisWindowDegraded { .. }  => "analysis_window_degraded",
            PipelineEvent::WeeklyReportBuilt { .. }       => "weekly_report_built",
            PipelineEvent::TableLoaded { .. }             => "table_loaded",
            PipelineEvent::AnalysisExported { .. }        => "analysis_exported",
            PipelineEvent::AnalysisSkipped { .. }         => "analysis_skipped",
        }
    }
}

/// A persisted row of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub stage:      String,
    pub event_type: String,
    pub payload:    String,
}

/// Running tally of defaulted values for one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Degradation {
    pub count:  usize,
    pub sample: Option<String>,
}

impl Degradation {
    pub fn record(&mut self, raw: &str) {
        self.count += 1;
        if self.sample.is_none() {
            self.sample = Some(raw.to_string());
        }
    }

    pub fn into_event(self, stage: &str, field: &str) -> Option<PipelineEvent> {
        if self.count == 0 {
            return None;
        }
        log::warn!(
            "{stage}: {} value(s) of '{field}' could not be parsed and were defaulted (e.g. {:?})",
            self.count,
            self.sample.as_deref().unwrap_or("")
        );
        Some(PipelineEvent::ParseDegraded {
            stage: stage.to_string(),
            field: field.to_string(),
            count: self.count,
            sample: self.sample,
        })
    }
}
