use crate::{
    error::{EtlError, EtlResult},
    subscriber::SourceSystem,
    types::EventTypeId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ── Subscriber sources ─────────────────────────────────────────────

/// Source column name for each canonical subscriber field.
/// `phone`, `first_name` and `last_name` are mandatory; the rest may be
/// absent for sources that never carry them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMap {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub sim_activation_date: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: SourceSystem,
    /// Roster file name under the raw data directory.
    pub file_name: String,
    pub columns: ColumnMap,
}

// ── Usage events ───────────────────────────────────────────────────

/// Canonical usage column names. Both these names and the batch headers
/// are lowercased and stripped of quotes and byte-order marks before matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageColumns {
    pub msisdn: String,
    pub event_timestamp: String,
    pub event_city_id: String,
    pub event_type_id: String,
    pub tracking_quantity: String,
    pub tracking_unit: String,
    pub billing_quantity: String,
    pub billing_unit: String,
    pub revenue: String,
}

impl Default for UsageColumns {
    fn default() -> Self {
        Self {
            msisdn:            "msisdn".into(),
            event_timestamp:   "usage_event_date_time".into(),
            event_city_id:     "usage_event_city_id".into(),
            event_type_id:     "usage_event_type_id".into(),
            tracking_quantity: "usage_event_tracking_quantity".into(),
            tracking_unit:     "usage_event_tracking_unit".into(),
            billing_quantity:  "usage_event_billing_quantity".into(),
            billing_unit:      "usage_event_billing_unit".into(),
            revenue:           "usage_event_revenue".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Weekly batch file names, oldest first.
    pub batch_files: Vec<String>,
    #[serde(default)]
    pub columns: UsageColumns,
    pub timestamp_formats: Vec<String>,
    /// Share of a batch a format must parse to be selected for it.
    pub format_success_ratio: f64,
    pub sms_event_type_ids: BTreeSet<EventTypeId>,
    pub voice_event_type_ids: BTreeSet<EventTypeId>,
}

// ── Weekly report ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Minimum trailing-window revenue to qualify.
    pub qualification_threshold: f64,
    /// Length of the analysis window in days, including the anchor day.
    pub window_days: i64,
    pub unknown_first_name: String,
    pub unknown_last_name: String,
    pub unknown_region: String,
}

/// Longest trailing window accepted; one leap year.
pub const MAX_WINDOW_DAYS: i64 = 366;

// ── Store loading and analysis ─────────────────────────────────────

/// A raw lookup file loaded verbatim into its own table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub table: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisQuery {
    pub sql_file: String,
    pub output_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub combined_all_file: String,
    pub combined_master_file: String,
    /// `{date}` is replaced by the report date as YYYYMMDD.
    pub report_file_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sources: Vec<SourceConfig>,
    /// Lower value wins when the same phone number appears in several sources.
    pub source_priority: HashMap<SourceSystem, u32>,
    pub date_formats: Vec<String>,
    pub usage: UsageConfig,
    pub report: ReportConfig,
    pub lookups: Vec<LookupConfig>,
    pub analysis_queries: Vec<AnalysisQuery>,
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load from `{data_dir}/config/pipeline.json`.
    /// In tests, use `PipelineConfig::default()`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/config/pipeline.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field rules serde cannot express.
    /// Reported before any data is read.
    pub fn validate(&self) -> EtlResult<()> {
        for src in &self.sources {
            self.priority_of(src.source)?;
            mandatory_columns(src)?;
        }

        let window_days = self.report.window_days;
        if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
            return Err(invalid(
                "report.window_days",
                format!("{window_days} is outside 1..={MAX_WINDOW_DAYS}"),
            ));
        }
        let threshold = self.report.qualification_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(invalid(
                "report.qualification_threshold",
                format!("{threshold} is not a finite, non-negative amount"),
            ));
        }
        let ratio = self.usage.format_success_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(invalid(
                "usage.format_success_ratio",
                format!("{ratio} is outside (0, 1]"),
            ));
        }
        Ok(())
    }

    pub fn source(&self, source: SourceSystem) -> EtlResult<&SourceConfig> {
        self.sources
            .iter()
            .find(|s| s.source == source)
            .ok_or(EtlError::MissingSourceMapping { system: source })
    }

    pub fn priority_of(&self, source: SourceSystem) -> EtlResult<u32> {
        self.source_priority
            .get(&source)
            .copied()
            .ok_or(EtlError::MissingPriority { system: source })
    }

    pub fn report_file_name(&self, report_date: &str) -> String {
        self.output.report_file_pattern.replace("{date}", report_date)
    }
}

/// The three mandatory source column names, in (phone, first, last) order.
pub fn mandatory_columns<'s>(src: &'s SourceConfig) -> EtlResult<(&'s str, &'s str, &'s str)> {
    let require = |col: &'s Option<String>, field: &'static str| {
        col.as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or(EtlError::MissingMapping { system: src.source, field })
    };
    Ok((
        require(&src.columns.phone, "phone")?,
        require(&src.columns.first_name, "first_name")?,
        require(&src.columns.last_name, "last_name")?,
    ))
}

fn invalid(field: &'static str, reason: String) -> EtlError {
    EtlError::InvalidSetting { field, reason }
}

impl Default for PipelineConfig {
    /// The VMobile roster and usage layout.
    fn default() -> Self {
        let col = |s: &str| Some(s.to_string());
        Self {
            sources: vec![
                SourceConfig {
                    source: SourceSystem::VMobile,
                    file_name: "VMobile_subscribers.csv".into(),
                    columns: ColumnMap {
                        phone:               col("Cell Number"),
                        first_name:          col("First Name"),
                        last_name:           col("Last Name"),
                        sim_activation_date: col("SIM Activation Date"),
                        date_of_birth:       col("Birthday"),
                        region:              col("Location"),
                    },
                },
                SourceConfig {
                    source: SourceSystem::BlueMobile,
                    file_name: "VMobile_subscribers_bluemobile.csv".into(),
                    columns: ColumnMap {
                        phone:               col("Cell"),
                        first_name:          col("Name"),
                        last_name:           col("Surname"),
                        sim_activation_date: col("Activate"),
                        date_of_birth:       col("Date"),
                        region:              col("City"),
                    },
                },
                SourceConfig {
                    source: SourceSystem::ArrowMobile,
                    file_name: "VMobile_subscribers_arrowmobile.csv".into(),
                    columns: ColumnMap {
                        phone:               col("CellNo"),
                        first_name:          col("FirstName"),
                        last_name:           col("LastName"),
                        sim_activation_date: col("SIMDate"),
                        date_of_birth:       None,
                        region:              col("Area"),
                    },
                },
            ],
            source_priority: HashMap::from([
                (SourceSystem::VMobile, 1),
                (SourceSystem::BlueMobile, 2),
                (SourceSystem::ArrowMobile, 3),
            ]),
            date_formats: [
                "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %m %Y", "%Y-%m-%d", "%Y/%m/%d", "%Y%m%d",
            ]
            .map(String::from)
            .to_vec(),
            usage: UsageConfig {
                batch_files: vec![
                    "VMobile_usage_records.csv".into(),
                    "VMobile_usage_records_week_2.csv".into(),
                ],
                columns: UsageColumns::default(),
                timestamp_formats: [
                    "%d %m %Y %H:%M",
                    "%Y/%m/%d %H:%M",
                    "%Y%m%d %H:%M",
                    "%d/%m/%Y %H:%M",
                    "%Y-%m-%d %H:%M:%S",
                    "%Y-%m-%d %H:%M",
                    "%d/%m/%Y %H:%M:%S",
                ]
                .map(String::from)
                .to_vec(),
                format_success_ratio: 0.8,
                // on-net-sms, other-mobile-sms
                sms_event_type_ids: BTreeSet::from([6, 10]),
                voice_event_type_ids: BTreeSet::from([3, 4, 5, 8, 9]),
            },
            report: ReportConfig {
                qualification_threshold: 30.0,
                window_days: 7,
                unknown_first_name: "Unknown".into(),
                unknown_last_name: "Subscriber".into(),
                unknown_region: "Unknown".into(),
            },
            lookups: vec![
                LookupConfig {
                    table: "city_lookup".into(),
                    file_name: "VMobile_city_lookup.csv".into(),
                },
                LookupConfig {
                    table: "usage_event_lookup".into(),
                    file_name: "VMobile_usage_event_lookup.csv".into(),
                },
            ],
            analysis_queries: vec![
                AnalysisQuery {
                    sql_file: "weekly_trends_analysis.sql".into(),
                    output_file: "weekly_summary_trends.csv".into(),
                },
                AnalysisQuery {
                    sql_file: "regional_analysis.sql".into(),
                    output_file: "regional_analysis.csv".into(),
                },
                AnalysisQuery {
                    sql_file: "subscriber_details.sql".into(),
                    output_file: "subscriber_details.csv".into(),
                },
            ],
            output: OutputConfig {
                combined_all_file: "combined_subscribers_all.csv".into(),
                combined_master_file: "combined_subscribers_master.csv".into(),
                report_file_pattern: "weekly_qualification_report_{date}.csv".into(),
            },
        }
    }
}
