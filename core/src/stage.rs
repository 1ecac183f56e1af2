//! Stage trait and the shared run context.
//!
//! RULE: Every pipeline step implements PipelineStage.
//! The engine calls run() on each registered stage once,
//! in registration order. The order is fixed and documented in engine.rs.
//! Stages hand results forward only through PipelineContext.

use crate::{
    config::PipelineConfig,
    dedup::Deduplicated,
    error::EtlResult,
    event::PipelineEvent,
    store::PipelineStore,
    usage::UsageEventRecord,
    weekly_report::WeeklyReport,
};
use std::path::PathBuf;

/// The contract every stage must fulfill.
pub trait PipelineStage {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// Called once per run by the engine.
    ///
    /// - `ctx`:   configuration, paths and the outputs of earlier stages
    /// - `store`: the run's database
    ///
    /// Returns the events to append to the run's event log.
    fn run(&mut self, ctx: &mut PipelineContext, store: &mut PipelineStore) -> EtlResult<Vec<PipelineEvent>>;
}

#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub config: PipelineConfig,
    /// Source rosters, usage batches and lookup files.
    pub raw_dir: PathBuf,
    /// Consolidated tables, the weekly report and analysis exports.
    pub processed_dir: PathBuf,
    /// Canned analysis queries.
    pub sql_dir: PathBuf,
    /// YYYYMMDD stamp used in the report file name.
    pub report_date: String,

    pub consolidated: Option<Deduplicated>,
    pub usage_events: Option<Vec<UsageEventRecord>>,
    pub report:       Option<WeeklyReport>,
}

impl PipelineContext {
    pub fn new(
        config: PipelineConfig,
        raw_dir: impl Into<PathBuf>,
        processed_dir: impl Into<PathBuf>,
        sql_dir: impl Into<PathBuf>,
        report_date: impl Into<String>,
    ) -> Self {
        Self {
            config,
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
            sql_dir: sql_dir.into(),
            report_date: report_date.into(),
            consolidated: None,
            usage_events: None,
            report: None,
        }
    }

    /// Conventional layout: `{data_dir}/raw`, `{data_dir}/processed`.
    pub fn from_data_dir(
        config: PipelineConfig,
        data_dir: &str,
        sql_dir: &str,
        report_date: impl Into<String>,
    ) -> Self {
        Self::new(
            config,
            format!("{data_dir}/raw"),
            format!("{data_dir}/processed"),
            sql_dir,
            report_date,
        )
    }

    pub fn report_path(&self) -> PathBuf {
        self.processed_dir
            .join(self.config.report_file_name(&self.report_date))
    }
}
