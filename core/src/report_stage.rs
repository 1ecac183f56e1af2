//! Weekly report stage: parses both usage batches, aggregates the
//! trailing window and writes the qualification report.
//!
//! Master subscribers come from the consolidation stage of the same run,
//! or from the consolidated master file when this stage runs on its own.

use crate::{
    error::EtlResult,
    event::PipelineEvent,
    stage::{PipelineContext, PipelineStage},
    store::PipelineStore,
    subscriber::SubscriberRecord,
    table::{read_csv, read_records, write_csv},
    usage::parse_usage_batch,
    weekly_report::{AnalysisWindow, WeeklyAggregator},
};

pub struct WeeklyReportStage;

impl WeeklyReportStage {
    fn masters(ctx: &PipelineContext) -> EtlResult<Vec<SubscriberRecord>> {
        if let Some(deduped) = &ctx.consolidated {
            return Ok(deduped.master_only.clone());
        }
        let path = ctx.processed_dir.join(&ctx.config.output.combined_master_file);
        log::info!("reading master subscribers from {}", path.display());
        read_records(&path)
    }
}

impl PipelineStage for WeeklyReportStage {
    fn name(&self) -> &'static str { "weekly_report" }

    fn run(&mut self, ctx: &mut PipelineContext, _store: &mut PipelineStore) -> EtlResult<Vec<PipelineEvent>> {
        let mut events = Vec::new();
        ctx.config.validate()?;
        let masters = Self::masters(ctx)?;
        log::info!("master subscribers loaded: {}", masters.len());

        let mut all_events = Vec::new();
        for file in &ctx.config.usage.batch_files {
            let table = read_csv(&ctx.raw_dir.join(file))?;
            let batch = parse_usage_batch(&table, &ctx.config.usage);
            events.push(PipelineEvent::UsageBatchParsed {
                batch: batch.name.clone(),
                rows: batch.events.len(),
                timestamp_format: batch.timestamp_format.clone(),
            });
            for (field, degradation) in batch.degradations {
                events.extend(degradation.into_event(self.name(), field));
            }
            all_events.extend(batch.events);
        }
        log::info!("combined usage data: {} records", all_events.len());

        let report = WeeklyAggregator::new(&ctx.config).aggregate(&all_events, &masters);
        match report.window {
            AnalysisWindow::Trailing { start, end } => {
                events.push(PipelineEvent::AnalysisWindowSelected {
                    start: start.to_string(),
                    end: end.to_string(),
                    events_in_window: report.events_in_window,
                });
            }
            AnalysisWindow::Degraded => {
                events.push(PipelineEvent::AnalysisWindowDegraded {
                    events: report.events_in_window,
                });
            }
        }

        let summary = report.summary();
        let path = ctx.report_path();
        write_csv(&path, &report.records)?;
        log::info!(
            "week {} to {}: {} qualifying subscribers, revenue R{:.2}; report saved to {}",
            summary.week_start,
            summary.week_end,
            summary.qualifying_subscribers,
            summary.total_qualified_revenue,
            path.display()
        );

        events.push(PipelineEvent::WeeklyReportBuilt {
            subscribers_with_usage: report.subscribers_with_usage,
            qualifying_subscribers: summary.qualifying_subscribers,
            missing_from_master: summary.missing_from_master,
            total_qualified_revenue: summary.total_qualified_revenue,
        });
        ctx.usage_events = Some(all_events);
        ctx.report = Some(report);
        Ok(events)
    }
}
