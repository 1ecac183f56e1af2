//! Consolidation stage: reconciles the three rosters, picks masters and
//! writes both consolidated tables.
//!
//! Outputs:
//!   - combined_subscribers_all.csv    every record with its master flag
//!   - combined_subscribers_master.csv master records only

use crate::{
    dedup::deduplicate,
    error::EtlResult,
    event::PipelineEvent,
    reconcile::{SchemaReconciler, SourceBatch},
    stage::{PipelineContext, PipelineStage},
    store::PipelineStore,
    table::{read_csv, write_csv},
};

pub struct ConsolidationStage;

impl PipelineStage for ConsolidationStage {
    fn name(&self) -> &'static str { "consolidation" }

    fn run(&mut self, ctx: &mut PipelineContext, _store: &mut PipelineStore) -> EtlResult<Vec<PipelineEvent>> {
        let mut events = Vec::new();
        ctx.config.validate()?;

        let mut batches = Vec::with_capacity(ctx.config.sources.len());
        for src in &ctx.config.sources {
            let path = ctx.raw_dir.join(&src.file_name);
            log::info!("loading {} roster from {}", src.source, path.display());
            let table = read_csv(&path)?;
            log::debug!("{} columns: {:?}", src.source, table.columns);
            batches.push(SourceBatch { source: src.source, table });
        }

        let reconciled = SchemaReconciler::new(&ctx.config).reconcile(&batches)?;
        for (source, rows) in &reconciled.rows_per_source {
            events.push(PipelineEvent::SourceReconciled {
                source: source.to_string(),
                rows: *rows,
            });
        }
        for (field, degradation) in reconciled.degradations {
            events.extend(degradation.into_event(self.name(), field));
        }

        let deduped = deduplicate(reconciled.records);
        log::info!(
            "consolidated {} records into {} master subscribers",
            deduped.all_with_flag.len(),
            deduped.master_only.len()
        );

        let out = &ctx.config.output;
        write_csv(&ctx.processed_dir.join(&out.combined_all_file), &deduped.all_with_flag)?;
        write_csv(&ctx.processed_dir.join(&out.combined_master_file), &deduped.master_only)?;

        events.push(PipelineEvent::SubscribersConsolidated {
            total_records: deduped.all_with_flag.len(),
            master_records: deduped.master_only.len(),
            unmatchable_records: deduped.unmatchable,
        });
        ctx.consolidated = Some(deduped);
        Ok(events)
    }
}
