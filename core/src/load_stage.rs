//! Load stage: writes consolidated rosters, usage events, the weekly
//! report and the raw lookup files into the store.

use crate::{
    error::{EtlError, EtlResult},
    event::PipelineEvent,
    stage::{PipelineContext, PipelineStage},
    store::{PipelineStore, SubscriberTable},
    table::read_csv,
};

pub struct LoadStage;

impl PipelineStage for LoadStage {
    fn name(&self) -> &'static str { "load" }

    fn run(&mut self, ctx: &mut PipelineContext, store: &mut PipelineStore) -> EtlResult<Vec<PipelineEvent>> {
        let mut events = Vec::new();
        let loaded = |table: &str, rows: usize| {
            log::info!("loaded {table}: {rows} records");
            PipelineEvent::TableLoaded { table: table.to_string(), rows }
        };

        let deduped = ctx
            .consolidated
            .as_ref()
            .ok_or(EtlError::StageOrder { name: self.name() })?;
        for (table, records) in [
            (SubscriberTable::Combined, &deduped.all_with_flag),
            (SubscriberTable::Master, &deduped.master_only),
        ] {
            let rows = store.replace_subscribers(table, records)?;
            events.push(loaded(table.name(), rows));
        }

        let usage = ctx
            .usage_events
            .as_ref()
            .ok_or(EtlError::StageOrder { name: self.name() })?;
        events.push(loaded("usage_records", store.replace_usage_records(usage)?));

        if let Some(report) = &ctx.report {
            events.push(loaded("weekly_qualification", store.replace_report(report)?));
        }

        for lookup in &ctx.config.lookups {
            let path = ctx.raw_dir.join(&lookup.file_name);
            if !path.exists() {
                log::error!("lookup file not found: {}", path.display());
                continue;
            }
            let table = read_csv(&path)?;
            log::debug!("columns in {}: {:?}", lookup.table, table.columns);
            events.push(loaded(&lookup.table, store.load_lookup(&lookup.table, &table)?));
        }

        Ok(events)
    }
}
