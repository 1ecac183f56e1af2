//! Analysis stage: runs the canned SQL queries against the store and
//! exports each result for the BI dashboard.
//!
//! A missing or failing query is reported and skipped; the remaining
//! queries still run.

use crate::{
    error::EtlResult,
    event::PipelineEvent,
    stage::{PipelineContext, PipelineStage},
    store::PipelineStore,
    table::write_table,
};

pub struct AnalysisStage;

impl PipelineStage for AnalysisStage {
    fn name(&self) -> &'static str { "analysis" }

    fn run(&mut self, ctx: &mut PipelineContext, store: &mut PipelineStore) -> EtlResult<Vec<PipelineEvent>> {
        let mut events = Vec::new();

        for query in &ctx.config.analysis_queries {
            let sql_path = ctx.sql_dir.join(&query.sql_file);
            let sql = match std::fs::read_to_string(&sql_path) {
                Ok(sql) => sql,
                Err(e) => {
                    log::warn!("{} not found in {}: {e}", query.sql_file, ctx.sql_dir.display());
                    events.push(PipelineEvent::AnalysisSkipped {
                        query: query.sql_file.clone(),
                        reason: format!("cannot read {}: {e}", sql_path.display()),
                    });
                    continue;
                }
            };

            log::info!("running {}", query.sql_file);
            let result = match store.query_to_table(&query.sql_file, &sql) {
                Ok(t) => t,
                Err(e) => {
                    log::error!("error running {}: {e}", query.sql_file);
                    events.push(PipelineEvent::AnalysisSkipped {
                        query: query.sql_file.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let output = ctx.processed_dir.join(&query.output_file);
            write_table(&output, &result)?;
            log::info!("saved {} records to {}", result.len(), query.output_file);
            events.push(PipelineEvent::AnalysisExported {
                query: query.sql_file.clone(),
                output: query.output_file.clone(),
                rows: result.len(),
            });
        }

        Ok(events)
    }
}
