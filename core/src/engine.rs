//! The pipeline engine: runs the stages of one batch run.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Consolidation  (rosters → master subscribers)
//!   2. Weekly report  (usage batches → qualification report)
//!   3. Load           (everything above → store)
//!   4. Analysis       (canned SQL → BI exports)
//!
//! RULES:
//!   - Stages execute in registration order, once per run.
//!   - A stage reads only what earlier stages left in the context.
//!   - Every stage event is recorded in the event log.
//!   - The first failing stage aborts the run.

use crate::{
    analysis_stage::AnalysisStage,
    consolidation_stage::ConsolidationStage,
    error::{EtlError, EtlResult},
    event::{EventLogEntry, PipelineEvent},
    load_stage::LoadStage,
    report_stage::WeeklyReportStage,
    stage::{PipelineContext, PipelineStage},
    store::PipelineStore,
    types::RunId,
};

pub struct PipelineEngine {
    pub run_id:  RunId,
    pub context: PipelineContext,
    pub store:   PipelineStore,
    stages:      Vec<Box<dyn PipelineStage>>,
}

impl PipelineEngine {
    pub fn new(run_id: RunId, context: PipelineContext, store: PipelineStore) -> Self {
        Self {
            run_id,
            context,
            store,
            stages: Vec::new(),
        }
    }

    /// Build a fully wired engine with every stage registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(run_id: RunId, context: PipelineContext, store: PipelineStore) -> Self {
        let mut engine = PipelineEngine::new(run_id, context, store);

        // EXECUTION ORDER: fixed, documented, never reordered.
        engine.register(Box::new(ConsolidationStage));
        engine.register(Box::new(WeeklyReportStage));
        engine.register(Box::new(LoadStage));
        engine.register(Box::new(AnalysisStage));
        engine
    }

    /// Register a stage. Call in the documented execution order.
    pub fn register(&mut self, stage: Box<dyn PipelineStage>) {
        self.stages.push(stage);
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Keep only the named stages, preserving execution order.
    pub fn retain_stages(&mut self, names: &[&str]) {
        self.stages.retain(|s| names.contains(&s.name()));
    }

    /// Like `retain_stages`, but every name must be a registered stage.
    /// Nothing is dropped when a name is unknown.
    pub fn select_stages(&mut self, names: &[&str]) -> EtlResult<()> {
        let known = self.stage_names();
        if let Some(unknown) = names.iter().copied().find(|n| !known.iter().any(|k| k == n)) {
            return Err(EtlError::UnknownStage {
                name: unknown.to_string(),
                known: known.join(", "),
            });
        }
        self.retain_stages(names);
        Ok(())
    }

    /// Run every registered stage once. Returns all events in log order.
    pub fn run(&mut self) -> EtlResult<Vec<PipelineEvent>> {
        let mut run_events = Vec::new();

        let init = PipelineEvent::RunInitialized {
            run_id: self.run_id.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        self.store.append_event(&log_entry(&self.run_id, "engine", &init)?)?;
        run_events.push(init);

        for stage in &mut self.stages {
            let name = stage.name();
            log::info!("running stage: {name}");

            let mut stage_events = vec![PipelineEvent::StageStarted { stage: name.to_string() }];
            stage_events.extend(stage.run(&mut self.context, &mut self.store)?);
            stage_events.push(PipelineEvent::StageCompleted { stage: name.to_string() });

            for event in &stage_events {
                self.store.append_event(&log_entry(&self.run_id, name, event)?)?;
            }
            log::debug!("stage {name} completed with {} events", stage_events.len());

            run_events.extend(stage_events);
        }

        Ok(run_events)
    }

    /// Query this run's event log from the store.
    pub fn store_events(&self) -> EtlResult<Vec<EventLogEntry>> {
        self.store.events_for_run(&self.run_id)
    }
}

fn log_entry(run_id: &str, stage: &str, event: &PipelineEvent) -> EtlResult<EventLogEntry> {
    Ok(EventLogEntry {
        id:         None,
        run_id:     run_id.to_string(),
        stage:      stage.to_string(),
        event_type: event.type_name().to_string(),
        payload:    serde_json::to_string(event)?,
    })
}

/// Fresh identifier for a batch run.
pub fn new_run_id() -> RunId {
    format!("run-{}", uuid::Uuid::new_v4())
}
