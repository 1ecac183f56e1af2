//! vmobile-runner: headless batch runner for the VMobile pipeline.
//!
//! Usage:
//!   vmobile-runner --data-dir ./data --db vmobile.db
//!   vmobile-runner --data-dir ./data --stages consolidation,weekly_report
//!   vmobile-runner --data-dir ./data --json

use anyhow::Result;
use vmobile_core::{
    config::PipelineConfig,
    engine::{new_run_id, PipelineEngine},
    stage::PipelineContext,
    store::{PipelineStore, SubscriberTable},
};
use std::env;

#[derive(serde::Serialize)]
struct RunSummary {
    run_id: String,
    stages: Vec<&'static str>,
    total_records: usize,
    master_records: usize,
    unmatchable_records: usize,
    usage_events: usize,
    report: Option<vmobile_core::weekly_report::ReportSummary>,
    degraded_fields: i64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");
    let sql_dir = arg_value(&args, "--sql-dir").unwrap_or("./sql/analysis");
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let stages = arg_value(&args, "--stages");
    let json = args.iter().any(|a| a == "--json");

    let config_path = format!("{data_dir}/config/pipeline.json");
    let config = if std::path::Path::new(&config_path).exists() {
        PipelineConfig::load(data_dir)?
    } else {
        log::warn!("{config_path} not found, using built-in VMobile configuration");
        PipelineConfig::default()
    };

    let report_date = chrono::Local::now().format("%Y%m%d").to_string();
    let run_id = new_run_id();

    if !json {
        println!("VMobile pipeline: vmobile-runner");
        println!("  run_id:    {run_id}");
        println!("  data_dir:  {data_dir}");
        println!("  sql_dir:   {sql_dir}");
        println!("  db:        {db}");
        println!();
    }

    let store = PipelineStore::open(db)?;
    store.migrate()?;
    store.insert_run(&run_id, env!("CARGO_PKG_VERSION"), &chrono::Local::now().to_rfc3339())?;

    let context = PipelineContext::from_data_dir(config, data_dir, sql_dir, report_date);
    let mut engine = PipelineEngine::build(run_id.clone(), context, store);
    if let Some(list) = stages {
        let names: Vec<&str> = list.split(',').map(str::trim).filter(|n| !n.is_empty()).collect();
        engine.select_stages(&names)?;
    }

    engine.run()?;

    let summary = build_summary(&engine)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&engine, &summary)?;
    }
    Ok(())
}

fn build_summary(engine: &PipelineEngine) -> Result<RunSummary> {
    let ctx = &engine.context;
    let (total, masters, unmatchable) = ctx
        .consolidated
        .as_ref()
        .map(|d| (d.all_with_flag.len(), d.master_only.len(), d.unmatchable))
        .unwrap_or_default();
    Ok(RunSummary {
        run_id: engine.run_id.clone(),
        stages: engine.stage_names(),
        total_records: total,
        master_records: masters,
        unmatchable_records: unmatchable,
        usage_events: ctx.usage_events.as_ref().map(Vec::len).unwrap_or(0),
        report: ctx.report.as_ref().map(|r| r.summary()),
        degraded_fields: engine.store.event_count(&engine.run_id, "parse_degraded")?,
    })
}

fn print_summary(engine: &PipelineEngine, summary: &RunSummary) -> Result<()> {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:            {}", summary.run_id);
    println!("  stages:            {}", summary.stages.join(", "));
    println!("  subscriber rows:   {}", summary.total_records);
    println!("  master records:    {}", summary.master_records);
    println!("  without phone:     {}", summary.unmatchable_records);
    println!("  usage events:      {}", summary.usage_events);
    println!("  degraded fields:   {}", summary.degraded_fields);

    if summary.stages.contains(&"load") {
        println!(
            "  stored masters:    {}",
            engine.store.subscriber_count(SubscriberTable::Master)?
        );
    }

    println!();
    println!("=== WEEKLY QUALIFICATION REPORT ===");
    match &summary.report {
        None => println!("  (weekly report stage did not run)"),
        Some(r) => {
            println!("  week:                    {} to {}", r.week_start, r.week_end);
            println!("  qualifying subscribers:  {}", r.qualifying_subscribers);
            println!("  total qualified revenue: R{:.2}", r.total_qualified_revenue);
            println!("  with complete details:   {}", r.subscribers_with_complete_details);
            println!("  missing from master:     {}", r.missing_from_master);
            println!("  report file:             {}", engine.context.report_path().display());
        }
    }
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
