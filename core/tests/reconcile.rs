//! Schema reconciliation tests.
//!
//! Each roster is mapped onto the canonical subscriber schema using the
//! configured column names. Mandatory mappings and columns are enforced;
//! optional ones degrade to null.

use chrono::NaiveDate;
use vmobile_core::{
    config::PipelineConfig,
    error::EtlError,
    reconcile::{SchemaReconciler, SourceBatch},
    subscriber::SourceSystem,
    table::Table,
};

fn vmobile() -> SourceBatch {
    let mut table = Table::new(
        "VMobile_subscribers",
        &["Cell Number", "First Name", "Last Name", "SIM Activation Date", "Birthday", "Location"],
    );
    table
        .push(&["+27 82-555 0001", "Thandi", "Nkosi", "01/01/2023", "14/03/1990", "Gauteng"])
        .push(&["27825550002", "Pieter", "Botha", "15/05/2022", "02/11/1985", "  "]);
    SourceBatch { source: SourceSystem::VMobile, table }
}

fn bluemobile() -> SourceBatch {
    let mut table = Table::new(
        "VMobile_subscribers_bluemobile",
        &["Cell", "Name", "Surname", "Activate", "Date", "City"],
    );
    table.push(&["27825550001", "Thandi", "Nkosi-Dlamini", "01/06/2024", "14/03/1990", "Johannesburg"]);
    SourceBatch { source: SourceSystem::BlueMobile, table }
}

fn arrowmobile() -> SourceBatch {
    let mut table = Table::new(
        "VMobile_subscribers_arrowmobile",
        &["CellNo", "FirstName", "LastName", "SIMDate", "Area"],
    );
    table
        .push(&["27825550001", "T", "Nkosi", "01/01/2020", "Soweto"])
        .push(&["", "Anon", "Caller", "sometime", "Unknown"]);
    SourceBatch { source: SourceSystem::ArrowMobile, table }
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

// ─────────────────────────────────────────────────────────────────────────────
// Happy path
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn reconcile_unions_all_sources_in_batch_order() {
    let cfg = PipelineConfig::default();
    let out = SchemaReconciler::new(&cfg)
        .reconcile(&[vmobile(), bluemobile(), arrowmobile()])
        .unwrap();

    assert_eq!(out.records.len(), 5);
    assert_eq!(
        out.rows_per_source,
        vec![
            (SourceSystem::VMobile, 2),
            (SourceSystem::BlueMobile, 1),
            (SourceSystem::ArrowMobile, 2),
        ]
    );

    let first = &out.records[0];
    assert_eq!(first.phone_number.as_deref(), Some("+27 82-555 0001"));
    assert_eq!(first.first_name.as_deref(), Some("Thandi"));
    assert_eq!(first.sim_activation_date, date(2023, 1, 1));
    assert_eq!(first.date_of_birth, date(1990, 3, 14));
    assert_eq!(first.source_system, SourceSystem::VMobile);
    assert_eq!(first.source_priority, 1);
    assert!(!first.is_master);

    assert_eq!(out.records[2].source_priority, 2);
    assert_eq!(out.records[3].source_priority, 3);
}

#[test]
fn blank_cells_become_null() {
    let cfg = PipelineConfig::default();
    let out = SchemaReconciler::new(&cfg).reconcile(&[vmobile(), arrowmobile()]).unwrap();

    assert_eq!(out.records[1].region, None, "whitespace-only region is null");
    assert_eq!(out.records[3].phone_number, None, "empty phone is null");
}

#[test]
fn source_without_birth_date_column_yields_null_dob() {
    let cfg = PipelineConfig::default();
    let out = SchemaReconciler::new(&cfg).reconcile(&[arrowmobile()]).unwrap();

    assert!(out.records.iter().all(|r| r.date_of_birth.is_none()));
    assert_eq!(out.records[0].region.as_deref(), Some("Soweto"));
}

#[test]
fn optional_column_absent_from_file_is_null_not_error() {
    let cfg = PipelineConfig::default();
    let mut table = Table::new("VMobile_subscribers", &["Cell Number", "First Name", "Last Name"]);
    table.push(&["0825550001", "Thandi", "Nkosi"]);

    let out = SchemaReconciler::new(&cfg)
        .reconcile(&[SourceBatch { source: SourceSystem::VMobile, table }])
        .unwrap();

    let r = &out.records[0];
    assert_eq!(r.region, None);
    assert_eq!(r.sim_activation_date, None);
    assert_eq!(r.date_of_birth, None);
    assert!(out.degradations.is_empty());
}

#[test]
fn unparseable_dates_are_counted_not_fatal() {
    let cfg = PipelineConfig::default();
    let out = SchemaReconciler::new(&cfg).reconcile(&[arrowmobile()]).unwrap();

    assert_eq!(out.records[1].sim_activation_date, None);
    let d = &out.degradations["sim_activation_date"];
    assert_eq!(d.count, 1);
    assert_eq!(d.sample.as_deref(), Some("sometime"));
    assert!(!out.degradations.contains_key("date_of_birth"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn missing_mandatory_mapping_is_an_error() {
    let mut cfg = PipelineConfig::default();
    cfg.sources[0].columns.last_name = None;

    let err = SchemaReconciler::new(&cfg).reconcile(&[vmobile()]).unwrap_err();
    assert!(matches!(
        err,
        EtlError::MissingMapping { system: SourceSystem::VMobile, field: "last_name" }
    ));
    assert!(cfg.validate().is_err());
}

#[test]
fn missing_priority_is_an_error() {
    let mut cfg = PipelineConfig::default();
    cfg.source_priority.remove(&SourceSystem::BlueMobile);

    let err = SchemaReconciler::new(&cfg).reconcile(&[bluemobile()]).unwrap_err();
    assert!(matches!(err, EtlError::MissingPriority { system: SourceSystem::BlueMobile }));
}

#[test]
fn source_without_mapping_is_an_error() {
    let mut cfg = PipelineConfig::default();
    cfg.sources.retain(|s| s.source != SourceSystem::ArrowMobile);

    let err = SchemaReconciler::new(&cfg).reconcile(&[arrowmobile()]).unwrap_err();
    assert!(matches!(err, EtlError::MissingSourceMapping { system: SourceSystem::ArrowMobile }));
}

#[test]
fn mandatory_column_absent_from_file_is_an_error() {
    let cfg = PipelineConfig::default();
    let mut table = Table::new("VMobile_subscribers", &["Cell Number", "First Name"]);
    table.push(&["0825550001", "Thandi"]);

    let err = SchemaReconciler::new(&cfg)
        .reconcile(&[SourceBatch { source: SourceSystem::VMobile, table }])
        .unwrap_err();
    match err {
        EtlError::MissingColumn { table, column } => {
            assert_eq!(table, "VMobile_subscribers");
            assert_eq!(column, "Last Name");
        }
        other => panic!("unexpected error: {other}"),
    }
}
