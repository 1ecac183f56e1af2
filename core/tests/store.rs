//! Store tests against an in-memory database.

use chrono::NaiveDate;
use vmobile_core::{
    event::{EventLogEntry, PipelineEvent},
    store::{PipelineStore, SubscriberTable},
    subscriber::{SourceSystem, SubscriberRecord},
    table::Table,
};

fn store() -> PipelineStore {
    let store = PipelineStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_run("run-test", "0.1.0", "2024-06-10T00:00:00Z").unwrap();
    store
}

fn subscriber(phone: &str, source: SourceSystem, is_master: bool) -> SubscriberRecord {
    SubscriberRecord {
        phone_number:        Some(phone.to_string()),
        first_name:          Some("Lerato".into()),
        last_name:           Some("Mokoena".into()),
        date_of_birth:       NaiveDate::from_ymd_opt(1995, 7, 30),
        region:              None,
        source_system:       source,
        sim_activation_date: NaiveDate::from_ymd_opt(2024, 2, 20),
        source_priority:     2,
        is_master,
    }
}

#[test]
fn subscribers_are_replaced_not_appended() {
    let mut store = store();
    let rows = vec![
        subscriber("27825550003", SourceSystem::BlueMobile, true),
        subscriber("27825550003", SourceSystem::ArrowMobile, false),
    ];

    store.replace_subscribers(SubscriberTable::Combined, &rows).unwrap();
    store.replace_subscribers(SubscriberTable::Combined, &rows).unwrap();
    store.replace_subscribers(SubscriberTable::Master, &rows[..1]).unwrap();

    assert_eq!(store.subscriber_count(SubscriberTable::Combined).unwrap(), 2);
    assert_eq!(store.subscriber_count(SubscriberTable::Master).unwrap(), 1);
}

#[test]
fn master_lookup_round_trips_the_record() {
    let mut store = store();
    let master = subscriber("27825550003", SourceSystem::BlueMobile, true);
    store.replace_subscribers(SubscriberTable::Master, &[master.clone()]).unwrap();

    assert_eq!(store.master_for_phone("27825550003").unwrap(), Some(master));
    assert_eq!(store.master_for_phone("27825550099").unwrap(), None);
}

#[test]
fn lookup_tables_load_verbatim_and_query_back() {
    let mut store = store();
    let mut cities = Table::new("city_lookup", &["CITY_ID", "CITY_NAME"]);
    cities.push(&["1", "Cape Town"]).push(&["2", "Johannesburg"]).push(&["3", ""]);

    assert_eq!(store.load_lookup("city_lookup", &cities).unwrap(), 3);
    // Reloading drops the previous contents.
    store.load_lookup("city_lookup", &cities).unwrap();
    assert_eq!(store.table_row_count("city_lookup").unwrap(), 3);

    let result = store
        .query_to_table(
            "names",
            "SELECT CITY_ID AS id, CITY_NAME AS name, 1.5 AS factor FROM city_lookup ORDER BY CITY_ID",
        )
        .unwrap();
    assert_eq!(result.columns, vec!["id", "name", "factor"]);
    assert_eq!(result.len(), 3);
    assert_eq!(result.rows[1]["name"], "Johannesburg");
    assert_eq!(result.rows[1]["factor"], "1.5");
    assert!(!result.rows[2].contains_key("name"), "blank cell is stored as NULL");
}

#[test]
fn bad_query_is_an_error() {
    let store = store();
    assert!(store.query_to_table("broken", "SELECT * FROM no_such_table").is_err());
}

#[test]
fn event_log_keeps_insertion_order() {
    let store = store();
    for (i, event) in [
        PipelineEvent::StageStarted { stage: "load".into() },
        PipelineEvent::TableLoaded { table: "usage_records".into(), rows: 7 },
        PipelineEvent::StageCompleted { stage: "load".into() },
    ]
    .iter()
    .enumerate()
    {
        store
            .append_event(&EventLogEntry {
                id:         None,
                run_id:     "run-test".into(),
                stage:      "load".into(),
                event_type: event.type_name().into(),
                payload:    format!("{{\"n\":{i}}}"),
            })
            .unwrap();
    }

    let entries = store.events_for_run("run-test").unwrap();
    let types: Vec<_> = entries.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["stage_started", "table_loaded", "stage_completed"]);
    assert!(entries.iter().all(|e| e.id.is_some()));
    assert_eq!(store.event_count("run-test", "table_loaded").unwrap(), 1);
    assert!(store.events_for_run("run-other").unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Opening
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn file_database_opens_in_wal_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.db");
    let store = PipelineStore::open(path.to_str().unwrap()).unwrap();
    store.migrate().unwrap();

    assert_eq!(store.journal_mode().unwrap(), "wal");
}

#[test]
fn memory_database_opens_without_wal() {
    let store = PipelineStore::open(":memory:").unwrap();
    store.migrate().unwrap();
    store.insert_run("run-test", "0.1.0", "2024-06-10T00:00:00Z").unwrap();

    assert_eq!(store.journal_mode().unwrap(), "memory");
}
