use vmobile_core::{
    config::{PipelineConfig, MAX_WINDOW_DAYS},
    error::EtlError,
    subscriber::SourceSystem,
};

const SAMPLE_DATA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

#[test]
fn bundled_config_matches_defaults() {
    let loaded = PipelineConfig::load(SAMPLE_DATA).expect("bundled config");
    let default = PipelineConfig::default();

    assert_eq!(loaded.sources.len(), 3);
    for source in SourceSystem::ALL {
        assert_eq!(loaded.priority_of(source).unwrap(), default.priority_of(source).unwrap());
        assert_eq!(
            loaded.source(source).unwrap().file_name,
            default.source(source).unwrap().file_name
        );
    }
    assert_eq!(loaded.usage.sms_event_type_ids, default.usage.sms_event_type_ids);
    assert_eq!(loaded.usage.voice_event_type_ids, default.usage.voice_event_type_ids);
    assert_eq!(loaded.usage.timestamp_formats, default.usage.timestamp_formats);
    assert_eq!(loaded.date_formats, default.date_formats);
    assert_eq!(loaded.report.qualification_threshold, 30.0);
    assert_eq!(loaded.report.window_days, 7);
    assert_eq!(loaded.usage.columns.msisdn, "msisdn");
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineConfig::load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Cannot read"));
}

#[test]
fn malformed_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(dir.path().join("config/pipeline.json"), "{ \"sources\": 3 }").unwrap();

    let err = PipelineConfig::load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Cannot parse"));
}

#[test]
fn config_without_mandatory_mapping_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = PipelineConfig::default();
    cfg.sources[1].columns.phone = Some("   ".into());
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(
        dir.path().join("config/pipeline.json"),
        serde_json::to_string(&cfg).unwrap(),
    )
    .unwrap();

    let err = PipelineConfig::load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("BlueMobile"), "{err}");
}

#[test]
fn report_file_name_carries_the_date() {
    let cfg = PipelineConfig::default();
    assert_eq!(cfg.report_file_name("20240610"), "weekly_qualification_report_20240610.csv");
}

// ─────────────────────────────────────────────────────────────────────────────
// Numeric settings
// ─────────────────────────────────────────────────────────────────────────────

fn invalid_field(cfg: &PipelineConfig) -> &'static str {
    match cfg.validate() {
        Err(EtlError::InvalidSetting { field, .. }) => field,
        other => panic!("expected an invalid setting, got {other:?}"),
    }
}

#[test]
fn window_days_must_fit_the_accepted_range() {
    let mut cfg = PipelineConfig::default();
    for days in [0, -3, MAX_WINDOW_DAYS + 1, i64::MAX] {
        cfg.report.window_days = days;
        assert_eq!(invalid_field(&cfg), "report.window_days", "{days}");
    }
    for days in [1, 7, MAX_WINDOW_DAYS] {
        cfg.report.window_days = days;
        cfg.validate().expect("window length in range");
    }
}

#[test]
fn qualification_threshold_must_be_finite_and_non_negative() {
    let mut cfg = PipelineConfig::default();
    for threshold in [f64::NAN, f64::INFINITY, -1.0] {
        cfg.report.qualification_threshold = threshold;
        assert_eq!(invalid_field(&cfg), "report.qualification_threshold", "{threshold}");
    }
    cfg.report.qualification_threshold = 0.0;
    cfg.validate().expect("zero threshold qualifies everyone");
}

#[test]
fn format_success_ratio_must_be_a_share() {
    let mut cfg = PipelineConfig::default();
    for ratio in [0.0, -0.5, 1.5, f64::NAN] {
        cfg.usage.format_success_ratio = ratio;
        assert_eq!(invalid_field(&cfg), "usage.format_success_ratio", "{ratio}");
    }
    cfg.usage.format_success_ratio = 1.0;
    cfg.validate().expect("a format may be required to parse every row");
}

#[test]
fn zero_day_window_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = PipelineConfig::default();
    cfg.report.window_days = 0;
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(
        dir.path().join("config/pipeline.json"),
        serde_json::to_string(&cfg).unwrap(),
    )
    .unwrap();

    let err = PipelineConfig::load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("report.window_days"), "{err}");
}
