use std::fs;

use sqlshape::settings::{ReportFormat, Settings};

#[test]
fn defaults_without_a_file() {
    let settings = Settings::load(Some("does-not-exist/sqlshape")).expect("defaults");
    assert_eq!(settings, Settings::default());
    assert!(!settings.instrument);
    assert_eq!(settings.log_filter, "sqlshape=info");
    assert_eq!(settings.report, ReportFormat::Text);
}

#[test]
fn file_overrides_defaults() {
    let path = std::env::temp_dir().join(format!("sqlshape-settings-{}.toml", std::process::id()));
    fs::write(&path, "instrument = true\nreport = \"json\"\n").expect("writable temp dir");
    let loaded = Settings::load(path.to_str());
    fs::remove_file(&path).ok();
    let settings = loaded.expect("settings file");
    assert!(settings.instrument);
    assert_eq!(settings.report, ReportFormat::Json);
    // not in the file, so the default stays
    assert_eq!(settings.log_filter, "sqlshape=info");
}

#[test]
fn unknown_report_format_is_a_config_error() {
    let path = std::env::temp_dir().join(format!("sqlshape-bad-{}.toml", std::process::id()));
    fs::write(&path, "report = \"xml\"\n").expect("writable temp dir");
    let loaded = Settings::load(path.to_str());
    fs::remove_file(&path).ok();
    assert!(matches!(loaded, Err(sqlshape::SqlshapeError::Config(_))));
}
