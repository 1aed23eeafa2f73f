//! Tests for error types

use std::time::Duration;
use trueno_chaos::Error;

#[test]
fn test_connection_error() {
    let error = Error::Connection("connection refused".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Connection failed"));
    assert!(error_str.contains("connection refused"));
    assert!(error.is_suite_fatal());
}

#[test]
fn test_query_error_is_not_fatal() {
    let error = Error::Query("relation does not exist".to_string());
    assert!(format!("{error}").contains("Query failed"));
    assert!(!error.is_suite_fatal());
    assert!(!error.is_injected());
}

#[test]
fn test_timeout_error() {
    let error = Error::timeout("execute", Duration::from_millis(2_500));
    assert_eq!(format!("{error}"), "execute timed out after 2500ms");
    assert!(!error.is_suite_fatal());
}

#[test]
fn test_injected_failure_error() {
    let error = Error::InjectedFailure { trial: 3 };
    assert!(format!("{error}").contains("trial 3"));
    assert!(error.is_injected());
    assert!(!error.is_suite_fatal());
}

#[test]
fn test_missing_baseline_error_has_guidance() {
    let error_str = format!("{}", Error::MissingBaseline);
    assert!(error_str.contains("Baseline metrics not captured"));
    assert!(error_str.contains("Capture a baseline"));
}

#[test]
fn test_setup_error() {
    let error = Error::Setup("fixture provisioning failed".to_string());
    assert!(format!("{error}").contains("Setup failed"));
    assert!(error.is_suite_fatal());
}

#[test]
fn test_parse_error() {
    let error = Error::ParseError("invalid SQL".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("SQL parse error"));
    assert!(error_str.contains("invalid SQL"));
}

#[test]
fn test_invalid_config_error() {
    let error = Error::InvalidConfig("trials must be greater than zero".to_string());
    assert!(format!("{error}").contains("Invalid configuration"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "chaos.toml");
    let error: Error = io_error.into();
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_toml_error_conversion() {
    let toml_error = toml::from_str::<toml::Value>("= broken").unwrap_err();
    let error: Error = toml_error.into();
    assert!(format!("{error}").contains("TOML error"));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom".to_string());
    assert_eq!(format!("{error}"), "custom");
}

#[test]
fn test_error_debug() {
    let error = Error::Query("debug".to_string());
    assert!(format!("{error:?}").contains("Query"));
}
