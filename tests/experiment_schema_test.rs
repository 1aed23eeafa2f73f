//! Experiment data model tests
//!
//! Lifecycle, observation rendering and registry ordering through the public API.

use chrono::{Duration, TimeZone, Utc};
use trueno_chaos::experiment::{
    find_measurement, BaselineMetrics, BlastRadius, Experiment, ExperimentRegistry,
    ExperimentResult, Observation, Unit,
};

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

// =============================================================================
// Experiment lifecycle
// =============================================================================

#[test]
fn test_experiment_creation() {
    let experiment = Experiment::new("High CPU Load", "Expensive reads", BlastRadius::Database);

    assert_eq!(experiment.name(), "High CPU Load");
    assert_eq!(experiment.description(), "Expensive reads");
    assert_eq!(experiment.blast_radius(), &BlastRadius::Database);
    assert_eq!(experiment.result(), ExperimentResult::Pending);
    assert!(experiment.start_time().is_none());
    assert!(experiment.end_time().is_none());
    assert!(experiment.observations().is_empty());
}

#[test]
fn test_experiment_lifecycle() {
    let mut experiment = Experiment::new("e", "", BlastRadius::Transactions);
    experiment.start(at(0));
    experiment.observe(Observation::note("started"));
    assert!(experiment.finish(ExperimentResult::Completed, at(3)));

    assert!(experiment.is_completed());
    assert_eq!(experiment.duration(), Some(Duration::seconds(3)));
}

#[test]
fn test_experiment_finishes_once() {
    let mut experiment = Experiment::new("e", "", BlastRadius::Database);
    experiment.start(at(0));
    assert!(experiment.finish(ExperimentResult::Failed, at(1)));
    assert!(!experiment.finish(ExperimentResult::Completed, at(2)));

    assert_eq!(experiment.result(), ExperimentResult::Failed);
    assert_eq!(experiment.end_time(), Some(at(1)));
}

#[test]
fn test_experiment_rejects_pending_finish() {
    let mut experiment = Experiment::new("e", "", BlastRadius::Database);
    experiment.start(at(0));
    assert!(!experiment.finish(ExperimentResult::Pending, at(1)));
    assert!(experiment.end_time().is_none());
}

#[test]
fn test_experiment_end_never_before_start() {
    let mut experiment = Experiment::new("e", "", BlastRadius::Database);
    experiment.start(at(10));
    experiment.finish(ExperimentResult::Completed, at(5));
    assert!(experiment.end_time() >= experiment.start_time());
}

#[test]
fn test_experiment_builder() {
    let experiment = Experiment::builder("custom")
        .description("Custom scenario")
        .blast_radius(BlastRadius::Custom("cache".into()))
        .observation(Observation::count("evictions", 12))
        .build();

    assert_eq!(experiment.blast_radius().to_string(), "cache");
    assert_eq!(find_measurement(experiment.observations(), "evictions"), Some(12.0));
}

#[test]
fn test_experiment_serialization() {
    let mut experiment = Experiment::new("Slow Query Injection", "d", BlastRadius::QueryPerformance);
    experiment.start(at(0));
    experiment.observe(Observation::measurement("degradation", 9900.0, Unit::Percent));
    experiment.finish(ExperimentResult::Completed, at(2));

    let json = serde_json::to_string(&experiment).expect("serialization failed");
    assert!(json.contains("\"query_performance\""));
    assert!(json.contains("\"completed\""));

    let back: Experiment = serde_json::from_str(&json).expect("deserialization failed");
    assert_eq!(back, experiment);
}

fn finished_json(start: i64, end: i64) -> serde_json::Value {
    let mut experiment = Experiment::new("CPU", "d", BlastRadius::Database);
    experiment.start(at(start));
    experiment.finish(ExperimentResult::Completed, at(end));
    serde_json::to_value(&experiment).unwrap()
}

#[test]
fn test_deserialize_rejects_end_before_start() {
    let mut value = finished_json(0, 5);
    value["end_time"] = serde_json::to_value(at(-5)).unwrap();

    let err = serde_json::from_value::<Experiment>(value).unwrap_err();
    assert!(err.to_string().contains("before it starts"), "{err}");
}

#[test]
fn test_deserialize_rejects_inconsistent_lifecycle() {
    let mut finished_without_end = finished_json(0, 5);
    finished_without_end["end_time"] = serde_json::Value::Null;
    assert!(serde_json::from_value::<Experiment>(finished_without_end).is_err());

    let mut pending_with_end = finished_json(0, 5);
    pending_with_end["result"] = serde_json::json!("pending");
    assert!(serde_json::from_value::<Experiment>(pending_with_end).is_err());

    let mut started_pending = finished_json(0, 5);
    started_pending["result"] = serde_json::json!("pending");
    started_pending["end_time"] = serde_json::Value::Null;
    let back: Experiment = serde_json::from_value(started_pending).unwrap();
    assert_eq!(back.result(), ExperimentResult::Pending);
    assert_eq!(back.start_time(), Some(at(0)));
}

// =============================================================================
// Observations
// =============================================================================

#[test]
fn test_observation_display() {
    assert_eq!(Observation::note("plain").to_string(), "plain");
    assert_eq!(Observation::millis("latency", 5.0).to_string(), "latency: 5.00ms");
    assert_eq!(Observation::count("failures", 3).to_string(), "failures: 3");
    assert_eq!(
        Observation::measurement("degradation", 9900.0, Unit::Percent).to_string(),
        "degradation: 9900.0%"
    );
}

#[test]
fn test_find_measurement_skips_notes() {
    let observations = [
        Observation::note("latency"),
        Observation::millis("latency", 4.5),
    ];
    assert_eq!(find_measurement(&observations, "latency"), Some(4.5));
    assert_eq!(find_measurement(&observations, "missing"), None);
}

// =============================================================================
// Baseline & registry
// =============================================================================

#[test]
fn test_baseline_clamps_invalid_latency() {
    assert!(BaselineMetrics::new(f64::NAN, 1, at(0)).query_latency_ms().abs() < f64::EPSILON);
    assert!(BaselineMetrics::new(-3.0, 1, at(0)).query_latency_ms().abs() < f64::EPSILON);
}

#[test]
fn test_registry_preserves_execution_order() {
    let mut registry = ExperimentRegistry::new();
    for (name, result) in [
        ("first", ExperimentResult::Completed),
        ("second", ExperimentResult::Failed),
        ("third", ExperimentResult::Completed),
    ] {
        let mut experiment = Experiment::new(name, "", BlastRadius::Database);
        experiment.start(at(0));
        experiment.finish(result, at(1));
        registry.record(experiment);
    }

    let names: Vec<&str> = registry.experiments().iter().map(Experiment::name).collect();
    assert_eq!(names, ["first", "second", "third"]);
    assert_eq!(registry.count_with(ExperimentResult::Completed), 2);
    assert_eq!(registry.get("second").unwrap().result(), ExperimentResult::Failed);
    assert_eq!(registry.into_experiments().len(), 3);
}
