//! Plan and configuration file tests.
//!
//! These tests load the bundled demo plan and configuration files from disk
//! and check the resulting orchestrator state.

use std::path::PathBuf;

use conductor::config::Config;
use conductor::core::{ProjectPlan, TaskStatus, WaveStatus};
use conductor::{Error, Orchestrator};
use tempfile::TempDir;

fn demo_plan_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/plan.toml")
}

/// Test: Demo plan
/// Given the bundled demo plan
/// When an orchestrator is built from it
/// Then initial statuses, readiness and the critical path reflect the file
#[test]
fn test_demo_plan_loads() {
    let plan = ProjectPlan::load(&demo_plan_path()).unwrap();
    assert_eq!(plan.name, "Client Portal");
    assert_eq!(plan.task_count(), 6);

    let orchestrator = Orchestrator::new(plan).unwrap();
    assert_eq!(orchestrator.task_status("schema").unwrap().progress, 100);
    assert_eq!(
        orchestrator.task_status("auth").unwrap().status,
        TaskStatus::InProgress
    );
    assert_eq!(orchestrator.wave_status(1).unwrap().status, WaveStatus::InProgress);

    let ready: Vec<String> = orchestrator
        .ready_tasks()
        .iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(ready, vec!["ui", "docs"]);

    let path: Vec<String> = orchestrator
        .critical_path()
        .iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(path, vec!["schema", "auth", "docs", "api", "ui", "e2e"]);
    assert_eq!(orchestrator.critical_path_hours(), 36.0);
}

/// Test: Cyclic plans are rejected at load time
#[test]
fn test_cyclic_plan_rejected() {
    let toml = r#"
        [[waves]]
        number = 1
        name = "Loop"

        [[waves.tasks]]
        id = "a"
        agent_type = "x"
        estimated_hours = 1
        dependencies = ["b"]

        [[waves.tasks]]
        id = "b"
        agent_type = "x"
        estimated_hours = 1
        dependencies = ["a"]
    "#;
    let plan = ProjectPlan::from_toml_str(toml).unwrap();
    assert!(matches!(
        Orchestrator::new(plan),
        Err(Error::DependencyCycle(_))
    ));
}

/// Test: Config overrides
/// Given a config file that sets only some monitor fields
/// Then those fields are overridden and the rest keep their defaults
#[test]
fn test_partial_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conductor.toml");
    std::fs::write(
        &path,
        "[monitor]\ninterval_secs = 2\nmax_parallel_capacity = 6\n\n[orchestrator]\nhours_per_day = 6.0\n",
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.monitor.interval_secs, 2);
    assert_eq!(config.monitor.max_parallel_capacity, 6);
    assert_eq!(config.monitor.resource_alert_pct, 90.0);
    assert_eq!(config.orchestrator.hours_per_day, 6.0);
}

/// Test: Missing config falls back to defaults
#[test]
fn test_missing_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}
