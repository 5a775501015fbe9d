//! Orchestrator integration tests.
//!
//! These tests verify readiness, unblocking, wave status derivation and
//! project metrics through the public orchestrator API.

use chrono::{Duration, Utc};

use conductor::core::{
    NewRisk, ProjectPlan, RiskStatus, RiskType, RiskUpdate, Severity, TaskDefinition,
    TaskStatus, WaveDefinition, WaveStatus,
};
use conductor::{Error, Orchestrator};

use crate::fixtures::{portal_plan, three_task_plan, two_task_plan};

fn ready_ids(orchestrator: &Orchestrator) -> Vec<String> {
    orchestrator
        .ready_tasks()
        .iter()
        .map(|t| t.id.to_string())
        .collect()
}

/// Test: Dependency gating
/// Given A (10h) and B (5h, depends on A)
/// When A completes
/// Then B becomes the only ready task and its blockers are cleared
#[test]
fn test_completion_unblocks_dependent() {
    let mut orchestrator = Orchestrator::new(two_task_plan()).unwrap();
    assert_eq!(ready_ids(&orchestrator), vec!["A"]);
    assert!(orchestrator.task_status("B").unwrap().blocked_by.contains("A"));

    assert!(orchestrator.update_task_status("A", TaskStatus::Completed, None));

    assert_eq!(ready_ids(&orchestrator), vec!["B"]);
    assert!(orchestrator.task_status("B").unwrap().blocked_by.is_empty());
}

/// Test: Progress tracks completion
/// Given any sequence of status updates
/// Then progress is 100 exactly when the task is completed
#[test]
fn test_progress_is_100_iff_completed() {
    let mut orchestrator = Orchestrator::new(portal_plan()).unwrap();
    let now = Utc::now();
    let updates = [
        ("schema", TaskStatus::InProgress, Some(100)),
        ("schema", TaskStatus::Completed, Some(10)),
        ("api", TaskStatus::InProgress, Some(60)),
        ("api", TaskStatus::Blocked, None),
        ("schema", TaskStatus::InProgress, None),
        ("schema", TaskStatus::Completed, None),
    ];
    for (id, status, progress) in updates {
        orchestrator.update_task_status_at(id, status, progress, now);
        for task in orchestrator.tasks() {
            assert_eq!(
                task.progress == 100,
                task.status == TaskStatus::Completed,
                "task {} has status {} and progress {}",
                task.id,
                task.status,
                task.progress
            );
        }
    }
}

/// Test: Completion timestamp is stable
/// Given a completed task
/// When it is marked completed again later
/// Then completed_at keeps its first value
#[test]
fn test_completed_at_set_once() {
    let mut orchestrator = Orchestrator::new(two_task_plan()).unwrap();
    let first = Utc::now();
    orchestrator.update_task_status_at("A", TaskStatus::Completed, None, first);
    orchestrator.update_task_status_at("A", TaskStatus::Completed, None, first + Duration::hours(2));
    assert_eq!(orchestrator.task_status("A").unwrap().completed_at, Some(first));
}

/// Test: Ready tasks only have completed, known dependencies
#[test]
fn test_ready_tasks_have_completed_dependencies() {
    let mut orchestrator = Orchestrator::new(portal_plan()).unwrap();
    let now = Utc::now();
    for step in ["schema", "ui", "api"] {
        for task in orchestrator.ready_tasks() {
            for dep in &task.dependencies {
                let dep = orchestrator.task_status(dep.as_str()).expect("dependency exists");
                assert_eq!(dep.status, TaskStatus::Completed);
            }
        }
        orchestrator.update_task_status_at(step, TaskStatus::Completed, None, now);
    }
    assert_eq!(ready_ids(&orchestrator), vec!["docs", "e2e"]);
}

/// Test: Plans with dangling dependencies are rejected
#[test]
fn test_unknown_dependency_rejected() {
    let plan = ProjectPlan::new("bad").wave(
        WaveDefinition::new(1, "W").task(TaskDefinition::new("a", "x", 1.0).depends_on("ghost")),
    );
    assert!(matches!(
        Orchestrator::new(plan),
        Err(Error::UnknownDependency { .. })
    ));
}

/// Test: Wave status follows its tasks
/// Given the portal plan
/// When every task in wave 2 completes
/// Then wave 2 is completed and wave 3 is unaffected
#[test]
fn test_wave_status_consistency() {
    let mut orchestrator = Orchestrator::new(portal_plan()).unwrap();
    let now = Utc::now();
    assert_eq!(orchestrator.wave_status(2).unwrap().status, WaveStatus::NotStarted);

    orchestrator.update_task_status_at("schema", TaskStatus::Completed, None, now);
    orchestrator.update_task_status_at("api", TaskStatus::InProgress, None, now);
    assert_eq!(orchestrator.wave_status(2).unwrap().status, WaveStatus::InProgress);

    for id in ["api", "ui", "docs"] {
        orchestrator.update_task_status_at(id, TaskStatus::Completed, None, now);
    }
    for wave in orchestrator.waves() {
        let all_done = orchestrator
            .tasks()
            .filter(|t| t.wave == wave.number)
            .all(|t| t.status == TaskStatus::Completed);
        if all_done {
            assert_eq!(wave.status, WaveStatus::Completed, "wave {}", wave.number);
        }
    }
    assert_eq!(orchestrator.wave_status(2).unwrap().status, WaveStatus::Completed);
    assert_eq!(orchestrator.wave_status(3).unwrap().status, WaveStatus::NotStarted);
}

/// Test: Project status on a fresh orchestrator
/// Given 3 tasks of 8h, one completed
/// Then progress is 33.33% and completion is 2 working days out
#[test]
fn test_project_status_scenario() {
    let orchestrator = Orchestrator::new(three_task_plan()).unwrap();
    let now = Utc::now();
    let status = orchestrator.project_status_at(now);

    assert_eq!(status.total_tasks, 3);
    assert_eq!(status.completed_tasks, 1);
    assert!((status.overall_progress - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(status.estimated_completion, now + Duration::days(2));
}

/// Test: Critical path walk
/// Given the portal plan
/// Then every task reached from a terminal is listed by wave
/// And the longest chain (schema, api, e2e) sets the hours
#[test]
fn test_critical_path_through_portal() {
    let orchestrator = Orchestrator::new(portal_plan()).unwrap();
    let path: Vec<String> = orchestrator
        .critical_path()
        .iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(path, vec!["schema", "docs", "api", "ui", "e2e"]);
    assert_eq!(orchestrator.critical_path_hours(), 30.0);
}

/// Test: Unknown ids are quiet
#[test]
fn test_unknown_ids_are_ignored() {
    let mut orchestrator = Orchestrator::new(two_task_plan()).unwrap();
    assert!(orchestrator.task_status("nope").is_none());
    assert!(orchestrator.wave_status(42).is_none());
    assert!(orchestrator.get_risk("nope").is_none());
    assert!(!orchestrator.update_task_status("nope", TaskStatus::Completed, None));
    assert!(!orchestrator.update_risk("nope", RiskUpdate::status(RiskStatus::Resolved)));
    assert_eq!(ready_ids(&orchestrator), vec!["A"]);
}

/// Test: Risk lifecycle feeds the dashboard
#[test]
fn test_risks_in_dashboard() {
    let mut orchestrator = Orchestrator::new(portal_plan()).unwrap();
    let id = orchestrator.add_risk(NewRisk::new(
        RiskType::Dependency,
        Severity::High,
        "Schema review pending",
    ));

    let dashboard = orchestrator.dashboard_data();
    assert_eq!(dashboard.risks.len(), 1);
    assert_eq!(dashboard.metrics.current_risks.len(), 1);

    orchestrator.update_risk(&id, RiskUpdate::status(RiskStatus::Resolved));
    let dashboard = orchestrator.dashboard_data();
    assert_eq!(dashboard.risks.len(), 1);
    assert!(dashboard.metrics.current_risks.is_empty());
}

/// Test: Standup summary
/// Given a completed task, an in-progress task and blocked dependents
/// Then the standup lists each in its section
#[test]
fn test_dashboard_standup() {
    let mut orchestrator = Orchestrator::new(portal_plan()).unwrap();
    let now = Utc::now();
    orchestrator.update_task_status_at("schema", TaskStatus::Completed, None, now);
    orchestrator.update_task_status_at("api", TaskStatus::InProgress, Some(40), now);

    let standup = orchestrator.dashboard_data_at(now).standup;
    assert_eq!(standup.completed.len(), 1);
    assert_eq!(standup.completed[0].id.as_str(), "schema");
    assert_eq!(standup.in_progress.len(), 1);
    assert_eq!(standup.in_progress[0].progress, 40);
    let blocked: Vec<&str> = standup.blocked.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(blocked, vec!["e2e"]);
}
