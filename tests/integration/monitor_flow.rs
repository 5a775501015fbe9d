//! Execution monitor integration tests.
//!
//! These tests verify that the monitor detects, deduplicates and resolves
//! bottlenecks as the shared orchestrator changes underneath it.

use chrono::{Duration, Utc};

use conductor::config::MonitorConfig;
use conductor::core::{ProjectPlan, Severity, TaskDefinition, TaskStatus, WaveDefinition};
use conductor::monitor::{BottleneckType, MonitorEvent, MonitorEventKind, SuggestionKind};

use crate::fixtures::{flat_plan, portal_plan, task_ids, two_task_plan, Harness};

/// Test: Resource constraint with hysteresis
/// Given capacity 20 and 19 tasks in progress (95%)
/// When load drops to 85% and then 75%
/// Then the alert survives 85% and resolves at 75% with a resolved event
#[tokio::test]
async fn test_resource_constraint_lifecycle() {
    let config = MonitorConfig {
        max_parallel_capacity: 20,
        overload_threshold: 50,
        overload_resolve: 40,
        ..Default::default()
    };
    let harness = Harness::new(flat_plan(20, "backend-developer"), config);
    let now = Utc::now();

    harness.set_status(&task_ids(0..19), TaskStatus::InProgress, now).await;
    harness.monitor.tick_at(now).await;

    let active = harness.monitor.active_bottlenecks().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].kind, BottleneckType::ResourceConstraint);
    assert_eq!(active[0].severity, Severity::High);
    assert_eq!(
        harness.drain_kind(MonitorEventKind::BottleneckDetected).len(),
        1
    );

    harness.set_status(&task_ids(17..19), TaskStatus::Pending, now).await;
    harness.monitor.tick_at(now + Duration::seconds(10)).await;
    assert_eq!(harness.monitor.active_bottlenecks().await.len(), 1);
    assert!(harness
        .drain_kind(MonitorEventKind::BottleneckResolved)
        .is_empty());

    harness.set_status(&task_ids(15..17), TaskStatus::Pending, now).await;
    harness.monitor.tick_at(now + Duration::seconds(20)).await;
    assert!(harness.monitor.active_bottlenecks().await.is_empty());

    let resolved = harness.drain_kind(MonitorEventKind::BottleneckResolved);
    assert_eq!(resolved.len(), 1);
    match &resolved[0] {
        MonitorEvent::BottleneckResolved(alert) => {
            assert_eq!(alert.id, "resource-constraint-general");
            assert_eq!(alert.resolved_at, Some(now + Duration::seconds(20)));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

/// Test: Agent overload
/// Given 4 in-progress tasks of one agent type
/// When two of them are paused
/// Then the overload alert appears for that type and then clears
#[tokio::test]
async fn test_agent_overload_lifecycle() {
    let harness = Harness::new(flat_plan(6, "frontend-developer"), MonitorConfig::default());
    let now = Utc::now();

    harness.set_status(&task_ids(0..4), TaskStatus::InProgress, now).await;
    harness.monitor.tick_at(now).await;
    let active = harness.monitor.active_bottlenecks().await;
    let overload = active
        .iter()
        .find(|a| a.kind == BottleneckType::AgentOverload)
        .expect("overload alert");
    assert_eq!(overload.id, "agent-overload-frontend-developer");
    assert_eq!(overload.agent_type.as_deref(), Some("frontend-developer"));

    harness.set_status(&task_ids(2..4), TaskStatus::Pending, now).await;
    harness.monitor.tick_at(now).await;
    assert!(harness
        .monitor
        .active_bottlenecks()
        .await
        .iter()
        .all(|a| a.kind != BottleneckType::AgentOverload));
    assert!(harness
        .monitor
        .resolved_bottlenecks()
        .await
        .iter()
        .any(|a| a.id == "agent-overload-frontend-developer"));
}

/// Test: Dependency-chain deduplication
/// Given B waiting on A
/// When the monitor ticks twice
/// Then exactly one alert exists until A completes
#[tokio::test]
async fn test_dependency_chain_dedup_and_resolution() {
    let harness = Harness::new(two_task_plan(), MonitorConfig::default());
    let now = Utc::now();

    harness.monitor.tick_at(now).await;
    harness.monitor.tick_at(now + Duration::seconds(10)).await;

    let active = harness.monitor.active_bottlenecks().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "dep-chain-B");
    assert_eq!(
        harness.drain_kind(MonitorEventKind::BottleneckDetected).len(),
        1
    );

    harness
        .set_status(&["A".to_string()], TaskStatus::Completed, now)
        .await;
    harness.monitor.tick_at(now + Duration::seconds(20)).await;
    assert!(harness.monitor.active_bottlenecks().await.is_empty());
}

/// Test: Critical-path delay
/// Given the portal plan with schema (8h) started 10h ago
/// Then a critical alert is raised, and clears once schema completes
#[tokio::test]
async fn test_critical_path_delay_lifecycle() {
    let harness = Harness::new(portal_plan(), MonitorConfig::default());
    let now = Utc::now();

    harness
        .set_status(&["schema".to_string()], TaskStatus::InProgress, now - Duration::hours(10))
        .await;
    harness.monitor.tick_at(now).await;

    let active = harness.monitor.active_bottlenecks().await;
    assert_eq!(active[0].id, "critical-delay-schema");
    assert_eq!(active[0].severity, Severity::Critical);
    let metrics = harness.monitor.latest_metrics().await.unwrap();
    assert!((metrics.critical_path_delay_minutes - 120.0).abs() < 1e-6);

    harness
        .set_status(&["schema".to_string()], TaskStatus::Completed, now)
        .await;
    harness.monitor.tick_at(now + Duration::minutes(1)).await;
    assert!(harness
        .monitor
        .active_bottlenecks()
        .await
        .iter()
        .all(|a| a.kind != BottleneckType::CriticalPathDelay));
}

/// Test: Delay on a short task off the longest chain
/// Given a 10h task and an independent 1h task
/// When the 1h task has run for 5h
/// Then it still raises a critical-path delay alert
#[tokio::test]
async fn test_delay_on_short_independent_task() {
    let plan = ProjectPlan::new("split").wave(
        WaveDefinition::new(1, "Only")
            .task(TaskDefinition::new("long", "backend-developer", 10.0))
            .task(TaskDefinition::new("short", "frontend-developer", 1.0)),
    );
    let harness = Harness::new(plan, MonitorConfig::default());
    let t0 = Utc::now();

    harness
        .set_status(&["short".to_string()], TaskStatus::InProgress, t0)
        .await;
    harness.monitor.tick_at(t0 + Duration::hours(5)).await;

    let ids: Vec<String> = harness
        .monitor
        .active_bottlenecks()
        .await
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec!["critical-delay-short"]);
    let metrics = harness.monitor.latest_metrics().await.unwrap();
    assert!((metrics.critical_path_delay_minutes - 240.0).abs() < 1e-6);
}

/// Test: Idle capacity suggestion
/// Given an idle project with ready work
/// Then the monitor suggests starting up to three ready tasks
#[tokio::test]
async fn test_idle_capacity_suggestion() {
    let harness = Harness::new(portal_plan(), MonitorConfig::default());
    harness.monitor.tick().await;

    let suggestions = harness.drain_kind(MonitorEventKind::OptimizationSuggestion);
    let start = suggestions
        .iter()
        .find_map(|e| match e {
            MonitorEvent::OptimizationSuggestion(s) if s.kind == SuggestionKind::StartReadyTasks => {
                Some(s)
            }
            _ => None,
        })
        .expect("start suggestion");
    let ids: Vec<&str> = start.task_ids.iter().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["schema", "docs"]);
}

/// Test: Histories are bounded to the retention window
#[tokio::test]
async fn test_histories_respect_retention() {
    let harness = Harness::new(portal_plan(), MonitorConfig::default());
    let start = Utc::now();

    for hour in [0, 6, 12, 18, 24, 30] {
        let now = start + Duration::hours(hour);
        harness.monitor.tick_at(now).await;

        let cutoff = now - Duration::hours(24);
        let metrics = harness.monitor.metrics_history().await;
        assert!(metrics.iter().all(|m| m.timestamp >= cutoff));
        for perf in harness.monitor.agent_performance().await {
            let history = harness.monitor.agent_history(&perf.agent_type).await;
            assert!(history.iter().all(|p| p.timestamp >= cutoff));
        }
    }
    assert_eq!(harness.monitor.metrics_history().await.len(), 5);
}

/// Test: Snapshot contents
/// Given work in progress across agent types
/// Then the published snapshot maps agent types to their running tasks
#[tokio::test]
async fn test_monitoring_update_snapshot() {
    let harness = Harness::new(portal_plan(), MonitorConfig::default());
    let now = Utc::now();
    harness
        .set_status(&["schema".to_string()], TaskStatus::Completed, now)
        .await;
    harness
        .set_status(&["api".to_string(), "ui".to_string()], TaskStatus::InProgress, now)
        .await;

    harness.monitor.tick_at(now).await;

    let updates = harness.drain_kind(MonitorEventKind::MonitoringUpdate);
    assert_eq!(updates.len(), 1);
    let MonitorEvent::MonitoringUpdate(snapshot) = &updates[0] else {
        panic!("expected monitoring update");
    };
    assert_eq!(snapshot.execution_map.len(), 2);
    assert_eq!(snapshot.execution_map["backend-developer"][0].as_str(), "api");
    assert_eq!(snapshot.dependency_graph.nodes.len(), 5);
    assert_eq!(snapshot.metrics.as_ref().unwrap().parallel_tasks, 2);
    assert_eq!(harness.monitor.snapshot().await.as_ref(), Some(&**snapshot));
}

/// Test: Monitor never writes to the orchestrator
#[tokio::test]
async fn test_monitor_is_read_only() {
    let harness = Harness::new(portal_plan(), MonitorConfig::default());
    let before = harness.orchestrator.read().await.dashboard_data_at(Utc::now());

    for _ in 0..3 {
        harness.monitor.tick().await;
    }

    let after = harness.orchestrator.read().await.dashboard_data_at(before.generated_at);
    assert_eq!(before, after);
}
