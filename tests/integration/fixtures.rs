//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Predefined project plans
//! - A shared orchestrator plus monitor harness
//! - Draining monitor events

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use tokio::sync::RwLock;

use conductor::config::MonitorConfig;
use conductor::core::{ProjectPlan, TaskDefinition, TaskStatus, WaveDefinition};
use conductor::monitor::{ExecutionMonitor, MonitorEvent, MonitorEventKind};
use conductor::Orchestrator;

/// Task A (10h) and task B (5h) depending on A.
pub fn two_task_plan() -> ProjectPlan {
    ProjectPlan::new("two-task").wave(
        WaveDefinition::new(1, "Only")
            .task(TaskDefinition::new("A", "backend-developer", 10.0))
            .task(TaskDefinition::new("B", "backend-developer", 5.0).depends_on("A")),
    )
}

/// Three 8h tasks, the first already completed.
pub fn three_task_plan() -> ProjectPlan {
    ProjectPlan::new("three-task").wave(
        WaveDefinition::new(1, "Only")
            .task(
                TaskDefinition::new("done", "backend-developer", 8.0)
                    .with_status(TaskStatus::Completed),
            )
            .task(TaskDefinition::new("todo-1", "backend-developer", 8.0))
            .task(TaskDefinition::new("todo-2", "frontend-developer", 8.0)),
    )
}

/// Three waves: schema -> (api, ui) -> e2e, with a side task in wave 2.
pub fn portal_plan() -> ProjectPlan {
    ProjectPlan::new("portal")
        .wave(
            WaveDefinition::new(1, "Foundation")
                .task(TaskDefinition::new("schema", "database-optimizer", 8.0)),
        )
        .wave(
            WaveDefinition::new(2, "Build")
                .after(1)
                .task(TaskDefinition::new("api", "backend-developer", 16.0).depends_on("schema"))
                .task(TaskDefinition::new("ui", "frontend-developer", 12.0).depends_on("schema"))
                .task(TaskDefinition::new("docs", "technical-writer", 2.0)),
        )
        .wave(
            WaveDefinition::new(3, "Verify")
                .after(2)
                .task(
                    TaskDefinition::new("e2e", "qa-engineer", 6.0)
                        .depends_on("api")
                        .depends_on("ui"),
                ),
        )
}

/// `count` independent tasks named `t00`, `t01`, ... of one agent type.
pub fn flat_plan(count: usize, agent_type: &str) -> ProjectPlan {
    let mut wave = WaveDefinition::new(1, "Flat");
    for id in task_ids(0..count) {
        wave = wave.task(TaskDefinition::new(&id, agent_type, 4.0));
    }
    ProjectPlan::new("flat").wave(wave)
}

pub fn task_ids(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("t{i:02}")).collect()
}

/// Orchestrator and monitor sharing state, with every event captured.
pub struct Harness {
    pub orchestrator: Arc<RwLock<Orchestrator>>,
    pub monitor: ExecutionMonitor,
    pub events: Receiver<MonitorEvent>,
}

impl Harness {
    pub fn new(plan: ProjectPlan, config: MonitorConfig) -> Self {
        let orchestrator = Arc::new(RwLock::new(
            Orchestrator::new(plan).expect("valid plan"),
        ));
        let monitor = ExecutionMonitor::new(Arc::clone(&orchestrator), config);
        let (_, events) = monitor.events().channel(&MonitorEventKind::ALL);
        Self {
            orchestrator,
            monitor,
            events,
        }
    }

    pub async fn set_status(&self, ids: &[String], status: TaskStatus, now: DateTime<Utc>) {
        let mut orchestrator = self.orchestrator.write().await;
        for id in ids {
            orchestrator.update_task_status_at(id, status, None, now);
        }
    }

    /// Events emitted since the last drain.
    pub fn drain(&self) -> Vec<MonitorEvent> {
        self.events.try_iter().collect()
    }

    pub fn drain_kind(&self, kind: MonitorEventKind) -> Vec<MonitorEvent> {
        self.drain().into_iter().filter(|e| e.kind() == kind).collect()
    }
}
