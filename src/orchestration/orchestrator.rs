//! Coordination core.
//!
//! The `Orchestrator` owns every task, wave and risk. State changes only go
//! through [`Orchestrator::update_task_status`] and the risk operations;
//! everything else is a read. Lookups on unknown ids return `None`, and
//! mutations on unknown ids are ignored.
//!
//! The orchestrator does no locking of its own. Callers that share it across
//! tasks wrap it in `Arc<tokio::sync::RwLock<_>>`, which serializes writers.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::OrchestratorConfig;
use crate::core::{
    CriticalWalk, NewRisk, ProjectPlan, Risk, RiskUpdate, Task, TaskDAG, TaskId, TaskStatus,
    Wave,
};
use crate::error::{Error, Result};
use crate::orchestration::metrics::{
    BlockedEntry, DashboardData, DependencyGraph, ProgressEntry, ProjectMetrics, StandupSummary,
    WaveView,
};
use crate::{clog, clog_debug};

pub struct Orchestrator {
    name: String,
    config: OrchestratorConfig,
    tasks: HashMap<TaskId, Task>,
    waves: BTreeMap<u32, Wave>,
    risks: HashMap<String, Risk>,
    dag: TaskDAG,
    /// Refreshed after every mutation.
    metrics: ProjectMetrics,
}

impl Orchestrator {
    /// Create an orchestrator from a plan with default settings.
    pub fn new(plan: ProjectPlan) -> Result<Self> {
        Self::with_config(plan, OrchestratorConfig::default())
    }

    /// Create an orchestrator from a plan.
    ///
    /// # Errors
    /// - `DuplicateWave` / `DuplicateTask` for repeated identifiers
    /// - `UnknownWaveDependency` if a wave names a wave that does not exist
    /// - `UnknownDependency` / `DependencyCycle` from the task graph
    /// - `Validation` for negative or non-finite hours
    pub fn with_config(plan: ProjectPlan, config: OrchestratorConfig) -> Result<Self> {
        let now = Utc::now();
        let mut tasks = HashMap::with_capacity(plan.task_count());
        let mut waves = BTreeMap::new();

        for def in plan.waves {
            if waves.contains_key(&def.number) {
                return Err(Error::DuplicateWave(def.number));
            }
            let (wave, wave_tasks) = def.into_parts(now);
            for task in wave_tasks {
                validate_hours(&task)?;
                if tasks.contains_key(&task.id) {
                    return Err(Error::DuplicateTask(task.id.to_string()));
                }
                tasks.insert(task.id.clone(), task);
            }
            waves.insert(wave.number, wave);
        }

        for wave in waves.values() {
            if let Some(missing) = wave.dependencies.iter().find(|d| !waves.contains_key(*d)) {
                return Err(Error::UnknownWaveDependency {
                    wave: wave.number,
                    dependency: *missing,
                });
            }
            if let Some(stray) = wave.critical_path.iter().find(|id| !wave.tasks.contains(*id)) {
                return Err(Error::Validation(format!(
                    "Wave {} lists critical-path task {} that it does not contain",
                    wave.number, stray
                )));
            }
        }

        let dag = TaskDAG::build(tasks.values())?;

        // Unfinished dependencies start out as active blockers.
        let completed: HashSet<TaskId> = tasks
            .values()
            .filter(|t| t.is_completed())
            .map(|t| t.id.clone())
            .collect();
        for task in tasks.values_mut() {
            let pending_deps: Vec<TaskId> = task
                .dependencies
                .iter()
                .filter(|d| !completed.contains(*d))
                .cloned()
                .collect();
            task.blocked_by.extend(pending_deps);
        }

        for wave in waves.values_mut() {
            let ids = wave.tasks.clone();
            wave.refresh(ids.iter().filter_map(|id| tasks.get(id)), now);
        }

        let metrics = ProjectMetrics::compute(tasks.values(), std::iter::empty(), config.hours_per_day, now);

        clog!(
            "Orchestrator initialized: {} waves, {} tasks, {} dependencies",
            waves.len(),
            tasks.len(),
            dag.dependency_count()
        );

        Ok(Self {
            name: plan.name,
            config,
            tasks,
            waves,
            risks: HashMap::new(),
            dag,
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metrics as of the last mutation.
    pub fn metrics(&self) -> &ProjectMetrics {
        &self.metrics
    }

    // ========== Lookups ==========

    pub fn task_status(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn wave_status(&self, number: u32) -> Option<&Wave> {
        self.waves.get(&number)
    }

    pub fn get_risk(&self, id: &str) -> Option<&Risk> {
        self.risks.get(id)
    }

    /// All tasks, in wave order and plan order within a wave.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.waves
            .values()
            .flat_map(|w| w.tasks.iter())
            .filter_map(|id| self.tasks.get(id))
    }

    pub fn waves(&self) -> impl Iterator<Item = &Wave> {
        self.waves.values()
    }

    /// All risks, oldest first.
    pub fn risks(&self) -> Vec<&Risk> {
        let mut risks: Vec<&Risk> = self.risks.values().collect();
        risks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        risks
    }

    pub fn dag(&self) -> &TaskDAG {
        &self.dag
    }

    // ========== Project Status ==========

    pub fn project_status(&self) -> ProjectMetrics {
        self.project_status_at(Utc::now())
    }

    pub fn project_status_at(&self, now: DateTime<Utc>) -> ProjectMetrics {
        ProjectMetrics::compute(
            self.tasks.values(),
            self.risks.values(),
            self.config.hours_per_day,
            now,
        )
    }

    // ========== Task Mutation ==========

    /// Set a task's status, optionally overwriting its progress.
    ///
    /// Returns `false` and changes nothing if the task is unknown.
    pub fn update_task_status(&mut self, id: &str, status: TaskStatus, progress: Option<u8>) -> bool {
        self.update_task_status_at(id, status, progress, Utc::now())
    }

    pub fn update_task_status_at(
        &mut self,
        id: &str,
        status: TaskStatus,
        progress: Option<u8>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(task) = self.tasks.get_mut(id) else {
            clog_debug!("update_task_status: unknown task {}, ignoring", id);
            return false;
        };

        let previous = task.status;
        task.apply_status(status, progress, now);
        let wave = task.wave;
        if previous != status {
            clog!("Task {} {} -> {} ({}%)", id, previous, status, task.progress);
        }

        let mut touched: HashSet<u32> = HashSet::from([wave]);
        touched.extend(self.unblock_ready_tasks(now));
        for number in touched {
            self.refresh_wave(number, now);
        }

        self.metrics = self.project_status_at(now);
        true
    }

    /// Clear blockers on tasks whose dependencies are all completed.
    ///
    /// Tasks that were `Blocked` go back to `Pending`. Nothing is started
    /// automatically. Returns the waves of the tasks that changed.
    fn unblock_ready_tasks(&mut self, now: DateTime<Utc>) -> Vec<u32> {
        let unblockable: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|t| !t.blocked_by.is_empty() && self.dependencies_satisfied(t))
            .map(|t| t.id.clone())
            .collect();

        let mut waves = Vec::new();
        for id in unblockable {
            if let Some(task) = self.tasks.get_mut(&id) {
                task.blocked_by.clear();
                if task.status == TaskStatus::Blocked {
                    task.apply_status(TaskStatus::Pending, None, now);
                }
                clog!("Task {} unblocked", id);
                waves.push(task.wave);
            }
        }
        waves
    }

    fn refresh_wave(&mut self, number: u32, now: DateTime<Utc>) {
        let Some(wave) = self.waves.get_mut(&number) else {
            return;
        };
        let tasks = &self.tasks;
        let ids = wave.tasks.clone();
        if wave.refresh(ids.iter().filter_map(|id| tasks.get(id)), now) {
            clog!("Wave {} is now {}", number, wave.status);
        }
    }

    // ========== Readiness ==========

    /// Every dependency exists and is completed. Missing dependencies fail closed.
    pub fn dependencies_satisfied(&self, task: &Task) -> bool {
        task.dependencies.iter().all(|dep| {
            self.tasks
                .get(dep)
                .map(|d| d.status == TaskStatus::Completed)
                .unwrap_or(false)
        })
    }

    /// Pending tasks whose dependencies are all completed.
    ///
    /// Ordered by wave, then priority (highest first), then id.
    pub fn ready_tasks(&self) -> Vec<&Task> {
        let mut ready: Vec<&Task> = self
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending && self.dependencies_satisfied(t))
            .collect();
        ready.sort_by(|a, b| {
            a.wave
                .cmp(&b.wave)
                .then(b.priority.cmp(&a.priority))
                .then(a.id.cmp(&b.id))
        });
        ready
    }

    // ========== Critical Path ==========

    /// Tasks reached by walking dependencies back from every terminal task,
    /// ordered by wave. Within a wave, dependencies come first.
    pub fn critical_path(&self) -> Vec<&Task> {
        let walk = self.walk_critical_path();
        let mut path: Vec<&Task> = walk
            .visited
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .collect();
        path.sort_by_key(|t| t.wave);
        path
    }

    /// Estimated hours along the longest dependency chain.
    pub fn critical_path_hours(&self) -> f64 {
        self.walk_critical_path().hours
    }

    fn walk_critical_path(&self) -> CriticalWalk {
        self.dag.critical_walk(|id| {
            self.tasks
                .get(id)
                .map(|t| t.estimated_hours)
                .unwrap_or(0.0)
        })
    }

    // ========== Risks ==========

    /// Register a risk and return its generated id.
    pub fn add_risk(&mut self, risk: NewRisk) -> String {
        self.add_risk_at(risk, Utc::now())
    }

    pub fn add_risk_at(&mut self, risk: NewRisk, now: DateTime<Utc>) -> String {
        let risk = risk.into_risk(now);
        let id = risk.id.clone();
        clog!("Risk {} registered ({}): {}", id, risk.severity, risk.description);
        self.risks.insert(id.clone(), risk);
        self.metrics = self.project_status_at(now);
        id
    }

    /// Merge fields into an existing risk. Unknown ids are ignored.
    pub fn update_risk(&mut self, id: &str, update: RiskUpdate) -> bool {
        self.update_risk_at(id, update, Utc::now())
    }

    pub fn update_risk_at(&mut self, id: &str, update: RiskUpdate, now: DateTime<Utc>) -> bool {
        let Some(risk) = self.risks.get_mut(id) else {
            clog_debug!("update_risk: unknown risk {}, ignoring", id);
            return false;
        };
        update.apply(risk);
        self.metrics = self.project_status_at(now);
        true
    }

    // ========== Snapshots ==========

    pub fn dashboard_data(&self) -> DashboardData {
        self.dashboard_data_at(Utc::now())
    }

    pub fn dashboard_data_at(&self, now: DateTime<Utc>) -> DashboardData {
        let waves = self
            .waves
            .values()
            .map(|wave| WaveView {
                wave: wave.clone(),
                tasks: wave
                    .tasks
                    .iter()
                    .filter_map(|id| self.tasks.get(id))
                    .cloned()
                    .collect(),
            })
            .collect();

        DashboardData {
            metrics: self.project_status_at(now),
            waves,
            ready_tasks: self.ready_tasks().into_iter().cloned().collect(),
            critical_path: self.critical_path().into_iter().cloned().collect(),
            risks: self.risks().into_iter().cloned().collect(),
            standup: self.standup_at(now),
            generated_at: now,
        }
    }

    fn standup_at(&self, now: DateTime<Utc>) -> StandupSummary {
        let since = now - chrono::Duration::hours(24);
        let entry = |t: &Task| ProgressEntry {
            id: t.id.clone(),
            name: t.name.clone(),
            progress: t.progress,
        };

        let mut standup = StandupSummary::default();
        for task in self.tasks() {
            if task.completed_at.is_some_and(|at| at >= since) {
                standup.completed.push(entry(task));
            }
            if task.status == TaskStatus::InProgress {
                standup.in_progress.push(entry(task));
            }
            if task.status == TaskStatus::Blocked || !task.blocked_by.is_empty() {
                standup.blocked.push(BlockedEntry {
                    id: task.id.clone(),
                    name: task.name.clone(),
                    status: task.status,
                    blocked_by: task.blocked_by.iter().cloned().collect(),
                });
            }
        }
        standup
    }

    /// Dependency and blocker relations as a node/edge graph.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_tasks(self.tasks())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("name", &self.name)
            .field("waves", &self.waves.len())
            .field("tasks", &self.tasks.len())
            .field("risks", &self.risks.len())
            .finish()
    }
}

fn validate_hours(task: &Task) -> Result<()> {
    let check = |field: &str, hours: f64| {
        if hours.is_finite() && hours >= 0.0 {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Task {} has invalid {}: {}",
                task.id, field, hours
            )))
        }
    };
    check("estimated_hours", task.estimated_hours)?;
    if let Some(actual) = task.actual_hours {
        check("actual_hours", actual)?;
    }
    Ok(())
}
