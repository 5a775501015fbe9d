//! Static project definition.
//!
//! A plan lists the waves and their tasks. It is read once when an
//! orchestrator is constructed; after that all state lives in the
//! orchestrator.
//!
//! ```toml
//! [[waves]]
//! number = 1
//! name = "Foundation"
//! critical_path = ["schema"]
//!
//! [[waves.tasks]]
//! id = "schema"
//! agent_type = "database-optimizer"
//! name = "Database schema"
//! estimated_hours = 8
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use super::task::{Priority, RiskLevel, Task, TaskId, TaskStatus};
use super::wave::Wave;
use crate::{clog_debug, Result};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    pub agent_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub estimated_hours: f64,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Initial status, for plans describing work already under way.
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    /// Extra blockers beyond unfinished dependencies.
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TaskDefinition {
    pub fn new(id: &str, agent_type: &str, estimated_hours: f64) -> Self {
        Self {
            id: id.to_string(),
            agent_type: agent_type.to_string(),
            name: String::new(),
            description: String::new(),
            priority: Priority::Normal,
            dependencies: Vec::new(),
            estimated_hours,
            deliverables: Vec::new(),
            risk_level: RiskLevel::Low,
            status: TaskStatus::Pending,
            progress: None,
            actual_hours: None,
            blocked_by: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn depends_on(mut self, id: &str) -> Self {
        self.dependencies.push(id.to_string());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub(crate) fn into_task(self, wave: u32, now: DateTime<Utc>) -> Task {
        let mut task = Task::new(self.id.as_str(), &self.agent_type, wave, self.estimated_hours);
        if !self.name.is_empty() {
            task.name = self.name;
        }
        task.description = self.description;
        task.priority = self.priority;
        task.dependencies = self.dependencies.into_iter().map(TaskId::from).collect();
        task.blocked_by = self.blocked_by.into_iter().map(TaskId::from).collect();
        task.deliverables = self.deliverables;
        task.risk_level = self.risk_level;
        task.actual_hours = self.actual_hours;
        task.metadata = self.metadata;
        task.apply_status(self.status, self.progress, now);
        task
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveDefinition {
    pub number: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<u32>,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub critical_path: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

impl WaveDefinition {
    pub fn new(number: u32, name: &str) -> Self {
        Self {
            number,
            name: name.to_string(),
            description: String::new(),
            dependencies: Vec::new(),
            parallel: true,
            critical_path: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn task(mut self, task: TaskDefinition) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn after(mut self, wave: u32) -> Self {
        self.dependencies.push(wave);
        self
    }

    /// Split into the wave record and its tasks.
    pub(crate) fn into_parts(self, now: DateTime<Utc>) -> (Wave, Vec<Task>) {
        let mut wave = Wave::new(self.number, &self.name);
        wave.description = self.description;
        wave.dependencies = self.dependencies.into_iter().collect::<BTreeSet<_>>();
        wave.parallel = self.parallel;
        wave.critical_path = self.critical_path.into_iter().map(TaskId::from).collect();

        let number = self.number;
        let tasks: Vec<Task> = self
            .tasks
            .into_iter()
            .map(|def| def.into_task(number, now))
            .collect();
        wave.tasks = tasks.iter().map(|t| t.id.clone()).collect();
        (wave, tasks)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPlan {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub waves: Vec<WaveDefinition>,
}

impl ProjectPlan {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            waves: Vec::new(),
        }
    }

    pub fn wave(mut self, wave: WaveDefinition) -> Self {
        self.waves.push(wave);
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        clog_debug!("ProjectPlan::load path={}", path.display());
        let plan = Self::from_toml_str(&fs::read_to_string(path)?)?;
        clog_debug!(
            "Plan loaded: {} waves, {} tasks",
            plan.waves.len(),
            plan.task_count()
        );
        Ok(plan)
    }

    pub fn task_count(&self) -> usize {
        self.waves.iter().map(|w| w.tasks.len()).sum()
    }
}
