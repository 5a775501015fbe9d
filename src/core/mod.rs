//! Core domain models for the orchestrator.
//!
//! Tasks, waves, risks, the static project plan they are loaded from, and
//! the dependency graph over tasks.

pub mod dag;
pub mod plan;
pub mod risk;
pub mod task;
pub mod wave;

pub use dag::{CriticalWalk, TaskDAG};
pub use plan::{ProjectPlan, TaskDefinition, WaveDefinition};
pub use risk::{NewRisk, Risk, RiskStatus, RiskType, RiskUpdate, Severity};
pub use task::{Priority, RiskLevel, Task, TaskId, TaskStatus};
pub use wave::{Wave, WaveStatus};
