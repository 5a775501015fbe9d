use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{clog_debug, Error, Result};

/// Orchestrator tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Working hours per day used to turn remaining estimates into days.
    pub hours_per_day: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { hours_per_day: 8.0 }
    }
}

/// Execution monitor tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    /// Concurrent agent slots assumed when computing utilization.
    pub max_parallel_capacity: usize,
    pub history_retention_hours: i64,
    pub throughput_window_mins: i64,
    /// Open a resource-constraint alert above this utilization.
    pub resource_alert_pct: f64,
    /// Resolve it once utilization drops below this.
    pub resource_resolve_pct: f64,
    /// A critical-path task is delayed once elapsed > ratio × estimate.
    pub critical_delay_ratio: f64,
    /// Open an agent-overload alert when load exceeds this.
    pub overload_threshold: usize,
    /// Resolve it once load is at or below this.
    pub overload_resolve: usize,
    pub idle_utilization_pct: f64,
    pub imbalance_threshold: usize,
    pub max_start_suggestions: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            max_parallel_capacity: 12,
            history_retention_hours: 24,
            throughput_window_mins: 60,
            resource_alert_pct: 90.0,
            resource_resolve_pct: 80.0,
            critical_delay_ratio: 1.2,
            overload_threshold: 3,
            overload_resolve: 2,
            idle_utilization_pct: 70.0,
            imbalance_threshold: 2,
            max_start_suggestions: 3,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.history_retention_hours)
    }

    pub fn throughput_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.throughput_window_mins)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Config {
    pub fn data_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".conductor"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("conductor.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        clog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            clog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        clog_debug!(
            "Config loaded: interval={}s capacity={} hours_per_day={}",
            config.monitor.interval_secs,
            config.monitor.max_parallel_capacity,
            config.orchestrator.hours_per_day
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        clog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn ensure_dirs() -> Result<()> {
        let dir = Self::data_dir()?;
        if !dir.exists() {
            clog_debug!("Creating data directory: {}", dir.display());
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}
