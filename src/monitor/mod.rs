//! Execution monitor.
//!
//! The [`ExecutionMonitor`] polls the orchestrator's dashboard snapshot on a
//! fixed interval. Each tick runs four phases in order:
//!
//! 1. collect execution metrics and per-agent-type performance
//! 2. resolve cleared bottlenecks, then detect new ones
//! 3. emit optimization suggestions
//! 4. publish a [`MonitoringSnapshot`]
//!
//! A failing phase is logged and the tick moves on to the next one. The
//! monitor only ever takes read locks on the orchestrator.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use tokio::sync::RwLock;
//! # use conductor::{config::MonitorConfig, core::ProjectPlan, Orchestrator};
//! # use conductor::monitor::{ExecutionMonitor, MonitorEventKind};
//! # async fn run(plan: ProjectPlan) -> conductor::Result<()> {
//! let orchestrator = Arc::new(RwLock::new(Orchestrator::new(plan)?));
//! let mut monitor = ExecutionMonitor::new(orchestrator.clone(), MonitorConfig::default());
//! monitor.events().subscribe(MonitorEventKind::BottleneckDetected, |event| {
//!     println!("{:?}", event);
//! });
//! monitor.start();
//! # Ok(())
//! # }
//! ```

pub mod bottleneck;
pub mod events;
pub mod metrics;
pub mod snapshot;
mod timer;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::config::MonitorConfig;
use crate::orchestration::{DashboardData, Orchestrator};
use crate::{clog, clog_debug, clog_trace, clog_warn, Error, Result};

pub use bottleneck::{BottleneckAlert, BottleneckTracker, BottleneckType, DetectionContext};
pub use events::{
    EventBus, Listener, MonitorEvent, MonitorEventKind, SubscriptionId, Suggestion,
    SuggestionKind, SuggestionPriority,
};
pub use metrics::{AgentPerformance, ExecutionMetrics, History};
pub use snapshot::MonitoringSnapshot;
pub use timer::ActorHandle;

use timer::TickActor;

/// Everything a tick reads and writes. Guarded by one mutex so ticks never overlap.
pub(crate) struct MonitorState {
    orchestrator: Arc<RwLock<Orchestrator>>,
    config: MonitorConfig,
    events: EventBus,
    metrics: History<ExecutionMetrics>,
    performance: BTreeMap<String, History<AgentPerformance>>,
    bottlenecks: BottleneckTracker,
    snapshot: Option<MonitoringSnapshot>,
    ticks: u64,
}

impl MonitorState {
    fn new(orchestrator: Arc<RwLock<Orchestrator>>, config: MonitorConfig, events: EventBus) -> Self {
        Self {
            orchestrator,
            metrics: History::new(config.retention()),
            performance: BTreeMap::new(),
            bottlenecks: BottleneckTracker::new(),
            snapshot: None,
            ticks: 0,
            config,
            events,
        }
    }

    pub(crate) async fn tick(&mut self, now: DateTime<Utc>) {
        self.ticks += 1;
        clog_trace!("Monitor tick {} at {}", self.ticks, now);

        // Clone the snapshot so the read lock is released before analysis.
        let data = self.orchestrator.read().await.dashboard_data_at(now);

        if let Err(e) = self.collect(&data, now) {
            clog_warn!("Monitor: metrics collection failed: {}", e);
        }
        if let Err(e) = self.detect(&data, now) {
            clog_warn!("Monitor: bottleneck detection failed: {}", e);
        }
        if let Err(e) = self.suggest(&data, now) {
            clog_warn!("Monitor: optimization pass failed: {}", e);
        }
        self.publish(&data, now);
    }

    // ========== Phase 1: Collection ==========

    fn collect(&mut self, data: &DashboardData, now: DateTime<Utc>) -> Result<()> {
        let metrics =
            ExecutionMetrics::collect(data, &self.config, self.bottlenecks.has_active(), now)?;
        clog_debug!(
            "Monitor: {} parallel, {:.0}% utilization, throughput {}",
            metrics.parallel_tasks,
            metrics.resource_utilization,
            metrics.throughput
        );
        self.metrics.record(metrics, now);

        let retention = self.config.retention();
        for perf in AgentPerformance::collect(data, now) {
            self.performance
                .entry(perf.agent_type.clone())
                .or_insert_with(|| History::new(retention))
                .record(perf, now);
        }
        for history in self.performance.values_mut() {
            history.prune(now);
        }
        self.performance.retain(|_, history| !history.is_empty());
        Ok(())
    }

    /// Latest performance entry per agent type.
    fn current_performance(&self) -> Vec<AgentPerformance> {
        self.performance
            .values()
            .filter_map(|h| h.latest().cloned())
            .collect()
    }

    // ========== Phase 2: Detection ==========

    fn detect(&mut self, data: &DashboardData, now: DateTime<Utc>) -> Result<()> {
        let metrics = self.metrics.latest().cloned().ok_or(Error::NoMetrics)?;
        let performance = self.current_performance();
        let ctx = DetectionContext {
            data,
            metrics: &metrics,
            performance: &performance,
            config: &self.config,
            now,
        };

        let resolved = self.bottlenecks.resolve(&ctx);
        let detected = self.bottlenecks.admit(bottleneck::detect(&ctx));
        self.bottlenecks.prune_resolved(now - self.config.retention());

        for alert in resolved {
            clog!("Bottleneck resolved: {}", alert.id);
            self.events.emit(&MonitorEvent::BottleneckResolved(alert));
        }
        for alert in detected {
            clog_warn!(
                "Bottleneck detected: {} ({}) {}",
                alert.id,
                alert.severity,
                alert.description
            );
            self.events.emit(&MonitorEvent::BottleneckDetected(alert));
        }

        let present = self.bottlenecks.has_active();
        if let Some(latest) = self.metrics.latest_mut() {
            latest.bottleneck_present = present;
        }
        Ok(())
    }

    // ========== Phase 3: Suggestions ==========

    fn suggest(&self, data: &DashboardData, now: DateTime<Utc>) -> Result<()> {
        let metrics = self.metrics.latest().ok_or(Error::NoMetrics)?;
        let mut suggestions = Vec::new();

        if metrics.resource_utilization < self.config.idle_utilization_pct
            && !data.ready_tasks.is_empty()
        {
            let task_ids: Vec<_> = data
                .ready_tasks
                .iter()
                .take(self.config.max_start_suggestions)
                .map(|t| t.id.clone())
                .collect();
            let names: Vec<&str> = task_ids.iter().map(|id| id.as_str()).collect();
            suggestions.push(Suggestion {
                kind: SuggestionKind::StartReadyTasks,
                priority: SuggestionPriority::Medium,
                message: format!(
                    "Utilization is {:.0}%; start ready tasks: {}",
                    metrics.resource_utilization,
                    names.join(", ")
                ),
                task_ids,
                agent_types: Vec::new(),
                created_at: now,
            });
        }

        let performance = self.current_performance();
        let busiest = performance.iter().max_by_key(|p| p.current_load);
        let idlest = performance.iter().min_by_key(|p| p.current_load);
        if let (Some(busiest), Some(idlest)) = (busiest, idlest) {
            let spread = busiest.current_load - idlest.current_load;
            if spread > self.config.imbalance_threshold {
                suggestions.push(Suggestion {
                    kind: SuggestionKind::RebalanceLoad,
                    priority: SuggestionPriority::Low,
                    message: format!(
                        "Load imbalance: {} has {} tasks in progress, {} has {}",
                        busiest.agent_type,
                        busiest.current_load,
                        idlest.agent_type,
                        idlest.current_load
                    ),
                    task_ids: Vec::new(),
                    agent_types: vec![busiest.agent_type.clone(), idlest.agent_type.clone()],
                    created_at: now,
                });
            }
        }

        for suggestion in suggestions {
            clog_debug!("Monitor suggestion: {}", suggestion.message);
            self.events.emit(&MonitorEvent::OptimizationSuggestion(suggestion));
        }
        Ok(())
    }

    // ========== Phase 4: Publication ==========

    fn publish(&mut self, data: &DashboardData, now: DateTime<Utc>) {
        let snapshot = MonitoringSnapshot::build(
            data,
            self.metrics.latest().cloned(),
            self.current_performance(),
            self.bottlenecks.active(),
            now,
        );
        self.snapshot = Some(snapshot.clone());
        self.events
            .emit(&MonitorEvent::MonitoringUpdate(Box::new(snapshot)));
    }
}

/// Periodic bottleneck detector over a shared orchestrator.
///
/// `start` must be called from within a tokio runtime.
pub struct ExecutionMonitor {
    state: Arc<Mutex<MonitorState>>,
    events: EventBus,
    config: MonitorConfig,
    timer: Option<ActorHandle>,
}

impl ExecutionMonitor {
    pub fn new(orchestrator: Arc<RwLock<Orchestrator>>, config: MonitorConfig) -> Self {
        let events = EventBus::new();
        let state = MonitorState::new(orchestrator, config.clone(), events.clone());
        Self {
            state: Arc::new(Mutex::new(state)),
            events,
            config,
            timer: None,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe<F>(&self, kind: MonitorEventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&MonitorEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ========== Lifecycle ==========

    /// Start the periodic timer, replacing any timer already running.
    pub fn start(&mut self) {
        if self.timer.is_some() {
            clog_debug!("Monitor already running, restarting timer");
            self.stop();
        }
        let actor = TickActor::new(self.state.clone(), self.config.interval());
        self.timer = Some(actor.spawn());
        clog!(
            "Execution monitor started (interval {}s)",
            self.config.interval().as_secs()
        );
    }

    /// Cancel the timer. A tick already in flight runs to completion.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.shutdown();
            clog!("Execution monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Run one tick now. Waits for any timer tick in progress.
    pub async fn tick(&self) {
        self.tick_at(Utc::now()).await;
    }

    pub async fn tick_at(&self, now: DateTime<Utc>) {
        self.state.lock().await.tick(now).await;
    }

    // ========== Queries ==========

    pub async fn latest_metrics(&self) -> Option<ExecutionMetrics> {
        self.state.lock().await.metrics.latest().cloned()
    }

    /// Retained metrics, oldest first.
    pub async fn metrics_history(&self) -> Vec<ExecutionMetrics> {
        self.state.lock().await.metrics.to_vec()
    }

    /// Latest performance entry per agent type, sorted by type.
    pub async fn agent_performance(&self) -> Vec<AgentPerformance> {
        self.state.lock().await.current_performance()
    }

    pub async fn agent_history(&self, agent_type: &str) -> Vec<AgentPerformance> {
        self.state
            .lock()
            .await
            .performance
            .get(agent_type)
            .map(History::to_vec)
            .unwrap_or_default()
    }

    /// Active alerts, most severe first.
    pub async fn active_bottlenecks(&self) -> Vec<BottleneckAlert> {
        self.state.lock().await.bottlenecks.active()
    }

    pub async fn resolved_bottlenecks(&self) -> Vec<BottleneckAlert> {
        self.state.lock().await.bottlenecks.resolved().to_vec()
    }

    /// The snapshot published by the most recent tick.
    pub async fn snapshot(&self) -> Option<MonitoringSnapshot> {
        self.state.lock().await.snapshot.clone()
    }

    pub async fn tick_count(&self) -> u64 {
        self.state.lock().await.ticks
    }
}

impl Drop for ExecutionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ExecutionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionMonitor")
            .field("interval", &self.config.interval())
            .field("running", &self.is_running())
            .finish()
    }
}
