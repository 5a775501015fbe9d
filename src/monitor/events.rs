//! Monitor notifications and the in-process subscription bus.
//!
//! Delivery is synchronous and best-effort: listeners registered at emit
//! time are called in registration order on the emitting task, and nothing is
//! queued for listeners that subscribe later.

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::bottleneck::BottleneckAlert;
use super::snapshot::MonitoringSnapshot;
use crate::core::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonitorEventKind {
    BottleneckDetected,
    BottleneckResolved,
    OptimizationSuggestion,
    MonitoringUpdate,
}

impl MonitorEventKind {
    pub const ALL: [MonitorEventKind; 4] = [
        MonitorEventKind::BottleneckDetected,
        MonitorEventKind::BottleneckResolved,
        MonitorEventKind::OptimizationSuggestion,
        MonitorEventKind::MonitoringUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorEventKind::BottleneckDetected => "bottleneck-detected",
            MonitorEventKind::BottleneckResolved => "bottleneck-resolved",
            MonitorEventKind::OptimizationSuggestion => "optimization-suggestion",
            MonitorEventKind::MonitoringUpdate => "monitoring-update",
        }
    }
}

impl std::fmt::Display for MonitorEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    StartReadyTasks,
    RebalanceLoad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    Low,
    Medium,
    High,
}

/// Advisory only. The monitor never acts on its own suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub priority: SuggestionPriority,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_types: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum MonitorEvent {
    BottleneckDetected(BottleneckAlert),
    BottleneckResolved(BottleneckAlert),
    OptimizationSuggestion(Suggestion),
    MonitoringUpdate(Box<MonitoringSnapshot>),
}

impl MonitorEvent {
    pub fn kind(&self) -> MonitorEventKind {
        match self {
            MonitorEvent::BottleneckDetected(_) => MonitorEventKind::BottleneckDetected,
            MonitorEvent::BottleneckResolved(_) => MonitorEventKind::BottleneckResolved,
            MonitorEvent::OptimizationSuggestion(_) => MonitorEventKind::OptimizationSuggestion,
            MonitorEvent::MonitoringUpdate(_) => MonitorEventKind::MonitoringUpdate,
        }
    }
}

pub type Listener = Arc<dyn Fn(&MonitorEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    kind: MonitorEventKind,
    listener: Listener,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: RwLock<Vec<Registration>>,
}

/// Listener table shared by the monitor and its subscribers. Cloning is cheap.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: MonitorEventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&MonitorEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push(Registration {
            id,
            kind,
            listener: Arc::new(listener),
        });
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|r| r.id != id);
        listeners.len() != before
    }

    /// Forward the given kinds into a channel.
    ///
    /// Events sent after the receiver is dropped are discarded.
    pub fn channel(&self, kinds: &[MonitorEventKind]) -> (Vec<SubscriptionId>, Receiver<MonitorEvent>) {
        let (tx, rx) = unbounded();
        let ids = kinds
            .iter()
            .map(|kind| {
                let tx = tx.clone();
                self.subscribe(*kind, move |event| {
                    let _ = tx.send(event.clone());
                })
            })
            .collect();
        (ids, rx)
    }

    /// Deliver to every listener of the event's kind. Returns how many were called.
    pub fn emit(&self, event: &MonitorEvent) -> usize {
        let kind = event.kind();
        // Listeners may subscribe or unsubscribe, so call them without the lock held.
        let targets: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| Arc::clone(&r.listener))
            .collect();
        for listener in &targets {
            listener(event);
        }
        targets.len()
    }

    pub fn listener_count(&self, kind: MonitorEventKind) -> usize {
        self.inner
            .listeners
            .read()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.inner.listeners.read().len())
            .finish()
    }
}
