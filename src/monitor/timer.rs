//! Background tick actor.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::MonitorState;
use crate::{clog_debug, clog_trace};

/// Handle to a running actor, used for shutdown.
pub struct ActorHandle {
    cancel: CancellationToken,
}

impl ActorHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Signal the actor to stop. Any tick already running completes.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Actor that runs a monitor tick every `interval`.
///
/// A tick that overruns the interval causes the missed ticks to be skipped
/// rather than queued.
pub(super) struct TickActor {
    state: Arc<Mutex<MonitorState>>,
    interval: Duration,
}

impl TickActor {
    pub(super) fn new(state: Arc<Mutex<MonitorState>>, interval: Duration) -> Self {
        Self { state, interval }
    }

    pub(super) fn spawn(self) -> ActorHandle {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        clog_debug!("TickActor::spawn interval={:?}", self.interval);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_clone.cancelled() => {
                        clog_debug!("TickActor cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        clog_trace!("TickActor: tick");
                        self.state.lock().await.tick(Utc::now()).await;
                    }
                }
            }
        });

        ActorHandle::new(cancel)
    }
}
