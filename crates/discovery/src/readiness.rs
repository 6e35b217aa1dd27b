//! The readiness monitor: one boolean, flipped at most once per session.

use crate::orchestrator::DiscoveryOrchestrator;
use crate::registry::ContractRegistry;
use crate::state::DiscoveryState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Compares the declared closure size against the activated-handle count
/// and latches the readiness signal the first time they match after
/// discovery completes.
///
/// If activation never catches up the signal simply never fires; that is a
/// liveness property of the session, not an error.
pub struct ReadinessMonitor {
    registry: Arc<ContractRegistry>,
    orchestrator: Arc<DiscoveryOrchestrator>,
    latched: AtomicBool,
    sender: watch::Sender<bool>,
}

impl ReadinessMonitor {
    /// Creates a monitor over one session's registry and orchestrator.
    #[must_use]
    pub fn new(registry: Arc<ContractRegistry>, orchestrator: Arc<DiscoveryOrchestrator>) -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            registry,
            orchestrator,
            latched: AtomicBool::new(false),
            sender,
        }
    }

    /// Evaluates the readiness condition.
    ///
    /// True once discovery is complete and every declared descriptor has
    /// been activated. Latches on the first true evaluation; every later
    /// call is an idempotent no-op returning true.
    pub fn evaluate(&self) -> bool {
        if self.latched.load(Ordering::Acquire) {
            return true;
        }

        if self.orchestrator.state() != DiscoveryState::Complete {
            return false;
        }
        let Some(total) = self.orchestrator.total_declared() else {
            return false;
        };
        if self.registry.activated_count() != total {
            return false;
        }

        if !self.latched.swap(true, Ordering::AcqRel) {
            let _ = self.sender.send(true);
            info!(total, "all declared contracts activated; session initialized");
        }
        true
    }

    /// Whether the signal has latched, without re-evaluating.
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.latched.load(Ordering::Acquire)
    }

    /// Subscribes to the readiness signal. The value moves `false -> true`
    /// at most once per session.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    /// Spawns the observer task that re-evaluates after every registry
    /// mutation.
    pub fn spawn_observer(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        let mut events = monitor.registry.observe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(_) => {
                        monitor.evaluate();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "registry event stream lagged; re-evaluating");
                        monitor.evaluate();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
