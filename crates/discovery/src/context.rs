//! Per-connection session wiring and the consumer-facing context.
//!
//! A session bundles the registry / state / readiness triple for exactly
//! one connection lifetime; replacing the connection replaces the whole
//! session, never parts of it.

use crate::activator::HandleActivator;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::orchestrator::{DiscoveryOrchestrator, DiscoverySummary};
use crate::readiness::ReadinessMonitor;
use crate::registry::ContractRegistry;
use crate::state::DiscoveryState;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use vaultscan_chain::{ChainConnection, ChainProvider, ConnectionManager, ConnectionStatus};
use vaultscan_core::AppConfig;

/// Everything bound to one connection lifetime.
pub struct DiscoverySession {
    connection: Arc<ChainConnection>,
    registry: Arc<ContractRegistry>,
    orchestrator: Arc<DiscoveryOrchestrator>,
    readiness: Arc<ReadinessMonitor>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DiscoverySession {
    /// Builds the session triple and spawns its background workers: the
    /// handle activator and the readiness observer.
    #[must_use]
    pub fn new(
        config: AppConfig,
        connection: Arc<ChainConnection>,
        manager: Arc<ConnectionManager>,
    ) -> Arc<Self> {
        let registry = Arc::new(ContractRegistry::new());
        let orchestrator = Arc::new(DiscoveryOrchestrator::new(
            config,
            Arc::clone(&connection),
            Arc::clone(&manager),
            Arc::clone(&registry),
        ));
        let readiness = Arc::new(ReadinessMonitor::new(
            Arc::clone(&registry),
            Arc::clone(&orchestrator),
        ));

        let mut tasks = Vec::with_capacity(2);
        if let Some(stream) = registry.take_registration_stream() {
            tasks.push(HandleActivator::spawn(
                stream,
                Arc::clone(&registry),
                Arc::clone(&connection),
                manager,
            ));
        }
        tasks.push(readiness.spawn_observer());

        Arc::new(Self {
            connection,
            registry,
            orchestrator,
            readiness,
            tasks: Mutex::new(tasks),
        })
    }

    /// Runs discovery for this session and re-evaluates readiness once the
    /// pipeline has declared its closure.
    pub async fn discover(&self) -> DiscoveryResult<Option<DiscoverySummary>> {
        let outcome = self.orchestrator.run().await;
        self.readiness.evaluate();
        outcome
    }

    /// The connection this session is bound to.
    #[must_use]
    pub fn connection(&self) -> &Arc<ChainConnection> {
        &self.connection
    }

    /// This session's registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ContractRegistry> {
        &self.registry
    }

    /// Current discovery state.
    #[must_use]
    pub fn state(&self) -> DiscoveryState {
        self.orchestrator.state()
    }

    /// Total descriptors declared, once discovery has completed.
    #[must_use]
    pub fn total_declared(&self) -> Option<usize> {
        self.orchestrator.total_declared()
    }

    /// Whether the readiness signal has fired for this session.
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.readiness.evaluate()
    }

    /// Subscribes to this session's readiness signal.
    pub fn readiness(&self) -> watch::Receiver<bool> {
        self.readiness.subscribe()
    }

    /// Aborts the session's background workers. Idempotent; also runs on
    /// drop.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.is_empty() {
            return;
        }
        debug!(connection = %self.connection.id, "shutting down discovery session");
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for DiscoverySession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The consumer-facing context: connection status, readiness, and the
/// `connect` entry point, with one session per connection lifetime behind
/// it.
pub struct VaultscanContext {
    config: AppConfig,
    manager: Arc<ConnectionManager>,
    session: RwLock<Option<Arc<DiscoverySession>>>,
}

impl VaultscanContext {
    /// Creates a context with no connection.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            manager: Arc::new(ConnectionManager::new()),
            session: RwLock::new(None),
        }
    }

    /// The connection manager behind this context.
    #[must_use]
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.manager.status()
    }

    /// The current session, if a connection has been established.
    #[must_use]
    pub fn session(&self) -> Option<Arc<DiscoverySession>> {
        self.session.read().clone()
    }

    /// Current discovery state; `Idle` when no session exists.
    #[must_use]
    pub fn state(&self) -> DiscoveryState {
        self.session()
            .map_or(DiscoveryState::Idle, |session| session.state())
    }

    /// Whether the current session's readiness signal has fired.
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.session().is_some_and(|session| session.initialized())
    }

    /// Whether work towards readiness is still in progress: connecting, or
    /// connected but not yet initialized.
    #[must_use]
    pub fn loading(&self) -> bool {
        match self.status() {
            ConnectionStatus::Connecting => true,
            ConnectionStatus::Connected => !self.initialized(),
            ConnectionStatus::Disconnected => false,
        }
    }

    /// Subscribes to the current session's readiness signal.
    #[must_use]
    pub fn readiness(&self) -> Option<watch::Receiver<bool>> {
        self.session().map(|session| session.readiness())
    }

    /// Establishes a connection, replaces any previous session with a
    /// fresh one, and runs discovery on it.
    ///
    /// The previous session's workers are stopped before the new session
    /// starts; nothing carries over across connections.
    pub async fn connect(
        &self,
        provider: Arc<dyn ChainProvider>,
    ) -> DiscoveryResult<Arc<DiscoverySession>> {
        let connection = self
            .manager
            .connect(provider)
            .await
            .map_err(DiscoveryError::from)?;

        let session = DiscoverySession::new(
            self.config.clone(),
            connection,
            Arc::clone(&self.manager),
        );

        let previous = self.session.write().replace(Arc::clone(&session));
        if let Some(previous) = previous {
            previous.shutdown();
        }

        session.discover().await?;
        Ok(session)
    }

    /// Tears down the current session and connection.
    pub fn disconnect(&self) {
        if let Some(session) = self.session.write().take() {
            session.shutdown();
        }
        self.manager.disconnect();
    }
}
