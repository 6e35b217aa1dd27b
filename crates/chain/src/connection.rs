//! Connection lifecycle management.
//!
//! A connection is established by probing the node's chain id, then stamped
//! with a monotonically increasing [`ConnectionId`]. The id is the
//! connection's identity: work issued under an old id must be discarded
//! once a newer connection replaces it.

use crate::error::ChainResult;
use crate::provider::ChainProvider;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No connection, none being established
    Disconnected,
    /// Connection probe in flight
    Connecting,
    /// A connection is live
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// Identity stamp for one connection lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// The numeric value of the stamp.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One live connection to a chain node.
pub struct ChainConnection {
    /// Identity stamp; equality means "same connection lifetime"
    pub id: ConnectionId,
    /// Chain id reported by the node during the connect probe
    pub chain_id: u64,
    provider: Arc<dyn ChainProvider>,
}

impl ChainConnection {
    /// The provider to issue reads through.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn ChainProvider> {
        Arc::clone(&self.provider)
    }
}

impl fmt::Debug for ChainConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConnection")
            .field("id", &self.id)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

/// Connection lifecycle events.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Status transition
    StatusChanged {
        /// The new status
        status: ConnectionStatus,
    },
    /// A new connection became current
    Established {
        /// Identity of the new connection
        id: ConnectionId,
    },
    /// A connection stopped being current
    Dropped {
        /// Identity of the dropped connection
        id: ConnectionId,
    },
}

/// Manages the current connection and its status.
///
/// Single writer (whoever drives `connect`/`disconnect`), many readers;
/// status and the current connection are read without blocking the writer
/// for long.
pub struct ConnectionManager {
    status: RwLock<ConnectionStatus>,
    current: RwLock<Option<Arc<ChainConnection>>>,
    next_id: AtomicU64,
    event_sender: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionManager {
    /// Creates a manager with no connection.
    #[must_use]
    pub fn new() -> Self {
        let (event_sender, _) = broadcast::channel(64);
        Self {
            status: RwLock::new(ConnectionStatus::Disconnected),
            current: RwLock::new(None),
            next_id: AtomicU64::new(0),
            event_sender,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// The current connection, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<ChainConnection>> {
        self.current.read().clone()
    }

    /// Identity of the current connection, if any.
    #[must_use]
    pub fn current_id(&self) -> Option<ConnectionId> {
        self.current.read().as_ref().map(|c| c.id)
    }

    /// Whether `id` still identifies the current connection. Late results
    /// from reads issued under a non-current id must be discarded.
    #[must_use]
    pub fn is_current(&self, id: ConnectionId) -> bool {
        self.current_id() == Some(id)
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_sender.subscribe()
    }

    /// Establishes a connection over the given provider.
    ///
    /// Probes the node's chain id; on success the new connection replaces
    /// any previous one (which is dropped, never reused). On failure the
    /// status rolls back to `Disconnected` and the previous connection, if
    /// any, is also torn down.
    pub async fn connect(
        &self,
        provider: Arc<dyn ChainProvider>,
    ) -> ChainResult<Arc<ChainConnection>> {
        self.set_status(ConnectionStatus::Connecting);

        let chain_id = match provider.chain_id().await {
            Ok(chain_id) => chain_id,
            Err(e) => {
                warn!(error = %e, "chain id probe failed");
                self.teardown_current();
                self.set_status(ConnectionStatus::Disconnected);
                return Err(e);
            }
        };

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let connection = Arc::new(ChainConnection {
            id,
            chain_id,
            provider,
        });

        let previous = self.current.write().replace(Arc::clone(&connection));
        if let Some(previous) = previous {
            debug!(dropped = %previous.id, "replacing previous connection");
            let _ = self
                .event_sender
                .send(ConnectionEvent::Dropped { id: previous.id });
        }

        self.set_status(ConnectionStatus::Connected);
        let _ = self.event_sender.send(ConnectionEvent::Established { id });
        info!(connection = %id, chain_id, "chain connection established");

        Ok(connection)
    }

    /// Drops the current connection, if any.
    pub fn disconnect(&self) {
        self.teardown_current();
        self.set_status(ConnectionStatus::Disconnected);
    }

    fn teardown_current(&self) {
        if let Some(previous) = self.current.write().take() {
            info!(connection = %previous.id, "chain connection dropped");
            let _ = self
                .event_sender
                .send(ConnectionEvent::Dropped { id: previous.id });
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        let changed = {
            let mut current = self.status.write();
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        };
        if changed {
            let _ = self
                .event_sender
                .send(ConnectionEvent::StatusChanged { status });
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
