//! Handle activation: the connection-layer side of registration.
//!
//! Registering a descriptor schedules handle construction; this worker
//! performs it. A descriptor counts as activated only once the node
//! confirms deployed code at its address, at which point the registry is
//! handed the live handle.

use crate::descriptor::ResourceDescriptor;
use crate::registry::ContractRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vaultscan_chain::{ChainConnection, ConnectionManager, ContractHandle};

/// Drains a registry's registration stream and activates each slot.
pub struct HandleActivator;

impl HandleActivator {
    /// Spawns the activation worker for one connection lifetime.
    ///
    /// The worker exits when the registration stream closes or its
    /// connection stops being current; results for a replaced connection
    /// are discarded, never reported.
    pub fn spawn(
        mut registrations: mpsc::UnboundedReceiver<ResourceDescriptor>,
        registry: Arc<ContractRegistry>,
        connection: Arc<ChainConnection>,
        manager: Arc<ConnectionManager>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(descriptor) = registrations.recv().await {
                let provider = connection.provider();
                let code = provider.get_code(descriptor.address).await;

                if !manager.is_current(connection.id) {
                    debug!(
                        connection = %connection.id,
                        "connection replaced; discarding activation work"
                    );
                    break;
                }

                match code {
                    Ok(code) if !code.is_empty() => {
                        let handle = ContractHandle::new(provider, descriptor.address);
                        registry.mark_activated(&descriptor.id, handle);
                        debug!(contract = %descriptor.id, "activated");
                    }
                    Ok(_) => {
                        warn!(
                            contract = %descriptor.id,
                            address = %descriptor.address,
                            "no code at address; contract left unactivated"
                        );
                    }
                    Err(e) => {
                        warn!(
                            contract = %descriptor.id,
                            address = %descriptor.address,
                            error = %e,
                            "activation probe failed; contract left unactivated"
                        );
                    }
                }
            }

            debug!(connection = %connection.id, "activator exiting");
        })
    }
}
