//! The contract registry: an append-only, insertion-ordered mapping from
//! logical id to registered contract.
//!
//! One registry exists per connection lifetime; it is destroyed and rebuilt
//! with its session when the connection is replaced. Registration is the
//! single writer path; the readiness monitor reads the activation count
//! concurrently, so that count lives in an atomic.

use crate::descriptor::{ContractId, ResourceDescriptor};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use vaultscan_chain::ContractHandle;

/// Registry mutation events, observed by the readiness monitor.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A descriptor was registered (or re-registered)
    Registered(ResourceDescriptor),
    /// The connection layer confirmed a live handle for the id
    Activated(ContractId),
}

/// One registry slot.
#[derive(Debug, Clone)]
pub struct RegisteredContract {
    /// The descriptor this slot was registered with
    pub descriptor: ResourceDescriptor,
    /// Live handle, present once the connection layer activates the slot
    pub handle: Option<ContractHandle>,
    /// Whether the connection layer has confirmed the handle
    pub activated: bool,
}

/// Append-only contract registry.
pub struct ContractRegistry {
    entries: RwLock<IndexMap<ContractId, RegisteredContract>>,
    activated: AtomicUsize,
    registration_tx: mpsc::UnboundedSender<ResourceDescriptor>,
    registration_rx: Mutex<Option<mpsc::UnboundedReceiver<ResourceDescriptor>>>,
    observers: broadcast::Sender<RegistryEvent>,
}

impl ContractRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (registration_tx, registration_rx) = mpsc::unbounded_channel();
        let (observers, _) = broadcast::channel(256);
        Self {
            entries: RwLock::new(IndexMap::new()),
            activated: AtomicUsize::new(0),
            registration_tx,
            registration_rx: Mutex::new(Some(registration_rx)),
            observers,
        }
    }

    /// Registers a descriptor, scheduling handle construction by the
    /// connection layer as a side effect.
    ///
    /// Idempotent per id: re-registering an id replaces the stored
    /// descriptor. Activation state survives unless the address changed.
    /// Entries are never removed. Returns whether the id was new.
    pub fn register(&self, descriptor: ResourceDescriptor) -> bool {
        let is_new = {
            let mut entries = self.entries.write();
            match entries.get_mut(&descriptor.id) {
                Some(existing) => {
                    if existing.descriptor.address != descriptor.address {
                        debug!(
                            contract = %descriptor.id,
                            old = %existing.descriptor.address,
                            new = %descriptor.address,
                            "re-registered with a different address; activation reset"
                        );
                        if existing.activated {
                            self.activated.fetch_sub(1, Ordering::AcqRel);
                        }
                        existing.activated = false;
                        existing.handle = None;
                    }
                    existing.descriptor = descriptor.clone();
                    false
                }
                None => {
                    entries.insert(
                        descriptor.id.clone(),
                        RegisteredContract {
                            descriptor: descriptor.clone(),
                            handle: None,
                            activated: false,
                        },
                    );
                    true
                }
            }
        };

        debug!(contract = %descriptor.id, address = %descriptor.address, "registered");

        // Fire-and-forget towards the connection layer; nobody listening is
        // not an error.
        let _ = self.registration_tx.send(descriptor.clone());
        let _ = self.observers.send(RegistryEvent::Registered(descriptor));

        is_new
    }

    /// Records the connection layer's confirmation that `id` has a live,
    /// subscribed handle. Returns whether this call newly activated the
    /// slot.
    pub fn mark_activated(&self, id: &ContractId, handle: ContractHandle) -> bool {
        {
            let mut entries = self.entries.write();
            let Some(entry) = entries.get_mut(id) else {
                warn!(contract = %id, "activation reported for an unknown contract");
                return false;
            };
            if entry.activated {
                return false;
            }
            entry.activated = true;
            entry.handle = Some(handle);
        }

        self.activated.fetch_add(1, Ordering::AcqRel);
        let _ = self.observers.send(RegistryEvent::Activated(id.clone()));
        true
    }

    /// Number of slots the connection layer has confirmed live. May lag
    /// behind `len` because activation is asynchronous.
    #[must_use]
    pub fn activated_count(&self) -> usize {
        self.activated.load(Ordering::Acquire)
    }

    /// Number of registered slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &ContractId) -> bool {
        self.entries.read().contains_key(id)
    }

    /// The descriptor registered under `id`.
    #[must_use]
    pub fn get(&self, id: &ContractId) -> Option<ResourceDescriptor> {
        self.entries.read().get(id).map(|e| e.descriptor.clone())
    }

    /// The live handle for `id`, once activated.
    #[must_use]
    pub fn handle(&self, id: &ContractId) -> Option<ContractHandle> {
        self.entries.read().get(id).and_then(|e| e.handle.clone())
    }

    /// All registered ids, in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<ContractId> {
        self.entries.read().keys().cloned().collect()
    }

    /// Subscribes to registry mutation events.
    pub fn observe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.observers.subscribe()
    }

    /// Takes the registration stream the connection layer drains to build
    /// handles. Yields `None` after the first call.
    pub fn take_registration_stream(
        &self,
    ) -> Option<mpsc::UnboundedReceiver<ResourceDescriptor>> {
        self.registration_rx.lock().take()
    }
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::new()
    }
}
