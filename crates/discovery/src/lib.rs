//! # Vaultscan Discovery
//!
//! The contract discovery pipeline: given a set of configured vault and
//! reward-pool roots, register them, walk each root to discover its
//! dependent contracts (underlying tokens, pool LP tokens), register
//! those, and flip a single readiness signal once every registered
//! contract has a confirmed live handle.
//!
//! One [`DiscoverySession`] exists per connection lifetime; the session
//! owns the registry / state / readiness triple and is replaced wholesale
//! on reconnect. [`VaultscanContext`] is the consumer surface over the
//! whole lifecycle.

pub mod activator;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod readiness;
pub mod registry;
pub mod state;

pub use activator::HandleActivator;
pub use context::{DiscoverySession, VaultscanContext};
pub use descriptor::{ContractId, ContractKind, ResourceDescriptor};
pub use error::{DiscoveryError, DiscoveryResult};
pub use orchestrator::{DiscoveryOrchestrator, DiscoverySummary};
pub use readiness::ReadinessMonitor;
pub use registry::{ContractRegistry, RegisteredContract, RegistryEvent};
pub use state::{DiscoveryState, StateCell};
