//! The discovery orchestrator: computes the full resource closure and
//! drives the registry to hold exactly that closure, once per connection.

use crate::descriptor::{ContractId, ResourceDescriptor};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::registry::ContractRegistry;
use crate::state::{DiscoveryState, StateCell};
use futures::future;
use std::sync::Arc;
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use vaultscan_chain::{ChainConnection, ConnectionManager, RewardPoolApi, VaultApi};
use vaultscan_core::{Address, AppConfig};

/// Counts from one completed discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Vault roots registered
    pub vaults: usize,
    /// Share-token roots registered
    pub share_tokens: usize,
    /// Underlying tokens discovered and registered
    pub tokens: usize,
    /// Pool LP tokens discovered and registered
    pub pool_lps: usize,
    /// Vaults whose token read failed; their tokens are absent from the closure
    pub skipped_tokens: usize,
    /// Pool slots whose info read failed; their LP tokens are absent
    pub skipped_pools: usize,
    /// Total descriptors declared across all phases
    pub total: usize,
}

/// Drives the two-phase discovery pipeline for one connection lifetime.
///
/// The orchestrator owns the registry's write path and the state cell; both
/// are torn down with it when the connection is replaced.
pub struct DiscoveryOrchestrator {
    config: AppConfig,
    connection: Arc<ChainConnection>,
    manager: Arc<ConnectionManager>,
    registry: Arc<ContractRegistry>,
    state: StateCell,
    total_declared: OnceLock<usize>,
}

impl DiscoveryOrchestrator {
    /// Creates an orchestrator bound to one connection.
    #[must_use]
    pub fn new(
        config: AppConfig,
        connection: Arc<ChainConnection>,
        manager: Arc<ConnectionManager>,
        registry: Arc<ContractRegistry>,
    ) -> Self {
        Self {
            config,
            connection,
            manager,
            registry,
            state: StateCell::new(),
            total_declared: OnceLock::new(),
        }
    }

    /// Current pipeline state.
    #[must_use]
    pub fn state(&self) -> DiscoveryState {
        self.state.current()
    }

    /// Total descriptors declared, once discovery has completed.
    #[must_use]
    pub fn total_declared(&self) -> Option<usize> {
        self.total_declared.get().copied()
    }

    /// The registry this orchestrator populates.
    #[must_use]
    pub fn registry(&self) -> &Arc<ContractRegistry> {
        &self.registry
    }

    /// The connection this orchestrator runs against.
    #[must_use]
    pub fn connection(&self) -> &Arc<ChainConnection> {
        &self.connection
    }

    /// Runs the pipeline.
    ///
    /// Returns `Ok(None)` when a run is already in flight or has completed
    /// for this connection; the call is then a no-op. This is what keeps a
    /// repeatedly-firing status signal from registering anything twice.
    pub async fn run(&self) -> DiscoveryResult<Option<DiscoverySummary>> {
        self.ensure_current()?;

        if !self.state.begin() {
            debug!(
                state = %self.state.current(),
                "discovery already started for this connection; ignoring"
            );
            return Ok(None);
        }

        let mut summary = DiscoverySummary::default();
        self.register_roots(&mut summary);
        self.advance(DiscoveryState::DiscoveringRoots, DiscoveryState::DiscoveringDerived)?;

        let provider = self.connection.provider();

        // Tier 1: one token() read per vault, all concurrent, settled as a
        // unit before anything else proceeds.
        let token_reads = self.config.vaults.iter().map(|entry| {
            let api = VaultApi::at(provider.clone(), entry.vault);
            let name = entry.name.clone();
            async move {
                let result = api.underlying_token().await;
                (name, result)
            }
        });
        let token_results = future::join_all(token_reads).await;
        self.ensure_current()?;

        // Tier 2: pool count first, then one poolInfo(i) read per slot.
        let pool_address = self.config.reward_pool.address;
        let pool_api = RewardPoolApi::at(provider.clone(), pool_address);
        let pool_count = match pool_api.pool_length().await {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    pool = %pool_address,
                    error = %e,
                    "pool length read failed; skipping pool discovery"
                );
                0
            }
        };
        self.ensure_current()?;

        let pool_results = if pool_count > 0 {
            let reads = (0..pool_count).map(|index| {
                let api = RewardPoolApi::at(provider.clone(), pool_address);
                async move {
                    let result = api.pool_info(index).await;
                    (index, result)
                }
            });
            future::join_all(reads).await
        } else {
            Vec::new()
        };
        self.ensure_current()?;

        // Register the derived generation.
        for (name, result) in token_results {
            match result {
                Ok(address) => {
                    self.register_derived(ContractId::token(name.as_str()), address);
                    summary.tokens += 1;
                }
                Err(e) => {
                    warn!(
                        vault = %name,
                        error = %e,
                        "underlying token read failed; omitting token from the closure"
                    );
                    summary.skipped_tokens += 1;
                }
            }
        }

        for (index, result) in pool_results {
            match result {
                Ok(info) => {
                    self.register_derived(ContractId::pool_lp(index), info.lp_token);
                    summary.pool_lps += 1;
                }
                Err(e) => {
                    warn!(
                        pool_index = index,
                        error = %e,
                        "pool info read failed; omitting LP token from the closure"
                    );
                    summary.skipped_pools += 1;
                }
            }
        }

        // Completion: declare the closure size, then flip the state.
        let total = self.registry.len();
        let _ = self.total_declared.set(total);
        summary.total = total;
        self.advance(DiscoveryState::DiscoveringDerived, DiscoveryState::Complete)?;

        info!(
            connection = %self.connection.id,
            total,
            vaults = summary.vaults,
            share_tokens = summary.share_tokens,
            tokens = summary.tokens,
            pool_lps = summary.pool_lps,
            skipped = summary.skipped_tokens + summary.skipped_pools,
            "contract discovery complete"
        );

        Ok(Some(summary))
    }

    fn register_roots(&self, summary: &mut DiscoverySummary) {
        for entry in &self.config.vaults {
            self.registry.register(ResourceDescriptor::new(
                ContractId::vault(entry.name.as_str()),
                entry.vault,
            ));
            summary.vaults += 1;

            if let Some(share_token) = entry.share_token {
                self.registry.register(ResourceDescriptor::new(
                    ContractId::share_token(entry.name.as_str()),
                    share_token,
                ));
                summary.share_tokens += 1;
            }
        }

        self.registry.register(ResourceDescriptor::new(
            ContractId::RewardPool,
            self.config.reward_pool.address,
        ));

        info!(
            connection = %self.connection.id,
            vaults = summary.vaults,
            share_tokens = summary.share_tokens,
            "root contracts registered"
        );
    }

    fn register_derived(&self, id: ContractId, address: Address) {
        self.registry.register(ResourceDescriptor::new(id, address));
    }

    fn advance(&self, from: DiscoveryState, to: DiscoveryState) -> DiscoveryResult<()> {
        if self.state.advance(from, to) {
            Ok(())
        } else {
            Err(DiscoveryError::InvalidTransition { from, to })
        }
    }

    /// Aborts when this orchestrator's connection is no longer the
    /// manager's current one. Called after every await so a late-settling
    /// read can never mutate state under a new connection.
    fn ensure_current(&self) -> DiscoveryResult<()> {
        match self.manager.current_id() {
            Some(id) if id == self.connection.id => Ok(()),
            Some(_) => {
                debug!(
                    connection = %self.connection.id,
                    "connection replaced mid-discovery; abandoning run"
                );
                Err(DiscoveryError::ConnectionReplaced)
            }
            None => Err(DiscoveryError::NotConnected),
        }
    }
}
