//! Typed contract read APIs.
//!
//! Each API wraps a [`ContractHandle`] and exposes the one or two reads the
//! discovery pipeline issues against that contract kind.

use crate::abi;
use crate::error::ChainResult;
use crate::provider::ChainProvider;
use std::sync::Arc;
use vaultscan_core::Address;

/// Canonical signature of the vault's underlying-token getter.
pub const SIG_TOKEN: &str = "token()";

/// Canonical signature of the reward pool's slot-count getter.
pub const SIG_POOL_LENGTH: &str = "poolLength()";

/// Canonical signature of the reward pool's per-slot getter.
pub const SIG_POOL_INFO: &str = "poolInfo(uint256)";

/// A callable binding to one deployed contract: address plus provider.
#[derive(Clone)]
pub struct ContractHandle {
    address: Address,
    provider: Arc<dyn ChainProvider>,
}

impl ContractHandle {
    /// Binds a provider to a contract address.
    #[must_use]
    pub fn new(provider: Arc<dyn ChainProvider>, address: Address) -> Self {
        Self { address, provider }
    }

    /// The bound contract address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Issues a read call with the given calldata and returns the raw
    /// return data.
    pub async fn read(&self, calldata: Vec<u8>) -> ChainResult<Vec<u8>> {
        self.provider.call(self.address, calldata).await
    }
}

impl std::fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Read API for vault contracts.
pub struct VaultApi {
    handle: ContractHandle,
}

impl VaultApi {
    /// Wraps an existing handle.
    #[must_use]
    pub fn new(handle: ContractHandle) -> Self {
        Self { handle }
    }

    /// Binds a provider to a vault address.
    #[must_use]
    pub fn at(provider: Arc<dyn ChainProvider>, address: Address) -> Self {
        Self::new(ContractHandle::new(provider, address))
    }

    /// Reads the vault's underlying token address via `token()`.
    pub async fn underlying_token(&self) -> ChainResult<Address> {
        let data = self.handle.read(abi::encode_call(SIG_TOKEN)).await?;
        abi::decode_address(&data)
    }
}

/// One reward-pool slot, as far as discovery is concerned.
///
/// `poolInfo` returns a larger struct; only the LP token address is
/// consumed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolInfo {
    /// Address of the slot's LP token contract
    pub lp_token: Address,
}

/// Read API for the reward-pool contract.
pub struct RewardPoolApi {
    handle: ContractHandle,
}

impl RewardPoolApi {
    /// Wraps an existing handle.
    #[must_use]
    pub fn new(handle: ContractHandle) -> Self {
        Self { handle }
    }

    /// Binds a provider to the reward-pool address.
    #[must_use]
    pub fn at(provider: Arc<dyn ChainProvider>, address: Address) -> Self {
        Self::new(ContractHandle::new(provider, address))
    }

    /// Reads the number of pool slots via `poolLength()`.
    pub async fn pool_length(&self) -> ChainResult<u64> {
        let data = self.handle.read(abi::encode_call(SIG_POOL_LENGTH)).await?;
        abi::decode_u64(&data)
    }

    /// Reads one pool slot via `poolInfo(uint256)`.
    pub async fn pool_info(&self, index: u64) -> ChainResult<PoolInfo> {
        let data = self
            .handle
            .read(abi::encode_call_u256(SIG_POOL_INFO, index))
            .await?;
        let lp_token = abi::decode_address_at(&data, 0)?;
        Ok(PoolInfo { lp_token })
    }
}
