//! Resource descriptors and structured contract identifiers.

use std::fmt;
use std::sync::Arc;
use vaultscan_core::Address;

/// The interface a registered contract is expected to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// A vault contract
    Vault,
    /// An ERC-20 token contract
    Token,
    /// The reward-pool contract
    RewardPool,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::Vault => write!(f, "vault"),
            ContractKind::Token => write!(f, "token"),
            ContractKind::RewardPool => write!(f, "reward-pool"),
        }
    }
}

/// Structured logical identifier for one registered contract.
///
/// The registry is keyed by this, not by generated strings, so a lookup
/// can never silently miss on a typo'd name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContractId {
    /// A configured vault, by name
    Vault(Arc<str>),
    /// A vault's own share token, by vault name
    ShareToken(Arc<str>),
    /// A vault's underlying token, by vault name
    Token(Arc<str>),
    /// The single reward-pool contract
    RewardPool,
    /// The LP token of one reward-pool slot, by slot index
    PoolLp(u64),
}

impl ContractId {
    /// Vault id from a name.
    pub fn vault(name: impl Into<Arc<str>>) -> Self {
        Self::Vault(name.into())
    }

    /// Share-token id from a vault name.
    pub fn share_token(name: impl Into<Arc<str>>) -> Self {
        Self::ShareToken(name.into())
    }

    /// Underlying-token id from a vault name.
    pub fn token(name: impl Into<Arc<str>>) -> Self {
        Self::Token(name.into())
    }

    /// Pool LP-token id from a slot index.
    #[must_use]
    pub fn pool_lp(index: u64) -> Self {
        Self::PoolLp(index)
    }

    /// The interface kind behind this id.
    #[must_use]
    pub fn kind(&self) -> ContractKind {
        match self {
            ContractId::Vault(_) => ContractKind::Vault,
            ContractId::ShareToken(_) | ContractId::Token(_) | ContractId::PoolLp(_) => {
                ContractKind::Token
            }
            ContractId::RewardPool => ContractKind::RewardPool,
        }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractId::Vault(name) => write!(f, "vault:{name}"),
            ContractId::ShareToken(name) => write!(f, "share-token:{name}"),
            ContractId::Token(name) => write!(f, "token:{name}"),
            ContractId::RewardPool => write!(f, "reward-pool"),
            ContractId::PoolLp(index) => write!(f, "pool-lp:{index}"),
        }
    }
}

/// Identifies one contract to be registered: id plus address.
///
/// Immutable once created. Root descriptors come from configuration;
/// derived descriptors are built from values read off already-registered
/// contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Logical identifier
    pub id: ContractId,
    /// On-chain address
    pub address: Address,
}

impl ResourceDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(id: ContractId, address: Address) -> Self {
        Self { id, address }
    }

    /// The interface kind behind this descriptor.
    #[must_use]
    pub fn kind(&self) -> ContractKind {
        self.id.kind()
    }
}
