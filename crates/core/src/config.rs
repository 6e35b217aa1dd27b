//! Configuration for the vaultscan discovery pipeline.
//!
//! The pipeline roots on a static table of vault contracts plus one reward
//! pool contract. Everything else (underlying tokens, pool LP tokens) is
//! discovered at runtime through those roots.

use crate::address::Address;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default JSON-RPC endpoint for a local development chain.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9545";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// One configured vault root.
///
/// `share_token` is the vault's own deposit/withdraw token; when the address
/// is known ahead of time it is registered together with the vault. The
/// vault's *underlying* token is never configured here; it is always
/// discovered through the vault contract itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    /// Logical vault name, e.g. `USDC`
    pub name: String,
    /// Address of the vault contract
    pub vault: Address,
    /// Address of the vault's share token, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_token: Option<Address>,
}

/// The reward-pool root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPoolSettings {
    /// Address of the reward-pool contract
    pub address: Address,
}

/// Chain endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSettings {
    /// JSON-RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Full application configuration.
///
/// ```toml
/// [chain]
/// rpc_url = "http://127.0.0.1:9545"
///
/// [[vaults]]
/// name = "USDC"
/// vault = "0xf7a280f71f3a31e4eeba6dec7923768f0f1b91ae"
/// share_token = "0x597ad1e0c13bfe8025993d9e79c69e1c0233522e"
///
/// [reward_pool]
/// address = "0x7a942ff3b4291bef302ba5bea050cba3e2c09c61"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chain endpoint settings
    #[serde(default)]
    pub chain: ChainSettings,
    /// Configured vault roots
    #[serde(default)]
    pub vaults: Vec<VaultEntry>,
    /// The reward-pool root
    pub reward_pool: RewardPoolSettings,
}

/// Built-in deployment table for the local development chain:
/// `(name, vault address, share token address)`.
const LOCAL_DEPLOYMENT: &[(&str, &str, &str)] = &[
    (
        "USDC",
        "0xF7a280F71f3a31e4eeBa6deC7923768f0f1B91Ae",
        "0x597ad1e0c13bfe8025993d9e79c69e1c0233522e",
    ),
    (
        "YCRV",
        "0xeb93eB72947C74a251e90B3cd609A97543a134Ee",
        "0x5dbcF33D8c2E976c6b560249878e6F1491Bca25c",
    ),
    (
        "TUSD",
        "0xA7FEEe9E857e8A268f1fEDa32b0bfDe48c2562D5",
        "0x37d19d1c4E1fa9DC47bD1eA12f742a0887eDa74a",
    ),
    (
        "DAI",
        "0x92970B7c3a5Fa9079996A530E9Bc4A463EF2146F",
        "0xACd43E627e64355f1861cEC6d3a6688B31a6F952",
    ),
    (
        "USDT",
        "0x8E9550F541Ab6a9ebdE3b4be01395D93a96379BA",
        "0x2f08119C6f07c006695E079AAFc638b8789FAf18",
    ),
    (
        "YFI",
        "0xDe495d944495513949cbF151F3b79B0c8e0C9F9F",
        "0xBA2E7Fed597fd0E3e70f5130BcDbbFE06bB94fe1",
    ),
    (
        "crvBUSD",
        "0xC197baA12F133B4187573572AA7f624B126877fF",
        "0x2994529C0652D127b7842094103715ec5299bBed",
    ),
    (
        "crvBTC",
        "0x53aeA77b1692a821f09b8147171B581bB062D407",
        "0x7Ff566E1d69DEfF32a7b244aE7276b9f90e9D0f6",
    ),
    (
        "WETH",
        "0x1574db2A77D4D5A1104A343c24A51ea955565C71",
        "0xe1237aA7f535b0CC33Fd973D66cBf830354D16c7",
    ),
];

/// Reward-pool address in the local deployment.
const LOCAL_REWARD_POOL: &str = "0x7A942fF3B4291bEf302ba5BEA050CBa3E2c09C61";

impl AppConfig {
    /// Returns the built-in configuration for the local development chain.
    #[must_use]
    pub fn default_local() -> Self {
        let vaults = LOCAL_DEPLOYMENT
            .iter()
            .map(|(name, vault, share_token)| VaultEntry {
                name: (*name).to_string(),
                vault: vault.parse().expect("built-in vault address is valid"),
                share_token: Some(
                    share_token
                        .parse()
                        .expect("built-in share token address is valid"),
                ),
            })
            .collect();

        Self {
            chain: ChainSettings::default(),
            vaults,
            reward_pool: RewardPoolSettings {
                address: LOCAL_REWARD_POOL
                    .parse()
                    .expect("built-in reward pool address is valid"),
            },
        }
    }

    /// Parses a configuration from a TOML string and validates it.
    pub fn from_toml_str(s: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file and validates it.
    pub fn from_toml_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Checks the configuration for semantic errors: duplicate vault names,
    /// zero addresses, and an empty endpoint.
    pub fn validate(&self) -> CoreResult<()> {
        if self.chain.rpc_url.trim().is_empty() {
            return Err(CoreError::config("chain.rpc_url must not be empty"));
        }

        let mut seen = HashSet::new();
        for entry in &self.vaults {
            if entry.name.trim().is_empty() {
                return Err(CoreError::config("vault name must not be empty"));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(CoreError::config(format!(
                    "duplicate vault name: {}",
                    entry.name
                )));
            }
            if entry.vault.is_zero() {
                return Err(CoreError::config(format!(
                    "vault {} has a zero address",
                    entry.name
                )));
            }
            if let Some(token) = entry.share_token {
                if token.is_zero() {
                    return Err(CoreError::config(format!(
                        "vault {} has a zero share token address",
                        entry.name
                    )));
                }
            }
        }

        if self.reward_pool.address.is_zero() {
            return Err(CoreError::config("reward_pool.address must not be zero"));
        }

        Ok(())
    }
}
