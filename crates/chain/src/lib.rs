//! # Vaultscan Chain
//!
//! Chain access for the vaultscan discovery pipeline.
//!
//! This crate provides everything the discovery layer needs to talk to an
//! Ethereum-compatible node:
//!
//! - **`ChainProvider`**: the read seam (`eth_call`, `eth_getCode`,
//!   `eth_chainId`)
//! - **`EthRpcClient`**: the HTTP JSON-RPC 2.0 implementation of the seam
//! - **ABI codec**: function selectors and the small subset of call
//!   encoding/decoding the pipeline's read calls require
//! - **Contract APIs**: typed `token()` / `poolLength()` / `poolInfo(i)`
//!   reads over a [`ContractHandle`]
//! - **Connection lifecycle**: status transitions, connection identity, and
//!   the event stream consumers subscribe to

pub mod abi;
pub mod connection;
pub mod contracts;
pub mod error;
pub mod provider;

pub use connection::{
    ChainConnection, ConnectionEvent, ConnectionId, ConnectionManager, ConnectionStatus,
};
pub use contracts::{ContractHandle, PoolInfo, RewardPoolApi, VaultApi};
pub use error::{ChainError, ChainResult};
pub use provider::{ChainProvider, EthRpcClient};
