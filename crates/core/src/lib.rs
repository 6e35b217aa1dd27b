//! # Vaultscan Core
//!
//! Core primitives for the vaultscan contract discovery pipeline.
//!
//! This crate provides the fundamental types shared by the chain and
//! discovery layers:
//!
//! - **`Address`**: the 20-byte account address type
//! - **Configuration**: the static vault / reward-pool address tables and
//!   chain endpoint settings the pipeline roots on
//! - **Error Handling**: the core error type

pub mod address;
pub mod config;
pub mod error;

pub use address::{Address, ADDRESS_SIZE};
pub use config::{AppConfig, ChainSettings, RewardPoolSettings, VaultEntry, DEFAULT_RPC_URL};
pub use error::{CoreError, CoreResult};
