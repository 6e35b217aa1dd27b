//! End-to-end pipeline tests over an in-memory chain provider.
//!
//! The fake provider answers `eth_call` from a scripted table keyed by
//! (address, calldata), reports code for every address unless told to
//! withhold it, and can gate reads behind a switch so tests can observe
//! the pipeline mid-flight.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use vaultscan_chain::{
    abi,
    contracts::{SIG_POOL_INFO, SIG_POOL_LENGTH, SIG_TOKEN},
    ChainError, ChainProvider, ChainResult, ConnectionManager, ConnectionStatus,
};
use vaultscan_core::{Address, AppConfig, ChainSettings, RewardPoolSettings, VaultEntry};
use vaultscan_discovery::{
    ContractId, DiscoveryError, DiscoverySession, DiscoveryState, RegistryEvent,
    ResourceDescriptor, VaultscanContext,
};

struct FakeProvider {
    chain_id: u64,
    responses: Mutex<HashMap<(Address, Vec<u8>), ChainResult<Vec<u8>>>>,
    codeless: Mutex<HashSet<Address>>,
    gate: Mutex<Option<watch::Receiver<bool>>>,
}

impl FakeProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            chain_id: 1337,
            responses: Mutex::new(HashMap::new()),
            codeless: Mutex::new(HashSet::new()),
            gate: Mutex::new(None),
        })
    }

    fn respond(&self, to: Address, calldata: Vec<u8>, result: ChainResult<Vec<u8>>) {
        self.responses.lock().unwrap().insert((to, calldata), result);
    }

    fn withhold_code(&self, at: Address) {
        self.codeless.lock().unwrap().insert(at);
    }

    /// Makes every `call` wait until the gate switches to true.
    fn set_gate(&self, gate: watch::Receiver<bool>) {
        *self.gate.lock().unwrap() = Some(gate);
    }
}

#[async_trait]
impl ChainProvider for FakeProvider {
    async fn call(&self, to: Address, data: Vec<u8>) -> ChainResult<Vec<u8>> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(mut gate) = gate {
            while !*gate.borrow() {
                if gate.changed().await.is_err() {
                    break;
                }
            }
        }

        match self.responses.lock().unwrap().get(&(to, data)) {
            Some(result) => result.clone(),
            None => Err(ChainError::Rpc {
                code: -32000,
                message: "execution reverted".to_string(),
            }),
        }
    }

    async fn get_code(&self, at: Address) -> ChainResult<Vec<u8>> {
        if self.codeless.lock().unwrap().contains(&at) {
            Ok(Vec::new())
        } else {
            Ok(vec![0x60, 0x80, 0x60, 0x40])
        }
    }

    async fn chain_id(&self) -> ChainResult<u64> {
        Ok(self.chain_id)
    }
}

fn addr(last: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = last;
    Address::from_array(bytes)
}

fn vault_addr(index: usize) -> Address {
    addr(10 + index as u8)
}

fn token_addr(index: usize) -> Address {
    addr(100 + index as u8)
}

fn lp_addr(index: usize) -> Address {
    addr(210 + index as u8)
}

fn pool_addr() -> Address {
    addr(200)
}

fn word_address(address: Address) -> Vec<u8> {
    let mut word = vec![0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn word_u64(value: u64) -> Vec<u8> {
    let mut word = vec![0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// `poolInfo` returns a multi-word struct; discovery only reads word 0.
fn pool_info_return(lp_token: Address) -> Vec<u8> {
    let mut data = word_address(lp_token);
    data.extend_from_slice(&word_u64(5000));
    data
}

fn config_with_vaults(names: &[&str]) -> AppConfig {
    AppConfig {
        chain: ChainSettings::default(),
        vaults: names
            .iter()
            .enumerate()
            .map(|(i, name)| VaultEntry {
                name: (*name).to_string(),
                vault: vault_addr(i),
                share_token: None,
            })
            .collect(),
        reward_pool: RewardPoolSettings {
            address: pool_addr(),
        },
    }
}

fn stub_vault_tokens(provider: &FakeProvider, config: &AppConfig) {
    for (i, entry) in config.vaults.iter().enumerate() {
        provider.respond(
            entry.vault,
            abi::encode_call(SIG_TOKEN),
            Ok(word_address(token_addr(i))),
        );
    }
}

fn stub_pools(provider: &FakeProvider, count: u64) {
    provider.respond(
        pool_addr(),
        abi::encode_call(SIG_POOL_LENGTH),
        Ok(word_u64(count)),
    );
    for index in 0..count {
        provider.respond(
            pool_addr(),
            abi::encode_call_u256(SIG_POOL_INFO, index),
            Ok(pool_info_return(lp_addr(index as usize))),
        );
    }
}

async fn session_for(
    config: AppConfig,
    provider: Arc<FakeProvider>,
) -> (Arc<ConnectionManager>, Arc<DiscoverySession>) {
    let manager = Arc::new(ConnectionManager::new());
    let connection = manager.connect(provider).await.unwrap();
    let session = DiscoverySession::new(config, connection, Arc::clone(&manager));
    (manager, session)
}

async fn wait_ready(session: &DiscoverySession) {
    let mut ready = session.readiness();
    timeout(Duration::from_secs(2), async {
        while !*ready.borrow() {
            ready.changed().await.unwrap();
        }
    })
    .await
    .expect("readiness signal should fire");
}

#[tokio::test]
async fn closure_covers_roots_and_both_derived_tiers() {
    let config = config_with_vaults(&["USDC", "DAI", "WETH"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 2);

    let (_manager, session) = session_for(config, provider).await;
    let summary = session.discover().await.unwrap().unwrap();

    // 3 vaults + 3 tokens + 1 pool contract + 2 LP tokens
    assert_eq!(summary.vaults, 3);
    assert_eq!(summary.tokens, 3);
    assert_eq!(summary.pool_lps, 2);
    assert_eq!(summary.skipped_tokens, 0);
    assert_eq!(summary.skipped_pools, 0);
    assert_eq!(summary.total, 9);

    assert_eq!(session.state(), DiscoveryState::Complete);
    assert_eq!(session.total_declared(), Some(9));
    assert_eq!(session.registry().len(), 9);

    let registry = session.registry();
    assert!(registry.contains(&ContractId::vault("USDC")));
    assert!(registry.contains(&ContractId::token("DAI")));
    assert!(registry.contains(&ContractId::RewardPool));
    assert!(registry.contains(&ContractId::pool_lp(0)));
    assert!(registry.contains(&ContractId::pool_lp(1)));
    assert_eq!(
        registry.get(&ContractId::token("USDC")).unwrap().address,
        token_addr(0)
    );
}

#[tokio::test]
async fn share_token_roots_are_registered_alongside_vaults() {
    let mut config = config_with_vaults(&["USDC", "DAI"]);
    config.vaults[0].share_token = Some(addr(50));
    config.vaults[1].share_token = Some(addr(51));
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 1);

    let (_manager, session) = session_for(config, provider).await;
    let summary = session.discover().await.unwrap().unwrap();

    // 2 vaults + 2 share tokens + 2 tokens + 1 pool contract + 1 LP token
    assert_eq!(summary.share_tokens, 2);
    assert_eq!(summary.total, 8);
    assert!(session
        .registry()
        .contains(&ContractId::share_token("USDC")));
}

#[tokio::test]
async fn repeated_invocations_register_each_descriptor_once() {
    let config = config_with_vaults(&["USDC", "DAI"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 1);

    let (gate_tx, gate_rx) = watch::channel(false);
    provider.set_gate(gate_rx);

    let (_manager, session) = session_for(config, provider).await;
    let mut events = session.registry().observe();

    let background = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.discover().await })
    };

    // Let the run reach the gated derived reads, then re-invoke twice.
    sleep(Duration::from_millis(50)).await;
    assert_eq!(session.state(), DiscoveryState::DiscoveringDerived);
    assert!(session.discover().await.unwrap().is_none());
    assert!(session.discover().await.unwrap().is_none());

    gate_tx.send(true).unwrap();
    let summary = background.await.unwrap().unwrap().unwrap();

    // A further invocation after completion is also a no-op.
    assert!(session.discover().await.unwrap().is_none());

    let mut registrations: HashMap<String, usize> = HashMap::new();
    while let Ok(event) = events.try_recv() {
        if let RegistryEvent::Registered(descriptor) = event {
            *registrations.entry(descriptor.id.to_string()).or_default() += 1;
        }
    }

    assert_eq!(registrations.len(), summary.total);
    assert!(
        registrations.values().all(|count| *count == 1),
        "duplicate registrations: {registrations:?}"
    );
}

#[tokio::test]
async fn failed_token_read_shrinks_the_closure_by_one() {
    let config = config_with_vaults(&["USDC", "DAI", "WETH"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 2);
    provider.respond(
        config.vaults[1].vault,
        abi::encode_call(SIG_TOKEN),
        Err(ChainError::Rpc {
            code: -32000,
            message: "execution reverted".to_string(),
        }),
    );

    let (_manager, session) = session_for(config, provider).await;
    let summary = session.discover().await.unwrap().unwrap();

    assert_eq!(summary.tokens, 2);
    assert_eq!(summary.skipped_tokens, 1);
    assert_eq!(summary.total, 8);
    assert_eq!(session.state(), DiscoveryState::Complete);
    assert!(session.registry().contains(&ContractId::vault("DAI")));
    assert!(!session.registry().contains(&ContractId::token("DAI")));
}

#[tokio::test]
async fn zero_pools_is_a_normal_outcome() {
    let config = config_with_vaults(&["USDC", "DAI", "WETH"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 0);

    let (_manager, session) = session_for(config, provider).await;
    let summary = session.discover().await.unwrap().unwrap();

    assert_eq!(summary.pool_lps, 0);
    assert_eq!(summary.total, 7);
    assert_eq!(session.state(), DiscoveryState::Complete);
}

#[tokio::test]
async fn pool_length_failure_degrades_to_an_empty_pool_tier() {
    let config = config_with_vaults(&["USDC"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    // poolLength deliberately unstubbed: the read fails.

    let (_manager, session) = session_for(config, provider).await;
    let summary = session.discover().await.unwrap().unwrap();

    assert_eq!(summary.pool_lps, 0);
    assert_eq!(summary.skipped_pools, 0);
    assert_eq!(summary.total, 3);
    assert_eq!(session.state(), DiscoveryState::Complete);
}

#[tokio::test]
async fn failed_pool_info_read_skips_only_that_slot() {
    let config = config_with_vaults(&["USDC"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 3);
    provider.respond(
        pool_addr(),
        abi::encode_call_u256(SIG_POOL_INFO, 1),
        Err(ChainError::Transport("timeout".to_string())),
    );

    let (_manager, session) = session_for(config, provider).await;
    let summary = session.discover().await.unwrap().unwrap();

    assert_eq!(summary.pool_lps, 2);
    assert_eq!(summary.skipped_pools, 1);
    assert!(session.registry().contains(&ContractId::pool_lp(0)));
    assert!(!session.registry().contains(&ContractId::pool_lp(1)));
    assert!(session.registry().contains(&ContractId::pool_lp(2)));
}

#[tokio::test]
async fn readiness_fires_once_every_contract_activates() {
    let config = config_with_vaults(&["USDC", "DAI"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 1);

    let (_manager, session) = session_for(config, provider).await;
    assert!(!session.initialized());

    session.discover().await.unwrap().unwrap();
    wait_ready(&session).await;

    assert!(session.initialized());
    assert_eq!(
        session.registry().activated_count(),
        session.total_declared().unwrap()
    );
}

#[tokio::test]
async fn readiness_never_fires_while_one_activation_is_withheld() {
    let config = config_with_vaults(&["USDC", "DAI"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 1);
    // The underlying token of DAI never gets code, so its activation is
    // withheld and the count can never catch up.
    provider.withhold_code(token_addr(1));

    let (_manager, session) = session_for(config, provider).await;
    let summary = session.discover().await.unwrap().unwrap();

    // Give the activator time to settle everything it can.
    let expected = summary.total - 1;
    timeout(Duration::from_secs(2), async {
        while session.registry().activated_count() < expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("all but one contract should activate");

    sleep(Duration::from_millis(100)).await;
    assert_eq!(session.registry().activated_count(), expected);
    assert!(!session.initialized());
    assert!(!*session.readiness().borrow());
}

#[tokio::test]
async fn readiness_latches_and_never_resets_within_a_session() {
    let config = config_with_vaults(&["USDC"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 0);

    let (_manager, session) = session_for(config, Arc::clone(&provider)).await;
    session.discover().await.unwrap().unwrap();
    wait_ready(&session).await;

    // A late registration makes the counts diverge again, but the signal
    // stays latched until the session itself is torn down.
    provider.withhold_code(addr(99));
    session
        .registry()
        .register(ResourceDescriptor::new(ContractId::token("LATE"), addr(99)));
    sleep(Duration::from_millis(50)).await;

    assert!(session.initialized());
    assert!(*session.readiness().borrow());
}

#[tokio::test]
async fn replaced_connection_abandons_in_flight_discovery() {
    let config = config_with_vaults(&["USDC", "DAI"]);
    let provider_a = FakeProvider::new();
    stub_vault_tokens(&provider_a, &config);
    stub_pools(&provider_a, 2);

    let (gate_tx, gate_rx) = watch::channel(false);
    provider_a.set_gate(gate_rx);

    let manager = Arc::new(ConnectionManager::new());
    let connection_a = manager.connect(provider_a).await.unwrap();
    let session_a = DiscoverySession::new(config.clone(), connection_a, Arc::clone(&manager));

    let background = {
        let session = Arc::clone(&session_a);
        tokio::spawn(async move { session.discover().await })
    };
    sleep(Duration::from_millis(50)).await;

    // Connection B replaces A while A's derived reads are still gated.
    let provider_b = FakeProvider::new();
    manager.connect(provider_b).await.unwrap();
    gate_tx.send(true).unwrap();

    let err = background.await.unwrap().unwrap_err();
    assert!(matches!(err, DiscoveryError::ConnectionReplaced));

    // Only A's roots made it in; nothing from the stale reads did.
    assert_eq!(session_a.state(), DiscoveryState::DiscoveringDerived);
    assert_eq!(session_a.registry().len(), 3);
    assert!(!session_a.registry().contains(&ContractId::token("USDC")));
    assert!(session_a.total_declared().is_none());
    assert!(!session_a.initialized());
}

#[tokio::test]
async fn context_exposes_the_consumer_lifecycle() {
    let config = config_with_vaults(&["USDC"]);
    let provider = FakeProvider::new();
    stub_vault_tokens(&provider, &config);
    stub_pools(&provider, 1);

    let context = VaultscanContext::new(config);
    assert_eq!(context.status(), ConnectionStatus::Disconnected);
    assert_eq!(context.state(), DiscoveryState::Idle);
    assert!(!context.loading());
    assert!(!context.initialized());

    let session = context.connect(provider).await.unwrap();
    assert_eq!(context.status(), ConnectionStatus::Connected);
    assert_eq!(context.state(), DiscoveryState::Complete);

    wait_ready(&session).await;
    assert!(context.initialized());
    assert!(!context.loading());

    context.disconnect();
    assert_eq!(context.status(), ConnectionStatus::Disconnected);
    assert!(context.session().is_none());
    assert!(!context.initialized());
}

#[tokio::test]
async fn reconnect_rebuilds_the_session_from_scratch() {
    let config = config_with_vaults(&["USDC", "DAI"]);

    let provider_a = FakeProvider::new();
    stub_vault_tokens(&provider_a, &config);
    stub_pools(&provider_a, 2);

    let provider_b = FakeProvider::new();
    stub_vault_tokens(&provider_b, &config);
    stub_pools(&provider_b, 0);

    let context = VaultscanContext::new(config);
    let first = context.connect(provider_a).await.unwrap();
    assert_eq!(first.total_declared(), Some(7));

    let second = context.connect(provider_b).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.total_declared(), Some(5));
    assert_ne!(first.connection().id, second.connection().id);

    // The replaced session keeps its frozen view; the context answers for
    // the new one.
    assert_eq!(first.state(), DiscoveryState::Complete);
    assert!(Arc::ptr_eq(&context.session().unwrap(), &second));
}
