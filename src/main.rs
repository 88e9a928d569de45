//! Reward Vault Server
//!
//! Wires the reward store client, the chain client, and the two
//! settlement flows together, then serves the scheduler and claim
//! entry points over HTTP.

use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reward_vault::chain::contract::{ChainClient, VaultChainClient};
use reward_vault::service::auth::{AuthConfig, SchedulerSecret};
use reward_vault::service::{build_router, AppState, ServerConfig};
use reward_vault::{
    ClaimCoordinator, HttpRewardStore, RewardStore, SettlementSubmitter, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().context("loading server configuration")?;
    let auth = AuthConfig::from_env();

    info!("Reward Vault Server v{}", VERSION);
    info!("Vault contract: {}", config.vault_address);
    info!("Reward store: {}", config.reward_api_url);

    let signer: PrivateKeySigner = config
        .operator_key
        .parse()
        .context("parsing OPERATOR_KEY")?;
    let wallet = EthereumWallet::from(signer);

    let rpc_url = config.rpc_url.parse().context("parsing RPC_URL")?;
    let provider = ProviderBuilder::new().wallet(wallet).connect_http(rpc_url);

    let chain: Arc<dyn ChainClient> =
        Arc::new(VaultChainClient::new(provider, config.vault_address));
    let store: Arc<dyn RewardStore> = Arc::new(HttpRewardStore::new(
        config.reward_api_url.clone(),
        config.reward_api_key.clone(),
    ));

    let state = AppState {
        submitter: Arc::new(SettlementSubmitter::new(store.clone(), chain.clone())),
        claims: Arc::new(ClaimCoordinator::new(store, chain)),
        scheduler_secret: SchedulerSecret::new(config.scheduler_secret.clone()),
        auth,
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
