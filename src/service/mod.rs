//! Exposed HTTP Surface
//!
//! Exactly two operations leave this core: the scheduler-triggered
//! settlement run and the claimant flow (preview + execute). Everything
//! else - marketing pages, navigation, UI - lives in external callers.

pub mod auth;

use std::net::SocketAddr;
use std::sync::Arc;

use alloy::primitives::{Address, B256};
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::chain::claim::{ClaimCoordinator, ClaimDetails, ClaimError, ClaimTransaction};
use crate::chain::contract::ChainError;
use crate::chain::settlement::{SettlementError, SettlementOutcome, SettlementSubmitter};
use crate::service::auth::{
    bearer_value, validate_token, AuthConfig, AuthError, SchedulerSecret, TokenClaims,
};

/// Server configuration, read from the environment at startup.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Bind address for the HTTP surface.
    pub bind_addr: SocketAddr,
    /// JSON-RPC endpoint of the chain.
    pub rpc_url: String,
    /// Reward vault contract address.
    pub vault_address: Address,
    /// Hex private key of the operator signer.
    pub operator_key: String,
    /// Base URL of the reward aggregator API.
    pub reward_api_url: String,
    /// Optional bearer key for the aggregator API.
    pub reward_api_key: Option<String>,
    /// Static secret the scheduler presents.
    pub scheduler_secret: String,
}

/// Configuration errors; all fail startup, never a request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// A variable is present but unparseable.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Why it failed to parse.
        reason: String,
    },
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: format!("{e}"),
            })?;

        let vault_address = require("VAULT_ADDRESS")?
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "VAULT_ADDRESS",
                reason: "not a 20-byte hex address".to_string(),
            })?;

        Ok(Self {
            bind_addr,
            rpc_url: require("RPC_URL")?,
            vault_address,
            operator_key: require("OPERATOR_KEY")?,
            reward_api_url: require("REWARD_API_URL")?,
            reward_api_key: std::env::var("REWARD_API_KEY").ok(),
            scheduler_secret: require("SCHEDULER_SECRET")?,
        })
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The scheduled settlement flow.
    pub submitter: Arc<SettlementSubmitter>,
    /// The interactive claim flow.
    pub claims: Arc<ClaimCoordinator>,
    /// Scheduler trigger secret.
    pub scheduler_secret: SchedulerSecret,
    /// Claimant JWT validation config.
    pub auth: AuthConfig,
}

/// Build the router for the two exposed operations.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/settlement/run", post(run_settlement))
        .route("/v1/claim", get(claim_preview).post(execute_claim))
        .with_state(state)
}

/// Body of the claim execution request.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRequest {
    /// The wallet the user connected in the claim UI.
    pub wallet_address: String,
}

/// Claim execution responses.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimResponse {
    /// Claim confirmed at the required depth.
    Confirmed {
        /// The confirmed transaction.
        transaction: ClaimTransaction,
    },
    /// Claim submitted but unresolved inside the tracking window. It may
    /// still confirm; the UI should poll the hash.
    Pending {
        /// Hash of the in-flight transaction.
        tx_hash: B256,
    },
}

/// Service-level errors mapped onto HTTP responses.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller failed authentication.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The settlement flow failed.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// The claim flow failed.
    #[error(transparent)]
    Claim(#[from] ClaimError),
}

impl ServiceError {
    /// Stable machine-readable category for callers.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Auth(_) => "unauthorized",
            ServiceError::Settlement(err) => match err {
                SettlementError::DataFetch(_) => "reward_store_unavailable",
                SettlementError::SnapshotPersist(_) => "snapshot_persist_failed",
                SettlementError::RootRead(_) => "root_read_failed",
                SettlementError::FeeProbe(_) => "fee_data_unavailable",
                SettlementError::GasEstimate(_) => "gas_estimate_failed",
                SettlementError::Submission(ChainError::InsufficientFunds) => "insufficient_funds",
                SettlementError::Submission(ChainError::NonceConflict) => "nonce_conflict",
                SettlementError::Submission(_) => "submission_rejected",
                SettlementError::ConfirmationTimeout { .. } => "confirmation_timeout",
                SettlementError::ConfirmationTracking { .. } => "confirmation_tracking_failed",
                SettlementError::Reverted { .. } => "reverted_on_chain",
            },
            ServiceError::Claim(err) => match err {
                ClaimError::DataFetch(_) => "reward_store_unavailable",
                ClaimError::RewardNotFound { .. } => "reward_not_found",
                ClaimError::WalletMismatch { .. } => "wallet_mismatch",
                ClaimError::Encoding(_) => "invalid_reward_entry",
                ClaimError::SnapshotMissing => "snapshot_missing",
                ClaimError::ProofUnavailable(_) => "proof_unavailable",
                ClaimError::SimulationRejected(_) => "simulation_rejected",
                ClaimError::Submission(ChainError::InsufficientFunds) => "insufficient_funds",
                ClaimError::Submission(ChainError::NonceConflict) => "nonce_conflict",
                ClaimError::Submission(_) => "submission_rejected",
                ClaimError::ConfirmationTimeout { .. } => "confirmation_timeout",
                ClaimError::ConfirmationTracking { .. } => "confirmation_tracking_failed",
                ClaimError::Reverted { .. } => "reverted_on_chain",
            },
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ServiceError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Settlement(err) => match err {
                SettlementError::ConfirmationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },
            ServiceError::Claim(err) => match err {
                ClaimError::RewardNotFound { .. } => StatusCode::NOT_FOUND,
                ClaimError::WalletMismatch { .. } => StatusCode::FORBIDDEN,
                ClaimError::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ClaimError::SnapshotMissing
                | ClaimError::ProofUnavailable(_)
                | ClaimError::SimulationRejected(_) => StatusCode::CONFLICT,
                ClaimError::ConfirmationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "kind": self.kind(),
            "error": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

fn authorization_header(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingCredentials)
}

/// Check the scheduler's static bearer secret.
fn authorize_scheduler(secret: &SchedulerSecret, headers: &HeaderMap) -> Result<(), AuthError> {
    let presented =
        bearer_value(authorization_header(headers)?).ok_or(AuthError::MissingCredentials)?;
    if secret.verify(presented) {
        Ok(())
    } else {
        Err(AuthError::InvalidSignature)
    }
}

/// Validate the claimant's JWT and return its claims.
fn authorize_claimant(config: &AuthConfig, headers: &HeaderMap) -> Result<TokenClaims, AuthError> {
    let token = bearer_value(authorization_header(headers)?).ok_or(AuthError::MissingCredentials)?;
    validate_token(token, config)
}

/// POST /v1/settlement/run - the scheduler trigger.
async fn run_settlement(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SettlementOutcome>, ServiceError> {
    authorize_scheduler(&state.scheduler_secret, &headers)?;
    let outcome = state.submitter.run().await?;
    Ok(Json(outcome))
}

/// GET /v1/claim - resolve the caller's claim details.
async fn claim_preview(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClaimDetails>, ServiceError> {
    let claims = authorize_claimant(&state.auth, &headers)?;
    let details = state.claims.preview(claims.user_tag()).await?;
    Ok(Json(details))
}

/// POST /v1/claim - execute a claim for the connected wallet.
async fn execute_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ServiceError> {
    let claims = authorize_claimant(&state.auth, &headers)?;

    match state
        .claims
        .claim(claims.user_tag(), &request.wallet_address)
        .await
    {
        Ok(transaction) => Ok(Json(ClaimResponse::Confirmed { transaction })),
        // Submitted but unresolved: surface as pending, not as failure.
        Err(ClaimError::ConfirmationTimeout { tx_hash }) => {
            Ok(Json(ClaimResponse::Pending { tx_hash }))
        }
        Err(reason) => Err(ServiceError::Claim(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_scheduler_authorization() {
        let secret = SchedulerSecret::new("cron-secret");

        assert!(authorize_scheduler(&secret, &headers_with("Bearer cron-secret")).is_ok());

        assert!(matches!(
            authorize_scheduler(&secret, &headers_with("Bearer wrong")),
            Err(AuthError::InvalidSignature)
        ));
        assert!(matches!(
            authorize_scheduler(&secret, &headers_with("Basic cron-secret")),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            authorize_scheduler(&secret, &HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_error_kinds_are_stable() {
        let err = ServiceError::Claim(ClaimError::WalletMismatch {
            registered: "0xaa".into(),
            connected: "0xbb".into(),
        });
        assert_eq!(err.kind(), "wallet_mismatch");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = ServiceError::Settlement(SettlementError::Submission(
            ChainError::InsufficientFunds,
        ));
        assert_eq!(err.kind(), "insufficient_funds");

        let err = ServiceError::Auth(AuthError::MissingCredentials);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_claim_response_wire_shape() {
        let pending = ClaimResponse::Pending {
            tx_hash: B256::repeat_byte(7),
        };
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json["tx_hash"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn test_missing_required_config_is_reported() {
        // Pick a variable name no environment will have set.
        let result = require("REWARD_VAULT_TEST_UNSET_VAR");
        assert!(matches!(result, Err(ConfigError::MissingVar(_))));
    }
}
