//! Claim Coordinator
//!
//! The interactive entry point: resolve a user's reward entry, rebuild
//! the settled tree from the persisted snapshot, derive the inclusion
//! proof, and submit the claim - but only after a read-only simulation
//! succeeds. A settlement cycle may advance the root between claim-data
//! fetch and submission; the simulation catches the stale proof before
//! any gas is spent.

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chain::contract::{ChainClient, ChainError, TxInclusion};
use crate::chain::settlement::{TxStatus, CONFIRMATION_TIMEOUT, REQUIRED_CONFIRMATIONS};
use crate::core::leaf::EncodingError;
use crate::core::merkle::{MerkleError, RewardTree};
use crate::rewards::record::VaultEntry;
use crate::rewards::store::{RewardStore, StoreError};

/// Claim details resolved for a user before wallet connection.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimDetails {
    /// The aggregator identity the entry belongs to.
    pub user_tag: String,
    /// Registered claimant wallet.
    pub wallet_address: Address,
    /// Reward token contract.
    pub token_address: Address,
    /// Claimable amount in whole tokens.
    pub amount: Decimal,
}

/// A submitted claim transaction.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimTransaction {
    /// Local job identifier.
    pub id: Uuid,
    /// Claimant wallet.
    pub wallet_address: Address,
    /// Reward token.
    pub token_address: Address,
    /// Claimed amount in claim units.
    pub amount: U256,
    /// Inclusion proof submitted with the claim.
    pub proof: Vec<B256>,
    /// On-chain transaction hash.
    pub tx_hash: B256,
    /// Terminal status.
    pub status: TxStatus,
}

/// Claim failures, classified for the claim UI.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// The reward store could not be read.
    #[error("failed to read the reward store: {0}")]
    DataFetch(StoreError),

    /// No reward entry is registered for this user.
    #[error("no reward entry for user {user_tag:?}")]
    RewardNotFound {
        /// The identity that was looked up.
        user_tag: String,
    },

    /// The connected wallet is not the registered reward wallet. Hard
    /// rejection: an unrelated wallet must not spend gas on a claim it
    /// cannot satisfy.
    #[error("connected wallet {connected} does not match the registered wallet")]
    WalletMismatch {
        /// Wallet registered on the reward record.
        registered: String,
        /// Wallet the user connected.
        connected: String,
    },

    /// The registered record itself fails validation.
    #[error("reward entry cannot be encoded: {0}")]
    Encoding(EncodingError),

    /// No settlement has persisted a snapshot yet.
    #[error("no settled snapshot available")]
    SnapshotMissing,

    /// The entry's leaf is not part of the settled snapshot, e.g. the
    /// record changed after the last settlement.
    #[error("reward entry is not part of the settled snapshot: {0}")]
    ProofUnavailable(MerkleError),

    /// The read-only simulation rejected the claim (stale root, already
    /// claimed, invalid proof). Nothing was submitted.
    #[error("claim simulation rejected: {0}")]
    SimulationRejected(ChainError),

    /// The node rejected the real submission.
    #[error("claim not accepted: {0}")]
    Submission(ChainError),

    /// Confirmation wait timed out; outcome unknown.
    #[error("confirmation wait timed out for {tx_hash}")]
    ConfirmationTimeout {
        /// Hash of the in-flight transaction.
        tx_hash: B256,
    },

    /// Receipt tracking failed after submission.
    #[error("confirmation tracking failed for {tx_hash}: {source}")]
    ConfirmationTracking {
        /// Hash of the in-flight transaction.
        tx_hash: B256,
        /// Underlying chain error.
        source: ChainError,
    },

    /// The claim was included but logically reverted.
    #[error("claim {tx_hash} reverted on-chain")]
    Reverted {
        /// Hash of the reverted transaction.
        tx_hash: B256,
    },
}

/// Coordinates proof generation and submission for user claims.
pub struct ClaimCoordinator {
    store: Arc<dyn RewardStore>,
    chain: Arc<dyn ChainClient>,
}

impl ClaimCoordinator {
    /// Create a coordinator over the given store and chain boundaries.
    pub fn new(store: Arc<dyn RewardStore>, chain: Arc<dyn ChainClient>) -> Self {
        Self { store, chain }
    }

    /// Resolve the claim details for a user identity, chain untouched.
    pub async fn preview(&self, user_tag: &str) -> Result<ClaimDetails, ClaimError> {
        let (user_tag, entry) = self.resolve_entry(user_tag).await?;
        Ok(ClaimDetails {
            user_tag,
            wallet_address: entry.wallet,
            token_address: entry.token,
            amount: entry.amount,
        })
    }

    /// Execute a claim for the user's connected wallet.
    ///
    /// Simulation strictly precedes submission; a claim that would
    /// revert is rejected with zero gas spent.
    pub async fn claim(
        &self,
        user_tag: &str,
        connected_wallet: &str,
    ) -> Result<ClaimTransaction, ClaimError> {
        let record = self
            .store
            .find_record(user_tag)
            .await
            .map_err(ClaimError::DataFetch)?
            .ok_or_else(|| ClaimError::RewardNotFound {
                user_tag: user_tag.to_string(),
            })?;

        // Wallet binding comes first: a mismatch rejects before any
        // encoding or proof work happens.
        let connected = connected_wallet.trim();
        if !record.wallet_address.eq_ignore_ascii_case(connected) {
            warn!(user_tag, connected, "claim rejected: wallet mismatch");
            return Err(ClaimError::WalletMismatch {
                registered: record.wallet_address.clone(),
                connected: connected.to_string(),
            });
        }

        let entry = record.vault_entry().map_err(ClaimError::Encoding)?;

        let snapshot = self
            .store
            .latest_snapshot()
            .await
            .map_err(ClaimError::DataFetch)?
            .ok_or(ClaimError::SnapshotMissing)?;

        let tree = RewardTree::from_snapshot(&snapshot);
        let proof = tree
            .proof(entry.leaf)
            .map_err(ClaimError::ProofUnavailable)?
            .siblings();

        self.chain
            .simulate_claim(entry.wallet, entry.token, entry.units, proof.clone())
            .await
            .map_err(|reason| {
                warn!(user_tag, %reason, "claim simulation rejected, nothing submitted");
                ClaimError::SimulationRejected(reason)
            })?;

        let tx_hash = self
            .chain
            .submit_claim(entry.wallet, entry.token, entry.units, proof.clone())
            .await
            .map_err(ClaimError::Submission)?;

        info!(user_tag, %tx_hash, "claim submitted");

        let inclusion = tokio::time::timeout(
            CONFIRMATION_TIMEOUT,
            self.chain.wait_for_inclusion(tx_hash, REQUIRED_CONFIRMATIONS),
        )
        .await
        .map_err(|_| ClaimError::ConfirmationTimeout { tx_hash })?
        .map_err(|source| ClaimError::ConfirmationTracking { tx_hash, source })?;

        match inclusion {
            TxInclusion::Reverted => {
                warn!(user_tag, %tx_hash, "claim reverted on-chain");
                Err(ClaimError::Reverted { tx_hash })
            }
            TxInclusion::Confirmed => {
                info!(user_tag, %tx_hash, "claim confirmed");
                Ok(ClaimTransaction {
                    id: Uuid::new_v4(),
                    wallet_address: entry.wallet,
                    token_address: entry.token,
                    amount: entry.units,
                    proof,
                    tx_hash,
                    status: TxStatus::Confirmed,
                })
            }
        }
    }

    async fn resolve_entry(&self, user_tag: &str) -> Result<(String, VaultEntry), ClaimError> {
        let record = self
            .store
            .find_record(user_tag)
            .await
            .map_err(ClaimError::DataFetch)?
            .ok_or_else(|| ClaimError::RewardNotFound {
                user_tag: user_tag.to_string(),
            })?;

        let entry = record.vault_entry().map_err(ClaimError::Encoding)?;
        Ok((record.user_tag, entry))
    }
}
