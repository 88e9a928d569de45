//! Settlement Submitter
//!
//! The scheduled entry point: aggregate current reward records into a
//! tree, persist the snapshot, and publish the root on-chain only when it
//! differs from the committed one. Confirmation waiting races a fixed
//! timeout; the losing branch is dropped and cannot report afterward.
//! Retry belongs to the external scheduler's cadence, never to this
//! invocation.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chain::contract::{ChainClient, ChainError, TxInclusion};
use crate::chain::fees::{buffered_gas_limit, select_strategy, FeeProbeError, FeeStrategy};
use crate::core::merkle::RewardTree;
use crate::core::snapshot::LeafSnapshot;
use crate::rewards::record::settlement_leaves;
use crate::rewards::store::{RewardStore, StoreError};

/// Confirmation depth required before a settlement is reported settled.
pub const REQUIRED_CONFIRMATIONS: u64 = 2;

/// How long the confirmation wait may run before the outcome is reported
/// as unknown.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Terminal state of a tracked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Mined and confirmed at the required depth.
    Confirmed,
    /// Mined but logically reverted.
    Reverted,
    /// Still unresolved when the tracking window closed.
    TimedOut,
}

/// A submitted and confirmed root-update transaction.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementTransaction {
    /// Local job identifier.
    pub id: Uuid,
    /// The root this transaction committed.
    pub root: B256,
    /// Pricing applied at submission.
    pub fee_strategy: FeeStrategy,
    /// Buffered gas limit sent with the transaction.
    pub gas_limit: u64,
    /// On-chain transaction hash.
    pub tx_hash: B256,
    /// Confirmation depth observed.
    pub confirmations: u64,
    /// Terminal status.
    pub status: TxStatus,
}

/// Result of one settlement invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// The root changed and was committed on-chain.
    Settled {
        /// The confirmed transaction.
        transaction: SettlementTransaction,
    },
    /// The recomputed root already matches the chain; nothing was sent.
    NoOp {
        /// The unchanged root.
        root: B256,
    },
}

/// Settlement failures, classified for the scheduler.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The reward store could not be read. No on-chain action was taken.
    #[error("failed to fetch reward records: {0}")]
    DataFetch(StoreError),

    /// The freshly built snapshot could not be persisted.
    #[error("failed to persist leaf snapshot: {0}")]
    SnapshotPersist(StoreError),

    /// The committed on-chain root could not be read.
    #[error("failed to read the committed root: {0}")]
    RootRead(ChainError),

    /// No usable fee data on either pricing path.
    #[error(transparent)]
    FeeProbe(#[from] FeeProbeError),

    /// Gas estimation for the root update failed.
    #[error("failed to estimate root-update gas: {0}")]
    GasEstimate(ChainError),

    /// The node rejected the submission; see [`ChainError`] for the
    /// category (insufficient funds, nonce conflict, other).
    #[error("root update not accepted: {0}")]
    Submission(ChainError),

    /// The transaction was submitted but did not reach the required
    /// confirmations inside the window. Outcome unknown: it may still
    /// confirm later; the next scheduled run recomputes from live state.
    #[error("confirmation wait timed out for {tx_hash}")]
    ConfirmationTimeout {
        /// Hash of the in-flight transaction.
        tx_hash: B256,
    },

    /// Receipt tracking itself failed after submission.
    #[error("confirmation tracking failed for {tx_hash}: {source}")]
    ConfirmationTracking {
        /// Hash of the in-flight transaction.
        tx_hash: B256,
        /// Underlying chain error.
        source: ChainError,
    },

    /// The transaction was included but logically reverted.
    #[error("root update {tx_hash} reverted on-chain")]
    Reverted {
        /// Hash of the reverted transaction.
        tx_hash: B256,
    },
}

/// Publishes reward roots on a fixed external cadence.
pub struct SettlementSubmitter {
    store: Arc<dyn RewardStore>,
    chain: Arc<dyn ChainClient>,
}

impl SettlementSubmitter {
    /// Create a submitter over the given store and chain boundaries.
    pub fn new(store: Arc<dyn RewardStore>, chain: Arc<dyn ChainClient>) -> Self {
        Self { store, chain }
    }

    /// Run one settlement cycle.
    ///
    /// Idempotent: repeated runs with unchanged reward data return
    /// [`SettlementOutcome::NoOp`] after the first successful commit,
    /// because the freshly recomputed root is compared against a fresh
    /// on-chain read every time.
    pub async fn run(&self) -> Result<SettlementOutcome, SettlementError> {
        let records = self
            .store
            .list_records()
            .await
            .map_err(SettlementError::DataFetch)?;

        let leaves = settlement_leaves(&records);
        let excluded = records.len() - leaves.len();
        if excluded > 0 {
            warn!(excluded, total = records.len(), "records excluded from settlement");
        }

        let tree = RewardTree::build(leaves);
        let root = tree.root();

        let snapshot = LeafSnapshot::capture(&tree);
        self.store
            .save_snapshot(&snapshot)
            .await
            .map_err(SettlementError::SnapshotPersist)?;

        // Independent reads; both must land before strategy selection.
        let (committed, fees) = tokio::join!(self.chain.merkle_root(), self.chain.fee_data());
        let committed = committed.map_err(SettlementError::RootRead)?;

        if root == committed {
            info!(%root, leaves = tree.leaf_count(), "root unchanged, nothing to settle");
            return Ok(SettlementOutcome::NoOp { root });
        }

        let fee_strategy = select_strategy(&fees)?;
        let gas_limit = buffered_gas_limit(
            self.chain
                .estimate_update_gas(root)
                .await
                .map_err(SettlementError::GasEstimate)?,
        );

        let tx_hash = self
            .chain
            .submit_root_update(root, fee_strategy, gas_limit)
            .await
            .map_err(SettlementError::Submission)?;

        info!(%root, %tx_hash, leaves = tree.leaf_count(), "root update submitted");

        // Race the confirmation watch against the fixed window. The
        // timeout drops the watch future, so the loser cannot report.
        let inclusion = tokio::time::timeout(
            CONFIRMATION_TIMEOUT,
            self.chain.wait_for_inclusion(tx_hash, REQUIRED_CONFIRMATIONS),
        )
        .await
        .map_err(|_| SettlementError::ConfirmationTimeout { tx_hash })?
        .map_err(|source| SettlementError::ConfirmationTracking { tx_hash, source })?;

        match inclusion {
            TxInclusion::Reverted => {
                warn!(%tx_hash, "root update reverted on-chain");
                Err(SettlementError::Reverted { tx_hash })
            }
            TxInclusion::Confirmed => {
                info!(%tx_hash, %root, "root update confirmed");
                Ok(SettlementOutcome::Settled {
                    transaction: SettlementTransaction {
                        id: Uuid::new_v4(),
                        root,
                        fee_strategy,
                        gas_limit,
                        tx_hash,
                        confirmations: REQUIRED_CONFIRMATIONS,
                        status: TxStatus::Confirmed,
                    },
                })
            }
        }
    }
}
