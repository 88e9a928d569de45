//! Reward Vault Contract Access
//!
//! `sol!` bindings for the on-chain reward vault plus the [`ChainClient`]
//! seam the settlement and claim flows run against. The trait keeps both
//! flows testable and makes the simulate-before-submit ordering a
//! property of this module rather than of each caller.

use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use alloy::sol;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::chain::fees::{FeeData, FeeStrategy};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IRewardVault {
        /// Currently committed reward root.
        function merkleRoot() external view returns (bytes32);

        /// Replace the committed root. Operator only.
        function updateMerkleRoot(bytes32 newRoot) external;

        /// Redeem the caller's entitlement against the committed root.
        function claimTokens(address token, uint256 amount, bytes32[] calldata proof) external;
    }
}

/// How often the receipt watcher polls while waiting for confirmations.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Chain access errors, classified so callers can distinguish a rejected
/// submission from transport trouble and a reverted simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The RPC endpoint could not be reached or misbehaved.
    #[error("rpc transport failure: {0}")]
    Transport(String),

    /// The node rejected the submission: the signer cannot cover
    /// gas plus value.
    #[error("submission rejected: insufficient funds")]
    InsufficientFunds,

    /// The node rejected the submission over a nonce conflict.
    #[error("submission rejected: nonce conflict")]
    NonceConflict,

    /// The node rejected the submission for another reason.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// A read-only call reverted during simulation.
    #[error("simulation reverted: {0}")]
    SimulationReverted(String),
}

/// Terminal inclusion state of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxInclusion {
    /// Mined and successful at the requested confirmation depth.
    Confirmed,
    /// Mined but logically reverted.
    Reverted,
}

/// Classify an RPC rejection message into a user-facing category.
pub fn classify_submission_error(message: String) -> ChainError {
    let lowered = message.to_lowercase();
    if lowered.contains("insufficient funds") {
        ChainError::InsufficientFunds
    } else if lowered.contains("nonce") {
        ChainError::NonceConflict
    } else {
        ChainError::Rejected(message)
    }
}

/// Chain operations consumed by the settlement and claim flows.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Read the currently committed root.
    async fn merkle_root(&self) -> Result<B256, ChainError>;

    /// Probe the fee market. Missing fields are reported as `None`,
    /// never as an error; strategy selection handles the fallback.
    async fn fee_data(&self) -> FeeData;

    /// Estimate gas for a root update, pre-buffer.
    async fn estimate_update_gas(&self, root: B256) -> Result<u64, ChainError>;

    /// Submit the root-update transaction. Returns the transaction hash.
    async fn submit_root_update(
        &self,
        root: B256,
        fees: FeeStrategy,
        gas_limit: u64,
    ) -> Result<B256, ChainError>;

    /// Dry-run a claim as the claimant wallet without spending gas.
    async fn simulate_claim(
        &self,
        wallet: Address,
        token: Address,
        amount: U256,
        proof: Vec<B256>,
    ) -> Result<(), ChainError>;

    /// Submit the real claim transaction. Returns the transaction hash.
    async fn submit_claim(
        &self,
        wallet: Address,
        token: Address,
        amount: U256,
        proof: Vec<B256>,
    ) -> Result<B256, ChainError>;

    /// Watch a submitted transaction until it reaches the requested
    /// confirmation depth. Runs until resolution; the caller bounds it
    /// with a timeout and drops this future if the timeout wins.
    async fn wait_for_inclusion(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> Result<TxInclusion, ChainError>;
}

/// [`ChainClient`] backed by an alloy provider with a local signer.
pub struct VaultChainClient<P: Provider + Clone> {
    provider: P,
    vault: Address,
}

impl<P: Provider + Clone> VaultChainClient<P> {
    /// Create a client for the vault contract at `vault`.
    pub fn new(provider: P, vault: Address) -> Self {
        Self { provider, vault }
    }

    fn contract(&self) -> IRewardVault::IRewardVaultInstance<P> {
        IRewardVault::new(self.vault, self.provider.clone())
    }
}

#[async_trait]
impl<P: Provider + Clone + 'static> ChainClient for VaultChainClient<P> {
    async fn merkle_root(&self) -> Result<B256, ChainError> {
        let vault = self.contract();
        vault
            .merkleRoot()
            .call()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))
    }

    async fn fee_data(&self) -> FeeData {
        let (dynamic, gas_price) = tokio::join!(
            self.provider.estimate_eip1559_fees(),
            self.provider.get_gas_price(),
        );

        let mut data = FeeData::default();
        match dynamic {
            Ok(estimate) => {
                data.max_fee_per_gas = Some(estimate.max_fee_per_gas);
                data.max_priority_fee_per_gas = Some(estimate.max_priority_fee_per_gas);
            }
            Err(reason) => debug!(%reason, "eip-1559 fee estimate unavailable"),
        }
        match gas_price {
            Ok(price) => data.gas_price = Some(price),
            Err(reason) => debug!(%reason, "legacy gas price unavailable"),
        }
        data
    }

    async fn estimate_update_gas(&self, root: B256) -> Result<u64, ChainError> {
        let vault = self.contract();
        vault
            .updateMerkleRoot(root)
            .estimate_gas()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))
    }

    async fn submit_root_update(
        &self,
        root: B256,
        fees: FeeStrategy,
        gas_limit: u64,
    ) -> Result<B256, ChainError> {
        let vault = self.contract();
        let call = vault.updateMerkleRoot(root).gas(gas_limit);
        let call = match fees {
            FeeStrategy::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => call
                .max_fee_per_gas(max_fee_per_gas)
                .max_priority_fee_per_gas(max_priority_fee_per_gas),
            FeeStrategy::Legacy { gas_price } => call.gas_price(gas_price),
        };

        let pending = call
            .send()
            .await
            .map_err(|e| classify_submission_error(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn simulate_claim(
        &self,
        wallet: Address,
        token: Address,
        amount: U256,
        proof: Vec<B256>,
    ) -> Result<(), ChainError> {
        let vault = self.contract();
        vault
            .claimTokens(token, amount, proof)
            .from(wallet)
            .call()
            .await
            .map(|_| ())
            .map_err(|e| ChainError::SimulationReverted(e.to_string()))
    }

    async fn submit_claim(
        &self,
        wallet: Address,
        token: Address,
        amount: U256,
        proof: Vec<B256>,
    ) -> Result<B256, ChainError> {
        let vault = self.contract();
        let pending = vault
            .claimTokens(token, amount, proof)
            .from(wallet)
            .send()
            .await
            .map_err(|e| classify_submission_error(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_inclusion(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> Result<TxInclusion, ChainError> {
        let mut poll = tokio::time::interval(RECEIPT_POLL_INTERVAL);
        loop {
            poll.tick().await;

            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| ChainError::Transport(e.to_string()))?;

            let Some(receipt) = receipt else { continue };
            let Some(included_in) = receipt.block_number else {
                continue;
            };

            let latest = self
                .provider
                .get_block_number()
                .await
                .map_err(|e| ChainError::Transport(e.to_string()))?;

            if latest.saturating_add(1) >= included_in.saturating_add(confirmations) {
                return Ok(if receipt.status() {
                    TxInclusion::Confirmed
                } else {
                    TxInclusion::Reverted
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_classified() {
        let err = classify_submission_error(
            "server returned an error response: insufficient funds for gas * price + value".into(),
        );
        assert_eq!(err, ChainError::InsufficientFunds);
    }

    #[test]
    fn test_nonce_conflict_classified() {
        let err = classify_submission_error("nonce too low: next nonce 42, tx nonce 41".into());
        assert_eq!(err, ChainError::NonceConflict);

        let err = classify_submission_error("Nonce already used".into());
        assert_eq!(err, ChainError::NonceConflict);
    }

    #[test]
    fn test_other_rejections_keep_their_message() {
        let err = classify_submission_error("intrinsic gas too low".into());
        assert_eq!(err, ChainError::Rejected("intrinsic gas too low".into()));
    }
}
