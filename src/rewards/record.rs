//! Reward Records
//!
//! Read-only view of the reward aggregator's records and the data-quality
//! filter that turns them into committable leaves. Records the aggregator
//! owns and mutates; this service never writes them back.

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::leaf::{hash_entry, parse_address, EncodingError, Leaf};
use crate::core::units::scale_amount;

/// One off-chain reward entitlement as the aggregator reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardRecord {
    /// Registered claimant wallet.
    pub wallet_address: String,
    /// Reward token contract.
    pub token_address: String,
    /// Total entitlement in whole tokens.
    pub amount: Decimal,
    /// Aggregator-side user identity this record belongs to.
    pub user_tag: String,
    /// Amount already claimed; maintained by the aggregator.
    #[serde(default)]
    pub amount_claimed: Decimal,
    /// When the last claim confirmed; maintained by the aggregator.
    #[serde(default)]
    pub date_claimed: Option<DateTime<Utc>>,
}

impl RewardRecord {
    /// Validate the record and encode its vault entry.
    pub fn vault_entry(&self) -> Result<VaultEntry, EncodingError> {
        let wallet = parse_address(&self.wallet_address)?;
        let token = parse_address(&self.token_address)?;
        let units = scale_amount(self.amount)?;

        Ok(VaultEntry {
            wallet,
            token,
            amount: self.amount,
            units,
            leaf: hash_entry(wallet, token, units),
        })
    }
}

/// A validated, encoded reward entry ready for tree or claim use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultEntry {
    /// Claimant wallet.
    pub wallet: Address,
    /// Reward token.
    pub token: Address,
    /// Entitlement in whole tokens.
    pub amount: Decimal,
    /// Entitlement in claim units.
    pub units: U256,
    /// The leaf hash committing this entry.
    pub leaf: Leaf,
}

/// Encode all committable leaves from a record batch.
///
/// Records that fail validation are excluded and logged; a bad record is
/// a data-quality issue in the aggregator, not a fault of the batch.
pub fn settlement_leaves(records: &[RewardRecord]) -> Vec<Leaf> {
    records
        .iter()
        .filter_map(|record| match record.vault_entry() {
            Ok(entry) => Some(entry.leaf),
            Err(reason) => {
                warn!(
                    user_tag = %record.user_tag,
                    %reason,
                    "excluding reward record from settlement"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(user_tag: &str, wallet: &str, amount: Decimal) -> RewardRecord {
        RewardRecord {
            wallet_address: wallet.to_string(),
            token_address: "0xBbBbBBbbBBbbbbBBbbBBbbBBbbbbBBbbBBbbbBBb".to_string(),
            amount,
            user_tag: user_tag.to_string(),
            amount_claimed: Decimal::ZERO,
            date_claimed: None,
        }
    }

    #[test]
    fn test_valid_record_encodes() {
        let entry = record("alice", "0xAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAa", dec!(4518))
            .vault_entry()
            .unwrap();

        assert_eq!(entry.units, U256::from(451_800_000u64));
        assert_eq!(entry.amount, dec!(4518));
    }

    #[test]
    fn test_malformed_records_are_filtered_not_fatal() {
        let records = vec![
            record("alice", "0xAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAa", dec!(10)),
            record("bob", "not-a-wallet", dec!(10)),
            record("carol", "", dec!(10)),
            record("dave", "0x1111111111111111111111111111111111111111", dec!(0)),
            record("erin", "0x2222222222222222222222222222222222222222", dec!(5)),
        ];

        let leaves = settlement_leaves(&records);
        assert_eq!(leaves.len(), 2);
    }

    #[test]
    fn test_filter_keeps_distinct_leaves() {
        let a = record("alice", "0xAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAa", dec!(1));
        let b = record("bob", "0x2222222222222222222222222222222222222222", dec!(1));

        let leaves = settlement_leaves(&[a.clone(), b]);
        assert_eq!(leaves.len(), 2);
        assert_ne!(leaves[0], leaves[1]);
        assert!(leaves.contains(&a.vault_entry().unwrap().leaf));
    }

    #[test]
    fn test_single_record_commits_as_its_own_root() {
        use crate::core::merkle::{verify_proof, RewardTree};

        let alice = record("alice", "0xAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAa", dec!(4518));
        let solo = RewardTree::build(settlement_leaves(&[alice.clone()]));
        assert_eq!(solo.root(), alice.vault_entry().unwrap().leaf);

        // A second wallet changes the root; both proofs verify against it.
        let bob = record("bob", "0x2222222222222222222222222222222222222222", dec!(4518));
        let pair = RewardTree::build(settlement_leaves(&[alice.clone(), bob.clone()]));
        assert_ne!(pair.root(), solo.root());

        for entry in [alice.vault_entry().unwrap(), bob.vault_entry().unwrap()] {
            let proof = pair.proof(entry.leaf).unwrap();
            assert!(verify_proof(&pair.root(), &entry.leaf, &proof.siblings()));
        }
    }

    #[test]
    fn test_record_json_shape() {
        let json = r#"{
            "wallet_address": "0xAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAa",
            "token_address": "0xBbBbBBbbBBbbbbBBbbBBbbBBbbbbBBbbBBbbbBBb",
            "amount": "4518",
            "user_tag": "alice"
        }"#;

        let parsed: RewardRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.amount, dec!(4518));
        assert_eq!(parsed.amount_claimed, Decimal::ZERO);
        assert!(parsed.date_claimed.is_none());
        assert!(parsed.vault_entry().is_ok());
    }
}
