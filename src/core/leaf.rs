//! Canonical Reward Leaf Encoding
//!
//! A leaf commits one (wallet, token, amount) entitlement. The byte layout
//! must mirror the reward vault contract exactly: the claimant address,
//! the token address, and the claim-unit amount packed in that order and
//! hashed with keccak256. Any deviation invalidates every proof against
//! the committed root.

use std::str::FromStr;

use alloy::primitives::{keccak256, Address, B256, U256};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::core::units::scale_amount;

/// A single hashed reward commitment.
pub type Leaf = B256;

/// Errors from leaf encoding. A failing record is excluded from
/// settlement; the batch itself is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The address does not parse as a 20-byte hex address.
    #[error("malformed address: {0:?}")]
    InvalidAddress(String),

    /// Amounts must be strictly positive to be committed.
    #[error("reward amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// The amount carries more precision than the 5-decimal claim units.
    #[error("reward amount {0} is not representable in claim units")]
    UnrepresentableAmount(Decimal),

    /// The scaled amount exceeds the supported unit range.
    #[error("reward amount {0} overflows the claim unit range")]
    AmountOverflow(Decimal),
}

/// Parse and validate a wallet or token address.
pub fn parse_address(raw: &str) -> Result<Address, EncodingError> {
    Address::from_str(raw.trim()).map_err(|_| EncodingError::InvalidAddress(raw.to_string()))
}

/// Encode a reward entitlement into its leaf hash.
///
/// `keccak256(wallet ++ token ++ units)` with the amount scaled to claim
/// units and packed as a big-endian uint256.
pub fn encode_leaf(wallet: Address, token: Address, amount: Decimal) -> Result<Leaf, EncodingError> {
    let units = scale_amount(amount)?;
    Ok(hash_entry(wallet, token, units))
}

/// Hash an already-scaled entry. Used by the claim path, which carries
/// the scaled units alongside the decimal amount.
pub fn hash_entry(wallet: Address, token: Address, units: U256) -> Leaf {
    let mut packed = [0u8; 72];
    packed[..20].copy_from_slice(wallet.as_slice());
    packed[20..40].copy_from_slice(token.as_slice());
    packed[40..].copy_from_slice(&units.to_be_bytes::<32>());
    keccak256(packed)
}
