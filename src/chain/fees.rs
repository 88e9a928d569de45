//! Fee Strategy Selection
//!
//! Probes the chain's fee market and picks how the settlement transaction
//! is priced: EIP-1559 when the RPC reports both dynamic-fee fields,
//! legacy gas price otherwise. A fixed 20% buffer is applied to whichever
//! fee fields are used and to the estimated gas limit.

use serde::Serialize;
use thiserror::Error;

/// Safety buffer applied to fee fields and gas limits, in percent.
pub const FEE_BUFFER_PERCENT: u128 = 20;

/// Raw fee-market data as reported by the RPC. Fields are `None` when the
/// node does not report them (pre-1559 chains, probe failures).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    /// Legacy gas price in wei.
    pub gas_price: Option<u128>,
    /// EIP-1559 max fee per gas in wei.
    pub max_fee_per_gas: Option<u128>,
    /// EIP-1559 max priority fee per gas in wei.
    pub max_priority_fee_per_gas: Option<u128>,
}

/// The pricing applied to a submitted transaction, buffer included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeStrategy {
    /// Dynamic-fee pricing.
    Eip1559 {
        /// Buffered max fee per gas in wei.
        max_fee_per_gas: u128,
        /// Buffered max priority fee per gas in wei.
        max_priority_fee_per_gas: u128,
    },
    /// Legacy gas-price pricing.
    Legacy {
        /// Buffered gas price in wei.
        gas_price: u128,
    },
}

/// The RPC reported no usable fee data on either pricing path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no usable fee data reported by the rpc")]
pub struct FeeProbeError;

/// Apply the fixed safety buffer to a fee value.
pub fn with_buffer(value: u128) -> u128 {
    value.saturating_add(value.saturating_mul(FEE_BUFFER_PERCENT) / 100)
}

/// Apply the fixed safety buffer to an estimated gas limit.
pub fn buffered_gas_limit(estimate: u64) -> u64 {
    estimate.saturating_add((estimate as u128 * FEE_BUFFER_PERCENT / 100) as u64)
}

/// Select the pricing strategy for the probed fee data.
///
/// EIP-1559 is preferred when both dynamic-fee fields are reported;
/// otherwise fall back to legacy gas price. Only a probe that yielded
/// nothing on either path is an error.
pub fn select_strategy(fees: &FeeData) -> Result<FeeStrategy, FeeProbeError> {
    match (fees.max_fee_per_gas, fees.max_priority_fee_per_gas) {
        (Some(max_fee), Some(priority_fee)) => Ok(FeeStrategy::Eip1559 {
            max_fee_per_gas: with_buffer(max_fee),
            max_priority_fee_per_gas: with_buffer(priority_fee),
        }),
        _ => fees
            .gas_price
            .map(|gas_price| FeeStrategy::Legacy {
                gas_price: with_buffer(gas_price),
            })
            .ok_or(FeeProbeError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eip1559_preferred_when_fully_reported() {
        let fees = FeeData {
            gas_price: Some(30_000_000_000),
            max_fee_per_gas: Some(40_000_000_000),
            max_priority_fee_per_gas: Some(2_000_000_000),
        };

        assert_eq!(
            select_strategy(&fees).unwrap(),
            FeeStrategy::Eip1559 {
                max_fee_per_gas: 48_000_000_000,
                max_priority_fee_per_gas: 2_400_000_000,
            }
        );
    }

    #[test]
    fn test_null_max_fee_falls_back_to_legacy() {
        // The RPC reports a priority fee but no max fee: not enough for
        // dynamic pricing, so legacy gas price wins with the buffer.
        let fees = FeeData {
            gas_price: Some(10_000_000_000),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: Some(2_000_000_000),
        };

        assert_eq!(
            select_strategy(&fees).unwrap(),
            FeeStrategy::Legacy {
                gas_price: 12_000_000_000
            }
        );
    }

    #[test]
    fn test_missing_priority_fee_also_falls_back() {
        let fees = FeeData {
            gas_price: Some(10_000_000_000),
            max_fee_per_gas: Some(40_000_000_000),
            max_priority_fee_per_gas: None,
        };

        assert!(matches!(
            select_strategy(&fees).unwrap(),
            FeeStrategy::Legacy { .. }
        ));
    }

    #[test]
    fn test_no_fee_data_is_an_error() {
        assert_eq!(select_strategy(&FeeData::default()), Err(FeeProbeError));
    }

    #[test]
    fn test_buffer_math() {
        assert_eq!(with_buffer(100), 120);
        assert_eq!(with_buffer(0), 0);
        // Truncating division: the buffer never overshoots 20%.
        assert_eq!(with_buffer(7), 8);

        assert_eq!(buffered_gas_limit(100_000), 120_000);
        assert_eq!(buffered_gas_limit(u64::MAX), u64::MAX);
    }
}
