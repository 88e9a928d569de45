//! Claim-Unit Fixed-Point Scaling
//!
//! The reward vault contract accounts amounts as integer "claim units" at
//! 5 decimal places. All off-chain amounts are exact decimals and must scale
//! to units without rounding - a rounded amount would hash to a leaf the
//! on-chain verifier never committed to.

use alloy::primitives::U256;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::core::leaf::EncodingError;

/// Decimal places of the on-chain fixed-point representation.
pub const CLAIM_DECIMALS: u32 = 5;

/// 1.0 token in claim units (10^5).
pub const UNITS_PER_TOKEN: u64 = 100_000;

/// Scale a decimal token amount to integer claim units.
///
/// Fails if the amount is not positive, carries more than
/// [`CLAIM_DECIMALS`] decimal places, or overflows the unit range.
pub fn scale_amount(amount: Decimal) -> Result<U256, EncodingError> {
    if amount <= Decimal::ZERO {
        return Err(EncodingError::NonPositiveAmount(amount));
    }

    let scaled = amount
        .checked_mul(Decimal::from(UNITS_PER_TOKEN))
        .ok_or(EncodingError::AmountOverflow(amount))?;

    if !scaled.fract().is_zero() {
        return Err(EncodingError::UnrepresentableAmount(amount));
    }

    let units = scaled
        .trunc()
        .to_u128()
        .ok_or(EncodingError::AmountOverflow(amount))?;

    Ok(U256::from(units))
}

/// Convert claim units back to a decimal token amount for display.
///
/// Returns `None` if the unit count exceeds the decimal range.
pub fn units_to_amount(units: U256) -> Option<Decimal> {
    let raw: u128 = units.try_into().ok()?;
    let mut amount = Decimal::from_u128(raw)?;
    amount.set_scale(CLAIM_DECIMALS).ok()?;
    Some(amount.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_whole_amount_scales() {
        let units = scale_amount(dec!(4518)).unwrap();
        assert_eq!(units, U256::from(451_800_000u64));
    }

    #[test]
    fn test_fractional_amount_scales() {
        let units = scale_amount(dec!(0.00001)).unwrap();
        assert_eq!(units, U256::from(1u64));

        let units = scale_amount(dec!(12.5)).unwrap();
        assert_eq!(units, U256::from(1_250_000u64));
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert!(matches!(
            scale_amount(Decimal::ZERO),
            Err(EncodingError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            scale_amount(dec!(-1)),
            Err(EncodingError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn test_excess_precision_rejected() {
        assert!(matches!(
            scale_amount(dec!(1.000001)),
            Err(EncodingError::UnrepresentableAmount(_))
        ));
    }

    #[test]
    fn test_round_trip_display() {
        let units = scale_amount(dec!(4518.25)).unwrap();
        assert_eq!(units_to_amount(units), Some(dec!(4518.25)));
    }
}
