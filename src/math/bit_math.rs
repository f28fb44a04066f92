use crate::error::MathError;
use alloy_primitives::U256;

/// Returns the index (0-255) of the most significant set bit of `x`,
/// or `ZeroValue` if the input is zero.
pub fn most_significant_bit(x: U256) -> Result<u8, MathError> {
    if x.is_zero() {
        return Err(MathError::ZeroValue);
    }
    Ok(255 - x.leading_zeros() as u8)
}

/// Returns the index (0-255) of the least significant set bit of `x`,
/// or `ZeroValue` if the input is zero.
///
/// The bitmap search uses this when scanning upward for the first
/// initialized tick in a word.
pub fn least_significant_bit(x: U256) -> Result<u8, MathError> {
    if x.is_zero() {
        return Err(MathError::ZeroValue);
    }
    Ok(x.trailing_zeros() as u8)
}
