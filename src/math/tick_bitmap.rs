use crate::error::PoolError;
use crate::math::bit_math::{least_significant_bit, most_significant_bit};
use crate::{FastMap, U256_1};
use alloy_primitives::U256;
use std::ops::Shr;

/// Maps a compressed tick index into the `(word, bit)` coordinates of
/// the sparse initialized-tick bitmap.
pub fn position(tick: i32) -> (i16, u8) {
    (tick.shr(8) as i16, (tick % 256) as u8)
}

/// Returns the bitmap word stored at `word`, or zero if absent.
pub fn get_word(bitmap: &FastMap<i16, U256>, word: i16) -> U256 {
    *bitmap.get(&word).unwrap_or(&U256::ZERO)
}

/// Toggles the initialized flag of a tick in the bitmap.
///
/// `tick` must be aligned to `tick_spacing`; misaligned ticks are not
/// addressable and yield `InvalidTick`.
pub fn flip_tick(
    tick_bitmap: &mut FastMap<i16, U256>,
    tick: i32,
    tick_spacing: i32,
) -> Result<(), PoolError> {
    if tick % tick_spacing != 0 {
        return Err(PoolError::InvalidTick);
    }

    let (word_pos, bit_pos) = position(tick / tick_spacing);
    let mask = U256_1 << bit_pos;
    let word = get_word(tick_bitmap, word_pos);
    tick_bitmap.insert(word_pos, word ^ mask);
    Ok(())
}

/// Searches one 256-bit bitmap word for the next initialized tick at or
/// below `tick` (`lte = true`) or strictly above it (`lte = false`).
///
/// Returns the candidate tick and whether it is actually initialized;
/// an uninitialized candidate marks the word boundary, letting the
/// swap loop hop words in constant time per step instead of scanning
/// tick by tick.
pub fn next_initialized_tick_within_one_word(
    bitmap: &FastMap<i16, U256>,
    tick: i32,
    tick_spacing: i32,
    lte: bool,
) -> Result<(i32, bool), PoolError> {
    let mut compressed: i32 = tick / tick_spacing;

    // Round toward negative infinity for negative ticks.
    if tick < 0 && tick % tick_spacing != 0 {
        compressed -= 1;
    }

    if lte {
        let (word_pos, bit_pos) = position(compressed);

        // Bits at or below the current position.
        let mask: U256 = (U256_1 << bit_pos) - U256_1 + (U256_1 << bit_pos);
        let masked: U256 = get_word(bitmap, word_pos) & mask;

        let initialized = !masked.is_zero();

        let next: i32 = if initialized {
            (compressed - (bit_pos - most_significant_bit(masked)?) as i32) * tick_spacing
        } else {
            (compressed - bit_pos as i32) * tick_spacing
        };
        Ok((next, initialized))
    } else {
        let (word_pos, bit_pos) = position(compressed + 1);

        // Bits at or above the next position.
        let mask: U256 = ((U256_1 << bit_pos) - U256_1) ^ U256::MAX;
        let masked: U256 = get_word(bitmap, word_pos) & mask;

        let initialized = !masked.is_zero();

        let next: i32 = if initialized {
            (compressed + 1 + (least_significant_bit(masked)? - bit_pos) as i32) * tick_spacing
        } else {
            (compressed + 1 + (255u8 - bit_pos) as i32) * tick_spacing
        };
        Ok((next, initialized))
    }
}
