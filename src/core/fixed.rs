//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for power rolls and trait bonuses.
//! Integer arithmetic only; there are no floats anywhere in duel logic.
//!
//! ## Format: Q16.16 in an `i64`
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: 48 integer bits + 16 fractional bits           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIII ... 47 bits ... IIII][FFFFFFFFFFFFFFFF]           │
//! │                                 └──── 16 bits ────┘         │
//! │                                                             │
//! │  Precision: 1/65536 ≈ 0.000015                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Weapon multipliers and trait bonuses are small (around 1.0) but they
//! multiply character power values that can reach the tens of thousands,
//! so the value is widened to `i64` and products go through `i128`.

/// Q16.16 fixed-point number stored as i64.
pub type Fixed = i64;

/// Number of fractional bits (16)
pub const FIXED_SCALE: u32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

/// Default fight trait bonus: 0.075 = floor(75 * 65536 / 1000) = 4915
pub const DEFAULT_TRAIT_BONUS: Fixed = 75 * FIXED_ONE / 1000;

/// Multiply two fixed-point numbers.
///
/// Uses an i128 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i128) * (b as i128);
    (wide >> FIXED_SCALE) as Fixed
}

/// Multiply a fixed-point factor by an unsigned integer, truncating the result.
///
/// Negative factors produce 0; results beyond `u64::MAX` saturate.
#[inline]
pub fn mul_uint(factor: Fixed, value: u64) -> u64 {
    if factor <= 0 {
        return 0;
    }
    let wide = (factor as u128) * (value as u128);
    u64::try_from(wide >> FIXED_SCALE).unwrap_or(u64::MAX)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(DEFAULT_TRAIT_BONUS, 4915);
    }

    #[test]
    fn test_fixed_mul() {
        let two = 2 * FIXED_ONE;
        let three = 3 * FIXED_ONE;
        assert_eq!(fixed_mul(two, three), 6 * FIXED_ONE);
        assert_eq!(fixed_mul(FIXED_HALF, FIXED_HALF), FIXED_ONE / 4);
        assert_eq!(fixed_mul(-two, three), -6 * FIXED_ONE);
        // Half of the trait bonus truncates.
        assert_eq!(fixed_mul(DEFAULT_TRAIT_BONUS, FIXED_HALF), 2457);
    }

    #[test]
    fn test_mul_uint_truncates() {
        // 1.5 * 1001 = 1501.5 -> 1501
        assert_eq!(mul_uint(FIXED_ONE + FIXED_HALF, 1001), 1501);
        assert_eq!(mul_uint(FIXED_ONE, 42), 42);
        assert_eq!(mul_uint(-FIXED_ONE, 42), 0);
        assert_eq!(mul_uint(0, 42), 0);
    }

    #[test]
    fn test_trait_bonus_arithmetic() {
        // 1.0 + 0.075 + 0.0375 applied to 10_000 power
        let bonus = FIXED_ONE + DEFAULT_TRAIT_BONUS + DEFAULT_TRAIT_BONUS / 2;
        assert_eq!(mul_uint(bonus, 10_000), 11_124);
    }
}
