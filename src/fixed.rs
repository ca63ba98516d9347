//! Fixed-point arithmetic helpers
//!
//! Every DSP routine in the crate works on `i32` samples carrying a few guard
//! bits of headroom. Coefficients are stored as scaled integers (Q8, Q16, Q24
//! or Q28) and applied with the `imuldiv*` family. Products are computed in
//! 64 bits and saturated back into `i32`, so overflow clamps instead of
//! wrapping.

/// Largest envelope value (30-bit unsigned range)
pub const OFFSET_MAX: i32 = 0x3FFF_FFFF;

/// Headroom bits reserved above the 16-bit sample range
pub const GUARD_BITS: i32 = 3;

/// Fractional bits of a final mix amplitude
pub const AMP_BITS: i32 = 15 - GUARD_BITS;

/// Largest final mix amplitude
pub const MAX_AMP_VALUE: i32 = (1 << (AMP_BITS + 1)) - 1;

/// Maximum number of samples a dying voice is ramped out over
pub const MAX_DIE_TIME: i32 = 20;

/// Slots in a voice's pan-delay ring
pub const PAN_DELAY_BUF_MAX: usize = 48;

/// Fixed-point shift of tremolo sweep position
pub const SWEEP_SHIFT: i32 = 16;

/// Fixed-point shift of tremolo phase
pub const RATE_SHIFT: i32 = 5;

/// Length of one cycle of the sine/triangle lookup and LFO wavetables
pub const SINE_CYCLE_LENGTH: usize = 1024;

#[inline]
fn saturate(x: i64) -> i32 {
    x.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// `(a * b) >> 8`
#[inline]
pub fn imuldiv8(a: i32, b: i32) -> i32 {
    saturate((a as i64 * b as i64) >> 8)
}

/// `(a * b) >> 16`
#[inline]
pub fn imuldiv16(a: i32, b: i32) -> i32 {
    saturate((a as i64 * b as i64) >> 16)
}

/// `(a * b) >> 24`
#[inline]
pub fn imuldiv24(a: i32, b: i32) -> i32 {
    saturate((a as i64 * b as i64) >> 24)
}

/// `(a * b) >> 28`
#[inline]
pub fn imuldiv28(a: i32, b: i32) -> i32 {
    saturate((a as i64 * b as i64) >> 28)
}

/// Scale a float into a fixed-point integer with `bits` fractional bits.
///
/// `as` casts from float saturate, so out-of-range values clamp.
#[inline]
pub fn fscale(x: f64, bits: i32) -> i32 {
    (x * (1u64 << bits) as f64) as i32
}

/// Inverse of [`fscale`]: divide by `2^bits`.
#[inline]
pub fn fscale_neg(x: f64, bits: i32) -> f64 {
    x / (1u64 << bits) as f64
}

/// Clamp `val` into `[min, max]`.
#[inline]
pub fn clip_int(val: i32, min: i32, max: i32) -> i32 {
    if val < min {
        min
    } else if val > max {
        max
    } else {
        val
    }
}

/// Sign of `x` as -1, 0 or 1.
#[inline]
pub fn sign(x: i32) -> i32 {
    x.signum()
}

/// Primality test used to pick delay-line lengths free of common factors.
pub fn is_prime(val: i32) -> bool {
    if val == 2 {
        return true;
    }
    if val < 2 || val & 1 == 0 {
        return false;
    }
    let limit = (val as f64).sqrt() as i32 + 1;
    let mut i = 3;
    while i < limit {
        if val % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// Smallest prime `>= val`.
pub fn next_prime(mut val: i32) -> i32 {
    while !is_prime(val) {
        val += 1;
    }
    val
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imuldiv24_unity() {
        let one = fscale(1.0, 24);
        assert_eq!(imuldiv24(12345, one), 12345, "Q24 unity gain must be exact");
        assert_eq!(imuldiv24(-12345, one), -12345);
    }

    #[test]
    fn test_imuldiv_saturates() {
        assert_eq!(imuldiv8(i32::MAX, i32::MAX), i32::MAX, "positive overflow must clamp");
        assert_eq!(imuldiv8(i32::MIN, i32::MAX), i32::MIN, "negative overflow must clamp");
    }

    #[test]
    fn test_fscale_roundtrip() {
        let x = fscale(0.75, 16);
        assert_eq!(x, 49152);
        assert!((fscale_neg(x as f64, 16) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_amp_constants() {
        assert_eq!(AMP_BITS, 12);
        assert_eq!(MAX_AMP_VALUE, 8191);
    }

    #[test]
    fn test_is_prime() {
        let primes: Vec<i32> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert_eq!(next_prime(1116), 1117);
        assert_eq!(next_prime(25), 29);
    }

    #[test]
    fn test_clip_int() {
        assert_eq!(clip_int(-5, 0, 10), 0);
        assert_eq!(clip_int(15, 0, 10), 10);
        assert_eq!(clip_int(7, 0, 10), 7);
    }
}
