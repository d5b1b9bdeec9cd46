//! The 4-byte "compact" difficulty encoding used in block headers.
//!
//! One exponent byte (the target's length in bytes) followed by a 3-byte
//! mantissa. Bit 23 of the mantissa is a sign flag inherited from OpenSSL's
//! bignum encoding; it is never set for a valid target.

use crate::U256;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// Decodes compact bits into a target.
///
/// Encodings with the sign bit set describe a negative number and decode to
/// zero. Encodings too large for 256 bits decode to `U256::MAX`.
pub fn compact_to_target(bits: u32) -> U256 {
    let mantissa = bits & MANTISSA_MASK;
    let exponent = bits >> 24;

    if mantissa == 0 {
        return U256::zero();
    }
    if bits & SIGN_BIT != 0 {
        return U256::zero();
    }

    if exponent <= 3 {
        return U256::from(mantissa >> (8 * (3 - exponent)));
    }

    let overflows = exponent > 34
        || (mantissa > 0xff && exponent > 33)
        || (mantissa > 0xffff && exponent > 32);
    if overflows {
        return U256::MAX;
    }

    U256::from(mantissa) << (8 * (exponent as usize - 3))
}

/// Encodes a target into compact bits, dropping everything below the
/// three most significant bytes.
pub fn target_to_compact(target: U256) -> u32 {
    if target.is_zero() {
        return 0;
    }

    let mut exponent = (target.bits() as u32 + 7) / 8;
    let mut mantissa = if exponent <= 3 {
        target.low_u32() << (8 * (3 - exponent))
    } else {
        (target >> (8 * (exponent as usize - 3))).low_u32()
    };

    // Keep the sign bit clear by moving a byte into the exponent.
    if mantissa & SIGN_BIT != 0 {
        mantissa >>= 8;
        exponent += 1;
    }

    (exponent << 24) | mantissa
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_values() {
        assert_eq!(compact_to_target(0x1d00ffff), U256::from(0xffffu64) << 208);
        assert_eq!(compact_to_target(0x1e0fffff), U256::from(0x0fffffu64) << 216);
        assert_eq!(compact_to_target(0x207fffff), U256::from(0x7fffffu64) << 232);
        assert_eq!(compact_to_target(0x03123456), U256::from(0x123456u64));
        assert_eq!(compact_to_target(0x02123456), U256::from(0x1234u64));
        assert_eq!(compact_to_target(0x01123456), U256::from(0x12u64));
        assert_eq!(compact_to_target(0x00123456), U256::zero());
    }

    #[test]
    fn test_decode_sign_bit_and_overflow() {
        assert_eq!(compact_to_target(0x04923456), U256::zero());
        assert_eq!(compact_to_target(0x01fedcba), U256::zero());
        assert_eq!(compact_to_target(0xff123456), U256::MAX);
        assert_eq!(compact_to_target(0x21010000), U256::MAX);
        assert_eq!(compact_to_target(0x22000001), U256::from(1u64) << 248);
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(target_to_compact(U256::zero()), 0);
        assert_eq!(target_to_compact(U256::from(0x80u64)), 0x02008000);
        assert_eq!(target_to_compact(U256::from(0x12u64)), 0x01120000);
        assert_eq!(target_to_compact(U256::from(0x123456u64)), 0x03123456);
        assert_eq!(target_to_compact(U256::from(0xffffu64) << 208), 0x1d00ffff);
        assert_eq!(
            target_to_compact((U256::one() << 255) - U256::one()),
            0x207fffff
        );
        assert_eq!(
            target_to_compact((U256::one() << 224) - U256::one()),
            0x1d00ffff
        );
    }

    #[test]
    fn test_encode_truncates_to_three_bytes() {
        let target = (U256::from(0x123456u64) << 200) + U256::from(0xabcdefu64);
        assert_eq!(target_to_compact(target), 0x1c123456);
    }

    #[test]
    fn test_round_trip_of_network_limits() {
        for bits in [0x1e0fffffu32, 0x1e0ffff0, 0x207fffff, 0x1d00ffff, 0x1e0377ae] {
            let target = compact_to_target(bits);
            assert_eq!(target_to_compact(target), bits);
            assert_eq!(compact_to_target(target_to_compact(target)), target);
        }
    }

    #[test]
    fn test_round_trip_of_encoded_targets() {
        // Anything already truncated to compact precision survives a round trip.
        let mut target = compact_to_target(0x1e0fffff);
        for _ in 0..64 {
            let truncated = compact_to_target(target_to_compact(target));
            assert_eq!(compact_to_target(target_to_compact(truncated)), truncated);
            target = target * U256::from(3u64) / U256::from(7u64);
        }
    }
}
