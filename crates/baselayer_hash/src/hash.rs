//! # Hash Functions
//!
//! DJB2 for byte strings and a multiply-xorshift avalanche for integers.

/// Initial DJB2 state.
pub const DJB2_SEED: u64 = 5381;

/// Multiplier of the avalanche mixers.
const MIX_MULTIPLIER: u32 = 0x045d_9f3b;

/// 32-bit avalanche mixer.
#[inline]
#[must_use]
pub const fn hash32(mut x: u32) -> u32 {
    x = ((x >> 16) ^ x).wrapping_mul(MIX_MULTIPLIER);
    x = ((x >> 16) ^ x).wrapping_mul(MIX_MULTIPLIER);
    (x >> 16) ^ x
}

/// 64-bit avalanche mixer, same rounds as [`hash32`] on a 64-bit word.
#[inline]
#[must_use]
pub const fn hash64(mut x: u64) -> u64 {
    x = ((x >> 16) ^ x).wrapping_mul(MIX_MULTIPLIER as u64);
    x = ((x >> 16) ^ x).wrapping_mul(MIX_MULTIPLIER as u64);
    (x >> 16) ^ x
}

/// DJB2: `hash = hash * 33 + byte` over every byte, starting from 5381.
#[inline]
#[must_use]
pub fn djb2(bytes: &[u8]) -> u64 {
    bytes.iter().fold(DJB2_SEED, |hash, &byte| {
        (hash << 5).wrapping_add(hash).wrapping_add(u64::from(byte))
    })
}

/// The string hash used for map keys: plain DJB2.
#[inline]
#[must_use]
pub fn hash_string(bytes: &[u8]) -> u64 {
    djb2(bytes)
}

/// DJB2 passed through [`hash64`], for slot selection with fewer clusters.
#[inline]
#[must_use]
pub fn mixed_string_hash(bytes: &[u8]) -> u64 {
    hash64(djb2(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_djb2_known_values() {
        assert_eq!(djb2(b""), 5381);
        assert_eq!(djb2(b"a"), 5381 * 33 + 97);
        assert_eq!(djb2(b"ab"), (5381 * 33 + 97) * 33 + 98);
    }

    #[test]
    fn test_djb2_wraps() {
        let long = vec![0xFFu8; 4096];
        let _ = djb2(&long);
    }

    #[test]
    fn test_mixers_fix_zero() {
        assert_eq!(hash32(0), 0);
        assert_eq!(hash64(0), 0);
    }

    #[test]
    fn test_mixers_spread_neighbours() {
        assert_ne!(hash64(1), hash64(2));
        assert_ne!(hash32(1) & 0xFF, hash32(2) & 0xFF);
        assert_ne!(
            mixed_string_hash(b"PSD_fluxpos_blitarea") % 64,
            mixed_string_hash(b"PSD_fluxposB_blitarea") % 64
        );
    }

    #[test]
    fn test_similar_keys_differ() {
        let keys: [&[u8]; 4] = [
            b"PSDbefore_guides_blitarea",
            b"PSDbefore_curve_blitarea",
            b"PSDafter_curve_blitarea",
            b"lambda_sample_blitarea",
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(hash_string(a), hash_string(b));
            }
        }
    }
}
