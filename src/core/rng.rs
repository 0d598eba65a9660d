//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ for every random decision the server makes: first-turn
//! coin flips and room codes. Fixing the seed makes whole matches reproducible.

use sha2::{Sha256, Digest};

/// Alphabet used for human-shareable room codes.
pub const ROOM_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use broadside::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create an RNG seeded from fresh OS entropy (via a v4 UUID).
    pub fn from_entropy() -> Self {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&bytes[..8]);
        Self::new(u64::from_le_bytes(seed))
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Modulo bias is negligible for the small ranges used here
        (self.next_u64() % max as u64) as u32
    }

    /// Fair coin flip. Uses the high bit, which has the best quality in Xorshift128+.
    #[inline]
    pub fn coin_flip(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }

    /// Generate a room code of `len` characters from [`ROOM_CODE_ALPHABET`].
    pub fn room_code(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| ROOM_CODE_ALPHABET[self.next_int(ROOM_CODE_ALPHABET.len() as u32) as usize] as char)
            .collect()
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a per-match seed from the registry seed and the match id.
///
/// Every match gets an independent stream, yet a fixed registry seed
/// reproduces every coin flip in every match.
pub fn derive_match_seed(registry_seed: u64, match_id: &[u8; 16]) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"BROADSIDE_MATCH_SEED_V1");
    hasher.update(registry_seed.to_le_bytes());
    hasher.update(match_id);

    let hash = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        // Very unlikely to match
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_int() {
        let mut rng = DeterministicRng::new(1234);

        for _ in 0..1000 {
            let val = rng.next_int(100);
            assert!(val < 100);
        }

        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_coin_flip_is_roughly_fair() {
        let mut rng = DeterministicRng::new(99);
        let heads = (0..10_000).filter(|_| rng.coin_flip()).count();
        assert!((4_500..5_500).contains(&heads), "heads = {}", heads);
    }

    #[test]
    fn test_room_code_shape() {
        let mut rng = DeterministicRng::new(31337);
        for _ in 0..100 {
            let code = rng.room_code(6);
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_derive_match_seed() {
        let seed1 = derive_match_seed(1, &[1u8; 16]);
        let seed2 = derive_match_seed(1, &[1u8; 16]);
        assert_eq!(seed1, seed2);

        assert_ne!(seed1, derive_match_seed(1, &[2u8; 16]));
        assert_ne!(seed1, derive_match_seed(2, &[1u8; 16]));
    }
}
