//! Pseudo-unique identifiers: nonces and asset ids
//!
//! Ids are cheap, collision-resistant values built from random bits, the
//! current time in nanoseconds and an MD5-derived content hash. They are not
//! secrets and must not be used as such.
//!
//! Asset ids follow a fixed layout (bit 0 is the least significant):
//!
//! | bits  | width | source                                        |
//! |-------|-------|-----------------------------------------------|
//! | 0-19  | 20    | low 20 bits of the base id (e.g. app id)      |
//! | 20-31 | 12    | bits 4-15 of a first random id                |
//! | 32    | 1     | flag                                          |
//! | 33-40 | 8     | low 8 bits of a second random id              |
//! | 41-56 | 16    | low 16 bits of the content hash               |
//! | 57-60 | 4     | bits 0-3 of the second random id              |
//! | 61-63 | 3     | always zero                                   |
//!
//! # Examples
//!
//! ```
//! use xasset_sdk::id::{gen_asset_id, gen_nonce};
//!
//! let asset_id = gen_asset_id(12345);
//! assert_eq!(asset_id & 0xFFFFF, 12345);
//!
//! let nonce = gen_nonce();
//! assert!(nonce >= 0);
//! ```

use crate::auth::clock::{Clock, SystemClock};
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, RngCore, SeedableRng};
use std::sync::{Arc, OnceLock};

/// Clears the sign bit of a 64-bit value
pub const MASK_63: u64 = 0x7FFF_FFFF_FFFF_FFFF;

/// Base id bits carried into every packed id
pub const BASE_ID_MASK: u64 = 0xF_FFFF;

const FALLBACK_HOSTNAME: &str = "127.0.0.1";

/// Generator of random ids, nonces and packed ids.
///
/// Each generator owns its random source, so independent generators never
/// contend. Use [`IdGenerator::new`] for a thread-local CSPRNG or
/// [`IdGenerator::from_seed`] for reproducible output.
pub struct IdGenerator<R = ThreadRng> {
    rng: R,
    clock: Arc<dyn Clock>,
}

impl IdGenerator<ThreadRng> {
    /// Generator backed by the thread-local CSPRNG
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for IdGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator<StdRng> {
    /// Deterministic generator, mostly for tests
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> IdGenerator<R> {
    /// Generator drawing from `rng`
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the nanosecond time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// A 63-bit pseudo-random id mixing two random draws with the clock
    pub fn random_id(&mut self) -> u64 {
        let nanos = self.clock.unix_nanos() as u64;
        let r1 = self.rng.gen::<u64>() & MASK_63;
        let r2 = self.rng.gen::<u64>() & MASK_63;
        let shift1: u32 = self.rng.gen_range(2..=17);
        let shift2: u32 = self.rng.gen_range(1..=8);

        (r1 >> shift1)
            .wrapping_add(r2 >> shift2)
            .wrapping_add(nanos >> 1)
            & MASK_63
    }

    /// A non-negative replay-protection nonce.
    ///
    /// Collisions are unlikely but possible; the service detects reuse.
    pub fn nonce(&mut self) -> i64 {
        let first = self.random_id();
        let second = self.random_id();
        let content = format!(
            "{}#{}#{}#{}",
            first,
            second,
            self.clock.unix_nanos(),
            hostname()
        );
        (content_hash64(&content) & MASK_63) as i64
    }

    /// Pack `base_id`'s low 20 bits, `flag` and fresh randomness into an id
    pub fn packed_id(&mut self, base_id: u64, flag: bool) -> u64 {
        let flag = u64::from(flag);
        let hash = content_hash64(&format!(
            "{}#{}#{}",
            base_id,
            flag,
            self.clock.unix_nanos()
        ));
        let first = self.random_id();
        let second = self.random_id();

        (base_id & BASE_ID_MASK)
            | (((first >> 4) & 0xFFF) << 20)
            | (flag << 32)
            | ((second & 0xFF) << 33)
            | ((hash & 0xFFFF) << 41)
            | ((second & 0xF) << 57)
    }

    /// Asset id for an application
    pub fn asset_id(&mut self, app_id: i64) -> i64 {
        self.packed_id(app_id as u64, false) as i64
    }
}

/// Fold the MD5 digest of `content` into 64 bits.
///
/// The digest is read as four little-endian words `w0..w3`; the result is
/// `(w0 + w2) | (w1 + w3) << 32` with 32-bit wrapping additions.
pub fn content_hash64(content: &str) -> u64 {
    let digest = md5::compute(content.as_bytes()).0;
    let word = |i: usize| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&digest[i * 4..i * 4 + 4]);
        u32::from_le_bytes(bytes)
    };
    let low = word(0).wrapping_add(word(2));
    let high = word(1).wrapping_add(word(3));
    u64::from(low) | (u64::from(high) << 32)
}

/// Host name mixed into nonces, resolved once per process
pub fn hostname() -> &'static str {
    static HOSTNAME: OnceLock<String> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        ::hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_HOSTNAME.to_string())
    })
}

/// A 63-bit random id from the thread-local generator
pub fn random_id() -> u64 {
    IdGenerator::new().random_id()
}

/// A nonce from the thread-local generator
pub fn gen_nonce() -> i64 {
    IdGenerator::new().nonce()
}

/// A packed id from the thread-local generator
pub fn packed_id(base_id: u64, flag: bool) -> u64 {
    IdGenerator::new().packed_id(base_id, flag)
}

/// An asset id for `app_id` from the thread-local generator
pub fn gen_asset_id(app_id: i64) -> i64 {
    IdGenerator::new().asset_id(app_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::FixedClock;
    use std::collections::HashSet;

    fn seeded(seed: u64) -> IdGenerator<StdRng> {
        IdGenerator::from_seed(seed).with_clock(Arc::new(FixedClock::at_unix(1_700_000_000)))
    }

    #[test]
    fn test_content_hash64_vectors() {
        assert_eq!(content_hash64(""), 0x82f4_f97b_7195_9ebd);
        assert_eq!(content_hash64("hello world"), 0x94bb_796f_765e_81f1);
    }

    #[test]
    fn test_random_id_top_bit_clear() {
        let mut generator = IdGenerator::new();
        for _ in 0..10_000 {
            assert_eq!(generator.random_id() >> 63, 0);
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = seeded(7);
        let mut b = seeded(7);
        assert_eq!(a.random_id(), b.random_id());
        assert_eq!(a.packed_id(42, true), b.packed_id(42, true));
        assert_eq!(a.nonce(), b.nonce());

        let mut c = seeded(8);
        assert_ne!(seeded(7).random_id(), c.random_id());
    }

    #[test]
    fn test_packed_id_low_bits() {
        let mut generator = IdGenerator::new();
        for base in [0u64, 1, 12345, 0xFFFFF, 0x1_2345_6789, u64::MAX] {
            for i in 0..1000 {
                let id = generator.packed_id(base, i % 2 == 0);
                assert_eq!(id & BASE_ID_MASK, base & BASE_ID_MASK);
            }
        }
    }

    #[test]
    fn test_packed_id_layout() {
        let mut generator = IdGenerator::new();
        for _ in 0..1000 {
            let flagged = generator.packed_id(99, true);
            assert_eq!((flagged >> 32) & 1, 1);
            assert_eq!(flagged >> 61, 0);

            let plain = generator.packed_id(99, false);
            assert_eq!((plain >> 32) & 1, 0);
            assert_eq!(plain >> 61, 0);
        }
    }

    #[test]
    fn test_packed_id_hash_field() {
        let clock = FixedClock::at_unix(1_700_000_000);
        let mut generator = IdGenerator::from_seed(3).with_clock(Arc::new(clock));
        let id = generator.packed_id(77, true);
        let hash = content_hash64(&format!("77#1#{}", clock.unix_nanos()));
        assert_eq!((id >> 41) & 0xFFFF, hash & 0xFFFF);
        assert_eq!((id >> 57) & 0xF, (id >> 33) & 0xF);
    }

    #[test]
    fn test_asset_id_positive() {
        for app_id in [1i64, 110380, 1 << 40] {
            let asset_id = gen_asset_id(app_id);
            assert!(asset_id >= 0);
            assert_eq!(asset_id as u64 & BASE_ID_MASK, app_id as u64 & BASE_ID_MASK);
        }
    }

    #[test]
    fn test_nonce_non_negative() {
        for _ in 0..1000 {
            assert!(gen_nonce() >= 0);
        }
    }

    #[test]
    fn test_nonce_collisions_rare() {
        let mut generator = IdGenerator::new();
        let mut seen = HashSet::with_capacity(100_000);
        for _ in 0..100_000 {
            assert!(seen.insert(generator.nonce()));
        }
    }

    #[test]
    #[ignore = "slow: one million nonces"]
    fn test_nonce_collisions_million() {
        let mut generator = IdGenerator::new();
        let mut seen = HashSet::with_capacity(1_000_000);
        let duplicates = (0..1_000_000)
            .filter(|_| !seen.insert(generator.nonce()))
            .count();
        assert_eq!(duplicates, 0);
    }

    #[test]
    fn test_concurrent_generation() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    let mut generator = IdGenerator::new();
                    (0..1000).map(|_| generator.nonce()).collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for nonce in handle.join().unwrap() {
                assert!(seen.insert(nonce));
            }
        }
    }

    #[test]
    fn test_hostname_cached() {
        assert!(!hostname().is_empty());
        assert!(std::ptr::eq(hostname(), hostname()));
    }
}
