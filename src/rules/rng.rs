use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the per-action noise roll blended into every yield and price update.
///
/// Tile rolls come from [`coord_random`] and are reproducible; the noise roll is injected so
/// production can draw real entropy while tests pin it down.
pub trait NoiseSource {
    /// Next value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

/// Mulberry32 stream generator: one 32-bit state word, one float per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed the stream from an arbitrary string key.
    pub fn from_key(key: &str) -> Self {
        Self::new(hash_key(key))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }
}

impl NoiseSource for Mulberry32 {
    fn next_unit(&mut self) -> f64 {
        self.next_f64()
    }
}

/// Production noise, seeded from the OS.
#[derive(Debug)]
pub struct EntropyNoise(StdRng);

impl EntropyNoise {
    pub fn new() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl Default for EntropyNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseSource for EntropyNoise {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Noise source that always returns the same value. Clamped into `[0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn next_unit(&mut self) -> f64 {
        if self.0.is_finite() {
            self.0.clamp(0.0, 0.999_999)
        } else {
            0.0
        }
    }
}

/// xmur3-style string hash folded to a single 32-bit word.
pub fn hash_key(key: &str) -> u32 {
    let mut h: u32 = 1_779_033_703 ^ (key.len() as u32);
    for byte in key.bytes() {
        h = (h ^ byte as u32).wrapping_mul(3_432_918_353);
        h = h.rotate_left(13);
    }
    h = (h ^ (h >> 16)).wrapping_mul(2_246_822_507);
    h = (h ^ (h >> 13)).wrapping_mul(3_266_489_909);
    h ^ (h >> 16)
}

/// Turn a free-form seed phrase ("sutter's mill") into a world seed.
pub fn seed_from_phrase(phrase: &str) -> u32 {
    hash_key(phrase)
}

/// Stable pseudo-random value for a (seed, x, y) triple. No shared state.
pub fn coord_random(seed: u32, x: i64, y: i64) -> f64 {
    let key = format!("{}:{}:{}", seed, x, y);
    Mulberry32::from_key(&key).next_f64()
}
