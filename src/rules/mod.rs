pub mod rng;
pub mod skill;

pub use rng::{coord_random, hash_key, EntropyNoise, FixedNoise, Mulberry32, NoiseSource};
pub use skill::{level_from_xp, SkillKind, SkillSet};
