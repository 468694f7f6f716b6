use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::components::prospector::StartingKit;
use crate::rules::rng::seed_from_phrase;
use crate::simulation::terrain::{DEFAULT_HEIGHT, DEFAULT_SEED, DEFAULT_WIDTH};

pub const MIN_DIMENSION: i32 = 8;
pub const MAX_DIMENSION: i32 = 512;

/// World and starting-player settings, read from an optional JSON file.
///
/// ```json
/// { "seed": "sutter's mill", "width": 80, "height": 60,
///   "starting_kit": { "money": 150.0, "equipment": ["pan"] } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// A number, or any phrase that hashes to one.
    #[serde(deserialize_with = "deserialize_seed")]
    pub seed: u32,
    pub width: i32,
    pub height: i32,
    pub starting_kit: StartingKit,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            starting_kit: StartingKit::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Json { path: String, source: serde_json::Error },
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "failed to read {}: {}", path, source),
            ConfigError::Json { path, source } => {
                write!(f, "failed to parse {}: {}", path, source)
            }
            ConfigError::Validation(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Numeric strings are taken literally; anything else is hashed.
pub fn parse_seed(value: &str) -> u32 {
    let value = value.trim();
    value
        .parse::<u32>()
        .unwrap_or_else(|_| seed_from_phrase(value))
}

fn deserialize_seed<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SeedValue {
        Number(u32),
        Phrase(String),
    }

    Ok(match SeedValue::deserialize(deserializer)? {
        SeedValue::Number(seed) => seed,
        SeedValue::Phrase(phrase) => parse_seed(&phrase),
    })
}

impl GameConfig {
    /// Pull width and height into the supported range. Returns true when either changed.
    pub fn clamp_dimensions(&mut self) -> bool {
        let width = self.width.clamp(MIN_DIMENSION, MAX_DIMENSION);
        let height = self.height.clamp(MIN_DIMENSION, MAX_DIMENSION);
        let changed = (width, height) != (self.width, self.height);
        self.width = width;
        self.height = height;
        changed
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, value) in [("width", self.width), ("height", self.height)] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{} must be between {} and {}, got {}",
                    label, MIN_DIMENSION, MAX_DIMENSION, value
                )));
            }
        }
        let kit = &self.starting_kit;
        for (label, value) in [
            ("money", kit.money),
            ("stamina", kit.stamina),
            ("max_carry", kit.max_carry),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "starting {} must be a non-negative number",
                    label
                )));
            }
        }
        if kit.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "starting name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn parse_game_config(raw: &str, path: &str) -> Result<GameConfig, ConfigError> {
    let config: GameConfig = serde_json::from_str(raw).map_err(|source| ConfigError::Json {
        path: path.to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_game_config(path: impl AsRef<Path>) -> Result<GameConfig, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_game_config(&raw, &path.display().to_string())
}
