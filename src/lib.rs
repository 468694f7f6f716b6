pub mod components;
pub mod core;
pub mod data;
pub mod rules;
pub mod simulation;
pub mod systems;
pub mod world;

// Expose the main Game wrapper and types needed for interaction
pub use crate::core::config::{load_game_config, ConfigError, GameConfig};
pub use crate::core::serialization::SaveState;
pub use crate::core::world::{ActionIntent, Game, Snapshot, TileSummary};
pub use crate::simulation::outcome::{ActionEffect, ActionReport, Rejection};
pub use crate::world::{JsonSaveFile, SaveDb, SaveRepository};
