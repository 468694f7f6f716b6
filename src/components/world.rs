use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// A cell on the gold field grid.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Stable identifier for addressing entities externally; also the claim owner id.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Marker component for the human player.
#[derive(Component, Debug)]
pub struct Player;
