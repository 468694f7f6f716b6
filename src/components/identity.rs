use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Cosmetic display name.
#[derive(Component, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);
