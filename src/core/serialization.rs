use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::identity::Name;
use crate::components::prospector::Prospector;
use crate::components::world::{EntityId, Position};
use crate::core::config::{MAX_DIMENSION, MIN_DIMENSION};
use crate::core::world::{ActionJournal, ActionQueue, Selection};
use crate::simulation::market::{clamp_price, Market};
use crate::simulation::terrain::GoldField;
use crate::simulation::time::GameTime;
use crate::simulation::trading_post::{TradingPost, MAX_KIT_PRICE, MIN_KIT_PRICE};

pub const SAVE_VERSION: u32 = 1;

/// Save state capturing everything that cannot be regenerated from the seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    #[serde(default = "default_save_version")]
    pub version: u32,
    pub seed: u32,
    pub width: i32,
    pub height: i32,
    pub time: GameTime,
    pub player: SavedPlayer,
    pub market: Market,
    #[serde(default)]
    pub trading_post: TradingPost,
    #[serde(default)]
    pub selection: Option<(i32, i32)>,
    /// Mutable fields of every tile, row-major.
    pub tiles: Vec<SavedTile>,
}

fn default_save_version() -> u32 {
    SAVE_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlayer {
    pub uid: u32,
    pub name: String,
    pub position: (i32, i32),
    pub prospector: Prospector,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedTile {
    pub x: i32,
    pub y: i32,
    pub discovered: bool,
    #[serde(default)]
    pub claimed_by: Option<u32>,
    pub gold_remaining: u32,
}

/// A snapshot that cannot be applied to a world.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveError {
    UnsupportedVersion(u32),
    InvalidDimensions { width: i32, height: i32 },
    TileOutOfBounds { x: i32, y: i32 },
    /// More gold than the generator ever placed there.
    DepositGrew { x: i32, y: i32, saved: u32, generated: u32 },
    ClaimedTown { x: i32, y: i32 },
    PlayerOutOfBounds { x: i32, y: i32 },
    ClaimMismatch { filed: usize, owned: usize },
    InvalidMoney(f64),
    InvalidCarry(f64),
    /// Carried dust weighs more than the pack holds.
    Overloaded { gold_dust: u32, capacity: f64 },
    InvalidStorePrice(f64),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::UnsupportedVersion(version) => {
                write!(f, "unsupported save version {}", version)
            }
            SaveError::InvalidDimensions { width, height } => {
                write!(f, "invalid world size {}x{}", width, height)
            }
            SaveError::TileOutOfBounds { x, y } => write!(f, "tile ({}, {}) is off the map", x, y),
            SaveError::DepositGrew {
                x,
                y,
                saved,
                generated,
            } => write!(
                f,
                "tile ({}, {}) holds {}g but was generated with {}g",
                x, y, saved, generated
            ),
            SaveError::ClaimedTown { x, y } => write!(f, "town tile ({}, {}) is claimed", x, y),
            SaveError::PlayerOutOfBounds { x, y } => {
                write!(f, "player position ({}, {}) is off the map", x, y)
            }
            SaveError::ClaimMismatch { filed, owned } => write!(
                f,
                "player filed {} claims but owns {} tiles",
                filed, owned
            ),
            SaveError::InvalidMoney(money) => write!(f, "invalid money {}", money),
            SaveError::InvalidCarry(max_carry) => write!(f, "invalid max carry {}", max_carry),
            SaveError::Overloaded {
                gold_dust,
                capacity,
            } => write!(
                f,
                "{}g of dust does not fit a pack of {} units",
                gold_dust, capacity
            ),
            SaveError::InvalidStorePrice(price) => {
                write!(f, "store kit price {} is out of range", price)
            }
        }
    }
}

impl std::error::Error for SaveError {}

#[derive(Debug)]
pub enum SaveFileError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for SaveFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveFileError::Io(err) => write!(f, "save file error: {}", err),
            SaveFileError::Json(err) => write!(f, "save file is not valid json: {}", err),
        }
    }
}

impl std::error::Error for SaveFileError {}

impl From<std::io::Error> for SaveFileError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SaveFileError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Extract a serializable snapshot of the world.
pub fn extract_state_from_world(world: &World, player: Entity) -> SaveState {
    let field = world.resource::<GoldField>();

    let player_uid = world.get::<EntityId>(player).map(|id| id.0).unwrap_or(0);
    let player_name = world
        .get::<Name>(player)
        .map(|n| n.0.clone())
        .unwrap_or_else(|| format!("Player {}", player_uid));
    let position = world
        .get::<Position>(player)
        .map(|pos| (pos.x, pos.y))
        .unwrap_or((0, 0));
    let prospector = world
        .get::<Prospector>(player)
        .cloned()
        .unwrap_or_else(|| Prospector::starting(&Default::default()));

    let tiles = field
        .tiles()
        .iter()
        .map(|tile| SavedTile {
            x: tile.x,
            y: tile.y,
            discovered: tile.discovered,
            claimed_by: tile.claimed_by.map(|owner| owner.0),
            gold_remaining: tile.gold_remaining,
        })
        .collect();

    SaveState {
        version: SAVE_VERSION,
        seed: field.seed,
        width: field.width,
        height: field.height,
        time: world.resource::<GameTime>().clone(),
        player: SavedPlayer {
            uid: player_uid,
            name: player_name,
            position,
            prospector,
        },
        market: world.resource::<Market>().clone(),
        trading_post: world.resource::<TradingPost>().clone(),
        selection: world.resource::<Selection>().0.map(|pos| (pos.x, pos.y)),
        tiles,
    }
}

/// Regenerate the field from the saved seed and overlay the saved tile state.
pub fn rebuild_field(state: &SaveState) -> Result<GoldField, SaveError> {
    if state.version != SAVE_VERSION {
        return Err(SaveError::UnsupportedVersion(state.version));
    }
    let dims = MIN_DIMENSION..=MAX_DIMENSION;
    if !dims.contains(&state.width) || !dims.contains(&state.height) {
        return Err(SaveError::InvalidDimensions {
            width: state.width,
            height: state.height,
        });
    }

    let mut field = GoldField::generate(state.seed, state.width, state.height);
    for saved in &state.tiles {
        let Some(tile) = field.tile_mut(saved.x, saved.y) else {
            return Err(SaveError::TileOutOfBounds {
                x: saved.x,
                y: saved.y,
            });
        };
        if saved.gold_remaining > tile.gold_remaining {
            return Err(SaveError::DepositGrew {
                x: saved.x,
                y: saved.y,
                saved: saved.gold_remaining,
                generated: tile.gold_remaining,
            });
        }
        if saved.claimed_by.is_some() && tile.is_town() {
            return Err(SaveError::ClaimedTown {
                x: saved.x,
                y: saved.y,
            });
        }
        tile.discovered = saved.discovered;
        tile.claimed_by = saved.claimed_by.map(EntityId);
        tile.gold_remaining = saved.gold_remaining;
    }
    Ok(field)
}

/// Apply a saved snapshot back into the world. Nothing is written unless the whole
/// snapshot validates.
pub fn apply_state_to_world(
    state: SaveState,
    world: &mut World,
    player: Entity,
) -> Result<(), SaveError> {
    let field = rebuild_field(&state)?;

    let (px, py) = state.player.position;
    if !field.in_bounds(px, py) {
        return Err(SaveError::PlayerOutOfBounds { x: px, y: py });
    }

    let owner = EntityId(state.player.uid);
    let mut prospector = state.player.prospector;
    let owned = field.claimed_by(owner).count();
    let filed = prospector.claims.len();
    let all_owned = prospector.claims.iter().all(|claim| {
        field
            .tile(claim.x, claim.y)
            .is_some_and(|tile| tile.claimed_by == Some(owner))
    });
    if owned != filed || !all_owned {
        return Err(SaveError::ClaimMismatch { filed, owned });
    }
    check_prospector(&prospector)?;
    let price = state.trading_post.price;
    if !price.is_finite() || !(MIN_KIT_PRICE..=MAX_KIT_PRICE).contains(&price) {
        return Err(SaveError::InvalidStorePrice(price));
    }
    prospector.clamp_stamina();

    let mut market = state.market;
    market.price_per_gram = clamp_price(market.price_per_gram);
    market.last_price = clamp_price(market.last_price);

    let selection = state
        .selection
        .filter(|(x, y)| field.in_bounds(*x, *y))
        .map(|(x, y)| Position { x, y });

    world.insert_resource(field);
    world.insert_resource(GameTime::at_tick(state.time.tick));
    world.insert_resource(market);
    world.insert_resource(state.trading_post);
    world.insert_resource(Selection(selection));
    world.insert_resource(ActionQueue::default());
    world.insert_resource(ActionJournal::default());

    if let Some(mut ent) = world.get_entity_mut(player) {
        ent.insert((
            owner,
            Name(state.player.name),
            Position { x: px, y: py },
            prospector,
        ));
    }
    Ok(())
}

fn check_prospector(prospector: &Prospector) -> Result<(), SaveError> {
    if !prospector.money.is_finite() || prospector.money < 0.0 {
        return Err(SaveError::InvalidMoney(prospector.money));
    }
    if !prospector.max_carry.is_finite() || prospector.max_carry < 0.0 {
        return Err(SaveError::InvalidCarry(prospector.max_carry));
    }
    if prospector.encumbrance() > prospector.capacity() {
        return Err(SaveError::Overloaded {
            gold_dust: prospector.gold_dust,
            capacity: prospector.capacity(),
        });
    }
    Ok(())
}

/// Serialize to pretty JSON.
pub fn save_state_to_json(state: &SaveState) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(state)
}

/// Deserialize from JSON.
pub fn load_state_from_json(data: &str) -> Result<SaveState, serde_json::Error> {
    serde_json::from_str(data)
}

/// Save to file path as JSON.
pub fn save_state_to_path<P: AsRef<Path>>(state: &SaveState, path: P) -> Result<(), SaveFileError> {
    let json = save_state_to_json(state)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load from a JSON file.
pub fn load_state_from_path<P: AsRef<Path>>(path: P) -> Result<SaveState, SaveFileError> {
    let data = fs::read_to_string(path)?;
    Ok(load_state_from_json(&data)?)
}
