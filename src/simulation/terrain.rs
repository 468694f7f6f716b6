use std::fmt;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::world::{EntityId, Position};
use crate::rules::rng::coord_random;

pub const DEFAULT_WIDTH: i32 = 64;
pub const DEFAULT_HEIGHT: i32 = 48;
pub const DEFAULT_SEED: u32 = 1849;

const RIVER_HALF_WIDTH: f64 = 0.8;
const MAX_DENSITY: f64 = 0.95;
const GRAMS_PER_DENSITY: f64 = 120.0;
const RICH_ROLL: f64 = 0.97;
const RICH_BONUS_GRAMS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Plains,
    Forest,
    River,
    Mountain,
    Town,
}

impl Terrain {
    pub fn as_str(self) -> &'static str {
        match self {
            Terrain::Plains => "plains",
            Terrain::Forest => "forest",
            Terrain::River => "river",
            Terrain::Mountain => "mountain",
            Terrain::Town => "town",
        }
    }

    /// One-character glyph for terminal maps.
    pub fn glyph(self) -> char {
        match self {
            Terrain::Plains => '.',
            Terrain::Forest => 'f',
            Terrain::River => '~',
            Terrain::Mountain => '^',
            Terrain::Town => 'T',
        }
    }

    fn difficulty(self) -> f64 {
        match self {
            Terrain::Mountain => 1.25,
            Terrain::River => 0.9,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub terrain: Terrain,
    pub discovered: bool,
    pub claimed_by: Option<EntityId>,
    pub gold_remaining: u32,
    pub difficulty: f64,
}

impl Tile {
    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }

    pub fn is_town(&self) -> bool {
        self.terrain == Terrain::Town
    }

    /// Remove up to `grams` from the deposit and return what was actually taken.
    pub fn deplete(&mut self, grams: u32) -> u32 {
        let taken = grams.min(self.gold_remaining);
        self.gold_remaining -= taken;
        taken
    }
}

/// The two fixed town sites for a grid of the given size.
pub fn town_sites(width: i32, height: i32) -> [Position; 2] {
    [
        Position {
            x: width * 15 / 100,
            y: height * 70 / 100,
        },
        Position {
            x: width * 80 / 100,
            y: height * 30 / 100,
        },
    ]
}

/// Centre line of the meandering river at column `x`.
pub fn river_band(x: i32, height: i32) -> f64 {
    (x as f64 / 10.0).sin() * 3.0 + (height as f64 / 2.0 - 2.0)
}

/// Build one tile from nothing but the seed and its coordinates.
pub fn generate_tile(seed: u32, width: i32, height: i32, x: i32, y: i32) -> Tile {
    let r = coord_random(seed, x as i64, y as i64);
    let dist_to_river = (y as f64 - river_band(x, height)).abs();

    let natural = if dist_to_river < RIVER_HALF_WIDTH {
        Terrain::River
    } else if r < 0.15 {
        Terrain::Forest
    } else if r > 0.85 {
        Terrain::Mountain
    } else {
        Terrain::Plains
    };

    let density = match natural {
        Terrain::River => 0.55 + 0.30 * (1.0 - dist_to_river / RIVER_HALF_WIDTH) + 0.10 * r,
        Terrain::Mountain => 0.25 + 0.35 * r,
        Terrain::Forest => 0.10 + 0.20 * r,
        Terrain::Plains | Terrain::Town => 0.05 + 0.15 * r,
    }
    .clamp(0.0, MAX_DENSITY);

    let mut deposit = (density * GRAMS_PER_DENSITY).floor() as u32;
    if r > RICH_ROLL {
        deposit += RICH_BONUS_GRAMS;
    }

    let here = Position { x, y };
    let is_town = town_sites(width, height).contains(&here);

    Tile {
        x,
        y,
        terrain: if is_town { Terrain::Town } else { natural },
        discovered: false,
        claimed_by: None,
        gold_remaining: if is_town { 0 } else { deposit },
        difficulty: natural.difficulty(),
    }
}

/// The world grid. Tiles are stored row-major.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct GoldField {
    pub seed: u32,
    pub width: i32,
    pub height: i32,
    tiles: Vec<Tile>,
}

impl GoldField {
    pub fn generate(seed: u32, width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut tiles = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                tiles.push(generate_tile(seed, width, height, x, y));
            }
        }
        Self {
            seed,
            width,
            height,
            tiles,
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| (y * self.width + x) as usize)
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        self.index(x, y).map(|idx| &self.tiles[idx])
    }

    pub fn tile_mut(&mut self, x: i32, y: i32) -> Option<&mut Tile> {
        self.index(x, y).map(move |idx| &mut self.tiles[idx])
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn towns(&self) -> [Position; 2] {
        town_sites(self.width, self.height)
    }

    /// Nearest town by walking distance; ties go to the first site.
    pub fn nearest_town(&self, from: Position) -> (Position, u32) {
        let towns = self.towns();
        let mut best = (towns[0], from.manhattan(towns[0]));
        for town in towns.iter().skip(1) {
            let dist = from.manhattan(*town);
            if dist < best.1 {
                best = (*town, dist);
            }
        }
        best
    }

    /// Tiles currently owned by `owner`, row-major.
    pub fn claimed_by(&self, owner: EntityId) -> impl Iterator<Item = &Tile> {
        self.tiles
            .iter()
            .filter(move |tile| tile.claimed_by == Some(owner))
    }

    pub fn total_gold(&self) -> u64 {
        self.tiles.iter().map(|tile| tile.gold_remaining as u64).sum()
    }
}
