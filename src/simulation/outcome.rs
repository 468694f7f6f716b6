use std::fmt;

use crate::components::prospector::ClaimRecord;
use crate::components::world::Position;
use crate::data::equipment::EquipmentKey;
use crate::simulation::camp::Journey;
use crate::simulation::extraction::Extraction;
use crate::simulation::market::{Purchase, Sale};
use crate::simulation::terrain::Terrain;
use crate::simulation::trading_post::StoreDay;

/// Why an action was refused. A rejected action never mutates state.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NoTileSelected,
    OutOfBounds { x: i32, y: i32 },
    TownTile,
    WrongTerrain { action: &'static str, needed: Terrain },
    MissingEquipment(EquipmentKey),
    InsufficientStamina { needed: f64, available: f64 },
    InsufficientFunds { needed: f64, available: f64 },
    PackFull,
    AlreadyClaimed,
    ClaimedByOther,
    DepositTooSmall { remaining: u32, minimum: u32 },
    NothingToSell,
    AlreadyOwned(EquipmentKey),
    UnknownEquipment(String),
    AlreadyRested,
    AlreadyInTown,
    NotInTown,
    StoreAlreadyOpen,
    StoreClosed,
    InvalidPrice { price: f64, min: f64, max: f64 },
    /// No system picked the intent up.
    Ignored,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoTileSelected => write!(f, "Select a tile first."),
            Rejection::OutOfBounds { x, y } => write!(f, "({}, {}) is off the map.", x, y),
            Rejection::TownTile => write!(f, "There is no digging inside town."),
            Rejection::WrongTerrain { action, needed } => {
                write!(f, "You can only {} on {} tiles.", action, needed)
            }
            Rejection::MissingEquipment(key) => {
                write!(f, "You need a {} for that.", key.spec().name)
            }
            Rejection::InsufficientStamina { needed, available } => write!(
                f,
                "Too tired: needs {:.0} stamina, you have {:.0}.",
                needed, available
            ),
            Rejection::InsufficientFunds { needed, available } => write!(
                f,
                "Not enough money: needs ${:.2}, you have ${:.2}.",
                needed, available
            ),
            Rejection::PackFull => write!(f, "Your pack is full. Sell some gold first."),
            Rejection::AlreadyClaimed => write!(f, "This tile is already claimed."),
            Rejection::ClaimedByOther => write!(f, "Someone else holds the claim here."),
            Rejection::DepositTooSmall { remaining, minimum } => write!(
                f,
                "Only {}g left here; a claim needs at least {}g.",
                remaining, minimum
            ),
            Rejection::NothingToSell => write!(f, "You have no gold dust to sell."),
            Rejection::AlreadyOwned(key) => write!(f, "You already own a {}.", key.spec().name),
            Rejection::UnknownEquipment(value) => write!(f, "The store has no {}.", value),
            Rejection::AlreadyRested => write!(f, "You are already fully rested."),
            Rejection::AlreadyInTown => write!(f, "You are already in town."),
            Rejection::NotInTown => write!(f, "You need to be in town for that."),
            Rejection::StoreAlreadyOpen => write!(f, "Your store is already open."),
            Rejection::StoreClosed => write!(f, "You have not opened a store yet."),
            Rejection::InvalidPrice { price, min, max } => write!(
                f,
                "Price ${:.2} is outside ${:.2}..=${:.2}.",
                price, min, max
            ),
            Rejection::Ignored => write!(f, "Nothing happened."),
        }
    }
}

impl std::error::Error for Rejection {}

/// What an accepted action changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEffect {
    Selected {
        x: i32,
        y: i32,
        terrain: Terrain,
        first_visit: bool,
    },
    Extracted(Extraction),
    Sold(Sale),
    Purchased(Purchase),
    Staked(ClaimRecord),
    Rested {
        restored: f64,
    },
    Traveled(Journey),
    StoreOpened {
        fee: f64,
        price: f64,
    },
    StorePriced {
        previous: f64,
        price: f64,
    },
    StoreDay(StoreDay),
}

/// Result of one `Game::act` call, handed back to the front-end for re-rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReport {
    pub action: &'static str,
    pub result: Result<ActionEffect, Rejection>,
    /// Game hours the action consumed.
    pub hours: u32,
    pub position: Position,
}

impl ActionReport {
    pub fn rejected(action: &'static str, reason: Rejection, position: Position) -> Self {
        Self {
            action,
            result: Err(reason),
            hours: 0,
            position,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.result.is_ok()
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.result.as_ref().err()
    }

    /// One-line description for logs and terminals.
    pub fn summary(&self) -> String {
        match &self.result {
            Err(reason) => format!("{}: {}", self.action, reason),
            Ok(effect) => match effect {
                ActionEffect::Selected {
                    x,
                    y,
                    terrain,
                    first_visit,
                } => {
                    let note = if *first_visit { " (new)" } else { "" };
                    format!("Selected ({}, {}) {}{}", x, y, terrain, note)
                }
                ActionEffect::Extracted(extraction) if extraction.found > 0 => format!(
                    "{}: found {}g at ({}, {}){}",
                    self.action,
                    extraction.found,
                    extraction.x,
                    extraction.y,
                    if extraction.truncated {
                        ", pack now full"
                    } else {
                        ""
                    }
                ),
                ActionEffect::Extracted(extraction) => format!(
                    "{}: nothing at ({}, {}) this time",
                    self.action, extraction.x, extraction.y
                ),
                ActionEffect::Sold(sale) => format!(
                    "Sold {}g at ${:.2}/g for ${:.2}; price now ${:.2}",
                    sale.grams, sale.price, sale.proceeds, sale.new_price
                ),
                ActionEffect::Purchased(purchase) => format!(
                    "Bought {} for ${:.2}",
                    purchase.key.spec().name,
                    purchase.price
                ),
                ActionEffect::Staked(claim) => {
                    format!("Staked a claim at ({}, {})", claim.x, claim.y)
                }
                ActionEffect::Rested { restored } => {
                    format!("Made camp and recovered {:.0} stamina", restored)
                }
                ActionEffect::Traveled(journey) => format!(
                    "Walked {} tiles to town at ({}, {})",
                    journey.distance, journey.to.x, journey.to.y
                ),
                ActionEffect::StoreOpened { fee, price } => format!(
                    "Opened a store for ${:.2}; kits priced at ${:.2}",
                    fee, price
                ),
                ActionEffect::StorePriced { previous, price } => {
                    format!("Kit price ${:.2} -> ${:.2}", previous, price)
                }
                ActionEffect::StoreDay(day) => format!(
                    "Store sold {} kits for ${:.2} (profit ${:.2})",
                    day.kits, day.revenue, day.profit
                ),
            },
        }
    }
}
