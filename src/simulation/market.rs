use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::prospector::Prospector;
use crate::data::equipment::EquipmentKey;
use crate::rules::rng::NoiseSource;
use crate::rules::skill::SkillKind;
use crate::simulation::outcome::Rejection;

pub const STARTING_PRICE: f64 = 20.0;
pub const PRICE_FLOOR: f64 = 5.0;
pub const PRICE_CEILING: f64 = 120.0;
const SUPPLY_IMPACT_PER_GRAM: f64 = 0.01;
const DEMAND_IMPACT: f64 = 0.005;
const NOISE_SPAN: f64 = 0.5;

/// Spot price for gold and the pressures that move it.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub price_per_gram: f64,
    pub last_price: f64,
    /// Grams sold so far.
    pub supply_pressure: f64,
    /// Equipment purchase events.
    pub equipment_demand: f64,
    /// Fractional demand from simulated store customers.
    #[serde(default)]
    pub store_demand: f64,
}

impl Default for Market {
    fn default() -> Self {
        Self {
            price_per_gram: STARTING_PRICE,
            last_price: STARTING_PRICE,
            supply_pressure: 0.0,
            equipment_demand: 0.0,
            store_demand: 0.0,
        }
    }
}

impl Market {
    pub fn demand_pressure(&self) -> f64 {
        self.equipment_demand + self.store_demand
    }

    pub fn price_delta(&self) -> f64 {
        self.price_per_gram - self.last_price
    }

    /// Price response to a sale of `grams`, given a noise draw in `[0, 1)`.
    pub fn next_price(&self, grams: u32, noise: f64) -> f64 {
        let jitter = noise * NOISE_SPAN - NOISE_SPAN / 2.0;
        let delta = -SUPPLY_IMPACT_PER_GRAM * grams as f64
            + DEMAND_IMPACT * self.demand_pressure()
            + jitter;
        clamp_price(self.price_per_gram + delta)
    }

    pub fn record_store_sales(&mut self, kits: u32, weight: f64) {
        self.store_demand += kits as f64 * weight;
    }
}

pub fn clamp_price(price: f64) -> f64 {
    if price.is_finite() {
        price.clamp(PRICE_FLOOR, PRICE_CEILING)
    } else {
        STARTING_PRICE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub grams: u32,
    pub price: f64,
    pub proceeds: f64,
    pub new_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub key: EquipmentKey,
    pub price: f64,
}

/// Sell the whole poke of dust at the current price. Partial sales are not offered.
pub fn sell_gold(
    market: &mut Market,
    prospector: &mut Prospector,
    noise: &mut dyn NoiseSource,
) -> Result<Sale, Rejection> {
    let grams = prospector.gold_dust;
    if grams == 0 {
        return Err(Rejection::NothingToSell);
    }

    let price = market.price_per_gram;
    let proceeds = grams as f64 * price;
    prospector.money += proceeds;
    prospector.gold_dust = 0;
    prospector
        .skills
        .gain_xp(SkillKind::Trading, 2.0 + grams as f64 / 20.0);

    let new_price = market.next_price(grams, noise.next_unit());
    market.last_price = price;
    market.supply_pressure += grams as f64;
    market.price_per_gram = new_price;

    Ok(Sale {
        grams,
        price,
        proceeds,
        new_price,
    })
}

pub fn buy_equipment(
    market: &mut Market,
    prospector: &mut Prospector,
    key: EquipmentKey,
) -> Result<Purchase, Rejection> {
    if prospector.owns(key) {
        return Err(Rejection::AlreadyOwned(key));
    }
    let price = key.spec().price;
    if prospector.money < price {
        return Err(Rejection::InsufficientFunds {
            needed: price,
            available: prospector.money,
        });
    }
    prospector.money -= price;
    prospector.equipment.insert(key);
    market.equipment_demand += 1.0;
    Ok(Purchase { key, price })
}
