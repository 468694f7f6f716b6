use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::prospector::Prospector;
use crate::rules::rng::NoiseSource;
use crate::rules::skill::SkillKind;
use crate::simulation::market::Market;
use crate::simulation::outcome::Rejection;

pub const LICENCE_FEE: f64 = 50.0;
pub const DEFAULT_KIT_PRICE: f64 = 12.0;
pub const MIN_KIT_PRICE: f64 = 4.0;
pub const MAX_KIT_PRICE: f64 = 100.0;
/// Wholesale cost of one kit.
pub const KIT_COST: f64 = 4.0;
pub const STORE_DAY_HOURS: u32 = 4;
const BASE_CUSTOMERS: f64 = 8.0;
const REFERENCE_PRICE: f64 = 10.0;
const APPEAL_EXPONENT: f64 = 1.5;
const MAX_APPEAL: f64 = 3.0;
const MAX_KITS_PER_DAY: f64 = 40.0;
const DEMAND_PER_KIT: f64 = 0.1;

/// The player's supply store in town.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPost {
    pub open: bool,
    pub price: f64,
    pub days_run: u32,
    pub kits_sold: u32,
    pub revenue: f64,
}

impl Default for TradingPost {
    fn default() -> Self {
        Self {
            open: false,
            price: DEFAULT_KIT_PRICE,
            days_run: 0,
            kits_sold: 0,
            revenue: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreDay {
    pub customers: f64,
    pub kits: u32,
    pub revenue: f64,
    pub profit: f64,
}

/// Walk-ins for a day, scaled by trading skill.
pub fn expected_customers(trading_level: u32) -> f64 {
    BASE_CUSTOMERS * (1.0 + 0.1 * trading_level.saturating_sub(1) as f64)
}

/// How attractive a kit price is relative to the going rate.
pub fn price_appeal(price: f64) -> f64 {
    (REFERENCE_PRICE / price)
        .powf(APPEAL_EXPONENT)
        .clamp(0.0, MAX_APPEAL)
}

pub fn kits_for_day(customers: f64, price: f64, noise: f64) -> u32 {
    let swing = 0.75 + 0.5 * noise;
    (customers * price_appeal(price) * swing)
        .round()
        .clamp(0.0, MAX_KITS_PER_DAY) as u32
}

pub fn open_store(
    post: &mut TradingPost,
    prospector: &mut Prospector,
    in_town: bool,
) -> Result<f64, Rejection> {
    if !in_town {
        return Err(Rejection::NotInTown);
    }
    if post.open {
        return Err(Rejection::StoreAlreadyOpen);
    }
    if prospector.money < LICENCE_FEE {
        return Err(Rejection::InsufficientFunds {
            needed: LICENCE_FEE,
            available: prospector.money,
        });
    }
    prospector.money -= LICENCE_FEE;
    post.open = true;
    Ok(LICENCE_FEE)
}

/// Reprice kits. Returns the previous price.
pub fn set_kit_price(post: &mut TradingPost, price: f64) -> Result<f64, Rejection> {
    if !post.open {
        return Err(Rejection::StoreClosed);
    }
    if !price.is_finite() || !(MIN_KIT_PRICE..=MAX_KIT_PRICE).contains(&price) {
        return Err(Rejection::InvalidPrice {
            price,
            min: MIN_KIT_PRICE,
            max: MAX_KIT_PRICE,
        });
    }
    let previous = post.price;
    post.price = price;
    Ok(previous)
}

/// Run the counter for a day.
pub fn run_store_day(
    post: &mut TradingPost,
    prospector: &mut Prospector,
    market: &mut Market,
    in_town: bool,
    noise: &mut dyn NoiseSource,
) -> Result<StoreDay, Rejection> {
    if !post.open {
        return Err(Rejection::StoreClosed);
    }
    if !in_town {
        return Err(Rejection::NotInTown);
    }

    let customers = expected_customers(prospector.skills.level(SkillKind::Trading));
    let kits = kits_for_day(customers, post.price, noise.next_unit());
    let revenue = kits as f64 * post.price;
    let profit = kits as f64 * (post.price - KIT_COST);

    prospector.money += profit;
    prospector
        .skills
        .gain_xp(SkillKind::Trading, 1.0 + kits as f64 / 2.0);
    market.record_store_sales(kits, DEMAND_PER_KIT);

    post.days_run += 1;
    post.kits_sold += kits;
    post.revenue += revenue;

    Ok(StoreDay {
        customers,
        kits,
        revenue,
        profit,
    })
}
