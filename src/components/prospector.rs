use std::collections::BTreeSet;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::equipment::{EquipmentBonus, EquipmentKey};
use crate::rules::skill::{SkillKind, SkillSet};

pub const BASE_MAX_STAMINA: f64 = 100.0;
pub const STAMINA_PER_FITNESS_LEVEL: f64 = 5.0;
pub const GRAMS_PER_MASS_UNIT: f64 = 1000.0;

/// Attributes a fresh prospector starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingKit {
    pub name: String,
    pub money: f64,
    pub stamina: f64,
    pub max_carry: f64,
    pub equipment: Vec<EquipmentKey>,
}

impl Default for StartingKit {
    fn default() -> Self {
        Self {
            name: "Prospector".to_string(),
            money: 100.0,
            stamina: BASE_MAX_STAMINA,
            max_carry: 20.0,
            equipment: Vec::new(),
        }
    }
}

/// A filed claim. The tile's owner field is authoritative; this is the filing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub x: i32,
    pub y: i32,
    /// Game clock tick at filing.
    pub staked_at: u64,
}

/// Everything the player carries, knows and owns.
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospector {
    pub money: f64,
    pub stamina: f64,
    pub max_carry: f64,
    /// Held gold dust, grams.
    pub gold_dust: u32,
    pub equipment: BTreeSet<EquipmentKey>,
    pub skills: SkillSet,
    pub claims: Vec<ClaimRecord>,
}

impl Prospector {
    pub fn starting(kit: &StartingKit) -> Self {
        let mut prospector = Self {
            money: kit.money.max(0.0),
            stamina: 0.0,
            max_carry: kit.max_carry.max(0.0),
            gold_dust: 0,
            equipment: kit.equipment.iter().copied().collect(),
            skills: SkillSet::default(),
            claims: Vec::new(),
        };
        prospector.stamina = kit.stamina.clamp(0.0, prospector.max_stamina());
        prospector
    }

    pub fn owns(&self, key: EquipmentKey) -> bool {
        self.equipment.contains(&key)
    }

    pub fn max_stamina(&self) -> f64 {
        let fitness = self.skills.level(SkillKind::Fitness).saturating_sub(1);
        BASE_MAX_STAMINA + STAMINA_PER_FITNESS_LEVEL * fitness as f64
    }

    /// Carrying capacity in mass units, including any pack animal.
    pub fn capacity(&self) -> f64 {
        let bonus: f64 = self
            .equipment
            .iter()
            .filter_map(|key| match key.spec().bonus {
                EquipmentBonus::Capacity(extra) => Some(extra),
                _ => None,
            })
            .sum();
        self.max_carry + bonus
    }

    pub fn encumbrance(&self) -> f64 {
        self.gold_dust as f64 / GRAMS_PER_MASS_UNIT
    }

    /// Grams of dust that still fit in the pack.
    pub fn spare_capacity_grams(&self) -> u32 {
        let spare = (self.capacity() * GRAMS_PER_MASS_UNIT).floor() - self.gold_dust as f64;
        if spare <= 0.0 {
            0
        } else {
            spare.min(u32::MAX as f64) as u32
        }
    }

    pub fn has_stamina(&self, cost: f64) -> bool {
        self.stamina >= cost
    }

    /// Pull stamina back inside `[0, max]` after a load or a fitness change.
    pub fn clamp_stamina(&mut self) {
        let max = self.max_stamina();
        self.stamina = if self.stamina.is_finite() {
            self.stamina.clamp(0.0, max)
        } else {
            0.0
        };
    }
}
