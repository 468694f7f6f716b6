use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKey {
    Pan,
    Shovel,
    Pickaxe,
    Rocker,
    Sluice,
    Mule,
}

/// What owning a piece of equipment does for the prospector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EquipmentBonus {
    /// Multiplies yield for the listed action family.
    ProspectYield(f64),
    PanYield(f64),
    /// Required to sluice at all.
    UnlocksSluice,
    /// Added to carrying capacity.
    Capacity(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquipmentSpec {
    pub key: EquipmentKey,
    pub name: &'static str,
    pub price: f64,
    pub bonus: EquipmentBonus,
}

pub const EQUIPMENT_CATALOG: [EquipmentSpec; 6] = [
    EquipmentSpec {
        key: EquipmentKey::Pan,
        name: "Gold Pan",
        price: 10.0,
        bonus: EquipmentBonus::PanYield(1.0),
    },
    EquipmentSpec {
        key: EquipmentKey::Shovel,
        name: "Shovel",
        price: 15.0,
        bonus: EquipmentBonus::ProspectYield(1.05),
    },
    EquipmentSpec {
        key: EquipmentKey::Pickaxe,
        name: "Pickaxe",
        price: 25.0,
        bonus: EquipmentBonus::ProspectYield(1.15),
    },
    EquipmentSpec {
        key: EquipmentKey::Rocker,
        name: "Rocker Box",
        price: 60.0,
        bonus: EquipmentBonus::PanYield(1.2),
    },
    EquipmentSpec {
        key: EquipmentKey::Sluice,
        name: "Sluice Box",
        price: 120.0,
        bonus: EquipmentBonus::UnlocksSluice,
    },
    EquipmentSpec {
        key: EquipmentKey::Mule,
        name: "Pack Mule",
        price: 150.0,
        bonus: EquipmentBonus::Capacity(30.0),
    },
];

impl EquipmentKey {
    pub fn as_str(self) -> &'static str {
        match self {
            EquipmentKey::Pan => "pan",
            EquipmentKey::Shovel => "shovel",
            EquipmentKey::Pickaxe => "pickaxe",
            EquipmentKey::Rocker => "rocker",
            EquipmentKey::Sluice => "sluice",
            EquipmentKey::Mule => "mule",
        }
    }

    pub fn spec(self) -> &'static EquipmentSpec {
        // Every key has exactly one catalog row.
        match self {
            EquipmentKey::Pan => &EQUIPMENT_CATALOG[0],
            EquipmentKey::Shovel => &EQUIPMENT_CATALOG[1],
            EquipmentKey::Pickaxe => &EQUIPMENT_CATALOG[2],
            EquipmentKey::Rocker => &EQUIPMENT_CATALOG[3],
            EquipmentKey::Sluice => &EQUIPMENT_CATALOG[4],
            EquipmentKey::Mule => &EQUIPMENT_CATALOG[5],
        }
    }
}

impl fmt::Display for EquipmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEquipment {
    pub value: String,
}

impl fmt::Display for UnknownEquipment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no equipment called {}", self.value)
    }
}

impl std::error::Error for UnknownEquipment {}

impl FromStr for EquipmentKey {
    type Err = UnknownEquipment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        EQUIPMENT_CATALOG
            .iter()
            .map(|spec| spec.key)
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| UnknownEquipment {
                value: s.to_string(),
            })
    }
}
