pub mod equipment;

pub use equipment::{EquipmentBonus, EquipmentKey, EquipmentSpec, EQUIPMENT_CATALOG};
