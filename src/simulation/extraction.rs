use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::prospector::Prospector;
use crate::components::world::EntityId;
use crate::data::equipment::{EquipmentBonus, EquipmentKey};
use crate::rules::rng::{coord_random, NoiseSource};
use crate::rules::skill::{SkillKind, SkillSet};
use crate::simulation::outcome::Rejection;
use crate::simulation::terrain::{Terrain, Tile};

const SKILL_BOOST_PER_LEVEL: f64 = 0.12;
const UNEQUIPPED_PAN_FACTOR: f64 = 0.8;
const SLUICE_BASE_EFFORT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    Prospect,
    Pan,
    Sluice,
}

/// Per-axis multiplier and offset applied to tile coordinates before hashing, so each
/// action draws from its own stream for the same tile.
#[derive(Debug, Clone, Copy)]
struct CoordTuning {
    x_mul: i64,
    x_off: i64,
    y_mul: i64,
    y_off: i64,
}

#[derive(Debug, Clone, Copy)]
struct ActionProfile {
    stamina: f64,
    base_roll: f64,
    noise_roll: f64,
    hours: u32,
    tuning: CoordTuning,
}

impl ExtractionKind {
    pub const ALL: [ExtractionKind; 3] = [
        ExtractionKind::Prospect,
        ExtractionKind::Pan,
        ExtractionKind::Sluice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionKind::Prospect => "prospect",
            ExtractionKind::Pan => "pan",
            ExtractionKind::Sluice => "sluice",
        }
    }

    pub fn stamina_cost(self) -> f64 {
        self.profile().stamina
    }

    pub fn hours(self) -> u32 {
        self.profile().hours
    }

    fn profile(self) -> ActionProfile {
        match self {
            ExtractionKind::Prospect => ActionProfile {
                stamina: 6.0,
                base_roll: 8.0,
                noise_roll: 4.0,
                hours: 1,
                tuning: CoordTuning {
                    x_mul: 3,
                    x_off: 11,
                    y_mul: 7,
                    y_off: 5,
                },
            },
            ExtractionKind::Pan => ActionProfile {
                stamina: 5.0,
                base_roll: 6.0,
                noise_roll: 3.0,
                hours: 1,
                tuning: CoordTuning {
                    x_mul: 5,
                    x_off: 17,
                    y_mul: 11,
                    y_off: 3,
                },
            },
            ExtractionKind::Sluice => ActionProfile {
                stamina: 10.0,
                base_roll: 12.0,
                noise_roll: 5.0,
                hours: 2,
                tuning: CoordTuning {
                    x_mul: 13,
                    x_off: 29,
                    y_mul: 17,
                    y_off: 23,
                },
            },
        }
    }

    fn required_terrain(self) -> Option<Terrain> {
        match self {
            ExtractionKind::Prospect => None,
            ExtractionKind::Pan | ExtractionKind::Sluice => Some(Terrain::River),
        }
    }

    fn required_equipment(self) -> Option<EquipmentKey> {
        match self {
            ExtractionKind::Sluice => Some(EquipmentKey::Sluice),
            _ => None,
        }
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of an accepted extraction. `found == 0` is a dry attempt, not a rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub kind: ExtractionKind,
    pub x: i32,
    pub y: i32,
    pub found: u32,
    /// The roll was cut down to what still fit in the pack.
    pub truncated: bool,
    pub tile_remaining: u32,
    pub stamina_spent: f64,
    pub xp: Vec<(SkillKind, f64)>,
    pub level_ups: Vec<(SkillKind, u32)>,
}

/// Check every precondition without touching anything.
pub fn check_extraction(
    kind: ExtractionKind,
    prospector: &Prospector,
    owner: EntityId,
    tile: Option<&Tile>,
) -> Result<(), Rejection> {
    let tile = tile.ok_or(Rejection::NoTileSelected)?;
    if tile.is_town() {
        return Err(Rejection::TownTile);
    }
    if tile.claimed_by.is_some_and(|holder| holder != owner) {
        return Err(Rejection::ClaimedByOther);
    }
    if let Some(needed) = kind.required_terrain() {
        if tile.terrain != needed {
            return Err(Rejection::WrongTerrain {
                action: kind.as_str(),
                needed,
            });
        }
    }
    if let Some(key) = kind.required_equipment() {
        if !prospector.owns(key) {
            return Err(Rejection::MissingEquipment(key));
        }
    }
    let cost = kind.stamina_cost();
    if !prospector.has_stamina(cost) {
        return Err(Rejection::InsufficientStamina {
            needed: cost,
            available: prospector.stamina,
        });
    }
    if prospector.spare_capacity_grams() == 0 {
        return Err(Rejection::PackFull);
    }
    Ok(())
}

/// Product of owned-equipment bonuses that apply to `kind`.
pub fn tool_boost(kind: ExtractionKind, prospector: &Prospector) -> f64 {
    match kind {
        ExtractionKind::Prospect => prospector
            .equipment
            .iter()
            .filter_map(|key| match key.spec().bonus {
                EquipmentBonus::ProspectYield(factor) => Some(factor),
                _ => None,
            })
            .product(),
        ExtractionKind::Pan => {
            let base = if prospector.owns(EquipmentKey::Pan) {
                1.0
            } else {
                UNEQUIPPED_PAN_FACTOR
            };
            let extras: f64 = prospector
                .equipment
                .iter()
                .filter(|key| **key != EquipmentKey::Pan)
                .filter_map(|key| match key.spec().bonus {
                    EquipmentBonus::PanYield(factor) => Some(factor),
                    _ => None,
                })
                .product();
            base * extras
        }
        ExtractionKind::Sluice => SLUICE_BASE_EFFORT,
    }
}

fn skill_boost(level: f64) -> f64 {
    1.0 + SKILL_BOOST_PER_LEVEL * (level - 1.0)
}

/// Combined tool, skill and terrain multiplier on the raw roll.
pub fn effort(kind: ExtractionKind, prospector: &Prospector, tile: &Tile) -> f64 {
    let skills = &prospector.skills;
    let tools = tool_boost(kind, prospector);
    match kind {
        ExtractionKind::Prospect => {
            let difficulty = if tile.difficulty > 0.0 {
                tile.difficulty
            } else {
                1.0
            };
            tools * skill_boost(skills.level(SkillKind::Prospecting) as f64) / difficulty
        }
        ExtractionKind::Pan => tools * skill_boost(skills.level(SkillKind::Panning) as f64),
        ExtractionKind::Sluice => {
            let avg = (skills.level(SkillKind::Panning) + skills.level(SkillKind::Excavation))
                as f64
                / 2.0;
            tools * skill_boost(avg)
        }
    }
}

/// Deterministic half of the roll for this tile and action.
pub fn tile_roll(kind: ExtractionKind, seed: u32, x: i32, y: i32) -> f64 {
    let t = kind.profile().tuning;
    coord_random(
        seed,
        t.x_mul * x as i64 + t.x_off,
        t.y_mul * y as i64 + t.y_off,
    )
}

/// Grams found before clamping to the deposit or the pack.
pub fn rolled_grams(kind: ExtractionKind, tile_roll: f64, noise: f64, effort: f64) -> u32 {
    let profile = kind.profile();
    let raw = (tile_roll * profile.base_roll + noise * profile.noise_roll) * effort;
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    raw.round().min(u32::MAX as f64) as u32
}

fn award_xp(kind: ExtractionKind, found: u32) -> Vec<(SkillKind, f64)> {
    let found = found as f64;
    match (kind, found > 0.0) {
        (ExtractionKind::Prospect, true) => vec![(SkillKind::Prospecting, 6.0 + found / 2.0)],
        (ExtractionKind::Prospect, false) => vec![(SkillKind::Prospecting, 2.0)],
        (ExtractionKind::Pan, true) => vec![(SkillKind::Panning, 8.0 + found / 2.0)],
        (ExtractionKind::Pan, false) => vec![(SkillKind::Panning, 2.0)],
        (ExtractionKind::Sluice, true) => vec![
            (SkillKind::Panning, 10.0 + found / 2.0),
            (SkillKind::Excavation, 5.0 + found / 3.0),
        ],
        (ExtractionKind::Sluice, false) => {
            vec![(SkillKind::Panning, 3.0), (SkillKind::Excavation, 3.0)]
        }
    }
}

fn apply_xp(skills: &mut SkillSet, gains: &[(SkillKind, f64)]) -> Vec<(SkillKind, u32)> {
    gains
        .iter()
        .filter_map(|(kind, amount)| skills.gain_xp(*kind, *amount).map(|level| (*kind, level)))
        .collect()
}

/// Work a tile. Either every effect applies or, on rejection, nothing does.
pub fn extract(
    kind: ExtractionKind,
    prospector: &mut Prospector,
    owner: EntityId,
    tile: Option<&mut Tile>,
    seed: u32,
    noise: &mut dyn NoiseSource,
) -> Result<Extraction, Rejection> {
    check_extraction(kind, prospector, owner, tile.as_deref())?;
    let tile = tile.ok_or(Rejection::NoTileSelected)?;

    let roll = tile_roll(kind, seed, tile.x, tile.y);
    let multiplier = effort(kind, prospector, tile);
    let rolled = rolled_grams(kind, roll, noise.next_unit(), multiplier);

    let spare = prospector.spare_capacity_grams();
    let available = rolled.min(tile.gold_remaining);
    let found = available.min(spare);
    let truncated = found < available;

    let cost = kind.stamina_cost();
    prospector.stamina = (prospector.stamina - cost).max(0.0);
    let taken = tile.deplete(found);
    prospector.gold_dust = prospector.gold_dust.saturating_add(taken);

    let xp = award_xp(kind, taken);
    let level_ups = apply_xp(&mut prospector.skills, &xp);

    Ok(Extraction {
        kind,
        x: tile.x,
        y: tile.y,
        found: taken,
        truncated,
        tile_remaining: tile.gold_remaining,
        stamina_spent: cost,
        xp,
        level_ups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::prospector::StartingKit;
    use crate::rules::rng::FixedNoise;
    use crate::simulation::terrain::{GoldField, DEFAULT_HEIGHT, DEFAULT_SEED, DEFAULT_WIDTH};

    const OWNER: EntityId = EntityId(1);

    fn field() -> GoldField {
        GoldField::generate(DEFAULT_SEED, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    fn first_tile(field: &GoldField, terrain: Terrain) -> Tile {
        field
            .tiles()
            .iter()
            .find(|t| t.terrain == terrain && t.gold_remaining > 10)
            .cloned()
            .expect("terrain present")
    }

    fn prospector() -> Prospector {
        Prospector::starting(&StartingKit::default())
    }

    #[test]
    fn prospect_transfers_gold_and_xp() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::Plains);
        let before = tile.gold_remaining;
        let mut player = prospector();
        let mut noise = FixedNoise(0.5);

        let result = extract(
            ExtractionKind::Prospect,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut noise,
        )
        .expect("prospect accepted");

        let roll = tile_roll(ExtractionKind::Prospect, DEFAULT_SEED, tile.x, tile.y);
        let expected = ((roll * 8.0 + 0.5 * 4.0) * 1.0).round() as u32;
        assert_eq!(result.found, expected.min(before));
        assert_eq!(tile.gold_remaining, before - result.found);
        assert_eq!(player.gold_dust, result.found);
        assert_eq!(player.stamina, 94.0);
        assert_eq!(
            player.skills.xp(SkillKind::Prospecting),
            6.0 + result.found as f64 / 2.0
        );
    }

    #[test]
    fn same_tile_same_noise_same_roll() {
        let field = field();
        let tile = first_tile(&field, Terrain::River);
        let player = prospector();
        let a = rolled_grams(
            ExtractionKind::Pan,
            tile_roll(ExtractionKind::Pan, DEFAULT_SEED, tile.x, tile.y),
            0.3,
            effort(ExtractionKind::Pan, &player, &tile),
        );
        let b = rolled_grams(
            ExtractionKind::Pan,
            tile_roll(ExtractionKind::Pan, DEFAULT_SEED, tile.x, tile.y),
            0.3,
            effort(ExtractionKind::Pan, &player, &tile),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn actions_use_independent_streams() {
        let rolls: Vec<f64> = ExtractionKind::ALL
            .iter()
            .map(|kind| tile_roll(*kind, DEFAULT_SEED, 4, 4))
            .collect();
        assert_ne!(rolls[0].to_bits(), rolls[1].to_bits());
        assert_ne!(rolls[1].to_bits(), rolls[2].to_bits());
    }

    #[test]
    fn pan_requires_river() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::Plains);
        let mut player = prospector();
        let before = player.clone();
        let err = extract(
            ExtractionKind::Pan,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.5),
        )
        .unwrap_err();
        assert!(matches!(err, Rejection::WrongTerrain { .. }));
        assert_eq!(player, before);
    }

    #[test]
    fn sluice_requires_equipment() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::River);
        let mut player = prospector();
        let err = extract(
            ExtractionKind::Sluice,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.5),
        )
        .unwrap_err();
        assert_eq!(err, Rejection::MissingEquipment(EquipmentKey::Sluice));

        player.equipment.insert(EquipmentKey::Sluice);
        let ok = extract(
            ExtractionKind::Sluice,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.5),
        )
        .expect("sluice accepted");
        assert_eq!(ok.stamina_spent, 10.0);
        assert_eq!(ok.xp.len(), 2);
    }

    #[test]
    fn tired_prospector_changes_nothing() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::River);
        let tile_before = tile.clone();
        let mut player = prospector();
        player.stamina = 4.0;
        let player_before = player.clone();
        for kind in [ExtractionKind::Prospect, ExtractionKind::Pan] {
            let err = extract(
                kind,
                &mut player,
                OWNER,
                Some(&mut tile),
                DEFAULT_SEED,
                &mut FixedNoise(0.5),
            )
            .unwrap_err();
            assert!(matches!(err, Rejection::InsufficientStamina { .. }));
        }
        assert_eq!(player, player_before);
        assert_eq!(tile, tile_before);
    }

    #[test]
    fn no_tile_selected_is_rejected() {
        let mut player = prospector();
        let err = extract(
            ExtractionKind::Prospect,
            &mut player,
            OWNER,
            None,
            DEFAULT_SEED,
            &mut FixedNoise(0.5),
        )
        .unwrap_err();
        assert_eq!(err, Rejection::NoTileSelected);
    }

    #[test]
    fn town_tiles_reject_every_action() {
        let field = field();
        let town = field.towns()[0];
        let mut tile = field.tile(town.x, town.y).cloned().expect("town tile");
        let mut player = prospector();
        player.equipment.insert(EquipmentKey::Sluice);
        for kind in ExtractionKind::ALL {
            let err = extract(
                kind,
                &mut player,
                OWNER,
                Some(&mut tile),
                DEFAULT_SEED,
                &mut FixedNoise(0.5),
            )
            .unwrap_err();
            assert_eq!(err, Rejection::TownTile);
        }
    }

    #[test]
    fn exhausted_tile_awards_failure_xp() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::River);
        tile.gold_remaining = 0;
        let mut player = prospector();
        let result = extract(
            ExtractionKind::Pan,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.9),
        )
        .expect("dry pan is still accepted");
        assert_eq!(result.found, 0);
        assert_eq!(tile.gold_remaining, 0);
        assert_eq!(player.gold_dust, 0);
        assert_eq!(player.stamina, 95.0);
        assert_eq!(player.skills.xp(SkillKind::Panning), 2.0);
    }

    #[test]
    fn found_never_exceeds_remaining() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::River);
        tile.gold_remaining = 1;
        let mut player = prospector();
        let result = extract(
            ExtractionKind::Pan,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.99),
        )
        .expect("pan accepted");
        assert!(result.found <= 1);
        assert_eq!(tile.gold_remaining, 1 - result.found);
    }

    #[test]
    fn full_pack_truncates_then_rejects() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::River);
        tile.gold_remaining = 500;
        let mut player = prospector();
        player.gold_dust = 19_999;
        let result = extract(
            ExtractionKind::Pan,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.99),
        )
        .expect("one gram still fits");
        assert_eq!(result.found, 1);
        assert!(result.truncated);
        assert_eq!(player.gold_dust, 20_000);
        assert!(player.encumbrance() <= player.capacity());

        let err = extract(
            ExtractionKind::Pan,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.99),
        )
        .unwrap_err();
        assert_eq!(err, Rejection::PackFull);
    }

    #[test]
    fn foreign_claims_block_extraction() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::Plains);
        tile.claimed_by = Some(EntityId(99));
        let mut player = prospector();
        let err = extract(
            ExtractionKind::Prospect,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.5),
        )
        .unwrap_err();
        assert_eq!(err, Rejection::ClaimedByOther);

        tile.claimed_by = Some(OWNER);
        assert!(extract(
            ExtractionKind::Prospect,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.5),
        )
        .is_ok());
    }

    #[test]
    fn tools_and_skill_raise_effort() {
        let field = field();
        let tile = first_tile(&field, Terrain::Plains);
        let mut player = prospector();
        let bare = effort(ExtractionKind::Prospect, &player, &tile);
        player.equipment.insert(EquipmentKey::Pickaxe);
        player.equipment.insert(EquipmentKey::Shovel);
        let tooled = effort(ExtractionKind::Prospect, &player, &tile);
        assert!((tooled - bare * 1.15 * 1.05).abs() < 1e-9);
        player.skills.gain_xp(SkillKind::Prospecting, 49.0);
        let skilled = effort(ExtractionKind::Prospect, &player, &tile);
        assert!((skilled - tooled * 1.12).abs() < 1e-9);
    }

    #[test]
    fn sluice_effort_averages_panning_and_excavation() {
        let field = field();
        let tile = first_tile(&field, Terrain::River);
        let mut player = prospector();
        player.equipment.insert(EquipmentKey::Sluice);
        player.equipment.insert(EquipmentKey::Rocker);
        player.equipment.insert(EquipmentKey::Pickaxe);
        assert!((effort(ExtractionKind::Sluice, &player, &tile) - 2.0).abs() < 1e-9);

        // panning 3, excavation 1
        player.skills.gain_xp(SkillKind::Panning, 196.0);
        assert!((effort(ExtractionKind::Sluice, &player, &tile) - 2.0 * 1.12).abs() < 1e-9);

        // panning 5, excavation 2
        player.skills.gain_xp(SkillKind::Panning, 588.0);
        player.skills.gain_xp(SkillKind::Excavation, 49.0);
        assert_eq!(player.skills.level(SkillKind::Panning), 5);
        assert_eq!(player.skills.level(SkillKind::Excavation), 2);
        assert!((effort(ExtractionKind::Sluice, &player, &tile) - 2.0 * 1.3).abs() < 1e-9);
    }

    #[test]
    fn sluice_awards_both_skills() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::River);
        tile.gold_remaining = 500;
        let mut player = prospector();
        player.equipment.insert(EquipmentKey::Sluice);

        let result = extract(
            ExtractionKind::Sluice,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.5),
        )
        .expect("sluice accepted");
        let roll = tile_roll(ExtractionKind::Sluice, DEFAULT_SEED, tile.x, tile.y);
        let expected = ((roll * 12.0 + 0.5 * 5.0) * 2.0).round() as u32;
        assert_eq!(result.found, expected);
        assert!(result.found > 0);
        let found = result.found as f64;
        assert_eq!(
            result.xp,
            vec![
                (SkillKind::Panning, 10.0 + found / 2.0),
                (SkillKind::Excavation, 5.0 + found / 3.0),
            ]
        );
        assert_eq!(player.skills.xp(SkillKind::Panning), 10.0 + found / 2.0);
        assert_eq!(player.skills.xp(SkillKind::Excavation), 5.0 + found / 3.0);
        assert_eq!(player.stamina, 90.0);
    }

    #[test]
    fn dry_sluice_awards_flat_xp() {
        let field = field();
        let mut tile = first_tile(&field, Terrain::River);
        tile.gold_remaining = 0;
        let mut player = prospector();
        player.equipment.insert(EquipmentKey::Sluice);

        let result = extract(
            ExtractionKind::Sluice,
            &mut player,
            OWNER,
            Some(&mut tile),
            DEFAULT_SEED,
            &mut FixedNoise(0.5),
        )
        .expect("dry sluice is still accepted");
        assert_eq!(result.found, 0);
        assert_eq!(
            result.xp,
            vec![(SkillKind::Panning, 3.0), (SkillKind::Excavation, 3.0)]
        );
        assert_eq!(player.skills.xp(SkillKind::Panning), 3.0);
        assert_eq!(player.skills.xp(SkillKind::Excavation), 3.0);
        assert_eq!(player.gold_dust, 0);
        assert_eq!(player.stamina, 90.0);
    }

    #[test]
    fn pan_without_pan_is_weaker() {
        let mut player = prospector();
        assert!((tool_boost(ExtractionKind::Pan, &player) - 0.8).abs() < 1e-9);
        player.equipment.insert(EquipmentKey::Pan);
        assert!((tool_boost(ExtractionKind::Pan, &player) - 1.0).abs() < 1e-9);
        player.equipment.insert(EquipmentKey::Rocker);
        assert!((tool_boost(ExtractionKind::Pan, &player) - 1.2).abs() < 1e-9);
    }

    #[test]
    fn mountains_are_harder_to_prospect() {
        let field = field();
        let mountain = first_tile(&field, Terrain::Mountain);
        let player = prospector();
        assert!((effort(ExtractionKind::Prospect, &player, &mountain) - 0.8).abs() < 1e-9);
    }
}
