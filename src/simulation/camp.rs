use crate::components::prospector::Prospector;
use crate::components::world::Position;
use crate::rules::skill::SkillKind;
use crate::simulation::outcome::Rejection;
use crate::simulation::terrain::GoldField;

pub const CAMP_HOURS: u32 = 8;
const CAMP_FITNESS_XP: f64 = 2.0;
const TILES_PER_STAMINA: f64 = 10.0;
const TILES_PER_HOUR: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Journey {
    pub from: Position,
    pub to: Position,
    pub distance: u32,
    pub stamina_spent: f64,
    pub hours: u32,
}

/// Make camp: stamina back to full.
pub fn rest(prospector: &mut Prospector) -> Result<f64, Rejection> {
    let max = prospector.max_stamina();
    if prospector.stamina >= max {
        return Err(Rejection::AlreadyRested);
    }
    prospector.skills.gain_xp(SkillKind::Fitness, CAMP_FITNESS_XP);
    // Fill to the ceiling after the fitness gain, which may have raised it.
    let full = prospector.max_stamina();
    let restored = full - prospector.stamina;
    prospector.stamina = full;
    Ok(restored)
}

pub fn travel_cost(distance: u32) -> f64 {
    (distance as f64 / TILES_PER_STAMINA).ceil().max(1.0)
}

pub fn travel_hours(distance: u32) -> u32 {
    ((distance as f64 / TILES_PER_HOUR).ceil() as u32).max(1)
}

/// Walk to the nearest town.
pub fn travel_to_town(
    prospector: &mut Prospector,
    position: &mut Position,
    field: &GoldField,
) -> Result<Journey, Rejection> {
    if field.tile(position.x, position.y).is_some_and(|t| t.is_town()) {
        return Err(Rejection::AlreadyInTown);
    }
    let (town, distance) = field.nearest_town(*position);
    let cost = travel_cost(distance);
    if !prospector.has_stamina(cost) {
        return Err(Rejection::InsufficientStamina {
            needed: cost,
            available: prospector.stamina,
        });
    }

    let from = *position;
    prospector.stamina = (prospector.stamina - cost).max(0.0);
    prospector
        .skills
        .gain_xp(SkillKind::Fitness, distance as f64 / TILES_PER_HOUR);
    *position = town;

    Ok(Journey {
        from,
        to: town,
        distance,
        stamina_spent: cost,
        hours: travel_hours(distance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::prospector::StartingKit;
    use crate::simulation::terrain::{DEFAULT_HEIGHT, DEFAULT_SEED, DEFAULT_WIDTH};

    fn setup() -> (GoldField, Prospector) {
        (
            GoldField::generate(DEFAULT_SEED, DEFAULT_WIDTH, DEFAULT_HEIGHT),
            Prospector::starting(&StartingKit::default()),
        )
    }

    #[test]
    fn rest_restores_to_max() {
        let (_, mut player) = setup();
        player.stamina = 30.0;
        let restored = rest(&mut player).unwrap();
        assert_eq!(restored, 70.0);
        assert_eq!(player.stamina, player.max_stamina());
        assert_eq!(player.skills.xp(SkillKind::Fitness), 2.0);
    }

    #[test]
    fn rest_fills_a_raised_ceiling() {
        let (_, mut player) = setup();
        player.skills.gain_xp(SkillKind::Fitness, 48.0);
        player.stamina = 30.0;
        let restored = rest(&mut player).unwrap();
        assert_eq!(player.skills.level(SkillKind::Fitness), 2);
        assert_eq!(player.stamina, 105.0);
        assert_eq!(restored, 75.0);
    }

    #[test]
    fn rest_when_fresh_is_rejected() {
        let (_, mut player) = setup();
        assert_eq!(rest(&mut player), Err(Rejection::AlreadyRested));
        assert_eq!(player.skills.xp(SkillKind::Fitness), 0.0);
    }

    #[test]
    fn travel_moves_to_nearest_town() {
        let (field, mut player) = setup();
        let mut at = Position { x: 50, y: 10 };
        let journey = travel_to_town(&mut player, &mut at, &field).unwrap();
        assert_eq!(at, Position { x: 51, y: 14 });
        assert_eq!(journey.distance, 5);
        assert_eq!(journey.stamina_spent, 1.0);
        assert_eq!(journey.hours, 2);
        assert_eq!(player.stamina, 99.0);
    }

    #[test]
    fn travel_from_town_is_rejected() {
        let (field, mut player) = setup();
        let mut at = field.towns()[0];
        let err = travel_to_town(&mut player, &mut at, &field).unwrap_err();
        assert_eq!(err, Rejection::AlreadyInTown);
        assert_eq!(at, field.towns()[0]);
    }

    #[test]
    fn exhausted_traveller_stays_put() {
        let (field, mut player) = setup();
        player.stamina = 0.5;
        let start = Position { x: 0, y: 0 };
        let mut at = start;
        let err = travel_to_town(&mut player, &mut at, &field).unwrap_err();
        assert!(matches!(err, Rejection::InsufficientStamina { .. }));
        assert_eq!(at, start);
        assert_eq!(player.stamina, 0.5);
    }

    #[test]
    fn travel_costs_scale_with_distance() {
        assert_eq!(travel_cost(0), 1.0);
        assert_eq!(travel_cost(10), 1.0);
        assert_eq!(travel_cost(11), 2.0);
        assert_eq!(travel_hours(9), 3);
    }
}
