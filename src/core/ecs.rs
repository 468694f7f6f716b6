use bevy_ecs::prelude::*;
use bevy_ecs::schedule::SystemSet;

use crate::core::config::GameConfig;
use crate::core::world::{ActionJournal, ActionQueue, Selection};
use crate::simulation::market::Market;
use crate::simulation::terrain::GoldField;
use crate::simulation::time::{advance_time_system, GameTime};
use crate::simulation::trading_post::TradingPost;
use crate::systems::camp::camp_system;
use crate::systems::claims::claim_system;
use crate::systems::extraction::extraction_system;
use crate::systems::market::market_system;
use crate::systems::trading_post::trading_post_system;
use crate::systems::{clear_journal_system, drain_queue_system, selection_system};

/// Canonical tick ordering for the simulation.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum TickSet {
    Intake,
    Simulation,
    Time,
    Cleanup,
}

/// Build the ECS world with baseline resources. The caller inserts `Noise` and the player.
pub fn create_world(config: &GameConfig) -> World {
    let mut world = World::new();
    world.insert_resource(GoldField::generate(
        config.seed,
        config.width,
        config.height,
    ));
    world.insert_resource(GameTime::default());
    world.insert_resource(Market::default());
    world.insert_resource(TradingPost::default());
    world.insert_resource(Selection::default());
    world.insert_resource(ActionQueue::default());
    world.insert_resource(ActionJournal::default());
    world
}

/// Build the system schedule in the canonical order.
pub fn create_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.configure_sets(
        (TickSet::Intake, TickSet::Simulation, TickSet::Time, TickSet::Cleanup).chain(),
    );

    schedule.add_systems((
        clear_journal_system.in_set(TickSet::Intake),
        selection_system.in_set(TickSet::Simulation),
        extraction_system.in_set(TickSet::Simulation),
        claim_system.in_set(TickSet::Simulation),
        market_system.in_set(TickSet::Simulation),
        camp_system.in_set(TickSet::Simulation),
        trading_post_system.in_set(TickSet::Simulation),
        advance_time_system.in_set(TickSet::Time),
        drain_queue_system.in_set(TickSet::Cleanup),
    ));

    schedule
}
