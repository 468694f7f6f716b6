pub mod camp;
pub mod claims;
pub mod extraction;
pub mod market;
pub mod trading_post;

use bevy_ecs::prelude::*;

use crate::components::world::{Player, Position};
use crate::core::world::{ActionIntent, ActionJournal, ActionQueue, Selection};
use crate::simulation::outcome::{ActionEffect, ActionReport, Rejection};
use crate::simulation::terrain::GoldField;

pub fn clear_journal_system(mut journal: ResMut<ActionJournal>) {
    journal.0.clear();
}

pub fn drain_queue_system(mut intents: ResMut<ActionQueue>) {
    intents.0.clear();
}

/// System: Processes tile selection intents. Selecting never moves the player.
pub fn selection_system(
    intents: Res<ActionQueue>,
    mut field: ResMut<GoldField>,
    mut selection: ResMut<Selection>,
    mut journal: ResMut<ActionJournal>,
    players: Query<&Position, With<Player>>,
) {
    let position = players.get_single().copied().unwrap_or_default();
    for intent in intents.0.iter() {
        let &ActionIntent::Select { x, y } = intent else {
            continue;
        };
        let action = intent.name();

        let Some(tile) = field.tile_mut(x, y) else {
            journal.0.push(ActionReport::rejected(
                action,
                Rejection::OutOfBounds { x, y },
                position,
            ));
            continue;
        };

        let first_visit = !tile.discovered;
        tile.discovered = true;
        selection.0 = Some(tile.position());
        journal.0.push(ActionReport {
            action,
            result: Ok(ActionEffect::Selected {
                x,
                y,
                terrain: tile.terrain,
                first_visit,
            }),
            hours: 0,
            position,
        });
    }
}
