use bevy_ecs::prelude::*;

use crate::components::prospector::Prospector;
use crate::components::world::{EntityId, Player, Position};
use crate::core::world::{ActionIntent, ActionJournal, ActionQueue, Noise, Selection};
use crate::simulation::extraction::extract;
use crate::simulation::outcome::{ActionEffect, ActionReport};
use crate::simulation::terrain::GoldField;

/// System: prospect, pan and sluice on the selected tile.
pub fn extraction_system(
    intents: Res<ActionQueue>,
    selection: Res<Selection>,
    mut field: ResMut<GoldField>,
    mut noise: ResMut<Noise>,
    mut journal: ResMut<ActionJournal>,
    mut players: Query<(&EntityId, &mut Prospector, &mut Position), With<Player>>,
) {
    let Ok((owner, mut prospector, mut position)) = players.get_single_mut() else {
        return;
    };
    let seed = field.seed;

    for intent in intents.0.iter() {
        let &ActionIntent::Extract(kind) = intent else {
            continue;
        };

        let tile = match selection.0 {
            Some(at) => field.tile_mut(at.x, at.y),
            None => None,
        };
        let report = match extract(kind, &mut prospector, *owner, tile, seed, noise.source()) {
            Ok(extraction) => {
                *position = Position {
                    x: extraction.x,
                    y: extraction.y,
                };
                ActionReport {
                    action: kind.as_str(),
                    result: Ok(ActionEffect::Extracted(extraction)),
                    hours: kind.hours(),
                    position: *position,
                }
            }
            Err(reason) => ActionReport::rejected(kind.as_str(), reason, *position),
        };
        journal.0.push(report);
    }
}
