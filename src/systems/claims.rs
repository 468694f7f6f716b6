use bevy_ecs::prelude::*;

use crate::components::prospector::Prospector;
use crate::components::world::{EntityId, Player, Position};
use crate::core::world::{ActionIntent, ActionJournal, ActionQueue, Selection};
use crate::simulation::claims::stake_claim;
use crate::simulation::outcome::{ActionEffect, ActionReport};
use crate::simulation::terrain::GoldField;
use crate::simulation::time::GameTime;

pub fn claim_system(
    intents: Res<ActionQueue>,
    selection: Res<Selection>,
    time: Res<GameTime>,
    mut field: ResMut<GoldField>,
    mut journal: ResMut<ActionJournal>,
    mut players: Query<(&EntityId, &mut Prospector, &Position), With<Player>>,
) {
    let Ok((owner, mut prospector, position)) = players.get_single_mut() else {
        return;
    };

    for intent in intents.0.iter() {
        if !matches!(intent, ActionIntent::StakeClaim) {
            continue;
        }
        let tile = match selection.0 {
            Some(at) => field.tile_mut(at.x, at.y),
            None => None,
        };
        let report = match stake_claim(&mut prospector, *owner, tile, time.tick) {
            Ok(record) => ActionReport {
                action: intent.name(),
                result: Ok(ActionEffect::Staked(record)),
                hours: 0,
                position: *position,
            },
            Err(reason) => ActionReport::rejected(intent.name(), reason, *position),
        };
        journal.0.push(report);
    }
}
