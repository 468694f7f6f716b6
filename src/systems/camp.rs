use bevy_ecs::prelude::*;

use crate::components::prospector::Prospector;
use crate::components::world::{Player, Position};
use crate::core::world::{ActionIntent, ActionJournal, ActionQueue, Selection};
use crate::simulation::camp::{rest, travel_to_town, CAMP_HOURS};
use crate::simulation::outcome::{ActionEffect, ActionReport};
use crate::simulation::terrain::GoldField;

/// System: resting and walking back to town.
pub fn camp_system(
    intents: Res<ActionQueue>,
    field: Res<GoldField>,
    mut selection: ResMut<Selection>,
    mut journal: ResMut<ActionJournal>,
    mut players: Query<(&mut Prospector, &mut Position), With<Player>>,
) {
    let Ok((mut prospector, mut position)) = players.get_single_mut() else {
        return;
    };

    for intent in intents.0.iter() {
        let (result, hours) = match intent {
            ActionIntent::Rest => match rest(&mut prospector) {
                Ok(restored) => (Ok(ActionEffect::Rested { restored }), CAMP_HOURS),
                Err(reason) => (Err(reason), 0),
            },
            ActionIntent::TravelToTown => {
                match travel_to_town(&mut prospector, &mut position, &field) {
                    Ok(journey) => {
                        selection.0 = Some(journey.to);
                        let hours = journey.hours;
                        (Ok(ActionEffect::Traveled(journey)), hours)
                    }
                    Err(reason) => (Err(reason), 0),
                }
            }
            _ => continue,
        };
        journal.0.push(ActionReport {
            action: intent.name(),
            result,
            hours,
            position: *position,
        });
    }
}
