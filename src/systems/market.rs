use bevy_ecs::prelude::*;

use crate::components::prospector::Prospector;
use crate::components::world::{Player, Position};
use crate::core::world::{ActionIntent, ActionJournal, ActionQueue, Noise};
use crate::data::equipment::EquipmentKey;
use crate::simulation::market::{buy_equipment, sell_gold, Market};
use crate::simulation::outcome::{ActionEffect, ActionReport, Rejection};

/// System: selling dust and buying kit. Trade is allowed anywhere on the field.
pub fn market_system(
    intents: Res<ActionQueue>,
    mut market: ResMut<Market>,
    mut noise: ResMut<Noise>,
    mut journal: ResMut<ActionJournal>,
    mut players: Query<(&mut Prospector, &Position), With<Player>>,
) {
    let Ok((mut prospector, position)) = players.get_single_mut() else {
        return;
    };

    for intent in intents.0.iter() {
        let result = match intent {
            ActionIntent::SellGold => {
                sell_gold(&mut market, &mut prospector, noise.source()).map(ActionEffect::Sold)
            }
            ActionIntent::BuyEquipment { item } => item
                .parse::<EquipmentKey>()
                .map_err(|_| Rejection::UnknownEquipment(item.clone()))
                .and_then(|key| buy_equipment(&mut market, &mut prospector, key))
                .map(ActionEffect::Purchased),
            _ => continue,
        };
        journal.0.push(ActionReport {
            action: intent.name(),
            result,
            hours: 0,
            position: *position,
        });
    }
}
