use bevy_ecs::prelude::*;

use crate::components::prospector::Prospector;
use crate::components::world::{Player, Position};
use crate::core::world::{ActionIntent, ActionJournal, ActionQueue, Noise};
use crate::simulation::market::Market;
use crate::simulation::outcome::{ActionEffect, ActionReport};
use crate::simulation::terrain::GoldField;
use crate::simulation::trading_post::{
    open_store, run_store_day, set_kit_price, TradingPost, STORE_DAY_HOURS,
};

/// System: the player's store in town.
pub fn trading_post_system(
    intents: Res<ActionQueue>,
    field: Res<GoldField>,
    mut post: ResMut<TradingPost>,
    mut market: ResMut<Market>,
    mut noise: ResMut<Noise>,
    mut journal: ResMut<ActionJournal>,
    mut players: Query<(&mut Prospector, &Position), With<Player>>,
) {
    let Ok((mut prospector, position)) = players.get_single_mut() else {
        return;
    };
    let in_town = field
        .tile(position.x, position.y)
        .is_some_and(|tile| tile.is_town());

    for intent in intents.0.iter() {
        let (result, hours) = match intent {
            ActionIntent::OpenStore => (
                open_store(&mut post, &mut prospector, in_town).map(|fee| {
                    ActionEffect::StoreOpened {
                        fee,
                        price: post.price,
                    }
                }),
                0,
            ),
            ActionIntent::TuneStorePrice { price } => (
                set_kit_price(&mut post, *price).map(|previous| ActionEffect::StorePriced {
                    previous,
                    price: *price,
                }),
                0,
            ),
            ActionIntent::SimulateStoreDay => {
                match run_store_day(
                    &mut post,
                    &mut prospector,
                    &mut market,
                    in_town,
                    noise.source(),
                ) {
                    Ok(day) => (Ok(ActionEffect::StoreDay(day)), STORE_DAY_HOURS),
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
