use crate::components::prospector::{ClaimRecord, Prospector};
use crate::components::world::EntityId;
use crate::simulation::outcome::Rejection;
use crate::simulation::terrain::{GoldField, Tile};

pub const CLAIM_FEE: f64 = 15.0;
pub const MIN_CLAIM_DEPOSIT: u32 = 10;

pub fn check_claim(prospector: &Prospector, tile: Option<&Tile>) -> Result<(), Rejection> {
    let tile = tile.ok_or(Rejection::NoTileSelected)?;
    if tile.is_town() {
        return Err(Rejection::TownTile);
    }
    if tile.claimed_by.is_some() {
        return Err(Rejection::AlreadyClaimed);
    }
    if tile.gold_remaining < MIN_CLAIM_DEPOSIT {
        return Err(Rejection::DepositTooSmall {
            remaining: tile.gold_remaining,
            minimum: MIN_CLAIM_DEPOSIT,
        });
    }
    if prospector.money < CLAIM_FEE {
        return Err(Rejection::InsufficientFunds {
            needed: CLAIM_FEE,
            available: prospector.money,
        });
    }
    Ok(())
}

/// File a claim. The tile owner and the filing history are written together or not at all.
pub fn stake_claim(
    prospector: &mut Prospector,
    owner: EntityId,
    tile: Option<&mut Tile>,
    now: u64,
) -> Result<ClaimRecord, Rejection> {
    check_claim(prospector, tile.as_deref())?;
    let tile = tile.ok_or(Rejection::NoTileSelected)?;

    let record = ClaimRecord {
        x: tile.x,
        y: tile.y,
        staked_at: now,
    };
    prospector.money -= CLAIM_FEE;
    tile.claimed_by = Some(owner);
    prospector.claims.push(record);
    Ok(record)
}

/// Claims in filing order that the field still attributes to `owner`.
pub fn active_claims<'a>(
    prospector: &'a Prospector,
    owner: EntityId,
    field: &'a GoldField,
) -> impl Iterator<Item = &'a ClaimRecord> {
    prospector.claims.iter().filter(move |claim| {
        field
            .tile(claim.x, claim.y)
            .is_some_and(|tile| tile.claimed_by == Some(owner))
    })
}

/// True when every filed claim is owned on the field and every owned tile was filed.
pub fn claims_consistent(prospector: &Prospector, owner: EntityId, field: &GoldField) -> bool {
    let owned = field.claimed_by(owner).count();
    active_claims(prospector, owner, field).count() == prospector.claims.len()
        && prospector.claims.len() == owned
}
