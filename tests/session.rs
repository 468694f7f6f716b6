use std::fs;
use std::path::PathBuf;

use goldfield::components::world::Position;
use goldfield::core::config::GameConfig;
use goldfield::rules::rng::{FixedNoise, Mulberry32};
use goldfield::simulation::claims::claims_consistent;
use goldfield::simulation::terrain::Terrain;
use goldfield::simulation::ExtractionKind;
use goldfield::world::sqlite::quarantine_path;
use goldfield::world::{JsonSaveFile, SaveDb, SaveRepository};
use goldfield::{ActionIntent, Game, Rejection};

fn seeded_game(noise_seed: u32) -> Game {
    Game::with_noise(GameConfig::default(), Box::new(Mulberry32::new(noise_seed)))
}

fn temp_path(tag: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "goldfield-it-{}-{}.json",
        tag,
        std::process::id()
    ));
    let _ = fs::remove_file(&path);
    path
}

fn first_tile(game: &Game, terrain: Terrain, min_gold: u32) -> Position {
    game.field()
        .tiles()
        .iter()
        .find(|t| t.terrain == terrain && t.gold_remaining >= min_gold)
        .map(|t| t.position())
        .expect("tile of requested terrain")
}

/// A fixed session touching every action.
fn play_script(game: &mut Game) {
    let plains = first_tile(game, Terrain::Plains, 10);
    let river = first_tile(game, Terrain::River, 10);
    let script = vec![
        ActionIntent::BuyEquipment {
            item: "pan".to_string(),
        },
        ActionIntent::BuyEquipment {
            item: "shovel".to_string(),
        },
        ActionIntent::Select {
            x: plains.x,
            y: plains.y,
        },
        ActionIntent::StakeClaim,
        ActionIntent::Extract(ExtractionKind::Prospect),
        ActionIntent::Extract(ExtractionKind::Prospect),
        ActionIntent::Select {
            x: river.x,
            y: river.y,
        },
        ActionIntent::Extract(ExtractionKind::Pan),
        ActionIntent::Extract(ExtractionKind::Sluice),
        ActionIntent::SellGold,
        ActionIntent::Rest,
        ActionIntent::TravelToTown,
        ActionIntent::OpenStore,
        ActionIntent::TuneStorePrice { price: 9.0 },
        ActionIntent::SimulateStoreDay,
        ActionIntent::SimulateStoreDay,
    ];
    for intent in script {
        game.act(intent);
    }
}

#[test]
fn same_seed_and_noise_replay_identically() {
    let mut a = seeded_game(5);
    let mut b = seeded_game(5);
    play_script(&mut a);
    play_script(&mut b);
    assert_eq!(a.save_state(), b.save_state());
}

#[test]
fn world_is_a_pure_function_of_seed() {
    let a = seeded_game(1);
    let b = seeded_game(2);
    assert_eq!(a.field(), b.field());

    let other = Game::with_noise(
        GameConfig {
            seed: 7,
            ..GameConfig::default()
        },
        Box::new(FixedNoise(0.5)),
    );
    assert_ne!(a.field().tiles(), other.field().tiles());
}

#[test]
fn towns_stay_barren_and_unclaimed() {
    let mut game = seeded_game(11);
    play_script(&mut game);
    for town in game.field().towns() {
        game.act(ActionIntent::Select {
            x: town.x,
            y: town.y,
        });
        for kind in ExtractionKind::ALL {
            let report = game.act(ActionIntent::Extract(kind));
            assert_eq!(report.rejection(), Some(&Rejection::TownTile));
        }
        let report = game.act(ActionIntent::StakeClaim);
        assert_eq!(report.rejection(), Some(&Rejection::TownTile));

        let tile = game.tile(town.x, town.y).expect("town tile");
        assert_eq!(tile.terrain, Terrain::Town);
        assert_eq!(tile.gold_remaining, 0);
        assert_eq!(tile.claimed_by, None);
    }
}

#[test]
fn claims_stay_consistent_with_tiles() {
    let mut game = seeded_game(3);
    let owner = game.player_id();
    let candidates: Vec<Position> = game
        .field()
        .tiles()
        .iter()
        .filter(|t| !t.is_town() && t.gold_remaining >= 10)
        .take(8)
        .map(|t| t.position())
        .collect();
    for spot in candidates {
        game.act(ActionIntent::Select {
            x: spot.x,
            y: spot.y,
        });
        game.act(ActionIntent::StakeClaim);
        game.act(ActionIntent::StakeClaim);
        let prospector = game.prospector().expect("player");
        assert!(claims_consistent(prospector, owner, game.field()));
    }
    // $100 buys six $15 claims.
    assert_eq!(game.prospector().map(|p| p.claims.len()), Some(6));
}

#[test]
fn stamina_never_goes_negative() {
    let mut game = seeded_game(9);
    let plains = first_tile(&game, Terrain::Plains, 0);
    game.act(ActionIntent::Select {
        x: plains.x,
        y: plains.y,
    });
    let mut rejected = false;
    for _ in 0..40 {
        let report = game.act(ActionIntent::Extract(ExtractionKind::Prospect));
        let stamina = game.prospector().map(|p| p.stamina).unwrap_or(-1.0);
        assert!(stamina >= 0.0);
        if let Some(reason) = report.rejection() {
            assert!(matches!(reason, Rejection::InsufficientStamina { .. }));
            rejected = true;
        }
    }
    assert!(rejected);
    assert_eq!(game.prospector().map(|p| p.stamina), Some(4.0));
}

#[test]
fn deposits_only_shrink() {
    let mut game = seeded_game(4);
    let before: Vec<u32> = game
        .field()
        .tiles()
        .iter()
        .map(|t| t.gold_remaining)
        .collect();
    play_script(&mut game);
    for (tile, start) in game.field().tiles().iter().zip(before) {
        assert!(tile.gold_remaining <= start);
    }
}

#[test]
fn reset_is_idempotent_and_clears_the_slot() {
    let path = temp_path("reset");
    let mut slot = JsonSaveFile::new(&path);
    let mut game = seeded_game(6);
    play_script(&mut game);
    game.save(&mut slot).unwrap();
    assert!(path.exists());

    game.reset(Some(&mut slot as &mut dyn SaveRepository)).unwrap();
    let once = game.save_state();
    assert!(!path.exists());
    game.reset(Some(&mut slot as &mut dyn SaveRepository)).unwrap();
    assert_eq!(game.save_state(), once);

    let fresh = seeded_game(6);
    assert_eq!(once, fresh.save_state());
}

#[test]
fn json_slot_resumes_the_session() {
    let path = temp_path("resume");
    let mut slot = JsonSaveFile::new(&path);
    let mut game = seeded_game(8);
    play_script(&mut game);
    game.save(&mut slot).unwrap();

    let resumed = Game::load_or_new(
        GameConfig::default(),
        Box::new(FixedNoise(0.5)),
        &mut slot,
    );
    assert_eq!(resumed.save_state(), game.save_state());
    slot.clear().unwrap();
}

#[test]
fn sqlite_slot_resumes_the_session() {
    let mut db = SaveDb::open_in_memory().unwrap();
    let mut game = seeded_game(12);
    play_script(&mut game);
    game.save(&mut db).unwrap();

    let resumed = Game::load_or_new(GameConfig::default(), Box::new(FixedNoise(0.5)), &mut db);
    assert_eq!(resumed.save_state(), game.save_state());
}

#[test]
fn corrupt_save_falls_back_to_a_fresh_game() {
    let path = temp_path("corrupt");
    fs::write(&path, "{ \"version\": 1, \"seed\": ").unwrap();
    let mut slot = JsonSaveFile::new(&path);
    let game = Game::load_or_new(GameConfig::default(), Box::new(FixedNoise(0.5)), &mut slot);
    assert_eq!(game.save_state(), seeded_game(1).save_state());
    slot.clear().unwrap();
}

#[test]
fn inconsistent_save_falls_back_to_a_fresh_game() {
    let mut db = SaveDb::open_in_memory().unwrap();
    let mut game = seeded_game(13);
    play_script(&mut game);
    let mut state = game.save_state();
    state.player.prospector.claims.clear();
    db.save_state(&state).unwrap();

    let loaded = Game::load_or_new(GameConfig::default(), Box::new(FixedNoise(0.5)), &mut db);
    assert_eq!(loaded.save_state(), seeded_game(1).save_state());
}

#[test]
fn garbage_database_falls_back_to_a_fresh_game() {
    let path = std::env::temp_dir().join(format!("goldfield-it-garbage-{}.db", std::process::id()));
    let aside = quarantine_path(&path);
    let _ = fs::remove_file(&aside);
    fs::write(&path, "not a save database\n".repeat(200)).unwrap();

    let mut db = SaveDb::open_or_recover(&path).unwrap();
    let game = Game::load_or_new(GameConfig::default(), Box::new(FixedNoise(0.5)), &mut db);
    assert_eq!(game.save_state(), seeded_game(1).save_state());
    assert!(aside.exists());

    game.save(&mut db).unwrap();
    drop(db);
    let reopened = SaveDb::open_or_recover(&path).unwrap();
    assert_eq!(reopened.load_state().unwrap(), Some(game.save_state()));

    drop(reopened);
    let _ = fs::remove_file(&path);
    let _ = fs::remove_file(&aside);
}
