use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use bevy_utils::tracing::warn;
use tracing_subscriber::EnvFilter;

use goldfield::core::config::{load_game_config, parse_seed, GameConfig};
use goldfield::data::equipment::EQUIPMENT_CATALOG;
use goldfield::rules::rng::EntropyNoise;
use goldfield::simulation::ExtractionKind;
use goldfield::world::{JsonSaveFile, SaveDb, SaveRepository};
use goldfield::{ActionIntent, Game};

struct CliArgs {
    db_path: Option<PathBuf>,
    save_path: PathBuf,
    config_path: Option<PathBuf>,
    seed: Option<u32>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = parse_args(env::args().collect());

    let mut config = match &args.config_path {
        Some(path) => match load_game_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Failed to load config: {}", err);
                std::process::exit(1);
            }
        },
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut repo: Box<dyn SaveRepository> = match &args.db_path {
        Some(path) => match SaveDb::open_or_recover(path) {
            Ok(db) => Box::new(db),
            Err(err) => {
                eprintln!("Failed to open save DB: {}", err);
                std::process::exit(1);
            }
        },
        None => Box::new(JsonSaveFile::new(&args.save_path)),
    };

    let mut game = Game::load_or_new(config, Box::new(EntropyNoise::new()), repo.as_mut());
    println!("Goldfield. Type 'help' for commands.");
    print_status(&game);

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_lowercase();

        let intent = match cmd.as_str() {
            "quit" | "exit" => break,
            "help" => {
                println!("Commands: map | select <x> <y> | look | prospect | pan | sluice | stake | sell | buy <item> | shop | rest | town | store <open|price <p>|day> | status | skills | claims | market | save | reset | quit");
                continue;
            }
            "map" => {
                print_map(&game);
                continue;
            }
            "look" => {
                print_selected(&game);
                continue;
            }
            "status" => {
                print_status(&game);
                continue;
            }
            "skills" => {
                print_skills(&game);
                continue;
            }
            "claims" => {
                print_claims(&game);
                continue;
            }
            "market" => {
                print_market(&game);
                continue;
            }
            "shop" => {
                print_shop(&game);
                continue;
            }
            "save" => {
                match game.save(repo.as_mut()) {
                    Ok(()) => println!("Saved."),
                    Err(err) => println!("Save failed: {}", err),
                }
                continue;
            }
            "reset" => {
                let slot: &mut dyn SaveRepository = repo.as_mut();
                match game.reset(Some(slot)) {
                    Ok(()) => {
                        println!("A fresh claim season begins.");
                        print_status(&game);
                    }
                    Err(err) => println!("Reset failed: {}", err),
                }
                continue;
            }
            "select" | "sel" => {
                let x = parts.next().and_then(|raw| raw.parse::<i32>().ok());
                let y = parts.next().and_then(|raw| raw.parse::<i32>().ok());
                match (x, y) {
                    (Some(x), Some(y)) => ActionIntent::Select { x, y },
                    _ => {
                        println!("Usage: select <x> <y>");
                        continue;
                    }
                }
            }
            "prospect" => ActionIntent::Extract(ExtractionKind::Prospect),
            "pan" => ActionIntent::Extract(ExtractionKind::Pan),
            "sluice" => ActionIntent::Extract(ExtractionKind::Sluice),
            "stake" | "claim" => ActionIntent::StakeClaim,
            "sell" => ActionIntent::SellGold,
            "buy" => match parts.next() {
                Some(item) => ActionIntent::BuyEquipment {
                    item: item.to_string(),
                },
                None => {
                    println!("Usage: buy <item>");
                    continue;
                }
            },
            "rest" | "camp" => ActionIntent::Rest,
            "town" | "travel" => ActionIntent::TravelToTown,
            "store" => match parts.next().map(|s| s.to_lowercase()).as_deref() {
                Some("open") => ActionIntent::OpenStore,
                Some("day") => ActionIntent::SimulateStoreDay,
                Some("price") => match parts.next().and_then(|raw| raw.parse::<f64>().ok()) {
                    Some(price) => ActionIntent::TuneStorePrice { price },
                    None => {
                        println!("Usage: store price <dollars>");
                        continue;
                    }
                },
                _ => {
                    print_store(&game);
                    continue;
                }
            },
            _ => {
                println!("Unknown command: {}", cmd);
                continue;
            }
        };

        let report = game.act(intent);
        println!("{}", report.summary());
        if report.is_applied() {
            if let Err(err) = game.save(repo.as_mut()) {
                warn!("autosave failed: {}", err);
            }
        }
    }
}

fn parse_args(args: Vec<String>) -> CliArgs {
    let mut iter = args.iter().skip(1);
    let mut parsed = CliArgs {
        db_path: None,
        save_path: PathBuf::from("./goldfield_save.json"),
        config_path: None,
        seed: None,
    };
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--db" => {
                if let Some(value) = iter.next() {
                    parsed.db_path = Some(PathBuf::from(value));
                }
            }
            "--save" => {
                if let Some(value) = iter.next() {
                    parsed.save_path = PathBuf::from(value);
                }
            }
            "--config" => {
                if let Some(value) = iter.next() {
                    parsed.config_path = Some(PathBuf::from(value));
                }
            }
            "--seed" => {
                if let Some(value) = iter.next() {
                    parsed.seed = Some(parse_seed(value));
                }
            }
            _ => {}
        }
    }
    parsed
}

fn print_status(game: &Game) {
    let snap = game.snapshot();
    println!(
        "{} | {} at ({}, {}) | ${:.2} | stamina {:.0}/{:.0} | gold {}g | load {:.2}/{:.0}",
        snap.time_str,
        snap.player_name,
        snap.player_pos.0,
        snap.player_pos.1,
        snap.money,
        snap.stamina.0,
        snap.stamina.1,
        snap.gold_dust,
        snap.load.0,
        snap.load.1
    );
}

fn print_selected(game: &Game) {
    match game.snapshot().selected {
        Some(tile) => {
            let claim = match (tile.claimed, tile.own_claim) {
                (true, true) => "your claim",
                (true, false) => "claimed",
                _ => "unclaimed",
            };
            println!(
                "({}, {}) {} | ~{}g in the ground | difficulty {:.2} | {}",
                tile.position.0,
                tile.position.1,
                tile.terrain,
                tile.gold_remaining,
                tile.difficulty,
                claim
            );
        }
        None => println!("No tile selected."),
    }
}

fn print_map(game: &Game) {
    let field = game.field();
    let here = game.position();
    let selected = game.selected();
    let owner = game.player_id();
    for y in 0..field.height {
        let row: String = (0..field.width)
            .map(|x| {
                if here.x == x && here.y == y {
                    return '@';
                }
                if selected.is_some_and(|s| s.x == x && s.y == y) {
                    return 'X';
                }
                match field.tile(x, y) {
                    Some(tile) if tile.claimed_by == Some(owner) => 'C',
                    Some(tile) if !tile.discovered && !tile.is_town() => ' ',
                    Some(tile) => tile.terrain.glyph(),
                    None => ' ',
                }
            })
            .collect();
        println!("{}", row);
    }
    println!("@ you  X selected  C your claim  T town  ~ river  ^ mountain  f forest  . plains");
}

fn print_skills(game: &Game) {
    for (kind, level, xp) in game.snapshot().skills {
        println!("{:<12} level {:>2} ({:.0} xp)", kind.to_string(), level, xp);
    }
}

fn print_claims(game: &Game) {
    let Some(prospector) = game.prospector() else {
        return;
    };
    if prospector.claims.is_empty() {
        println!("No claims filed.");
        return;
    }
    for claim in &prospector.claims {
        let remaining = game
            .tile(claim.x, claim.y)
            .map(|tile| tile.gold_remaining)
            .unwrap_or(0);
        println!(
            "({}, {}) staked at hour {} | ~{}g left",
            claim.x, claim.y, claim.staked_at, remaining
        );
    }
}

fn print_market(game: &Game) {
    let market = game.market();
    let delta = market.price_delta();
    let trend = if delta > 0.0 {
        "up"
    } else if delta < 0.0 {
        "down"
    } else {
        "flat"
    };
    println!(
        "Gold ${:.2}/g ({} {:.2}) | supply {:.0}g sold | demand {:.2}",
        market.price_per_gram,
        trend,
        delta.abs(),
        market.supply_pressure,
        market.demand_pressure()
    );
}

fn print_shop(game: &Game) {
    let owned = game.prospector().map(|p| p.equipment.clone()).unwrap_or_default();
    for spec in EQUIPMENT_CATALOG.iter() {
        let note = if owned.contains(&spec.key) { " (owned)" } else { "" };
        println!("{:<8} {:<16} ${:.0}{}", spec.key, spec.name, spec.price, note);
    }
}

fn print_store(game: &Game) {
    let post = game.trading_post();
    if !post.open {
        println!("No store yet. 'store open' in town for a $50 licence.");
        return;
    }
    println!(
        "Kits at ${:.2} | {} days | {} kits sold | ${:.2} taken",
        post.price, post.days_run, post.kits_sold, post.revenue
    );
}
