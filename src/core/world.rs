use std::path::Path;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::{debug, info, warn};

use crate::components::identity::Name;
use crate::components::prospector::Prospector;
use crate::components::world::{EntityId, Player, Position};
use crate::core::config::GameConfig;
use crate::core::ecs::{create_schedule, create_world};
use crate::core::serialization::{
    apply_state_to_world, extract_state_from_world, load_state_from_path, save_state_to_path,
    SaveError, SaveFileError, SaveState,
};
use crate::rules::rng::{EntropyNoise, NoiseSource};
use crate::rules::skill::SkillKind;
use crate::simulation::extraction::ExtractionKind;
use crate::simulation::market::Market;
use crate::simulation::outcome::{ActionReport, Rejection};
use crate::simulation::terrain::{GoldField, Terrain, Tile};
use crate::simulation::time::GameTime;
use crate::simulation::trading_post::TradingPost;
use crate::world::repository::SaveRepository;

pub const PLAYER_UID: u32 = 1;

/// Intent-driven commands fed into the ECS, one per `Game::act`.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionIntent {
    Select { x: i32, y: i32 },
    Extract(ExtractionKind),
    StakeClaim,
    SellGold,
    BuyEquipment { item: String },
    Rest,
    TravelToTown,
    OpenStore,
    TuneStorePrice { price: f64 },
    SimulateStoreDay,
}

impl ActionIntent {
    pub fn name(&self) -> &'static str {
        match self {
            ActionIntent::Select { .. } => "select",
            ActionIntent::Extract(kind) => kind.as_str(),
            ActionIntent::StakeClaim => "stake",
            ActionIntent::SellGold => "sell",
            ActionIntent::BuyEquipment { .. } => "buy",
            ActionIntent::Rest => "rest",
            ActionIntent::TravelToTown => "travel",
            ActionIntent::OpenStore => "open store",
            ActionIntent::TuneStorePrice { .. } => "price store",
            ActionIntent::SimulateStoreDay => "run store",
        }
    }
}

/// Resource storing the intents for the next schedule run.
#[derive(Resource, Default, Debug)]
pub struct ActionQueue(pub Vec<ActionIntent>);

/// Reports produced by the action systems during the current run.
#[derive(Resource, Default, Debug)]
pub struct ActionJournal(pub Vec<ActionReport>);

/// The tile the player is looking at.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection(pub Option<Position>);

/// Noise roll source shared by every action that draws one.
#[derive(Resource)]
pub struct Noise(pub Box<dyn NoiseSource + Send + Sync>);

impl Noise {
    pub fn source(&mut self) -> &mut dyn NoiseSource {
        self.0.as_mut()
    }
}

/// Data snapshot returned to the UI layer after each action.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub time_str: String,
    pub player_name: String,
    pub player_pos: (i32, i32),
    pub money: f64,
    pub stamina: (f64, f64),
    pub gold_dust: u32,
    /// Current and maximum load in mass units.
    pub load: (f64, f64),
    pub price_per_gram: f64,
    pub price_delta: f64,
    pub claims: usize,
    pub store_open: bool,
    pub skills: Vec<(SkillKind, u32, f64)>,
    pub selected: Option<TileSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileSummary {
    pub position: (i32, i32),
    pub terrain: Terrain,
    pub gold_remaining: u32,
    pub difficulty: f64,
    pub claimed: bool,
    pub own_claim: bool,
}

/// Wrapper around the ECS world and schedule.
pub struct Game {
    world: World,
    schedule: Schedule,
    player: Entity,
    config: GameConfig,
}

impl Game {
    /// Fresh session with OS-seeded noise.
    pub fn new(config: GameConfig) -> Self {
        Self::with_noise(config, Box::new(EntropyNoise::new()))
    }

    /// Fresh session with an injected noise source.
    /// Out-of-range dimensions are clamped into the supported range.
    pub fn with_noise(mut config: GameConfig, noise: Box<dyn NoiseSource + Send + Sync>) -> Self {
        let (asked_width, asked_height) = (config.width, config.height);
        if config.clamp_dimensions() {
            warn!(
                "world size {}x{} is out of range, using {}x{}",
                asked_width, asked_height, config.width, config.height
            );
        }
        let mut world = create_world(&config);
        world.insert_resource(Noise(noise));
        let player = spawn_player(&mut world, &config);
        let schedule = create_schedule();
        info!(
            seed = config.seed,
            width = config.width,
            height = config.height,
            "generated gold field"
        );
        Self {
            world,
            schedule,
            player,
            config,
        }
    }

    /// Resume from the repository when it holds a usable save, otherwise start fresh.
    /// Unreadable or inconsistent saves are logged and discarded.
    pub fn load_or_new(
        config: GameConfig,
        noise: Box<dyn NoiseSource + Send + Sync>,
        repo: &mut dyn SaveRepository,
    ) -> Self {
        let mut game = Self::with_noise(config, noise);
        match repo.load() {
            Ok(Some(state)) => {
                if let Err(err) = game.load_state(state) {
                    warn!("discarding saved game: {}", err);
                    game.rebuild();
                }
            }
            Ok(None) => debug!("no saved game, starting fresh"),
            Err(err) => warn!("failed to read saved game: {}", err),
        }
        game
    }

    /// Apply one intent and return what happened.
    pub fn act(&mut self, intent: ActionIntent) -> ActionReport {
        let action = intent.name();
        {
            let mut queue = self.world.resource_mut::<ActionQueue>();
            queue.0 = vec![intent];
        }
        self.schedule.run(&mut self.world);

        let position = self.position();
        let report = self
            .world
            .resource_mut::<ActionJournal>()
            .0
            .pop()
            .unwrap_or_else(|| ActionReport::rejected(action, Rejection::Ignored, position));

        match report.rejection() {
            None => debug!(action, hours = report.hours, "{}", report.summary()),
            Some(reason) => debug!(action, "rejected: {}", reason),
        }
        report
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.player, &self.world)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn player_id(&self) -> EntityId {
        self.world
            .get::<EntityId>(self.player)
            .copied()
            .unwrap_or(EntityId(PLAYER_UID))
    }

    pub fn field(&self) -> &GoldField {
        self.world.resource::<GoldField>()
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        self.field().tile(x, y)
    }

    pub fn market(&self) -> &Market {
        self.world.resource::<Market>()
    }

    pub fn trading_post(&self) -> &TradingPost {
        self.world.resource::<TradingPost>()
    }

    pub fn time(&self) -> &GameTime {
        self.world.resource::<GameTime>()
    }

    pub fn selected(&self) -> Option<Position> {
        self.world.resource::<Selection>().0
    }

    pub fn prospector(&self) -> Option<&Prospector> {
        self.world.get::<Prospector>(self.player)
    }

    pub fn position(&self) -> Position {
        self.world
            .get::<Position>(self.player)
            .copied()
            .unwrap_or_default()
    }

    /// Extract a serializable save state from the current world.
    pub fn save_state(&self) -> SaveState {
        extract_state_from_world(&self.world, self.player)
    }

    /// Replace the live session with a saved one. The world is untouched on error.
    pub fn load_state(&mut self, state: SaveState) -> Result<(), SaveError> {
        apply_state_to_world(state, &mut self.world, self.player)?;
        let field = self.world.resource::<GoldField>();
        self.config.seed = field.seed;
        self.config.width = field.width;
        self.config.height = field.height;
        info!(tick = self.time().tick, "loaded saved game");
        Ok(())
    }

    pub fn save(&self, repo: &mut dyn SaveRepository) -> Result<(), Box<dyn std::error::Error>> {
        repo.save(&self.save_state())?;
        info!(tick = self.time().tick, "saved game");
        Ok(())
    }

    /// Wipe persisted progress and start over from the configured seed.
    /// Running it twice leaves the same state as running it once.
    pub fn reset(
        &mut self,
        repo: Option<&mut dyn SaveRepository>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(repo) = repo {
            repo.clear()?;
        }
        self.rebuild();
        info!(seed = self.config.seed, "reset game");
        Ok(())
    }

    /// Save state directly to a file path.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveFileError> {
        save_state_to_path(&self.save_state(), path)
    }

    /// Load state directly from a file path.
    pub fn load_from_path<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let state = load_state_from_path(path)?;
        self.load_state(state)?;
        Ok(())
    }

    fn rebuild(&mut self) {
        let noise = self
            .world
            .remove_resource::<Noise>()
            .unwrap_or_else(|| Noise(Box::new(EntropyNoise::new())));
        let mut world = create_world(&self.config);
        world.insert_resource(noise);
        self.player = spawn_player(&mut world, &self.config);
        self.world = world;
    }
}

fn spawn_player(world: &mut World, config: &GameConfig) -> Entity {
    let start = world.resource::<GoldField>().towns()[0];
    world
        .spawn((
            Player,
            EntityId(PLAYER_UID),
            Name(config.starting_kit.name.clone()),
            start,
            Prospector::starting(&config.starting_kit),
        ))
        .id()
}

impl Snapshot {
    fn capture(player: Entity, world: &World) -> Self {
        let time_str = world.resource::<GameTime>().to_string();
        let market = world.resource::<Market>();
        let field = world.resource::<GoldField>();
        let owner = world.get::<EntityId>(player).copied();

        let player_name = world
            .get::<Name>(player)
            .map(|n| n.0.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let player_pos = world
            .get::<Position>(player)
            .map(|pos| (pos.x, pos.y))
            .unwrap_or((0, 0));

        let prospector = world.get::<Prospector>(player);
        let (money, stamina, gold_dust, load, claims, skills) = match prospector {
            Some(p) => (
                p.money,
                (p.stamina, p.max_stamina()),
                p.gold_dust,
                (p.encumbrance(), p.capacity()),
                p.claims.len(),
                SkillKind::ALL
                    .iter()
                    .map(|kind| (*kind, p.skills.level(*kind), p.skills.xp(*kind)))
                    .collect(),
            ),
            None => (0.0, (0.0, 0.0), 0, (0.0, 0.0), 0, Vec::new()),
        };

        let selected = world
            .resource::<Selection>()
            .0
            .and_then(|pos| field.tile(pos.x, pos.y))
            .map(|tile| TileSummary {
                position: (tile.x, tile.y),
                terrain: tile.terrain,
                gold_remaining: tile.gold_remaining,
                difficulty: tile.difficulty,
                claimed: tile.claimed_by.is_some(),
                own_claim: tile.claimed_by.is_some() && tile.claimed_by == owner,
            });

        Snapshot {
            time_str,
            player_name,
            player_pos,
            money,
            stamina,
            gold_dust,
            load,
            price_per_gram: market.price_per_gram,
            price_delta: market.price_delta(),
            claims,
            store_open: world.resource::<TradingPost>().open,
            skills,
            selected,
        }
    }
}
