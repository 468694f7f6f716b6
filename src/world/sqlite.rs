use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use bevy_utils::tracing::warn;
use rusqlite::{params, Connection, OptionalExtension};

use crate::components::prospector::{ClaimRecord, Prospector};
use crate::core::serialization::{SaveState, SavedPlayer, SavedTile, SAVE_VERSION};
use crate::data::equipment::EquipmentKey;
use crate::rules::skill::{SkillKind, SkillSet};
use crate::simulation::market::Market;
use crate::simulation::time::GameTime;
use crate::simulation::trading_post::TradingPost;
use crate::world::repository::SaveRepository;

const SAVE_SCHEMA_VERSION: i64 = 1;

const SAVE_DB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS save_meta (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  schema_version INTEGER NOT NULL,
  save_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS session (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  seed INTEGER NOT NULL,
  width INTEGER NOT NULL,
  height INTEGER NOT NULL,
  tick INTEGER NOT NULL,
  selected_x INTEGER,
  selected_y INTEGER
);

CREATE TABLE IF NOT EXISTS market (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  price_per_gram REAL NOT NULL,
  last_price REAL NOT NULL,
  supply_pressure REAL NOT NULL,
  equipment_demand REAL NOT NULL,
  store_demand REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS trading_post (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  open INTEGER NOT NULL,
  price REAL NOT NULL,
  days_run INTEGER NOT NULL,
  kits_sold INTEGER NOT NULL,
  revenue REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS tiles (
  x INTEGER NOT NULL,
  y INTEGER NOT NULL,
  discovered INTEGER NOT NULL,
  claimed_by INTEGER,
  gold_remaining INTEGER NOT NULL,
  PRIMARY KEY (x, y)
);

CREATE TABLE IF NOT EXISTS player (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  uid INTEGER NOT NULL,
  name TEXT NOT NULL,
  x INTEGER NOT NULL,
  y INTEGER NOT NULL,
  money REAL NOT NULL,
  stamina REAL NOT NULL,
  max_carry REAL NOT NULL,
  gold_dust INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS player_skills (
  skill TEXT PRIMARY KEY,
  xp REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS player_equipment (
  item TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS claims (
  seq INTEGER PRIMARY KEY,
  x INTEGER NOT NULL,
  y INTEGER NOT NULL,
  staked_at INTEGER NOT NULL
);
"#;

const DATA_TABLES: [&str; 8] = [
    "session",
    "market",
    "trading_post",
    "tiles",
    "player",
    "player_skills",
    "player_equipment",
    "claims",
];

#[derive(Debug)]
pub enum SaveDbError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    InvalidData(String),
}

impl std::fmt::Display for SaveDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveDbError::Sqlite(err) => write!(f, "sqlite error: {}", err),
            SaveDbError::Io(err) => write!(f, "save db file error: {}", err),
            SaveDbError::InvalidData(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for SaveDbError {}

impl From<rusqlite::Error> for SaveDbError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(err)
    }
}

impl From<std::io::Error> for SaveDbError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

fn skill_from_str(value: &str) -> Result<SkillKind, SaveDbError> {
    value
        .parse()
        .map_err(|_| SaveDbError::InvalidData(format!("unknown skill {}", value)))
}

fn equipment_from_str(value: &str) -> Result<EquipmentKey, SaveDbError> {
    value
        .parse()
        .map_err(|_| SaveDbError::InvalidData(format!("unknown equipment {}", value)))
}

fn non_negative(value: i64, what: &str) -> Result<u64, SaveDbError> {
    u64::try_from(value)
        .map_err(|_| SaveDbError::InvalidData(format!("negative {} {}", what, value)))
}

fn to_u32(value: i64, what: &str) -> Result<u32, SaveDbError> {
    u32::try_from(value)
        .map_err(|_| SaveDbError::InvalidData(format!("{} out of range: {}", what, value)))
}

fn to_i32(value: i64, what: &str) -> Result<i32, SaveDbError> {
    i32::try_from(value)
        .map_err(|_| SaveDbError::InvalidData(format!("{} out of range: {}", what, value)))
}

/// Where an unusable save database is moved: `<path>.corrupt`.
pub fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".corrupt");
    PathBuf::from(name)
}

/// SQLite save slot.
pub struct SaveDb {
    conn: Connection,
}

impl SaveDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SaveDbError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open the slot at `path`. A file that is not a save database, or one written by a
    /// different schema, is moved to [`quarantine_path`] and a fresh database replaces it.
    pub fn open_or_recover(path: impl AsRef<Path>) -> Result<Self, SaveDbError> {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(db) => Ok(db),
            Err(SaveDbError::Sqlite(err)) if !path.exists() => Err(SaveDbError::Sqlite(err)),
            Err(err) => {
                let aside = quarantine_path(path);
                warn!(
                    "unusable save database {} ({}), moving it to {}",
                    path.display(),
                    err,
                    aside.display()
                );
                fs::rename(path, &aside)?;
                Self::open(path)
            }
        }
    }

    pub fn open_in_memory() -> Result<Self, SaveDbError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, SaveDbError> {
        let mut db = Self { conn };
        db.conn.execute_batch(SAVE_DB_SCHEMA)?;
        db.ensure_save_meta()?;
        Ok(db)
    }

    pub fn load_state(&self) -> Result<Option<SaveState>, SaveDbError> {
        let session = self
            .conn
            .query_row(
                "SELECT seed, width, height, tick, selected_x, selected_y FROM session WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((seed, width, height, tick, selected_x, selected_y)) = session else {
            return Ok(None);
        };
        let seed = u32::try_from(seed)
            .map_err(|_| SaveDbError::InvalidData(format!("seed out of range: {}", seed)))?;
        let selection = match (selected_x, selected_y) {
            (Some(x), Some(y)) => Some((to_i32(x, "selected x")?, to_i32(y, "selected y")?)),
            _ => None,
        };

        let market = self.load_market()?;
        let trading_post = self.load_trading_post()?;
        let tiles = self.load_tiles()?;
        let player = self
            .load_player()?
            .ok_or_else(|| SaveDbError::InvalidData("session has no player".to_string()))?;

        Ok(Some(SaveState {
            version: SAVE_VERSION,
            seed,
            width: to_i32(width, "width")?,
            height: to_i32(height, "height")?,
            time: GameTime::at_tick(non_negative(tick, "tick")?),
            player,
            market,
            trading_post,
            selection,
            tiles,
        }))
    }

    pub fn save_state(&mut self, state: &SaveState) -> Result<(), SaveDbError> {
        let tx = self.conn.transaction()?;
        for table in DATA_TABLES {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
        }

        tx.execute(
            "INSERT INTO session (id, seed, width, height, tick, selected_x, selected_y) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                state.seed as i64,
                state.width as i64,
                state.height as i64,
                state.time.tick as i64,
                state.selection.map(|(x, _)| x as i64),
                state.selection.map(|(_, y)| y as i64),
            ],
        )?;

        let market = &state.market;
        tx.execute(
            "INSERT INTO market (id, price_per_gram, last_price, supply_pressure, equipment_demand, store_demand) VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                market.price_per_gram,
                market.last_price,
                market.supply_pressure,
                market.equipment_demand,
                market.store_demand
            ],
        )?;

        let post = &state.trading_post;
        tx.execute(
            "INSERT INTO trading_post (id, open, price, days_run, kits_sold, revenue) VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                if post.open { 1 } else { 0 },
                post.price,
                post.days_run as i64,
                post.kits_sold as i64,
                post.revenue
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO tiles (x, y, discovered, claimed_by, gold_remaining) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for tile in &state.tiles {
                stmt.execute(params![
                    tile.x as i64,
                    tile.y as i64,
                    if tile.discovered { 1 } else { 0 },
                    tile.claimed_by.map(|owner| owner as i64),
                    tile.gold_remaining as i64
                ])?;
            }
        }

        let player = &state.player;
        let prospector = &player.prospector;
        tx.execute(
            "INSERT INTO player (id, uid, name, x, y, money, stamina, max_carry, gold_dust) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                player.uid as i64,
                player.name.as_str(),
                player.position.0 as i64,
                player.position.1 as i64,
                prospector.money,
                prospector.stamina,
                prospector.max_carry,
                prospector.gold_dust as i64
            ],
        )?;
        for kind in SkillKind::ALL {
            tx.execute(
                "INSERT INTO player_skills (skill, xp) VALUES (?1, ?2)",
                params![kind.as_str(), prospector.skills.xp(kind)],
            )?;
        }
        for key in &prospector.equipment {
            tx.execute(
                "INSERT INTO player_equipment (item) VALUES (?1)",
                params![key.as_str()],
            )?;
        }
        for (seq, claim) in prospector.claims.iter().enumerate() {
            tx.execute(
                "INSERT INTO claims (seq, x, y, staked_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    seq as i64,
                    claim.x as i64,
                    claim.y as i64,
                    claim.staked_at as i64
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Drop the saved game but keep the schema.
    pub fn clear(&mut self) -> Result<(), SaveDbError> {
        let tx = self.conn.transaction()?;
        for table in DATA_TABLES {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn ensure_save_meta(&mut self) -> Result<(), SaveDbError> {
        let meta = self
            .conn
            .query_row(
                "SELECT schema_version, save_version FROM save_meta WHERE id = 1",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match meta {
            Some((schema_version, save_version)) => {
                if schema_version != SAVE_SCHEMA_VERSION || save_version != SAVE_VERSION as i64 {
                    return Err(SaveDbError::InvalidData(format!(
                        "save_meta version mismatch (schema {}, save {}, expected {}, {})",
                        schema_version, save_version, SAVE_SCHEMA_VERSION, SAVE_VERSION
                    )));
                }
            }
            None => {
                self.conn.execute(
                    "INSERT INTO save_meta (id, schema_version, save_version) VALUES (1, ?1, ?2)",
                    params![SAVE_SCHEMA_VERSION, SAVE_VERSION as i64],
                )?;
            }
        }
        Ok(())
    }

    fn load_market(&self) -> Result<Market, SaveDbError> {
        let market = self
            .conn
            .query_row(
                "SELECT price_per_gram, last_price, supply_pressure, equipment_demand, store_demand FROM market WHERE id = 1",
                [],
                |row| {
                    Ok(Market {
                        price_per_gram: row.get(0)?,
                        last_price: row.get(1)?,
                        supply_pressure: row.get(2)?,
                        equipment_demand: row.get(3)?,
                        store_demand: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(market.unwrap_or_default())
    }

    fn load_trading_post(&self) -> Result<TradingPost, SaveDbError> {
        let row = self
            .conn
            .query_row(
                "SELECT open, price, days_run, kits_sold, revenue FROM trading_post WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, f64>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((open, price, days_run, kits_sold, revenue)) = row else {
            return Ok(TradingPost::default());
        };
        Ok(TradingPost {
            open: open != 0,
            price,
            days_run: to_u32(days_run, "days_run")?,
            kits_sold: to_u32(kits_sold, "kits_sold")?,
            revenue,
        })
    }

    fn load_tiles(&self) -> Result<Vec<SavedTile>, SaveDbError> {
        let mut stmt = self.conn.prepare(
            "SELECT x, y, discovered, claimed_by, gold_remaining FROM tiles ORDER BY y, x",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        let mut tiles = Vec::new();
        for row in rows {
            let (x, y, discovered, claimed_by, gold_remaining) = row?;
            let claimed_by = match claimed_by {
                Some(owner) => Some(to_u32(owner, "claim owner")?),
                None => None,
            };
            tiles.push(SavedTile {
                x: to_i32(x, "tile x")?,
                y: to_i32(y, "tile y")?,
                discovered: discovered != 0,
                claimed_by,
                gold_remaining: to_u32(gold_remaining, "gold_remaining")?,
            });
        }
        Ok(tiles)
    }

    fn load_player(&self) -> Result<Option<SavedPlayer>, SaveDbError> {
        let row = self
            .conn
            .query_row(
                "SELECT uid, name, x, y, money, stamina, max_carry, gold_dust FROM player WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                        row.get::<_, i64>(7)?,
                    ))
                },
            )
            .optional()?;
        let Some((uid, name, x, y, money, stamina, max_carry, gold_dust)) = row else {
            return Ok(None);
        };

        Ok(Some(SavedPlayer {
            uid: to_u32(uid, "player uid")?,
            name,
            position: (to_i32(x, "player x")?, to_i32(y, "player y")?),
            prospector: Prospector {
                money,
                stamina,
                max_carry,
                gold_dust: to_u32(gold_dust, "gold_dust")?,
                equipment: self.load_equipment()?,
                skills: self.load_skills()?,
                claims: self.load_claims()?,
            },
        }))
    }

    fn load_skills(&self) -> Result<SkillSet, SaveDbError> {
        let mut skills = SkillSet::default();
        let mut stmt = self.conn.prepare("SELECT skill, xp FROM player_skills")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        for row in rows {
            let (skill, xp) = row?;
            skills.set_xp(skill_from_str(&skill)?, xp);
        }
        Ok(skills)
    }

    fn load_equipment(&self) -> Result<BTreeSet<EquipmentKey>, SaveDbError> {
        let mut equipment = BTreeSet::new();
        let mut stmt = self.conn.prepare("SELECT item FROM player_equipment")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for row in rows {
            equipment.insert(equipment_from_str(&row?)?);
        }
        Ok(equipment)
    }

    fn load_claims(&self) -> Result<Vec<ClaimRecord>, SaveDbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT x, y, staked_at FROM claims ORDER BY seq")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        let mut claims = Vec::new();
        for row in rows {
            let (x, y, staked_at) = row?;
            claims.push(ClaimRecord {
                x: to_i32(x, "claim x")?,
                y: to_i32(y, "claim y")?,
                staked_at: non_negative(staked_at, "staked_at")?,
            });
        }
        Ok(claims)
    }
}

impl SaveRepository for SaveDb {
    fn load(&mut self) -> Result<Option<SaveState>, Box<dyn std::error::Error>> {
        Ok(self.load_state()?)
    }

    fn save(&mut self, state: &SaveState) -> Result<(), Box<dyn std::error::Error>> {
        self.save_state(state)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        SaveDb::clear(self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GameConfig;
    use crate::core::world::{ActionIntent, Game};
    use crate::rules::rng::FixedNoise;
    use crate::simulation::ExtractionKind;

    fn played_game() -> Game {
        let mut game = Game::with_noise(GameConfig::default(), Box::new(FixedNoise(0.3)));
        let river = game
            .field()
            .tiles()
            .iter()
            .find(|t| t.terrain == crate::simulation::Terrain::River && t.gold_remaining >= 10)
            .map(|t| t.position())
            .expect("river tile");
        game.act(ActionIntent::BuyEquipment {
            item: "pan".to_string(),
        });
        game.act(ActionIntent::Select {
            x: river.x,
            y: river.y,
        });
        game.act(ActionIntent::StakeClaim);
        game.act(ActionIntent::Extract(ExtractionKind::Pan));
        game.act(ActionIntent::SellGold);
        game
    }

    #[test]
    fn empty_database_has_no_save() {
        let db = SaveDb::open_in_memory().unwrap();
        assert!(db.load_state().unwrap().is_none());
    }

    #[test]
    fn round_trip_matches_json_snapshot() {
        let game = played_game();
        let state = game.save_state();
        let mut db = SaveDb::open_in_memory().unwrap();
        db.save_state(&state).unwrap();
        let loaded = db.load_state().unwrap().expect("saved state");
        assert_eq!(loaded, state);

        let mut restored = Game::with_noise(GameConfig::default(), Box::new(FixedNoise(0.3)));
        restored.load_state(loaded).unwrap();
        assert_eq!(restored.save_state(), state);
    }

    #[test]
    fn saving_twice_replaces_rows() {
        let mut game = played_game();
        let mut db = SaveDb::open_in_memory().unwrap();
        game.save(&mut db).unwrap();
        game.act(ActionIntent::Rest);
        game.save(&mut db).unwrap();
        assert_eq!(db.load_state().unwrap(), Some(game.save_state()));
    }

    #[test]
    fn clear_forgets_the_game() {
        let game = played_game();
        let mut db = SaveDb::open_in_memory().unwrap();
        game.save(&mut db).unwrap();
        db.clear().unwrap();
        assert!(db.load_state().unwrap().is_none());
    }

    #[test]
    fn unknown_equipment_row_is_invalid() {
        let game = played_game();
        let mut db = SaveDb::open_in_memory().unwrap();
        db.save_state(&game.save_state()).unwrap();
        db.conn
            .execute("INSERT INTO player_equipment (item) VALUES ('dynamite')", [])
            .unwrap();
        assert!(matches!(
            db.load_state(),
            Err(SaveDbError::InvalidData(_))
        ));
    }

    #[test]
    fn oversized_coordinates_are_invalid() {
        let game = played_game();
        let mut db = SaveDb::open_in_memory().unwrap();
        db.save_state(&game.save_state()).unwrap();
        db.conn
            .execute("UPDATE session SET width = ?1", params![i64::from(i32::MAX) + 1])
            .unwrap();
        assert!(matches!(
            db.load_state(),
            Err(SaveDbError::InvalidData(message)) if message.starts_with("width")
        ));

        db.save_state(&game.save_state()).unwrap();
        db.conn
            .execute("UPDATE player SET x = ?1", params![-(1_i64 << 40)])
            .unwrap();
        assert!(matches!(
            db.load_state(),
            Err(SaveDbError::InvalidData(message)) if message.starts_with("player x")
        ));
    }

    fn temp_db_path(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "goldfield-db-{}-{}.db",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        let _ = fs::remove_file(quarantine_path(&path));
        path
    }

    #[test]
    fn garbage_file_is_moved_aside() {
        let path = temp_db_path("garbage");
        fs::write(&path, vec![0x5a_u8; 4096]).unwrap();
        assert!(SaveDb::open(&path).is_err());

        let db = SaveDb::open_or_recover(&path).unwrap();
        assert!(db.load_state().unwrap().is_none());
        assert_eq!(fs::read(quarantine_path(&path)).unwrap(), vec![0x5a_u8; 4096]);
        drop(db);
        let _ = fs::remove_file(&path);
        let _ = fs::remove_file(quarantine_path(&path));
    }

    #[test]
    fn version_mismatch_is_moved_aside() {
        let path = temp_db_path("version");
        {
            let db = SaveDb::open(&path).unwrap();
            db.conn
                .execute("UPDATE save_meta SET schema_version = 99", [])
                .unwrap();
        }
        assert!(SaveDb::open(&path).is_err());
        let db = SaveDb::open_or_recover(&path).unwrap();
        assert!(db.load_state().unwrap().is_none());
        assert!(quarantine_path(&path).exists());
        drop(db);
        let _ = fs::remove_file(&path);
        let _ = fs::remove_file(quarantine_path(&path));
    }
}
