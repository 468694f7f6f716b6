pub mod camp;
pub mod claims;
pub mod extraction;
pub mod market;
pub mod outcome;
pub mod terrain;
pub mod time;
pub mod trading_post;

pub use extraction::{Extraction, ExtractionKind};
pub use market::Market;
pub use outcome::{ActionEffect, ActionReport, Rejection};
pub use terrain::{GoldField, Terrain, Tile};
pub use time::GameTime;
pub use trading_post::TradingPost;
