pub mod identity;
pub mod prospector;
pub mod world;

pub use identity::Name;
pub use prospector::{ClaimRecord, Prospector, StartingKit};
pub use world::{EntityId, Player, Position};
