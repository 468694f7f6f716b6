pub mod repository;
pub mod sqlite;

pub use repository::{JsonSaveFile, SaveRepository};
pub use sqlite::{SaveDb, SaveDbError};
