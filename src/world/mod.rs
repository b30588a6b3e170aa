pub mod repository;
pub mod sqlite;

pub use repository::{open_repository, JsonSaveFile, SaveRepository};
pub use sqlite::SaveDb;
