pub use crate::core::serialization::{
    load_state_from_path, save_state_to_path, SaveError, SaveState, SavedAnswer,
};
pub use crate::world::repository::{open_repository, JsonSaveFile, SaveRepository};
pub use crate::world::sqlite::SaveDb;
