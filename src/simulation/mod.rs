pub mod clues;
pub mod effects;
pub mod flags;
pub mod scene;
pub mod time;
