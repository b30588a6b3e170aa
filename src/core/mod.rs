pub mod ecs;
pub mod observers;
pub mod serialization;
pub mod world;
