pub mod authoring;
