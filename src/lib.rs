pub mod arena;
pub mod config;
pub mod evaluation;
pub mod evolution;
pub mod vm;
