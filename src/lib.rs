pub mod ai;
pub mod config;
pub mod debate;
pub mod error;
pub mod server;

pub use error::{ArenaError, ArenaResult};
