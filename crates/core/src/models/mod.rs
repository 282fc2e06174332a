//! Data models for tournament live updates

mod events;
mod tournament;

pub use events::*;
pub use tournament::*;
