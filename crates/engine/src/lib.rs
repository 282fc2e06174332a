//! Tourney Engine - Live connection manager, retry policy, and listener dispatch

pub mod config;
pub mod live;

pub use config::LiveConfig;
pub use live::{
    listener, spawn_live_connection, typed_listener, Listener, LiveConnectionHandle, LiveResource,
};
