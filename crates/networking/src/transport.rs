//! Transport seams used by the live connection manager

use async_trait::async_trait;
use tourney_core::{Result, TournamentStats, UpdateEvent};

/// An open push channel delivering updates in arrival order
#[async_trait]
pub trait PushChannel: Send {
    /// Next update; `None` when the server closed the channel
    async fn next_event(&mut self) -> Option<Result<UpdateEvent>>;
}

/// Source of live data for one tournament
#[async_trait]
pub trait LiveTransport: Send + Sync + 'static {
    /// Whether a push channel can be opened at all
    fn supports_push(&self) -> bool {
        true
    }

    /// Open the push channel for a tournament
    async fn open_push(&self, tournament_id: &str) -> Result<Box<dyn PushChannel>>;

    /// Fetch one full snapshot from the stats endpoint
    async fn fetch_stats(&self, tournament_id: &str) -> Result<TournamentStats>;
}
