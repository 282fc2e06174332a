//! Tourney Watch - composition root for following one tournament live

pub mod console;

use std::sync::Arc;
use tourney_core::{Result, TournamentStats};
use tourney_engine::{spawn_live_connection, LiveConfig, LiveConnectionHandle, LiveResource};
use tourney_networking::TournamentClient;
use tracing::info;

/// Everything needed to wire a live connection
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub base_url: String,
    pub tournament_id: String,
    pub csrf_token: Option<String>,
    pub config: LiveConfig,
}

/// A wired live connection plus the snapshot used to decide whether to start it
pub struct Watch {
    pub handle: LiveConnectionHandle,
    pub initial: TournamentStats,
}

impl Watch {
    /// Whether the tournament can still produce updates
    pub fn is_live(&self) -> bool {
        self.initial.status().is_active()
    }
}

/// Build the client, learn the tournament status, spawn the manager, attach
/// the console listeners and connect.
///
/// The caller owns the returned handle and must call `destroy()` on teardown.
pub async fn compose(options: &WatchOptions) -> Result<Watch> {
    options.config.validate()?;

    let mut client = TournamentClient::new(&options.base_url)?
        .with_request_timeout(options.config.request_timeout());
    if let Some(ref token) = options.csrf_token {
        client = client.with_csrf_token(token.clone());
    }

    let initial = client.get_stats(&options.tournament_id).await?;
    info!(
        "Tournament {} '{}' is {:?}",
        initial.tournament.id,
        initial.tournament.name,
        initial.status()
    );

    let resource = LiveResource::new(options.tournament_id.clone(), initial.status());
    let handle = spawn_live_connection(resource, options.config.clone(), Arc::new(client));

    console::attach(&handle);
    handle.connect();

    Ok(Watch { handle, initial })
}
