//! Live connection manager: push with backoff, polling fallback, typed dispatch
//!
//! Each manager is a background Tokio task that owns the connection state,
//! the retry budget, the push channel and the timers. Consumers drive it
//! through a cloneable [`LiveConnectionHandle`].

mod listeners;
mod retry;
mod session;

pub use listeners::{listener, typed_listener, Listener, ListenerRegistry, SharedListeners};
pub use retry::{RetryBudget, RetryDecision};

use crate::config::LiveConfig;
use session::{Command, Session};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tourney_core::{ConnectionState, EventKind, EventPayload, TournamentStatus, Visibility};
use tourney_networking::LiveTransport;
use tracing::{debug, info};

/// The tournament a manager follows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveResource {
    pub id: String,
    pub status: TournamentStatus,
}

impl LiveResource {
    pub fn new(id: impl Into<String>, status: TournamentStatus) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Handle to control a live connection manager
#[derive(Clone)]
pub struct LiveConnectionHandle {
    tournament_id: Arc<str>,
    command_tx: mpsc::UnboundedSender<Command>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    listeners: SharedListeners,
    destroyed: Arc<AtomicBool>,
    cancel_token: CancellationToken,
}

/// Spawn a live connection manager for `resource`.
///
/// A resource that is not active gets a handle whose state stays
/// `Disconnected`; no task is spawned and the transport is never used.
/// Must be called from within a Tokio runtime.
pub fn spawn_live_connection(
    resource: LiveResource,
    config: LiveConfig,
    transport: Arc<dyn LiveTransport>,
) -> LiveConnectionHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let listeners = SharedListeners::new();
    let destroyed = Arc::new(AtomicBool::new(false));
    let cancel_token = CancellationToken::new();

    let handle = LiveConnectionHandle {
        tournament_id: Arc::from(resource.id.as_str()),
        command_tx,
        state_tx: state_tx.clone(),
        state_rx,
        listeners: listeners.clone(),
        destroyed: destroyed.clone(),
        cancel_token: cancel_token.clone(),
    };

    if !resource.is_active() {
        info!(
            "Tournament {} is {:?}, live updates stay off",
            resource.id, resource.status
        );
        return handle;
    }

    let session = Session::new(
        resource,
        config,
        transport,
        listeners,
        state_tx,
        destroyed,
        cancel_token,
    );
    tokio::spawn(session.run(command_rx));

    handle
}

impl LiveConnectionHandle {
    pub fn tournament_id(&self) -> &str {
        &self.tournament_id
    }

    fn send(&self, command: Command) {
        if self.is_destroyed() {
            debug!("Ignoring {:?} on destroyed manager for {}", command, self.tournament_id);
            return;
        }
        if self.command_tx.send(command).is_err() {
            debug!("Live session for {} not running, ignoring {:?}", self.tournament_id, command);
        }
    }

    /// Open the push channel, or start polling when push is unavailable
    pub fn connect(&self) {
        self.send(Command::Connect);
    }

    /// Close the push channel and stop all timers; listeners are kept
    pub fn disconnect(&self) {
        self.send(Command::Disconnect);
    }

    /// Fetch one snapshot now, whatever the current mode
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    /// Pause polling while hidden; resume with an immediate fetch when visible
    pub fn set_visibility(&self, visibility: Visibility) {
        self.send(Command::SetVisibility(visibility));
    }

    /// Register a listener for one event kind
    pub fn on(&self, kind: EventKind, listener: Listener) {
        if self.is_destroyed() {
            debug!("Ignoring listener registration after destroy");
            return;
        }
        self.listeners.on(kind, listener);
    }

    /// Remove a previously registered listener; unknown listeners are ignored
    pub fn off(&self, kind: EventKind, listener: &Listener) {
        self.listeners.off(kind, listener);
    }

    /// Register a closure over one payload type.
    ///
    /// Returns the registered [`Listener`] so it can be passed to [`off`](Self::off)
    /// with `P::KIND`.
    pub fn subscribe<P, F>(&self, f: F) -> Listener
    where
        P: EventPayload,
        F: Fn(&P) + Send + Sync + 'static,
    {
        let listener = typed_listener(f);
        self.on(P::KIND, listener.clone());
        listener
    }

    /// Current connection state
    pub fn connection_status(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver for awaiting state changes (e.g. to drive a status badge)
    pub fn status_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Tear everything down: push channel, timers and listeners.
    ///
    /// Responses still in flight are discarded. Later calls on any clone of
    /// this handle are ignored.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.listeners.clear();
        self.cancel_token.cancel();
        self.state_tx.send_replace(ConnectionState::Disconnected);
        info!("Live connection for tournament {} destroyed", self.tournament_id);
    }

    /// Resolves once the manager is destroyed, by the owner or because the
    /// tournament ended
    pub async fn closed(&self) {
        self.cancel_token.cancelled().await;
    }
}
