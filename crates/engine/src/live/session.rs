//! The background task that owns one live connection

use super::listeners::SharedListeners;
use super::retry::{RetryBudget, RetryDecision};
use super::LiveResource;
use crate::config::LiveConfig;
use std::future::pending;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, timeout, Interval, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use tourney_core::{
    ConnectionState, Error, LinkStatus, Result, StatusUpdate, UpdateEvent, Visibility,
};
use tourney_networking::{LiveTransport, PushChannel};
use tracing::{debug, info, warn};

/// Requests from the handle to the session task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    Refresh,
    SetVisibility(Visibility),
}

pub(crate) struct Session {
    resource: LiveResource,
    config: LiveConfig,
    transport: Arc<dyn LiveTransport>,
    listeners: SharedListeners,
    state_tx: watch::Sender<ConnectionState>,
    destroyed: Arc<AtomicBool>,
    cancel_token: CancellationToken,
    budget: RetryBudget,
    push: Option<Box<dyn PushChannel>>,
    retry_timer: Option<Pin<Box<Sleep>>>,
    poll_timer: Option<Interval>,
    /// Set once reconnect attempts run out; never cleared
    push_abandoned: bool,
    visibility: Visibility,
    last_fetch_failed: bool,
    finished: bool,
}

impl Session {
    pub(crate) fn new(
        resource: LiveResource,
        config: LiveConfig,
        transport: Arc<dyn LiveTransport>,
        listeners: SharedListeners,
        state_tx: watch::Sender<ConnectionState>,
        destroyed: Arc<AtomicBool>,
        cancel_token: CancellationToken,
    ) -> Self {
        let budget = RetryBudget::from_config(&config);
        Self {
            resource,
            config,
            transport,
            listeners,
            state_tx,
            destroyed,
            cancel_token,
            budget,
            push: None,
            retry_timer: None,
            poll_timer: None,
            push_abandoned: false,
            visibility: Visibility::Visible,
            last_fetch_failed: false,
            finished: false,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!("Live session started for tournament {}", self.resource.id);
        let cancel_token = self.cancel_token.clone();

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("Live session for {} cancelled", self.resource.id);
                    break;
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("All handles dropped for {}", self.resource.id);
                        break;
                    }
                },
                frame = next_push(&mut self.push) => self.on_push_frame(frame),
                _ = wait_retry(&mut self.retry_timer) => {
                    self.retry_timer = None;
                    self.on_retry_timer().await;
                }
                _ = next_tick(&mut self.poll_timer) => self.fetch_updates().await,
            }

            if self.finished {
                break;
            }
        }

        self.shutdown();
        info!("Live session for tournament {} exited", self.resource.id);
    }

    async fn handle_command(&mut self, command: Command) {
        debug!("Live session command: {:?}", command);
        match command {
            Command::Connect => self.connect().await,
            Command::Disconnect => self.disconnect(),
            Command::Refresh => self.fetch_updates().await,
            Command::SetVisibility(visibility) => self.set_visibility(visibility),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ConnectionState) {
        if self.is_destroyed() {
            return;
        }
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Tournament {}: {} -> {}", self.resource.id, previous, state);
        }
    }

    fn emit_status(&self, status: StatusUpdate) {
        self.dispatch(UpdateEvent::ConnectionStatus(status));
    }

    fn dispatch(&self, event: UpdateEvent) {
        if self.is_destroyed() {
            debug!("Dropping {} after destroy", event.kind());
            return;
        }
        self.listeners.dispatch(&event);
    }

    async fn connect(&mut self) {
        match self.state() {
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Polling => {
                debug!("Connect ignored, already {}", self.state());
                return;
            }
            ConnectionState::Disconnected | ConnectionState::Error => {}
        }

        self.retry_timer = None;

        let push_possible =
            self.config.enable_push && !self.push_abandoned && self.transport.supports_push();
        if !push_possible {
            self.fallback_to_polling();
            return;
        }

        self.set_state(ConnectionState::Connecting);

        let cancel_token = self.cancel_token.clone();
        let limit = self.config.request_timeout();
        let opened = tokio::select! {
            _ = cancel_token.cancelled() => return,
            opened = timeout(limit, self.transport.open_push(&self.resource.id)) => opened,
        };

        if self.is_destroyed() {
            return;
        }

        let opened = opened.unwrap_or_else(|_| Err(Error::Timeout(limit.as_millis() as u64)));

        match opened {
            Ok(channel) => {
                info!("Push channel open for tournament {}", self.resource.id);
                self.push = Some(channel);
                self.budget.reset();
                self.set_state(ConnectionState::Connected);
                self.emit_status(StatusUpdate::new(LinkStatus::Connected));
            }
            Err(e) => self.on_transport_error(e),
        }
    }

    fn on_push_frame(&mut self, frame: Option<Result<UpdateEvent>>) {
        match frame {
            Some(Ok(event)) => self.handle_event(event),
            Some(Err(e)) if !e.is_transport() => {
                warn!("Skipping bad live frame for {}: {}", self.resource.id, e);
            }
            Some(Err(e)) => self.on_transport_error(e),
            None => self.on_transport_error(Error::StreamClosed),
        }
    }

    fn on_transport_error(&mut self, error: Error) {
        warn!("Live push error for tournament {}: {}", self.resource.id, error);

        self.push = None;
        self.set_state(ConnectionState::Error);
        self.emit_status(StatusUpdate::new(LinkStatus::Error).with_message(error.to_string()));

        match self.budget.next() {
            RetryDecision::Retry { attempt, delay } => {
                info!(
                    "Reconnecting to tournament {} in {:?} (attempt {}/{})",
                    self.resource.id,
                    delay,
                    attempt,
                    self.budget.max_attempts()
                );
                self.retry_timer = Some(Box::pin(sleep(delay)));
                self.emit_status(StatusUpdate::reconnecting(attempt, delay.as_millis() as u64));
            }
            RetryDecision::Exhausted => {
                warn!(
                    "Giving up on push for tournament {} after {} attempts",
                    self.resource.id,
                    self.budget.attempts()
                );
                self.push_abandoned = true;
                self.fallback_to_polling();
            }
        }
    }

    async fn on_retry_timer(&mut self) {
        // A manual connect or disconnect may have raced the timer
        if self.state() != ConnectionState::Error {
            debug!("Retry timer fired while {}, skipping", self.state());
            return;
        }
        self.connect().await;
    }

    fn fallback_to_polling(&mut self) {
        self.push = None;
        self.retry_timer = None;

        if !self.config.fallback_polling {
            warn!(
                "Push unavailable for tournament {} and polling is disabled",
                self.resource.id
            );
            self.set_state(ConnectionState::Error);
            self.emit_status(
                StatusUpdate::new(LinkStatus::Error).with_message("live updates unavailable"),
            );
            return;
        }

        info!(
            "Polling tournament {} every {:?}",
            self.resource.id,
            self.config.polling_interval()
        );
        self.set_state(ConnectionState::Polling);
        self.emit_status(StatusUpdate::new(LinkStatus::Polling));

        if self.visibility == Visibility::Visible {
            self.start_polling();
        }
    }

    /// First tick fires immediately, then every polling interval
    fn start_polling(&mut self) {
        let mut timer = interval(self.config.polling_interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.poll_timer = Some(timer);
    }

    fn set_visibility(&mut self, visibility: Visibility) {
        if self.visibility == visibility {
            return;
        }
        self.visibility = visibility;

        match visibility {
            Visibility::Hidden => {
                if self.poll_timer.take().is_some() {
                    debug!("Polling paused for hidden tournament {}", self.resource.id);
                }
            }
            Visibility::Visible => {
                if self.state() == ConnectionState::Polling && self.poll_timer.is_none() {
                    debug!("Polling resumed for tournament {}", self.resource.id);
                    self.start_polling();
                }
            }
        }
    }

    async fn fetch_updates(&mut self) {
        let cancel_token = self.cancel_token.clone();
        let limit = self.config.request_timeout();

        let result = tokio::select! {
            _ = cancel_token.cancelled() => return,
            result = timeout(limit, self.transport.fetch_stats(&self.resource.id)) => result,
        };

        if self.is_destroyed() {
            debug!("Discarding stats for {} fetched after destroy", self.resource.id);
            return;
        }

        let result = result.unwrap_or_else(|_| Err(Error::Timeout(limit.as_millis() as u64)));

        match result {
            Ok(stats) => {
                let recovered = self.last_fetch_failed || self.state() == ConnectionState::Error;
                self.last_fetch_failed = false;
                self.handle_event(UpdateEvent::FullUpdate(stats));

                if recovered && !self.finished {
                    self.emit_status(StatusUpdate::new(LinkStatus::Connected));
                }
            }
            Err(e) => {
                warn!("Stats fetch failed for tournament {}: {}", self.resource.id, e);
                self.last_fetch_failed = true;
                self.emit_status(StatusUpdate::new(LinkStatus::Error).with_message(e.to_string()));
            }
        }
    }

    fn handle_event(&mut self, event: UpdateEvent) {
        let terminal = event.is_terminal();
        self.dispatch(event);

        if terminal {
            info!(
                "Tournament {} reached a terminal status, closing live session",
                self.resource.id
            );
            self.finished = true;
        }
    }

    fn disconnect(&mut self) {
        self.push = None;
        self.retry_timer = None;
        self.poll_timer = None;
        self.last_fetch_failed = false;

        if self.state() != ConnectionState::Disconnected {
            self.set_state(ConnectionState::Disconnected);
            self.emit_status(StatusUpdate::new(LinkStatus::Disconnected));
        }
    }

    fn shutdown(&mut self) {
        self.push = None;
        self.retry_timer = None;
        self.poll_timer = None;

        self.state_tx.send_replace(ConnectionState::Disconnected);

        if self.finished {
            // Terminal tournament: behave as if the owner called destroy()
            self.destroyed.store(true, Ordering::SeqCst);
            self.listeners.clear();
            self.cancel_token.cancel();
        }
    }
}

async fn next_push(push: &mut Option<Box<dyn PushChannel>>) -> Option<Result<UpdateEvent>> {
    match push {
        Some(channel) => channel.next_event().await,
        None => pending().await,
    }
}

async fn wait_retry(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => pending().await,
    }
}
