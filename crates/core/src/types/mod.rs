//! Shared type definitions for connection and tournament lifecycle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Live connection state, one current value per manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
    Polling,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
            ConnectionState::Polling => "polling",
        }
    }

    /// True while updates are flowing, either pushed or polled
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Polling)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Foreground/background signal from the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Tournament lifecycle status as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Draft,
    Registration,
    Active,
    InProgress,
    Paused,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl TournamentStatus {
    /// Statuses that can still produce live updates
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TournamentStatus::Registration
                | TournamentStatus::Active
                | TournamentStatus::InProgress
                | TournamentStatus::Paused
        )
    }

    /// Statuses after which no further updates arrive
    pub fn is_terminal(&self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Cancelled)
    }
}

impl Default for TournamentStatus {
    fn default() -> Self {
        TournamentStatus::Unknown
    }
}
