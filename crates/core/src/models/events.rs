//! Live update events delivered over the push channel or synthesised from polling

use super::tournament::{deserialize_id, MatchSummary, ParticipantStanding, TournamentStats};
use crate::TournamentStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single update, tagged by `type` with its payload under `data`
///
/// Wire form: `{"type": "match_update", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum UpdateEvent {
    FullUpdate(TournamentStats),
    MatchUpdate(MatchSummary),
    ParticipantUpdate(ParticipantStanding),
    TournamentUpdate(TournamentUpdate),
    TournamentEnded(TournamentEnded),
    Error(ErrorPayload),
    /// Emitted locally by the connection manager, never sent by the server
    ConnectionStatus(StatusUpdate),
}

impl UpdateEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            UpdateEvent::FullUpdate(_) => EventKind::FullUpdate,
            UpdateEvent::MatchUpdate(_) => EventKind::MatchUpdate,
            UpdateEvent::ParticipantUpdate(_) => EventKind::ParticipantUpdate,
            UpdateEvent::TournamentUpdate(_) => EventKind::TournamentUpdate,
            UpdateEvent::TournamentEnded(_) => EventKind::TournamentEnded,
            UpdateEvent::Error(_) => EventKind::Error,
            UpdateEvent::ConnectionStatus(_) => EventKind::ConnectionStatus,
        }
    }

    /// Whether this event moves the tournament into a terminal status
    pub fn is_terminal(&self) -> bool {
        match self {
            UpdateEvent::TournamentEnded(_) => true,
            UpdateEvent::FullUpdate(stats) => stats.status().is_terminal(),
            UpdateEvent::TournamentUpdate(update) => {
                update.status.map(|s| s.is_terminal()).unwrap_or(false)
            }
            _ => false,
        }
    }
}

/// Discriminator of [`UpdateEvent`], used as the listener registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FullUpdate,
    MatchUpdate,
    ParticipantUpdate,
    TournamentUpdate,
    TournamentEnded,
    Error,
    ConnectionStatus,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::FullUpdate => "full_update",
            EventKind::MatchUpdate => "match_update",
            EventKind::ParticipantUpdate => "participant_update",
            EventKind::TournamentUpdate => "tournament_update",
            EventKind::TournamentEnded => "tournament_ended",
            EventKind::Error => "error",
            EventKind::ConnectionStatus => "connection_status",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial tournament change (round advanced, status flipped, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentUpdate {
    #[serde(default)]
    pub status: Option<TournamentStatus>,
    #[serde(default)]
    pub current_round: Option<u32>,
    #[serde(default)]
    pub participant_count: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentEnded {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub winner_name: Option<String>,
    #[serde(default)]
    pub final_standings: Vec<ParticipantStanding>,
}

/// Server-side error pushed to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Health of the live link as reported to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Connected,
    Error,
    Reconnecting,
    Polling,
    Disconnected,
}

/// Payload of a `connection_status` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: LinkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: LinkStatus) -> Self {
        Self {
            status,
            attempt: None,
            delay_ms: None,
            message: None,
        }
    }

    pub fn reconnecting(attempt: u32, delay_ms: u64) -> Self {
        Self {
            status: LinkStatus::Reconnecting,
            attempt: Some(attempt),
            delay_ms: Some(delay_ms),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A payload type that can be subscribed to directly
///
/// Lets consumers register `Fn(&MatchSummary)` instead of matching on
/// [`UpdateEvent`] themselves.
pub trait EventPayload: Send + Sync + 'static {
    const KIND: EventKind;

    fn from_event(event: &UpdateEvent) -> Option<&Self>;
}

macro_rules! event_payload {
    ($ty:ty, $variant:ident) => {
        impl EventPayload for $ty {
            const KIND: EventKind = EventKind::$variant;

            fn from_event(event: &UpdateEvent) -> Option<&Self> {
                match event {
                    UpdateEvent::$variant(payload) => Some(payload),
                    _ => None,
                }
            }
        }
    };
}

event_payload!(TournamentStats, FullUpdate);
event_payload!(MatchSummary, MatchUpdate);
event_payload!(ParticipantStanding, ParticipantUpdate);
event_payload!(TournamentUpdate, TournamentUpdate);
event_payload!(TournamentEnded, TournamentEnded);
event_payload!(ErrorPayload, Error);
event_payload!(StatusUpdate, ConnectionStatus);

fn deserialize_optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_id")] String);

    Option::<Wrapper>::deserialize(deserializer).map(|w| w.map(|Wrapper(id)| id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchStatus;

    #[test]
    fn test_match_update_from_wire() {
        let raw = r#"{"type":"match_update","data":{"id":12,"round":3,"status":"completed","score1":2,"score2":1,"winner":"ana"}}"#;
        let event: UpdateEvent = serde_json::from_str(raw).unwrap();

        assert_eq!(event.kind(), EventKind::MatchUpdate);
        let summary = MatchSummary::from_event(&event).unwrap();
        assert_eq!(summary.id, "12");
        assert_eq!(summary.status, MatchStatus::Completed);
        assert!(TournamentStats::from_event(&event).is_none());
    }

    #[test]
    fn test_tournament_ended_is_terminal() {
        let raw = r#"{"type":"tournament_ended","data":{"winner_id":5,"winner_name":"bo"}}"#;
        let event: UpdateEvent = serde_json::from_str(raw).unwrap();

        assert!(event.is_terminal());
        let ended = TournamentEnded::from_event(&event).unwrap();
        assert_eq!(ended.winner_id.as_deref(), Some("5"));
    }

    #[test]
    fn test_tournament_update_terminal_only_when_status_is() {
        let round_change: UpdateEvent =
            serde_json::from_str(r#"{"type":"tournament_update","data":{"current_round":4}}"#).unwrap();
        assert!(!round_change.is_terminal());

        let cancelled: UpdateEvent =
            serde_json::from_str(r#"{"type":"tournament_update","data":{"status":"cancelled"}}"#).unwrap();
        assert!(cancelled.is_terminal());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_str::<UpdateEvent>(r#"{"type":"chat_message","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_status_update_wire_shape() {
        let json = serde_json::to_value(StatusUpdate::reconnecting(2, 4000)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "reconnecting", "attempt": 2, "delayMs": 4000 })
        );
        assert_eq!(EventKind::ConnectionStatus.to_string(), "connection_status");
    }
}
