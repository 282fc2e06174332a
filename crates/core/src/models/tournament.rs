//! Tournament snapshot models (stats endpoint / full updates)

use crate::TournamentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response from GET /tournaments/{id}/api/stats/
///
/// Also the payload of a pushed `full_update` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentStats {
    pub tournament: TournamentSummary,
    #[serde(default)]
    pub participants: Vec<ParticipantStanding>,
    #[serde(default)]
    pub matches: Vec<MatchSummary>,
    #[serde(default)]
    pub stats: StatsCounters,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TournamentStats {
    pub fn status(&self) -> TournamentStatus {
        self.tournament.status
    }

    /// Matches currently being played
    pub fn live_matches(&self) -> impl Iterator<Item = &MatchSummary> {
        self.matches.iter().filter(|m| m.status == MatchStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: TournamentStatus,
    #[serde(default)]
    pub current_round: Option<u32>,
    #[serde(default)]
    pub participant_count: u32,
    #[serde(default)]
    pub max_participants: Option<u32>,
}

/// A participant row in the standings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStanding {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub eliminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Disputed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl Default for MatchStatus {
    fn default() -> Self {
        MatchStatus::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    pub participant1: Option<String>,
    #[serde(default)]
    pub participant2: Option<String>,
    #[serde(default)]
    pub score1: Option<u32>,
    #[serde(default)]
    pub score2: Option<u32>,
    #[serde(default)]
    pub winner: Option<String>,
}

/// Aggregate counters shown on the statistics panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsCounters {
    #[serde(default)]
    pub total_matches: u32,
    #[serde(default)]
    pub completed_matches: u32,
    #[serde(default)]
    pub active_participants: u32,
}

/// Deserialize an identifier that may arrive as a string or an integer
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StringOrNumber;

    impl<'de> de::Visitor<'de> for StringOrNumber {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer id")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}
