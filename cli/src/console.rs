//! Terminal rendering of live tournament updates

use tourney_core::{
    ErrorPayload, LinkStatus, MatchSummary, ParticipantStanding, StatusUpdate, TournamentEnded,
    TournamentStats, TournamentUpdate,
};
use tourney_engine::LiveConnectionHandle;
use tracing::warn;

/// Subscribe console printers for every update kind
pub fn attach(handle: &LiveConnectionHandle) {
    handle.subscribe(|stats: &TournamentStats| println!("{}", render_snapshot(stats)));
    handle.subscribe(|m: &MatchSummary| println!("{}", render_match(m)));
    handle.subscribe(|p: &ParticipantStanding| {
        println!(
            "[participant] {} {}-{}{}",
            p.name,
            p.wins,
            p.losses,
            if p.eliminated { " (eliminated)" } else { "" }
        )
    });
    handle.subscribe(|u: &TournamentUpdate| {
        if let Some(round) = u.current_round {
            println!("[tournament] round {}", round);
        }
        if let Some(status) = u.status {
            println!("[tournament] status {:?}", status);
        }
        if let Some(ref message) = u.message {
            println!("[tournament] {}", message);
        }
    });
    handle.subscribe(|ended: &TournamentEnded| {
        let winner = ended
            .winner_name
            .as_deref()
            .or(ended.winner_id.as_deref())
            .unwrap_or("no winner");
        println!("[tournament] finished, winner: {}", winner);
    });
    handle.subscribe(|e: &ErrorPayload| warn!("Server reported error: {}", e.message));
    handle.subscribe(|s: &StatusUpdate| println!("{}", render_status(s)));
}

pub fn render_snapshot(stats: &TournamentStats) -> String {
    let round = stats
        .tournament
        .current_round
        .map(|r| format!("round {}", r))
        .unwrap_or_else(|| "no round".to_string());
    let at = stats
        .timestamp
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| chrono::Local::now().format("%H:%M:%S").to_string());

    format!(
        "[{}] {} ({:?}, {}) - {} participants, {}/{} matches done, {} live",
        at,
        stats.tournament.name,
        stats.status(),
        round,
        stats.participants.len(),
        stats.stats.completed_matches,
        stats.stats.total_matches,
        stats.live_matches().count()
    )
}

pub fn render_match(m: &MatchSummary) -> String {
    let side = |name: &Option<String>| name.clone().unwrap_or_else(|| "TBD".to_string());
    let score = |s: Option<u32>| s.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());

    let mut line = format!(
        "[match {}] R{} {} {} : {} {} ({:?})",
        m.id,
        m.round,
        side(&m.participant1),
        score(m.score1),
        score(m.score2),
        side(&m.participant2),
        m.status
    );
    if let Some(ref winner) = m.winner {
        line.push_str(&format!(" winner {}", winner));
    }
    line
}

pub fn render_status(s: &StatusUpdate) -> String {
    match s.status {
        LinkStatus::Reconnecting => format!(
            "[link] reconnecting (attempt {}) in {}ms",
            s.attempt.unwrap_or(0),
            s.delay_ms.unwrap_or(0)
        ),
        LinkStatus::Error => format!(
            "[link] error{}",
            s.message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default()
        ),
        LinkStatus::Connected => "[link] connected".to_string(),
        LinkStatus::Polling => "[link] polling".to_string(),
        LinkStatus::Disconnected => "[link] disconnected".to_string(),
    }
}
