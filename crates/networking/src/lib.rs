//! Tourney Networking - HTTP client, server-sent events, and transport seams

pub mod http;
pub mod push;
pub mod transport;

pub use http::TournamentClient;
pub use push::SsePushChannel;
pub use transport::{LiveTransport, PushChannel};
