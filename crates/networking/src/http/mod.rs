//! HTTP access to the tournament backend

mod client;

pub use client::TournamentClient;
