//! Tourney Watch - follow a tournament's live updates from the terminal

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tourney_engine::LiveConfig;
use tourney_watch::{compose, WatchOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "tourney-watch", version, about = "Follow live tournament updates")]
struct Args {
    /// Site root of the tournament platform
    #[arg(long, env = "TOURNEY_BASE_URL")]
    base_url: String,

    /// Tournament to follow
    #[arg(long, env = "TOURNEY_ID")]
    tournament: String,

    /// CSRF token for deployments that guard the stats endpoint
    #[arg(long, env = "TOURNEY_CSRF_TOKEN")]
    csrf_token: Option<String>,

    /// JSON file with live connection options (camelCase keys)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the push channel and poll only
    #[arg(long)]
    no_push: bool,

    /// Do not poll when push is unavailable
    #[arg(long)]
    no_polling: bool,

    #[arg(long)]
    polling_interval_ms: Option<u64>,

    #[arg(long)]
    reconnect_delay_ms: Option<u64>,

    #[arg(long)]
    max_reconnect_attempts: Option<u32>,
}

impl Args {
    fn live_config(&self) -> Result<LiveConfig> {
        let mut config = match self.config {
            Some(ref path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                LiveConfig::from_json(&raw)?
            }
            None => LiveConfig::default(),
        };

        if self.no_push {
            config.enable_push = false;
        }
        if self.no_polling {
            config.fallback_polling = false;
        }
        if let Some(ms) = self.polling_interval_ms {
            config.polling_interval_ms = ms;
        }
        if let Some(ms) = self.reconnect_delay_ms {
            config.reconnect_delay_ms = ms;
        }
        if let Some(n) = self.max_reconnect_attempts {
            config.max_reconnect_attempts = n;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tourney_watch=info,tourney_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let options = WatchOptions {
        base_url: args.base_url.clone(),
        tournament_id: args.tournament.clone(),
        csrf_token: args.csrf_token.clone(),
        config: args.live_config()?,
    };

    tracing::info!("Watching tournament {} at {}", options.tournament_id, options.base_url);

    let watch = compose(&options)
        .await
        .context("Failed to start live connection")?;

    println!("{}", tourney_watch::console::render_snapshot(&watch.initial));

    if !watch.is_live() {
        tracing::info!("Tournament is not active, nothing to follow");
        watch.handle.destroy();
        return Ok(());
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, shutting down");
        }
        _ = watch.handle.closed() => {
            tracing::info!("Tournament finished");
        }
    }

    watch.handle.destroy();
    Ok(())
}
