//! Tournament HTTP client for the stats and live-update endpoints

use crate::push::SsePushChannel;
use crate::transport::{LiveTransport, PushChannel};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE},
    Client, Response, StatusCode,
};
use std::time::Duration;
use tourney_core::{Error, Result, TournamentStats};
use tracing::{debug, error, instrument};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CSRF_HEADER: &str = "x-csrftoken";
const REQUESTED_WITH_HEADER: &str = "x-requested-with";

/// HTTP client for one tournament backend
///
/// Talks to the Django-style routes `/tournaments/{id}/api/stats/` and
/// `/tournaments/{id}/live-updates/`. The CSRF header is only sent when a
/// token was configured, since not every deployment guards GET endpoints.
#[derive(Clone)]
pub struct TournamentClient {
    http: Client,
    base_url: String,
    csrf_token: Option<String>,
    request_timeout: Duration,
}

impl TournamentClient {
    /// Create a new client for the given site root (e.g. `https://arena.example.com`)
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Attach a CSRF token sent as `X-CSRFToken` on every request
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Override the per-request timeout for snapshot fetches
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats_url(&self, tournament_id: &str) -> String {
        format!("{}/tournaments/{}/api/stats/", self.base_url, tournament_id)
    }

    pub fn live_updates_url(&self, tournament_id: &str) -> String {
        format!("{}/tournaments/{}/live-updates/", self.base_url, tournament_id)
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(REQUESTED_WITH_HEADER),
            HeaderValue::from_static("XMLHttpRequest"),
        );

        if let Some(ref token) = self.csrf_token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| Error::Config(format!("Invalid CSRF token: {}", e)))?;
            headers.insert(HeaderName::from_static(CSRF_HEADER), value);
        }

        Ok(headers)
    }

    fn check_status(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        error!("{} request failed with status {}", what, status);
        match status {
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => {
                Err(Error::PushUnavailable(format!("{} returned {}", what, status)))
            }
            _ => Err(Error::ApiError(format!("{} returned {}", what, status))),
        }
    }

    /// Fetch the current tournament snapshot
    #[instrument(skip(self))]
    pub async fn get_stats(&self, tournament_id: &str) -> Result<TournamentStats> {
        let url = self.stats_url(tournament_id);
        debug!("Fetching stats from: {}", url);

        let response = self
            .http
            .get(&url)
            .headers(self.default_headers()?)
            .header(ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            error!("Stats request failed with status {}", status);
            return Err(Error::ApiError(format!("Stats request returned {}", status)));
        }

        let stats: TournamentStats = response.json().await.map_err(|e| {
            if e.is_timeout() {
                return Error::Timeout(self.request_timeout.as_millis() as u64);
            }
            error!("Failed to parse stats response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!(
            "Stats fetched: {} ({:?}), {} participants, {} matches",
            stats.tournament.name,
            stats.status(),
            stats.participants.len(),
            stats.matches.len()
        );
        Ok(stats)
    }

    /// Open the server-sent events stream for a tournament
    #[instrument(skip(self))]
    pub async fn open_live_updates(&self, tournament_id: &str) -> Result<SsePushChannel> {
        let url = self.live_updates_url(tournament_id);
        debug!("Opening live updates: {}", url);

        let response = self
            .http
            .get(&url)
            .headers(self.default_headers()?)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let response = Self::check_status(response, "Live updates")?;

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);

        if !is_event_stream {
            return Err(Error::PushUnavailable(
                "Live updates endpoint did not return an event stream".to_string(),
            ));
        }

        debug!("Live updates stream open for tournament {}", tournament_id);
        Ok(SsePushChannel::new(response))
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.request_timeout.as_millis() as u64)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl LiveTransport for TournamentClient {
    async fn open_push(&self, tournament_id: &str) -> Result<Box<dyn PushChannel>> {
        let channel = self.open_live_updates(tournament_id).await?;
        Ok(Box::new(channel))
    }

    async fn fetch_stats(&self, tournament_id: &str) -> Result<TournamentStats> {
        self.get_stats(tournament_id).await
    }
}
