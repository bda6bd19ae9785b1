use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::trace;

use crate::{
    FinishRunRequest, LeaderboardEntry, ScoringError, ScoringService, SeasonInfo,
    StartRunRequest, StartRunResponse, VisitRequest,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking HTTP client for the scoring service.
#[derive(Debug)]
pub struct HttpScoringClient {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpScoringClient {
    /// Creates a client for the service rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client whose requests give up after `timeout`.
    #[must_use]
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    /// Service root without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn post<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<ureq::Response, ScoringError> {
        trace!(endpoint, "scoring request");
        self.agent
            .post(&self.url(endpoint))
            .set("Content-Type", "application/json")
            .send_json(body)
            .map_err(convert_error)
    }

    fn get(&self, endpoint: &str) -> Result<ureq::Response, ScoringError> {
        trace!(endpoint, "scoring request");
        self.agent
            .get(&self.url(endpoint))
            .call()
            .map_err(convert_error)
    }
}

fn convert_error(error: ureq::Error) -> ScoringError {
    match error {
        ureq::Error::Status(status, _) => ScoringError::Rejected { status },
        ureq::Error::Transport(transport) => ScoringError::Unreachable(transport.to_string()),
    }
}

fn decode<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ScoringError> {
    let body = response
        .into_string()
        .map_err(|error| ScoringError::Unreachable(error.to_string()))?;
    Ok(serde_json::from_str(&body)?)
}

impl ScoringService for HttpScoringClient {
    fn start_run(&self, request: &StartRunRequest) -> Result<StartRunResponse, ScoringError> {
        decode(self.post("/api/run/start", request)?)
    }

    fn finish_run(&self, request: &FinishRunRequest) -> Result<(), ScoringError> {
        let _ = self.post("/api/run/finish", request)?;
        Ok(())
    }

    fn log_visit(&self, request: &VisitRequest) -> Result<(), ScoringError> {
        let _ = self.post("/api/visit", request)?;
        Ok(())
    }

    fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ScoringError> {
        decode(self.get(&format!("/api/leaderboard?limit={limit}"))?)
    }

    fn season(&self) -> Result<SeasonInfo, ScoringError> {
        decode(self.get("/api/season")?)
    }
}
