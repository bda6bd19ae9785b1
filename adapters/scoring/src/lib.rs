#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Client side of the scoring service that issues run seeds and records results.
//!
//! The simulation never waits on this crate. A host starts a run through
//! [`start_run`], feeds the issued seed into the simulation, and hands the
//! terminal [`RunResult`] to [`submit_result`]. Only the start call reports
//! failures; result submission and visit logging are best effort.

mod http;
pub mod proof;

use std::collections::HashMap;

use pipeline_defence_core::{RunResult, Seed};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use http::HttpScoringClient;

/// Build identifier submitted alongside every result.
pub const DEFAULT_BUILD_HASH: &str = "web-mvp-0.1";
/// Leaderboard size requested when the caller does not choose one.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 100;
/// Largest leaderboard size the service accepts.
pub const MAX_LEADERBOARD_LIMIT: u32 = 200;

/// Errors reported by the scoring service client.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The service could not be reached at all.
    #[error("scoring service unreachable: {0}")]
    Unreachable(String),
    /// The service answered with a non-success status.
    #[error("scoring service rejected the request with status {status}")]
    Rejected {
        /// HTTP status returned by the service.
        status: u16,
    },
    /// The response body did not match the expected shape.
    #[error("malformed scoring service response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The nonce could not be used as an HMAC key.
    #[error("nonce cannot key the result proof")]
    InvalidKey,
}

/// Body of `POST /api/run/start`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRunRequest {
    /// Stable identifier of the playing device.
    pub device_id: String,
    /// Nickname shown on the leaderboard.
    pub nickname: String,
}

/// Response of `POST /api/run/start`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRunResponse {
    /// Identifier of the run on the service.
    pub run_id: String,
    /// Per-run secret that keys the result proof.
    pub nonce: String,
    /// Seed for path generation and wave pacing.
    pub seed: u32,
    /// Season the run counts towards.
    pub season: i64,
}

/// Body of `POST /api/run/finish`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishRunRequest {
    /// Identifier issued by the start call.
    pub run_id: String,
    /// Final score.
    pub score: u32,
    /// Wave reached.
    pub wave: u32,
    /// Run duration in milliseconds, capped at the time limit.
    pub duration_ms: u64,
    /// Identifier of the client build.
    pub build_hash: String,
    /// Lowercase hex HMAC-SHA256 over `"{score}:{wave}:{duration_ms}"`.
    pub proof: String,
}

/// Body of `POST /api/visit`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRequest {
    /// Stable identifier of the visiting device.
    pub device_id: String,
    /// Offset from UTC in minutes, as reported by the client clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz_offset: Option<i32>,
}

/// One row of `GET /api/leaderboard`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player nickname.
    pub nickname: String,
    /// Best score of the player.
    pub score: u32,
    /// Wave reached on that run, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<u32>,
    /// Duration of that run, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Response of `GET /api/season`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonInfo {
    /// Season number.
    pub id: i64,
    /// RFC 3339 timestamp of the season start.
    pub starts_at: String,
    /// RFC 3339 timestamp of the season end.
    pub ends_at: String,
}

/// Operations offered by the scoring service.
pub trait ScoringService {
    /// Opens a run and returns its seed and nonce.
    fn start_run(&self, request: &StartRunRequest) -> Result<StartRunResponse, ScoringError>;

    /// Records the result of a run.
    fn finish_run(&self, request: &FinishRunRequest) -> Result<(), ScoringError>;

    /// Records a visit for analytics.
    fn log_visit(&self, request: &VisitRequest) -> Result<(), ScoringError>;

    /// Fetches up to `limit` leaderboard rows.
    fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ScoringError>;

    /// Fetches the current season window.
    fn season(&self) -> Result<SeasonInfo, ScoringError>;
}

/// Credentials issued for a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunTicket {
    /// Identifier of the run on the service.
    pub run_id: String,
    /// Secret keying the result proof.
    pub nonce: String,
    /// Seed to start the simulation with.
    pub seed: Seed,
    /// Season the run counts towards.
    pub season: i64,
}

impl From<StartRunResponse> for RunTicket {
    fn from(response: StartRunResponse) -> Self {
        Self {
            run_id: response.run_id,
            nonce: response.nonce,
            seed: Seed::new(response.seed),
            season: response.season,
        }
    }
}

impl RunTicket {
    /// Builds the finish request for `result`, signing it with the nonce.
    pub fn finish_request(
        &self,
        result: RunResult,
        build_hash: &str,
    ) -> Result<FinishRunRequest, ScoringError> {
        let proof =
            proof::compute_proof(&self.nonce, result.score, result.wave, result.duration_ms)?;
        Ok(FinishRunRequest {
            run_id: self.run_id.clone(),
            score: result.score,
            wave: result.wave,
            duration_ms: result.duration_ms,
            build_hash: build_hash.to_owned(),
            proof,
        })
    }
}

/// Opens a run. Failures are surfaced since no run can start without a seed.
pub fn start_run<S: ScoringService + ?Sized>(
    service: &S,
    device_id: &str,
    nickname: &str,
) -> Result<RunTicket, ScoringError> {
    let response = service.start_run(&StartRunRequest {
        device_id: device_id.to_owned(),
        nickname: nickname.to_owned(),
    })?;
    debug!(run_id = %response.run_id, seed = response.seed, "run started");
    Ok(RunTicket::from(response))
}

/// Submits a finished run. Failures are logged and reported as `false`.
pub fn submit_result<S: ScoringService + ?Sized>(
    service: &S,
    ticket: &RunTicket,
    result: RunResult,
    build_hash: &str,
) -> bool {
    let outcome = ticket
        .finish_request(result, build_hash)
        .and_then(|request| service.finish_run(&request));
    match outcome {
        Ok(()) => {
            debug!(run_id = %ticket.run_id, score = result.score, "result recorded");
            true
        }
        Err(error) => {
            warn!(run_id = %ticket.run_id, %error, "failed to record run result");
            false
        }
    }
}

/// Sends a visit ping. Failures are logged and reported as `false`.
pub fn log_visit_best_effort<S: ScoringService + ?Sized>(
    service: &S,
    device_id: &str,
    tz_offset: Option<i32>,
) -> bool {
    let request = VisitRequest {
        device_id: device_id.to_owned(),
        tz_offset,
    };
    match service.log_visit(&request) {
        Ok(()) => true,
        Err(error) => {
            warn!(%error, "visit ping failed");
            false
        }
    }
}

/// Clamps a requested leaderboard size into `1..=200`, defaulting to 100.
#[must_use]
pub fn clamp_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT)
}

/// Keeps the best row per nickname, sorted by descending score.
///
/// Equal scores are ordered by nickname so the output is stable.
#[must_use]
pub fn normalize_leaderboard(entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    let mut best: HashMap<String, LeaderboardEntry> = HashMap::with_capacity(entries.len());
    for entry in entries {
        match best.get(&entry.nickname) {
            Some(current) if current.score >= entry.score => {}
            _ => {
                let _ = best.insert(entry.nickname.clone(), entry);
            }
        }
    }

    let mut rows: Vec<LeaderboardEntry> = best.into_values().collect();
    rows.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.nickname.cmp(&b.nickname)));
    rows
}

/// Fetches the leaderboard with a clamped limit and normalised rows.
pub fn fetch_leaderboard<S: ScoringService + ?Sized>(
    service: &S,
    limit: Option<u32>,
) -> Result<Vec<LeaderboardEntry>, ScoringError> {
    let limit = clamp_limit(limit);
    let mut rows = normalize_leaderboard(service.leaderboard(limit)?);
    rows.truncate(limit as usize);
    Ok(rows)
}
