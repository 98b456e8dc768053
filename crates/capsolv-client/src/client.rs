//! Submit/poll client for the solving service.
//!
//! One challenge payload becomes one [`SolveJob`]: submitted once, then
//! polled at a fixed interval until the service answers, rejects, or the
//! attempt budget runs out. The interval is fixed on purpose, matching the
//! service's recommended cadence; there is no backoff and no retry above the
//! poll bound.

use crate::settings::SettingsStore;
use crate::transport::{SolverTransport, TransportError};
use capsolv_common::relay::ChallengePayload;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

pub const MAX_POLL_ATTEMPTS: u32 = 30;
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Service reply meaning "keep polling".
pub const NOT_READY_SENTINEL: &str = "CAPCHA_NOT_READY";

/// Dispatch mode used when the payload does not carry one.
const DEFAULT_METHOD: &str = "post";

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("solve rejected: {0}")]
    SolveRejected(String),

    #[error("challenge solving timed out")]
    SolveTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Solved,
    Failed,
    TimedOut,
}

/// One outstanding request against the service. Created on successful
/// submission, mutated only by the poll loop, dropped at a terminal state.
#[derive(Debug)]
pub struct SolveJob {
    pub id: String,
    pub created_at: Instant,
    pub attempts: u32,
    pub state: JobState,
}

impl SolveJob {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Instant::now(),
            attempts: 0,
            state: JobState::Pending,
        }
    }
}

pub struct SolvingClient<T> {
    transport: T,
    settings: SettingsStore,
}

impl<T: SolverTransport> SolvingClient<T> {
    pub fn new(transport: T, settings: SettingsStore) -> Self {
        Self {
            transport,
            settings,
        }
    }

    fn api_key(&self) -> Result<String, SolveError> {
        self.settings
            .current()
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or(SolveError::MissingCredential)
    }

    /// Submit a payload to the intake endpoint; returns the service-assigned
    /// job id. Every payload field except the dispatch-mode field is
    /// forwarded verbatim.
    pub async fn submit(&self, payload: &ChallengePayload) -> Result<String, SolveError> {
        let key = self.api_key()?;
        let method = if payload.method.is_empty() {
            DEFAULT_METHOD.to_string()
        } else {
            payload.method.clone()
        };

        let mut fields = vec![
            ("key".to_string(), key),
            ("method".to_string(), method),
            ("json".to_string(), "1".to_string()),
        ];
        fields.extend(payload.fields());

        let response = self.transport.submit(fields).await?;
        if response.is_ok() {
            debug!(job = %response.request, "challenge submitted");
            Ok(response.request)
        } else {
            Err(SolveError::SubmissionRejected(
                response
                    .error_text
                    .unwrap_or_else(|| "failed to submit captcha".to_string()),
            ))
        }
    }

    /// Poll the result endpoint until the job reaches a terminal state.
    /// Bounded to [`MAX_POLL_ATTEMPTS`] queries with [`POLL_INTERVAL`]
    /// between them.
    pub async fn poll(&self, job_id: &str) -> Result<String, SolveError> {
        let key = self.api_key()?;
        let mut job = SolveJob::new(job_id);

        while job.attempts < MAX_POLL_ATTEMPTS {
            job.attempts += 1;
            let query = vec![
                ("key".to_string(), key.clone()),
                ("action".to_string(), "get".to_string()),
                ("id".to_string(), job.id.clone()),
                ("json".to_string(), "1".to_string()),
            ];
            let response = self.transport.fetch_result(query).await?;

            if response.is_ok() {
                job.state = JobState::Solved;
                debug!(
                    job = %job.id,
                    attempts = job.attempts,
                    elapsed_s = job.created_at.elapsed().as_secs(),
                    "challenge solved"
                );
                return Ok(response.request);
            }

            match response.error_text.as_deref() {
                Some(NOT_READY_SENTINEL) => {
                    if job.attempts < MAX_POLL_ATTEMPTS {
                        sleep(POLL_INTERVAL).await;
                    }
                }
                other => {
                    job.state = JobState::Failed;
                    return Err(SolveError::SolveRejected(
                        other
                            .unwrap_or("failed to get captcha result")
                            .to_string(),
                    ));
                }
            }
        }

        job.state = JobState::TimedOut;
        Err(SolveError::SolveTimeout)
    }

    /// Submit then poll; either stage's failure propagates unchanged.
    pub async fn solve(&self, payload: &ChallengePayload) -> Result<String, SolveError> {
        info!("submitting challenge to solving service");
        let job_id = self.submit(payload).await?;
        info!(job = %job_id, "waiting for solution");
        self.poll(&job_id).await
    }
}
