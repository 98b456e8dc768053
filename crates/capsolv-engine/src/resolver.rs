//! Per-image resolution state machine.
//!
//! Detected → AwaitingLoad → Encoding → Submitted → Solving → Filled, with a
//! failure exit from any state. Failures never retry at this layer; the
//! detector logs and drops them. The [`LiveToken`] captured at dispatch is
//! re-checked after every suspension point so a deactivated pipeline stops
//! touching the page.

use crate::PageHandle;
use crate::backend::{PageBackend, PageError, SyntheticEvent};
use crate::gate::LiveToken;
use crate::locator;
use capsolv_common::relay::{ChallengePayload, RelayResponse, SolverRelay};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace, warn};

pub const IMAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay between the focus given to the filled field and the closing blur.
const BLUR_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("image load timed out")]
    LoadTimeout,

    #[error("image failed to load: {0}")]
    LoadError(String),

    #[error("image could not be encoded: {0}")]
    EncodingError(String),

    #[error("solver rejected the challenge: {0}")]
    SolveFailed(String),

    #[error("page operation failed: {0}")]
    Page(#[from] PageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Detected,
    AwaitingLoad,
    Encoding,
    Submitted,
    Solving,
    Filled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Solution delivered into the located field.
    Filled { field: u32, solution: String },
    /// Challenge solved, but no input candidate; solution discarded.
    NoInputFound,
    /// The activation token went stale mid-flight; nothing was touched.
    Skipped,
}

pub struct ChallengeResolver {
    page: PageHandle,
    backend: Arc<dyn PageBackend>,
    relay: Arc<dyn SolverRelay>,
}

impl ChallengeResolver {
    pub fn new(page: PageHandle, backend: Arc<dyn PageBackend>, relay: Arc<dyn SolverRelay>) -> Self {
        Self { page, backend, relay }
    }

    pub async fn resolve(
        &self,
        image: u32,
        token: LiveToken,
    ) -> Result<ResolveOutcome, ResolveError> {
        let result = self.run(image, &token).await;
        if result.is_err() {
            enter(image, ResolutionState::Failed);
        }
        result
    }

    async fn run(
        &self,
        image: u32,
        token: &LiveToken,
    ) -> Result<ResolveOutcome, ResolveError> {
        if !token.is_live() {
            return Ok(ResolveOutcome::Skipped);
        }
        enter(image, ResolutionState::Detected);

        enter(image, ResolutionState::AwaitingLoad);
        match timeout(IMAGE_LOAD_TIMEOUT, self.backend.await_image_load(image)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ResolveError::LoadError(e.to_string())),
            Err(_) => return Err(ResolveError::LoadTimeout),
        }
        if !token.is_live() {
            return Ok(ResolveOutcome::Skipped);
        }

        enter(image, ResolutionState::Encoding);
        let body = self
            .backend
            .encode_image(image)
            .await
            .map_err(|e| ResolveError::EncodingError(e.to_string()))?;
        let payload = ChallengePayload::base64(body);

        enter(image, ResolutionState::Submitted);
        enter(image, ResolutionState::Solving);
        let solution = match self.relay.solve(payload).await {
            RelayResponse::Solution { solution } => solution,
            RelayResponse::Error { error } => return Err(ResolveError::SolveFailed(error)),
        };
        if !token.is_live() {
            return Ok(ResolveOutcome::Skipped);
        }
        debug!(image, solution = %solution, "challenge solved");

        let field = {
            let page = self.page.read().await;
            locator::locate(&page, image)
        };
        let Some(field) = field else {
            warn!(image, "no input candidate for solved challenge, discarding solution");
            return Ok(ResolveOutcome::NoInputFound);
        };

        self.fill(field, &solution).await?;
        enter(image, ResolutionState::Filled);
        Ok(ResolveOutcome::Filled { field, solution })
    }

    /// Write the solution and run the fixed side-effect contract:
    /// input → change → keyup → focus, short delay, blur.
    async fn fill(&self, field: u32, solution: &str) -> Result<(), ResolveError> {
        self.backend.set_value(field, solution).await?;
        for event in [
            SyntheticEvent::Input,
            SyntheticEvent::Change,
            SyntheticEvent::KeyUp,
        ] {
            self.backend.dispatch(field, event).await?;
        }
        self.backend.dispatch(field, SyntheticEvent::Focus).await?;
        sleep(BLUR_DELAY).await;
        self.backend.dispatch(field, SyntheticEvent::Blur).await?;
        Ok(())
    }
}

fn enter(image: u32, state: ResolutionState) {
    trace!(image, ?state, "resolution state");
}
