//! Client side of the relay contract.
//!
//! Sits between the resolver and the solving service: gates every solve
//! request on the enable flag, and applies the settings mutations carried on
//! the same channel.

use crate::client::SolvingClient;
use crate::settings::SettingsStore;
use crate::transport::SolverTransport;
use async_trait::async_trait;
use capsolv_common::relay::{ChallengePayload, RelayRequest, RelayResponse, SolverRelay};
use tracing::{info, warn};

pub struct CaptchaRelay<T> {
    client: SolvingClient<T>,
    settings: SettingsStore,
}

impl<T: SolverTransport> CaptchaRelay<T> {
    pub fn new(client: SolvingClient<T>, settings: SettingsStore) -> Self {
        Self { client, settings }
    }

    /// Handle one relay request. Settings mutations have no reply.
    pub async fn handle(&self, request: RelayRequest) -> Option<RelayResponse> {
        match request {
            RelayRequest::SolveCaptcha { captcha_data } => {
                Some(SolverRelay::solve(self, captcha_data).await)
            }
            RelayRequest::ToggleExtension { enabled } => {
                self.settings.set_enabled(enabled);
                info!(enabled, "solving toggled");
                None
            }
            RelayRequest::UpdateApiKey { api_key } => {
                self.settings.set_api_key(api_key);
                info!("API key updated");
                None
            }
        }
    }
}

#[async_trait]
impl<T: SolverTransport> SolverRelay for CaptchaRelay<T> {
    async fn solve(&self, payload: ChallengePayload) -> RelayResponse {
        if !self.settings.current().enabled {
            return RelayResponse::error("disabled");
        }
        match self.client.solve(&payload).await {
            Ok(solution) => RelayResponse::Solution { solution },
            Err(e) => {
                warn!(error = %e, "solve request failed");
                RelayResponse::error(e.to_string())
            }
        }
    }
}
