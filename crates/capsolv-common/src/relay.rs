//! Message contract between the page-side pipeline and the solving client.
//!
//! The resolver never talks to the solving service directly; it sends a
//! `solveCaptcha` request over this boundary and gets back either a solution
//! or an error string. The same channel carries the settings mutations and
//! the enable/disable broadcast consumed by the detector.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Encoded challenge submission: a dispatch-mode tag plus the encoded body
/// and any extra service fields, forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengePayload {
    pub method: String,
    pub body: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ChallengePayload {
    /// Payload for a raw base64 image body (no data-URI prefix).
    pub fn base64(body: impl Into<String>) -> Self {
        Self {
            method: "base64".to_string(),
            body: body.into(),
            extra: BTreeMap::new(),
        }
    }

    /// All payload fields except the reserved dispatch-mode field, in
    /// submission order.
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut out = vec![("body".to_string(), self.body.clone())];
        for (k, v) in &self.extra {
            out.push((k.clone(), v.clone()));
        }
        out
    }
}

/// Requests handled by the solving client side of the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RelayRequest {
    SolveCaptcha {
        #[serde(rename = "captchaData")]
        captcha_data: ChallengePayload,
    },
    ToggleExtension {
        enabled: bool,
    },
    UpdateApiKey {
        #[serde(rename = "apiKey")]
        api_key: String,
    },
}

/// Reply to a `solveCaptcha` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayResponse {
    Solution { solution: String },
    Error { error: String },
}

impl RelayResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

/// Broadcast consumed by the detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlMessage {
    ToggleStateChanged {
        #[serde(rename = "isEnabled")]
        is_enabled: bool,
    },
}

/// The resolver's view of the solving side: one payload in, one reply out.
#[async_trait]
pub trait SolverRelay: Send + Sync {
    async fn solve(&self, payload: ChallengePayload) -> RelayResponse;
}
