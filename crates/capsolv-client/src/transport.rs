//! HTTP transport for the solving service.
//!
//! The service exposes two endpoints: an intake POST taking a multipart
//! form, and a result GET polled by id. Both answer the same JSON envelope.
//! The trait seam exists so the client logic can be exercised against
//! recording mocks.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_SERVICE_URL: &str = "https://2captcha.com";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),
}

/// JSON envelope both service endpoints answer with. `request` carries the
/// job id (intake) or the solution text (result) when `status` is 1.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceResponse {
    pub status: i32,
    #[serde(default)]
    pub request: String,
    #[serde(default)]
    pub error_text: Option<String>,
}

impl ServiceResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 1
    }
}

#[async_trait]
pub trait SolverTransport: Send + Sync {
    /// POST the intake form fields.
    async fn submit(&self, fields: Vec<(String, String)>)
    -> Result<ServiceResponse, TransportError>;

    /// GET the result endpoint with the given query parameters.
    async fn fetch_result(
        &self,
        query: Vec<(String, String)>,
    ) -> Result<ServiceResponse, TransportError>;
}

#[async_trait]
impl<T: SolverTransport + ?Sized> SolverTransport for std::sync::Arc<T> {
    async fn submit(
        &self,
        fields: Vec<(String, String)>,
    ) -> Result<ServiceResponse, TransportError> {
        (**self).submit(fields).await
    }

    async fn fetch_result(
        &self,
        query: Vec<(String, String)>,
    ) -> Result<ServiceResponse, TransportError> {
        (**self).fetch_result(query).await
    }
}

pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_SERVICE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SolverTransport for HttpTransport {
    async fn submit(
        &self,
        fields: Vec<(String, String)>,
    ) -> Result<ServiceResponse, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        let response = self
            .client
            .post(format!("{}/in.php", self.base_url))
            .multipart(form)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    async fn fetch_result(
        &self,
        query: Vec<(String, String)>,
    ) -> Result<ServiceResponse, TransportError> {
        let response = self
            .client
            .get(format!("{}/res.php", self.base_url))
            .query(&query)
            .send()
            .await?;
        Ok(response.json().await?)
    }
}
