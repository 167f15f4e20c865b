//! HTTP client for the hosted verification provider's REST API.

use crate::error::ProviderError;
use crate::model::{IdentityProvider, ProviderCreateRequest, ProviderSession, ProviderStatus};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tahaqq_types::ProviderSessionId;

/// Wire shape of a provider verification-session resource.
#[derive(Debug, Deserialize)]
struct SessionPayload {
    id: String,
    url: String,
    status: String,
}

/// REST client for the identity provider.
///
/// Authenticates with a bearer API key; every request carries a bounded
/// timeout so a stalled provider surfaces as [`ProviderError::Unreachable`]
/// instead of hanging a session.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn sessions_url(&self) -> String {
        format!("{}/v1/verification_sessions", self.base_url)
    }

    async fn decode(resp: reqwest::Response, id_hint: &str) -> Result<SessionPayload, ProviderError> {
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::UnknownSession(id_hint.to_string()));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        resp.json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    fn into_session(payload: SessionPayload) -> Result<ProviderSession, ProviderError> {
        Ok(ProviderSession {
            id: ProviderSessionId::new(payload.id),
            hosted_url: payload.url,
            status: ProviderStatus::parse(&payload.status)?,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create_session(
        &self,
        request: &ProviderCreateRequest,
    ) -> Result<ProviderSession, ProviderError> {
        let resp = self
            .client
            .post(self.sessions_url())
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        let payload = Self::decode(resp, "<create>").await?;
        Self::into_session(payload)
    }

    async fn fetch_status(&self, id: &ProviderSessionId) -> Result<ProviderStatus, ProviderError> {
        let url = format!("{}/{}", self.sessions_url(), id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        let payload = Self::decode(resp, id.as_str()).await?;
        ProviderStatus::parse(&payload.status)
    }
}
