//! reqwest-backed combat gateway.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use client_backend_core::{
    ActiveSessionPayload, ClaimRewardsRequest, CombatActionClient, EndCombatRequest, Endpoint,
    StartCombatRequest, StartCombatResponse, SubmitActionRequest, SubmitActionResponse,
};
use combat_core::{CombatError, CombatRewards, CombatSession, TurnResolution};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::classify::{classify_status, classify_transport};
use crate::config::{ConfigError, HttpBackendConfig};

/// Combat backend client speaking JSON over HTTP.
///
/// The bearer token may be rotated at runtime with
/// [`set_bearer_token`](Self::set_bearer_token); in-flight requests keep the
/// token they were sent with.
pub struct HttpCombatClient {
    /// HTTP client with the configured timeout
    http_client: reqwest::Client,

    config: HttpBackendConfig,

    /// Current bearer token, if any
    token: RwLock<Option<String>>,
}

/// Status and raw body of a response.
struct RawResponse {
    status: StatusCode,
    body: String,
}

impl HttpCombatClient {
    pub fn new(config: HttpBackendConfig) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ConfigError::Client)?;

        let token = RwLock::new(config.bearer_token.clone());
        Ok(Self {
            http_client,
            config,
            token,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(HttpBackendConfig::from_env()?)
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    /// Replace the bearer token used for subsequent requests.
    pub fn set_bearer_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sends a request and returns the body of a 2xx response.
    ///
    /// Non-2xx statuses and transport failures are classified here.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: Endpoint,
        body: Option<&B>,
    ) -> Result<RawResponse, CombatError> {
        let raw = self.exchange(method, endpoint, body).await?;
        if !raw.status.is_success() {
            return Err(rejected(endpoint, &raw));
        }
        Ok(raw)
    }

    /// Sends a request and returns the response whatever its status.
    async fn exchange<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: Endpoint,
        body: Option<&B>,
    ) -> Result<RawResponse, CombatError> {
        let url = self.config.url(endpoint);
        tracing::debug!(%endpoint, %method, %url, "Sending combat request");

        let mut request = self.http_client.request(method, &url);
        if let Some(token) = self.bearer_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            tracing::warn!(%endpoint, error = %err, "Combat request failed in transport");
            classify_transport(&err)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| classify_transport(&err))?;

        tracing::debug!(%endpoint, status = status.as_u16(), "Combat response: {}", body);

        Ok(RawResponse { status, body })
    }

    async fn post<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, CombatError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let raw = self.send(Method::POST, endpoint, Some(body)).await?;
        decode(endpoint, &raw.body)
    }
}

fn rejected(endpoint: Endpoint, raw: &RawResponse) -> CombatError {
    let err = classify_status(raw.status.as_u16(), &raw.body);
    tracing::warn!(%endpoint, status = raw.status.as_u16(), error = %err, "Combat backend rejected request");
    err
}

/// A 404 from the combat API itself carries no body or a JSON error body.
/// Anything else is a route or proxy miss and must not read as "no session".
fn is_api_not_found(body: &str) -> bool {
    let body = body.trim();
    body.is_empty() || serde_json::from_str::<serde_json::Value>(body).is_ok()
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, body: &str) -> Result<T, CombatError> {
    serde_json::from_str(body).map_err(|err| {
        tracing::error!(%endpoint, error = %err, "Failed to decode combat response. Raw response: {}", body);
        CombatError::Decoding(format!("{endpoint}: {err}"))
    })
}

#[async_trait]
impl CombatActionClient for HttpCombatClient {
    async fn start_combat(&self, request: &StartCombatRequest) -> Result<CombatSession, CombatError> {
        let response: StartCombatResponse = self.post(Endpoint::Start, request).await?;
        let session = response.into_session(request.location_id.clone());

        tracing::info!(
            session_id = %session.session_id,
            enemy = %session.enemy.name,
            "Combat session started"
        );
        Ok(session)
    }

    async fn submit_action(
        &self,
        request: &SubmitActionRequest,
    ) -> Result<TurnResolution, CombatError> {
        let response: SubmitActionResponse = self.post(Endpoint::Action, request).await?;
        Ok(response.into())
    }

    async fn end_combat(&self, request: &EndCombatRequest) -> Result<(), CombatError> {
        // Acknowledgement body is ignored
        self.send(Method::POST, Endpoint::End, Some(request)).await?;
        Ok(())
    }

    async fn claim_rewards(
        &self,
        request: &ClaimRewardsRequest,
    ) -> Result<CombatRewards, CombatError> {
        self.post(Endpoint::Claim, request).await
    }

    async fn get_active_session(&self) -> Result<Option<CombatSession>, CombatError> {
        let endpoint = Endpoint::ActiveSession;
        let raw = self.exchange::<()>(Method::GET, endpoint, None).await?;

        if raw.status == StatusCode::NOT_FOUND {
            if is_api_not_found(&raw.body) {
                tracing::debug!("No active combat session on the backend");
                return Ok(None);
            }
            tracing::warn!(
                url = %self.config.url(endpoint),
                "Active-session route answered 404 with a non-API body; check COMBAT_API_URL"
            );
            return Err(rejected(endpoint, &raw));
        }
        if !raw.status.is_success() {
            return Err(rejected(endpoint, &raw));
        }

        if raw.status == StatusCode::NO_CONTENT || raw.body.trim().is_empty() {
            return Ok(None);
        }

        let payload: Option<ActiveSessionPayload> = decode(endpoint, &raw.body)?;
        Ok(payload.map(ActiveSessionPayload::into_session))
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}
