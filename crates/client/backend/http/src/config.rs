//! HTTP backend configuration.

use std::env;
use std::time::Duration;

use client_backend_core::Endpoint;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid base URL {url:?}: must start with http:// or https://")]
    InvalidBaseUrl { url: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Paths of the combat endpoints, relative to the base URL.
///
/// Exact routes are deployment-specific; these defaults match the reference
/// deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendRoutes {
    pub start: String,
    pub action: String,
    pub end: String,
    pub claim: String,
    pub active_session: String,
}

impl BackendRoutes {
    pub fn path(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Start => &self.start,
            Endpoint::Action => &self.action,
            Endpoint::End => &self.end,
            Endpoint::Claim => &self.claim,
            Endpoint::ActiveSession => &self.active_session,
        }
    }
}

impl Default for BackendRoutes {
    fn default() -> Self {
        Self {
            start: "/combat/start".into(),
            action: "/combat/action".into(),
            end: "/combat/end".into(),
            claim: "/combat/claim".into(),
            active_session: "/combat/active".into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
    pub routes: BackendRoutes,
}

impl HttpBackendConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl { url: base_url });
        }

        Ok(Self {
            base_url,
            bearer_token: None,
            timeout: Self::DEFAULT_TIMEOUT,
            routes: BackendRoutes::default(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `COMBAT_API_URL` - Backend base URL (required)
    /// - `COMBAT_API_TOKEN` - Bearer token for the authenticated player
    /// - `COMBAT_API_TIMEOUT_MS` - Per-request timeout in milliseconds (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("COMBAT_API_URL").map_err(|_| ConfigError::Missing("COMBAT_API_URL"))?;
        let mut config = Self::new(base_url)?;

        config.bearer_token = env::var("COMBAT_API_TOKEN").ok().filter(|t| !t.is_empty());

        if let Some(ms) = env::var("COMBAT_API_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.timeout = Duration::from_millis(ms.max(1));
        }

        Ok(config)
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_routes(mut self, routes: BackendRoutes) -> Self {
        self.routes = routes;
        self
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        let path = self.routes.path(endpoint);
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}
