use std::time::{Duration, Instant};

use {
    anyhow::Context as _,
    reqwest::{Client, StatusCode},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tokio::sync::RwLock,
    tracing::{debug, warn},
};

use voxbi_config::AnalyticsConfig;

/// Refresh the token this long before the engine says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Typed errors from the analytics engine boundary.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// The engine rejected the query itself (bad syntax, unknown field).
    /// This is fed back into the model conversation, never to the user.
    #[error("query rejected: {0}")]
    Query(String),
    /// The token exchange failed.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Transport-level failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    valid_until: Instant,
}

/// Client for the external analytics query engine.
pub struct AnalyticsClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: Option<Secret<String>>,
    token: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for AnalyticsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsClient")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<String>,
}

impl AnalyticsClient {
    /// Build a client from config. The HTTP timeout applies per request.
    pub fn from_config(config: &AnalyticsConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("failed to build analytics HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: RwLock::new(None),
        })
    }

    /// Exchange client credentials for a bearer token.
    async fn authenticate(&self) -> Result<String, AnalyticsError> {
        let secret = self
            .client_secret
            .as_ref()
            .ok_or_else(|| AnalyticsError::Auth("client secret not configured".into()))?;

        debug!(client_id = %self.client_id, "exchanging analytics credentials");

        let response = self
            .http
            .post(format!("{}/auth/token", self.base_url))
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": secret.expose_secret(),
                "grant_type": "client_credentials",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Auth(format!("HTTP {status}: {body}")));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| AnalyticsError::Auth(format!("malformed token response: {e}")))?;

        let ttl = Duration::from_secs(payload.expires_in.unwrap_or(300));
        let valid_until = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_MARGIN);
        *self.token.write().await = Some(CachedToken {
            token: payload.access_token.clone(),
            valid_until,
        });

        Ok(payload.access_token)
    }

    async fn bearer_token(&self) -> Result<String, AnalyticsError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.valid_until > Instant::now() {
                    return Ok(token.token.clone());
                }
            }
        }
        self.authenticate().await
    }

    /// Execute one analytical query scoped to a (connection, dataset) pair.
    ///
    /// Returns the result rows, or [`AnalyticsError::Query`] with the
    /// engine's own message when the query was rejected.
    pub async fn execute_query(
        &self,
        connection_id: &str,
        dataset_id: &str,
        query: &str,
    ) -> Result<Vec<serde_json::Value>, AnalyticsError> {
        let mut token = self.bearer_token().await?;

        for attempt in 0..2 {
            let response = self
                .http
                .post(format!("{}/query", self.base_url))
                .bearer_auth(&token)
                .json(&serde_json::json!({
                    "connection_id": connection_id,
                    "dataset_id": dataset_id,
                    "query": query,
                }))
                .send()
                .await?;

            // An expired token gets one refresh-and-retry.
            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!("analytics token rejected, refreshing");
                *self.token.write().await = None;
                token = self.authenticate().await?;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AnalyticsError::Query(format!("HTTP {status}: {body}")));
            }

            let payload: QueryResponse = response
                .json()
                .await
                .map_err(|e| AnalyticsError::Query(format!("malformed response: {e}")))?;

            if let Some(error) = payload.error {
                return Err(AnalyticsError::Query(error));
            }
            return Ok(payload.rows.unwrap_or_default());
        }

        Err(AnalyticsError::Auth("token refresh loop exhausted".into()))
    }
}
