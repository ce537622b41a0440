//! HTTP client for the task backend
//!
//! Implements [`ChatTransport`] over the REST API and exposes JSON helpers
//! used by the store client. Requests carry a bearer token; a 401 triggers a
//! single token refresh and replay when a refresh token is configured.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::extract_error_message;
use super::types::{ChatHistory, ChatList};
use super::{ApiError, AssistReply, AssistRequest, ChatId, ChatMessage, ChatSummary, ChatTransport};
use crate::config::ApiConfig;

/// Maximum number of retries for transient errors on idempotent requests
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 500;

const ASSIST_PATH: &str = "/tasks/ai/assist/";
const CHATS_PATH: &str = "/tasks/ai/chats/";
const TOKEN_REFRESH_PATH: &str = "/auth/token/refresh/";

/// Bearer credentials shared by every request of a client
struct Credentials {
    access: RwLock<String>,
    refresh: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Backend API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    credentials: Arc<Credentials>,
}

impl ApiClient {
    /// Create a client with explicit credentials
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, ?timeout, has_refresh = refresh_token.is_some(), "ApiClient::new: called");

        let http = Client::builder().timeout(timeout).build().map_err(ApiError::Network)?;

        Ok(Self {
            base_url,
            http,
            credentials: Arc::new(Credentials {
                access: RwLock::new(access_token.into()),
                refresh: refresh_token,
            }),
        })
    }

    /// Create a client from configuration, reading tokens from the environment
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        debug!(?config, "from_config: called");
        let access = config.access_token()?;
        let refresh = config.refresh_token();

        Self::new(
            config.base_url.clone(),
            access,
            refresh,
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a JSON document, retrying transient failures
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(%path, "get_json: called");
        self.execute(Method::GET, path, None, true).await
    }

    /// POST a JSON body without automatic retries
    ///
    /// POSTs may mutate state on the backend, so a transient failure is
    /// reported to the caller instead of being replayed.
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ApiError> {
        debug!(%path, "post_json: called");
        self.execute(Method::POST, path, Some(body), false).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        idempotent: bool,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let max_retries = if idempotent { MAX_RETRIES } else { 0 };
        let mut attempt = 0;
        let mut refreshed = false;

        loop {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, %path, "execute: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let token = self.credentials.access.read().await.clone();
            let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    let err = ApiError::Network(e);
                    if err.is_retryable() && attempt < max_retries {
                        debug!(attempt, error = %err, "execute: network error");
                        attempt += 1;
                        continue;
                    }
                    debug!(error = %err, "execute: network error, giving up");
                    return Err(err);
                }
            };

            let status = response.status().as_u16();

            // A 401 means the request was rejected before the backend acted on
            // it, so replaying it once with a fresh token is safe for POSTs too.
            if status == 401 && !refreshed && self.credentials.refresh.is_some() {
                debug!("execute: unauthorized, refreshing access token");
                refreshed = true;
                self.refresh_access_token().await?;
                continue;
            }

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                let message = extract_error_message(&text);
                let err = if status == 401 {
                    ApiError::Unauthorized(message)
                } else {
                    ApiError::Api { status, message }
                };
                if err.is_retryable() && attempt < max_retries {
                    debug!(attempt, status, "execute: retryable status");
                    attempt += 1;
                    continue;
                }
                debug!(status, error = %err, "execute: API error");
                return Err(err);
            }

            let text = response.text().await?;
            debug!(status, bytes = text.len(), "execute: success");
            return serde_json::from_str(&text).map_err(|e| {
                debug!(error = %e, "execute: failed to decode body");
                ApiError::InvalidResponse(format!("{} {}: {}", method, path, e))
            });
        }
    }

    /// Exchange the refresh token for a new access token
    async fn refresh_access_token(&self) -> Result<(), ApiError> {
        debug!("refresh_access_token: called");
        let Some(refresh) = self.credentials.refresh.as_ref() else {
            return Err(ApiError::Unauthorized("no refresh token configured".to_string()));
        };

        #[derive(Deserialize)]
        struct Refreshed {
            access: String,
        }

        let response = self
            .http
            .post(self.url(TOKEN_REFRESH_PATH))
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            warn!(status, "refresh_access_token: refresh rejected");
            return Err(ApiError::Unauthorized(extract_error_message(&text)));
        }

        let refreshed: Refreshed = response.json().await?;
        *self.credentials.access.write().await = refreshed.access;
        info!("Access token refreshed");
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for ApiClient {
    async fn send_message(&self, request: AssistRequest) -> Result<AssistReply, ApiError> {
        debug!(confirm = request.confirm, chat_id = ?request.chat_id, "send_message: called");
        let body = serde_json::to_value(&request)?;
        self.post_json(ASSIST_PATH, &body).await
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ApiError> {
        debug!("list_chats: called");
        let list: ChatList = self.get_json(CHATS_PATH).await?;
        Ok(list.chats)
    }

    async fn get_chat_messages(&self, chat_id: ChatId) -> Result<Vec<ChatMessage>, ApiError> {
        debug!(%chat_id, "get_chat_messages: called");
        let history: ChatHistory = self.get_json(&format!("{}{}/", CHATS_PATH, chat_id)).await?;
        Ok(history.messages)
    }
}
