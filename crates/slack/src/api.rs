//! Slack Web API client for the two calls the relay makes:
//! `chat.postMessage` and `apps.connections.open`.

use async_trait::async_trait;
use police_core::{Destination, RenderedNotice};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("slack api request failed: {0}")]
    Http(String),
    #[error("slack api `{method}` returned error `{error}`")]
    Api { method: &'static str, error: String },
    #[error("slack api `{method}` response is missing `{field}`")]
    MissingField { method: &'static str, field: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

/// Sends rendered notices to their destination channel.
#[async_trait]
pub trait NoticePublisher: Send + Sync {
    async fn publish(
        &self,
        destination: &Destination,
        notice: &RenderedNotice,
    ) -> Result<PostedMessage, ApiError>;
}

#[derive(Debug, Deserialize)]
struct ChatPostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SlackWebApi {
    http: Client,
    bot_token: SecretString,
    base_url: String,
}

impl SlackWebApi {
    pub fn new(bot_token: SecretString, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http: Client::new(), bot_token, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat_post_message(
        &self,
        channel: &str,
        text: &str,
    ) -> Result<PostedMessage, ApiError> {
        const METHOD: &str = "chat.postMessage";
        let url = format!("{}/{METHOD}", self.base_url);
        let body = serde_json::json!({ "channel": channel, "text": text });

        debug!(channel = %channel, "posting message");

        let response: ChatPostMessageResponse = self
            .http
            .post(&url)
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| ApiError::Http(error.to_string()))?
            .json()
            .await
            .map_err(|error| ApiError::Http(error.to_string()))?;

        if !response.ok {
            let error = response.error.unwrap_or_else(|| "unknown_error".to_owned());
            return Err(ApiError::Api { method: METHOD, error });
        }

        let ts = response.ts.ok_or(ApiError::MissingField { method: METHOD, field: "ts" })?;
        Ok(PostedMessage { channel: response.channel.unwrap_or_else(|| channel.to_owned()), ts })
    }

    /// Requests a Socket Mode WebSocket URL. Needs the app-level token, not
    /// the bot token.
    pub async fn apps_connections_open(
        &self,
        app_token: &SecretString,
    ) -> Result<String, ApiError> {
        const METHOD: &str = "apps.connections.open";
        let url = format!("{}/{METHOD}", self.base_url);

        debug!("calling apps.connections.open");

        let response: ConnectionsOpenResponse = self
            .http
            .post(&url)
            .bearer_auth(app_token.expose_secret())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await
            .map_err(|error| ApiError::Http(error.to_string()))?
            .json()
            .await
            .map_err(|error| ApiError::Http(error.to_string()))?;

        if !response.ok {
            let error = response.error.unwrap_or_else(|| "unknown_error".to_owned());
            return Err(ApiError::Api { method: METHOD, error });
        }

        response.url.ok_or(ApiError::MissingField { method: METHOD, field: "url" })
    }
}

#[async_trait]
impl NoticePublisher for SlackWebApi {
    async fn publish(
        &self,
        destination: &Destination,
        notice: &RenderedNotice,
    ) -> Result<PostedMessage, ApiError> {
        self.chat_post_message(destination.channel_id(), notice.as_str()).await
    }
}
