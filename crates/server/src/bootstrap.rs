use std::sync::Arc;

use police_core::config::AppConfig;
use police_slack::{
    api::{NoticePublisher, SlackWebApi},
    events::{relay_dispatcher, EventDispatcher},
    signature::SignatureVerifier,
    socket::{ReconnectPolicy, SocketModeRunner, WebSocketTransport},
};
use thiserror::Error;
use tracing::info;

use crate::webhook::WebhookState;

pub struct Application {
    pub config: AppConfig,
    pub publisher: Arc<SlackWebApi>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("`{0}` is not configured")]
    MissingCredential(&'static str),
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    let publisher = Arc::new(SlackWebApi::new(
        config.slack.bot_token.clone(),
        config.slack.api_base_url.clone(),
    ));
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        transport_mode = config.slack.transport.as_str(),
        channel = %config.destination(),
        api_base_url = publisher.base_url(),
        "slack web api client initialized"
    );

    Application { config, publisher }
}

impl Application {
    pub fn dispatcher(&self) -> EventDispatcher {
        let publisher: Arc<dyn NoticePublisher> = self.publisher.clone();
        relay_dispatcher(publisher, self.config.destination())
    }

    pub fn webhook_state(&self) -> Result<WebhookState, BootstrapError> {
        let signing_secret = self
            .config
            .slack
            .signing_secret
            .clone()
            .ok_or(BootstrapError::MissingCredential("slack.signing_secret"))?;

        Ok(WebhookState::new(SignatureVerifier::new(signing_secret), self.dispatcher()))
    }

    pub fn socket_runner(&self) -> Result<SocketModeRunner, BootstrapError> {
        let app_token = self
            .config
            .slack
            .app_token
            .clone()
            .ok_or(BootstrapError::MissingCredential("slack.app_token"))?;
        let transport = WebSocketTransport::new(self.publisher.as_ref().clone(), app_token);

        Ok(SocketModeRunner::new(
            Arc::new(transport),
            self.dispatcher(),
            ReconnectPolicy::default(),
        ))
    }
}
