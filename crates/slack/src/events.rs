use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use police_core::{render, Destination, EmojiChangeEvent, EmojiChangedPayload};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, NoticePublisher};

/// Events API body, as posted to the webhook or carried in a Socket Mode
/// `events_api` envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct EventsApiPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    UrlVerification,
    EventCallback,
    Other(String),
}

impl EventsApiPayload {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn kind(&self) -> PayloadKind {
        match self.payload_type.as_str() {
            "url_verification" => PayloadKind::UrlVerification,
            "event_callback" => PayloadKind::EventCallback,
            other => PayloadKind::Other(other.to_owned()),
        }
    }

    /// Decodes the inner event of a callback. Payloads without one decode as
    /// unsupported.
    pub fn into_event(self) -> SlackEvent {
        match self.event {
            Some(inner) => SlackEvent::from_inner(inner),
            None => SlackEvent::Unsupported { event_type: self.payload_type },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    EmojiChanged(EmojiChangeEvent),
    Invalid { event_type: String, reason: String },
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn from_inner(inner: Value) -> Self {
        let event_type =
            inner.get("type").and_then(Value::as_str).unwrap_or("unknown").to_owned();

        if event_type != "emoji_changed" {
            return Self::Unsupported { event_type };
        }

        let decoded = serde_json::from_value::<EmojiChangedPayload>(inner)
            .map_err(|error| error.to_string())
            .and_then(|payload| {
                EmojiChangeEvent::try_from(payload).map_err(|error| error.to_string())
            });

        match decoded {
            Ok(event) => Self::EmojiChanged(event),
            Err(reason) => Self::Invalid { event_type, reason },
        }
    }

    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::EmojiChanged(_) => SlackEventType::EmojiChanged,
            Self::Invalid { .. } => SlackEventType::Invalid,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    EmojiChanged,
    Invalid,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Published { ts: String },
    Dismissed,
    Ignored,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("notice publish failed: {0}")]
    Publish(#[from] ApiError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            match &envelope.event {
                SlackEvent::Invalid { event_type, reason } => warn!(
                    event_name = "relay.event.invalid",
                    correlation_id = %ctx.correlation_id,
                    event_type = %event_type,
                    reason = %reason,
                    "dismiss: inner event could not be decoded"
                ),
                other => debug!(
                    event_name = "relay.event.dismissed",
                    correlation_id = %ctx.correlation_id,
                    event_type = ?other.event_type(),
                    "dismiss: no handler registered"
                ),
            }
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher used by both transports: emoji changes go to the channel,
/// everything else is dismissed.
pub fn relay_dispatcher(
    publisher: Arc<dyn NoticePublisher>,
    destination: Destination,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(EmojiChangedHandler::new(publisher, destination));
    dispatcher
}

pub struct EmojiChangedHandler {
    publisher: Arc<dyn NoticePublisher>,
    destination: Destination,
}

impl EmojiChangedHandler {
    pub fn new(publisher: Arc<dyn NoticePublisher>, destination: Destination) -> Self {
        Self { publisher, destination }
    }
}

#[async_trait]
impl EventHandler for EmojiChangedHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::EmojiChanged
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::EmojiChanged(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let subtype = event.subtype().as_str();

        if let EmojiChangeEvent::Remove { names } = event {
            if names.len() > 1 {
                // Only the first name reaches the notice; surface the rest.
                warn!(
                    event_name = "relay.emoji.removal_batch",
                    correlation_id = %ctx.correlation_id,
                    rendered = names.first(),
                    unrendered = names.len() - 1,
                    unrendered_names = ?names.iter().skip(1).collect::<Vec<_>>(),
                    "emoji removal carries more names than the notice renders"
                );
            }
        }

        let Some(notice) = render(event) else {
            info!(
                event_name = "relay.emoji.dismissed",
                correlation_id = %ctx.correlation_id,
                event = ?event,
                "dismiss: emoji change has no notice template"
            );
            return Ok(HandlerResult::Dismissed);
        };

        let posted = self.publisher.publish(&self.destination, &notice).await?;
        info!(
            event_name = "relay.emoji.published",
            correlation_id = %ctx.correlation_id,
            emoji_subtype = subtype,
            channel = %posted.channel,
            ts = %posted.ts,
            "emoji notice published"
        );

        Ok(HandlerResult::Published { ts: posted.ts })
    }
}
