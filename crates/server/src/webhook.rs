//! `POST /events-endpoint`: the HTTP transport for Events API deliveries.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use police_core::errors::ApplicationError;
use police_slack::{
    events::{EventContext, EventDispatcher, EventsApiPayload, PayloadKind, SlackEnvelope},
    signature::{RejectionClass, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER},
};
use tracing::{debug, info, warn};

pub const EVENTS_PATH: &str = "/events-endpoint";

#[derive(Clone)]
pub struct WebhookState {
    verifier: Arc<SignatureVerifier>,
    dispatcher: Arc<EventDispatcher>,
}

impl WebhookState {
    pub fn new(verifier: SignatureVerifier, dispatcher: EventDispatcher) -> Self {
        Self { verifier: Arc::new(verifier), dispatcher: Arc::new(dispatcher) }
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route(EVENTS_PATH, post(events_endpoint)).with_state(state)
}

pub async fn events_endpoint(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match handle_delivery(&state, &headers, body).await {
        Ok(response) => response,
        Err(error) => {
            let error = error.into_interface("webhook");
            warn!(
                event_name = "ingress.webhook.rejected",
                correlation_id = error.correlation_id(),
                status = error.status_code(),
                error = %error,
                "rejected events api delivery"
            );
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, error.user_message()).into_response()
        }
    }
}

async fn handle_delivery(
    state: &WebhookState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApplicationError> {
    let body = body.map_err(|rejection| ApplicationError::MalformedRequest(rejection.body_text()))?;

    state
        .verifier
        .verify(
            header_value(headers, TIMESTAMP_HEADER),
            header_value(headers, SIGNATURE_HEADER),
            &body,
        )
        .map_err(|error| match error.rejection_class() {
            RejectionClass::BadRequest => ApplicationError::MalformedRequest(error.to_string()),
            RejectionClass::Unauthorized => ApplicationError::Authentication(error.to_string()),
        })?;

    let payload =
        EventsApiPayload::parse(&body).map_err(|error| ApplicationError::Parse(error.to_string()))?;

    match payload.kind() {
        PayloadKind::UrlVerification => {
            let challenge = payload.challenge.ok_or_else(|| {
                ApplicationError::Parse("url_verification payload has no challenge".to_owned())
            })?;
            info!(
                event_name = "ingress.webhook.url_verified",
                "answered url verification challenge"
            );
            Ok(([(header::CONTENT_TYPE, "text/plain")], challenge).into_response())
        }
        PayloadKind::EventCallback => {
            let correlation_id = payload.event_id.clone().unwrap_or_else(|| "webhook".to_owned());
            let envelope =
                SlackEnvelope { envelope_id: correlation_id.clone(), event: payload.into_event() };
            let context = EventContext { correlation_id };

            // Slack only needs a 200; publish failures stay in the logs.
            if let Err(error) = state.dispatcher.dispatch(&envelope, &context).await {
                warn!(
                    event_name = "relay.emoji.publish_failed",
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "event dispatch failed"
                );
            }
            Ok(StatusCode::OK.into_response())
        }
        PayloadKind::Other(payload_type) => {
            debug!(payload_type = %payload_type, "dismiss: unhandled events api payload type");
            Ok(StatusCode::OK.into_response())
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
