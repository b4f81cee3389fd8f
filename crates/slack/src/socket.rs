use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::{
    net::TcpStream,
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::{
    api::SlackWebApi,
    events::{
        EventContext, EventDispatcher, EventsApiPayload, PayloadKind, SlackEnvelope, SlackEvent,
    },
};

/// Frames buffered between the socket reader and the consumer loop.
pub const FRAME_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket mode gave up after {attempts} consecutive failures: {last}")]
    RetriesExhausted { attempts: u32, last: TransportError },
}

/// Reconnect policy for consecutive failures. Any established connection
/// resets the count; one the platform closes cleanly is reopened immediately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// `None` retries for the life of the process.
    pub max_retries: Option<u32>,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: None, base_delay_ms: 250, max_delay_ms: 30_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_retries.is_some_and(|max_retries| attempt >= max_retries)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` means the platform closed this connection.
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// Consumes envelopes until the retry policy gives up. With the default
    /// policy this never returns.
    pub async fn start(&self) -> Result<(), SocketError> {
        let mut attempt = 0_u32;

        loop {
            match self.connect_and_pump(&mut attempt).await {
                Ok(()) => {
                    attempt = 0;
                    info!(
                        event_name = "ingress.socket.reconnecting",
                        correlation_id = "socket",
                        "socket mode connection closed by platform; reconnecting"
                    );
                }
                Err(transport_error) => {
                    warn!(
                        event_name = "ingress.socket.connection_error",
                        correlation_id = "socket",
                        attempt,
                        max_retries = ?self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if self.reconnect_policy.exhausted(attempt) {
                        return Err(SocketError::RetriesExhausted {
                            attempts: attempt + 1,
                            last: transport_error,
                        });
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn connect_and_pump(&self, attempt: &mut u32) -> Result<(), TransportError> {
        info!(
            event_name = "ingress.socket.connecting",
            correlation_id = "socket",
            attempt = *attempt,
            "opening socket mode transport connection"
        );
        self.transport.connect().await?;
        info!(
            event_name = "ingress.socket.connected",
            correlation_id = "socket",
            attempt = *attempt,
            "socket mode transport connected"
        );
        *attempt = 0;

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(correlation_id = "socket", "socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    "acknowledged slack envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            if let Err(error) = self.dispatcher.dispatch(&envelope, &context).await {
                warn!(
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "event dispatch failed; continuing socket loop"
                );
            }
        }
    }
}

/// Turns a Socket Mode envelope into the shared event model. Only
/// `events_api` envelopes carrying callbacks produce emoji events.
pub fn decode_envelope(
    envelope_id: String,
    envelope_type: &str,
    payload: Option<Value>,
) -> SlackEnvelope {
    let event = match (envelope_type, payload) {
        ("events_api", Some(payload)) => match serde_json::from_value::<EventsApiPayload>(payload)
        {
            Ok(payload) if payload.kind() == PayloadKind::EventCallback => payload.into_event(),
            Ok(payload) => SlackEvent::Unsupported { event_type: payload.payload_type },
            Err(error) => SlackEvent::Invalid {
                event_type: envelope_type.to_owned(),
                reason: error.to_string(),
            },
        },
        (other, _) => SlackEvent::Unsupported { event_type: other.to_owned() },
    };

    SlackEnvelope { envelope_id, event }
}

#[derive(Debug, Deserialize)]
struct SocketFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    reason: Option<String>,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

struct Connection {
    writer: Arc<Mutex<WsSink>>,
    frames: mpsc::Receiver<Result<SocketFrame, TransportError>>,
    reader: JoinHandle<()>,
}

/// Socket Mode client over `tokio-tungstenite`. Meant to be driven by a
/// single consumer such as [`SocketModeRunner`].
pub struct WebSocketTransport {
    api: SlackWebApi,
    app_token: SecretString,
    connection: Mutex<Option<Connection>>,
}

impl WebSocketTransport {
    pub fn new(api: SlackWebApi, app_token: SecretString) -> Self {
        Self { api, app_token, connection: Mutex::new(None) }
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.disconnect().await?;

        let url = self
            .api
            .apps_connections_open(&self.app_token)
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        let (sink, source) = stream.split();
        let writer = Arc::new(Mutex::new(sink));
        let (frames_tx, frames) = mpsc::channel(FRAME_QUEUE_CAPACITY);
        let reader = tokio::spawn(read_frames(source, writer.clone(), frames_tx));

        *self.connection.lock().await = Some(Connection { writer, frames, reader });
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut connection = self.connection.lock().await;
        let Some(connection) = connection.as_mut() else {
            return Err(TransportError::Receive("socket is not connected".to_owned()));
        };

        loop {
            let Some(frame) = connection.frames.recv().await else {
                return Ok(None);
            };
            let frame = frame?;

            match frame.frame_type.as_str() {
                "hello" => {
                    debug!("socket mode hello received");
                    continue;
                }
                "disconnect" => {
                    info!(
                        reason = frame.reason.as_deref().unwrap_or("unspecified"),
                        "platform requested socket mode disconnect"
                    );
                    return Ok(None);
                }
                _ => {}
            }

            let Some(envelope_id) = frame.envelope_id else {
                debug!(frame_type = %frame.frame_type, "skipping frame without envelope id");
                continue;
            };
            return Ok(Some(decode_envelope(envelope_id, &frame.frame_type, frame.payload)));
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let writer = {
            let connection = self.connection.lock().await;
            let Some(connection) = connection.as_ref() else {
                return Err(TransportError::Acknowledge("socket is not connected".to_owned()));
            };
            connection.writer.clone()
        };

        let ack = serde_json::json!({ "envelope_id": envelope_id }).to_string();
        let mut writer = writer.lock().await;
        writer
            .send(Message::Text(ack))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(connection) = self.connection.lock().await.take() else {
            return Ok(());
        };

        connection.reader.abort();
        // The peer usually closed first; a failed close is not worth surfacing.
        if let Err(error) = connection.writer.lock().await.close().await {
            debug!(error = %error, "socket close after disconnect failed");
        }
        Ok(())
    }
}

async fn read_frames(
    mut source: SplitStream<WsStream>,
    writer: Arc<Mutex<WsSink>>,
    frames: mpsc::Sender<Result<SocketFrame, TransportError>>,
) {
    while let Some(message) = source.next().await {
        let frame = match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<SocketFrame>(&text) {
                Ok(frame) => Ok(frame),
                Err(error) => {
                    debug!(error = %error, "ignoring unparseable socket frame");
                    continue;
                }
            },
            Ok(Message::Ping(data)) => {
                if let Err(error) = writer.lock().await.send(Message::Pong(data)).await {
                    debug!(error = %error, "failed to answer socket ping");
                }
                continue;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(error) => Err(TransportError::Receive(error.to_string())),
        };

        let failed = frame.is_err();
        if frames.send(frame).await.is_err() || failed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use futures_util::{SinkExt, StreamExt};
    use police_core::{Destination, EmojiChangeEvent, RenderedNotice};
    use secrecy::SecretString;
    use tokio::{net::TcpListener, sync::Mutex};
    use tokio_tungstenite::tungstenite::Message;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{
        decode_envelope, ReconnectPolicy, SocketError, SocketModeRunner, SocketTransport,
        TransportError, WebSocketTransport,
    };
    use crate::api::{ApiError, NoticePublisher, PostedMessage, SlackWebApi};
    use crate::events::{relay_dispatcher, EventDispatcher, SlackEnvelope, SlackEvent};

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<SlackEnvelope>, TransportError>>,
        connect_attempts: usize,
        acknowledgements: Vec<String>,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<SlackEnvelope>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    ..ScriptedState::default()
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledgements(&self) -> Vec<String> {
            self.state.lock().await.acknowledgements.clone()
        }

        async fn disconnect_calls(&self) -> usize {
            self.state.lock().await.disconnect_calls
        }
    }

    #[async_trait]
    impl SocketTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state
                .connect_results
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Connect("script exhausted".to_owned())))
        }

        async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.acknowledgements.push(envelope_id.to_owned());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.disconnect_calls += 1;
            Ok(())
        }
    }

    /// Records publish order together with how many acks preceded each one.
    struct OrderingPublisher {
        transport: Arc<ScriptedTransport>,
        published: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl NoticePublisher for OrderingPublisher {
        async fn publish(
            &self,
            destination: &Destination,
            notice: &RenderedNotice,
        ) -> Result<PostedMessage, ApiError> {
            let acks = self.transport.acknowledgements().await.len();
            self.published.lock().await.push((notice.as_str().to_owned(), acks));
            Ok(PostedMessage { channel: destination.channel_id().to_owned(), ts: "1".to_owned() })
        }
    }

    fn emoji_envelope(envelope_id: &str, name: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: envelope_id.to_owned(),
            event: SlackEvent::EmojiChanged(EmojiChangeEvent::Add { name: name.to_owned() }),
        }
    }

    fn bounded(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_retries: Some(max_retries), base_delay_ms: 0, max_delay_ms: 0 }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![
                Ok(Some(SlackEnvelope {
                    envelope_id: "env-1".to_owned(),
                    event: SlackEvent::Unsupported { event_type: "slash_commands".to_owned() },
                })),
                Ok(None),
            ],
        ));

        let runner =
            SocketModeRunner::new(transport.clone(), EventDispatcher::default(), bounded(2));

        let result = runner.start().await;

        assert!(matches!(result, Err(SocketError::RetriesExhausted { attempts: 3, .. })));
        // fail, succeed, then three failures once the script runs dry
        assert_eq!(transport.connect_attempts().await, 5);
        assert_eq!(transport.acknowledgements().await, vec!["env-1"]);
        assert_eq!(transport.disconnect_calls().await, 1);
    }

    #[tokio::test]
    async fn reopens_connection_after_platform_closes_it() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(()), Ok(())],
            vec![
                Ok(Some(emoji_envelope("env-1", "a"))),
                Ok(None),
                Ok(Some(emoji_envelope("env-2", "b"))),
                Ok(None),
            ],
        ));

        let runner =
            SocketModeRunner::new(transport.clone(), EventDispatcher::default(), bounded(0));

        let error = runner.start().await.expect_err("script ends with a connect failure");

        let SocketError::RetriesExhausted { attempts, last } = error;
        assert_eq!(attempts, 1);
        assert_eq!(last, TransportError::Connect("script exhausted".to_owned()));
        assert_eq!(transport.connect_attempts().await, 3);
        assert_eq!(transport.acknowledgements().await, vec!["env-1", "env-2"]);
    }

    #[tokio::test]
    async fn acknowledges_before_dispatching_in_arrival_order() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![
                Ok(Some(emoji_envelope("env-1", "first"))),
                Ok(Some(emoji_envelope("env-2", "second"))),
                Ok(None),
            ],
        ));
        let publisher = Arc::new(OrderingPublisher {
            transport: transport.clone(),
            published: Mutex::default(),
        });

        let runner = SocketModeRunner::new(
            transport.clone(),
            relay_dispatcher(publisher.clone(), Destination::new("C0EMOJI")),
            bounded(0),
        );
        let _ = runner.start().await;

        let published = publisher.published.lock().await.clone();
        assert_eq!(published.len(), 2);
        assert!(published[0].0.contains(":first:"));
        assert_eq!(published[0].1, 1, "first envelope acked before publish");
        assert!(published[1].0.contains(":second:"));
        assert_eq!(published[1].1, 2, "second envelope acked before publish");
    }

    #[tokio::test]
    async fn read_errors_trigger_reconnect() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(()), Ok(())],
            vec![
                Err(TransportError::Receive("connection reset".to_owned())),
                Ok(Some(emoji_envelope("env-after-reset", "x"))),
                Ok(None),
            ],
        ));

        let runner =
            SocketModeRunner::new(transport.clone(), EventDispatcher::default(), bounded(1));
        let _ = runner.start().await;

        assert_eq!(transport.acknowledgements().await, vec!["env-after-reset"]);
    }

    #[tokio::test]
    async fn established_connections_reset_failure_count() {
        let mut envelopes = Vec::new();
        for session in ["s1", "s2", "s3"] {
            envelopes.push(Ok(Some(emoji_envelope(session, session))));
            envelopes.push(Err(TransportError::Receive("connection reset".to_owned())));
        }
        let transport =
            Arc::new(ScriptedTransport::with_script(vec![Ok(()), Ok(()), Ok(())], envelopes));

        let runner =
            SocketModeRunner::new(transport.clone(), EventDispatcher::default(), bounded(1));

        let error = runner.start().await.expect_err("script ends with connect failures");

        let SocketError::RetriesExhausted { attempts, last } = error;
        assert_eq!(attempts, 2);
        assert_eq!(last, TransportError::Connect("script exhausted".to_owned()));
        assert_eq!(transport.acknowledgements().await, vec!["s1", "s2", "s3"]);
        // three healthy sessions, then two failed connects
        assert_eq!(transport.connect_attempts().await, 5);
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = ReconnectPolicy { max_retries: None, base_delay_ms: 100, max_delay_ms: 1_000 };

        assert_eq!(policy.backoff(0).as_millis(), 100);
        assert_eq!(policy.backoff(2).as_millis(), 400);
        assert_eq!(policy.backoff(10).as_millis(), 1_000);
        assert!(!policy.exhausted(u32::MAX));
    }

    #[test]
    fn decodes_events_api_callback_envelopes() {
        let envelope = decode_envelope(
            "env-3".to_owned(),
            "events_api",
            Some(serde_json::json!({
                "type": "event_callback",
                "event": {
                    "type": "emoji_changed",
                    "subtype": "remove",
                    "names": ["ghost"],
                },
            })),
        );

        assert_eq!(envelope.envelope_id, "env-3");
        assert!(matches!(
            envelope.event,
            SlackEvent::EmojiChanged(EmojiChangeEvent::Remove { ref names })
                if names.first() == "ghost"
        ));
    }

    #[test]
    fn non_callback_envelopes_are_unsupported() {
        let envelope = decode_envelope(
            "env-4".to_owned(),
            "slash_commands",
            Some(serde_json::json!({ "command": "/police" })),
        );
        assert_eq!(
            envelope.event,
            SlackEvent::Unsupported { event_type: "slash_commands".to_owned() }
        );

        let rate_limited = decode_envelope(
            "env-6".to_owned(),
            "events_api",
            Some(serde_json::json!({ "type": "app_rate_limited", "minute_rate_limited": 1 })),
        );
        assert_eq!(
            rate_limited.event,
            SlackEvent::Unsupported { event_type: "app_rate_limited".to_owned() }
        );

        let malformed =
            decode_envelope("env-5".to_owned(), "events_api", Some(serde_json::json!([1, 2])));
        assert!(matches!(malformed.event, SlackEvent::Invalid { .. }));
    }

    #[tokio::test]
    async fn websocket_transport_reads_envelopes_and_sends_acks() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let ws_url = format!("ws://{}/link", listener.local_addr().expect("addr"));

        let api_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/apps.connections.open"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "ok": true, "url": ws_url })),
            )
            .mount(&api_server)
            .await;

        let platform = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.expect("accept");
            let mut socket = tokio_tungstenite::accept_async(tcp).await.expect("handshake");
            let envelope = serde_json::json!({
                "type": "events_api",
                "envelope_id": "env-ws-1",
                "accepts_response_payload": false,
                "payload": {
                    "type": "event_callback",
                    "event": { "type": "emoji_changed", "subtype": "add", "name": "pikachu" },
                },
            });

            socket
                .send(Message::Text(r#"{"type":"hello","num_connections":1}"#.to_owned()))
                .await
                .expect("send hello");
            socket.send(Message::Text(envelope.to_string())).await.expect("send envelope");

            let ack = loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => break text,
                    Some(Ok(_)) => continue,
                    other => panic!("expected ack frame, got {other:?}"),
                }
            };

            socket
                .send(Message::Text(
                    r#"{"type":"disconnect","reason":"refresh_requested"}"#.to_owned(),
                ))
                .await
                .expect("send disconnect");
            ack
        });

        let transport = WebSocketTransport::new(
            SlackWebApi::new(SecretString::from("xoxb-test".to_owned()), api_server.uri()),
            SecretString::from("xapp-test".to_owned()),
        );

        transport.connect().await.expect("connect");
        let envelope = transport.next_envelope().await.expect("read").expect("envelope");
        assert_eq!(envelope, emoji_envelope("env-ws-1", "pikachu"));

        transport.acknowledge("env-ws-1").await.expect("ack");
        assert_eq!(transport.next_envelope().await.expect("read"), None);
        transport.disconnect().await.expect("disconnect");

        let ack = platform.await.expect("platform task");
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&ack).expect("ack json"),
            serde_json::json!({ "envelope_id": "env-ws-1" })
        );
    }

    #[tokio::test]
    async fn websocket_transport_requires_connection() {
        let transport = WebSocketTransport::new(
            SlackWebApi::new(SecretString::from("xoxb-test".to_owned()), "http://127.0.0.1:9"),
            SecretString::from("xapp-test".to_owned()),
        );

        assert!(matches!(transport.next_envelope().await, Err(TransportError::Receive(_))));
        assert!(matches!(transport.acknowledge("env").await, Err(TransportError::Acknowledge(_))));
        assert_eq!(transport.disconnect().await, Ok(()));
    }
}
