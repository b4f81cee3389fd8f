//! Slack integration for the emoji police relay
//!
//! - **Events** (`events`) - Events API payloads, the event model and the dispatcher
//! - **Signing** (`signature`) - `X-Slack-Signature` v0 verification for the webhook
//! - **Web API** (`api`) - `chat.postMessage` and `apps.connections.open`
//! - **Socket Mode** (`socket`) - WebSocket transport with reconnection logic
//!
//! # Architecture
//!
//! ```text
//! webhook ──┐
//!           ├→ SlackEnvelope → EventDispatcher → EmojiChangedHandler → chat.postMessage
//! socket  ──┘
//! ```
//!
//! # Key Types
//!
//! - `SocketModeRunner` - WebSocket event loop with reconnection logic
//! - `EventDispatcher` - Routes events to appropriate handlers
//! - `SignatureVerifier` - Authenticates webhook deliveries
//! - `NoticePublisher` - Trait for posting rendered notices

pub mod api;
pub mod events;
pub mod signature;
pub mod socket;
