//! Core domain for the emoji police relay: configuration, the emoji change
//! model, and notice rendering. Nothing here performs I/O beyond reading
//! configuration.

pub mod config;
pub mod emoji;
pub mod errors;
pub mod notice;

pub use config::{AppConfig, ConfigError, TransportMode};
pub use emoji::{EmojiChangeEvent, EmojiChangedPayload, EmojiEventError, RemovedNames};
pub use errors::{ApplicationError, InterfaceError};
pub use notice::{render, Destination, RenderedNotice};
