//! Gateway collaborator contracts.
//!
//! The dispatch core never talks to a chat platform directly. It sees an
//! [`InboundMessage`], answers through a [`ConversationClient`], and hands
//! anything that is not a command to a [`FallbackHandler`]. Platform
//! adapters (e.g. `ivebot-discord`) implement these traits.

pub mod client;
pub mod error;
pub mod gating;
pub mod message;
pub mod payload;

pub use {
    client::{ConversationClient, FallbackHandler, IgnoreFallback},
    error::{Error, Result},
    message::{Author, CapabilitySet, ConversationKind, GuildInfo, InboundMessage},
    payload::{MessageHandle, Payload, RichField, RichPayload},
};
