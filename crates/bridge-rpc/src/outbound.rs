//! Outbound collaborator seams: message sending and contact lookup.
//!
//! The real implementations drive macOS automation and live in the binary
//! crate; handlers and tests only see these traits. Both are blocking and
//! are invoked under `spawn_blocking`, so a slow send stalls its own
//! request and nothing else.

use bridge_database::TapbackKind;
use serde::Serialize;
use thiserror::Error;

/// Delivery service selector for outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Auto,
    IMessage,
    Sms,
}

impl ServiceKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "auto" => Some(Self::Auto),
            "imessage" => Some(Self::IMessage),
            "sms" => Some(Self::Sms),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::IMessage => "imessage",
            Self::Sms => "sms",
        }
    }
}

/// A fully resolved outbound message. Exactly one of `to` or the chat
/// target pair is set by the time this reaches a sender.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Direct recipient handle.
    pub to: Option<String>,
    pub chat_identifier: Option<String>,
    pub chat_guid: Option<String>,
    pub text: String,
    /// Absolute path of a file to attach.
    pub file: Option<String>,
    pub service: ServiceKind,
    /// Region for phone-number normalisation.
    pub region: String,
}

/// What a client asked to react with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionInput {
    Tapback(TapbackKind),
    Custom(String),
}

impl ReactionInput {
    /// A known tapback name, or any other non-empty string as a custom
    /// emoji.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(kind) = TapbackKind::from_name(raw) {
            return Some(Self::Tapback(kind));
        }
        if raw.is_empty() {
            None
        } else {
            Some(Self::Custom(raw.to_string()))
        }
    }
}

/// A fully resolved outbound reaction.
#[derive(Debug, Clone)]
pub struct ReactionOptions {
    pub message_guid: String,
    pub reaction: ReactionInput,
    pub chat_identifier: Option<String>,
    pub chat_guid: Option<String>,
    /// Text of the target message, when the store had it handy.
    pub message_preview: Option<String>,
}

/// Sender failure, classified for JSON-RPC codes.
#[derive(Error, Debug)]
pub enum SendError {
    /// The recipient/chat target or payload is semantically invalid;
    /// surfaces as invalid-params.
    #[error("{0}")]
    InvalidTarget(String),

    /// The platform automation failed; surfaces as internal.
    #[error("{0}")]
    Automation(String),
}

/// Contact lookup failure.
#[derive(Error, Debug)]
pub enum ContactsError {
    /// The contact store denied access. Handlers degrade this to an empty
    /// result plus a warning, never an RPC error.
    #[error("contacts access not authorized")]
    Unauthorized,

    /// Any other lookup failure; surfaces as internal.
    #[error("{0}")]
    Lookup(String),
}

/// One person matched by a contact search.
#[derive(Debug, Clone, Serialize)]
pub struct ContactMatch {
    pub name: String,
    pub handles: Vec<String>,
}

/// A handle resolved back to a display name.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedHandle {
    pub handle: String,
    pub name: Option<String>,
}

/// Dispatches outgoing messages and reactions.
pub trait MessageSender: Send + Sync {
    fn send(&self, options: &SendOptions) -> Result<(), SendError>;
    fn send_reaction(&self, options: &ReactionOptions) -> Result<(), SendError>;
}

/// Looks up people in the OS address book.
pub trait ContactsProvider: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<ContactMatch>, ContactsError>;
    fn resolve(&self, handles: &[String]) -> Result<Vec<ResolvedHandle>, ContactsError>;
}
