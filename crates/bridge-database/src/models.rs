//! Record types read from the Messages database.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A conversation, grouped by chat ROWID.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub id: i64,
    /// Phone number, email, or group handle.
    pub identifier: String,
    pub guid: String,
    /// Display name, falling back to the identifier when unset.
    pub name: String,
    /// `iMessage` or `SMS`.
    pub service: String,
    pub is_group: bool,
    pub last_message_at: DateTime<Utc>,
}

/// A single message row.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    pub row_id: i64,
    pub chat_id: i64,
    pub guid: String,
    /// GUID of the message this one replies to, when threaded.
    pub reply_to_guid: Option<String>,
    /// Sender handle; empty when the message is from the local user.
    pub sender: String,
    pub text: String,
    pub service: String,
    pub is_from_me: bool,
    pub created_at: DateTime<Utc>,
    pub attachment_count: i64,
}

/// Attachment metadata for a message.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentMeta {
    pub filename: String,
    pub transfer_name: String,
    pub uti: String,
    pub mime_type: String,
    pub total_bytes: i64,
    pub is_sticker: bool,
    /// Tilde-expanded absolute path.
    pub path: String,
    /// The path does not currently resolve to a regular file.
    pub missing: bool,
}

/// A tapback reaction attached to a message.
#[derive(Debug, Clone, Serialize)]
pub struct ReactionRecord {
    pub row_id: i64,
    pub kind: TapbackKind,
    pub emoji: String,
    pub sender: String,
    pub is_from_me: bool,
    pub created_at: DateTime<Utc>,
}

/// Cached chat metadata plus participant handles.
#[derive(Debug, Clone)]
pub struct ChatInfo {
    pub id: i64,
    pub identifier: String,
    pub guid: String,
    pub name: String,
    pub service: String,
    pub is_group: bool,
    pub participants: Vec<String>,
}

/// The typed tapback kinds, plus `Custom` for emoji reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TapbackKind {
    Love,
    Like,
    Dislike,
    Laugh,
    Emphasis,
    Question,
    Custom,
}

impl TapbackKind {
    /// Maps a `message.associated_message_type` add-reaction value.
    ///
    /// 2000–2005 are the six built-in tapbacks; any other value in the
    /// 2000-range is a custom emoji reaction. Returns `None` for rows that
    /// are not reaction adds (removals live in the 3000-range).
    pub fn from_associated_type(value: i64) -> Option<Self> {
        match value {
            2000 => Some(Self::Love),
            2001 => Some(Self::Like),
            2002 => Some(Self::Dislike),
            2003 => Some(Self::Laugh),
            2004 => Some(Self::Emphasis),
            2005 => Some(Self::Question),
            2006..=2999 => Some(Self::Custom),
            _ => None,
        }
    }

    /// Parses a reaction name supplied by a client.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "love" => Some(Self::Love),
            "like" => Some(Self::Like),
            "dislike" => Some(Self::Dislike),
            "laugh" => Some(Self::Laugh),
            "emphasis" => Some(Self::Emphasis),
            "question" => Some(Self::Question),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Love => "love",
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Laugh => "laugh",
            Self::Emphasis => "emphasis",
            Self::Question => "question",
            Self::Custom => "custom",
        }
    }

    /// The glyph Messages shows for the built-in tapbacks.
    pub fn default_emoji(&self) -> &'static str {
        match self {
            Self::Love => "\u{2764}\u{fe0f}",
            Self::Like => "\u{1f44d}",
            Self::Dislike => "\u{1f44e}",
            Self::Laugh => "\u{1f602}",
            Self::Emphasis => "\u{203c}\u{fe0f}",
            Self::Question => "\u{2753}",
            Self::Custom => "",
        }
    }
}
