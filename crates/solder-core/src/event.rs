//! Inbound event model: wire shapes and the classified dispatch union.
//!
//! # Two layers
//!
//! ```text
//! Update { update_id, message?, callback_query? }      (wire, serde)
//!    │
//!    │  Event::classify (actor present, chat id positive)
//!    ▼
//! Event::Message(MessageEvent) | Event::Callback(CallbackEvent)
//! ```
//!
//! The wire layer mirrors what the platform actually sends: both payload
//! branches are optional and either may be missing or half-populated. The
//! classified layer is what dispatch consumes; its invariants (exactly one
//! payload, a known actor, a positive conversation id) are encoded
//! structurally, so downstream code never re-checks them.

use serde::{Deserialize, Serialize};

// ============================================================================
// Wire Types
// ============================================================================

/// One inbound item from the update stream.
///
/// At most one payload branch is populated per update in practice; an update
/// with neither branch is another platform event kind this engine does not
/// route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    /// Monotonically increasing update identifier assigned by the platform.
    pub update_id: i64,
    /// Incoming chat message, if this update carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Interactive callback query, if this update carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
}

/// Message author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Actor ID.
    pub id: i64,
    /// Public handle, when the actor has one.
    #[serde(default)]
    pub username: Option<String>,
}

/// Conversation reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Conversation ID. Positive for direct conversations; reserved ranges
    /// (zero and below) identify broadcast channels this engine ignores.
    pub id: i64,
}

/// An incoming chat message as received on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message ID within the conversation.
    #[serde(default)]
    pub message_id: i64,
    /// Author. Absent for anonymous broadcast posts.
    #[serde(default)]
    pub from: Option<User>,
    /// Conversation the message belongs to.
    pub chat: Chat,
    /// Text content; empty when the message carries only media.
    #[serde(default)]
    pub text: String,
}

impl Message {
    /// Whether the text carries a leading-slash command token.
    pub fn is_command(&self) -> bool {
        self.command().is_some()
    }

    /// The command name, without the `/` prefix and without a trailing
    /// `@botname` mention suffix.
    ///
    /// Returns `None` for plain text, a bare `/`, or `/@mention`.
    pub fn command(&self) -> Option<&str> {
        let rest = self.text.strip_prefix('/')?;
        let token = rest.split(char::is_whitespace).next()?;
        let name = token.split('@').next()?;
        (!name.is_empty()).then_some(name)
    }

    /// Everything after the command token, trimmed. Empty for bare commands
    /// and non-commands.
    pub fn command_args(&self) -> &str {
        if !self.is_command() {
            return "";
        }
        match self.text.split_once(char::is_whitespace) {
            Some((_, args)) => args.trim(),
            None => "",
        }
    }
}

/// An interactive callback query (e.g. an inline keyboard press).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Opaque callback ID used to answer the query.
    pub id: String,
    /// Actor who pressed the control.
    #[serde(default)]
    pub from: Option<User>,
    /// The message the control was attached to. Absent for inline-mode
    /// messages, which have no conversation this engine can route to.
    #[serde(default)]
    pub message: Option<Message>,
    /// Payload attached to the pressed control.
    #[serde(default)]
    pub data: String,
}

/// Parses a raw JSON frame into an [`Update`].
///
/// Convenience for stream sources that receive serialized frames.
pub fn parse_update(raw: &str) -> Result<Update, serde_json::Error> {
    serde_json::from_str(raw)
}

// ============================================================================
// Classified Types
// ============================================================================

/// A chat message that passed classification.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Conversation ID (always positive).
    pub chat_id: i64,
    /// Actor ID of the author.
    pub user_id: i64,
    /// The underlying wire message.
    pub message: Message,
}

impl MessageEvent {
    /// Text content of the message.
    pub fn text(&self) -> &str {
        &self.message.text
    }

    /// Whether the message is a command. See [`Message::is_command`].
    pub fn is_command(&self) -> bool {
        self.message.is_command()
    }

    /// The command name, if any. See [`Message::command`].
    pub fn command(&self) -> Option<&str> {
        self.message.command()
    }

    /// The command arguments. See [`Message::command_args`].
    pub fn command_args(&self) -> &str {
        self.message.command_args()
    }
}

/// A callback query that passed classification.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    /// Conversation of the originating message (always positive).
    pub chat_id: i64,
    /// Actor ID of the presser.
    pub user_id: i64,
    /// Opaque callback ID used to answer the query.
    pub callback_id: String,
    /// ID of the message the control was attached to.
    pub message_id: i64,
    /// Payload attached to the pressed control.
    pub data: String,
}

/// The classified event union consumed by dispatch.
///
/// Exactly one payload per event, matching the tag.
#[derive(Debug, Clone)]
pub enum Event {
    /// An incoming chat message (command or plain text).
    Message(MessageEvent),
    /// An interactive callback query.
    Callback(CallbackEvent),
}

impl Event {
    /// Classifies a wire update into a routable event.
    ///
    /// Returns `None` for updates this engine silently ignores: no payload
    /// branch, no recognizable actor, or a non-positive conversation ID
    /// (reserved broadcast ranges).
    pub fn classify(update: Update) -> Option<Self> {
        if let Some(message) = update.message {
            let from = message.from.as_ref()?;
            if message.chat.id <= 0 {
                return None;
            }
            return Some(Self::Message(MessageEvent {
                chat_id: message.chat.id,
                user_id: from.id,
                message,
            }));
        }

        if let Some(callback) = update.callback_query {
            let from = callback.from?;
            let message = callback.message?;
            if message.chat.id <= 0 {
                return None;
            }
            return Some(Self::Callback(CallbackEvent {
                chat_id: message.chat.id,
                user_id: from.id,
                callback_id: callback.id,
                message_id: message.message_id,
                data: callback.data,
            }));
        }

        None
    }

    /// Actor ID common accessor.
    pub fn user_id(&self) -> i64 {
        match self {
            Self::Message(m) => m.user_id,
            Self::Callback(c) => c.user_id,
        }
    }

    /// Conversation ID common accessor.
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Message(m) => m.chat_id,
            Self::Callback(c) => c.chat_id,
        }
    }

    /// Static label for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Callback(_) => "callback",
        }
    }
}
