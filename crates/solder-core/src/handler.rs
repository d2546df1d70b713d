//! Handler capability interface.
//!
//! The router hands classified events to exactly one of three capability
//! methods, fire-and-forget, inside a pool task. Handlers produce their
//! effects through whatever outbound capabilities they own; nothing flows
//! back to the router.
//!
//! All methods default to no-ops, so an implementor opts into only the
//! event kinds it cares about:
//!
//! ```rust,ignore
//! struct Echo;
//!
//! #[async_trait]
//! impl EventHandler for Echo {
//!     async fn handle_message(&self, message: MessageEvent) {
//!         info!(chat_id = message.chat_id, text = %message.text(), "echo");
//!     }
//! }
//! ```
//!
//! A handler that needs the *next* message from the same actor captures a
//! [`PendingReplies`](crate::reply::PendingReplies) clone at construction and
//! awaits [`ReplyHandle::next`](crate::reply::ReplyHandle::next); only that
//! handler's task suspends.

use std::sync::Arc;

use async_trait::async_trait;

use crate::event::{CallbackEvent, MessageEvent};

/// Receives classified events from the router.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Called for messages whose text carries a command token.
    async fn handle_command(&self, _message: MessageEvent) {}

    /// Called for plain-text messages that no correlation waiter consumed.
    async fn handle_message(&self, _message: MessageEvent) {}

    /// Called for interactive callback queries.
    async fn handle_callback(&self, _callback: CallbackEvent) {}
}

/// A shared, type-erased event handler.
pub type BoxedHandler = Arc<dyn EventHandler>;
