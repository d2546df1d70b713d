//! # Solder Core
//!
//! The dispatch engine of the Solder bot toolkit.
//!
//! This crate turns a raw update stream into concurrent handler work while
//! keeping each conversation coherent. It provides per-actor rate
//! limiting, reply correlation for conversational flows, and a bounded
//! task pool with per-task fault containment, all wired together by a
//! single-consumer event router.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐      ┌─────────────────────────────┐      ┌──────────────┐
//! │ UpdateSource │─────▶│           Router            │─────▶│   TaskPool   │
//! │ (poll/push)  │ mpsc │ classify ▸ admit ▸ correlate│      │ EventHandler │
//! └──────────────┘      └──────────────┬──────────────┘      └──────────────┘
//!                                      │ RateLimiter
//!                                      │ PendingReplies
//! ```
//!
//! The router never awaits handler work: every classified event is either
//! delivered to a handler already waiting on [`PendingReplies`] or
//! submitted to the [`TaskPool`] fire-and-forget. A handler that wants a
//! follow-up message registers with the reply registry and suspends only
//! itself, never the router.
//!
//! ## Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use solder_core::{DispatchConfig, EventHandler, MessageEvent, Router};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl EventHandler for Echo {
//!     async fn handle_message(&self, message: MessageEvent) {
//!         println!("{}: {}", message.chat_id, message.text());
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new(Echo, &DispatchConfig::default());
//!     let (tx, rx) = mpsc::channel(1024);
//!     // Feed `tx` from a transport, then:
//!     let _ = router.run(rx, CancellationToken::new()).await;
//! }
//! ```

pub mod error;
pub mod event;
pub mod handler;
pub mod limiter;
pub mod pool;
pub mod reply;
pub mod router;
pub mod source;

// Re-export the dispatch surface
pub use error::{DispatchError, DispatchResult, SourceError, SourceResult};
pub use event::{
    CallbackEvent, CallbackQuery, Chat, Event, Message, MessageEvent, Update, User, parse_update,
};
pub use handler::{BoxedHandler, EventHandler};
pub use limiter::RateLimiter;
pub use pool::{DEFAULT_WORKERS, PoolStats, TaskPool};
pub use reply::{PendingReplies, ReplyHandle};
pub use router::{DEFAULT_RATE_BURST, DEFAULT_RATE_PER_SEC, DispatchConfig, Router};
pub use source::UpdateSource;

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::{DispatchError, DispatchResult, SourceError, SourceResult};
    pub use super::event::{CallbackEvent, Event, MessageEvent, Update};
    pub use super::handler::{BoxedHandler, EventHandler};
    pub use super::limiter::RateLimiter;
    pub use super::pool::TaskPool;
    pub use super::reply::{PendingReplies, ReplyHandle};
    pub use super::router::{DispatchConfig, Router};
    pub use super::source::UpdateSource;
}
