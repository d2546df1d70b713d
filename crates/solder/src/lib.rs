//! # Solder
//!
//! An async dispatch framework for chat updates, with per-user rate
//! limiting and conversational replies.
//!
//! ## Overview
//!
//! Solder is designed around a single rule: the event loop never waits
//! for handler work. Updates flow from a source through a lightweight
//! router that classifies, rate-limits, and correlates them, then hands
//! each event to a bounded task pool. Handlers that need a follow-up
//! message from the same user suspend themselves on a reply registry
//! instead of blocking the loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌──────────────────────────────────────┐
//! │ UpdateSource │────▶│   Router   │────▶│ TaskPool (bounded, panic-contained)  │
//! │ (poll/push)  │     │            │     │   EventHandler::handle_command       │
//! └──────────────┘     │  classify  │     │   EventHandler::handle_message       │
//!                      │  admit     │     │   EventHandler::handle_callback      │
//!                      │  correlate │     └──────────────────────────────────────┘
//!                      └─────┬──────┘
//!                            │ direct delivery
//!                            ▼
//!                      PendingReplies ──▶ handler awaiting a follow-up
//! ```
//!
//! - **Runtime**: Loads config, initializes logging, wires source to router
//! - **Sources**: Update producers (long polling, webhooks, test scripts)
//! - **Router**: Single consumer; classifies, rate-limits, correlates, submits
//! - **Handlers**: User-defined async hooks for commands, messages, callbacks
//! - **Replies**: Per-conversation registry for ask-and-wait flows
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use solder::prelude::*;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl EventHandler for Echo {
//!     async fn handle_message(&self, message: MessageEvent) {
//!         info!(chat = message.chat_id, "{}", message.text());
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> solder::runtime::RuntimeResult<()> {
//!     Runtime::new()
//!         .with_source(my_source)
//!         .with_handler(Echo)
//!         .run()
//!         .await
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON-formatted log output

pub use solder_core as core;
pub use solder_runtime as runtime;

/// Prelude module for convenient imports.
///
/// This module provides all commonly used types for building dispatch
/// applications:
///
/// ```rust,ignore
/// use solder::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use solder_runtime::{Runtime, RuntimeBuilder};

    // Handler trait - primary unit of event handling
    pub use solder_core::{BoxedHandler, EventHandler};

    // Event types - for writing handler hooks
    pub use solder_core::{CallbackEvent, Event, MessageEvent, Update};

    // Source trait - for feeding updates in
    pub use solder_core::UpdateSource;

    // Conversational replies - ask-and-wait flows
    pub use solder_core::{PendingReplies, ReplyHandle};

    // Dispatch plumbing - for embedding the router directly
    pub use solder_core::{DispatchConfig, RateLimiter, Router, TaskPool};

    // Errors
    pub use solder_core::{DispatchError, DispatchResult, SourceError, SourceResult};
    pub use solder_runtime::{RuntimeError, RuntimeResult};

    // Logging macros
    pub use solder_runtime::prelude::{Level, debug, error, info, instrument, span, trace, warn};
}
