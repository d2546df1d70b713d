//! Ping-Pong Demo
//!
//! A scripted conversation that exercises the whole Solder pipeline
//! without a network transport: commands, plain messages, callbacks, and
//! a conversational follow-up with a timeout.
//!
//! # Script
//!
//! ```text
//! user: /ping          -> handler logs "pong"
//! user: hello there    -> handler echoes the text
//! user: /guess         -> handler asks for a number and awaits the reply
//! user: 7              -> delivered straight to the awaiting handler
//! user: [callback]     -> handler acknowledges the button press
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package pingpong
//! ```

use std::time::Duration;

use async_trait::async_trait;
use solder::core::{CallbackQuery, Chat, Message, User};
use solder::prelude::*;
use solder::runtime::SolderConfig;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Chat and user the whole script plays out in.
const CHAT_ID: i64 = 100;
const USER_ID: i64 = 42;

/// Pause between scripted updates so the log reads like a conversation.
const PACE: Duration = Duration::from_millis(250);

// ============================================================================
// Update Source
// ============================================================================

/// Feeds a fixed list of updates into the pipeline, one every [`PACE`].
///
/// A real deployment would long-poll or accept webhooks here; the trait
/// contract is the same either way.
struct ScriptedSource {
    script: Vec<Update>,
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn run(
        self: Box<Self>,
        updates: mpsc::Sender<Update>,
        shutdown: CancellationToken,
    ) -> SourceResult<()> {
        for update in self.script {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(PACE) => {}
            }
            if updates.send(update).await.is_err() {
                break;
            }
        }
        // Keep the update channel open until the runtime stops.
        shutdown.cancelled().await;
        Ok(())
    }
}

// ============================================================================
// Event Handler
// ============================================================================

/// Answers pings and echoes chatter; a `/guess` command starts a short
/// guessing game over the reply registry.
struct PingPong {
    replies: PendingReplies,
    secret: i64,
}

#[async_trait]
impl EventHandler for PingPong {
    async fn handle_command(&self, message: MessageEvent) {
        match message.command() {
            Some("ping") => info!(chat = message.chat_id, "pong"),
            Some("guess") => self.guessing_game(message).await,
            Some(other) => warn!(command = other, "Unknown command"),
            None => {}
        }
    }

    async fn handle_message(&self, message: MessageEvent) {
        info!(
            chat = message.chat_id,
            user = message.user_id,
            "echo: {}",
            message.text()
        );
    }

    async fn handle_callback(&self, callback: CallbackEvent) {
        info!(
            id = %callback.callback_id,
            data = %callback.data,
            "Callback acknowledged"
        );
    }
}

impl PingPong {
    /// Asks for a number and waits for the same user's next message.
    ///
    /// Only this handler task suspends while waiting; the dispatch loop
    /// keeps serving everyone else.
    async fn guessing_game(&self, message: MessageEvent) {
        info!(
            chat = message.chat_id,
            "Guess my number (1-10), you have 5 seconds"
        );

        let handle = self.replies.wait_for(message.chat_id, message.user_id);
        match handle.next_timeout(Duration::from_secs(5)).await {
            Some(reply) => {
                let verdict = match reply.text().trim().parse::<i64>() {
                    Ok(n) if n == self.secret => "Correct!",
                    Ok(_) => "Nope, not it",
                    Err(_) => "That is not even a number",
                };
                info!(chat = reply.chat_id, "{verdict}");
            }
            None => info!(chat = message.chat_id, "Too slow!"),
        }
    }
}

// ============================================================================
// Script
// ============================================================================

fn message(update_id: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            message_id: update_id,
            from: Some(User {
                id: USER_ID,
                username: Some("demo".to_string()),
            }),
            chat: Chat { id: CHAT_ID },
            text: text.to_string(),
        }),
        callback_query: None,
    }
}

fn callback(update_id: i64, data: &str) -> Update {
    Update {
        update_id,
        message: None,
        callback_query: Some(CallbackQuery {
            id: format!("cb-{update_id}"),
            from: Some(User {
                id: USER_ID,
                username: Some("demo".to_string()),
            }),
            message: Some(Message {
                message_id: update_id,
                from: None,
                chat: Chat { id: CHAT_ID },
                text: String::new(),
            }),
            data: data.to_string(),
        }),
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> RuntimeResult<()> {
    // The script sends five updates in just over a second; the production
    // default burst of 3 would drop the later ones.
    let mut tuning = SolderConfig::default();
    tuning.dispatch.rate_burst = 10;

    let runtime = Runtime::builder().merge(tuning).build()?;
    let replies = runtime.replies();

    let script = vec![
        message(1, "/ping"),
        message(2, "hello there"),
        message(3, "/guess"),
        message(4, "7"),
        callback(5, "confirm"),
    ];

    runtime
        .with_source(ScriptedSource { script })
        .with_handler(PingPong { replies, secret: 7 })
        .run_until(tokio::time::sleep(Duration::from_secs(3)))
        .await
}
