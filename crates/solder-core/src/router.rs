//! The event router: the single consumer that turns raw updates into
//! handler work.
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 Router::run                  │
//!  mpsc::Receiver ──▶│ classify ─▶ admit ─▶ correlate ─▶ submit ────┼──▶ TaskPool
//!                    │    │          │          │                   │
//!                    │  silent     silent   delivered to            │
//!                    │  reject      drop    waiting handler         │
//!                    └──────────────────────────────────────────────┘
//! ```
//!
//! Per-update processing is synchronous: the router never awaits a handler
//! and never holds a lock across a suspension point, so one slow handler
//! cannot stall the stream. The only suspension points are receiving the
//! next update and observing cancellation, and cancellation wins over any
//! backlog still buffered in the channel.
//!
//! Because reply correlation happens inline, a registered waiter is
//! guaranteed to receive its follow-up message before any later update in
//! the same conversation is even classified.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, span, trace};

use crate::error::{DispatchError, DispatchResult};
use crate::event::{Event, Update};
use crate::handler::{BoxedHandler, EventHandler};
use crate::limiter::RateLimiter;
use crate::pool::{DEFAULT_WORKERS, TaskPool};
use crate::reply::PendingReplies;

/// Default per-actor burst capacity.
pub const DEFAULT_RATE_BURST: u32 = 3;

/// Default sustained per-actor admission rate, in events per second.
pub const DEFAULT_RATE_PER_SEC: f64 = 1.0;

/// Tuning for the dispatch pipeline.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Token-bucket capacity per actor.
    pub rate_burst: u32,
    /// Sustained refill rate per actor, in tokens per second.
    pub rate_per_sec: f64,
    /// Cap on concurrently running handler tasks.
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rate_burst: DEFAULT_RATE_BURST,
            rate_per_sec: DEFAULT_RATE_PER_SEC,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// The dispatch pipeline: limiter, reply correlation, and task pool wired
/// around one handler.
pub struct Router {
    handler: BoxedHandler,
    limiter: RateLimiter,
    replies: PendingReplies,
    pool: TaskPool,
}

impl Router {
    /// Builds a router with fresh parts sized from `config`.
    pub fn new<H: EventHandler>(handler: H, config: &DispatchConfig) -> Self {
        Self::with_parts(
            Arc::new(handler),
            RateLimiter::new(config.rate_burst, config.rate_per_sec),
            PendingReplies::new(),
            TaskPool::new(config.workers),
        )
    }

    /// Builds a router from externally owned parts.
    ///
    /// Lets callers share the registries with handlers or tests; the
    /// router never assumes it is their only user.
    pub fn with_parts(
        handler: BoxedHandler,
        limiter: RateLimiter,
        replies: PendingReplies,
        pool: TaskPool,
    ) -> Self {
        Self {
            handler,
            limiter,
            replies,
            pool,
        }
    }

    /// The reply registry this router delivers into.
    pub fn replies(&self) -> PendingReplies {
        self.replies.clone()
    }

    /// The rate limiter this router consults.
    pub fn limiter(&self) -> RateLimiter {
        self.limiter.clone()
    }

    /// The task pool this router submits to.
    pub fn pool(&self) -> TaskPool {
        self.pool.clone()
    }

    /// Consumes updates until `shutdown` fires or the stream closes.
    ///
    /// Cancellation is the normal exit and returns `Ok(())` without
    /// reading further updates, buffered or not. A closed stream is fatal:
    /// the router cancels `shutdown` so the rest of the pipeline tears
    /// down, then reports [`DispatchError::StreamClosed`].
    pub async fn run(
        self,
        mut updates: mpsc::Receiver<Update>,
        shutdown: CancellationToken,
    ) -> DispatchResult<()> {
        info!(workers = self.pool.stats().capacity, "event router started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("event router stopped");
                    return Ok(());
                }
                received = updates.recv() => {
                    match received {
                        Some(update) => self.process(update),
                        None => {
                            error!("update stream closed, tearing down pipeline");
                            shutdown.cancel();
                            return Err(DispatchError::StreamClosed);
                        }
                    }
                }
            }
        }
    }

    /// Runs one update through classify, admit, correlate, and submit.
    ///
    /// Synchronous on purpose: nothing here may suspend the router.
    fn process(&self, update: Update) {
        let span = span!(Level::DEBUG, "dispatch", update_id = update.update_id);
        let _enter = span.enter();

        let Some(event) = Event::classify(update) else {
            trace!("update rejected by classification");
            return;
        };

        if !self.limiter.admit(event.user_id()) {
            debug!(
                user_id = event.user_id(),
                kind = event.name(),
                "rate limited, dropping event"
            );
            return;
        }

        match event {
            Event::Message(message) => {
                // A waiting handler claims the message before command
                // detection, so a mid-dialogue "/..." answer cannot hijack
                // the conversation into a fresh command.
                match self.replies.try_deliver(message) {
                    Ok(()) => debug!("message delivered to waiting handler"),
                    Err(message) => {
                        let handler = Arc::clone(&self.handler);
                        if message.is_command() {
                            debug!(chat_id = message.chat_id, "dispatching command");
                            self.pool
                                .spawn(async move { handler.handle_command(message).await });
                        } else {
                            debug!(chat_id = message.chat_id, "dispatching message");
                            self.pool
                                .spawn(async move { handler.handle_message(message).await });
                        }
                    }
                }
            }
            Event::Callback(callback) => {
                let handler = Arc::clone(&self.handler);
                debug!(chat_id = callback.chat_id, "dispatching callback");
                self.pool
                    .spawn(async move { handler.handle_callback(callback).await });
            }
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("limiter", &self.limiter)
            .field("replies", &self.replies)
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CallbackEvent, CallbackQuery, Chat, Message, MessageEvent, User};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn plain(update_id: i64, chat_id: i64, user_id: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(Message {
                message_id: update_id,
                from: Some(User {
                    id: user_id,
                    username: None,
                }),
                chat: Chat { id: chat_id },
                text: text.to_string(),
            }),
            callback_query: None,
        }
    }

    fn callback(update_id: i64, chat_id: i64, user_id: i64, data: &str) -> Update {
        Update {
            update_id,
            message: None,
            callback_query: Some(CallbackQuery {
                id: update_id.to_string(),
                from: Some(User {
                    id: user_id,
                    username: None,
                }),
                message: Some(Message {
                    message_id: update_id,
                    from: None,
                    chat: Chat { id: chat_id },
                    text: String::new(),
                }),
                data: data.to_string(),
            }),
        }
    }

    /// Records every hook invocation, shared across clones.
    #[derive(Clone, Default)]
    struct Recorder {
        commands: Arc<Mutex<Vec<String>>>,
        messages: Arc<Mutex<Vec<String>>>,
        callbacks: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_command(&self, message: MessageEvent) {
            self.commands.lock().push(message.text().to_string());
        }

        async fn handle_message(&self, message: MessageEvent) {
            self.messages.lock().push(message.text().to_string());
        }

        async fn handle_callback(&self, callback: CallbackEvent) {
            self.callbacks.lock().push(callback.data.clone());
        }
    }

    /// Feeds `updates` through a fresh channel, closes it, and waits for
    /// the router to finish. The close always reports `StreamClosed`; the
    /// interesting assertions happen afterwards.
    async fn feed(router: Router, updates: Vec<Update>) -> DispatchResult<()> {
        let (tx, rx) = mpsc::channel(64);
        let shutdown = CancellationToken::new();
        let running = tokio::spawn(router.run(rx, shutdown));

        for update in updates {
            tx.send(update).await.unwrap();
        }
        drop(tx);
        running.await.unwrap()
    }

    #[tokio::test]
    async fn routes_each_kind_to_its_hook() {
        let recorder = Recorder::default();
        let router = Router::new(recorder.clone(), &DispatchConfig::default());
        let pool = router.pool();

        let result = feed(
            router,
            vec![
                plain(1, 10, 1, "/start now"),
                plain(2, 10, 1, "hello"),
                callback(3, 10, 1, "confirm"),
            ],
        )
        .await;
        assert!(matches!(result, Err(DispatchError::StreamClosed)));
        pool.idle().await;

        assert_eq!(*recorder.commands.lock(), vec!["/start now"]);
        assert_eq!(*recorder.messages.lock(), vec!["hello"]);
        assert_eq!(*recorder.callbacks.lock(), vec!["confirm"]);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_four_drops_exactly_one() {
        let recorder = Recorder::default();
        let pool = TaskPool::new(4);
        let router = Router::with_parts(
            Arc::new(recorder.clone()),
            RateLimiter::new(3, 1.0),
            PendingReplies::new(),
            pool.clone(),
        );

        let updates = (1..=4).map(|n| plain(n, 10, 1, "spam")).collect();
        let _ = feed(router, updates).await;
        pool.idle().await;

        assert_eq!(recorder.messages.lock().len(), 3);
    }

    #[tokio::test]
    async fn waiting_handler_receives_instead_of_dispatch() {
        let recorder = Recorder::default();
        let replies = PendingReplies::new();
        let pool = TaskPool::new(4);
        let router = Router::with_parts(
            Arc::new(recorder.clone()),
            RateLimiter::new(10, 1.0),
            replies.clone(),
            pool.clone(),
        );

        let handle = replies.wait_for(7, 5);
        let _ = feed(router, vec![plain(1, 7, 5, "the answer")]).await;
        pool.idle().await;

        let received = handle.next().await.unwrap();
        assert_eq!(received.text(), "the answer");
        assert!(recorder.messages.lock().is_empty());
        assert_eq!(replies.waiting(), 0);
    }

    #[tokio::test]
    async fn correlation_wins_over_command_prefix() {
        let recorder = Recorder::default();
        let replies = PendingReplies::new();
        let pool = TaskPool::new(4);
        let router = Router::with_parts(
            Arc::new(recorder.clone()),
            RateLimiter::new(10, 1.0),
            replies.clone(),
            pool.clone(),
        );

        let handle = replies.wait_for(7, 5);
        let _ = feed(router, vec![plain(1, 7, 5, "/quit")]).await;
        pool.idle().await;

        // The waiter owns the message even though it looks like a command.
        assert_eq!(handle.next().await.unwrap().text(), "/quit");
        assert!(recorder.commands.lock().is_empty());
    }

    #[tokio::test]
    async fn callbacks_bypass_correlation() {
        let recorder = Recorder::default();
        let replies = PendingReplies::new();
        let pool = TaskPool::new(4);
        let router = Router::with_parts(
            Arc::new(recorder.clone()),
            RateLimiter::new(10, 1.0),
            replies.clone(),
            pool.clone(),
        );

        let _handle = replies.wait_for(7, 5);
        let _ = feed(router, vec![callback(1, 7, 5, "pressed")]).await;
        pool.idle().await;

        assert_eq!(*recorder.callbacks.lock(), vec!["pressed"]);
        assert_eq!(replies.waiting(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_and_message_share_one_bucket() {
        let recorder = Recorder::default();
        let pool = TaskPool::new(4);
        let router = Router::with_parts(
            Arc::new(recorder.clone()),
            RateLimiter::new(1, 1.0),
            PendingReplies::new(),
            pool.clone(),
        );

        let _ = feed(
            router,
            vec![callback(1, 10, 1, "tap"), plain(2, 10, 1, "and text")],
        )
        .await;
        pool.idle().await;

        assert_eq!(*recorder.callbacks.lock(), vec!["tap"]);
        assert!(recorder.messages.lock().is_empty());
    }

    #[tokio::test]
    async fn handler_panic_does_not_stall_dispatch() {
        #[derive(Clone, Default)]
        struct Panicky {
            messages: Arc<Mutex<Vec<String>>>,
        }

        #[async_trait]
        impl EventHandler for Panicky {
            async fn handle_command(&self, _message: MessageEvent) {
                panic!("command handler fault");
            }

            async fn handle_message(&self, message: MessageEvent) {
                self.messages.lock().push(message.text().to_string());
            }
        }

        let handler = Panicky::default();
        let pool = TaskPool::new(1);
        let router = Router::with_parts(
            Arc::new(handler.clone()),
            RateLimiter::new(10, 1.0),
            PendingReplies::new(),
            pool.clone(),
        );

        let _ = feed(router, vec![plain(1, 10, 1, "/boom"), plain(2, 10, 1, "after")]).await;
        pool.idle().await;

        let stats = pool.stats();
        assert_eq!(stats.faulted, 1);
        assert_eq!(*handler.messages.lock(), vec!["after"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_applies_before_correlation() {
        let recorder = Recorder::default();
        let replies = PendingReplies::new();
        let pool = TaskPool::new(4);
        let router = Router::with_parts(
            Arc::new(recorder.clone()),
            RateLimiter::new(1, 1.0),
            replies.clone(),
            pool.clone(),
        );

        let handle = replies.wait_for(7, 5);
        let _ = feed(
            router,
            vec![plain(1, 7, 5, "first"), plain(2, 7, 5, "second")],
        )
        .await;
        pool.idle().await;

        // The second message was denied admission, so it never reached the
        // waiter or a handler.
        assert_eq!(handle.next().await.unwrap().text(), "first");
        assert!(recorder.messages.lock().is_empty());
    }

    #[tokio::test]
    async fn full_reply_slot_falls_back_to_dispatch() {
        let recorder = Recorder::default();
        let replies = PendingReplies::new();
        let pool = TaskPool::new(4);
        let router = Router::with_parts(
            Arc::new(recorder.clone()),
            RateLimiter::new(10, 1.0),
            replies.clone(),
            pool.clone(),
        );

        let handle = replies.wait_for(7, 5);
        let _ = feed(
            router,
            vec![plain(1, 7, 5, "fills the slot"), plain(2, 7, 5, "overflow")],
        )
        .await;
        pool.idle().await;

        assert_eq!(handle.next().await.unwrap().text(), "fills the slot");
        assert_eq!(*recorder.messages.lock(), vec!["overflow"]);
    }

    #[tokio::test]
    async fn malformed_updates_ignored_before_admission() {
        let recorder = Recorder::default();
        let router = Router::new(recorder.clone(), &DispatchConfig::default());
        let limiter = router.limiter();
        let pool = router.pool();

        let broadcast = plain(1, -100, 1, "from a channel");
        let mut anonymous = plain(2, 10, 1, "no sender");
        if let Some(message) = anonymous.message.as_mut() {
            message.from = None;
        }
        let empty = Update {
            update_id: 3,
            message: None,
            callback_query: None,
        };

        let _ = feed(router, vec![broadcast, anonymous, empty, plain(4, 0, 1, "zero chat")]).await;
        pool.idle().await;

        assert!(recorder.messages.lock().is_empty());
        // Rejected updates never touch admission control.
        assert_eq!(limiter.tracked_users(), 0);
    }

    #[tokio::test]
    async fn cancelled_token_stops_reads_with_backlog() {
        let recorder = Recorder::default();
        let router = Router::new(recorder.clone(), &DispatchConfig::default());
        let limiter = router.limiter();

        let (tx, rx) = mpsc::channel(8);
        for n in 1..=3 {
            tx.send(plain(n, 10, 1, "buffered")).await.unwrap();
        }

        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result = router.run(rx, shutdown).await;
        assert!(result.is_ok());
        assert!(recorder.messages.lock().is_empty());
        assert_eq!(limiter.tracked_users(), 0);
    }

    #[tokio::test]
    async fn closed_stream_cancels_and_errors() {
        let recorder = Recorder::default();
        let router = Router::new(recorder, &DispatchConfig::default());

        let (tx, rx) = mpsc::channel::<Update>(1);
        drop(tx);
        let shutdown = CancellationToken::new();

        let result = router.run(rx, shutdown.clone()).await;
        assert!(matches!(result, Err(DispatchError::StreamClosed)));
        assert!(shutdown.is_cancelled());
    }
}
