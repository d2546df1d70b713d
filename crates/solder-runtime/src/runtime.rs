//! Main runtime orchestration for the dispatch pipeline.
//!
//! The runtime loads configuration and initializes logging, then wires an
//! update source to the core router: source task feeding a bounded
//! channel, router task consuming it, both governed by one cancellation
//! token.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use solder_runtime::Runtime;
//!
//! // Simplest way - auto-loads config from current directory
//! let runtime = Runtime::new();
//!
//! // Custom configuration path
//! let runtime = Runtime::builder()
//!     .config_file("config/solder.toml")
//!     .build()?;
//!
//! runtime
//!     .with_source(my_source)
//!     .with_handler(my_handler)
//!     .run()
//!     .await?;
//! ```

use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{ConfigLoader, ConfigResult, SolderConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use solder_core::{
    BoxedHandler, EventHandler, PendingReplies, RateLimiter, Router, TaskPool, UpdateSource,
};

/// The Solder runtime: configuration, logging, and pipeline lifecycle in
/// one place.
///
/// # Simple Usage
///
/// ```rust,ignore
/// use solder_runtime::Runtime;
///
/// // Auto-loads config from solder.toml in the current directory
/// Runtime::new()
///     .with_source(polling_source)
///     .with_handler(MyHandler::new())
///     .run()
///     .await?;
/// ```
///
/// Handlers that want conversational follow-ups grab the reply registry
/// before starting:
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let replies = runtime.replies();
/// let handler = MyHandler::new(replies);
/// runtime.with_source(source).with_handler(handler).run().await?;
/// ```
pub struct Runtime {
    /// The configuration.
    config: SolderConfig,
    /// Reply registry shared between the router and handlers.
    replies: PendingReplies,
    /// Cancellation token governing the whole pipeline.
    shutdown: CancellationToken,
    /// Installed event handler.
    handler: Option<BoxedHandler>,
    /// Installed update source.
    source: Option<Box<dyn UpdateSource>>,
}

impl Runtime {
    /// Creates a new runtime with automatic configuration loading.
    ///
    /// Searches the current directory for a config file and falls back to
    /// defaults when none is found.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                SolderConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let runtime = Runtime::builder()
    ///     .config_file("config/solder.production.toml")
    ///     .profile("production")
    ///     .build()?;
    /// ```
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a new runtime from configuration.
    ///
    /// This initializes logging based on the configuration; repeated calls
    /// keep the first subscriber.
    pub fn from_config(config: &SolderConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            workers = config.dispatch.workers,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            replies: PendingReplies::new(),
            shutdown: CancellationToken::new(),
            handler: None,
            source: None,
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &SolderConfig {
        &self.config
    }

    /// The reply registry handlers use for conversational follow-ups.
    pub fn replies(&self) -> PendingReplies {
        self.replies.clone()
    }

    /// The cancellation token that stops the pipeline when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Installs the event handler.
    pub fn with_handler<H: EventHandler>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Installs the update source.
    pub fn with_source<S: UpdateSource>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Runs the pipeline until a shutdown signal is received.
    pub async fn run(self) -> RuntimeResult<()> {
        info!("Solder runtime is now running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs the pipeline until `shutdown` resolves.
    ///
    /// In-flight handler tasks are not drained; shutdown is best-effort.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let Self {
            config,
            replies,
            shutdown: token,
            handler,
            source,
        } = self;
        let handler = handler.ok_or(RuntimeError::MissingHandler)?;
        let source = source.ok_or(RuntimeError::MissingSource)?;

        let settings = &config.dispatch;
        let dispatch = settings.to_core();
        let (updates_tx, updates_rx) = mpsc::channel(settings.queue_capacity.max(1));

        let router = Router::with_parts(
            handler,
            RateLimiter::new(dispatch.rate_burst, dispatch.rate_per_sec),
            replies,
            TaskPool::new(dispatch.workers),
        );

        info!(
            workers = settings.workers,
            queue_capacity = settings.queue_capacity,
            "Starting Solder runtime"
        );

        let source_task = tokio::spawn(source.run(updates_tx, token.child_token()));
        let mut router_task = tokio::spawn(router.run(updates_rx, token.clone()));

        let joined = tokio::select! {
            _ = shutdown => {
                info!("Shutdown requested, stopping runtime");
                token.cancel();
                (&mut router_task).await
            }
            joined = &mut router_task => joined,
        };

        let result = match joined {
            Ok(router_result) => router_result.map_err(RuntimeError::from),
            Err(e) => Err(RuntimeError::RouterPanicked(e.to_string())),
        };

        // Best-effort teardown of the producer; its errors are logged, not
        // propagated, since the router outcome is the one that matters.
        source_task.abort();
        if let Ok(Err(e)) = source_task.await {
            error!(error = %e, "Update source failed");
        }

        info!("Runtime stopped");
        result
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`Runtime`] with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::builder()
///     .config_file("config/solder.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: SolderConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<Runtime> {
        let config = self.config_loader.load()?;
        Ok(Runtime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use solder_core::{Chat, Message, MessageEvent, SourceResult, Update, User};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Notify, oneshot};

    struct Scripted {
        updates: Vec<Update>,
    }

    #[async_trait]
    impl UpdateSource for Scripted {
        async fn run(
            self: Box<Self>,
            updates: mpsc::Sender<Update>,
            shutdown: CancellationToken,
        ) -> SourceResult<()> {
            for update in self.updates {
                if updates.send(update).await.is_err() {
                    break;
                }
            }
            // Keep the channel open until the pipeline shuts down.
            shutdown.cancelled().await;
            Ok(())
        }
    }

    struct Quiet;

    #[async_trait]
    impl EventHandler for Quiet {}

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

    #[tokio::test]
    async fn missing_parts_are_reported() {
        let config = SolderConfig::default();

        let result = Runtime::from_config(&config)
            .with_source(Scripted {
                updates: Vec::new(),
            })
            .run_until(async {})
            .await;
        assert!(matches!(result, Err(RuntimeError::MissingHandler)));

        let result = Runtime::from_config(&config)
            .with_handler(Quiet)
            .run_until(async {})
            .await;
        assert!(matches!(result, Err(RuntimeError::MissingSource)));
    }

    #[tokio::test]
    async fn processes_updates_until_stopped() {
        struct Counting {
            hits: Arc<AtomicUsize>,
            done: Arc<Notify>,
        }

        #[async_trait]
        impl EventHandler for Counting {
            async fn handle_message(&self, _message: MessageEvent) {
                if self.hits.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                    self.done.notify_one();
                }
            }
        }

        let mut config = SolderConfig::default();
        config.dispatch.workers = 2;

        let hits = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(Notify::new());
        let wait_done = Arc::clone(&done);

        let result = Runtime::from_config(&config)
            .with_handler(Counting {
                hits: Arc::clone(&hits),
                done,
            })
            .with_source(Scripted {
                updates: vec![plain(1, 7, 5, "one"), plain(2, 7, 5, "two")],
            })
            .run_until(async move { wait_done.notified().await })
            .await;

        assert!(result.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reply_registration_reaches_waiting_caller() {
        let runtime = Runtime::from_config(&SolderConfig::default()).with_handler(Quiet);
        let replies = runtime.replies();
        let handle = replies.wait_for(7, 5);

        let (done_tx, done_rx) = oneshot::channel();
        let waiter = tokio::spawn(async move {
            let received = handle.next().await;
            let _ = done_tx.send(());
            received
        });

        let result = runtime
            .with_source(Scripted {
                updates: vec![plain(1, 7, 5, "follow-up")],
            })
            .run_until(async move {
                let _ = done_rx.await;
            })
            .await;

        assert!(result.is_ok());
        let received = waiter.await.unwrap();
        assert_eq!(received.unwrap().text(), "follow-up");
    }
}
