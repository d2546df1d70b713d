//! Where updates come from.
//!
//! The router consumes a plain [`mpsc::Receiver`], so anything able to
//! push [`Update`]s into a channel can feed it. [`UpdateSource`] is the
//! seam the runtime uses to own that producer: long polling against an API,
//! a webhook listener, or a scripted sequence in tests.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SourceResult;
use crate::event::Update;

/// Producer half of the update pipeline.
///
/// Implementations push updates into `updates` until the channel closes or
/// `shutdown` fires, whichever comes first. Returning an error signals a
/// fatal transport failure; the runtime logs it and tears the pipeline
/// down.
#[async_trait]
pub trait UpdateSource: Send + 'static {
    /// Runs the producer to completion.
    async fn run(
        self: Box<Self>,
        updates: mpsc::Sender<Update>,
        shutdown: CancellationToken,
    ) -> SourceResult<()>;
}
