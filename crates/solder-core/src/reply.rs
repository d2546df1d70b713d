//! Reply correlation: the rendezvous between a handler that wants the next
//! message from an actor and the router that receives it.
//!
//! # Protocol
//!
//! 1. A handler calls [`PendingReplies::wait_for`] *before* the actor can
//!    answer, registering a single-slot channel keyed on
//!    `(chat_id, user_id)`, and then awaits
//!    [`ReplyHandle::next`].
//! 2. The router, on every classified message, calls
//!    [`PendingReplies::try_deliver`] first. If a slot is registered and has
//!    room, the message moves to the waiting handler and is never dispatched
//!    anywhere else; otherwise the message comes straight back and ordinary
//!    dispatch proceeds.
//! 3. Receiving consumes the registration. A handler that gives up instead
//!    (timeout, early return) just drops its handle; the stale entry stays
//!    until the next `wait_for` on the same key overwrites it, and
//!    deliveries in the interim fail harmlessly because the receiver is
//!    gone.
//!
//! Registration always overwrites: the newest waiter wins the key, and the
//! shadowed waiter's `next()` resolves `None` the moment its slot is
//! dropped. Removal is ticketed so a stale waiter finishing late can never
//! delete a newer registration for the same key.
//!
//! `try_deliver` is synchronous (`try_send` on the slot), which is what lets
//! the router guarantee that a registered waiter sees the very next message
//! from its actor before any later event in the conversation is classified.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::event::MessageEvent;

/// Correlation key: (conversation, actor).
type ReplyKey = (i64, i64);

/// One registered waiter: the send half of its slot plus the registration
/// ticket used for safe removal.
struct ReplySlot {
    tx: mpsc::Sender<MessageEvent>,
    ticket: u64,
}

/// Registry of handlers waiting for the next message from an actor.
///
/// Cloning is cheap and all clones operate on the same slots.
#[derive(Clone)]
pub struct PendingReplies {
    slots: Arc<Mutex<HashMap<ReplyKey, ReplySlot>>>,
    tickets: Arc<AtomicU64>,
}

impl Default for PendingReplies {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingReplies {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            tickets: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers a waiter for the next message from `user_id` in `chat_id`.
    ///
    /// Overwrites any existing registration for the key; the previous
    /// waiter, if still awaiting, resolves `None`. The returned handle
    /// reports whether that happened via
    /// [`replaced_existing`](ReplyHandle::replaced_existing).
    pub fn wait_for(&self, chat_id: i64, user_id: i64) -> ReplyHandle {
        let (tx, rx) = mpsc::channel(1);
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);

        let replaced = {
            let mut slots = self.slots.lock();
            slots
                .insert((chat_id, user_id), ReplySlot { tx, ticket })
                .is_some()
        };
        if replaced {
            debug!(chat_id, user_id, "reply waiter replaced by newer registration");
        }

        ReplyHandle {
            rx,
            registry: self.clone(),
            key: (chat_id, user_id),
            ticket,
            replaced,
        }
    }

    /// Attempts to hand a message to the waiter registered for its
    /// (conversation, actor) key.
    ///
    /// Non-blocking. On success the waiter owns the message; otherwise the
    /// message is handed back so the caller can dispatch it normally. The
    /// not-delivered cases: no registration, the slot already holds an
    /// undrained message, or the waiter abandoned its handle.
    pub fn try_deliver(&self, message: MessageEvent) -> Result<(), MessageEvent> {
        let slots = self.slots.lock();
        let Some(slot) = slots.get(&(message.chat_id, message.user_id)) else {
            return Err(message);
        };

        match slot.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                // Single slot, single consumer; an undrained slot means the
                // waiter is between messages it never asked for.
                warn!(
                    chat_id = message.chat_id,
                    user_id = message.user_id,
                    "reply slot already full, leaving message to normal dispatch"
                );
                Err(message)
            }
            Err(TrySendError::Closed(message)) => {
                debug!(
                    chat_id = message.chat_id,
                    user_id = message.user_id,
                    "reply waiter gone, leaving message to normal dispatch"
                );
                Err(message)
            }
        }
    }

    /// Number of currently registered waiters (including orphaned entries
    /// whose handle was abandoned).
    pub fn waiting(&self) -> usize {
        self.slots.lock().len()
    }

    /// Removes the registration for `key` only if it still belongs to
    /// `ticket`. A newer registration for the same key is left untouched.
    fn remove_if_current(&self, key: ReplyKey, ticket: u64) {
        let mut slots = self.slots.lock();
        if slots.get(&key).is_some_and(|slot| slot.ticket == ticket) {
            slots.remove(&key);
        }
    }
}

impl std::fmt::Debug for PendingReplies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReplies")
            .field("waiting", &self.waiting())
            .finish()
    }
}

/// A single-use handle to the next message from one actor in one
/// conversation.
pub struct ReplyHandle {
    rx: mpsc::Receiver<MessageEvent>,
    registry: PendingReplies,
    key: ReplyKey,
    ticket: u64,
    replaced: bool,
}

impl ReplyHandle {
    /// Whether this registration shadowed an earlier waiter on the same key.
    pub fn replaced_existing(&self) -> bool {
        self.replaced
    }

    /// Awaits the next message, consuming the registration on success.
    ///
    /// Resolves `None` when this waiter was shadowed by a newer
    /// registration for the same key; the caller is no longer waiting and
    /// must not treat the conversation as its own.
    pub async fn next(mut self) -> Option<MessageEvent> {
        let received = self.rx.recv().await;
        if received.is_some() {
            self.registry.remove_if_current(self.key, self.ticket);
        }
        received
    }

    /// [`next`](Self::next) bounded by `wait`. `None` on timeout or
    /// shadowing; timing out abandons the registration.
    pub async fn next_timeout(self, wait: Duration) -> Option<MessageEvent> {
        timeout(wait, self.next()).await.ok().flatten()
    }
}

impl std::fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyHandle")
            .field("chat_id", &self.key.0)
            .field("user_id", &self.key.1)
            .field("replaced", &self.replaced)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Chat, Message, User};

    fn message(chat_id: i64, user_id: i64, text: &str) -> MessageEvent {
        MessageEvent {
            chat_id,
            user_id,
            message: Message {
                message_id: 1,
                from: Some(User {
                    id: user_id,
                    username: None,
                }),
                chat: Chat { id: chat_id },
                text: text.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn delivers_to_registered_waiter() {
        let replies = PendingReplies::new();
        let handle = replies.wait_for(5, 9);
        assert!(!handle.replaced_existing());
        assert_eq!(replies.waiting(), 1);

        assert!(replies.try_deliver(message(5, 9, "answer")).is_ok());

        let received = handle.next().await.unwrap();
        assert_eq!(received.text(), "answer");
        assert_eq!(replies.waiting(), 0);
    }

    #[tokio::test]
    async fn no_waiter_hands_message_back() {
        let replies = PendingReplies::new();
        let returned = replies.try_deliver(message(5, 9, "hi")).unwrap_err();
        assert_eq!(returned.text(), "hi");
    }

    #[tokio::test]
    async fn key_is_conversation_and_actor() {
        let replies = PendingReplies::new();
        let _handle = replies.wait_for(5, 9);

        // Same actor, different conversation: not correlated.
        assert!(replies.try_deliver(message(6, 9, "elsewhere")).is_err());
        // Same conversation, different actor: not correlated.
        assert!(replies.try_deliver(message(5, 10, "someone else")).is_err());
    }

    #[tokio::test]
    async fn second_registration_shadows_first() {
        let replies = PendingReplies::new();
        let first = replies.wait_for(5, 9);
        let second = replies.wait_for(5, 9);
        assert!(second.replaced_existing());
        assert_eq!(replies.waiting(), 1);

        // The shadowed waiter learns it is no longer waiting.
        assert!(first.next().await.is_none());

        assert!(replies.try_deliver(message(5, 9, "for the newest")).is_ok());
        let received = second.next().await.unwrap();
        assert_eq!(received.text(), "for the newest");
    }

    #[tokio::test]
    async fn full_slot_hands_message_back() {
        let replies = PendingReplies::new();
        let handle = replies.wait_for(5, 9);

        assert!(replies.try_deliver(message(5, 9, "first")).is_ok());
        let returned = replies.try_deliver(message(5, 9, "second")).unwrap_err();
        assert_eq!(returned.text(), "second");

        assert_eq!(handle.next().await.unwrap().text(), "first");
    }

    #[tokio::test]
    async fn abandoned_handle_leaves_orphan_until_overwritten() {
        let replies = PendingReplies::new();
        drop(replies.wait_for(5, 9));

        // Entry is orphaned, not removed; delivery fails harmlessly.
        assert_eq!(replies.waiting(), 1);
        assert!(replies.try_deliver(message(5, 9, "lost")).is_err());

        // The next registration takes the key over cleanly.
        let fresh = replies.wait_for(5, 9);
        assert!(fresh.replaced_existing());
        assert!(replies.try_deliver(message(5, 9, "found")).is_ok());
        assert_eq!(fresh.next().await.unwrap().text(), "found");
    }

    #[tokio::test]
    async fn stale_waiter_cannot_remove_newer_registration() {
        let replies = PendingReplies::new();
        let first = replies.wait_for(5, 9);
        assert!(replies.try_deliver(message(5, 9, "early")).is_ok());

        // Shadow the first waiter while its slot still buffers a message.
        let second = replies.wait_for(5, 9);

        // The stale waiter drains its buffered message late, but its
        // removal must not evict the newer registration.
        assert_eq!(first.next().await.unwrap().text(), "early");
        assert_eq!(replies.waiting(), 1);

        assert!(replies.try_deliver(message(5, 9, "still here")).is_ok());
        assert_eq!(second.next().await.unwrap().text(), "still here");
        assert_eq!(replies.waiting(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn next_timeout_resolves_none() {
        let replies = PendingReplies::new();
        let handle = replies.wait_for(5, 9);

        let received = handle.next_timeout(Duration::from_secs(30)).await;
        assert!(received.is_none());
        // The timed-out registration lingers until overwritten.
        assert_eq!(replies.waiting(), 1);
    }

    #[tokio::test]
    async fn waiter_blocks_until_delivery() {
        let replies = PendingReplies::new();
        let handle = replies.wait_for(5, 9);

        let deliverer = replies.clone();
        let task = tokio::spawn(async move { handle.next().await });

        tokio::task::yield_now().await;
        assert!(deliverer.try_deliver(message(5, 9, "late")).is_ok());

        let received = task.await.unwrap().unwrap();
        assert_eq!(received.text(), "late");
    }
}
