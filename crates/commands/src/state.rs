//! Process-lifetime state shared by commands.
//!
//! Nothing here is persisted; a restart forgets the last `say` targets and
//! every pending confirmation.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {tokio_util::sync::CancellationToken, tracing::debug};

use ivebot_channels::MessageHandle;

#[derive(Default)]
pub struct EphemeralState {
    last_say: Mutex<HashMap<String, MessageHandle>>,
    pub confirmations: PendingConfirmations,
}

impl EphemeralState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the latest message `say` posted in its conversation.
    pub fn record_say(&self, handle: MessageHandle) {
        let mut last = self.last_say.lock().unwrap_or_else(|e| e.into_inner());
        last.insert(handle.conversation_id.clone(), handle);
    }

    pub fn last_say(&self, conversation_id: &str) -> Option<MessageHandle> {
        let last = self.last_say.lock().unwrap_or_else(|e| e.into_inner());
        last.get(conversation_id).cloned()
    }
}

/// Who is being asked to confirm, and where.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfirmationKey {
    pub actor_id: String,
    pub conversation_id: String,
}

impl ConfirmationKey {
    pub fn new(actor_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            conversation_id: conversation_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    Started,
    AlreadyPending,
}

struct Pending {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<ConfirmationKey, Pending>>,
    next_generation: AtomicU64,
}

impl Inner {
    /// Remove the entry only if it is still the one the timer was armed for.
    fn take_if_current(&self, key: &ConfirmationKey, generation: u64) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(pending) if pending.generation == generation => {
                entries.remove(key);
                true
            },
            _ => false,
        }
    }
}

/// Confirmations that expire after a timeout.
///
/// Exactly one of [`PendingConfirmations::confirm`] and the expiry callback
/// wins for a given `begin`: both go through the same locked removal.
#[derive(Clone, Default)]
pub struct PendingConfirmations {
    inner: Arc<Inner>,
}

impl PendingConfirmations {
    /// Arm a confirmation. `on_expire` runs if nobody confirms within `ttl`.
    /// Must be called inside a tokio runtime.
    pub fn begin<F, Fut>(&self, key: ConfirmationKey, ttl: Duration, on_expire: F) -> BeginOutcome
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        {
            let mut entries = self.inner.entries.lock().unwrap_or_else(|e| e.into_inner());
            if entries.contains_key(&key) {
                return BeginOutcome::AlreadyPending;
            }
            entries.insert(key.clone(), Pending {
                generation,
                cancel: cancel.clone(),
            });
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {},
                () = tokio::time::sleep(ttl) => {
                    if inner.take_if_current(&key, generation) {
                        debug!(actor_id = %key.actor_id, "confirmation expired");
                        on_expire().await;
                    }
                },
            }
        });
        BeginOutcome::Started
    }

    /// Consume a pending confirmation. Returns false if none was pending
    /// (never armed, already confirmed, or expired).
    pub fn confirm(&self, key: &ConfirmationKey) -> bool {
        let removed = {
            let mut entries = self.inner.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.remove(key)
        };
        match removed {
            Some(pending) => {
                pending.cancel.cancel();
                true
            },
            None => false,
        }
    }

    pub fn is_pending(&self, key: &ConfirmationKey) -> bool {
        let entries = self.inner.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(key)
    }
}
