//! Subscriber handles
//!
//! Each HTTP client is represented inside the hub by a bounded delivery
//! queue. The hub owns the sending half; the serving session owns the
//! receiving half, wrapped in a [`Subscription`] whose drop guard tells the
//! coordinator to deregister the queue. Dropping the sender from the hub's
//! set is what "closes" the queue; the coordinator is the only task that
//! does it, so a queue is closed at most once.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::config::HubConfig;
use super::key::HubKey;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one subscriber queue within a hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The hub-side half of a subscriber: its id and queue sender
#[derive(Debug)]
pub(crate) struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<Bytes>,
}

impl Subscriber {
    /// Allocate a fresh subscriber with a bounded queue.
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                id: SubscriberId::next(),
                tx,
            },
            rx,
        )
    }

    /// Rebuild a subscriber from parts (used when migrating between hubs).
    pub(crate) fn from_parts(id: SubscriberId, tx: mpsc::Sender<Bytes>) -> Self {
        Self { id, tx }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn into_parts(self) -> (SubscriberId, mpsc::Sender<Bytes>) {
        (self.id, self.tx)
    }
}

/// A live subscription to a hub, held by the serving session.
///
/// Payloads arrive in receive order, minus any dropped while the queue was
/// full. `recv` returning `None` means the coordinator closed the queue
/// (hub shutdown or deregistration).
#[derive(Debug)]
pub struct Subscription {
    hub: HubKey,
    id: SubscriberId,
    rx: mpsc::Receiver<Bytes>,
    closed: CancellationToken,
    config: HubConfig,
    _guard: RemoveGuard,
}

impl Subscription {
    pub(crate) fn new(
        hub: HubKey,
        id: SubscriberId,
        rx: mpsc::Receiver<Bytes>,
        closed: CancellationToken,
        config: HubConfig,
        remove_tx: mpsc::UnboundedSender<SubscriberId>,
    ) -> Self {
        Self {
            hub,
            id,
            rx,
            closed,
            config,
            _guard: RemoveGuard { id, remove_tx },
        }
    }

    /// Receive the next payload; `None` once the queue is closed.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Key of the hub this subscription belongs to
    pub fn hub_key(&self) -> &HubKey {
        &self.hub
    }

    /// This subscriber's id within the hub
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Token that fires when the hub shuts down
    pub fn hub_closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Hub tunables relevant to the serving session
    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}

/// Tells the coordinator to deregister the queue on any session exit,
/// including panics. The send is best-effort: after hub close the
/// coordinator is gone and the queue is already closed.
#[derive(Debug)]
struct RemoveGuard {
    id: SubscriberId,
    remove_tx: mpsc::UnboundedSender<SubscriberId>,
}

impl Drop for RemoveGuard {
    fn drop(&mut self) {
        let _ = self.remove_tx.send(self.id);
    }
}
