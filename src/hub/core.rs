//! The per-source fan-out hub
//!
//! One hub exists per upstream source. It owns the UDP socket and two
//! long-running tasks:
//!
//! - the **reader** receives datagrams, refreshes the last-frame cache and
//!   broadcasts to a snapshot of subscriber queues with `try_send`; a full
//!   queue drops the datagram for that subscriber only, so one stalled
//!   client can never hold back the rest;
//! - the **coordinator** is the single consumer of the add/remove channels
//!   and the only task that removes (and thereby closes) subscriber
//!   queues. When a removal leaves the hub empty it shuts itself down.
//!
//! The hub mutex guards the subscriber set, the last-frame slot and the
//! closed-once check. It is never held across an await point; the reader
//! snapshots the senders and broadcasts outside the lock.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::net::{bind_source, BufferPool};
use crate::stats::HubMetrics;

use super::config::HubConfig;
use super::key::HubKey;
use super::store::HubRegistry;
use super::subscriber::{Subscriber, SubscriberId, Subscription};

/// State guarded by the hub mutex
struct HubShared {
    subscribers: HashMap<SubscriberId, mpsc::Sender<Bytes>>,
    last_frame: Option<Bytes>,
}

/// One upstream source fanned out to any number of HTTP subscribers
pub struct Hub {
    key: HubKey,
    config: HubConfig,
    local_addr: Option<SocketAddr>,
    shared: Mutex<HubShared>,
    add_tx: mpsc::UnboundedSender<Subscriber>,
    remove_tx: mpsc::UnboundedSender<SubscriberId>,
    closed: CancellationToken,
    pool: BufferPool,
    metrics: Arc<HubMetrics>,
    registry: Weak<HubRegistry>,
}

impl Hub {
    /// Bind the source socket and spawn the reader and coordinator.
    pub(crate) async fn open(
        key: HubKey,
        addr: &str,
        ifaces: &[String],
        config: HubConfig,
        registry: Weak<HubRegistry>,
    ) -> Result<Arc<Self>> {
        let bound = bind_source(addr, ifaces, config.os_recv_buffer).await?;
        let local_addr = bound.socket.local_addr().ok();

        let (add_tx, add_rx) = mpsc::unbounded_channel();
        let (remove_tx, remove_rx) = mpsc::unbounded_channel();

        let hub = Arc::new(Self {
            pool: BufferPool::new(config.recv_buffer_size, config.pool_capacity),
            key,
            config,
            local_addr,
            shared: Mutex::new(HubShared {
                subscribers: HashMap::new(),
                last_frame: None,
            }),
            add_tx,
            remove_tx,
            closed: CancellationToken::new(),
            metrics: Arc::new(HubMetrics::new()),
            registry,
        });

        tokio::spawn(Arc::clone(&hub).coordinate(add_rx, remove_rx));
        tokio::spawn(Arc::clone(&hub).read_loop(bound.socket));

        tracing::info!(hub = %hub.key, local_addr = ?hub.local_addr, mode = %bound.mode, "hub listening");
        Ok(hub)
    }

    /// Key this hub is registered under
    pub fn key(&self) -> &HubKey {
        &self.key
    }

    /// Local address of the source socket
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Hub tunables
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Traffic counters fed by the reader
    pub fn metrics(&self) -> &HubMetrics {
        &self.metrics
    }

    /// Whether `close` has run
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().unwrap().subscribers.len()
    }

    /// Most recently received payload, if any
    pub fn last_frame(&self) -> Option<Bytes> {
        self.shared.lock().unwrap().last_frame.clone()
    }

    /// Register a new subscriber queue.
    ///
    /// Returns `None` when the hub is already closed; the caller should
    /// answer 503 and re-resolve the hub. The subscription deregisters
    /// itself on drop.
    pub fn subscribe(&self) -> Option<Subscription> {
        if self.closed.is_cancelled() {
            return None;
        }

        let (sub, rx) = Subscriber::channel(self.config.queue_capacity);
        let id = sub.id();
        if self.add_tx.send(sub).is_err() {
            // Coordinator already gone: the hub is tearing down.
            return None;
        }

        Some(Subscription::new(
            self.key.clone(),
            id,
            rx,
            self.closed.clone(),
            self.config.clone(),
            self.remove_tx.clone(),
        ))
    }

    /// Move every subscriber to `dest` without dropping their connections.
    ///
    /// Each queue is primed with the destination's last frame (dropped if
    /// the queue is full) so playback resumes immediately, then handed to
    /// the destination's coordinator. This hub is left empty and will shut
    /// down on its next removal event. Used when the upstream source of a
    /// logical stream changes while viewers stay connected.
    pub fn transfer_clients_to(&self, dest: &Hub) {
        let moved: Vec<(SubscriberId, mpsc::Sender<Bytes>)> = {
            let mut shared = self.shared.lock().unwrap();
            shared.subscribers.drain().collect()
        };
        if moved.is_empty() {
            return;
        }

        let prime = dest.last_frame();
        let count = moved.len();
        for (id, tx) in moved {
            if let Some(frame) = &prime {
                let _ = tx.try_send(frame.clone());
            }
            let _ = dest.add_tx.send(Subscriber::from_parts(id, tx));
        }

        tracing::info!(from = %self.key, to = %dest.key, subscribers = count, "subscribers transferred");
    }

    /// Shut the hub down. Idempotent.
    ///
    /// Signals `closed`, drops every subscriber queue and removes the hub
    /// from its registry by identity. The reader and coordinator observe
    /// the signal and exit on their own; the socket closes when the reader
    /// drops it.
    pub fn close(&self) {
        {
            let mut shared = self.shared.lock().unwrap();
            if self.closed.is_cancelled() {
                return;
            }
            self.closed.cancel();
            shared.subscribers.clear();
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self);
        }

        tracing::info!(hub = %self.key, "hub closed");
    }

    /// Single-consumer loop over subscriber membership events.
    async fn coordinate(
        self: Arc<Self>,
        mut add_rx: mpsc::UnboundedReceiver<Subscriber>,
        mut remove_rx: mpsc::UnboundedReceiver<SubscriberId>,
    ) {
        loop {
            tokio::select! {
                Some(sub) = add_rx.recv() => self.handle_add(sub),
                Some(id) = remove_rx.recv() => {
                    if self.handle_remove(id) {
                        self.close();
                    }
                }
                _ = self.closed.cancelled() => {
                    // Dropping the senders closes every remaining queue.
                    self.shared.lock().unwrap().subscribers.clear();
                    return;
                }
            }
        }
    }

    fn handle_add(&self, sub: Subscriber) {
        let (id, tx) = sub.into_parts();
        let count = {
            let mut shared = self.shared.lock().unwrap();
            if self.closed.is_cancelled() {
                // Lost the race with close; dropping tx closes the queue
                // and the session exits on its next recv.
                return;
            }
            if let Some(frame) = shared.last_frame.clone() {
                // Instant start: prime the queue with the latest frame.
                let _ = tx.try_send(frame);
            }
            shared.subscribers.insert(id, tx);
            shared.subscribers.len()
        };

        tracing::info!(hub = %self.key, subscriber = %id, subscribers = count, "subscriber joined");
    }

    /// Returns true when the hub is left without subscribers and should
    /// shut itself down.
    fn handle_remove(&self, id: SubscriberId) -> bool {
        let (was_member, count) = {
            let mut shared = self.shared.lock().unwrap();
            let was_member = shared.subscribers.remove(&id).is_some();
            (was_member, shared.subscribers.len())
        };

        if was_member {
            tracing::info!(hub = %self.key, subscriber = %id, subscribers = count, "subscriber left");
        }
        count == 0
    }

    /// Receive loop: pool buffer in, fresh payload out, fan out to a
    /// snapshot of the current queues.
    async fn read_loop(self: Arc<Self>, socket: UdpSocket) {
        loop {
            if self.closed.is_cancelled() {
                return;
            }

            let mut buf = self.pool.acquire();
            let received = tokio::select! {
                _ = self.closed.cancelled() => return,
                received = socket.recv_from(&mut buf) => received,
            };

            let n = match received {
                Ok((n, _peer)) => n,
                Err(e) => {
                    self.pool.release(buf);
                    if self.closed.is_cancelled() {
                        return;
                    }
                    tracing::warn!(hub = %self.key, error = %e, "udp read error");
                    tokio::time::sleep(self.config.read_retry_delay).await;
                    continue;
                }
            };

            // The payload is shared with every subscriber queue and outlives
            // the next receive, so it must be a fresh copy, not pool memory.
            let payload = Bytes::copy_from_slice(&buf[..n]);
            self.pool.release(buf);

            let targets: Vec<(SubscriberId, mpsc::Sender<Bytes>)> = {
                let mut shared = self.shared.lock().unwrap();
                shared.last_frame = Some(payload.clone());
                shared
                    .subscribers
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect()
            };

            self.metrics.add_inbound(n);
            self.broadcast(&targets, payload);
        }
    }

    fn broadcast(&self, targets: &[(SubscriberId, mpsc::Sender<Bytes>)], payload: Bytes) {
        for (id, tx) in targets {
            match tx.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    // Backpressure rule: a slow subscriber loses this
                    // datagram, nobody else waits for it.
                    tracing::trace!(hub = %self.key, subscriber = %id, "queue full, datagram dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    // Receiver gone without deregistering (e.g. migrated
                    // here and later disconnected); have the coordinator
                    // prune it.
                    let _ = self.remove_tx.send(*id);
                }
            }
        }
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("key", &self.key)
            .field("local_addr", &self.local_addr)
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}
