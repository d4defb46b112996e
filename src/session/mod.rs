//! Subscriber delivery sessions
//!
//! One session per HTTP client. The loop takes payloads off the bounded
//! subscriber queue and writes them to the sink, giving each write five
//! seconds before dropping the client, disconnecting after sixty idle
//! seconds, and exiting as soon as the client goes away or the hub shuts
//! down. Every exit path deregisters the queue through the subscription's
//! drop guard; the session never closes the queue itself.

pub mod sink;

use std::io;
use std::sync::Arc;

use crate::hub::Subscription;

pub use sink::{ChannelSink, StreamSink};

/// Callback invoked after each successful delivery, used by callers to
/// refresh activity bookkeeping for the connection.
pub type OnActive = Arc<dyn Fn() + Send + Sync>;

/// Per-client delivery loop
pub struct StreamSession<S: StreamSink> {
    subscription: Subscription,
    sink: S,
    on_active: Option<OnActive>,
}

impl<S: StreamSink> StreamSession<S> {
    /// Build a session draining `subscription` into `sink`.
    pub fn new(subscription: Subscription, sink: S, on_active: Option<OnActive>) -> Self {
        Self {
            subscription,
            sink,
            on_active,
        }
    }

    /// Drive the session until the client, queue or hub goes away.
    pub async fn run(mut self) {
        let hub = self.subscription.hub_key().clone();
        let id = self.subscription.id();
        let closed = self.subscription.hub_closed();
        let write_timeout = self.subscription.config().write_timeout;
        let idle_timeout = self.subscription.config().idle_timeout;

        loop {
            tokio::select! {
                delivery = self.subscription.recv() => {
                    let Some(payload) = delivery else {
                        // Coordinator closed the queue (removal or shutdown).
                        tracing::debug!(hub = %hub, subscriber = %id, "queue closed");
                        return;
                    };

                    tokio::select! {
                        written = tokio::time::timeout(write_timeout, self.sink.write(payload)) => {
                            match written {
                                Ok(Ok(())) => {
                                    if let Some(on_active) = self.on_active.as_ref() {
                                        on_active();
                                    }
                                }
                                Ok(Err(e)) => {
                                    if !is_benign_disconnect(&e) {
                                        tracing::warn!(hub = %hub, subscriber = %id, error = %e, "client write error");
                                    }
                                    return;
                                }
                                Err(_) => {
                                    tracing::warn!(hub = %hub, subscriber = %id, "write timeout, dropping client");
                                    return;
                                }
                            }
                        }
                        _ = closed.cancelled() => {
                            tracing::debug!(hub = %hub, subscriber = %id, "hub closed, disconnecting client");
                            return;
                        }
                    }
                }
                _ = self.sink.closed() => {
                    tracing::debug!(hub = %hub, subscriber = %id, "client disconnected");
                    return;
                }
                _ = closed.cancelled() => {
                    tracing::debug!(hub = %hub, subscriber = %id, "hub closed, disconnecting client");
                    return;
                }
                _ = tokio::time::sleep(idle_timeout) => {
                    tracing::info!(hub = %hub, subscriber = %id, "idle timeout, dropping client");
                    return;
                }
            }
        }
    }
}

/// Client-side disconnects arrive as write errors; they are expected with
/// continuous viewer churn and not worth logging.
fn is_benign_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
    )
}
