//! Delivery sinks
//!
//! The session loop is generic over where chunks go, so its timeout and
//! cancellation behaviour is testable without an HTTP stack. The real sink
//! feeds an HTTP streaming body through a bounded channel.

use std::future::Future;
use std::io;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Where a session delivers payload chunks.
///
/// `write` resolving with an error ends the session; errors whose kind
/// looks like a client-side disconnect are treated as benign. `closed`
/// resolves when the client side has gone away; the session uses it to
/// notice disconnects while no data is flowing.
pub trait StreamSink: Send {
    /// Deliver one chunk to the client.
    fn write(&mut self, chunk: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    /// Resolves once the client can no longer receive chunks.
    fn closed(&mut self) -> impl Future<Output = ()> + Send;
}

/// Sink backing an HTTP streaming body.
///
/// The channel is bounded at one chunk: a `write` completes only once the
/// HTTP stack has taken the previous chunk, so the 5-second write bound
/// measures the client, not our own buffering. hyper flushes each body
/// frame as it is sent, which gives the incremental delivery live players
/// need.
pub struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelSink {
    /// Create the sink and the stream side handed to the response body.
    pub fn new() -> (Self, mpsc::Receiver<io::Result<Bytes>>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }
}

impl StreamSink for ChannelSink {
    fn write(&mut self, chunk: Bytes) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            self.tx
                .send(Ok(chunk))
                .await
                .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    fn closed(&mut self) -> impl Future<Output = ()> + Send {
        self.tx.closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_delivers_chunk() {
        let (mut sink, mut rx) = ChannelSink::new();

        let writer = tokio::spawn(async move {
            sink.write(Bytes::from_static(b"ts")).await.unwrap();
        });

        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from_static(b"ts"));
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_write_after_receiver_drop_is_broken_pipe() {
        let (mut sink, rx) = ChannelSink::new();
        drop(rx);

        let err = sink.write(Bytes::from_static(b"ts")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_closed_resolves_on_receiver_drop() {
        let (mut sink, rx) = ChannelSink::new();
        drop(rx);
        sink.closed().await;
    }
}
