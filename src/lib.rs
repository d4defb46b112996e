//! # udpfan
//!
//! A UDP/multicast-to-HTTP fan-out engine for live MPEG-TS transport.
//!
//! One [`Hub`] per upstream source joins the multicast group (or binds
//! unicast UDP) exactly once and redistributes every datagram to any
//! number of HTTP viewers. Latency beats completeness: a viewer that
//! cannot keep up loses datagrams, never delays the source or the other
//! viewers. New viewers start instantly from the cached last frame, hubs
//! shut themselves down when the last viewer leaves, and viewers can be
//! migrated between hubs without dropping their connections when a source
//! fails over.
//!
//! # Example
//!
//! ```no_run
//! use udpfan::{router, HubRegistry, RelayState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = HubRegistry::new();
//! let app = router(RelayState::new(registry).content_type("video/mp2t"));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! A viewer then plays `http://host:8080/udp/239.0.0.1:1234`.

pub mod error;
pub mod hub;
pub mod net;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use hub::{Hub, HubConfig, HubKey, HubRegistry, HubStatus, SubscriberId, Subscription};
pub use server::{router, stream_response, RelayState};
pub use session::{ChannelSink, OnActive, StreamSession, StreamSink};
pub use stats::HubMetrics;
