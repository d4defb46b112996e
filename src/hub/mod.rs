//! Per-source fan-out hubs and their registry
//!
//! A hub joins one upstream UDP source (multicast group or unicast
//! endpoint) exactly once and redistributes every datagram to any number
//! of HTTP subscribers. The registry deduplicates hubs by
//! `(source, interfaces)` and garbage-collects them when the last
//! subscriber leaves.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<HubRegistry>
//!                  ┌────────────────────────┐
//!                  │ hubs: HashMap<HubKey,  │
//!                  │   Arc<Hub> {           │
//!                  │     socket, last_frame │
//!                  │     subscribers        │
//!                  │   }                    │
//!                  │ >                      │
//!                  └───────────┬────────────┘
//!                              │
//!        UDP source ──► [reader task] ──► last_frame
//!                              │
//!                     try_send │ (drop on full)
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//!         [queue 20]      [queue 20]      [queue 20]
//!          session         session         session
//!              │               │               │
//!              ▼               ▼               ▼
//!          HTTP body       HTTP body       HTTP body
//! ```
//!
//! The coordinator task (one per hub, not drawn) is the single consumer of
//! subscriber add/remove events and the only closer of queues.

pub mod config;
pub mod core;
pub mod key;
pub mod store;
pub mod subscriber;

pub use config::HubConfig;
pub use core::Hub;
pub use key::HubKey;
pub use store::{HubRegistry, HubStatus};
pub use subscriber::{SubscriberId, Subscription};
