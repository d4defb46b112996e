//! HTTP surface
//!
//! The thin outer layer that turns an HTTP request into a hub
//! subscription: a streaming route handing the body to a delivery session,
//! and a JSON status route over the registry snapshot.

pub mod http;

pub use http::{router, stream_response, RelayState};
