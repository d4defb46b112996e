//! Hub registry
//!
//! Process-wide deduplication of upstream listeners: any number of HTTP
//! handlers asking for the same `(source, interfaces)` share one hub, and a
//! source is joined upstream exactly once no matter how many viewers are
//! attached. The registry mutex is held for map operations only, never
//! across the socket open.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;

use crate::error::Result;
use crate::hub::config::HubConfig;
use crate::hub::core::Hub;
use crate::hub::key::HubKey;

/// Registry of live hubs, one per source key
pub struct HubRegistry {
    hubs: Mutex<HashMap<HubKey, Arc<Hub>>>,
    config: HubConfig,
    /// Handed to every hub so it can deregister itself on close
    self_ref: Weak<HubRegistry>,
}

impl HubRegistry {
    /// Create an empty registry with default hub configuration
    pub fn new() -> Arc<Self> {
        Self::with_config(HubConfig::default())
    }

    /// Create an empty registry with custom hub configuration
    pub fn with_config(config: HubConfig) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            hubs: Mutex::new(HashMap::new()),
            config,
            self_ref: self_ref.clone(),
        })
    }

    /// Return the live hub for `(addr, ifaces)`, creating it on first
    /// demand.
    ///
    /// A closed hub still occupying the slot is evicted. The socket open
    /// happens outside the registry mutex, so two callers can race to
    /// construct the same hub; the loser is closed and the winner returned,
    /// keeping at most one live hub per key.
    pub async fn get_or_create(&self, addr: &str, ifaces: &[String]) -> Result<Arc<Hub>> {
        let key = HubKey::new(addr, ifaces);

        {
            let mut hubs = self.hubs.lock().unwrap();
            match hubs.get(&key) {
                Some(hub) if !hub.is_closed() => return Ok(Arc::clone(hub)),
                Some(_) => {
                    hubs.remove(&key);
                }
                None => {}
            }
        }

        let hub = Hub::open(
            key.clone(),
            addr,
            ifaces,
            self.config.clone(),
            self.self_ref.clone(),
        )
        .await?;

        let winner = {
            let mut hubs = self.hubs.lock().unwrap();
            match hubs.get(&key) {
                Some(existing) if !existing.is_closed() => Some(Arc::clone(existing)),
                _ => {
                    hubs.insert(key, Arc::clone(&hub));
                    None
                }
            }
        };

        match winner {
            Some(existing) => {
                // Lost the construction race; release our socket right away.
                hub.close();
                Ok(existing)
            }
            None => Ok(hub),
        }
    }

    /// Remove `hub` from the registry, matching by identity.
    ///
    /// A hub that closed after a newer hub reclaimed its key must not evict
    /// the newer one, so the lookup compares the `Arc` pointer, not the key.
    pub fn remove(&self, hub: &Hub) {
        let hub_ptr: *const Hub = hub;
        let mut hubs = self.hubs.lock().unwrap();
        hubs.retain(|_, registered| !std::ptr::eq(Arc::as_ptr(registered), hub_ptr));
    }

    /// Close every hub. Used at teardown and on configuration reload.
    pub fn close_all(&self) {
        let hubs: Vec<Arc<Hub>> = self.hubs.lock().unwrap().values().cloned().collect();
        for hub in hubs {
            hub.close();
        }
    }

    /// Number of registered hubs
    pub fn len(&self) -> usize {
        self.hubs.lock().unwrap().len()
    }

    /// Whether the registry holds no hubs
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time view of every registered hub, for the status surface.
    pub fn snapshot(&self) -> Vec<HubStatus> {
        let hubs: Vec<Arc<Hub>> = self.hubs.lock().unwrap().values().cloned().collect();

        hubs.iter()
            .map(|hub| HubStatus {
                key: hub.key().to_string(),
                local_addr: hub.local_addr().map(|a| a.to_string()),
                subscribers: hub.subscriber_count(),
                inbound_bytes: hub.metrics().inbound_bytes(),
                inbound_datagrams: hub.metrics().inbound_datagrams(),
                closed: hub.is_closed(),
            })
            .collect()
    }
}

/// Status of one hub, as reported by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HubStatus {
    /// Registry key
    pub key: String,
    /// Local address of the source socket
    pub local_addr: Option<String>,
    /// Current subscriber count
    pub subscribers: usize,
    /// Payload bytes received from the source
    pub inbound_bytes: u64,
    /// Datagrams received from the source
    pub inbound_datagrams: u64,
    /// Whether the hub has shut down
    pub closed: bool,
}
