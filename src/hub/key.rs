//! Hub identity
//!
//! A hub is identified by the source address plus the ordered interface
//! list it was asked to join on. Two subscribe calls naming the same source
//! through the same interfaces share one upstream listener; a different
//! interface list is a different hub.

/// Canonical identity of a hub
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HubKey(String);

impl HubKey {
    /// Derive the key for `(source address, interface list)`
    pub fn new(addr: &str, ifaces: &[String]) -> Self {
        Self(format!("{}|{}", addr, ifaces.join(",")))
    }

    /// The key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_without_interfaces() {
        let key = HubKey::new("239.0.0.1:1234", &[]);
        assert_eq!(key.as_str(), "239.0.0.1:1234|");
    }

    #[test]
    fn test_key_joins_interfaces_in_order() {
        let ifaces = vec!["eth0".to_string(), "eth1".to_string()];
        let key = HubKey::new("239.0.0.1:1234", &ifaces);
        assert_eq!(key.as_str(), "239.0.0.1:1234|eth0,eth1");
    }

    #[test]
    fn test_interface_order_is_significant() {
        let a = HubKey::new("239.0.0.1:1234", &["eth0".into(), "eth1".into()]);
        let b = HubKey::new("239.0.0.1:1234", &["eth1".into(), "eth0".into()]);
        assert_ne!(a, b);
    }
}
