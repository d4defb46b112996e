//! Source socket binding
//!
//! Resolves the configured source address and opens the UDP socket the hub
//! reads from. Multicast groups are joined on the first usable interface
//! from the configured list (or the default interface when the list is
//! empty); if every join fails the bind falls back to plain UDP so a
//! unicast sender can still feed the hub.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::error::{Error, Result};

/// How the source socket ended up bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindMode {
    /// Joined as a multicast listener, optionally on a named interface
    Multicast {
        /// Interface the join succeeded on (`None` = default interface)
        interface: Option<String>,
    },
    /// Plain unicast UDP bind
    Unicast,
}

impl std::fmt::Display for BindMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindMode::Multicast {
                interface: Some(name),
            } => write!(f, "multicast@{}", name),
            BindMode::Multicast { interface: None } => write!(f, "multicast"),
            BindMode::Unicast => write!(f, "unicast"),
        }
    }
}

/// A bound source socket and the path that produced it
#[derive(Debug)]
pub struct BoundSocket {
    /// The ready-to-read socket
    pub socket: UdpSocket,
    /// Which bind path succeeded
    pub mode: BindMode,
}

/// Resolve `addr` and bind the source socket.
///
/// `os_recv_buffer` is applied as `SO_RCVBUF` best-effort; live TS bursts
/// overrun the default kernel buffer long before the reader falls behind.
pub async fn bind_source(
    addr: &str,
    ifaces: &[String],
    os_recv_buffer: usize,
) -> Result<BoundSocket> {
    let target = resolve(addr).await?;

    if target.ip().is_multicast() {
        bind_multicast_source(addr, target, ifaces, os_recv_buffer)
    } else {
        let socket = bind_udp(target, os_recv_buffer).map_err(|e| Error::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
        tracing::info!(addr = %target, "listening on plain udp");
        Ok(BoundSocket {
            socket,
            mode: BindMode::Unicast,
        })
    }
}

async fn resolve(addr: &str) -> Result<SocketAddr> {
    let mut hosts = tokio::net::lookup_host(addr)
        .await
        .map_err(|e| Error::AddressResolution {
            addr: addr.to_string(),
            source: e,
        })?;

    hosts.next().ok_or_else(|| Error::AddressResolution {
        addr: addr.to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, "no usable address"),
    })
}

fn bind_multicast_source(
    addr: &str,
    group: SocketAddr,
    ifaces: &[String],
    os_recv_buffer: usize,
) -> Result<BoundSocket> {
    if ifaces.is_empty() {
        match join_multicast(group, None, os_recv_buffer) {
            Ok(socket) => {
                tracing::info!(group = %group, "joined multicast group on default interface");
                return Ok(BoundSocket {
                    socket,
                    mode: BindMode::Multicast { interface: None },
                });
            }
            Err(e) => {
                tracing::warn!(
                    group = %group,
                    error = %e,
                    "default-interface multicast join failed"
                );
            }
        }
    } else {
        for name in ifaces {
            let Some(iface) = interface_ipv4(name) else {
                tracing::warn!(interface = %name, "interface missing or has no ipv4 address");
                continue;
            };

            match join_multicast(group, Some(iface), os_recv_buffer) {
                Ok(socket) => {
                    tracing::info!(group = %group, interface = %name, "joined multicast group");
                    return Ok(BoundSocket {
                        socket,
                        mode: BindMode::Multicast {
                            interface: Some(name.clone()),
                        },
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        group = %group,
                        interface = %name,
                        error = %e,
                        "multicast join failed"
                    );
                }
            }
        }
    }

    // Every join failed; a unicast bind still lets a direct sender feed us.
    match bind_udp(group, os_recv_buffer) {
        Ok(socket) => {
            tracing::warn!(addr = %group, "falling back to plain udp listener");
            Ok(BoundSocket {
                socket,
                mode: BindMode::Unicast,
            })
        }
        Err(e) => Err(Error::Bind {
            addr: addr.to_string(),
            source: e,
        }),
    }
}

/// Bind to the group address and join it, IGMP-style.
///
/// `SO_REUSEADDR` is set so multiple processes on the host can watch the
/// same group, matching what IPTV tooling expects.
fn join_multicast(
    group: SocketAddr,
    iface: Option<Ipv4Addr>,
    os_recv_buffer: usize,
) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(group), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&group.into())?;

    match group.ip() {
        IpAddr::V4(v4) => {
            socket.join_multicast_v4(&v4, &iface.unwrap_or(Ipv4Addr::UNSPECIFIED))?;
        }
        IpAddr::V6(v6) => {
            // Named-interface selection is IPv4-only; v6 groups join on the
            // default route's interface.
            socket.join_multicast_v6(&v6, 0)?;
        }
    }

    into_tokio(socket, os_recv_buffer)
}

fn bind_udp(addr: SocketAddr, os_recv_buffer: usize) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.bind(&addr.into())?;
    into_tokio(socket, os_recv_buffer)
}

fn into_tokio(socket: Socket, os_recv_buffer: usize) -> io::Result<UdpSocket> {
    if os_recv_buffer > 0 {
        // Best-effort: the kernel may clamp or reject the size.
        let _ = socket.set_recv_buffer_size(os_recv_buffer);
    }
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

/// Look up the IPv4 address of a named OS interface.
pub(crate) fn interface_ipv4(name: &str) -> Option<Ipv4Addr> {
    let interfaces = local_ip_address::list_afinet_netifas().ok()?;

    interfaces.into_iter().find_map(|(ifname, ip)| match ip {
        IpAddr::V4(v4) if ifname == name => Some(v4),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_failure() {
        let err = bind_source("definitely-not-a-host", &[], 0).await.unwrap_err();
        assert!(matches!(err, Error::AddressResolution { .. }));
    }

    #[tokio::test]
    async fn test_unicast_bind() {
        let bound = bind_source("127.0.0.1:0", &[], 4 * 1024 * 1024)
            .await
            .unwrap();
        assert_eq!(bound.mode, BindMode::Unicast);
        assert_eq!(
            bound.socket.local_addr().unwrap().ip(),
            "127.0.0.1".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_unknown_interface_has_no_address() {
        assert!(interface_ipv4("no-such-interface0").is_none());
    }

    #[test]
    fn test_bind_mode_display() {
        let named = BindMode::Multicast {
            interface: Some("eth0".into()),
        };
        assert_eq!(named.to_string(), "multicast@eth0");
        assert_eq!(BindMode::Unicast.to_string(), "unicast");
    }
}
