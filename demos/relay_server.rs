//! UDP-to-HTTP relay server
//!
//! Run with: cargo run --example relay_server [BIND_ADDR] [IFACE...]
//!
//! Examples:
//!   cargo run --example relay_server                      # binds to 0.0.0.0:8080
//!   cargo run --example relay_server 127.0.0.1:8090       # custom bind address
//!   cargo run --example relay_server 0.0.0.0:8080 eth0    # join groups via eth0
//!
//! ## Feeding a stream
//!
//! Point a multicast MPEG-TS source at a group, e.g. with ffmpeg:
//!   ffmpeg -re -i input.ts -c copy -f mpegts udp://239.0.0.1:1234
//!
//! ## Watching
//!
//! ffplay: ffplay http://localhost:8080/udp/239.0.0.1:1234
//! VLC:    vlc http://localhost:8080/udp/239.0.0.1:1234
//!
//! The group is joined once no matter how many viewers attach; the hub
//! shuts down when the last viewer leaves. `GET /status` lists the active
//! hubs as JSON.

use std::net::SocketAddr;

use udpfan::{router, HubRegistry, RelayState};

/// Parse bind address from command line argument.
///
/// Accepts "localhost", "IP", or "IP:PORT" forms.
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8080;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: relay_server [BIND_ADDR] [IFACE...]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    HTTP address to bind to (default: 0.0.0.0:8080)");
    eprintln!("  IFACE        Interfaces to join multicast groups on, in order");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => "0.0.0.0:8080".parse().unwrap(),
    };
    let interfaces: Vec<String> = args.iter().skip(2).cloned().collect();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("udpfan=debug".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let registry = HubRegistry::new();
    let state = RelayState::new(registry.clone()).interfaces(interfaces);
    let app = router(state);

    println!("Relay listening on http://{}", bind_addr);
    println!();
    println!("Watch a stream:   http://{}/udp/239.0.0.1:1234", bind_addr);
    println!("Hub status:       http://{}/status", bind_addr);
    println!();

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    registry.close_all();
    Ok(())
}
