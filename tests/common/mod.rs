//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use bypass_sim::config::SimulatorConfig;
use bypass_sim::http::HttpServer;
use bypass_sim::lifecycle::Shutdown;
use tokio::net::TcpListener;

/// Start the simulator on `addr` and return its shutdown handle.
pub async fn start_simulator(addr: SocketAddr, mut config: SimulatorConfig) -> Shutdown {
    config.listener.bind_address = addr.to_string();

    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind(addr).await.unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    // give the accept loop a moment
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown
}

/// A client that never pools or proxies, so every test sees a fresh connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
