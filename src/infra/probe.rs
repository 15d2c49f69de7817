//! Network probing — implements `NetworkProbe` using `spawn_blocking`.

use std::time::Duration;

use anyhow::Result;

use crate::application::ports::NetworkProbe;

/// Production probe that opens a real TCP connection.
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl NetworkProbe for TcpProbe {
    async fn check_tcp_connectivity(&self, host: &str, port: u16) -> Result<bool> {
        let addr = format!("{host}:{port}");
        let timeout = self.timeout;
        let reachable = tokio::task::spawn_blocking(move || {
            let addr: std::net::SocketAddr = addr
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid address {addr}: {e}"))?;
            Ok::<bool, anyhow::Error>(
                std::net::TcpStream::connect_timeout(&addr, timeout).is_ok(),
            )
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking panicked: {e}"))??;
        Ok(reachable)
    }
}
