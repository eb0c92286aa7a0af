//! Plain TCP reachability probe.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, TcpStream};

use crate::probe::{with_timeout, Probe, ProbeError};
use crate::target::ConnectionDescriptor;

/// Connects to the target and drops the socket.
///
/// DNS is resolved on every attempt: under Compose the service name only
/// resolves once the dependency container exists.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
    label: String,
}

impl TcpProbe {
    pub fn new(descriptor: &ConnectionDescriptor, timeout: Duration) -> Self {
        let (host, port) = descriptor.address();
        Self {
            host: host.to_string(),
            port,
            timeout,
            label: descriptor.to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve and connect, trying each resolved address in order.
    pub(crate) async fn connect(&self) -> Result<TcpStream, ProbeError> {
        let addrs: Vec<SocketAddr> = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|source| ProbeError::Resolve {
                host: self.host.clone(),
                source,
            })?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    tracing::trace!(address = %addr, "Probe connected");
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::trace!(address = %addr, error = %e, "Probe address refused");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => ProbeError::Connect(e),
            None => ProbeError::NoAddress(self.host.clone()),
        })
    }
}

impl Probe for TcpProbe {
    async fn probe(&self) -> Result<(), ProbeError> {
        let stream = with_timeout(self.timeout, self.connect()).await?;
        drop(stream);
        Ok(())
    }

    fn target(&self) -> String {
        self.label.clone()
    }
}
