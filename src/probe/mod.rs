//! Connectivity probing subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionDescriptor
//!     → tcp.rs (resolve, connect, release)
//!     → mysql.rs (tcp + read the server greeting)
//!     → Ok(()) or ProbeError (transient, retried by the gate)
//! ```
//!
//! # Design Decisions
//! - A probe never authenticates and never writes to the target
//! - Every probe is bounded by a timeout; a timeout is just another failure
//! - Probe kind is chosen at runtime, so `AnyProbe` dispatches statically over
//!   the known kinds instead of boxing

use std::future::Future;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::target::ConnectionDescriptor;

pub mod mysql;
pub mod tcp;

pub use mysql::MysqlProbe;
pub use tcp::TcpProbe;

/// A single failed connectivity check.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} resolved to no addresses")]
    NoAddress(String),

    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),

    #[error("read failed: {0}")]
    Io(#[source] io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("server rejected connection ({code}): {message}")]
    Rejected { code: u16, message: String },

    #[error("unexpected server greeting: {0}")]
    Protocol(String),
}

/// Something that can check whether the target accepts connections.
pub trait Probe: Send + Sync {
    /// Open and immediately release one connection.
    fn probe(&self) -> impl Future<Output = Result<(), ProbeError>> + Send;

    /// Redacted description of the target, used in diagnostics.
    fn target(&self) -> String;
}

/// How much of the datastore's protocol a probe exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// TCP connect only.
    Tcp,
    /// TCP connect plus a valid MySQL server greeting.
    #[default]
    Mysql,
}

impl std::str::FromStr for ProbeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(ProbeKind::Tcp),
            "mysql" => Ok(ProbeKind::Mysql),
            other => Err(format!("unknown probe kind '{}' (expected tcp or mysql)", other)),
        }
    }
}

/// Probe selected from configuration.
#[derive(Debug, Clone)]
pub enum AnyProbe {
    Tcp(TcpProbe),
    Mysql(MysqlProbe),
}

impl AnyProbe {
    pub fn new(kind: ProbeKind, descriptor: &ConnectionDescriptor, timeout: Duration) -> Self {
        let tcp = TcpProbe::new(descriptor, timeout);
        match kind {
            ProbeKind::Tcp => AnyProbe::Tcp(tcp),
            ProbeKind::Mysql => AnyProbe::Mysql(MysqlProbe::new(tcp)),
        }
    }
}

impl Probe for AnyProbe {
    async fn probe(&self) -> Result<(), ProbeError> {
        match self {
            AnyProbe::Tcp(p) => p.probe().await,
            AnyProbe::Mysql(p) => p.probe().await,
        }
    }

    fn target(&self) -> String {
        match self {
            AnyProbe::Tcp(p) => p.target(),
            AnyProbe::Mysql(p) => p.target(),
        }
    }
}

/// Bound a probe step by `limit`.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, ProbeError>>,
) -> Result<T, ProbeError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ProbeError::Timeout(limit))?
}
