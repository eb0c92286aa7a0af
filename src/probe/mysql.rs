//! MySQL greeting probe.
//!
//! # Responsibilities
//! - Connect like the TCP probe
//! - Read the initial handshake packet the server sends unprompted
//! - Accept protocol version 10; surface error packets as rejections
//!
//! # Wire Format
//! ```text
//! packet   = len:u24le seq:u8 payload[len]
//! greeting = 0x0a server_version NUL connection_id:u32le ...
//! error    = 0xff code:u16le ['#' sqlstate[5]] message
//! ```
//!
//! # Design Decisions
//! - No authentication: the socket is dropped right after the greeting
//! - A listening socket that never greets counts as not ready

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::probe::{with_timeout, Probe, ProbeError, TcpProbe};

const PROTOCOL_V10: u8 = 0x0a;
const ERR_PACKET: u8 = 0xff;

/// Upper bound on the greeting we are willing to buffer.
const MAX_GREETING_LEN: usize = 64 * 1024;

/// The parts of the server greeting worth logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerGreeting {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct MysqlProbe {
    tcp: TcpProbe,
}

impl MysqlProbe {
    pub fn new(tcp: TcpProbe) -> Self {
        Self { tcp }
    }

    async fn handshake(&self) -> Result<ServerGreeting, ProbeError> {
        let mut stream = self.tcp.connect().await?;
        let payload = read_packet(&mut stream).await?;
        parse_greeting(&payload)
    }
}

impl Probe for MysqlProbe {
    async fn probe(&self) -> Result<(), ProbeError> {
        let greeting = with_timeout(self.tcp.timeout(), self.handshake()).await?;
        tracing::debug!(
            protocol_version = greeting.protocol_version,
            server_version = %greeting.server_version,
            connection_id = ?greeting.connection_id,
            "MySQL server greeted"
        );
        Ok(())
    }

    fn target(&self) -> String {
        self.tcp.target()
    }
}

async fn read_packet(stream: &mut TcpStream) -> Result<Vec<u8>, ProbeError> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.map_err(ProbeError::Io)?;

    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    if len == 0 || len > MAX_GREETING_LEN {
        return Err(ProbeError::Protocol(format!("implausible packet length {}", len)));
    }

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.map_err(ProbeError::Io)?;
    Ok(payload)
}

/// Parse the payload of the first packet a MySQL server sends.
pub fn parse_greeting(payload: &[u8]) -> Result<ServerGreeting, ProbeError> {
    match payload.first() {
        Some(&PROTOCOL_V10) => {
            let rest = &payload[1..];
            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| ProbeError::Protocol("unterminated server version".into()))?;
            let server_version = String::from_utf8_lossy(&rest[..nul]).into_owned();
            let connection_id = rest
                .get(nul + 1..nul + 5)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));

            Ok(ServerGreeting {
                protocol_version: PROTOCOL_V10,
                server_version,
                connection_id,
            })
        }
        Some(&ERR_PACKET) => {
            if payload.len() < 3 {
                return Err(ProbeError::Protocol("truncated error packet".into()));
            }
            let code = u16::from_le_bytes([payload[1], payload[2]]);
            let mut message = &payload[3..];
            if message.first() == Some(&b'#') && message.len() >= 6 {
                message = &message[6..];
            }
            Err(ProbeError::Rejected {
                code,
                message: String::from_utf8_lossy(message).trim().to_string(),
            })
        }
        Some(other) => Err(ProbeError::Protocol(format!(
            "unsupported protocol version {}",
            other
        ))),
        None => Err(ProbeError::Protocol("empty greeting".into())),
    }
}
