//! Shared mock servers for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// A local address nothing listens on.
///
/// Only for tests that need the port closed for a while; servers that can
/// start right away bind their own listener via [`start_mock_server`].
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Encode a MySQL protocol v10 greeting packet.
pub fn mysql_greeting(version: &str, connection_id: u32) -> Vec<u8> {
    let mut payload = vec![0x0a];
    payload.extend_from_slice(version.as_bytes());
    payload.push(0);
    payload.extend_from_slice(&connection_id.to_le_bytes());
    payload.extend_from_slice(b"abcdefgh\0");
    packet(&payload)
}

/// Encode a MySQL error packet as sent instead of a greeting.
#[allow(dead_code)]
pub fn mysql_error(code: u16, message: &str) -> Vec<u8> {
    let mut payload = vec![0xff];
    payload.extend_from_slice(&code.to_le_bytes());
    payload.extend_from_slice(message.as_bytes());
    packet(&payload)
}

fn packet(payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u32;
    let mut out = len.to_le_bytes()[..3].to_vec();
    out.push(0);
    out.extend_from_slice(payload);
    out
}

/// Start a server on an ephemeral port that writes `bytes` to every
/// connection, then closes it.
///
/// Returns the bound address and a counter of accepted connections.
#[allow(dead_code)]
pub async fn start_mock_server(bytes: Vec<u8>) -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, serve(listener, bytes))
}

/// Start a fake MySQL server on `addr` after `delay`.
#[allow(dead_code)]
pub fn start_mysql_after(addr: SocketAddr, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let listener = TcpListener::bind(addr).await.unwrap();
        serve(listener, mysql_greeting("8.0.36", 1));
    });
}

fn serve(listener: TcpListener, bytes: Vec<u8>) -> Arc<AtomicU32> {
    let accepted = Arc::new(AtomicU32::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let bytes = bytes.clone();
            tokio::spawn(async move {
                let _ = socket.write_all(&bytes).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    accepted
}
