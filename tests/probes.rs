//! Gate behaviour against real sockets.

use std::num::NonZeroU32;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use startup_gate::probe::{AnyProbe, ProbeKind};
use startup_gate::{ConnectionDescriptor, GateError, Probe, ProbeError, ReadinessGate, RetryPolicy};
use tokio::net::TcpListener;

mod common;

fn probe(kind: ProbeKind, addr: std::net::SocketAddr) -> AnyProbe {
    let descriptor = ConnectionDescriptor::parse(&format!("Server={};Port={}", addr.ip(), addr.port())).unwrap();
    AnyProbe::new(kind, &descriptor, Duration::from_millis(500))
}

fn policy(max: u32, delay_ms: u64) -> RetryPolicy {
    RetryPolicy::new(NonZeroU32::new(max).unwrap(), Duration::from_millis(delay_ms))
}

#[tokio::test]
async fn test_mysql_probe_accepts_greeting() {
    let (addr, accepted) = common::start_mock_server(common::mysql_greeting("8.4.0", 7)).await;

    assert!(probe(ProbeKind::Mysql, addr).probe().await.is_ok());
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_mysql_probe_surfaces_rejection() {
    let (addr, _) = common::start_mock_server(common::mysql_error(1040, "Too many connections")).await;

    match probe(ProbeKind::Mysql, addr).probe().await {
        Err(ProbeError::Rejected { code, message }) => {
            assert_eq!(code, 1040);
            assert_eq!(message, "Too many connections");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mysql_probe_times_out_on_silent_server() {
    // Accepts but never greets.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let err = probe(ProbeKind::Mysql, addr).probe().await.unwrap_err();
    assert!(matches!(err, ProbeError::Timeout(_)), "unexpected error: {err}");

    // A plain TCP probe is satisfied by the same server.
    assert!(probe(ProbeKind::Tcp, addr).probe().await.is_ok());
}

#[tokio::test]
async fn test_gate_waits_for_late_database() {
    let addr = common::unused_addr().await;
    common::start_mysql_after(addr, Duration::from_millis(300));

    let gate = ReadinessGate::new(probe(ProbeKind::Mysql, addr), policy(50, 50));
    let report = gate.wait().await.expect("database came up within budget");

    assert!(report.attempts > 1, "first attempt should have failed");
    assert!(report.attempts <= 50);
}

#[tokio::test]
async fn test_gate_exhausts_against_closed_port() {
    let addr = common::unused_addr().await;

    let gate = ReadinessGate::new(probe(ProbeKind::Tcp, addr), policy(3, 100));
    let started = Instant::now();
    let err = gate.wait().await.unwrap_err();

    match err {
        GateError::Exhausted { attempts, last_error, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last_error, Some(ProbeError::Connect(_))));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    // Two delays between three attempts.
    assert!(started.elapsed() >= Duration::from_millis(200));
}
