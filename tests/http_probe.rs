// tests/http_probe.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use e2e_harness::probe::{HttpHealthCheck, ProbeConfig, ProbeOutcome, ReadinessProbe};
use e2e_harness_test_utils::builders::ProbeConfigBuilder;
use e2e_harness_test_utils::free_port;

type TestResult = Result<(), Box<dyn Error>>;

/// Minimal HTTP server answering every request with `status_line`.
/// Returns the port and the request lines it received.
async fn spawn_server(status_line: &'static str) -> std::io::Result<(u16, Arc<Mutex<Vec<String>>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    Ok((port, serve(listener, status_line)))
}

fn serve(listener: TcpListener, status_line: &'static str) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 2048];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let first_line = request.lines().next().unwrap_or_default().to_string();
                recorded.lock().unwrap().push(first_line);

                let response = format!(
                    "HTTP/1.1 {status_line}\r\nLocation: /accounts/login/\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    seen
}

fn http_probe(config: ProbeConfig) -> ReadinessProbe<HttpHealthCheck> {
    let check = HttpHealthCheck::new(config.attempt_timeout).expect("building HTTP client");
    ReadinessProbe::new(config, check)
}

#[tokio::test]
async fn ok_response_is_ready_and_uses_head() -> TestResult {
    init_tracing();
    let (port, seen) = spawn_server("200 OK").await?;

    let config = ProbeConfigBuilder::new(port).path("/heartbeat/").build();
    let outcome = with_timeout(http_probe(config).probe()).await;

    assert_eq!(
        outcome,
        ProbeOutcome::Ready {
            status: 200,
            attempts: 1
        }
    );
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("HEAD /heartbeat/ "), "got {:?}", seen[0]);
    Ok(())
}

#[tokio::test]
async fn redirect_is_observed_not_followed() -> TestResult {
    init_tracing();
    let (port, seen) = spawn_server("302 Found").await?;

    let outcome = with_timeout(http_probe(ProbeConfigBuilder::new(port).build()).probe()).await;

    assert_eq!(
        outcome,
        ProbeOutcome::Ready {
            status: 302,
            attempts: 1
        }
    );
    // Following the Location header would have produced a second request.
    assert_eq!(seen.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn server_error_is_unhealthy() -> TestResult {
    init_tracing();
    let (port, _seen) = spawn_server("500 Internal Server Error").await?;

    let outcome = with_timeout(http_probe(ProbeConfigBuilder::new(port).build()).probe()).await;

    assert_eq!(
        outcome,
        ProbeOutcome::Unhealthy {
            status: 500,
            attempts: 1
        }
    );
    Ok(())
}

#[tokio::test]
async fn closed_port_exhausts_retries() -> TestResult {
    init_tracing();
    let port = free_port();

    let config = ProbeConfigBuilder::new(port).max_attempts(3).build();
    let outcome = with_timeout(http_probe(config).probe()).await;

    assert!(
        matches!(outcome, ProbeOutcome::RetriesExhausted { attempts: 3, .. }),
        "got {outcome:?}"
    );
    Ok(())
}

#[tokio::test]
async fn silent_server_times_out() -> TestResult {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    // Accept connections and never answer.
    let held = Arc::new(Mutex::new(Vec::new()));
    let keep = Arc::clone(&held);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            keep.lock().unwrap().push(socket);
        }
    });

    let config = ProbeConfigBuilder::new(port)
        .attempt_timeout(Duration::from_millis(300))
        .build();
    let outcome = with_timeout(http_probe(config).probe()).await;

    assert!(
        matches!(outcome, ProbeOutcome::TimedOut { attempts: 1, .. }),
        "got {outcome:?}"
    );
    Ok(())
}

#[tokio::test]
async fn server_coming_up_late_is_picked_up() -> TestResult {
    init_tracing();
    let port = free_port();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            serve(listener, "200 OK");
        }
    });

    let config = ProbeConfigBuilder::new(port)
        .max_attempts(100)
        .backoff(Duration::from_millis(50))
        .build();
    let outcome = with_timeout(http_probe(config).probe()).await;

    match outcome {
        ProbeOutcome::Ready { status, attempts } => {
            assert_eq!(status, 200);
            assert!(attempts > 1, "expected refused attempts before readiness");
        }
        other => panic!("expected Ready, got {other:?}"),
    }
    Ok(())
}
