use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use super::FrameTelemetry;

const MAX_REQUEST_HEAD: usize = 4096;
const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Loop side of the telemetry channel. Publishing never blocks.
///
/// Dropping the last publisher stops the listener.
#[derive(Debug, Clone)]
pub struct TelemetryPublisher {
    tx: watch::Sender<FrameTelemetry>,
}

impl TelemetryPublisher {
    pub fn publish(&self, snapshot: FrameTelemetry) {
        self.tx.send_replace(snapshot);
    }
}

/// Listener thread handle.
#[derive(Debug)]
pub struct DiagnosticsHandle {
    addr: SocketAddr,
    thread: Option<JoinHandle<()>>,
}

impl DiagnosticsHandle {
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for the listener to exit. Drop every publisher first.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("diagnostics thread panicked");
            }
        }
    }
}

/// Binds `addr` and starts the listener thread.
///
/// Binding happens before returning, so an address in use is reported here.
pub fn spawn(addr: &str) -> Result<(TelemetryPublisher, DiagnosticsHandle)> {
    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind diagnostics listener on {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to make diagnostics listener non-blocking")?;
    let local = listener
        .local_addr()
        .context("diagnostics listener has no local address")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .context("failed to build diagnostics runtime")?;

    let (tx, rx) = watch::channel(FrameTelemetry::default());

    let thread = std::thread::Builder::new()
        .name("ember-diagnostics".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                match TcpListener::from_std(listener) {
                    Ok(listener) => serve(listener, rx).await,
                    Err(e) => log::warn!("diagnostics listener unusable: {e}"),
                }
            });
        })
        .context("failed to spawn diagnostics thread")?;

    log::info!("diagnostics listening on http://{local}/telemetry");

    Ok((
        TelemetryPublisher { tx },
        DiagnosticsHandle {
            addr: local,
            thread: Some(thread),
        },
    ))
}

async fn serve(listener: TcpListener, mut rx: watch::Receiver<FrameTelemetry>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let snapshot = rx.borrow().clone();
                    tokio::spawn(async move {
                        if let Err(e) = respond(stream, &snapshot).await {
                            log::debug!("diagnostics request from {peer} failed: {e:#}");
                        }
                    });
                }
                Err(e) => log::warn!("diagnostics accept failed: {e}"),
            },
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    log::debug!("diagnostics listener stopped");
}

async fn respond(mut stream: TcpStream, snapshot: &FrameTelemetry) -> Result<()> {
    let head = tokio::time::timeout(IO_TIMEOUT, read_head(&mut stream))
        .await
        .context("timed out reading request")??;

    let request_line = head.lines().next().unwrap_or_default();
    let response = route(request_line, snapshot);

    tokio::time::timeout(IO_TIMEOUT, stream.write_all(response.to_bytes().as_slice()))
        .await
        .context("timed out writing response")??;
    stream.shutdown().await.ok();
    Ok(())
}

async fn read_head(stream: &mut TcpStream) -> Result<String> {
    let mut buf = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];

    while buf.len() < MAX_REQUEST_HEAD {
        let n = stream.read(&mut chunk).await.context("read failed")?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[derive(Debug, PartialEq)]
struct Response {
    status: &'static str,
    content_type: &'static str,
    body: String,
}

impl Response {
    fn text(status: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.to_string(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

fn route(request_line: &str, snapshot: &FrameTelemetry) -> Response {
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();
    let path = path.split('?').next().unwrap_or_default();

    if method != "GET" {
        return Response::text("405 Method Not Allowed", "method not allowed\n");
    }

    match path {
        "/" | "/telemetry" => match serde_json::to_string(snapshot) {
            Ok(body) => Response {
                status: "200 OK",
                content_type: "application/json",
                body,
            },
            Err(e) => Response::text("500 Internal Server Error", &format!("{e}\n")),
        },
        _ => Response::text("404 Not Found", "not found\n"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpStream as StdTcpStream;
    use std::time::Instant;

    use super::*;

    fn snapshot(frame: u64) -> FrameTelemetry {
        FrameTelemetry {
            frame,
            state: "running",
            ..FrameTelemetry::default()
        }
    }

    // ── routing ─────────────────────────────────────────────────────────────

    #[test]
    fn telemetry_paths_return_json() {
        for line in ["GET / HTTP/1.1", "GET /telemetry HTTP/1.1", "GET /telemetry?x=1 HTTP/1.0"] {
            let r = route(line, &snapshot(7));
            assert_eq!(r.status, "200 OK");
            assert_eq!(r.content_type, "application/json");
            assert!(r.body.contains("\"frame\":7"));
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert_eq!(route("GET /debug/pprof HTTP/1.1", &snapshot(0)).status, "404 Not Found");
    }

    #[test]
    fn non_get_is_rejected() {
        assert_eq!(
            route("POST /telemetry HTTP/1.1", &snapshot(0)).status,
            "405 Method Not Allowed"
        );
        assert_eq!(route("", &snapshot(0)).status, "405 Method Not Allowed");
    }

    // ── listener ────────────────────────────────────────────────────────────

    #[test]
    fn serves_latest_snapshot_and_stops_with_publisher() {
        let (publisher, handle) = spawn("127.0.0.1:0").unwrap();
        publisher.publish(snapshot(42));

        let mut stream = StdTcpStream::connect(handle.local_addr()).unwrap();
        stream
            .write_all(b"GET /telemetry HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("\"frame\":42"));

        drop(publisher);
        handle.join();
    }

    #[test]
    fn idle_client_does_not_hold_up_other_requests() {
        let (publisher, handle) = spawn("127.0.0.1:0").unwrap();
        publisher.publish(snapshot(7));

        // Connects and never sends a request.
        let idle = StdTcpStream::connect(handle.local_addr()).unwrap();

        let started = Instant::now();
        let mut stream = StdTcpStream::connect(handle.local_addr()).unwrap();
        stream.set_read_timeout(Some(IO_TIMEOUT / 2)).unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();

        assert!(response.contains("\"frame\":7"));
        assert!(started.elapsed() < IO_TIMEOUT);

        drop(idle);
        drop(publisher);
        handle.join();
    }

    #[test]
    fn bind_failure_is_reported() {
        let (_publisher, handle) = spawn("127.0.0.1:0").unwrap();
        let taken = handle.local_addr().to_string();
        assert!(spawn(&taken).is_err());
    }
}
