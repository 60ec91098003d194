//! Shared utilities for integration testing.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock backend that answers every request with 200 and a body
/// echoing the request line (`METHOD PATH`) plus the received
/// `X-Forwarded-Host` header, if any.
pub async fn start_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let mut head = Vec::new();

                        // Read until the end of the request head; the
                        // proxied requests in these tests have no body.
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) => return,
                                Ok(n) => {
                                    head.extend_from_slice(&buf[..n]);
                                    if head.windows(4).any(|w| w == b"\r\n\r\n") {
                                        break;
                                    }
                                }
                                Err(_) => return,
                            }
                        }

                        let head = String::from_utf8_lossy(&head);
                        let mut lines = head.lines();
                        let request_line = lines.next().unwrap_or_default();
                        let (method_and_path, _) =
                            request_line.rsplit_once(' ').unwrap_or((request_line, ""));

                        let forwarded_host = lines
                            .filter_map(|line| line.split_once(": "))
                            .find(|(name, _)| name.eq_ignore_ascii_case("x-forwarded-host"))
                            .map(|(_, value)| value)
                            .unwrap_or_default();

                        let body = format!("{method_and_path}|{forwarded_host}");
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
