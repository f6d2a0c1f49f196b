//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use forward_proxy::config::ProxyConfig;
use forward_proxy::net::listener::{Listener, ListenerError};
use forward_proxy::{ProxyServer, Shutdown};

/// Request header blocks received by a mock origin, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<String>>>);

impl Recorded {
    pub fn requests(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, request: String) {
        self.0.lock().unwrap().push(request);
    }
}

/// Start an HTTP/1.0 origin on an ephemeral port that records each request
/// header block and answers with `response` before closing.
pub async fn start_mock_origin(response: &'static [u8]) -> (SocketAddr, Recorded) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Recorded::default();
    let log = recorded.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let log = log.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(socket);
                let mut request = String::new();
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            request.push_str(&line);
                            if line == "\r\n" || line == "\n" {
                                break;
                            }
                        }
                    }
                }
                log.push(request);

                let mut socket = reader.into_inner();
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, recorded)
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A proxy running on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ListenerError>>,
}

impl TestProxy {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Trigger shutdown and wait for the server to stop.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}

/// Start the proxy with `config` on 127.0.0.1 and an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.max_connections).unwrap();

    let shutdown = Shutdown::new();
    let rx: broadcast::Receiver<()> = shutdown.subscribe();
    let handle = tokio::spawn(ProxyServer::new(config).run(listener, rx));

    TestProxy {
        addr,
        shutdown,
        handle,
    }
}

/// Send raw bytes to the proxy and read everything it answers.
pub async fn send_raw(proxy: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("proxy did not close the connection")
        .unwrap();
    response
}
