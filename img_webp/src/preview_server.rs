//! Preview Server Module
//!
//! Serves a folder over HTTP on an ephemeral local port so the generated
//! reports can be opened in a browser. A [`PreviewServer`] runs at most one
//! listener; starting it again tears the previous one down first.

use crate::{Result, WebpError};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// How long `stop` waits for in-flight requests before aborting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Static files from `folder`; directories resolve to their `index.html`.
pub fn router(folder: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(folder))
        .layer(TraceLayer::new_for_http())
}

struct RunningServer {
    addr: SocketAddr,
    url: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Owned handle to the preview listener.
#[derive(Default)]
pub struct PreviewServer {
    running: Option<RunningServer>,
}

impl PreviewServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `folder` and return its base URL, `http://127.0.0.1:<port>`.
    ///
    /// Any server this handle was running is stopped before the new one binds.
    pub async fn start(&mut self, folder: impl AsRef<Path>) -> Result<String> {
        self.stop().await;

        let folder = folder.as_ref();
        std::fs::read_dir(folder).map_err(|e| {
            WebpError::ServerStart(format!("cannot read {}: {}", folder.display(), e))
        })?;

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(|e| WebpError::ServerStart(format!("no local port available: {}", e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| WebpError::ServerStart(e.to_string()))?;

        let app = router(folder);
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        let url = format!("http://{}", addr);
        info!(folder = %folder.display(), %addr, "Preview server started");

        self.running = Some(RunningServer {
            addr,
            url: url.clone(),
            shutdown,
            task,
        });
        Ok(url)
    }

    /// Stop the listener and wait until its port is released. No-op when idle.
    pub async fn stop(&mut self) {
        let Some(server) = self.running.take() else {
            return;
        };

        let _ = server.shutdown.send(());
        let mut task = server.task;
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(Ok(()))) => debug!(addr = %server.addr, "Preview server stopped"),
            Ok(Ok(Err(e))) => warn!(addr = %server.addr, error = %e, "Preview server exited with error"),
            Ok(Err(e)) => warn!(addr = %server.addr, error = %e, "Preview server task failed"),
            Err(_) => {
                warn!(addr = %server.addr, "Preview server did not stop in time, aborting");
                task.abort();
                let _ = task.await;
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn url(&self) -> Option<&str> {
        self.running.as_ref().map(|s| s.url.as_str())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|s| s.addr)
    }
}

impl Drop for PreviewServer {
    fn drop(&mut self) {
        if let Some(server) = self.running.take() {
            server.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    const IO_TIMEOUT: Duration = Duration::from_secs(5);

    fn site() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.html"), "<h1>gallery</h1>").unwrap();
        fs::create_dir(temp.path().join("conversion_q80")).unwrap();
        fs::write(temp.path().join("conversion_q80/index.html"), "<h1>report</h1>").unwrap();
        temp
    }

    async fn get(addr: SocketAddr, path: &str) -> reqwest::Result<reqwest::Response> {
        // A fresh client per request so no pooled connection outlives a server.
        reqwest::Client::new()
            .get(format!("http://{}{}", addr, path))
            .send()
            .await
    }

    #[tokio::test]
    async fn test_serves_folder_contents() {
        let temp = site();
        let mut server = PreviewServer::new();
        let url = server.start(temp.path()).await.unwrap();
        let addr = server.local_addr().unwrap();

        assert_eq!(url, format!("http://127.0.0.1:{}", addr.port()));
        assert_eq!(server.url(), Some(url.as_str()));

        let root = get(addr, "/").await.unwrap();
        assert!(root.status().is_success());
        assert_eq!(root.text().await.unwrap(), "<h1>gallery</h1>");

        let nested = get(addr, "/conversion_q80/index.html").await.unwrap();
        assert_eq!(nested.text().await.unwrap(), "<h1>report</h1>");

        let missing = get(addr, "/nope.png").await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_restart_tears_down_previous_listener() {
        let temp = site();
        let mut server = PreviewServer::new();

        server.start(temp.path()).await.unwrap();
        let first = server.local_addr().unwrap();

        // One request on a raw keep-alive connection, left idle afterwards.
        let mut conn = TcpStream::connect(first).await.unwrap();
        conn.write_all(b"GET / HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n")
            .await
            .unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !String::from_utf8_lossy(&received).contains("<h1>gallery</h1>") {
            let n = timeout(IO_TIMEOUT, conn.read(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert!(n > 0, "connection closed before the response arrived");
            received.extend_from_slice(&buf[..n]);
        }

        server.start(temp.path()).await.unwrap();
        let second = server.local_addr().unwrap();

        let after_restart = timeout(IO_TIMEOUT, conn.read(&mut buf))
            .await
            .expect("first server still holds its connection");
        assert!(matches!(after_restart, Ok(0) | Err(_)));

        assert!(get(second, "/").await.unwrap().status().is_success());

        server.stop().await;
    }

    #[tokio::test]
    async fn test_stop_releases_port() {
        let temp = site();
        let mut server = PreviewServer::new();
        server.start(temp.path()).await.unwrap();
        let addr = server.local_addr().unwrap();

        server.stop().await;
        assert!(!server.is_running());
        assert!(server.url().is_none());
        assert!(get(addr, "/").await.is_err());

        // Idle stop is a no-op.
        server.stop().await;
    }

    #[tokio::test]
    async fn test_missing_folder_fails_to_start() {
        let temp = TempDir::new().unwrap();
        let mut server = PreviewServer::new();
        let err = server.start(temp.path().join("missing")).await.unwrap_err();

        assert_eq!(err.kind(), shared_utils::ErrorKind::ServerStartError);
        assert!(!server.is_running());
    }
}
