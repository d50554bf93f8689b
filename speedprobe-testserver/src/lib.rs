use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::sleep;

pub const PATH_PING: &str = "/ping";
pub const PATH_UPLOAD: &str = "/upload";

/// Largest download file served by default, in KB. Matches the top of the
/// probe's sample ladder.
pub const DEFAULT_MAX_SIZE_KB: u64 = 131072;

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    downloads_total: Arc<AtomicU64>,
    download_bytes_total: Arc<AtomicU64>,
    uploads_total: Arc<AtomicU64>,
    upload_bytes_total: Arc<AtomicU64>,
    pings_total: Arc<AtomicU64>,
    not_found_total: Arc<AtomicU64>,
}

impl TestServerStats {
    pub fn downloads_total(&self) -> u64 {
        self.downloads_total.load(Ordering::Relaxed)
    }

    pub fn download_bytes_total(&self) -> u64 {
        self.download_bytes_total.load(Ordering::Relaxed)
    }

    pub fn uploads_total(&self) -> u64 {
        self.uploads_total.load(Ordering::Relaxed)
    }

    pub fn upload_bytes_total(&self) -> u64 {
        self.upload_bytes_total.load(Ordering::Relaxed)
    }

    pub fn pings_total(&self) -> u64 {
        self.pings_total.load(Ordering::Relaxed)
    }

    pub fn not_found_total(&self) -> u64 {
        self.not_found_total.load(Ordering::Relaxed)
    }
}

/// Behavior knobs for tests: cap the served file sizes (a zero cap makes
/// every download 404) and add an artificial per-request delay.
#[derive(Debug, Clone)]
pub struct TestServerConfig {
    pub max_size_kb: u64,
    pub response_delay: Duration,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            max_size_kb: DEFAULT_MAX_SIZE_KB,
            response_delay: Duration::ZERO,
        }
    }
}

#[derive(Clone)]
struct ServerState {
    stats: TestServerStats,
    config: Arc<TestServerConfig>,
}

/// Parse a ladder filename like `128KB.bin` into its size in KB.
fn parse_file_size_kb(name: &str) -> Option<u64> {
    let rest = name.strip_suffix("KB.bin")?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

async fn handle_file(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> (StatusCode, Bytes) {
    if !state.config.response_delay.is_zero() {
        sleep(state.config.response_delay).await;
    }

    let size_kb = match parse_file_size_kb(&name) {
        Some(v) if v > 0 && v <= state.config.max_size_kb => v,
        _ => {
            state.stats.not_found_total.fetch_add(1, Ordering::Relaxed);
            return (StatusCode::NOT_FOUND, Bytes::new());
        }
    };

    let bytes = (size_kb * 1024) as usize;
    state.stats.downloads_total.fetch_add(1, Ordering::Relaxed);
    state
        .stats
        .download_bytes_total
        .fetch_add(bytes as u64, Ordering::Relaxed);

    (StatusCode::OK, Bytes::from(vec![0u8; bytes]))
}

async fn handle_upload(State(state): State<ServerState>, body: Bytes) -> StatusCode {
    if !state.config.response_delay.is_zero() {
        sleep(state.config.response_delay).await;
    }

    state.stats.uploads_total.fetch_add(1, Ordering::Relaxed);
    state
        .stats
        .upload_bytes_total
        .fetch_add(body.len() as u64, Ordering::Relaxed);

    StatusCode::OK
}

async fn handle_ping(State(state): State<ServerState>) -> &'static str {
    state.stats.pings_total.fetch_add(1, Ordering::Relaxed);
    "pong"
}

pub fn router(stats: TestServerStats, config: TestServerConfig) -> Router {
    let state = ServerState {
        stats,
        config: Arc::new(config),
    };

    Router::new()
        .route("/files/{name}", get(handle_file))
        .route(PATH_UPLOAD, post(handle_upload))
        .route(PATH_PING, get(handle_ping))
        .with_state(state)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerConfig::default()).await
    }

    pub async fn start_with(config: TestServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone(), config);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        let base_url = format!("http://{addr}");

        Ok(Self {
            addr,
            base_url,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_parse_to_sizes() {
        assert_eq!(parse_file_size_kb("128KB.bin"), Some(128));
        assert_eq!(parse_file_size_kb("131072KB.bin"), Some(131072));
        assert_eq!(parse_file_size_kb("KB.bin"), None);
        assert_eq!(parse_file_size_kb("12MB.bin"), None);
        assert_eq!(parse_file_size_kb("abcKB.bin"), None);
        assert_eq!(parse_file_size_kb("128kb.bin"), None);
    }
}
