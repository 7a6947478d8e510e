//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use clipstore::gateway::{HandlerState, create_router_with_state};
use clipstore::{EmbeddingRepository, MatchEngine, ModelFamily, RedbLog, StubEncoder};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub type TestEngine = MatchEngine<RedbLog, StubEncoder>;

pub const TEST_DIM: usize = 16;

/// Unit vector with most weight on `hot` and a little spread elsewhere.
pub fn feature(hot: usize, dim: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dim).map(|i| 0.01 * (i as f32 + 1.0)).collect();
    v[hot % dim] = 1.0;
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

pub fn open_engine(dir: &TempDir, family: ModelFamily) -> TestEngine {
    let log = RedbLog::open(dir.path()).expect("open log");
    let repository = EmbeddingRepository::open(log, Some(TEST_DIM)).expect("open repository");
    MatchEngine::new(repository, StubEncoder::new(TEST_DIM), family).expect("engine")
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub engine: Arc<TestEngine>,
    pub _dir: TempDir,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_test_server(family: ModelFamily) -> TestServer {
    let dir = TempDir::new().expect("temp dir");
    let engine = Arc::new(open_engine(&dir, family));
    let app = create_router_with_state(HandlerState::new(Arc::clone(&engine)));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        addr,
        engine,
        _dir: dir,
        handle,
    }
}
