//! Test server harness.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use greenproof::{
    ChallengeRegistry, CrossExaminationEngine, DuplicateLedger, FusionEngine, MockOracle,
    MockSimilarityModel, SimilarityScorer, VerificationOrchestrator,
};
use greenproof_server::gateway::{HandlerState, create_router_with_state};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

pub struct TestServerConfig {
    pub port: u16,
    pub similarity_score: f32,
    pub oracle: MockOracle,
    pub with_ledger: bool,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            similarity_score: 0.82,
            oracle: MockOracle::approving(),
            with_ledger: true,
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub oracle: Arc<MockOracle>,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

/// Spawns a server whose similarity model and oracle are both scripted.
///
/// No model weights or network credentials are needed.
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let registry = ChallengeRegistry::builtin()
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;
    let oracle = Arc::new(config.oracle);
    let scorer = SimilarityScorer::with_model(
        Arc::new(MockSimilarityModel::with_top_score(config.similarity_score)),
        Duration::from_secs(5),
    );
    let cross_exam =
        CrossExaminationEngine::new(oracle.clone()).with_timeout(Duration::from_secs(5));

    let mut orchestrator = VerificationOrchestrator::new(
        Arc::new(registry),
        scorer,
        cross_exam,
        FusionEngine::default(),
    );
    if config.with_ledger {
        orchestrator = orchestrator.with_ledger(DuplicateLedger::new());
    }

    let state = HandlerState::new(Arc::new(orchestrator), true);
    let app = create_router_with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        oracle,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
