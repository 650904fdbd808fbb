//! Greenproof HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use greenproof::config::Config;
use greenproof::scoring::FusionConfig;
use greenproof::verification::VerificationOrchestrator;
use greenproof_server::gateway::{HandlerState, create_router_with_state};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!(
        r#"
  ____ ____  _____ _____ _   _ ____  ____   ___   ___  _____
 / ___|  _ \| ____| ____| \ | |  _ \|  _ \ / _ \ / _ \|  ___|
| |  _| |_) |  _| |  _| |  \| | |_) | |_) | | | | | | | |_
| |_| |  _ <| |___| |___| |\  |  __/|  _ <| |_| | |_| |  _|
 \____|_| \_\_____|_____|_| \_|_|   |_| \_\\___/ \___/|_|

        LOOK. ASK. DOUBLE-CHECK.
                                        AGPL-3.0
"#
    );

    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let fusion = FusionConfig::from_env()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        oracle_model = %config.oracle_model,
        "Greenproof starting"
    );

    let orchestrator = Arc::new(VerificationOrchestrator::from_config(&config, fusion)?);

    let similarity = orchestrator.similarity().clone();
    tokio::spawn(async move {
        match similarity.warm_up().await {
            Ok(()) => tracing::info!("Similarity model loaded"),
            Err(e) => tracing::warn!(error = %e, "Similarity warm-up failed; requests will fall back"),
        }
    });

    let state = HandlerState::new(orchestrator, config.is_mock_oracle());
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Greenproof shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var(Config::ENV_PORT)
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
