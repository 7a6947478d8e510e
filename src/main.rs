//! clipstore HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use clipstore::config::Config;
use clipstore::encoder::{StubEncoder, TextTokenizer, load_tokenizer, resolve_family};
use clipstore::engine::MatchEngine;
use clipstore::gateway::{HandlerState, create_router_with_state};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        device = %config.device,
        device_id = config.device_id,
        db_path = %config.db_path.display(),
        "clipstore starting"
    );

    if config.image_encoder_path.is_some() || config.text_encoder_path.is_some() {
        tracing::warn!(
            "Encoder model paths are set but no accelerator runtime is linked; using stub encoder"
        );
    } else {
        tracing::warn!("No encoder models configured, running encoder in stub mode");
    }
    let encoder = build_encoder(&config)?;

    let engine = Arc::new(MatchEngine::open(&config, encoder)?);
    tracing::info!(
        records = engine.len(),
        family = %engine.family(),
        "Embedding repository ready"
    );

    let app = create_router_with_state(HandlerState::new(engine));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("clipstore shutdown complete");
    Ok(())
}

/// Stub encoder, with text routed through the configured tokenizer when there is one.
fn build_encoder(config: &Config) -> anyhow::Result<StubEncoder> {
    let encoder = StubEncoder::new(config.feature_dim);

    let Some(path) = &config.tokenizer_path else {
        return Ok(encoder);
    };

    let tokenizer = load_tokenizer(path)?;
    let family = resolve_family(config.model_family, Some(&tokenizer))?;
    tracing::info!(
        tokenizer = %path.display(),
        family = %family,
        "Text framed and tokenized before encoding"
    );

    Ok(encoder.with_tokenizer(TextTokenizer::new(tokenizer, family)))
}

fn run_health_check() -> i32 {
    let port = std::env::var("CLIPSTORE_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
