//! Fixline server entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use fixline_agent::{CallRecorder, RetryScheduler};
use fixline_classifier::LeadClassifier;
use fixline_config::{load_settings, Settings};
use fixline_core::TextGenerator;
use fixline_llm::{ClaudeBackend, ClaudeConfig};
use fixline_matcher::BusinessMatcher;
use fixline_persistence::{
    InMemoryBusinessStore, InMemoryCallContextStore, InMemoryCallRecordStore, InMemoryLeadStore,
};
use fixline_pipeline::LeadPipeline;
use fixline_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("FIXLINE_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // tracing not yet initialized, use eprintln for early logging
            eprintln!(
                "Loaded configuration (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting fixline server v{}", env!("CARGO_PKG_VERSION"));

    init_metrics();
    tracing::info!("Prometheus metrics at /metrics");

    // Text-generation backend: everything generative goes through this seam.
    let llm: Arc<dyn TextGenerator> = match ClaudeBackend::new(ClaudeConfig::from(&config.llm)) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::error!("Failed to initialize LLM backend: {}", e);
            std::process::exit(1);
        }
    };

    // Keyed stores. The in-memory backends are the default; the external
    // relational store plugs in behind the same traits.
    let leads = Arc::new(InMemoryLeadStore::new());
    let businesses = Arc::new(InMemoryBusinessStore::new());
    let contexts = Arc::new(InMemoryCallContextStore::new());
    let records = Arc::new(InMemoryCallRecordStore::new());
    let recorder = Arc::new(CallRecorder::new(records, leads.clone()));

    let config = Arc::new(config);
    let pipeline = Arc::new(LeadPipeline::new(
        LeadClassifier::new(llm.clone(), config.classifier.clone()),
        BusinessMatcher::new(businesses.clone(), config.matcher.clone()),
        llm.clone(),
        leads,
        businesses,
        contexts.clone(),
        config.classifier.quality_threshold,
    ));

    // Retry scheduling: due attempts surface on a channel; dialing the
    // re-attempt is the telephony provider integration's job.
    let (retries, mut retry_due) = RetryScheduler::new(config.retry.clone());
    tokio::spawn(async move {
        while let Some(attempt) = retry_due.recv().await {
            tracing::info!(
                call_id = %attempt.call_id,
                attempt = attempt.attempt,
                target = %attempt.context.target_phone,
                "Call retry due"
            );
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(
        config.clone(),
        pipeline,
        contexts,
        recorder,
        llm,
        Arc::new(retries),
        shutdown_rx,
    );

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown: flip the watch so every live session runs its
    // ending path, then stop accepting.
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    drain_sessions(&state).await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Wait for every live session to finish its ending path. No session is
/// abandoned mid-call on shutdown; each one hangs up, summarizes, and
/// persists its outcome before the process exits.
async fn drain_sessions(state: &AppState) {
    let drain_budget = Duration::from_secs(
        state.config.bridge.summary_timeout_secs + state.config.bridge.max_call_duration_secs.min(30),
    );
    let started = std::time::Instant::now();

    while state.sessions.count() > 0 {
        if started.elapsed() > drain_budget {
            tracing::error!(
                remaining = state.sessions.count(),
                "Drain budget exceeded with sessions still live"
            );
            break;
        }
        tracing::info!(active = state.sessions.count(), "Draining live sessions...");
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

/// Initialize tracing with env-filter and optional JSON output
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("fixline={},tower_http=info", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
