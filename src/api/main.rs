use accuread_api::config::Settings;
use accuread_api::middleware::{LogFormat, init_tracing};
use accuread_api::routes::{create_app, create_app_state};
use accuread_api::services::jwt_service::JwtService;
use anyhow::Context;
use std::net::SocketAddr;
use tracing::info;

// Panic hook to catch and log panics
fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred!");
        if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            eprintln!("Panic message: {}", s);
        }
        if let Some(location) = panic_info.location() {
            eprintln!(
                "Panic location: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
    }));
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    setup_panic_hook();

    // RUST_LOG controls the level (default: info), LOG_FORMAT=json for structured output
    init_tracing(LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
    info!("Application starting...");

    let settings = Settings::from_env().context("Invalid configuration")?;
    let jwt_service = JwtService::try_from_env().map_err(|e| anyhow::anyhow!(e))?;

    for policy in settings.policies.iter() {
        info!(
            "Rate limit tier {}: {} requests per {}s",
            policy.tier, policy.max_requests, policy.window_seconds
        );
    }
    info!("Rate limit counting mode: {:?}", settings.counting_mode);

    let app_state = create_app_state(&settings, jwt_service).await;
    info!("Rate limit store backend: {}", app_state.store_backend());

    let app = create_app(app_state, &settings.allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind listener on {}", addr))?;
    info!("Server listening on {} (port {})", addr, settings.port);
    info!("Health check available at http://{}/health", addr);

    // Client addresses feed the fingerprint used for anonymous callers
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM (Docker stop).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}
