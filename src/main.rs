//! Game Rental Backend Server
//!
//! HTTP API for the game rental marketplace: listings, bookings, payments
//! through an external gateway, and the admin back office.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use game_rental_server::config::{Config, GatewayKind};
use game_rental_server::notify::{
    EmailSender, LogSender, Notifier, RetryPolicy, SendGridSender,
};
use game_rental_server::payment::{MidtransGateway, MockGateway, PaymentGateway};
use game_rental_server::state::AppState;
use game_rental_server::store::SharedStore;
use game_rental_server::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting server");

    let store: SharedStore = Arc::new(db::open_store(&config).await?);

    let gateway: Arc<dyn PaymentGateway> = match config.payment_provider {
        GatewayKind::Midtrans => {
            let server_key = config
                .midtrans_server_key
                .clone()
                .context("MIDTRANS_SERVER_KEY is required for the midtrans provider")?;
            Arc::new(MidtransGateway::new(
                config.midtrans_base_url.clone(),
                server_key,
            )?)
        }
        GatewayKind::Mock => {
            tracing::warn!("Using mock payment gateway; every webhook signature is accepted");
            Arc::new(MockGateway::default())
        }
    };

    let email_sender: Arc<dyn EmailSender> = match config.sendgrid_api_key.clone() {
        Some(api_key) => Arc::new(SendGridSender::new(api_key, config.email_from.clone())),
        None => {
            tracing::warn!("SENDGRID_API_KEY not set, emails will only be logged");
            Arc::new(LogSender)
        }
    };
    let (notifier, _notify_worker) = Notifier::spawn(
        email_sender,
        config.notify_queue_capacity,
        RetryPolicy::with_max_retries(config.notify_max_retries),
    );

    let app_state = AppState::new(
        store,
        gateway,
        notifier,
        config.jwt_secret.clone(),
        config.jwt_access_token_ttl_seconds,
    );

    let app = routes::api_router(app_state).layer(configure_cors(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed = config.cors_allowed_origins.as_deref().unwrap_or_default();

    if allowed.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
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
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
