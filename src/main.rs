use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_dispatch::clock::SystemClock;
use campus_dispatch::config::ServiceConfig;
use campus_dispatch::directory::{Fleet, Roster};
use campus_dispatch::lifecycle::DispatchEngine;
use campus_dispatch::notify::{ChannelNotifier, run_notification_relay};
use campus_dispatch::server::{AppState, build_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_dispatch=debug,axum=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();

    let roster = Arc::new(Roster::new());
    let fleet = Arc::new(Fleet::new());
    let (notifier, notifications) = ChannelNotifier::new();
    let engine = Arc::new(DispatchEngine::new(
        roster.clone(),
        fleet.clone(),
        Arc::new(SystemClock),
        Arc::new(notifier),
    ));

    let shutdown = CancellationToken::new();
    let relay = tokio::spawn(run_notification_relay(notifications, shutdown.clone()));

    let app = build_router(AppState::new(engine, roster, fleet));

    let addr = config.bind_addr();
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                tokio::signal::ctrl_c().await.ok();
                tracing::info!("shutdown signal received");
                shutdown.cancel();
            }
        })
        .await
        .unwrap();

    shutdown.cancel();
    relay.await.unwrap();
}
