use pagecast_service::{
    config::Config,
    create_app,
    shutdown::{GracefulShutdownLayer, ShutdownState},
};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pagecast_service=debug".parse().unwrap()),
        )
        .init();

    let config = Config::from_env().unwrap_or_else(|err| {
        error!(error = %err, "Invalid configuration");
        std::process::exit(1);
    });

    let app_state = config.connect().unwrap_or_else(|err| {
        error!(error = %err, "Failed to set up collaborators");
        std::process::exit(1);
    });

    info!(
        store_url = %config.store_url,
        media_bucket = %config.media_bucket,
        "Collaborators configured"
    );

    let shutdown_state = ShutdownState::new();

    let app = create_app(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(GracefulShutdownLayer::new(shutdown_state.clone()))
            .layer(TimeoutLayer::new(config.request_timeout)),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .unwrap_or_else(|err| {
            error!(bind_address = %config.bind_address, error = %err, "Failed to bind to address");
            std::process::exit(1);
        });

    info!(bind_address = %config.bind_address, "Server running");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_state));

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal(shutdown_state: ShutdownState) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
    let shutdown_completed = shutdown_state.completed();
    shutdown_state.start_shutdown();

    shutdown_completed.await;
    info!(
        in_flight = shutdown_state.in_flight_count(),
        "Graceful shutdown completed"
    );
}
