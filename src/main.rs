use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderName, StatusCode};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use classifieds_api::{
    AppState, Config,
    database::create_pool,
    middleware::Throttle,
    repository::{
        AdvertisementRepository, AdvertisementStore, FavoriteRepository, FavoriteStore,
        UserRepository, UserStore,
    },
    routes,
    services::{AdvertisementService, AuthService},
    telemetry::{HttpMakeSpan, HttpOnResponse, X_REQUEST_ID, init_telemetry},
};

const THROTTLE_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        anon_rate = config.anon_rate.requests,
        user_rate = config.user_rate.requests,
        "Starting server"
    );

    let pool = create_pool(&config).await?;

    let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(pool.clone()));
    let advertisements: Arc<dyn AdvertisementStore> =
        Arc::new(AdvertisementRepository::new(pool.clone()));
    let favorites: Arc<dyn FavoriteStore> = Arc::new(FavoriteRepository::new(pool.clone()));

    let auth_service = AuthService::new(users, &config);
    let advertisement_service = AdvertisementService::new(advertisements, favorites);
    let throttle = Arc::new(Throttle::new(config.anon_rate, config.user_rate));

    tokio::spawn(prune_throttle(throttle.clone()));

    let state = AppState {
        pool,
        auth_service,
        advertisement_service,
        throttle,
    };

    let request_id = HeaderName::from_static(X_REQUEST_ID);

    let app = routes::create_router(state)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(HttpMakeSpan)
                .on_response(HttpOnResponse),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    telemetry_guard.shutdown();

    Ok(())
}

async fn prune_throttle(throttle: Arc<Throttle>) {
    let mut interval = tokio::time::interval(THROTTLE_PRUNE_INTERVAL);
    loop {
        interval.tick().await;
        throttle.prune(Instant::now());
        tracing::debug!(clients = throttle.tracked_clients(), "Pruned throttle history");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
