use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;

use rollingdates::clock::{Clock, SystemClock};
use rollingdates::config::{self, StoreBackend};
use rollingdates::db;
use rollingdates::gateway::{HttpFormGateway, SharedGateway};
use rollingdates::routes;
use rollingdates::scheduler;
use rollingdates::state::AppState;
use rollingdates::store::{MemoryStore, PgStore, SharedStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load configuration
    let config = config::Config::from_env().map_err(|e| {
        log::error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!(
        "Starting Rollingdates server on {}:{}",
        config.host,
        config.port
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = build_store(&config, clock.clone()).await?;

    let gateway: SharedGateway = Arc::new(HttpFormGateway::new(&config.gateway).map_err(|e| {
        log::error!("Form service client error: {}", e);
        std::io::Error::other(e.to_string())
    })?);

    let state = AppState {
        store: store.clone(),
        gateway: gateway.clone(),
        clock: clock.clone(),
    };

    // Driving tick
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let tick_handle = if config.tick.enabled {
        Some(scheduler::spawn_tick_loop(
            store,
            gateway,
            clock,
            config.retention.clone(),
            config.tick.clone(),
            shutdown_rx,
        ))
    } else {
        log::warn!("TICK_ENABLED is false, forms will only update on save");
        None
    };

    // Clone values for the closure
    let host = config.host.clone();
    let port = config.port;

    let server = HttpServer::new(move || {
        App::new()
            // Share store handles and config with all handlers
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(config.clone()))
            // Middleware
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            // Health check routes
            .configure(routes::health::configure)
            // API routes
            .configure(routes::forms::configure)
            .configure(routes::configurations::configure)
    })
    .bind((host.as_str(), port))?
    .shutdown_timeout(30)
    .run();

    // Spawn graceful shutdown handler
    let server_handle = server.handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        log::info!("Shutdown signal received, stopping server...");
        server_handle.stop(true).await;
    });

    let result = server.await;

    // Stop the tick loop; unprocessed configurations wait for the next start
    let _ = shutdown_tx.send(true);
    if let Some(handle) = tick_handle {
        if let Err(e) = handle.await {
            log::error!("Tick loop terminated abnormally: {}", e);
        }
    }

    result
}

/// Builds the configured store backend, running migrations for PostgreSQL
async fn build_store(
    config: &config::Config,
    clock: Arc<dyn Clock>,
) -> std::io::Result<SharedStore> {
    match (config.store.backend, &config.store.database) {
        (StoreBackend::Postgres, Some(database)) => {
            // Create database pool
            let db_pool = db::create_pool(database).await.map_err(|e| {
                log::error!("Database pool error: {}", e);
                std::io::Error::other(e.to_string())
            })?;

            // Run migrations
            db::run_migrations(&db_pool).await.map_err(|e| {
                log::error!("Migration error: {}", e);
                std::io::Error::other(e.to_string())
            })?;

            Ok(Arc::new(PgStore::new(db_pool)))
        }
        (StoreBackend::Postgres, None) => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "DATABASE_URL environment variable is required",
        )),
        (StoreBackend::Memory, _) => {
            log::warn!("Using in-memory store, state will not survive restarts");
            Ok(Arc::new(MemoryStore::with_clock(clock)))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {}", e);
                // Wait forever if signal handler fails
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
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
}
