use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geotax::application::handlers::order_handler::{self, AppState};
use geotax::application::services::import_engine::ImportEngine;
use geotax::application::services::import_service::ImportService;
use geotax::application::services::order_pricer::OrderPricer;
use geotax::application::services::order_service::OrderService;
use geotax::application::services::session_registry::SessionRegistry;
use geotax::config::{ImportConfig, ResolverStrategy};
use geotax::domain::services::jurisdiction_resolver::{
    BoundingBoxResolver, JurisdictionResolver, LookupResolver,
};
use geotax::infrastructure::fips_lookup_client::FipsLookupClient;
use geotax::persistence::repository::OrderRepository;
use geotax::persistence::{init_database, DatabaseConfig};

/// Largest CSV body accepted by the import endpoints
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geotax=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ImportConfig::from_env();
    let db_config = DatabaseConfig::from_env();
    info!("GeoTax server starting with {:?} resolver", config.resolver_strategy);

    let pool = init_database(&db_config).await?;
    let store = Arc::new(OrderRepository::new(pool));

    let resolver: Arc<dyn JurisdictionResolver> = match config.resolver_strategy {
        ResolverStrategy::BoundingBox => Arc::new(BoundingBoxResolver::new()),
        ResolverStrategy::FipsLookup => {
            let client = FipsLookupClient::new(&config)?;
            info!("Using FIPS lookup at {}", config.lookup_base_url);
            Arc::new(LookupResolver::new(Arc::new(client), config.lookup_timeout()))
        }
    };

    let pricer = Arc::new(OrderPricer::new(resolver));
    let engine = Arc::new(
        ImportEngine::new(pricer.clone(), store.clone())
            .with_chunk_size(config.chunk_size)
            .with_max_error_samples(config.max_error_samples),
    );
    let registry = Arc::new(SessionRegistry::new());

    let state = AppState {
        orders: OrderService::new(pricer, store),
        imports: ImportService::new(engine, registry).with_event_buffer(config.event_buffer),
    };

    let app = Router::new()
        .route("/health", get(order_handler::health_check))
        .route("/jurisdictions/resolve", get(order_handler::resolve_jurisdiction))
        .route("/tax/quote", get(order_handler::quote_tax))
        .route(
            "/orders",
            get(order_handler::list_orders).post(order_handler::create_order),
        )
        .route("/orders/:id", get(order_handler::get_order))
        .route("/orders/import", post(order_handler::import_orders))
        .route("/orders/import/stream", post(order_handler::import_orders_stream))
        .route(
            "/orders/import/:session_id/cancel",
            post(order_handler::cancel_import),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state);

    info!("Listening on {}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    let server = axum::serve(listener, app);

    let shutdown_signal = async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => error!("Failed to install SIGTERM handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    info!("Server started successfully. Press Ctrl+C to stop.");
    server.with_graceful_shutdown(shutdown_signal).await?;

    info!("Shutdown complete");
    Ok(())
}
