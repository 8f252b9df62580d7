//! Catalog server entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use catalog_api::{middleware::AppState, router as api_router};
use catalog_common::{Config, LocalStorage, StorageBackend};
use catalog_core::{
    AuthService, BulkUploadService, CategoryService, ProductService, ReportService, UserService,
};
use catalog_db::repositories::{
    CategoryRepository, ProductRepository, ReportJobRepository, UploadJobRepository,
    UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Request bodies above this size are rejected with 413.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolves when SIGINT or SIGTERM arrives. SIGTERM only exists on Unix;
/// elsewhere Ctrl+C is the only trigger.
async fn shutdown_signal() {
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
        result = signal::ctrl_c() => {
            result.expect("failed to install Ctrl+C handler");
            info!("Received SIGINT, shutting down...");
        }
        () = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "catalog_server=debug,catalog_api=debug,catalog_core=debug,catalog_db=debug,tower_http=debug".into()
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting catalog-rs server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = catalog_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    catalog_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize file storage
    let storage_root = PathBuf::from(&config.storage.root);
    tokio::fs::create_dir_all(&storage_root).await?;
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(
        storage_root.clone(),
        config.storage.base_url.clone(),
    ));
    info!("File storage at {}", storage_root.display());

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let category_repo = CategoryRepository::new(Arc::clone(&db));
    let product_repo = ProductRepository::new(Arc::clone(&db));
    let upload_job_repo = UploadJobRepository::new(Arc::clone(&db));
    let report_job_repo = ReportJobRepository::new(Arc::clone(&db));

    // Initialize services
    let user_service = UserService::new(user_repo);
    let auth_service = AuthService::new(user_service.clone(), &config);
    let category_service = CategoryService::new(category_repo.clone());
    let product_service = ProductService::new(product_repo.clone(), category_repo.clone());
    let bulk_upload_service = BulkUploadService::new(
        upload_job_repo,
        product_repo.clone(),
        category_repo,
        Arc::clone(&storage),
    );
    let report_service = ReportService::new(report_job_repo, product_repo, Arc::clone(&storage));

    // Create app state
    let state = AppState {
        auth_service,
        user_service,
        category_service,
        product_service,
        bulk_upload_service,
        report_service,
        storage,
    };

    // Build router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", api_router())
        .nest_service("/uploads", ServeDir::new(&storage_root))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            catalog_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
