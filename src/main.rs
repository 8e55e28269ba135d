pub mod api;
mod config;
mod models;
mod providers;
mod store;
mod transfers;

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use providers::currency::HttpCurrencyClient;
use providers::flights::HttpFlightSearchClient;
use providers::token::TokenProvider;
use providers::transfers::HttpGroundTransferClient;
use store::ItineraryStore;
use transfers::{LockManager, TransferEngine, TransferPolicy};

#[derive(OpenApi)]
#[openapi(
    info(title = "Itinera Transfer API", version = "0.1.0"),
    paths(
        api::itineraries::create::create_itinerary,
        api::itineraries::create::get_itinerary,
        api::itineraries::modify::change_hotel,
        api::itineraries::modify::change_flight,
        api::transfers::list_options,
        api::transfers::revalidate,
        api::health::health_check,
    ),
    components(schemas(
        api::ErrorResponse,
        api::health::HealthResponse,
        api::itineraries::ItineraryResponse,
        api::itineraries::create::CreateItineraryRequest,
        api::itineraries::modify::ChangeHotelRequest,
        api::itineraries::modify::ChangeFlightRequest,
        api::transfers::TransferQueryRequest,
        api::transfers::TransferOptionsResponse,
        models::Itinerary,
        models::RoomOccupancy,
        models::City,
        models::Day,
        models::Flight,
        models::Airport,
        models::Hotel,
        models::TransferLeg,
        models::InterCityTransfers,
        models::GroundLeg,
        models::GroundQuote,
        models::Location,
        models::HotelContent,
        transfers::TransferOption,
        transfers::leg::TransferOptionKind,
        transfers::RevalidationResult,
    )),
    tags(
        (name = "itineraries", description = "Itinerary lifecycle and mutations"),
        (name = "transfers", description = "Stand-alone transfer search and revalidation"),
        (name = "health", description = "Service health check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    tracing::info!(
        base_currency = %config.base_currency,
        air_fallback_threshold_minutes = config.transfer_policy.air_fallback_threshold_minutes,
        "Loaded configuration"
    );

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // Initialize SQLite database
    let cwd = std::env::current_dir().expect("Failed to get current directory");
    let db_path = cwd.join("database");
    if let Err(e) = std::fs::create_dir_all(&db_path) {
        tracing::warn!("Could not create database directory: {}", e);
    }
    let db_file = db_path.join("data.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_file.display());
    let pool = SqlitePool::connect(&db_url)
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    // Wire up supplier clients behind the shared OAuth token provider
    let token = Arc::new(TokenProvider::new(&config.suppliers).expect("Failed to build token provider"));
    let ground = HttpGroundTransferClient::new(&config.suppliers, token.clone())
        .expect("Failed to build ground transfer client");
    let flights = HttpFlightSearchClient::new(&config.suppliers, token.clone())
        .expect("Failed to build flight search client");
    let currency = HttpCurrencyClient::new(&config.suppliers, config.base_currency.clone())
        .expect("Failed to build currency client");

    let engine = TransferEngine::new(
        Arc::new(ground),
        Arc::new(flights),
        Arc::new(currency),
        TransferPolicy::from_config(&config),
    );
    let state = api::AppState {
        store: ItineraryStore::new(pool),
        engine: Arc::new(engine),
        locks: LockManager::new(),
    };

    // Build the app
    let app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Server running on http://localhost:3000");
    tracing::info!("Swagger UI: http://localhost:3000/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Itinera Transfer API"
}
