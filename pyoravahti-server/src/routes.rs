//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::ADMIN_TOKEN_HEADER;
use crate::config::Config;
use crate::handlers::{
    archive_bike, bike_matches, claim_bike, create_bike, create_find, create_report, delete_bike,
    external_listings, filter_bikes, get_bike, health, list_bikes, ready, report_abuse,
    report_found, report_lost, report_stolen, search_bikes, search_with_duplicates, statistics,
    sync_external_listings, update_bike, upload_images,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::storage::UPLOADS_URL_PREFIX;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the application router with default config (for testing)
pub fn create_router() -> Router {
    create_router_with_config(&Config::default())
}

/// Create the application router with custom configuration and an
/// in-memory bike store
pub fn create_router_with_config(config: &Config) -> Router {
    create_router_with_state(AppState::in_memory(config.clone()))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bikes", get(list_bikes).post(create_bike))
        .route("/api/bikes/filter", get(filter_bikes))
        .route("/api/bikes/search", get(search_bikes))
        .route(
            "/api/bikes/{id}",
            get(get_bike).put(update_bike).delete(delete_bike),
        )
        .route("/api/bikes/{id}/archive", post(archive_bike))
        .route("/api/bikes/{id}/matches", get(bike_matches))
        .route("/api/bikes/{id}/images", post(upload_images))
        .route("/api/bikes/{id}/claim", post(claim_bike))
        .route("/api/bikes/{id}/abuse", post(report_abuse))
        .route("/api/search", get(search_with_duplicates))
        .route("/api/report/lost", post(report_lost))
        .route("/api/report/stolen", post(report_stolen))
        .route("/api/report/found", post(report_found))
        .route("/api/reports", post(create_report))
        .route("/api/finds", post(create_find))
        .route("/api/external-listings", get(external_listings))
        .route("/api/external-listings/sync", post(sync_external_listings))
        .route("/api/statistics", get(statistics))
        .route("/health", get(health))
        .route("/ready", get(ready))
}

/// Create the application router around prepared state
pub fn create_router_with_state(state: AppState) -> Router {
    let config = state.config.clone();
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    // Configure CORS based on allowed_origins
    let cors = match &config.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            tracing::info!("CORS: Restricting to {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    HeaderName::from_static(ADMIN_TOKEN_HEADER),
                ])
        }
        _ => {
            tracing::warn!("CORS: Allowing all origins (dev mode)");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    // Request body limit; multipart uploads need more than axum's 2 MB default
    let body_limit = RequestBodyLimitLayer::new(config.body_limit_mb * 1024 * 1024);

    // Request timeout
    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeout_secs),
    );

    let uploads = ServeDir::new(&config.upload_dir);

    let router = api_routes()
        .with_state(state)
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(DefaultBodyLimit::disable())
        .layer(body_limit)
        .layer(timeout)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    // Conditionally apply rate limiting (disabled in tests, enabled in production)
    let governor_conf = if config.rate_limit_enabled {
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_sec)
            .burst_size(config.rate_limit_burst)
            .finish()
    } else {
        None
    };

    match governor_conf {
        Some(governor_conf) => {
            tracing::info!(
                "Rate limiting: {} req/s (burst: {})",
                config.rate_limit_per_sec,
                config.rate_limit_burst
            );
            router
                .layer(GovernorLayer::new(Arc::new(governor_conf)))
                .layer(TraceLayer::new_for_http())
        }
        None => {
            if config.rate_limit_enabled {
                tracing::error!(
                    per_sec = config.rate_limit_per_sec,
                    burst = config.rate_limit_burst,
                    "Invalid rate limit settings, rate limiting DISABLED"
                );
            } else {
                tracing::warn!("Rate limiting: DISABLED");
            }
            router.layer(TraceLayer::new_for_http())
        }
    }
}
