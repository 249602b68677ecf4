//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document for the Pyörävahti API.

use pyoravahti_core::{
    Bike, BikeDetails, BikeImage, BikeListing, BikeStatus, BikeUpdate, BikeWithDuplicates,
    DuplicateBike, ExternalListing, Find, Match, MatchType, NewBike, NewFind, NewReport, Report,
    Statistics, SyncSummary,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::ADMIN_TOKEN_HEADER;
use crate::handlers::{
    DuplicateSearchResponse, ExternalListingsResponse, FoundBikeForm, FoundBikeResponse,
    HealthResponse, ImageUploadResponse, MatchesResponse, MissingBikeForm, MissingBikeResponse,
    NotifyResponse, ReadyResponse,
};
use crate::validation::Coordinate;

/// Registers the `x-admin-token` header used by admin routes.
struct AdminTokenScheme;

impl Modify for AdminTokenScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "admin_token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_TOKEN_HEADER))),
        );
    }
}

/// Pyörävahti API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pyörävahti API",
        version = "0.1.0",
        description = r#"
## Lost, stolen and found bicycles

Pyörävahti collects reports of lost, stolen and found bikes together with
for-sale listings imported from marketplaces, and points out likely matches:

- **Serial number** matches are certain (confidence 1.0)
- **Photo** matches compare blockhash fingerprints of the primary photos
- **Keyword** matches score brand, model, colour and city agreement

### Reporting

1. Submit a report via `POST /api/report/lost`, `/stolen` or `/found`
2. Upload photos with `POST /api/bikes/{id}/images`; the first photo is fingerprinted
3. Check `GET /api/bikes/{id}/matches` for candidates

Admin routes expect the `x-admin-token` header when a token is configured.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Bikes", description = "Bike listing, details, photos and admin maintenance"),
        (name = "Reports", description = "Lost, stolen and found report intake"),
        (name = "Matching", description = "Reunification candidates for a bike"),
        (name = "Search", description = "Search with duplicate detection"),
        (name = "Notifications", description = "Ownership claims and abuse reports to administrators"),
        (name = "External listings", description = "Marketplace for-sale listings"),
        (name = "Statistics", description = "Home page counters"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::bikes::list_bikes,
        crate::handlers::bikes::filter_bikes,
        crate::handlers::bikes::search_bikes,
        crate::handlers::bikes::get_bike,
        crate::handlers::bikes::create_bike,
        crate::handlers::bikes::update_bike,
        crate::handlers::bikes::delete_bike,
        crate::handlers::bikes::archive_bike,
        crate::handlers::matches::bike_matches,
        crate::handlers::images::upload_images,
        crate::handlers::notify::claim_bike,
        crate::handlers::notify::report_abuse,
        crate::handlers::search::search_with_duplicates,
        crate::handlers::reports::report_lost,
        crate::handlers::reports::report_stolen,
        crate::handlers::reports::report_found,
        crate::handlers::reports::create_report,
        crate::handlers::reports::create_find,
        crate::handlers::external::external_listings,
        crate::handlers::external::sync_external_listings,
        crate::handlers::statistics::statistics,
    ),
    components(
        schemas(
            Bike,
            BikeStatus,
            BikeImage,
            BikeDetails,
            BikeListing,
            NewBike,
            BikeUpdate,
            Report,
            Find,
            NewReport,
            NewFind,
            Match,
            MatchType,
            DuplicateBike,
            BikeWithDuplicates,
            ExternalListing,
            SyncSummary,
            Statistics,
            Coordinate,
            MissingBikeForm,
            FoundBikeForm,
            MissingBikeResponse,
            FoundBikeResponse,
            ImageUploadResponse,
            MatchesResponse,
            DuplicateSearchResponse,
            ExternalListingsResponse,
            NotifyResponse,
            HealthResponse,
            ReadyResponse,
        )
    ),
    modifiers(&AdminTokenScheme)
)]
pub struct ApiDoc;
